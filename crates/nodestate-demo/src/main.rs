#![forbid(unsafe_code)]

//! Walkthrough of live-node bindings between two peers sharing one graph.
//!
//! ```text
//! nodestate-demo todo --delivery deferred
//! RUST_LOG=nodestate=trace nodestate-demo chat
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand, ValueEnum};
use nodestate::prelude::*;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nodestate-demo", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// How the shared graph delivers writes back to listeners.
    #[arg(long, global = true, value_enum, default_value_t = DeliveryArg::Deferred)]
    delivery: DeliveryArg,

    #[command(subcommand)]
    scenario: Scenario,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DeliveryArg {
    Immediate,
    Deferred,
}

impl From<DeliveryArg> for Delivery {
    fn from(arg: DeliveryArg) -> Self {
        match arg {
            DeliveryArg::Immediate => Delivery::Immediate,
            DeliveryArg::Deferred => Delivery::Deferred,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Scenario {
    /// Two peers editing one todo item.
    Todo,
    /// Two peers posting into a shared message list.
    Chat {
        /// Messages each peer sends.
        #[arg(long, default_value_t = 2)]
        count: u32,
    },
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct Todo {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    user_name: String,
    body: String,
    time_sent: u64,
}

/// One peer: its own mounted components over the shared graph.
struct Peer {
    name: &'static str,
    graph: MemoryGraph,
    context: GraphContext,
    config: NodeStateConfig,
}

impl Peer {
    fn new(name: &'static str, graph: &MemoryGraph, config: &NodeStateConfig) -> Self {
        Self {
            name,
            graph: graph.clone(),
            context: GraphContext::new(Rc::new(graph.clone())),
            config: config.clone(),
        }
    }

    fn mount(&self) -> Mount {
        Mount::new(self.context.clone(), self.config.clone())
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(message = "demo.failed", error = %err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> nodestate::Result<()> {
    let config = match &cli.config {
        Some(path) => NodeStateConfig::from_path(path)?,
        None => NodeStateConfig::default(),
    }
    .with_env_overrides()?;
    tracing::info!(
        message = "demo.start",
        delivery = ?cli.delivery,
        reset_on_rebind = config.reset_on_rebind
    );

    let graph = MemoryGraph::with_delivery(cli.delivery.into()).configured(&config);
    match cli.scenario {
        Scenario::Todo => todo_scenario(&graph, &config),
        Scenario::Chat { count } => chat_scenario(&graph, &config, count),
    }
}

/// Render `mount` bound to `node_id`, draining deferred deliveries (such as
/// the replay queued on first subscribe) before the final pass.
fn render_node(
    peer: &Peer,
    mount: &mut Mount,
    node_id: &str,
) -> nodestate::Result<(Snapshot<Fields>, SetState)> {
    let mut rendered = mount.render(|cx| cx.use_node_state(node_id))?;
    if peer.graph.flush() > 0 && mount.needs_render() {
        rendered = mount.render(|cx| cx.use_node_state(node_id))?;
    }
    Ok(rendered)
}

fn show_todo(peer: &Peer, mount: &mut Mount) -> nodestate::Result<SetState> {
    let (state, set) = render_node(peer, mount, "todo-1")?;
    let todo: Todo = state.decode()?;
    println!(
        "[{:<5}] todo-1: title={:?} completed={:?} assigned={:?}",
        peer.name, todo.title, todo.completed, todo.assigned
    );
    Ok(set)
}

fn todo_scenario(graph: &MemoryGraph, config: &NodeStateConfig) -> nodestate::Result<()> {
    let alex = Peer::new("Alex", graph, config);
    let blitz = Peer::new("Blitz", graph, config);
    let mut alex_view = alex.mount();
    let mut blitz_view = blitz.mount();

    let alex_set = show_todo(&alex, &mut alex_view)?;
    show_todo(&blitz, &mut blitz_view)?;

    alex_set.set_with(&Todo {
        title: Some("A Title".into()),
        completed: Some(false),
        assigned: Some("Alex".into()),
    })?;
    let (pending, _) = alex_view.render(|cx| cx.use_node_state("todo-1"))?;
    println!(
        "-- Alex wrote the todo; {} field(s) visible, {} delivery(ies) queued",
        pending.len(),
        alex.graph.pending()
    );

    println!("-- after delivery:");
    let blitz_set = show_todo(&blitz, &mut blitz_view)?;
    blitz_set.set(Payload::new().with("title", "Buy milk").with("completed", true));
    blitz.graph.flush();

    println!("-- Blitz edited the title and completed it:");
    for (peer, view) in [(&alex, &mut alex_view), (&blitz, &mut blitz_view)] {
        if view.needs_render() {
            show_todo(peer, view)?;
        }
    }
    Ok(())
}

fn chat_scenario(
    graph: &MemoryGraph,
    config: &NodeStateConfig,
    count: u32,
) -> nodestate::Result<()> {
    let alex = Peer::new("Alex", graph, config);
    let blitz = Peer::new("Blitz", graph, config);
    let mut alex_room = alex.mount();
    let mut blitz_room = blitz.mount();

    let mut clock = 0u64;
    for round in 0..count {
        for peer in [&alex, &blitz] {
            clock += 1;
            let id = format!("chat/msg-{clock}");
            let client = peer.context.client()?;
            client.get(&id).put(Payload::from_serializable(&Message {
                user_name: peer.name.to_owned(),
                body: format!("message {} from {}", round + 1, peer.name),
                time_sent: clock,
            })?);
            client
                .get("chat/messages")
                .put(Payload::new().with(clock.to_string(), Value::Link(id)));
        }
    }
    graph.flush();

    for (peer, room) in [(&alex, &mut alex_room), (&blitz, &mut blitz_room)] {
        render_room(peer, room)?;
    }
    Ok(())
}

fn render_room(peer: &Peer, room: &mut Mount) -> nodestate::Result<()> {
    let (index, _) = render_node(peer, room, "chat/messages")?;
    let mut links: Vec<(u64, String)> = index
        .iter()
        .filter_map(|(key, value)| Some((key.parse().ok()?, value.as_link()?.to_owned())))
        .collect();
    links.sort();

    println!("[{}] chat ({} messages)", peer.name, links.len());
    for (_, link) in links {
        // Each message renders as its own component bound to its own node.
        let mut item = peer.mount();
        let message: Message = render_node(peer, &mut item, &link)?.0.decode()?;
        println!(
            "  #{:<3} {:<6} {}",
            message.time_sent, message.user_name, message.body
        );
    }
    Ok(())
}
