//! End-to-end scenarios for live-node bindings over the in-memory graph.
//!
//! Two peers ("Alex" and "Blitz") share one graph. Each mounts a component
//! bound to the same todo node; edits by one show up in the other's view
//! once the graph delivers them.

use std::rc::Rc;

use nodestate::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize, PartialEq)]
struct Todo {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assigned: Option<String>,
}

fn peer(graph: &MemoryGraph) -> Mount {
    Mount::new(
        GraphContext::new(Rc::new(graph.clone())),
        NodeStateConfig::default(),
    )
}

fn todo(mount: &mut Mount, id: &str) -> (Todo, SetState) {
    mount
        .render(|cx| cx.use_node_state(id))
        .map(|(state, set)| (state.decode().expect("todo fields"), set))
        .expect("client provided")
}

#[test]
fn todo_without_prior_data_receives_title() {
    let graph = MemoryGraph::new();
    let mut alex = peer(&graph);
    let (initial, _) = todo(&mut alex, "todo-1");
    assert_eq!(initial, Todo::default());

    graph.receive_remote("todo-1", Payload::new().with("title", "Buy milk"));

    let (state, _) = alex.render(|cx| cx.use_node_state("todo-1")).unwrap();
    assert_eq!(state.len(), 1);
    assert_eq!(state.get("title"), Some(&Value::from("Buy milk")));
}

#[test]
fn two_payloads_accumulate() {
    let graph = MemoryGraph::new();
    let mut alex = peer(&graph);
    todo(&mut alex, "todo-1");

    graph.receive_remote("todo-1", Payload::new().with("title", "A"));
    graph.receive_remote("todo-1", Payload::new().with("completed", true));

    let (t, _) = todo(&mut alex, "todo-1");
    assert_eq!(
        t,
        Todo {
            title: Some("A".into()),
            completed: Some(true),
            assigned: None,
        }
    );
}

#[test]
fn edits_propagate_between_peers() {
    let graph = MemoryGraph::new();
    let mut alex = peer(&graph);
    let mut blitz = peer(&graph);

    let (_, alex_set) = todo(&mut alex, "todo-1");
    todo(&mut blitz, "todo-1");

    alex_set
        .set_with(&Todo {
            title: Some("A Title".into()),
            assigned: Some("Alex".into()),
            ..Todo::default()
        })
        .unwrap();

    assert!(blitz.needs_render());
    let (seen_by_blitz, blitz_set) = todo(&mut blitz, "todo-1");
    assert_eq!(seen_by_blitz.title.as_deref(), Some("A Title"));

    blitz_set.set(Payload::new().with("title", "Blitz was here"));
    let (seen_by_alex, _) = todo(&mut alex, "todo-1");
    assert_eq!(seen_by_alex.title.as_deref(), Some("Blitz was here"));
    assert_eq!(seen_by_alex.assigned.as_deref(), Some("Alex"));
}

#[test]
fn detached_put_waits_for_redelivery() {
    let graph = MemoryGraph::with_delivery(Delivery::Detached);
    let mut alex = peer(&graph);
    let (_, set) = todo(&mut alex, "todo-1");

    set.set(Payload::new().with("x", 5));
    let (state, _) = alex.render(|cx| cx.use_node_state("todo-1")).unwrap();
    assert!(state.get("x").is_none());

    graph.receive_remote("todo-1", Payload::new().with("x", 5));
    let (state, _) = alex.render(|cx| cx.use_node_state("todo-1")).unwrap();
    assert_eq!(state.get("x"), Some(&Value::from(5)));
}

#[test]
fn deferred_queue_drains_on_owning_thread() {
    let graph = MemoryGraph::with_delivery(Delivery::Deferred);
    let mut alex = peer(&graph);
    let (_, set) = todo(&mut alex, "todo-1");

    set.set(Payload::new().with("title", "A"));
    set.set(Payload::new().with("title", "B"));
    assert_eq!(graph.pending(), 2);
    assert!(!alex.needs_render());

    assert_eq!(graph.flush(), 2);
    let (t, _) = todo(&mut alex, "todo-1");
    assert_eq!(t.title.as_deref(), Some("B"), "FIFO delivery, last write wins");
}

#[test]
fn unmount_then_remount_sees_committed_data() {
    let graph = MemoryGraph::new();
    {
        let mut alex = peer(&graph);
        let (_, set) = todo(&mut alex, "todo-1");
        set.set(Payload::new().with("completed", true));
    }
    assert_eq!(graph.listener_count("todo-1"), 0);

    let mut again = peer(&graph);
    let (t, _) = todo(&mut again, "todo-1");
    assert_eq!(t.completed, Some(true));
}

#[test]
fn ambient_provider_reaches_nested_mounts() {
    let graph = MemoryGraph::new();
    let root = GraphContext::new(Rc::new(graph.clone()));
    let _provided = root.provide();

    let mut list = Mount::from_current();
    let mut item = Mount::from_current();
    list.render(|cx| cx.use_node_state("todos").map(|_| ())).unwrap();
    item.render(|cx| cx.use_node_state("todo-1").map(|_| ())).unwrap();

    assert_eq!(graph.listener_count("todos"), 1);
    assert_eq!(graph.listener_count("todo-1"), 1);
}

#[test]
fn mount_without_provider_fails_loudly() {
    let mut orphan = Mount::from_current();
    let err = orphan
        .render(|cx| cx.use_node_state("todo-1").map(|_| ()))
        .unwrap_err();
    assert!(matches!(err, NodeStateError::MissingClient));
}
