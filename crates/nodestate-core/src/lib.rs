#![forbid(unsafe_code)]

//! Core data types for nodestate.
//!
//! This crate provides:
//! - [`Value`] for single graph field values
//! - [`Payload`] for partial updates flowing into and out of a node
//! - [`Fields`] for the structurally shared field map a bound store holds
//! - [`NodeStateError`] and the crate-wide [`Result`] alias
//! - [`NodeStateConfig`] for binding behavior loaded from TOML and env

pub mod config;
pub mod error;
pub mod fields;
pub mod payload;
pub mod value;

pub use config::NodeStateConfig;
pub use error::{NodeStateError, Result};
pub use fields::Fields;
pub use payload::Payload;
pub use value::Value;
