//! TailClip
//!
//! Clipboard synchronization across a small set of user-owned devices on a
//! private overlay network. One machine runs the hub (durable event log +
//! real-time fan-out); every participating device runs an agent (clipboard
//! poll driver + push-channel consumer).

pub mod application;
pub mod config;
pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod utils;

pub use config::{AgentSetting, HubSetting};
pub use domain::device::Device;
pub use domain::event::ClipboardEvent;
