pub mod setting;

pub use setting::{AgentSetting, HubSetting};
