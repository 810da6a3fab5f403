pub mod agent;
pub mod content;

pub use agent::TailClipAgent;
pub use content::{ContentHandlerRegistry, TextHandler};
