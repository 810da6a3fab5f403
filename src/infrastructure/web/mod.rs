pub mod handlers;
pub mod rejection;
pub mod routes;
pub mod webserver;

pub use webserver::{routes, run, HubDeps};
