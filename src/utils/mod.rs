pub mod helpers;
pub mod logging;
