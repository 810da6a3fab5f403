pub mod broadcaster;

pub use broadcaster::Broadcaster;
