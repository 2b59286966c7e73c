mod adopt;
mod chain;
mod demo;

pub use adopt::adopt;
pub use chain::chain;
pub use demo::demo;
