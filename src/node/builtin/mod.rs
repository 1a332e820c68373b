//! Built-in behaviors: Beacon, Sink, Echo and RandomWalker.
//!
//! Small reference behaviors used by tests, the builder DSL and the demo
//! binary. Real algorithms are expected to live in user crates.

pub mod beacon;
pub mod echo;
pub mod sink;
pub mod walker;

pub use beacon::Beacon;
pub use echo::Echo;
pub use sink::Sink;
pub use walker::RandomWalker;
