pub mod collector;

#[allow(unused_imports)]
pub use collector::{Collector, field, slots};
