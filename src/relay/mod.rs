// Outbound relay: destinations catalog, sinks and bridge tasks

mod bridge;
mod catalog;
mod sink;

pub use bridge::*;
pub use catalog::*;
pub use sink::*;
