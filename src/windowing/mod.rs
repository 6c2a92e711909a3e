pub mod collector;
pub mod window_spec;

pub use collector::{Collector, UNGROUPED};
pub use window_spec::{EmitPolicy, WindowSpec, GLOBAL_WINDOW};
