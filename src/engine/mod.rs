pub mod chain;
pub mod observable;
pub mod pipeline;
pub mod processors;
pub mod sink;

pub use chain::{ChainEntry, ChainLink, PipelineInput, Processor, ProcessorKind, StageInfo};
pub use observable::{Observable, Observer};
pub use pipeline::{Pipeline, Runner};
pub use sink::{CollectionOut, EventOut};
