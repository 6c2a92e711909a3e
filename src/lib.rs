//! Time series events flowing through chains of processors.
//!
//! Events come in three variants ([`Event`], [`IndexedEvent`] and
//! [`TimeRangeEvent`]) carrying a JSON data payload. A [`Pipeline`] strings
//! processors together, windows and groups events with a [`Collector`] and
//! delivers results to a sink.

pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod functions;
pub mod index;
pub mod time_range;
pub mod windowing;

pub use collection::Collection;
pub use config::{GroupBy, Mode, PipelineConfig};
pub use engine::processors::{
    Aggregator, AggregatorOptions, Alignment, Collapser, CollapserOptions, Converter,
    ConverterOptions, Filter, FilterOptions, Mapper, MapperOptions, Offset, OffsetOptions,
    Selector, SelectorOptions, Taker, TakerOptions,
};
pub use engine::{
    ChainEntry, ChainLink, CollectionOut, EventOut, Observer, Pipeline, PipelineInput, Processor,
    ProcessorKind, Runner,
};
pub use error::{PondError, Result};
pub use event::{
    AnyEvent, Data, Event, EventKey, EventVariant, FieldSpec, IndexedEvent, TimeRangeEvent,
    TimedEvent,
};
pub use functions::{AggregateFunction, Reducer};
pub use index::Index;
pub use time_range::TimeRange;
pub use windowing::{Collector, EmitPolicy, WindowSpec};
