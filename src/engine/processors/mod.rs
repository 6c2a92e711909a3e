//! The eight chain stages.

mod aggregator;
mod collapser;
mod converter;
mod filter;
mod mapper;
mod offset;
mod selector;
mod taker;

pub use aggregator::{Aggregator, AggregatorOptions};
pub use collapser::{Collapser, CollapserOptions};
pub use converter::{Alignment, Converter, ConverterOptions};
pub use filter::{Filter, FilterOptions, Predicate};
pub use mapper::{MapFn, Mapper, MapperOptions};
pub use offset::{Offset, OffsetOptions};
pub use selector::{Selector, SelectorOptions};
pub use taker::{Taker, TakerOptions};

use crate::error::{PondError, Result};

pub(crate) fn required<T>(value: Option<T>, processor: &str, option: &str) -> Result<T> {
    value.ok_or_else(|| {
        PondError::construction(format!(
            "{}: missing required option '{}'",
            processor, option
        ))
    })
}
