use super::required;
use crate::config::PipelineConfig;
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::Result;
use crate::event::AnyEvent;
use std::fmt;
use std::sync::Arc;

pub type MapFn = Arc<dyn Fn(&AnyEvent) -> AnyEvent + Send + Sync>;

#[derive(Clone, Default)]
pub struct MapperOptions {
    pub op: Option<MapFn>,
}

impl MapperOptions {
    pub fn new<F>(op: F) -> Self
    where
        F: Fn(&AnyEvent) -> AnyEvent + Send + Sync + 'static,
    {
        Self {
            op: Some(Arc::new(op)),
        }
    }
}

/// Replaces each event with the result of a user function.
pub struct Mapper {
    id: String,
    prev: ChainLink,
    observable: Observable,
    op: MapFn,
}

impl Mapper {
    pub fn new(_pipeline: &PipelineConfig, prev: ChainLink, options: MapperOptions) -> Result<Self> {
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            op: required(options.op, "Mapper", "op")?,
        })
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: unique_id("processor-"),
            prev: self.prev.clone(),
            observable: Observable::new(),
            op: self.op.clone(),
        }
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper").field("id", &self.id).finish()
    }
}

impl Observer for Mapper {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if !self.has_observers() {
            return Ok(());
        }
        let mapped = (self.op)(event);
        self.emit(&mapped)
    }

    fn flush(&mut self) -> Result<()> {
        self.observable.flush()
    }
}

impl_processor!(Mapper, ProcessorKind::Mapper);
