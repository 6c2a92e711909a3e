use super::required;
use crate::config::PipelineConfig;
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::Result;
use crate::event::AnyEvent;
use std::fmt;
use std::sync::Arc;

pub type Predicate = Arc<dyn Fn(&AnyEvent) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct FilterOptions {
    pub op: Option<Predicate>,
}

impl FilterOptions {
    pub fn new<F>(op: F) -> Self
    where
        F: Fn(&AnyEvent) -> bool + Send + Sync + 'static,
    {
        Self {
            op: Some(Arc::new(op)),
        }
    }
}

/// Passes on the events the predicate accepts, unchanged.
pub struct Filter {
    id: String,
    prev: ChainLink,
    observable: Observable,
    op: Predicate,
}

impl Filter {
    pub fn new(_pipeline: &PipelineConfig, prev: ChainLink, options: FilterOptions) -> Result<Self> {
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            op: required(options.op, "Filter", "op")?,
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

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("id", &self.id).finish()
    }
}

impl Observer for Filter {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if self.has_observers() && (self.op)(event) {
            self.emit(event)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.observable.flush()
    }
}

impl_processor!(Filter, ProcessorKind::Filter);
