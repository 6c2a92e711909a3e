use super::required;
use crate::config::{GroupBy, PipelineConfig};
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::Result;
use crate::event::{AnyEvent, TimedEvent};
use crate::windowing::WindowSpec;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct TakerOptions {
    pub limit: Option<usize>,
}

/// Passes on the first `limit` events of each window and group, then drops
/// the rest.
#[derive(Debug)]
pub struct Taker {
    id: String,
    prev: ChainLink,
    observable: Observable,
    limit: usize,
    window: WindowSpec,
    group_by: Option<GroupBy>,
    utc: bool,
    count: HashMap<String, usize>,
}

impl Taker {
    pub fn new(pipeline: &PipelineConfig, prev: ChainLink, options: TakerOptions) -> Result<Self> {
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            limit: required(options.limit, "Taker", "limit")?,
            window: pipeline.window.clone(),
            group_by: pipeline.group_by.clone(),
            utc: pipeline.utc,
            count: HashMap::new(),
        })
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: unique_id("processor-"),
            prev: self.prev.clone(),
            observable: Observable::new(),
            limit: self.limit,
            window: self.window.clone(),
            group_by: self.group_by.clone(),
            utc: self.utc,
            count: HashMap::new(),
        }
    }

    // Only fixed windows are bucketed here; any other window type counts as
    // a single window named after the type.
    fn collection_key(&self, event: &AnyEvent) -> Result<String> {
        let window_key = if self.window.is_fixed() {
            self.window.window_key(event.timestamp(), self.utc)?
        } else {
            self.window.window_type().to_string()
        };
        Ok(match self.group_by.as_ref().and_then(|g| g.key(event)) {
            Some(group) => format!("{}::{}", window_key, group),
            None => window_key,
        })
    }
}

impl Observer for Taker {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if !self.has_observers() {
            return Ok(());
        }
        let key = self.collection_key(event)?;
        let count = self.count.entry(key).or_insert(0);
        *count += 1;
        if *count <= self.limit {
            self.emit(event)
        } else {
            tracing::trace!(id = %self.id, limit = self.limit, "taker limit reached, dropping event");
            Ok(())
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.observable.flush()
    }
}

impl_processor!(Taker, ProcessorKind::Taker);
