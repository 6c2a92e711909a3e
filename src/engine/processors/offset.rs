use super::required;
use crate::config::PipelineConfig;
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::{PondError, Result};
use crate::event::field::{as_number, number_value_like, set_path};
use crate::event::{AnyEvent, Data, FieldSpec, TimedEvent};

#[derive(Debug, Clone, Default)]
pub struct OffsetOptions {
    /// Fields to shift, "value" when unset.
    pub field_spec: Option<FieldSpec>,
    pub by: Option<f64>,
}

/// Adds a constant to the selected fields. The emitted event carries only
/// those fields.
#[derive(Debug)]
pub struct Offset {
    id: String,
    prev: ChainLink,
    observable: Observable,
    field_spec: FieldSpec,
    by: f64,
}

impl Offset {
    pub fn new(_pipeline: &PipelineConfig, prev: ChainLink, options: OffsetOptions) -> Result<Self> {
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            field_spec: options.field_spec.unwrap_or_default(),
            by: required(options.by, "Offset", "by")?,
        })
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: unique_id("processor-"),
            prev: self.prev.clone(),
            observable: Observable::new(),
            field_spec: self.field_spec.clone(),
            by: self.by,
        }
    }
}

impl Observer for Offset {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if !self.has_observers() {
            return Ok(());
        }
        let mut data = Data::new();
        for path in self.field_spec.paths() {
            let (input, value) = event
                .get(path)
                .and_then(|input| Some((input, as_number(input)?)))
                .ok_or_else(|| {
                    PondError::data(format!("Offset: field '{}' is not a number", path))
                })?;
            set_path(&mut data, path, number_value_like(value + self.by, input));
        }
        self.emit(&event.set_data(data))
    }

    fn flush(&mut self) -> Result<()> {
        self.observable.flush()
    }
}

impl_processor!(Offset, ProcessorKind::Offset);
