use crate::config::PipelineConfig;
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::Result;
use crate::event::{self, AnyEvent, FieldSpec};

#[derive(Debug, Clone, Default)]
pub struct SelectorOptions {
    /// Fields to keep, "value" when unset.
    pub field_spec: Option<FieldSpec>,
}

/// Projects each event onto a set of fields.
#[derive(Debug)]
pub struct Selector {
    id: String,
    prev: ChainLink,
    observable: Observable,
    field_spec: FieldSpec,
}

impl Selector {
    pub fn new(
        _pipeline: &PipelineConfig,
        prev: ChainLink,
        options: SelectorOptions,
    ) -> Result<Self> {
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            field_spec: options.field_spec.unwrap_or_default(),
        })
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: unique_id("processor-"),
            prev: self.prev.clone(),
            observable: Observable::new(),
            field_spec: self.field_spec.clone(),
        }
    }
}

impl Observer for Selector {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if !self.has_observers() {
            return Ok(());
        }
        let selected = event::selector(event, &self.field_spec);
        self.emit(&selected)
    }

    fn flush(&mut self) -> Result<()> {
        self.observable.flush()
    }
}

impl_processor!(Selector, ProcessorKind::Selector);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sink::EventOut;
    use crate::event::{Event, TimedEvent};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_selector_projects_fields() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink_results = results.clone();
        let mut selector = Selector::new(
            &PipelineConfig::default(),
            ChainLink::Unlinked,
            SelectorOptions {
                field_spec: Some(vec!["in", "status"].into()),
            },
        )
        .unwrap();
        selector
            .add_observer(Box::new(EventOut::new(move |e: &AnyEvent| {
                sink_results.lock().unwrap().push(e.clone());
            })))
            .unwrap();

        selector
            .add_event(&Event::new(5, json!({"in": 1, "out": 2, "status": "ok"})).into())
            .unwrap();

        let results = results.lock().unwrap();
        assert_eq!(
            Value::Object(results[0].data().clone()),
            json!({"in": 1, "status": "ok"})
        );
    }

    #[test]
    fn test_default_field_is_value() {
        let selector = Selector::new(
            &PipelineConfig::default(),
            ChainLink::Unlinked,
            SelectorOptions::default(),
        )
        .unwrap();
        assert_eq!(selector.field_spec, FieldSpec::from("value"));
    }
}
