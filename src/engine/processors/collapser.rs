use super::required;
use crate::config::PipelineConfig;
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::Result;
use crate::event::{self, AnyEvent, FieldSpec};
use crate::functions::Reducer;

#[derive(Debug, Clone, Default)]
pub struct CollapserOptions {
    pub field_spec_list: Option<FieldSpec>,
    pub name: Option<String>,
    pub reducer: Option<Reducer>,
    /// Keep the existing fields next to the new one.
    pub append: bool,
}

/// Reduces several fields of each event into one new field.
#[derive(Debug)]
pub struct Collapser {
    id: String,
    prev: ChainLink,
    observable: Observable,
    field_spec_list: FieldSpec,
    name: String,
    reducer: Reducer,
    append: bool,
}

impl Collapser {
    pub fn new(
        _pipeline: &PipelineConfig,
        prev: ChainLink,
        options: CollapserOptions,
    ) -> Result<Self> {
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            field_spec_list: required(options.field_spec_list, "Collapser", "field_spec_list")?,
            name: required(options.name, "Collapser", "name")?,
            reducer: required(options.reducer, "Collapser", "reducer")?,
            append: options.append,
        })
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: unique_id("processor-"),
            prev: self.prev.clone(),
            observable: Observable::new(),
            field_spec_list: self.field_spec_list.clone(),
            name: self.name.clone(),
            reducer: self.reducer.clone(),
            append: self.append,
        }
    }
}

impl Observer for Collapser {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if !self.has_observers() {
            return Ok(());
        }
        let collapsed = event::collapse(
            event,
            &self.field_spec_list,
            &self.name,
            &self.reducer,
            self.append,
        );
        self.emit(&collapsed)
    }

    fn flush(&mut self) -> Result<()> {
        self.observable.flush()
    }
}

impl_processor!(Collapser, ProcessorKind::Collapser);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::sink::EventOut;
    use crate::error::PondError;
    use crate::event::{Event, TimedEvent};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_collapse_in_and_out() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink_results = results.clone();
        let mut collapser = Collapser::new(
            &PipelineConfig::default(),
            ChainLink::Unlinked,
            CollapserOptions {
                field_spec_list: Some(vec!["in", "out"].into()),
                name: Some("total".to_string()),
                reducer: Some(Reducer::sum()),
                append: true,
            },
        )
        .unwrap();
        collapser
            .add_observer(Box::new(EventOut::new(move |e: &AnyEvent| {
                sink_results.lock().unwrap().push(e.clone());
            })))
            .unwrap();

        collapser
            .add_event(&Event::new(0, json!({"in": 3, "out": 4})).into())
            .unwrap();

        let results = results.lock().unwrap();
        assert_eq!(
            Value::Object(results[0].data().clone()),
            json!({"in": 3, "out": 4, "total": 7})
        );
    }

    #[test]
    fn test_missing_reducer() {
        let err = Collapser::new(
            &PipelineConfig::default(),
            ChainLink::Unlinked,
            CollapserOptions {
                field_spec_list: Some("in".into()),
                name: Some("x".to_string()),
                ..CollapserOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, PondError::Construction(_)));
        assert!(err.to_string().contains("reducer"));
    }
}
