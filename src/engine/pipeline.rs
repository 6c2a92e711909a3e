//! Fluent pipeline builder.
//!
//! A [`Pipeline`] records stage templates, each built with the pipeline
//! settings in force when it was added. [`Pipeline::to`] checks the chain,
//! clones every template with fresh state and wires the clones to a sink,
//! returning a [`Runner`] that is fed events synchronously.

use crate::collection::Collection;
use crate::config::{GroupBy, Mode, PipelineConfig};
use crate::engine::chain::{ChainLink, PipelineInput, Processor};
use crate::engine::observable::Observer;
use crate::engine::processors::{
    Aggregator, AggregatorOptions, Alignment, Collapser, CollapserOptions, Converter,
    ConverterOptions, Filter, FilterOptions, Mapper, MapperOptions, Offset, OffsetOptions,
    Selector, SelectorOptions, Taker, TakerOptions,
};
use crate::engine::sink::{CollectionOut, EventOut};
use crate::error::{PondError, Result};
use crate::event::{AnyEvent, EventVariant, FieldSpec, TimedEvent};
use crate::functions::Reducer;
use crate::windowing::{EmitPolicy, GLOBAL_WINDOW, UNGROUPED, WindowSpec};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub struct Pipeline {
    config: PipelineConfig,
    input: Arc<PipelineInput>,
    stages: Vec<Box<dyn Processor>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            input: PipelineInput::new("input"),
            stages: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn window_by(mut self, window: WindowSpec) -> Self {
        self.config.window = window;
        self
    }

    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.config.group_by = Some(group_by);
        self
    }

    pub fn group_by_field(self, path: &str) -> Self {
        self.group_by(GroupBy::field(path))
    }

    pub fn emit_on(mut self, emit: EmitPolicy) -> Self {
        self.config.emit = emit;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn utc(mut self, utc: bool) -> Self {
        self.config.utc = utc;
        self
    }

    fn tail(&self) -> ChainLink {
        match self.stages.last() {
            Some(stage) => stage.link(),
            None => ChainLink::PipelineInput(self.input.clone()),
        }
    }

    fn push(mut self, stage: impl Processor + 'static) -> Self {
        tracing::debug!(kind = %stage.kind(), id = stage.id(), "adding stage");
        self.stages.push(Box::new(stage));
        self
    }

    pub fn offset_by(self, by: f64, field_spec: impl Into<FieldSpec>) -> Result<Self> {
        let options = OffsetOptions {
            field_spec: Some(field_spec.into()),
            by: Some(by),
        };
        let stage = Offset::new(&self.config, self.tail(), options)?;
        Ok(self.push(stage))
    }

    pub fn select(self, field_spec: impl Into<FieldSpec>) -> Result<Self> {
        let options = SelectorOptions {
            field_spec: Some(field_spec.into()),
        };
        let stage = Selector::new(&self.config, self.tail(), options)?;
        Ok(self.push(stage))
    }

    pub fn collapse(
        self,
        field_spec_list: impl Into<FieldSpec>,
        name: &str,
        reducer: Reducer,
        append: bool,
    ) -> Result<Self> {
        let options = CollapserOptions {
            field_spec_list: Some(field_spec_list.into()),
            name: Some(name.to_string()),
            reducer: Some(reducer),
            append,
        };
        let stage = Collapser::new(&self.config, self.tail(), options)?;
        Ok(self.push(stage))
    }

    pub fn filter<F>(self, op: F) -> Result<Self>
    where
        F: Fn(&AnyEvent) -> bool + Send + Sync + 'static,
    {
        let stage = Filter::new(&self.config, self.tail(), FilterOptions::new(op))?;
        Ok(self.push(stage))
    }

    pub fn map<F>(self, op: F) -> Result<Self>
    where
        F: Fn(&AnyEvent) -> AnyEvent + Send + Sync + 'static,
    {
        let stage = Mapper::new(&self.config, self.tail(), MapperOptions::new(op))?;
        Ok(self.push(stage))
    }

    pub fn take(self, limit: usize) -> Result<Self> {
        let options = TakerOptions { limit: Some(limit) };
        let stage = Taker::new(&self.config, self.tail(), options)?;
        Ok(self.push(stage))
    }

    pub fn aggregate(self, options: AggregatorOptions) -> Result<Self> {
        let stage = Aggregator::new(&self.config, self.tail(), options)?;
        Ok(self.push(stage))
    }

    fn convert(self, options: ConverterOptions) -> Result<Self> {
        let stage = Converter::new(&self.config, self.tail(), options)?;
        Ok(self.push(stage))
    }

    pub fn as_events(self, alignment: Alignment) -> Result<Self> {
        self.convert(ConverterOptions {
            target: Some(EventVariant::Event),
            duration: None,
            alignment: Some(alignment),
        })
    }

    pub fn as_time_range_events(self, alignment: Alignment, duration: Option<&str>) -> Result<Self> {
        self.convert(ConverterOptions {
            target: Some(EventVariant::TimeRange),
            duration: duration.map(str::to_string),
            alignment: Some(alignment),
        })
    }

    pub fn as_indexed_events(self, duration: &str) -> Result<Self> {
        self.convert(ConverterOptions {
            target: Some(EventVariant::Indexed),
            duration: Some(duration.to_string()),
            alignment: None,
        })
    }

    /// Check the chain, then wire fresh copies of every stage to `sink`.
    pub fn to<S: Observer + 'static>(&self, sink: S) -> Result<Runner> {
        if let Some(last) = self.stages.last() {
            let chain = last.chain()?;
            if chain.len() != self.stages.len() + 1 {
                return Err(PondError::chain(format!(
                    "Chain has {} entries for {} stages",
                    chain.len(),
                    self.stages.len()
                )));
            }
        }

        let mut head: Box<dyn Observer> = Box::new(sink);
        for template in self.stages.iter().rev() {
            let mut stage = template.clone_processor();
            stage.add_observer(head)?;
            head = stage.into_observer();
        }
        tracing::debug!(stages = self.stages.len(), input = self.input.name(), "pipeline wired");

        Ok(Runner {
            head,
            variant: None,
        })
    }

    /// Run a batch of events through the chain and collect what comes out.
    pub fn to_event_list<E: Into<AnyEvent>>(
        &self,
        events: impl IntoIterator<Item = E>,
    ) -> Result<Vec<AnyEvent>> {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink_results = results.clone();
        let runner = self.to(EventOut::new(move |event: &AnyEvent| {
            lock(&sink_results).push(event.clone());
        }))?;
        runner.run(events)?;
        let collected = std::mem::take(&mut *lock(&results));
        Ok(collected)
    }

    /// Run a batch of events through the chain and group the output by
    /// window and group key. Keys are "windowKey--groupKey", either part
    /// dropped when it is "global" or "all", or "all" when both are.
    pub fn to_keyed_collections<E: Into<AnyEvent>>(
        &self,
        events: impl IntoIterator<Item = E>,
    ) -> Result<BTreeMap<String, Collection>> {
        let results = Arc::new(Mutex::new(BTreeMap::new()));
        let sink_results = results.clone();
        let sink = CollectionOut::new(&self.config, move |collection: &Collection, wk: &str, gk: &str| {
            lock(&sink_results).insert(collection_key(wk, gk), collection.clone());
        });
        self.to(sink)?.run(events)?;
        let collected = std::mem::take(&mut *lock(&results));
        Ok(collected)
    }
}

fn collection_key(window_key: &str, group_key: &str) -> String {
    match (window_key == GLOBAL_WINDOW, group_key == UNGROUPED) {
        (true, true) => UNGROUPED.to_string(),
        (true, false) => group_key.to_string(),
        (false, true) => window_key.to_string(),
        (false, false) => format!("{}--{}", window_key, group_key),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A wired chain. Accepts events of a single variant.
pub struct Runner {
    head: Box<dyn Observer>,
    variant: Option<EventVariant>,
}

impl Runner {
    pub fn add_event(&mut self, event: impl Into<AnyEvent>) -> Result<()> {
        let event = event.into();
        match self.variant {
            Some(variant) if variant != event.variant() => {
                return Err(PondError::data(format!(
                    "Pipeline input expects {} but got {}",
                    variant,
                    event.variant()
                )));
            }
            Some(_) => {}
            None => self.variant = Some(event.variant()),
        }
        self.head.add_event(&event)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.head.flush()
    }

    /// Feed every event, then flush.
    pub fn run<E: Into<AnyEvent>>(mut self, events: impl IntoIterator<Item = E>) -> Result<()> {
        for event in events {
            self.add_event(event)?;
        }
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, TimeRangeEvent};
    use crate::time_range::TimeRange;
    use serde_json::json;

    fn events() -> Vec<Event> {
        vec![
            Event::new(0, json!({"in": 1, "out": 2})),
            Event::new(30_000, json!({"in": 3, "out": 4})),
            Event::new(60_000, json!({"in": 5, "out": 6})),
        ]
    }

    #[test]
    fn test_stages_run_in_order() {
        let pipeline = Pipeline::new()
            .select(vec!["in", "out"])
            .unwrap()
            .offset_by(10.0, "in")
            .unwrap()
            .take(2)
            .unwrap();
        let out = pipeline.to_event_list(events()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].value("in"), Some(11.0));
        assert_eq!(out[1].value("in"), Some(13.0));
        assert_eq!(out[0].get("out"), None);
    }

    #[test]
    fn test_runs_are_independent() {
        let pipeline = Pipeline::new().take(1).unwrap();
        assert_eq!(pipeline.to_event_list(events()).unwrap().len(), 1);
        // fresh counters on every wiring
        assert_eq!(pipeline.to_event_list(events()).unwrap().len(), 1);
    }

    #[test]
    fn test_keyed_collections() {
        let pipeline = Pipeline::new()
            .window_by(WindowSpec::fixed("1m").unwrap())
            .emit_on(EmitPolicy::Discard);
        let keyed = pipeline.to_keyed_collections(events()).unwrap();
        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed["1m-0"].size(), 2);
        assert_eq!(keyed["1m-1"].size(), 1);

        let global = Pipeline::new().emit_on(EmitPolicy::Discard);
        let keyed = global.to_keyed_collections(events()).unwrap();
        assert_eq!(keyed["all"].size(), 3);
    }

    #[test]
    fn test_grouped_keyed_collections() {
        let pipeline = Pipeline::new()
            .window_by(WindowSpec::fixed("1m").unwrap())
            .group_by_field("host")
            .emit_on(EmitPolicy::Discard);
        let keyed = pipeline
            .to_keyed_collections(vec![
                Event::new(0, json!({"host": "a"})),
                Event::new(1, json!({"host": "b"})),
            ])
            .unwrap();
        let keys: Vec<&String> = keyed.keys().collect();
        assert_eq!(keys, vec!["1m-0--a", "1m-0--b"]);
    }

    #[test]
    fn test_mixed_input_rejected() {
        let mut runner = Pipeline::new().to(EventOut::new(|_: &AnyEvent| {})).unwrap();
        runner.add_event(Event::new(0, json!(1))).unwrap();
        let ranged = TimeRangeEvent::new(TimeRange::new(0, 1).unwrap(), json!(1));
        assert!(matches!(runner.add_event(ranged), Err(PondError::Data(_))));
    }

    #[test]
    fn test_stage_takes_config_in_force() {
        let pipeline = Pipeline::new()
            .take(1)
            .unwrap()
            .window_by(WindowSpec::fixed("1m").unwrap());
        // the taker was added before windowing, so one event in total
        assert_eq!(pipeline.to_event_list(events()).unwrap().len(), 1);
        assert_eq!(pipeline.stage_count(), 1);
    }

    #[test]
    fn test_collection_key() {
        assert_eq!(collection_key("global", "all"), "all");
        assert_eq!(collection_key("global", "a"), "a");
        assert_eq!(collection_key("1m-0", "all"), "1m-0");
        assert_eq!(collection_key("1m-0", "a"), "1m-0--a");
    }
}
