use crate::collection::Collection;
use crate::config::{Mode, PipelineConfig};
use crate::engine::chain::{ChainLink, Processor, ProcessorKind, impl_processor, unique_id};
use crate::engine::observable::{Observable, Observer};
use crate::error::{PondError, Result};
use crate::event::field::{optional_number_value, terminal_segment};
use crate::event::{AnyEvent, Data, FieldSpec, IndexedEvent, TimeRangeEvent};
use crate::functions::Reducer;
use crate::windowing::{Collector, GLOBAL_WINDOW};
use serde_json::Value;

/// Field to reducer mapping for an [`Aggregator`].
#[derive(Debug, Clone, Default)]
pub struct AggregatorOptions {
    pub fields: Option<Vec<(FieldSpec, Reducer)>>,
}

impl AggregatorOptions {
    pub fn new() -> Self {
        Self {
            fields: Some(Vec::new()),
        }
    }

    /// Add one field spec and the reducer applied to each of its paths.
    pub fn field(mut self, spec: impl Into<FieldSpec>, reducer: Reducer) -> Self {
        self.fields
            .get_or_insert_with(Vec::new)
            .push((spec.into(), reducer));
        self
    }

    /// Read a mapping of the form
    /// `{"in": "avg", "traffic": {"fields": ["in", "out"], "reducer": "sum"}}`.
    pub fn from_json(value: &Value) -> Result<Self> {
        let mapping = value.as_object().ok_or_else(|| {
            PondError::construction("Aggregator: options.fields must be a mapping")
        })?;

        let mut fields = Vec::with_capacity(mapping.len());
        for (key, entry) in mapping {
            let (spec, reducer_name) = match entry {
                Value::String(name) => (FieldSpec::from(key.as_str()), name),
                Value::Object(group) => {
                    let spec = match group.get("fields") {
                        Some(Value::Array(paths)) => {
                            let paths = paths
                                .iter()
                                .map(|p| p.as_str().map(str::to_string))
                                .collect::<Option<Vec<String>>>()
                                .ok_or_else(|| {
                                    PondError::construction(format!(
                                        "Aggregator: field of unknown type: {}",
                                        key
                                    ))
                                })?;
                            FieldSpec::List(paths)
                        }
                        Some(Value::String(path)) => FieldSpec::from(path.as_str()),
                        _ => {
                            return Err(PondError::construction(format!(
                                "Aggregator: field of unknown type: {}",
                                key
                            )));
                        }
                    };
                    match group.get("reducer") {
                        Some(Value::String(name)) => (spec, name),
                        other => {
                            return Err(PondError::construction(format!(
                                "Aggregator: field values must be a function, got: {}",
                                other.unwrap_or(&Value::Null)
                            )));
                        }
                    }
                }
                other => {
                    return Err(PondError::construction(format!(
                        "Aggregator: field values must be a function, got: {}",
                        other
                    )));
                }
            };
            let reducer = Reducer::by_name(reducer_name).ok_or_else(|| {
                PondError::construction(format!(
                    "Aggregator: {} is not a callable function",
                    reducer_name
                ))
            })?;
            fields.push((spec, reducer));
        }
        Ok(Self {
            fields: Some(fields),
        })
    }
}

/// Feeds events to a [`Collector`] and turns each collection it hands back
/// into one aggregated event.
#[derive(Debug)]
pub struct Aggregator {
    id: String,
    prev: ChainLink,
    observable: Observable,
    fields: Vec<(FieldSpec, Reducer)>,
    utc: bool,
    collector: Collector,
}

impl Aggregator {
    pub fn new(
        pipeline: &PipelineConfig,
        prev: ChainLink,
        options: AggregatorOptions,
    ) -> Result<Self> {
        let fields = options.fields.ok_or_else(|| {
            PondError::construction("Aggregator: constructor needs an aggregator field mapping")
        })?;
        if pipeline.mode == Mode::Stream && pipeline.window.is_global() {
            return Err(PondError::construction(
                "Unable to aggregate/no windowing strategy specified in pipeline",
            ));
        }
        Ok(Self {
            id: unique_id("processor-"),
            prev,
            observable: Observable::new(),
            fields,
            utc: pipeline.utc,
            collector: Collector::new(pipeline),
        })
    }

    fn fresh_copy(&self) -> Self {
        Self {
            id: unique_id("processor-"),
            prev: self.prev.clone(),
            observable: Observable::new(),
            fields: self.fields.clone(),
            utc: self.utc,
            collector: self.collector.reset(),
        }
    }
}

// One output event per collection: each field path reduced over the whole
// collection, stored under its last path segment.
fn aggregate_collection(
    fields: &[(FieldSpec, Reducer)],
    collection: &Collection,
    window_key: &str,
    utc: bool,
) -> Result<AnyEvent> {
    let mut data = Data::new();
    for (spec, reducer) in fields {
        for path in spec.paths() {
            let value = collection.aggregate(reducer, path);
            data.insert(
                terminal_segment(path).to_string(),
                optional_number_value(value),
            );
        }
    }

    if window_key == GLOBAL_WINDOW {
        let range = collection
            .range()
            .ok_or_else(|| PondError::data("Cannot aggregate an empty collection"))?;
        Ok(TimeRangeEvent::new(range, Value::Object(data)).into())
    } else {
        Ok(IndexedEvent::new(window_key, Value::Object(data), utc)?.into())
    }
}

impl Observer for Aggregator {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        if !self.has_observers() {
            return Ok(());
        }
        let fields = &self.fields;
        let utc = self.utc;
        let observable = &mut self.observable;
        self.collector
            .add_event(event, |collection, window_key, group_key| {
                let aggregated = aggregate_collection(fields, collection, window_key, utc)?;
                tracing::trace!(window_key, group_key, "aggregator emitting");
                observable.emit(&aggregated)
            })
    }

    fn flush(&mut self) -> Result<()> {
        let fields = &self.fields;
        let utc = self.utc;
        let observable = &mut self.observable;
        self.collector
            .flush_collections(|collection, window_key, _group_key| {
                let aggregated = aggregate_collection(fields, collection, window_key, utc)?;
                observable.emit(&aggregated)
            })?;
        self.observable.flush()
    }
}

impl_processor!(Aggregator, ProcessorKind::Aggregator);
