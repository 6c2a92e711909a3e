use crate::collection::Collection;
use crate::config::PipelineConfig;
use crate::engine::chain::unique_id;
use crate::engine::observable::Observer;
use crate::error::Result;
use crate::event::AnyEvent;
use crate::windowing::Collector;
use std::fmt;

type EventCallback = Box<dyn FnMut(&AnyEvent) + Send>;
type CollectionCallback = Box<dyn FnMut(&Collection, &str, &str) + Send>;

/// Terminal stage handing every event to a callback.
pub struct EventOut {
    id: String,
    callback: EventCallback,
}

impl EventOut {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&AnyEvent) + Send + 'static,
    {
        Self {
            id: unique_id("out-"),
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for EventOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventOut").field("id", &self.id).finish()
    }
}

impl Observer for EventOut {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        (self.callback)(event);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Terminal stage that groups events with its own [`Collector`] and hands
/// each collection to a callback as `(collection, window_key, group_key)`.
pub struct CollectionOut {
    id: String,
    collector: Collector,
    callback: CollectionCallback,
}

impl CollectionOut {
    pub fn new<F>(pipeline: &PipelineConfig, callback: F) -> Self
    where
        F: FnMut(&Collection, &str, &str) + Send + 'static,
    {
        Self {
            id: unique_id("out-"),
            collector: Collector::new(pipeline),
            callback: Box::new(callback),
        }
    }
}

impl fmt::Debug for CollectionOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOut")
            .field("id", &self.id)
            .field("collector", &self.collector)
            .finish()
    }
}

impl Observer for CollectionOut {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_event(&mut self, event: &AnyEvent) -> Result<()> {
        let callback = &mut self.callback;
        self.collector
            .add_event(event, |collection, window_key, group_key| {
                callback(collection, window_key, group_key);
                Ok(())
            })
    }

    fn flush(&mut self) -> Result<()> {
        let callback = &mut self.callback;
        self.collector
            .flush_collections(|collection, window_key, group_key| {
                callback(collection, window_key, group_key);
                Ok(())
            })
    }
}
