use crate::collection::Collection;
use crate::config::{GroupBy, PipelineConfig};
use crate::error::Result;
use crate::event::{AnyEvent, TimedEvent};
use crate::windowing::{EmitPolicy, WindowSpec};
use std::collections::HashMap;

/// Group key reported to callbacks for ungrouped collections.
pub const UNGROUPED: &str = "all";

#[derive(Debug)]
struct OpenGroup {
    window_key: String,
    group_key: Option<String>,
    collection: Collection,
}

/// Buffers events into per-(window, group) collections and hands each one
/// to a callback when the emit policy says it is ready.
///
/// Callbacks receive `(collection, window_key, group_key)`, where the group
/// key is "all" for ungrouped collections.
#[derive(Debug)]
pub struct Collector {
    window: WindowSpec,
    group_by: Option<GroupBy>,
    emit: EmitPolicy,
    utc: bool,
    groups: HashMap<String, OpenGroup>,
    // composite keys in the order they were opened
    order: Vec<String>,
}

impl Collector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            window: config.window.clone(),
            group_by: config.group_by.clone(),
            emit: config.emit,
            utc: config.utc,
            groups: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn emit_policy(&self) -> EmitPolicy {
        self.emit
    }

    /// Composite keys of the groups currently open, oldest first.
    pub fn open_keys(&self) -> &[String] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Same configuration, no open groups.
    pub fn reset(&self) -> Self {
        Self {
            window: self.window.clone(),
            group_by: self.group_by.clone(),
            emit: self.emit,
            utc: self.utc,
            groups: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn add_event<F>(&mut self, event: &AnyEvent, mut on_trigger: F) -> Result<()>
    where
        F: FnMut(&Collection, &str, &str) -> Result<()>,
    {
        let window_key = self.window.window_key(event.timestamp(), self.utc)?;
        let group_key = self.group_by.as_ref().and_then(|g| g.key(event));
        let collection_key = match &group_key {
            Some(group) => format!("{}::{}", window_key, group),
            None => window_key.clone(),
        };

        tracing::trace!(
            key = %collection_key,
            timestamp = event.timestamp(),
            "collector received event"
        );

        let opened = !self.groups.contains_key(&collection_key);
        if opened {
            tracing::debug!(key = %collection_key, "opening group");
            self.groups.insert(
                collection_key.clone(),
                OpenGroup {
                    window_key: window_key.clone(),
                    group_key: group_key.clone(),
                    collection: Collection::new(),
                },
            );
            self.order.push(collection_key.clone());
        }

        if let Some(open) = self.groups.get_mut(&collection_key) {
            open.collection.push(event.clone())?;
        }

        match self.emit {
            EmitPolicy::EachEvent => {
                if let Some(open) = self.groups.get(&collection_key) {
                    on_trigger(
                        &open.collection,
                        &open.window_key,
                        open.group_key.as_deref().unwrap_or(UNGROUPED),
                    )?;
                }
            }
            EmitPolicy::Discard => {}
            EmitPolicy::OnWindowBoundary => {
                if opened {
                    let superseded: Vec<String> = self
                        .order
                        .iter()
                        .filter(|key| {
                            self.groups.get(*key).is_some_and(|g| {
                                g.group_key == group_key && g.window_key != window_key
                            })
                        })
                        .cloned()
                        .collect();
                    for key in superseded {
                        self.close(&key, &mut on_trigger)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Emit every open group, oldest first, and forget them all.
    pub fn flush_collections<F>(&mut self, mut on_trigger: F) -> Result<()>
    where
        F: FnMut(&Collection, &str, &str) -> Result<()>,
    {
        let order = std::mem::take(&mut self.order);
        let mut pending: Vec<OpenGroup> = Vec::with_capacity(order.len());
        for key in order {
            if let Some(open) = self.groups.remove(&key) {
                pending.push(open);
            }
        }
        self.groups.clear();

        tracing::debug!(groups = pending.len(), "flushing collector");
        for open in pending {
            on_trigger(
                &open.collection,
                &open.window_key,
                open.group_key.as_deref().unwrap_or(UNGROUPED),
            )?;
        }
        Ok(())
    }

    fn close<F>(&mut self, key: &str, on_trigger: &mut F) -> Result<()>
    where
        F: FnMut(&Collection, &str, &str) -> Result<()>,
    {
        self.order.retain(|k| k != key);
        if let Some(open) = self.groups.remove(key) {
            tracing::debug!(key, size = open.collection.size(), "window closed, emitting group");
            on_trigger(
                &open.collection,
                &open.window_key,
                open.group_key.as_deref().unwrap_or(UNGROUPED),
            )?;
        }
        Ok(())
    }
}
