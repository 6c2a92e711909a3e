use crate::engine::observable::{Observable, Observer};
use crate::error::{PondError, Result};
use crate::event::AnyEvent;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique id such as "processor-12".
pub(crate) fn unique_id(prefix: &str) -> String {
    format!("{}{}", prefix, NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// The eight processor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorKind {
    Offset,
    Selector,
    Collapser,
    Filter,
    Mapper,
    Taker,
    Converter,
    Aggregator,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The source a chain is rooted at.
#[derive(Debug, PartialEq, Eq)]
pub struct PipelineInput {
    id: String,
    name: String,
}

impl PipelineInput {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: unique_id("in-"),
            name: name.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Immutable description of an upstream stage, kept by its successor.
#[derive(Debug)]
pub struct StageInfo {
    id: String,
    kind: ProcessorKind,
    prev: ChainLink,
}

impl StageInfo {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ProcessorKind {
        self.kind
    }

    pub fn prev(&self) -> &ChainLink {
        &self.prev
    }
}

/// What a stage was constructed from. Links only ever point upstream, so a
/// chain built from them cannot loop.
#[derive(Debug, Clone)]
pub enum ChainLink {
    Predecessor(Arc<StageInfo>),
    PipelineInput(Arc<PipelineInput>),
    /// No recognised upstream; walking the chain through it fails.
    Unlinked,
}

/// One element of a reconstructed chain, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEntry {
    Input { id: String, name: String },
    Stage { id: String, kind: ProcessorKind },
}

/// A chain stage: consumes events, emits zero or more results to its
/// observers and remembers where it was linked from.
pub trait Processor: Observer {
    fn kind(&self) -> ProcessorKind;

    fn prev(&self) -> &ChainLink;

    fn observable(&self) -> &Observable;

    fn observable_mut(&mut self) -> &mut Observable;

    /// Same configuration and predecessor, fresh id and reset state, no observers.
    fn clone_processor(&self) -> Box<dyn Processor>;

    fn into_observer(self: Box<Self>) -> Box<dyn Observer>;

    /// Link for a stage constructed downstream of this one.
    fn link(&self) -> ChainLink {
        ChainLink::Predecessor(Arc::new(StageInfo {
            id: self.id().to_string(),
            kind: self.kind(),
            prev: self.prev().clone(),
        }))
    }

    /// Walk predecessor links back to the pipeline input. Returned root first,
    /// ending with this stage.
    fn chain(&self) -> Result<Vec<ChainEntry>> {
        let mut entries = vec![ChainEntry::Stage {
            id: self.id().to_string(),
            kind: self.kind(),
        }];
        let mut link = self.prev().clone();
        loop {
            match link {
                ChainLink::Predecessor(info) => {
                    entries.push(ChainEntry::Stage {
                        id: info.id.clone(),
                        kind: info.kind,
                    });
                    link = info.prev.clone();
                }
                ChainLink::PipelineInput(input) => {
                    entries.push(ChainEntry::Input {
                        id: input.id.clone(),
                        name: input.name.clone(),
                    });
                    break;
                }
                ChainLink::Unlinked => {
                    return Err(PondError::chain(format!(
                        "Chain above {} does not reach a processor or a pipeline input",
                        self.id()
                    )));
                }
            }
        }
        entries.reverse();
        Ok(entries)
    }

    fn has_observers(&self) -> bool {
        self.observable().has_observers()
    }

    /// Register a downstream observer. An observer that is this stage or one
    /// of its predecessors would close a loop and is rejected.
    fn add_observer(&mut self, observer: Box<dyn Observer>) -> Result<()> {
        if observer.id() == self.id() || upstream_ids(self.prev()).any(|id| id == observer.id()) {
            return Err(PondError::chain(format!(
                "Adding {} below {} would create a cycle",
                observer.id(),
                self.id()
            )));
        }
        self.observable_mut().add_observer(observer);
        Ok(())
    }

    fn emit(&mut self, event: &AnyEvent) -> Result<()> {
        self.observable_mut().emit(event)
    }
}

fn upstream_ids(link: &ChainLink) -> impl Iterator<Item = &str> {
    let mut current = Some(link);
    std::iter::from_fn(move || match current.take()? {
        ChainLink::Predecessor(info) => {
            current = Some(&info.prev);
            Some(info.id.as_str())
        }
        ChainLink::PipelineInput(input) => Some(input.id.as_str()),
        ChainLink::Unlinked => None,
    })
}

/// Implements the [`Processor`] plumbing for a struct with `prev`,
/// `observable` fields and a `fresh_copy` method.
macro_rules! impl_processor {
    ($ty:ty, $kind:expr) => {
        impl $crate::engine::chain::Processor for $ty {
            fn kind(&self) -> $crate::engine::chain::ProcessorKind {
                $kind
            }

            fn prev(&self) -> &$crate::engine::chain::ChainLink {
                &self.prev
            }

            fn observable(&self) -> &$crate::engine::observable::Observable {
                &self.observable
            }

            fn observable_mut(&mut self) -> &mut $crate::engine::observable::Observable {
                &mut self.observable
            }

            fn clone_processor(&self) -> Box<dyn $crate::engine::chain::Processor> {
                Box::new(self.fresh_copy())
            }

            fn into_observer(self: Box<Self>) -> Box<dyn $crate::engine::observable::Observer> {
                self
            }
        }
    };
}

pub(crate) use impl_processor;
