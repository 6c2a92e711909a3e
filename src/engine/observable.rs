use crate::error::Result;
use crate::event::AnyEvent;
use std::fmt;

/// Anything that can sit downstream of a chain stage.
pub trait Observer: Send {
    fn id(&self) -> &str;

    fn add_event(&mut self, event: &AnyEvent) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Publish/subscribe base: an owned set of observers, unique by id.
#[derive(Default)]
pub struct Observable {
    observers: Vec<Box<dyn Observer>>,
}

impl Observable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false, dropping `observer`, when one with the same id is
    /// already registered.
    pub fn add_observer(&mut self, observer: Box<dyn Observer>) -> bool {
        if self.observers.iter().any(|o| o.id() == observer.id()) {
            tracing::debug!(id = observer.id(), "observer already registered");
            return false;
        }
        self.observers.push(observer);
        true
    }

    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn observer_ids(&self) -> impl Iterator<Item = &str> {
        self.observers.iter().map(|o| o.id())
    }

    /// Deliver to every observer in registration order. The first error
    /// stops delivery; observers already reached keep what they received.
    pub fn emit(&mut self, event: &AnyEvent) -> Result<()> {
        for observer in &mut self.observers {
            observer.add_event(event)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for observer in &mut self.observers {
            observer.flush()?;
        }
        Ok(())
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.observer_ids()).finish()
    }
}
