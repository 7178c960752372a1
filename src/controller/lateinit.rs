//! # Late Initialization
//!
//! Copies server-defaulted values into the desired spec, only into fields the
//! user left empty. Handlers call the helpers field by field and hand
//! [`LateInitializer::changed`] back to the engine as
//! `resource_late_initialized`; the engine persists the spec only then.
//!
//! Every helper is idempotent: a second pass with the same observation
//! changes nothing.

/// Tracks whether any field was filled in
#[derive(Debug, Default)]
pub struct LateInitializer {
    changed: bool,
}

impl LateInitializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Fill an unset optional field
    pub fn value<T>(&mut self, desired: &mut Option<T>, observed: Option<T>) {
        if desired.is_none() {
            if let Some(observed) = observed {
                *desired = Some(observed);
                self.changed = true;
            }
        }
    }

    /// Fill an empty required string
    pub fn string(&mut self, desired: &mut String, observed: Option<String>) {
        if desired.is_empty() {
            if let Some(observed) = observed.filter(|s| !s.is_empty()) {
                *desired = observed;
                self.changed = true;
            }
        }
    }

    /// Fill an empty collection
    pub fn list<T>(&mut self, desired: &mut Vec<T>, observed: Vec<T>) {
        if desired.is_empty() && !observed.is_empty() {
            *desired = observed;
            self.changed = true;
        }
    }

    /// Recurse into a nested object, creating it only if a field inside gets filled
    pub fn nested<T, F>(&mut self, desired: &mut Option<T>, init: F)
    where
        T: Default,
        F: FnOnce(&mut LateInitializer, &mut T),
    {
        let mut inner = LateInitializer::new();
        match desired {
            Some(value) => init(&mut inner, value),
            None => {
                let mut value = T::default();
                init(&mut inner, &mut value);
                if inner.changed {
                    *desired = Some(value);
                }
            }
        }
        self.changed |= inner.changed;
    }
}
