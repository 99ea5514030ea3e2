use std::collections::HashMap;

use verdant_core::{LastValues, Reading};

use crate::builtin;
use crate::error::{Result, WorkerError};

/// Opaque constructor parameters from the jobs file (`"params": {...}`).
pub type Params = serde_json::Map<String, serde_json::Value>;

/// The capability a sensor/actuator driver implements.
///
/// The scheduler calls `acquire` immediately before `do_work` and `release`
/// immediately after, on every exit path — no driver resource outlives a
/// single invocation.
pub trait Worker: Send {
    /// Claim the underlying resource (bus handle, file, GPIO line).
    fn acquire(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release whatever `acquire` claimed. Must be infallible.
    fn release(&mut self) {}

    /// Perform one unit of work. `last_values` holds the most recent reading
    /// of every sensor, including ones produced earlier in the same tick.
    /// `Ok(None)` means "no new reading" and is not an error.
    fn do_work(&mut self, last_values: &LastValues) -> Result<Option<Reading>>;
}

impl std::fmt::Debug for dyn Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Worker")
    }
}

type Constructor = fn(&Params) -> Result<Box<dyn Worker>>;

/// Name → constructor map, built once at startup.
///
/// Unknown class names fail at config validation time rather than at the
/// job's first scheduled run.
pub struct WorkerRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl WorkerRegistry {
    /// Empty registry; callers register their own drivers.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in drivers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("ThermalZone", builtin::thermal_zone);
        registry.register("Dewpoint", builtin::dewpoint);
        registry.register("Fixed", builtin::fixed);
        registry
    }

    pub fn register(&mut self, class: &'static str, ctor: Constructor) {
        self.constructors.insert(class, ctor);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Instantiate a worker by class name.
    pub fn build(&self, class: &str, params: &Params) -> Result<Box<dyn Worker>> {
        let ctor = self
            .constructors
            .get(class)
            .ok_or_else(|| WorkerError::UnknownClass(class.to_string()))?;
        ctor(params)
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_class_is_rejected() {
        let registry = WorkerRegistry::with_builtins();
        let err = registry.build("Bme9000", &Params::new()).unwrap_err();
        assert!(matches!(err, WorkerError::UnknownClass(_)));
    }

    #[test]
    fn builtins_are_registered() {
        let registry = WorkerRegistry::with_builtins();
        assert!(registry.contains("ThermalZone"));
        assert!(registry.contains("Dewpoint"));
        assert!(registry.contains("Fixed"));
    }
}
