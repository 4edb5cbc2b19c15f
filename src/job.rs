//! Job: the owned, thread-safe wrapper around one compilation job's shared
//! state (spec.md §5 "Concurrency model").
//!
//! The registry and the has-main flag are the only state shared across
//! compilation units within a job; everything else (lexing, parsing,
//! per-unit codegen) is purely local to the unit's own call stack. `Job`
//! holds both behind their own `Mutex` so callers can wrap it in an `Arc`
//! and hand it to worker threads — the core itself spawns none.

use std::sync::Mutex;

use crate::registry::{FieldEntry, Registry, RegistrySnapshot, TypeId};

/// Raised when a second unit in the same job attempts to define `main`
/// (spec.md §5 "assignment from false→true must be atomic with a check
/// that yields a fatal diagnostic on double-assignment").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMainError;

impl std::fmt::Display for DuplicateMainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "main is already defined elsewhere in this job")
    }
}

impl std::error::Error for DuplicateMainError {}

/// A snapshot of a job's shared state, for rolling back an aborted unit
/// (spec.md §5 "Cancellation").
pub struct JobSnapshot {
    registry: RegistrySnapshot,
    has_main: bool,
}

/// Shared, lockable state for one compilation job spanning possibly many
/// units. `Send + Sync` by construction (every field is behind a `Mutex`),
/// so a caller holding this behind an `Arc` may distribute units across a
/// thread pool.
pub struct Job {
    registry: Mutex<Registry>,
    has_main: Mutex<bool>,
}

impl Default for Job {
    fn default() -> Self {
        Job::new()
    }
}

impl Job {
    pub fn new() -> Self {
        Job { registry: Mutex::new(Registry::new()), has_main: Mutex::new(false) }
    }

    /// Registers one struct type under the job's shared registry mutex
    /// (spec.md §5 "serialized with a single mutex").
    pub fn register_struct(
        &self,
        qualified_name: &str,
        fields: Vec<FieldEntry>,
    ) -> Result<TypeId, crate::registry::DuplicateTypeNameError> {
        let mut registry = self.registry.lock().expect("registry mutex poisoned");
        registry.register(qualified_name, fields)
    }

    /// Atomically claims the job's single `main` slot. Returns an error if
    /// a unit already claimed it.
    pub fn claim_main(&self) -> Result<(), DuplicateMainError> {
        let mut has_main = self.has_main.lock().expect("has-main mutex poisoned");
        if *has_main {
            return Err(DuplicateMainError);
        }
        *has_main = true;
        Ok(())
    }

    pub fn has_main(&self) -> bool {
        *self.has_main.lock().expect("has-main mutex poisoned")
    }

    /// Runs `f` with read access to the registry. Intended for the joiner
    /// thread after all units have completed (spec.md §5 "Reads during
    /// splicing happen on the joiner thread only, after all worker threads
    /// have completed").
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        let registry = self.registry.lock().expect("registry mutex poisoned");
        f(&registry)
    }

    /// Takes a consistent snapshot of all shared state, for rolling back a
    /// unit that the caller decides to abort.
    pub fn snapshot(&self) -> JobSnapshot {
        let registry = self.registry.lock().expect("registry mutex poisoned").snapshot();
        let has_main = *self.has_main.lock().expect("has-main mutex poisoned");
        JobSnapshot { registry, has_main }
    }

    pub fn restore(&self, snapshot: JobSnapshot) {
        self.registry.lock().expect("registry mutex poisoned").restore(snapshot.registry);
        *self.has_main.lock().expect("has-main mutex poisoned") = snapshot.has_main;
    }
}
