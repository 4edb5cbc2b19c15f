//! The reflective type registry (spec.md §3 "Reflective registry entries",
//! §5 "Concurrency model", §9 "Avoid process-wide statics").
//!
//! The original system keeps this as global mutable state keyed by
//! namespace-name strings; per spec.md §9 this is instead a single owned
//! table threaded through the generator as explicit context, with locking
//! left to the job wrapper ([`crate::job::Job`]) rather than baked in here.

use std::collections::HashMap;

/// A monotonically assigned identifier for one fully-qualified struct name.
pub type TypeId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEntry {
    pub name: String,
    pub type_name: String,
    /// `max(array_size, 1)` (spec.md §3 "FieldTable").
    pub count: u32,
}

/// Raised when a fully-qualified struct name is registered twice within the
/// same registry (spec.md §3 invariant: "emitting the same qualified name
/// twice within a job is an error").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateTypeNameError {
    pub qualified_name: String,
}

impl std::fmt::Display for DuplicateTypeNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "duplicate struct type name in this job: {}", self.qualified_name)
    }
}

impl std::error::Error for DuplicateTypeNameError {}

/// A snapshot of [`Registry`] state, returned by [`Registry::snapshot`] and
/// consumed by [`Registry::restore`] to roll back an aborted unit (spec.md
/// §5 "Cancellation").
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    forward: HashMap<String, TypeId>,
    reverse: Vec<String>,
    fields: HashMap<TypeId, Vec<FieldEntry>>,
    next_id: TypeId,
}

/// Process-scoped-per-job accumulator of struct typeids and field tables.
///
/// `forward`/`reverse` together form a bijection (spec.md invariant 4):
/// `reverse[forward[name]] == name` for every registered name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    forward: HashMap<String, TypeId>,
    reverse: Vec<String>,
    fields: HashMap<TypeId, Vec<FieldEntry>>,
    next_id: TypeId,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Allocates the next typeid for `qualified_name` and records its field
    /// list. Ids are assigned in first-seen order from a monotonic counter.
    pub fn register(
        &mut self,
        qualified_name: &str,
        fields: Vec<FieldEntry>,
    ) -> Result<TypeId, DuplicateTypeNameError> {
        if self.forward.contains_key(qualified_name) {
            return Err(DuplicateTypeNameError { qualified_name: qualified_name.to_string() });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.forward.insert(qualified_name.to_string(), id);
        self.reverse.push(qualified_name.to_string());
        self.fields.insert(id, fields);
        Ok(id)
    }

    pub fn typeid_of(&self, qualified_name: &str) -> Option<TypeId> {
        self.forward.get(qualified_name).copied()
    }

    pub fn name_of(&self, id: TypeId) -> Option<&str> {
        self.reverse.get(id as usize).map(String::as_str)
    }

    pub fn fields_of(&self, id: TypeId) -> Option<&[FieldEntry]> {
        self.fields.get(&id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Entries in typeid-allocation order, the order the prologue's
    /// placeholder substitution serializes them in.
    pub fn ordered_entries(&self) -> impl Iterator<Item = (TypeId, &str, &[FieldEntry])> {
        self.reverse.iter().enumerate().map(move |(id, name)| {
            let id = id as TypeId;
            (id, name.as_str(), self.fields.get(&id).map(Vec::as_slice).unwrap_or(&[]))
        })
    }

    /// spec.md invariant 4: forward/reverse maps are inverses and every
    /// field-table entry references exactly one typeid.
    pub fn is_bijective(&self) -> bool {
        if self.forward.len() != self.reverse.len() {
            return false;
        }
        self.reverse.iter().enumerate().all(|(id, name)| self.forward.get(name) == Some(&(id as TypeId)))
            && self.fields.keys().all(|id| (*id as usize) < self.reverse.len())
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            forward: self.forward.clone(),
            reverse: self.reverse.clone(),
            fields: self.fields.clone(),
            next_id: self.next_id,
        }
    }

    pub fn restore(&mut self, snapshot: RegistrySnapshot) {
        self.forward = snapshot.forward;
        self.reverse = snapshot.reverse;
        self.fields = snapshot.fields;
        self.next_id = snapshot.next_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_order_allocates_sequential_ids() {
        let mut reg = Registry::new();
        assert_eq!(reg.register("N::A", vec![]).unwrap(), 0);
        assert_eq!(reg.register("N::B", vec![]).unwrap(), 1);
        assert!(reg.is_bijective());
    }

    #[test]
    fn duplicate_qualified_name_is_an_error() {
        let mut reg = Registry::new();
        reg.register("N::A", vec![]).unwrap();
        let err = reg.register("N::A", vec![]).unwrap_err();
        assert_eq!(err.qualified_name, "N::A");
    }

    #[test]
    fn field_count_defaults_to_max_of_array_size_and_one() {
        let mut reg = Registry::new();
        let fields = vec![FieldEntry { name: "a".into(), type_name: "int".into(), count: 1 }];
        let id = reg.register("N::A", fields).unwrap();
        assert_eq!(reg.fields_of(id).unwrap()[0].count, 1);
    }

    #[test]
    fn snapshot_and_restore_roll_back_an_aborted_unit() {
        let mut reg = Registry::new();
        reg.register("N::A", vec![]).unwrap();
        let snap = reg.snapshot();
        reg.register("N::B", vec![]).unwrap();
        assert_eq!(reg.len(), 2);
        reg.restore(snap);
        assert_eq!(reg.len(), 1);
        assert!(reg.typeid_of("N::B").is_none());
    }

    #[test]
    fn ordered_entries_follow_allocation_order() {
        let mut reg = Registry::new();
        reg.register("N::B", vec![]).unwrap();
        reg.register("N::A", vec![]).unwrap();
        let names: Vec<&str> = reg.ordered_entries().map(|(_, name, _)| name).collect();
        assert_eq!(names, vec!["N::B", "N::A"]);
    }
}
