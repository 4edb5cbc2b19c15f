//! Identifier rectification (spec.md §4.4 "Name rectification").
//!
//! Every user identifier is emitted with a leading underscore so it can
//! never collide with a target-language keyword; scope separators `::` in
//! a multi-component identifier are preserved and each component is
//! prefixed individually. The transform is pure and injective over valid J
//! identifiers (spec.md invariant 3).
//!
//! spec.md §9 flags the source's own output occasionally doubling the `::`
//! separator (`_ns_2::_ns_3::::_struct_D`); the resolution adopted here
//! (see `SPEC_FULL.md` §4.4) is to collapse adjacent `::` runs produced by
//! joining an already-qualified name with an empty namespace-path segment,
//! so the rectifier never emits more than one separator between components.

/// Rectifies a single identifier component (no `::` inside it).
pub fn rectify_component(name: &str) -> String {
    format!("_{name}")
}

/// Rectifies a possibly namespace-qualified identifier, e.g. `N::A` ->
/// `_N::_A`. Empty components (from an accidental leading/trailing/doubled
/// `::`) are dropped rather than rectified into a bare `_`.
pub fn rectify_qualified(name: &str) -> String {
    name.split("::")
        .filter(|c| !c.is_empty())
        .map(rectify_component)
        .collect::<Vec<_>>()
        .join("::")
}

/// Joins namespace-path components and a local name into one qualified,
/// rectified identifier, collapsing any adjacent `::` that joining empty
/// segments would otherwise introduce.
pub fn rectify_in_namespace(namespace_path: &[String], local_name: &str) -> String {
    let mut components: Vec<&str> = namespace_path.iter().map(String::as_str).collect();
    components.push(local_name);
    components
        .into_iter()
        .filter(|c| !c.is_empty())
        .map(rectify_component)
        .collect::<Vec<_>>()
        .join("::")
}

/// The fully-qualified (un-rectified) name, used as the registry key
/// (spec.md §4.4 step 1: "record the fully-qualified name").
pub fn qualify(namespace_path: &[String], local_name: &str) -> String {
    let mut parts: Vec<&str> = namespace_path.iter().map(String::as_str).filter(|s| !s.is_empty()).collect();
    parts.push(local_name);
    parts.join("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectifies_each_component_of_a_qualified_name() {
        assert_eq!(rectify_qualified("N::A"), "_N::_A");
    }

    #[test]
    fn rectify_in_namespace_never_emits_doubled_separators() {
        let rectified = rectify_in_namespace(&["N".to_string(), "".to_string()], "A");
        assert_eq!(rectified, "_N::_A");
    }

    #[test]
    fn distinct_inputs_rectify_to_distinct_outputs() {
        assert_ne!(rectify_qualified("AB"), rectify_qualified("A_B"));
        assert_ne!(rectify_qualified("N::A"), rectify_qualified("N_A"));
    }

    #[test]
    fn qualify_joins_namespace_path_and_local_name() {
        assert_eq!(qualify(&["N".to_string()], "A"), "N::A");
        assert_eq!(qualify(&[], "A"), "A");
    }
}
