//! The fixed runtime prologue spliced into every emitted file (spec.md §6
//! "Emitted file format", §4.4 "Prologue splicing").
//!
//! The prologue itself is a closed, hand-written block of target source;
//! the only generated part is the substitution of the registry's contents
//! into its three placeholders. Its correctness as C++-style code is not
//! part of this crate's contract (spec.md §9: "the emitted runtime must
//! provide a way to associate per-type attribute maps ... its correctness
//! is not part of this spec") — this module only has to produce
//! deterministic, well-formed substitution text.

use crate::registry::Registry;
use crate::types::ScalarType;

pub const TYPENAMES_MAPPING_PLACEHOLDER: &str = "!!!/* JCC_TYPENAMES_MAPPING */!!!";
pub const TYPENAMES_MAPPING_REVERSE_PLACEHOLDER: &str = "!!!/* JCC_TYPENAMES_MAPPING_REVERSE */!!!";
pub const REFLECTIVE_ENTRIES_PLACEHOLDER: &str = "!!!/* JCC_REFLECTIVE_ENTRIES */!!!";

const SCALARS: &[ScalarType] = &[
    ScalarType::Bit,
    ScalarType::Byte,
    ScalarType::Short,
    ScalarType::Word,
    ScalarType::Int,
    ScalarType::Dword,
    ScalarType::Long,
    ScalarType::Qword,
    ScalarType::Float,
    ScalarType::Double,
    ScalarType::Intn,
    ScalarType::Uintn,
    ScalarType::Address,
    ScalarType::String,
    ScalarType::Routine,
    ScalarType::Char,
];

/// The type-alias prologue block: a closed set of fixed-width aliases,
/// named after their rectified scalar name so field and constructor-index
/// text can reference them directly (spec.md §6, scenario B/C).
pub fn type_alias_prologue() -> String {
    let mut out = String::new();
    for scalar in SCALARS {
        out.push_str(&format!("using {} = {};\n", scalar.target_alias(), scalar.underlying_builtin()));
    }
    out
}

/// The reflective base prologue, with its three placeholders substituted
/// from the accumulated registry contents, in typeid-allocation order.
pub fn reflective_base_prologue(registry: &Registry) -> String {
    let mut forward = String::new();
    let mut reverse = String::new();
    let mut entries = String::new();

    for (id, name, fields) in registry.ordered_entries() {
        forward.push_str(&format!("    {{\"{name}\", {id}}},\n"));
        reverse.push_str(&format!("    {{{id}, \"{name}\"}},\n"));
        let field_list = fields
            .iter()
            .map(|f| format!("{{\"{}\", \"{}\", {}}}", f.name, f.type_name, f.count))
            .collect::<Vec<_>>()
            .join(", ");
        entries.push_str(&format!("    {{{id}, {{{field_list}}}}},\n"));
    }

    TEMPLATE
        .replace(TYPENAMES_MAPPING_PLACEHOLDER, forward.trim_end_matches('\n'))
        .replace(TYPENAMES_MAPPING_REVERSE_PLACEHOLDER, reverse.trim_end_matches('\n'))
        .replace(REFLECTIVE_ENTRIES_PLACEHOLDER, entries.trim_end_matches('\n'))
}

const TEMPLATE: &str = "\
class JcReflectiveBase {
public:
    static inline const std::unordered_map<std::string, int> kTypeNamesForward = {
!!!/* JCC_TYPENAMES_MAPPING */!!!
    };
    static inline const std::unordered_map<int, std::string> kTypeNamesReverse = {
!!!/* JCC_TYPENAMES_MAPPING_REVERSE */!!!
    };
    static inline const std::unordered_map<int, std::vector<JcFieldEntry>> kFieldTable = {
!!!/* JCC_REFLECTIVE_ENTRIES */!!!
    };
};
";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldEntry;

    #[test]
    fn type_alias_prologue_covers_every_scalar() {
        let text = type_alias_prologue();
        for scalar in SCALARS {
            assert!(text.contains(&scalar.target_alias()));
        }
    }

    #[test]
    fn reflective_base_prologue_substitutes_all_three_placeholders() {
        let mut reg = Registry::new();
        reg.register("N::A", vec![FieldEntry { name: "a".into(), type_name: "int".into(), count: 1 }]).unwrap();
        let text = reflective_base_prologue(&reg);
        assert!(!text.contains(TYPENAMES_MAPPING_PLACEHOLDER));
        assert!(!text.contains(TYPENAMES_MAPPING_REVERSE_PLACEHOLDER));
        assert!(!text.contains(REFLECTIVE_ENTRIES_PLACEHOLDER));
        assert!(text.contains("\"N::A\", 0"));
        assert!(text.contains("0, \"N::A\""));
    }

    #[test]
    fn empty_registry_still_produces_well_formed_prologue() {
        let reg = Registry::new();
        let text = reflective_base_prologue(&reg);
        assert!(text.contains("kTypeNamesForward"));
    }
}
