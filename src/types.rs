//! J scalar type model and target-language mapping (spec.md §4.4).
//!
//! The compiler never models composite types (struct/union/enum names) as
//! anything but opaque strings — they are carried through as written and
//! rectified alongside ordinary identifiers. Only the fixed list of scalar
//! type names is known to this module.

/// One of the closed set of J scalar type names (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bit,
    Byte,
    Short,
    Word,
    Int,
    Dword,
    Long,
    Qword,
    Float,
    Double,
    Intn,
    Uintn,
    Address,
    String,
    Routine,
    Char,
}

const SCALAR_TABLE: &[(&str, ScalarType)] = &[
    ("bit", ScalarType::Bit),
    ("byte", ScalarType::Byte),
    ("short", ScalarType::Short),
    ("word", ScalarType::Word),
    ("int", ScalarType::Int),
    ("dword", ScalarType::Dword),
    ("long", ScalarType::Long),
    ("qword", ScalarType::Qword),
    ("float", ScalarType::Float),
    ("double", ScalarType::Double),
    ("intn", ScalarType::Intn),
    ("uintn", ScalarType::Uintn),
    ("address", ScalarType::Address),
    ("string", ScalarType::String),
    ("routine", ScalarType::Routine),
    ("char", ScalarType::Char),
];

impl ScalarType {
    pub fn from_name(name: &str) -> Option<ScalarType> {
        SCALAR_TABLE.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
    }

    pub fn name(self) -> &'static str {
        SCALAR_TABLE.iter().find(|(_, t)| *t == self).map(|(n, _)| *n).unwrap()
    }

    /// The runtime-prologue-provided alias this scalar type maps to in the
    /// emitted target source (spec.md §4.4 "Scalar J types ... map to
    /// fixed-width aliases provided by the runtime prologue"; scenario B/C
    /// show the alias is the rectified scalar name itself, e.g. `_int`,
    /// with the prologue binding that name to a concrete fixed-width type).
    pub fn target_alias(self) -> String {
        format!("_{}", self.name())
    }

    /// The concrete fixed-width C++ type the prologue binds `target_alias`
    /// to (spec.md §6 "type-alias prologue").
    pub fn underlying_builtin(self) -> &'static str {
        match self {
            ScalarType::Bit => "bool",
            ScalarType::Byte => "std::uint8_t",
            ScalarType::Short => "std::int16_t",
            ScalarType::Word => "std::uint16_t",
            ScalarType::Int => "std::int32_t",
            ScalarType::Dword => "std::uint32_t",
            ScalarType::Long => "std::int64_t",
            ScalarType::Qword => "std::uint64_t",
            ScalarType::Float => "float",
            ScalarType::Double => "double",
            ScalarType::Intn => "std::intptr_t",
            ScalarType::Uintn => "std::uintptr_t",
            ScalarType::Address => "std::uintptr_t",
            ScalarType::String => "std::string",
            ScalarType::Routine => "void*",
            ScalarType::Char => "char",
        }
    }

    /// Declared bit width, used to validate bitfield widths (spec.md §4.3
    /// "Bitfield width must be ... ≤ the bit width of the declared integer
    /// type"). Non-integer scalars return `None`.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            ScalarType::Bit => Some(1),
            ScalarType::Byte | ScalarType::Char => Some(8),
            ScalarType::Short | ScalarType::Word => Some(16),
            ScalarType::Int | ScalarType::Dword => Some(32),
            ScalarType::Long | ScalarType::Qword | ScalarType::Address => Some(64),
            ScalarType::Intn | ScalarType::Uintn => Some(64),
            ScalarType::Float | ScalarType::Double | ScalarType::String | ScalarType::Routine => None,
        }
    }
}

/// Resolves a field/parameter's written type name to a target-language
/// type string: the scalar alias if it names a scalar type, or the
/// rectified composite name otherwise (the caller supplies the already
/// rectified form, since rectification needs no knowledge of scalar-ness).
pub fn resolve_type_name(name: &str, rectify: impl Fn(&str) -> String) -> String {
    match ScalarType::from_name(name) {
        Some(scalar) => scalar.target_alias(),
        None => rectify(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scalar_name_round_trips() {
        for (name, ty) in SCALAR_TABLE {
            assert_eq!(ScalarType::from_name(name), Some(*ty));
            assert_eq!(ty.name(), *name);
        }
    }

    #[test]
    fn non_scalar_name_is_none() {
        assert_eq!(ScalarType::from_name("MyStruct"), None);
    }

    #[test]
    fn bitfield_width_bounds_match_integer_size() {
        assert_eq!(ScalarType::Int.bit_width(), Some(32));
        assert_eq!(ScalarType::Bit.bit_width(), Some(1));
        assert_eq!(ScalarType::Float.bit_width(), None);
    }

    #[test]
    fn resolve_type_name_prefers_scalar_alias_over_rectification() {
        let resolved = resolve_type_name("int", |s| format!("_{s}"));
        assert_eq!(resolved, "_int");
        let resolved = resolve_type_name("Widget", |s| format!("_{s}"));
        assert_eq!(resolved, "_Widget");
    }
}
