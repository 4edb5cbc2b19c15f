//! Abstract syntax tree (spec.md §3 "AST node kinds").
//!
//! Per the re-architecture guidance in spec.md §9, this is a single sealed
//! sum type visited by free functions (the parser's `parse_*` functions and
//! the code generator's `emit_*` functions) rather than a parallel class
//! hierarchy with per-node virtual methods. Every named entity stores only
//! its own unqualified name; qualification is derived from the traversal
//! context (the code generator's namespace-path), never duplicated here.

use crate::position::SourcePosition;

/// Tri-state array-size encoding shared by fields and parameters.
/// `Scalar` is size 0, `Fixed(n)` is `[n]`, `Dynamic` is the `[]` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySize {
    Scalar,
    Fixed(u32),
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(Vec<u8>),
    Char(char),
    Integer(u64),
    Float(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Binary { op: String, left: Box<Expression>, right: Box<Expression>, position: SourcePosition },
    Unary { op: String, operand: Box<Expression>, position: SourcePosition },
    Cast { target_type: String, operand: Box<Expression>, position: SourcePosition },
    Call { callee: String, args: Vec<Expression>, position: SourcePosition },
    Null { position: SourcePosition },
    Literal { value: Literal, position: SourcePosition },
    /// A bare reference to a name (variable, field, enum item).
    Name { name: String, position: SourcePosition },
}

impl Expression {
    pub fn position(&self) -> &SourcePosition {
        match self {
            Expression::Binary { position, .. }
            | Expression::Unary { position, .. }
            | Expression::Cast { position, .. }
            | Expression::Call { position, .. }
            | Expression::Null { position }
            | Expression::Literal { position, .. }
            | Expression::Name { position, .. } => position,
        }
    }
}

// ---------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Return { value: Option<Expression>, position: SourcePosition },
    Export { target: String, position: SourcePosition },
    Block(Block),
    /// A pass-through fragment of already-rendered target source, used for
    /// constructs the parser recognizes but does not otherwise model.
    Raw { text: String, position: SourcePosition },
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub children: Vec<Statement>,
    /// `false` means the block's contents are emitted inline into the
    /// enclosing scope rather than wrapped in their own `{ }`.
    pub render_braces: bool,
    pub position: SourcePosition,
}

impl Block {
    pub fn braced(children: Vec<Statement>, position: SourcePosition) -> Self {
        Block { children, render_braces: true, position }
    }

    pub fn inline(children: Vec<Statement>, position: SourcePosition) -> Self {
        Block { children, render_braces: false, position }
    }
}

// ---------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub type_name: String,
    /// 0 means "not a bitfield".
    pub bitfield_width: u32,
    pub array_size: ArraySize,
    pub default_value_source: Option<String>,
    pub attributes: Vec<Attribute>,
    pub position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameter {
    pub name: String,
    pub type_name: String,
    pub array_size: ArraySize,
    pub default_value: Option<Expression>,
    pub is_const: bool,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionField {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumItem {
    pub name: String,
    pub value: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMemberDeclaration {
    pub name: String,
    pub type_name: String,
    pub visibility: Visibility,
    pub array_size: ArraySize,
    pub default_value_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMethodDeclaration {
    pub function: FunctionDefinition,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetDeclaration {
    pub name: String,
    pub type_name: Option<String>,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclaration {
    pub name: String,
    pub type_name: Option<String>,
    pub initializer: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDeclaration {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalDeclaration {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Type { alias: String, underlying: String },
    StructForward { name: String },
    UnionForward { name: String },
    EnumForward { name: String },
    Function { name: String, return_type: String, params: Vec<FunctionParameter> },
    Subsystem { name: String, depends_on: Vec<String> },
    Class { name: String, members: Vec<ClassMemberDeclaration>, methods: Vec<ClassMethodDeclaration> },
    External(ExternalDeclaration),
    Let(LetDeclaration),
    Var(VarDeclaration),
    Const(ConstDeclaration),
}

// ---------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StructMethod {
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructAttribute {
    pub field_name: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<StructField>,
    pub methods: Vec<StructMethod>,
    /// If true the generated layout disables padding (spec.md §3
    /// "StructDefinition carries a `packed` flag").
    pub packed: bool,
    pub position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDefinition {
    pub name: String,
    pub underlying_type: String,
    pub items: Vec<EnumItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionDefinition {
    pub name: String,
    pub fields: Vec<UnionField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub return_type: String,
    pub return_array_size: ArraySize,
    pub params: Vec<FunctionParameter>,
    pub body: Block,
    pub position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubsystemDefinition {
    pub name: String,
    pub depends_on: Vec<String>,
    pub items: Vec<Item>,
    pub position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Subsystem(SubsystemDefinition),
    Struct(StructDefinition),
    Enum(EnumDefinition),
    Union(UnionDefinition),
    Function(FunctionDefinition),
}

/// A top-level (or namespace-nested) item: either a forward declaration or
/// a full definition. This is the unit the parser's top-level loop and the
/// code generator's namespace walk both iterate over.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Declaration(Declaration),
    Definition(Definition),
    Statement(Statement),
}

/// The parsed result of one compilation unit: a flat list of top-level
/// items (namespaces nest as `Item::Definition(Definition::Subsystem(..))`
/// carrying their own nested item list).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ast {
    pub items: Vec<Item>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    /// Recursively yields every `StructDefinition` in the tree, depth-first,
    /// carrying the namespace-path components each is nested under.
    pub fn struct_definitions(&self) -> Vec<(Vec<String>, &StructDefinition)> {
        let mut out = Vec::new();
        collect_structs(&self.items, &mut Vec::new(), &mut out);
        out
    }

    /// Finds a top-level (root-namespace) function named `main`, if any,
    /// used by main synthesis (spec.md §4.4).
    pub fn root_main_function(&self) -> Option<&FunctionDefinition> {
        self.items.iter().find_map(|item| match item {
            Item::Definition(Definition::Function(f)) if f.name == "main" => Some(f),
            _ => None,
        })
    }
}

fn collect_structs<'a>(
    items: &'a [Item],
    namespace: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, &'a StructDefinition)>,
) {
    for item in items {
        match item {
            Item::Definition(Definition::Struct(s)) => out.push((namespace.clone(), s)),
            Item::Definition(Definition::Subsystem(sub)) => {
                namespace.push(sub.name.clone());
                collect_structs(&sub.items, namespace, out);
                namespace.pop();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pos() -> SourcePosition {
        SourcePosition::new(Arc::from("a.j"), 1, 1)
    }

    #[test]
    fn struct_definitions_collects_qualified_namespace_path() {
        let inner = StructDefinition {
            name: "A".to_string(),
            fields: vec![],
            methods: vec![],
            packed: false,
            position: pos(),
        };
        let sub = SubsystemDefinition {
            name: "N".to_string(),
            depends_on: vec![],
            items: vec![Item::Definition(Definition::Struct(inner))],
            position: pos(),
        };
        let ast = Ast { items: vec![Item::Definition(Definition::Subsystem(sub))] };
        let found = ast.struct_definitions();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, vec!["N".to_string()]);
        assert_eq!(found[0].1.name, "A");
    }

    #[test]
    fn root_main_function_only_matches_root_namespace() {
        let main_fn = FunctionDefinition {
            name: "main".to_string(),
            return_type: "int".to_string(),
            return_array_size: ArraySize::Scalar,
            params: vec![],
            body: Block::braced(vec![], pos()),
            position: pos(),
        };
        let ast = Ast { items: vec![Item::Definition(Definition::Function(main_fn))] };
        assert!(ast.root_main_function().is_some());
    }
}
