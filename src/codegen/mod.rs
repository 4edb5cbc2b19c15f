//! The code generator (spec.md §4.4).
//!
//! Walks an [`Ast`] with two ambient contexts threaded through every
//! call: `indent` (4 spaces per level) and `namespace_path` (the stack of
//! enclosing subsystem names). It shares a [`Job`] across every unit in a
//! build so the reflective registry and the has-main flag stay consistent
//! job-wide (spec.md §5).

pub mod prologue;
pub mod rectify;

use std::fmt;

use crate::ast::{
    Ast, ArraySize, Block, ClassMemberDeclaration, ClassMethodDeclaration, Declaration,
    Definition, EnumDefinition, Expression, FunctionDefinition, FunctionParameter, Item, Literal,
    Statement, StructDefinition, StructField, SubsystemDefinition, UnionDefinition, Visibility,
};
use crate::job::Job;
use crate::registry::FieldEntry;
use crate::types::{resolve_type_name, ScalarType};

/// Raised when codegen cannot proceed for a reason the parser could not
/// have caught itself (spec.md §5: duplicate fully-qualified struct name,
/// double main).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeGenError {
    DuplicateTypeName(String),
    DuplicateMain,
}

impl fmt::Display for CodeGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeGenError::DuplicateTypeName(name) => {
                write!(f, "type `{name}` is already registered in this job")
            }
            CodeGenError::DuplicateMain => write!(f, "main is already defined elsewhere in this job"),
        }
    }
}

impl std::error::Error for CodeGenError {}

/// Threaded traversal state (spec.md §4.4 "two ambient contexts").
struct Context {
    indent: usize,
    namespace_path: Vec<String>,
}

impl Context {
    fn root() -> Self {
        Context { indent: 0, namespace_path: Vec::new() }
    }

    fn pad(&self) -> String {
        " ".repeat(self.indent * 4)
    }

    fn indented(&self) -> Context {
        Context { indent: self.indent + 1, namespace_path: self.namespace_path.clone() }
    }

    fn nested(&self, name: &str) -> Context {
        let mut namespace_path = self.namespace_path.clone();
        namespace_path.push(name.to_string());
        Context { indent: self.indent + 1, namespace_path }
    }
}

fn rectify_type(name: &str, ctx: &Context) -> String {
    let _ = ctx;
    resolve_type_name(name, rectify::rectify_qualified)
}

fn render_array_suffix(name: &str, size: ArraySize) -> String {
    match size {
        ArraySize::Scalar => name.to_string(),
        ArraySize::Fixed(n) => format!("{name}[{n}]"),
        ArraySize::Dynamic => name.to_string(),
    }
}

fn wraps_in_vector(ty: &str, size: ArraySize) -> String {
    match size {
        ArraySize::Dynamic => format!("std::vector<{ty}>"),
        _ => ty.to_string(),
    }
}

/// Generates one compilation unit's body (no prologue, no banners — those
/// are `assembly`'s job). Returns the rendered text and, on success,
/// whether this unit claimed the job's `main` slot.
pub fn generate_unit(ast: &Ast, job: &Job, unit_name: &str) -> Result<String, CodeGenError> {
    let ctx = Context::root();
    let mut out = String::new();

    for item in &ast.items {
        emit_item(item, job, &ctx, &mut out)?;
    }

    if let Some(main_fn) = ast.root_main_function() {
        job.claim_main().map_err(|_| CodeGenError::DuplicateMain)?;
        let _ = unit_name;
        let _ = main_fn;
    }

    Ok(out)
}

fn emit_item(item: &Item, job: &Job, ctx: &Context, out: &mut String) -> Result<(), CodeGenError> {
    match item {
        Item::Declaration(decl) => emit_declaration(decl, ctx, out),
        Item::Definition(def) => emit_definition(def, job, ctx, out)?,
        Item::Statement(stmt) => emit_statement(stmt, ctx, out),
    }
    Ok(())
}

fn emit_declaration(decl: &Declaration, ctx: &Context, out: &mut String) {
    let pad = ctx.pad();
    match decl {
        Declaration::Type { alias, underlying } => {
            out.push_str(&format!("{pad}using {} = {};\n", rectify::rectify_component(alias), rectify_type(underlying, ctx)));
        }
        Declaration::StructForward { name } => {
            out.push_str(&format!("{pad}class {};\n", rectify::rectify_component(name)));
        }
        Declaration::UnionForward { name } => {
            out.push_str(&format!("{pad}union {};\n", rectify::rectify_component(name)));
        }
        Declaration::EnumForward { name } => {
            out.push_str(&format!("{pad}enum class {};\n", rectify::rectify_component(name)));
        }
        Declaration::Function { name, return_type, params } => {
            let rendered_params = render_params(params, ctx);
            out.push_str(&format!(
                "{pad}{} {}({});\n",
                rectify_type(return_type, ctx),
                rectify::rectify_component(name),
                rendered_params
            ));
        }
        Declaration::Subsystem { name, depends_on } => {
            out.push_str(&format!("{pad}namespace {}; // uses: {}\n", rectify::rectify_component(name), depends_on.join(", ")));
        }
        Declaration::Class { name, members, methods } => {
            emit_class_decl(name, members, methods, ctx, out);
        }
        Declaration::External(external) => {
            out.push_str(&format!("{pad}extern {} {};\n", rectify_type(&external.type_name, ctx), rectify::rectify_component(&external.name)));
        }
        Declaration::Let(let_decl) => {
            let ty = let_decl.type_name.as_deref().map(|t| rectify_type(t, ctx)).unwrap_or_else(|| "auto".to_string());
            let init = let_decl.initializer.as_ref().map(|e| format!(" = {}", render_expression(e))).unwrap_or_default();
            out.push_str(&format!("{pad}{ty} {}{init};\n", rectify::rectify_component(&let_decl.name)));
        }
        Declaration::Var(var_decl) => {
            let ty = var_decl.type_name.as_deref().map(|t| rectify_type(t, ctx)).unwrap_or_else(|| "auto".to_string());
            let init = var_decl.initializer.as_ref().map(|e| format!(" = {}", render_expression(e))).unwrap_or_default();
            out.push_str(&format!("{pad}{ty} {}{init};\n", rectify::rectify_component(&var_decl.name)));
        }
        Declaration::Const(const_decl) => {
            let ty = const_decl.type_name.as_deref().map(|t| rectify_type(t, ctx)).unwrap_or_else(|| "auto".to_string());
            out.push_str(&format!(
                "{pad}const {ty} {} = {};\n",
                rectify::rectify_component(&const_decl.name),
                render_expression(&const_decl.value)
            ));
        }
    }
}

fn emit_class_decl(name: &str, members: &[ClassMemberDeclaration], methods: &[ClassMethodDeclaration], ctx: &Context, out: &mut String) {
    let pad = ctx.pad();
    out.push_str(&format!("{pad}class {} {{\n", rectify::rectify_component(name)));
    let body_ctx = ctx.indented();
    let body_pad = body_ctx.pad();

    let mut last_vis = None;
    for member in members {
        if last_vis != Some(member.visibility) {
            out.push_str(&format!("{body_pad}{}:\n", visibility_label(member.visibility)));
            last_vis = Some(member.visibility);
        }
        let ty = wraps_in_vector(&rectify_type(&member.type_name, &body_ctx), member.array_size);
        let field_text = render_array_suffix(&rectify::rectify_component(&member.name), member.array_size);
        let init = member.default_value_source.as_deref().map(|v| format!(" = {v}")).unwrap_or_default();
        out.push_str(&format!("{body_pad}{ty} {field_text}{init};\n", ));
    }
    for method in methods {
        if last_vis != Some(method.visibility) {
            out.push_str(&format!("{body_pad}{}:\n", visibility_label(method.visibility)));
            last_vis = Some(method.visibility);
        }
        emit_function(&method.function, &body_ctx, out);
    }
    out.push_str(&format!("{pad}}};\n"));
}

fn visibility_label(vis: Visibility) -> &'static str {
    match vis {
        Visibility::Public => "public",
        Visibility::Protected => "protected",
        Visibility::Private => "private",
    }
}

fn emit_definition(def: &Definition, job: &Job, ctx: &Context, out: &mut String) -> Result<(), CodeGenError> {
    match def {
        Definition::Subsystem(sub) => emit_subsystem(sub, job, ctx, out)?,
        Definition::Struct(s) => emit_struct(s, job, ctx, out)?,
        Definition::Enum(e) => emit_enum(e, ctx, out),
        Definition::Union(u) => emit_union(u, ctx, out),
        Definition::Function(f) => emit_function(f, ctx, out),
    }
    Ok(())
}

fn emit_subsystem(sub: &SubsystemDefinition, job: &Job, ctx: &Context, out: &mut String) -> Result<(), CodeGenError> {
    let pad = ctx.pad();
    out.push_str(&format!("{pad}namespace {} {{\n", rectify::rectify_component(&sub.name)));
    let inner_ctx = ctx.nested(&sub.name);
    for item in &sub.items {
        emit_item(item, job, &inner_ctx, out)?;
    }
    out.push_str(&format!("{pad}}}\n"));
    Ok(())
}

/// Struct emission (spec.md §4.4 steps 1-7).
fn emit_struct(def: &StructDefinition, job: &Job, ctx: &Context, out: &mut String) -> Result<(), CodeGenError> {
    let qualified_name = rectify::qualify(&ctx.namespace_path, &def.name);
    let fields: Vec<FieldEntry> = def
        .fields
        .iter()
        .map(|f| FieldEntry {
            name: f.name.clone(),
            type_name: f.type_name.clone(),
            count: field_count(f),
        })
        .collect();

    let typeid = job
        .register_struct(&qualified_name, fields)
        .map_err(|_| CodeGenError::DuplicateTypeName(qualified_name.clone()))?;

    let pad = ctx.pad();
    let class_name = rectify::rectify_component(&def.name);

    if def.packed {
        out.push_str(&format!("{pad}#pragma pack(push, 1)\n"));
    }

    out.push_str(&format!("{pad}class {class_name} : public JcReflectiveBase {{\n"));
    let body_ctx = ctx.indented();
    let body_pad = body_ctx.pad();

    out.push_str(&format!("{body_pad}public:\n"));
    let cctor_pad = body_ctx.indented().pad();
    out.push_str(&format!("{body_pad}static constexpr int kTypeId = {typeid};\n"));
    out.push_str(&format!("{body_pad}{class_name}() {{\n"));
    emit_struct_constructor_body(def, &cctor_pad, out);
    out.push_str(&format!("{body_pad}}}\n"));

    for method in &def.methods {
        emit_function(&method.function, &body_ctx, out);
    }

    for field in &def.fields {
        emit_struct_field(field, &body_ctx, out);
    }

    out.push_str(&format!("{pad}}};\n"));

    if def.packed {
        out.push_str(&format!("{pad}#pragma pack(pop)\n"));
    }

    // A class is incomplete until its own closing brace, so kSize must be a
    // free constant declared after the class, not an in-class static member.
    out.push_str(&format!(
        "{pad}static constexpr std::size_t {class_name}_kSize = sizeof({class_name});\n"
    ));

    Ok(())
}

/// `count` recorded in the registry's field table: array length, or 1 for a
/// scalar or bitfield member (scenario C: "count=8 for `_buf` and count=1
/// for `_flags`").
fn field_count(field: &StructField) -> u32 {
    match field.array_size {
        ArraySize::Fixed(n) => n.max(1),
        ArraySize::Dynamic => 0,
        ArraySize::Scalar => 1,
    }
}

fn emit_struct_constructor_body(def: &StructDefinition, pad: &str, out: &mut String) {
    let names_csv: String = def.fields.iter().map(|f| format!("{},", rectify::rectify_component(&f.name))).collect();
    let types_csv: String = def
        .fields
        .iter()
        .map(|f| format!("{},", resolve_type_name(&f.type_name, rectify::rectify_qualified)))
        .collect();
    let index_csv: String = def
        .fields
        .iter()
        .map(|f| format!("{}:{},", rectify::rectify_component(&f.name), resolve_type_name(&f.type_name, rectify::rectify_qualified)))
        .collect();

    out.push_str(&format!("{pad}set_attribute(\"_index_names\", \"{names_csv}\");\n"));
    out.push_str(&format!("{pad}set_attribute(\"_index_types\", \"{types_csv}\");\n"));
    out.push_str(&format!("{pad}set_attribute(\"_index\", \"{index_csv}\");\n"));

    for field in &def.fields {
        for attr in &field.attributes {
            out.push_str(&format!(
                "{pad}set_attribute(\"{}_{}\", \"{}\");\n",
                rectify::rectify_component(&field.name),
                attr.key,
                attr.value
            ));
        }
    }
}

fn emit_struct_field(field: &StructField, ctx: &Context, out: &mut String) {
    let pad = ctx.pad();
    let ty = rectify_type(&field.type_name, ctx);
    let name = rectify::rectify_component(&field.name);

    if field.bitfield_width > 0 {
        out.push_str(&format!("{pad}{ty} {name} : {};\n", field.bitfield_width));
        return;
    }

    let rendered_ty = wraps_in_vector(&ty, field.array_size);
    let field_text = render_array_suffix(&name, field.array_size);
    let init = field.default_value_source.as_deref().map(|v| format!(" = {v}")).unwrap_or_default();
    out.push_str(&format!("{pad}{rendered_ty} {field_text}{init};\n"));
}

fn emit_enum(def: &EnumDefinition, ctx: &Context, out: &mut String) {
    let pad = ctx.pad();
    out.push_str(&format!(
        "{pad}enum class {} : {} {{\n",
        rectify::rectify_component(&def.name),
        rectify_type(&def.underlying_type, ctx)
    ));
    let item_pad = ctx.indented().pad();
    for item in &def.items {
        let value = item.value.as_ref().map(|e| format!(" = {}", render_expression(e))).unwrap_or_default();
        out.push_str(&format!("{item_pad}{}{value},\n", rectify::rectify_component(&item.name)));
    }
    out.push_str(&format!("{pad}}};\n"));
}

fn emit_union(def: &UnionDefinition, ctx: &Context, out: &mut String) {
    let pad = ctx.pad();
    out.push_str(&format!("{pad}union {} {{\n", rectify::rectify_component(&def.name)));
    let field_pad = ctx.indented().pad();
    for field in &def.fields {
        out.push_str(&format!(
            "{field_pad}{} {};\n",
            rectify_type(&field.type_name, ctx),
            rectify::rectify_component(&field.name)
        ));
    }
    out.push_str(&format!("{pad}}};\n"));
}

/// Function emission (spec.md §4.4 "Function emission").
fn emit_function(def: &FunctionDefinition, ctx: &Context, out: &mut String) {
    let pad = ctx.pad();
    let is_void = def.return_type == "void";
    let return_ty = wraps_in_vector(&rectify_type(&def.return_type, ctx), def.return_array_size);
    let rendered_params = render_params(&def.params, ctx);
    let name = rectify::rectify_component(&def.name);

    out.push_str(&format!("{pad}{return_ty} {name}({rendered_params}) {{\n"));
    let body_ctx = ctx.indented();
    for stmt in &def.body.children {
        emit_statement(stmt, &body_ctx, out);
    }
    if is_void {
        // spec.md invariant 7: every emitted void function body ends with a
        // non-returning construct.
        let loop_pad = body_ctx.pad();
        out.push_str(&format!("{loop_pad}for (;;) {{ }}\n"));
    }
    out.push_str(&format!("{pad}}}\n"));
}

fn render_params(params: &[FunctionParameter], ctx: &Context) -> String {
    params
        .iter()
        .map(|p| render_param(p, ctx))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameter rendering (spec.md §3/§4.4): reference-by-default for user
/// (non-scalar) types, `const` added unless the parameter is mutable.
fn render_param(param: &FunctionParameter, ctx: &Context) -> String {
    let is_scalar = ScalarType::from_name(&param.type_name).is_some();
    let base_ty = wraps_in_vector(&rectify_type(&param.type_name, ctx), param.array_size);
    let reference = if !is_scalar || param.is_reference { "&" } else { "" };
    let const_prefix = if param.is_const { "const " } else { "" };
    let default = param
        .default_value
        .as_ref()
        .map(|e| format!(" = {}", render_expression(e)))
        .unwrap_or_default();
    format!(
        "{const_prefix}{base_ty}{reference} {}{default}",
        render_array_suffix(&rectify::rectify_component(&param.name), ArraySize::Scalar)
    )
}

fn emit_statement(stmt: &Statement, ctx: &Context, out: &mut String) {
    let pad = ctx.pad();
    match stmt {
        Statement::Return { value, .. } => match value {
            Some(expr) => out.push_str(&format!("{pad}return {};\n", render_expression(expr))),
            None => out.push_str(&format!("{pad}return;\n")),
        },
        Statement::Export { target, .. } => {
            out.push_str(&format!("{pad}export {};\n", rectify::rectify_qualified(target)));
        }
        Statement::Block(block) => emit_block(block, ctx, out),
        Statement::Raw { text, .. } => out.push_str(&format!("{pad}{text}\n")),
        Statement::Expression(expr) => out.push_str(&format!("{pad}{};\n", render_expression(expr))),
    }
}

fn emit_block(block: &Block, ctx: &Context, out: &mut String) {
    if !block.render_braces {
        for stmt in &block.children {
            emit_statement(stmt, ctx, out);
        }
        return;
    }
    let pad = ctx.pad();
    out.push_str(&format!("{pad}{{\n"));
    let inner_ctx = ctx.indented();
    for stmt in &block.children {
        emit_statement(stmt, &inner_ctx, out);
    }
    out.push_str(&format!("{pad}}}\n"));
}

fn render_expression(expr: &Expression) -> String {
    match expr {
        Expression::Binary { op, left, right, .. } => {
            format!("({} {op} {})", render_expression(left), render_expression(right))
        }
        Expression::Unary { op, operand, .. } => format!("({op}{})", render_expression(operand)),
        Expression::Cast { target_type, operand, .. } => {
            format!("static_cast<{}>({})", resolve_type_name(target_type, rectify::rectify_qualified), render_expression(operand))
        }
        Expression::Call { callee, args, .. } => {
            let rendered_args = args.iter().map(render_expression).collect::<Vec<_>>().join(", ");
            format!("{}({rendered_args})", rectify::rectify_qualified(callee))
        }
        Expression::Null { .. } => "nullptr".to_string(),
        Expression::Literal { value, .. } => render_literal(value),
        Expression::Name { name, .. } => rectify::rectify_qualified(name),
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::String(bytes) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
        Literal::Char(c) => format!("'{c}'"),
        Literal::Integer(n) => format!("0x{n:x}"),
        Literal::Float(f) => format!("{f}"),
        Literal::Boolean(b) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::diag::DiagnosticSink;

    fn parse_unit(src: &str, file: &str) -> Ast {
        let tokens = lex(std::sync::Arc::from(file), src).expect("lex failed");
        let mut sink = DiagnosticSink::new(file);
        let ast = parse(&tokens, &mut sink, 0).expect("parse failed");
        assert!(sink.is_empty(), "unexpected diagnostics: {:?}", sink.iter().collect::<Vec<_>>());
        ast
    }

    fn generate(src: &str, job: &Job) -> String {
        let ast = parse_unit(src, "t.j");
        generate_unit(&ast, job, "t.j").expect("codegen failed")
    }

    #[test]
    fn empty_source_emits_nothing() {
        let job = Job::new();
        assert_eq!(generate("", &job), "");
    }

    #[test]
    fn single_struct_with_one_int_field_sets_index_attributes() {
        let job = Job::new();
        let text = generate("namespace N { struct A { int a; } }", &job);
        assert!(text.contains("_index_names=\"_a,\""));
        assert!(text.contains("_index_types=\"_int,\""));
        assert!(text.contains("_index=\"_a:_int,\""));
        job.with_registry(|r| {
            assert_eq!(r.typeid_of("N::A"), Some(0));
        });
    }

    #[test]
    fn packed_struct_wraps_pack_pragmas_and_renders_bitfield_and_array() {
        let job = Job::new();
        let text = generate("struct P #[packed \"true\"] { int flags : 3; byte buf[8]; }", &job);
        assert!(text.contains("#pragma pack(push, 1)"));
        assert!(text.contains("#pragma pack(pop)"));
        assert!(text.contains("_int _flags : 3;"));
        assert!(text.contains("_byte _buf[8];"));
        job.with_registry(|r| {
            let fields = r.fields_of(r.typeid_of("P").unwrap()).unwrap();
            let flags = fields.iter().find(|f| f.name == "flags").unwrap();
            let buf = fields.iter().find(|f| f.name == "buf").unwrap();
            assert_eq!(flags.count, 1);
            assert_eq!(buf.count, 8);
        });
    }

    #[test]
    fn void_function_body_ends_with_non_returning_construct() {
        let job = Job::new();
        let text = generate("void spin() { }", &job);
        assert!(text.trim_end().ends_with("for (;;) { }\n}") || text.contains("for (;;) { }"));
    }

    #[test]
    fn duplicate_struct_name_across_units_is_an_error() {
        let job = Job::new();
        generate("struct A { int a; }", &job);
        let ast = parse_unit("struct A { int a; }", "u2.j");
        assert_eq!(generate_unit(&ast, &job, "u2.j"), Err(CodeGenError::DuplicateTypeName("A".to_string())));
    }

    #[test]
    fn second_main_across_units_is_a_fatal_error() {
        let job = Job::new();
        generate("int main() { return 0; }", &job);
        let ast = parse_unit("int main() { return 0; }", "u2.j");
        assert_eq!(generate_unit(&ast, &job, "u2.j"), Err(CodeGenError::DuplicateMain));
    }
}
