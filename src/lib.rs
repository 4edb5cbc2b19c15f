//! jcc: a source-to-source compiler front end for the J language.
//!
//! Turns J source into target-language (C++-style) source text. The core
//! pipeline is strictly sequential within one compilation unit —
//! preprocess, lex, parse, generate — and performs no I/O of its own; file
//! loading is an injected [`preprocess::FileLoader`], and the orchestration
//! layer (not this crate) decides how units are distributed across workers
//! and how the resulting source is handed to a downstream compiler.
//!
//! ```rust,ignore
//! use jcc::{Job, ProjectConfig, compile_unit};
//!
//! let job = Job::new();
//! let config = ProjectConfig::new();
//! let outcome = compile_unit("a.j", "namespace N { struct A { int a; } }", &loader, &config, &job, 0)?;
//! ```

pub mod assembly;
pub mod ast;
pub mod base58;
pub mod codegen;
pub mod config;
pub mod diag;
pub mod job;
pub mod lexer;
pub mod parser;
pub mod position;
pub mod preprocess;
pub mod registry;
pub mod types;

pub use ast::Ast;
pub use config::ProjectConfig;
pub use diag::{Diagnostic, DiagnosticSink, Severity};
pub use job::Job;
pub use preprocess::FileLoader;

use std::sync::Arc;
use tracing::{info_span, instrument};

/// The outcome of compiling one unit: either rendered target source, or a
/// diagnostic sink whose contents explain why nothing was emitted (spec.md
/// §7: "A unit that produced at least one Error diagnostic does not emit
/// target source").
pub struct UnitOutcome {
    pub body: Option<String>,
    pub diagnostics: DiagnosticSink,
}

/// Runs the full pipeline for one compilation unit: preprocess, lex, parse,
/// generate. `timestamp` is a caller-supplied unix-seconds value threaded
/// into every diagnostic's long-hash (spec.md invariant 9); this crate
/// performs no clock reads itself.
#[instrument(skip(entry_source, loader, config, job), fields(unit = unit_name))]
pub fn compile_unit(
    unit_name: &str,
    entry_source: &str,
    loader: &dyn FileLoader,
    config: &ProjectConfig,
    job: &Job,
    timestamp: u32,
) -> UnitOutcome {
    let mut sink = DiagnosticSink::new(unit_name);

    let preprocessed = {
        let _span = info_span!("preprocess").entered();
        match preprocess::preprocess(unit_name, entry_source, loader, config) {
            Ok(output) => {
                for (line, message) in output.warnings {
                    let line = line.max(1);
                    let position = Some(position::SourcePosition::new(Arc::from(unit_name), line, 1));
                    sink.push(Diagnostic::new(Severity::Warning, message, position, timestamp));
                }
                output.text
            }
            Err(err) => {
                sink.push(Diagnostic::new(Severity::Error, err.to_string(), None, timestamp));
                return UnitOutcome { body: None, diagnostics: sink };
            }
        }
    };

    let tokens = {
        let _span = info_span!("lex").entered();
        match lexer::lex(Arc::from(unit_name), &preprocessed) {
            Ok(tokens) => tokens,
            Err(err) => {
                sink.push(Diagnostic::new(Severity::Error, err.to_string(), None, timestamp));
                return UnitOutcome { body: None, diagnostics: sink };
            }
        }
    };

    let ast = {
        let _span = info_span!("parse").entered();
        match parser::parse(&tokens, &mut sink, timestamp) {
            Ok(ast) => ast,
            Err(err) => {
                sink.push(Diagnostic::new(Severity::Error, err.to_string(), None, timestamp));
                return UnitOutcome { body: None, diagnostics: sink };
            }
        }
    };

    if sink.blocks_emission() {
        return UnitOutcome { body: None, diagnostics: sink };
    }

    let _span = info_span!("codegen").entered();
    match codegen::generate_unit(&ast, job, unit_name) {
        Ok(body) => UnitOutcome { body: Some(body), diagnostics: sink },
        Err(err) => {
            let mut diagnostic = Diagnostic::new(Severity::Fatal, err.to_string(), None, timestamp);
            if let Some(symbols) = capture_stack_symbols() {
                diagnostic = diagnostic.with_stack_symbols(symbols);
            }
            sink.push(diagnostic);
            UnitOutcome { body: None, diagnostics: sink }
        }
    }
}

/// Populates a `Fatal` diagnostic's stack-symbol list from the current
/// backtrace when `RUST_BACKTRACE` is set (spec.md §7 "a stack-symbol list
/// if available"). Never influences control flow, only diagnostic payload.
fn capture_stack_symbols() -> Option<Vec<String>> {
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        return None;
    }
    let backtrace = std::backtrace::Backtrace::force_capture();
    let rendered = backtrace.to_string();
    if rendered.trim().is_empty() {
        None
    } else {
        Some(rendered.lines().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preprocess::LoadError;

    struct NoopLoader;
    impl FileLoader for NoopLoader {
        fn load(&self, _path: &str) -> Result<Vec<u8>, LoadError> {
            Err(LoadError)
        }
    }

    #[test]
    fn empty_source_succeeds_with_no_diagnostics_above_info() {
        let job = Job::new();
        let config = ProjectConfig::new();
        let outcome = compile_unit("empty.j", "", &NoopLoader, &config, &job, 0);
        assert_eq!(outcome.body, Some(String::new()));
        assert!(outcome.diagnostics.max_severity().is_none());
    }

    #[test]
    fn struct_unit_registers_its_type_in_the_shared_job() {
        let job = Job::new();
        let config = ProjectConfig::new();
        let outcome = compile_unit("a.j", "namespace N { struct A { int a; } }", &NoopLoader, &config, &job, 0);
        assert!(outcome.body.is_some());
        job.with_registry(|r| assert_eq!(r.typeid_of("N::A"), Some(0)));
    }

    #[test]
    fn second_unit_defining_main_is_fatal() {
        let job = Job::new();
        let config = ProjectConfig::new();
        let first = compile_unit("u1.j", "int main() { return 0; }", &NoopLoader, &config, &job, 0);
        assert!(first.body.is_some());
        let second = compile_unit("u2.j", "int main() { return 0; }", &NoopLoader, &config, &job, 0);
        assert!(second.body.is_none());
        assert!(second.diagnostics.has_fatal());
    }

    #[test]
    fn malformed_source_blocks_emission_without_panicking() {
        let job = Job::new();
        let config = ProjectConfig::new();
        let outcome = compile_unit("bad.j", "struct { }", &NoopLoader, &config, &job, 0);
        assert!(outcome.body.is_none());
        assert!(outcome.diagnostics.blocks_emission());
    }
}
