//! Preprocessor (spec.md §4.1).
//!
//! Turns raw source text into text the lexer can consume directly: resolves
//! `#include` directives against an injected [`FileLoader`], expands
//! project-level `{{KEY}}` substitutions, and distinguishes a project
//! directive from a field attribute purely by brace depth (see
//! `SPEC_FULL.md` §4.1 for why that's the resolution to the spec's
//! otherwise-ambiguous `#[KEY "VALUE"]` syntax).
//!
//! This stage performs no I/O itself — `FileLoader` is an injected trait,
//! matching spec.md §5 ("No part of the core performs I/O").

use crate::config::ProjectConfig;
use std::collections::BTreeMap;
use std::fmt;

/// Injected file-loading dependency. The core never touches a filesystem
/// directly; a caller supplies one (backed by `std::fs`, an in-memory map,
/// a VFS, whatever fits the orchestration layer).
pub trait FileLoader {
    fn load(&self, path: &str) -> Result<Vec<u8>, LoadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError;

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file not found")
    }
}

/// Preprocessor failure kinds (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    /// `#include` target could not be resolved by the loader.
    NotFound { path: String, from: String, line: u32 },
    /// The transitive include graph from `from` re-enters `path`.
    Cyclic { path: String, stack: Vec<String> },
    /// A malformed `#include` or `#[KEY "VALUE"]` directive.
    BadToken { from: String, line: u32, detail: String },
    /// A `{{KEY}}` reference to an unregistered key, with
    /// `ProjectConfig.strict_directives` set.
    UnknownDirective { from: String, line: u32, key: String },
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::NotFound { path, from, line } => {
                write!(f, "{from}:{line}: include target not found: {path}")
            }
            PreprocessError::Cyclic { path, stack } => {
                write!(f, "cyclic include detected at {path} (stack: {})", stack.join(" -> "))
            }
            PreprocessError::BadToken { from, line, detail } => {
                write!(f, "{from}:{line}: malformed directive: {detail}")
            }
            PreprocessError::UnknownDirective { from, line, key } => {
                write!(f, "{from}:{line}: unknown directive key '{{{{{key}}}}}'")
            }
        }
    }
}

impl std::error::Error for PreprocessError {}

/// One expanded include's worth of warnings, surfaced as plain strings —
/// the caller attaches them to its own `DiagnosticSink` with real positions
/// once the unit's file name is known up the call stack.
#[derive(Debug)]
pub struct PreprocessOutput {
    pub text: String,
    pub warnings: Vec<(u32, String)>,
}

/// Runs the preprocessor starting from `entry_path`/`entry_source`.
pub fn preprocess(
    entry_path: &str,
    entry_source: &str,
    loader: &dyn FileLoader,
    config: &ProjectConfig,
) -> Result<PreprocessOutput, PreprocessError> {
    let mut directives = config.directives.clone();
    let mut stack = Vec::new();
    let mut warnings = Vec::new();
    let text = process_file(entry_path, entry_source, loader, config, &mut directives, &mut stack, &mut warnings)?;
    Ok(PreprocessOutput { text, warnings })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Normal,
    LineComment,
    BlockComment,
    StringLit(char),
}

fn process_file(
    path: &str,
    source: &str,
    loader: &dyn FileLoader,
    config: &ProjectConfig,
    directives: &mut BTreeMap<String, String>,
    stack: &mut Vec<String>,
    warnings: &mut Vec<(u32, String)>,
) -> Result<String, PreprocessError> {
    if stack.iter().any(|p| p == path) {
        let mut chain = stack.clone();
        chain.push(path.to_string());
        return Err(PreprocessError::Cyclic { path: path.to_string(), stack: chain });
    }
    stack.push(path.to_string());

    let mut out = String::with_capacity(source.len());
    let mut brace_depth: i32 = 0;
    let mut line: u32 = 1;
    let mut mode = Scan::Normal;
    let mut escape_next = false;

    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        match mode {
            Scan::LineComment => {
                out.push(c);
                if c == '\n' {
                    mode = Scan::Normal;
                    line += 1;
                }
                i += 1;
                continue;
            }
            Scan::BlockComment => {
                out.push(c);
                if c == '\n' {
                    line += 1;
                }
                if c == '*' && chars.get(i + 1) == Some(&'/') {
                    out.push('/');
                    i += 2;
                    mode = Scan::Normal;
                    continue;
                }
                i += 1;
                continue;
            }
            Scan::StringLit(q) => {
                out.push(c);
                if escape_next {
                    escape_next = false;
                } else if c == '\\' {
                    escape_next = true;
                } else if c == q {
                    mode = Scan::Normal;
                }
                if c == '\n' {
                    line += 1;
                }
                i += 1;
                continue;
            }
            Scan::Normal => {}
        }

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            mode = Scan::LineComment;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            mode = Scan::BlockComment;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '"' || c == '\'' {
            mode = Scan::StringLit(c);
            out.push(c);
            i += 1;
            continue;
        }
        if c == '{' && chars.get(i + 1) == Some(&'{') && looks_like_substitution(&chars, i) {
            let (consumed, replacement) =
                expand_substitution(&chars, i, directives, config, path, line, warnings)?;
            out.push_str(&replacement);
            i += consumed;
            continue;
        }
        if c == '{' {
            brace_depth += 1;
            out.push(c);
            i += 1;
            continue;
        }
        if c == '}' {
            brace_depth -= 1;
            out.push(c);
            i += 1;
            continue;
        }

        if c == '#' && at_line_start(&chars, i) && matches_keyword(&chars, i + 1, "include") {
            let (consumed, target) = parse_include(&chars, i, path, line)?;
            let bytes = loader.load(&target).map_err(|_| PreprocessError::NotFound {
                path: target.clone(),
                from: path.to_string(),
                line,
            })?;
            let included_source = String::from_utf8(bytes).map_err(|_| PreprocessError::BadToken {
                from: path.to_string(),
                line,
                detail: format!("include target '{target}' is not valid UTF-8"),
            })?;
            let expanded =
                process_file(&target, &included_source, loader, config, directives, stack, warnings)?;
            out.push_str(&expanded);
            i += consumed;
            continue;
        }

        if c == '#' && chars.get(i + 1) == Some(&'[') {
            if brace_depth == 0 {
                let (consumed, key, value) = parse_directive(&chars, i, path, line)?;
                directives.insert(key, value);
                i += consumed;
                continue;
            } else {
                // Field attribute: left untouched for the parser.
                out.push(c);
                i += 1;
                continue;
            }
        }

        if c == '\n' {
            out.push(c);
            line += 1;
            i += 1;
            continue;
        }

        out.push(c);
        i += 1;
    }

    stack.pop();
    Ok(out)
}

fn at_line_start(chars: &[char], i: usize) -> bool {
    let mut j = i;
    while j > 0 {
        j -= 1;
        match chars[j] {
            ' ' | '\t' => continue,
            '\n' => return true,
            _ => return false,
        }
    }
    true
}

fn matches_keyword(chars: &[char], start: usize, kw: &str) -> bool {
    let kw_chars: Vec<char> = kw.chars().collect();
    if start + kw_chars.len() > chars.len() {
        return false;
    }
    chars[start..start + kw_chars.len()] == kw_chars[..]
}

/// Parses `#include <path>` or `#include "path"` starting at the `#`.
/// Returns (chars consumed, resolved path text).
fn parse_include(chars: &[char], start: usize, from: &str, line: u32) -> Result<(usize, String), PreprocessError> {
    let mut i = start + 1 + "include".len();
    while chars.get(i).is_some_and(|c| *c == ' ' || *c == '\t') {
        i += 1;
    }
    let (open, close) = match chars.get(i) {
        Some('<') => ('<', '>'),
        Some('"') => ('"', '"'),
        _ => {
            return Err(PreprocessError::BadToken {
                from: from.to_string(),
                line,
                detail: "expected '<' or '\"' after #include".to_string(),
            });
        }
    };
    let _ = open;
    i += 1;
    let path_start = i;
    while chars.get(i).is_some_and(|c| *c != close) {
        i += 1;
    }
    if chars.get(i) != Some(&close) {
        return Err(PreprocessError::BadToken {
            from: from.to_string(),
            line,
            detail: "unterminated #include target".to_string(),
        });
    }
    let target: String = chars[path_start..i].iter().collect();
    Ok((i + 1 - start, target))
}

/// Parses `#[KEY "VALUE"]` starting at the `#`. Returns (chars consumed, key, value).
fn parse_directive(
    chars: &[char],
    start: usize,
    from: &str,
    line: u32,
) -> Result<(usize, String, String), PreprocessError> {
    let mut i = start + 2; // skip "#["
    let key_start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') {
        i += 1;
    }
    if i == key_start {
        return Err(PreprocessError::BadToken {
            from: from.to_string(),
            line,
            detail: "expected directive key after '#['".to_string(),
        });
    }
    let key: String = chars[key_start..i].iter().collect();
    while chars.get(i).is_some_and(|c| *c == ' ' || *c == '\t') {
        i += 1;
    }
    if chars.get(i) != Some(&'"') {
        return Err(PreprocessError::BadToken {
            from: from.to_string(),
            line,
            detail: "expected '\"' after directive key".to_string(),
        });
    }
    i += 1;
    let val_start = i;
    while chars.get(i).is_some_and(|c| *c != '"') {
        i += 1;
    }
    if chars.get(i) != Some(&'"') {
        return Err(PreprocessError::BadToken {
            from: from.to_string(),
            line,
            detail: "unterminated directive value".to_string(),
        });
    }
    let value: String = chars[val_start..i].iter().collect();
    i += 1;
    while chars.get(i).is_some_and(|c| *c == ' ' || *c == '\t') {
        i += 1;
    }
    if chars.get(i) != Some(&']') {
        return Err(PreprocessError::BadToken {
            from: from.to_string(),
            line,
            detail: "expected ']' to close directive".to_string(),
        });
    }
    i += 1;
    Ok((i - start, key, value))
}

/// True if `{{` at `start` is followed by an identifier and a closing `}}`,
/// i.e. it is really a substitution token and not two adjacent scope braces
/// (`namespace N{struct A{` written without whitespace).
fn looks_like_substitution(chars: &[char], start: usize) -> bool {
    let mut i = start + 2;
    let key_start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') {
        i += 1;
    }
    i > key_start && chars.get(i) == Some(&'}') && chars.get(i + 1) == Some(&'}')
}

/// Expands a `{{KEY}}` reference. An unknown key is a `Warning` unless
/// `ProjectConfig.strict_directives` is set, in which case it aborts
/// preprocessing with `PreprocessError::UnknownDirective` (SPEC_FULL.md
/// §4.1: "a `{{KEY}}` reference to an unknown key is an `Error` diagnostic").
fn expand_substitution(
    chars: &[char],
    start: usize,
    directives: &BTreeMap<String, String>,
    config: &ProjectConfig,
    from: &str,
    line: u32,
    warnings: &mut Vec<(u32, String)>,
) -> Result<(usize, String), PreprocessError> {
    let mut i = start + 2;
    let key_start = i;
    while chars.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_') {
        i += 1;
    }
    let key: String = chars[key_start..i].iter().collect();
    let consumed = i + 2 - start;
    if let Some(value) = directives.get(&key) {
        Ok((consumed, value.clone()))
    } else if config.strict_directives {
        Err(PreprocessError::UnknownDirective { from: from.to_string(), line, key })
    } else {
        let message = format!("unknown directive key '{{{{{key}}}}}'");
        warnings.push((line, message));
        Ok((consumed, chars[start..i + 2].iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapLoader(HashMap<&'static str, &'static str>);

    impl FileLoader for MapLoader {
        fn load(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            self.0.get(path).map(|s| s.as_bytes().to_vec()).ok_or(LoadError)
        }
    }

    #[test]
    fn passes_through_plain_source() {
        let loader = MapLoader(HashMap::new());
        let out = preprocess("a.j", "struct A { int a; }", &loader, &ProjectConfig::new()).unwrap();
        assert_eq!(out.text, "struct A { int a; }");
    }

    #[test]
    fn resolves_quoted_include() {
        let mut files = HashMap::new();
        files.insert("b.j", "struct B {}");
        let loader = MapLoader(files);
        let out = preprocess("a.j", "#include \"b.j\"\nstruct A {}", &loader, &ProjectConfig::new()).unwrap();
        assert!(out.text.contains("struct B {}"));
        assert!(out.text.contains("struct A {}"));
    }

    #[test]
    fn missing_include_is_not_found() {
        let loader = MapLoader(HashMap::new());
        let err = preprocess("a.j", "#include \"missing.j\"", &loader, &ProjectConfig::new()).unwrap_err();
        assert!(matches!(err, PreprocessError::NotFound { .. }));
    }

    #[test]
    fn cyclic_include_is_detected() {
        let mut files = HashMap::new();
        files.insert("a.j", "#include \"b.j\"");
        files.insert("b.j", "#include \"a.j\"");
        let loader = MapLoader(files);
        let err = preprocess("a.j", "#include \"b.j\"", &loader, &ProjectConfig::new()).unwrap_err();
        assert!(matches!(err, PreprocessError::Cyclic { .. }));
    }

    #[test]
    fn top_level_directive_is_stripped_and_substituted_later() {
        let loader = MapLoader(HashMap::new());
        let src = "#[VERSION \"1.0\"]\nconst string v = \"{{VERSION}}\";";
        let out = preprocess("a.j", src, &loader, &ProjectConfig::new()).unwrap();
        assert!(!out.text.contains("#[VERSION"));
        assert!(out.text.contains("\"1.0\""));
    }

    #[test]
    fn field_attribute_inside_braces_survives_untouched() {
        let loader = MapLoader(HashMap::new());
        let src = "struct A { #[RANGE \"0..9\"] int a; }";
        let out = preprocess("a.j", src, &loader, &ProjectConfig::new()).unwrap();
        assert!(out.text.contains("#[RANGE \"0..9\"]"));
    }

    #[test]
    fn unknown_substitution_key_warns_and_is_left_verbatim() {
        let loader = MapLoader(HashMap::new());
        let out = preprocess("a.j", "int x = {{MISSING}};", &loader, &ProjectConfig::new()).unwrap();
        assert!(out.text.contains("{{MISSING}}"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn unknown_substitution_key_is_fatal_when_strict() {
        let loader = MapLoader(HashMap::new());
        let mut config = ProjectConfig::new();
        config.strict_directives = true;
        let err = preprocess("a.j", "int x = {{MISSING}};", &loader, &config).unwrap_err();
        assert!(matches!(err, PreprocessError::UnknownDirective { ref key, .. } if key == "MISSING"));
    }

    #[test]
    fn known_directive_still_substitutes_when_strict() {
        let loader = MapLoader(HashMap::new());
        let mut config = ProjectConfig::new();
        config.strict_directives = true;
        let src = "#[VERSION \"1.0\"]\nconst string v = \"{{VERSION}}\";";
        let out = preprocess("a.j", src, &loader, &config).unwrap();
        assert!(out.text.contains("\"1.0\""));
    }

    #[test]
    fn substitution_does_not_see_directives_defined_later() {
        let loader = MapLoader(HashMap::new());
        let src = "int early = {{K}}; #[K \"9\"]\nint late = {{K}};";
        let out = preprocess("a.j", src, &loader, &ProjectConfig::new()).unwrap();
        assert!(out.text.contains("int early = {{K}};"));
        assert!(out.text.contains("int late = 9;"));
    }

    /// A filesystem-backed loader, exercised against a real temp directory so
    /// `#include` resolution is tested against actual file I/O and not just
    /// an in-memory map.
    struct FsLoader {
        root: std::path::PathBuf,
    }

    impl FileLoader for FsLoader {
        fn load(&self, path: &str) -> Result<Vec<u8>, LoadError> {
            std::fs::read(self.root.join(path)).map_err(|_| LoadError)
        }
    }

    #[test]
    fn resolves_include_from_a_real_directory_tree() {
        use tempfile::tempdir;

        let project_root = tempdir().unwrap();
        std::fs::create_dir_all(project_root.path().join("lib")).unwrap();
        std::fs::write(project_root.path().join("lib/helper.j"), "struct Helper {}").unwrap();

        let loader = FsLoader { root: project_root.path().to_path_buf() };
        let out = preprocess(
            "main.j",
            "#include \"lib/helper.j\"\nstruct Main {}",
            &loader,
            &ProjectConfig::new(),
        )
        .unwrap();

        assert!(out.text.contains("struct Helper {}"));
        assert!(out.text.contains("struct Main {}"));
    }

    #[test]
    fn missing_file_on_disk_is_not_found() {
        use tempfile::tempdir;

        let project_root = tempdir().unwrap();
        let loader = FsLoader { root: project_root.path().to_path_buf() };
        let err = preprocess("main.j", "#include \"missing.j\"", &loader, &ProjectConfig::new()).unwrap_err();
        assert!(matches!(err, PreprocessError::NotFound { .. }));
    }
}
