//! Job-level configuration.
//!
//! `ProjectConfig` is the one piece of ambient configuration this crate
//! accepts: the initial `{{KEY}}` substitution table used by the
//! preprocessor (spec.md §4.1) and a couple of strictness toggles. It can be
//! built in code or loaded from TOML with `serde` + `toml`, the same way the
//! teacher crate loads `LintConfig` from TOML in its own lint engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use jcc::ProjectConfig;
//!
//! let config = ProjectConfig::from_toml(r#"
//!     [directives]
//!     VERSION = "1.2.0"
//!     BUILD_PROFILE = "release"
//! "#)?;
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

/// Project-level configuration for a compilation job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    /// Initial `{{KEY}}` -> value substitution table. Directives seen while
    /// preprocessing (`#[KEY "VALUE"]` at brace depth 0) are merged into a
    /// copy of this table as they're encountered, so later occurrences of
    /// `{{KEY}}` see them but earlier ones do not (spec.md: "later-seen
    /// occurrences").
    #[serde(default)]
    pub directives: BTreeMap<String, String>,

    /// If true, a `{{KEY}}` reference to an unknown key is an `Error`
    /// diagnostic. If false (the default) it is a `Warning` and the
    /// placeholder is left verbatim in the output.
    #[serde(default)]
    pub strict_directives: bool,

    /// Minimum severity that causes the job to report overall failure, even
    /// if no unit individually reached `Error`. Defaults to `Error`, matching
    /// spec.md §7's default blocking behavior.
    #[serde(default = "default_fail_threshold")]
    pub fail_threshold: FailThreshold,
}

/// Mirrors `crate::diag::Severity`'s blocking tiers without depending on it,
/// so the config module stays loadable before any diagnostic exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailThreshold {
    Warning,
    #[default]
    Error,
    Fatal,
}

fn default_fail_threshold() -> FailThreshold {
    FailThreshold::Error
}

impl ProjectConfig {
    pub fn new() -> Self {
        ProjectConfig::default()
    }

    pub fn with_directive(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(key.into(), value.into());
        self
    }

    /// Parse project configuration from a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("failed to parse project config: {e}"))
    }

    pub fn severity_blocks_job(&self, severity: crate::diag::Severity) -> bool {
        use crate::diag::Severity::*;
        match self.fail_threshold {
            FailThreshold::Warning => severity >= Warning,
            FailThreshold::Error => severity >= Error,
            FailThreshold::Fatal => severity >= Fatal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_directives() {
        let config = ProjectConfig::new();
        assert!(config.directives.is_empty());
        assert!(!config.strict_directives);
    }

    #[test]
    fn from_toml_parses_directive_table() {
        let config = ProjectConfig::from_toml(
            r#"
            strict_directives = true
            [directives]
            VERSION = "1.2.0"
            "#,
        )
        .unwrap();
        assert_eq!(config.directives.get("VERSION").map(String::as_str), Some("1.2.0"));
        assert!(config.strict_directives);
    }

    #[test]
    fn from_toml_rejects_malformed_input() {
        assert!(ProjectConfig::from_toml("not = [valid").is_err());
    }

    #[test]
    fn fail_threshold_defaults_to_error() {
        let config = ProjectConfig::new();
        assert!(config.severity_blocks_job(crate::diag::Severity::Error));
        assert!(!config.severity_blocks_job(crate::diag::Severity::Warning));
    }
}
