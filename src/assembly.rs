//! The joiner (spec.md §4.4 "Prologue splicing", §6 "Emitted file format").
//!
//! Composes the final output from the accumulated per-unit bodies and the
//! job's shared registry: header banner, type-alias prologue, reflective
//! base prologue, per-file bodies wrapped in banner comments, an optional
//! main trampoline, and a trailing SHA-256 banner over the concatenated
//! body bytes.

use sha2::{Digest, Sha256};

use crate::codegen::{prologue, rectify};
use crate::job::Job;

const HEADER_RULE: &str = "==================================================================";
const BODY_FILENAME_WIDTH: usize = 58;

/// One unit's generated body, ready for assembly.
pub struct UnitOutput {
    pub unit_name: String,
    pub body: String,
}

/// Joins every successful unit's output into one target source string
/// (spec.md §7 "The join step must omit failed units").
pub fn assemble(units: &[UnitOutput], job: &Job, title: &str, date: &str) -> String {
    let mut ordered: Vec<&UnitOutput> = units.iter().collect();
    ordered.sort_by(|a, b| a.unit_name.cmp(&b.unit_name));

    let mut out = String::new();
    out.push_str(HEADER_RULE);
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(date);
    out.push('\n');

    out.push_str(&prologue::type_alias_prologue());
    job.with_registry(|registry| {
        out.push_str(&prologue::reflective_base_prologue(registry));
    });

    let mut body_bytes = Vec::new();
    for unit in &ordered {
        let banner = body_banner(&unit.unit_name);
        out.push_str(&banner);
        out.push_str(&unit.body);
        out.push_str(&banner);
        body_bytes.extend_from_slice(unit.body.as_bytes());
    }

    if job.has_main() {
        out.push_str(&main_trampoline());
    }

    out.push_str(&trailing_banner(&body_bytes));
    out
}

fn body_banner(unit_name: &str) -> String {
    let padded = pad_filename(unit_name);
    format!("// ---- {padded} ----\n")
}

fn pad_filename(name: &str) -> String {
    if name.len() >= BODY_FILENAME_WIDTH {
        name.to_string()
    } else {
        let mut padded = name.to_string();
        padded.push_str(&" ".repeat(BODY_FILENAME_WIDTH - name.len()));
        padded
    }
}

/// spec.md §4.4 "Main synthesis": the trampoline forwards to the user's
/// rectified `_main`.
fn main_trampoline() -> String {
    let rectified_main = rectify::rectify_component("main");
    format!(
        "\nint main(int argc, char **argv) {{\n    (void)argc;\n    (void)argv;\n    return {rectified_main}();\n}}\n"
    )
}

fn trailing_banner(body_bytes: &[u8]) -> String {
    let digest = Sha256::digest(body_bytes);
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("\n// sha256: {hex}\n{HEADER_RULE}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_job_still_produces_header_and_trailing_banner() {
        let job = Job::new();
        let text = assemble(&[], &job, "jcc output", "2026-08-01");
        assert!(text.starts_with(HEADER_RULE));
        assert!(text.contains("sha256:"));
        assert!(text.trim_end().ends_with(HEADER_RULE));
    }

    #[test]
    fn omits_main_trampoline_when_no_unit_claimed_main() {
        let job = Job::new();
        let text = assemble(&[], &job, "t", "d");
        assert!(!text.contains("int main(int argc"));
    }

    #[test]
    fn includes_exactly_one_main_trampoline_when_claimed() {
        let job = Job::new();
        job.claim_main().unwrap();
        let text = assemble(&[], &job, "t", "d");
        assert_eq!(text.matches("int main(int argc").count(), 1);
        assert!(text.contains("return _main();"));
    }

    #[test]
    fn units_are_joined_in_deterministic_unit_name_order() {
        let job = Job::new();
        let units = vec![
            UnitOutput { unit_name: "b.j".to_string(), body: "BBB".to_string() },
            UnitOutput { unit_name: "a.j".to_string(), body: "AAA".to_string() },
        ];
        let text = assemble(&units, &job, "t", "d");
        assert!(text.find("AAA").unwrap() < text.find("BBB").unwrap());
    }

    #[test]
    fn trailing_hash_excludes_banner_bytes() {
        let job = Job::new();
        let units = vec![UnitOutput { unit_name: "a.j".to_string(), body: "AAA".to_string() }];
        let text = assemble(&units, &job, "t", "d");
        let expected = format!("{:x}", Sha256::digest(b"AAA"));
        assert!(text.contains(&expected));
    }
}
