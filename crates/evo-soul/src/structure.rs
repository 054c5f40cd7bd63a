//! Structural validation of the persona document
//!
//! Checks, in order:
//! - mandatory sections are present
//! - every bullet has a recognised tag at the end of the line
//! - no tag sits at the start of a bullet (a malformed prior edit)
//! - subsections have a parent section (warning)
//! - section headers are unique (warning)
//!
//! Optionally saves or checks an immutability snapshot in the same run.

use crate::document::{BulletTag, SoulDocument};
use crate::snapshot::ImmutableSnapshot;
use evo_core::report::preview;
use evo_core::{Finding, ValidationReport, ValidatorConfig};
use std::path::Path;

/// Snapshot action to combine with structural validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMode<'a> {
    /// Structural validation only
    Off,
    /// Save current immutable bullets and skip validation
    Save(&'a Path),
    /// Compare current immutable bullets against a saved snapshot
    Check(&'a Path),
}

/// Validate a parsed document
#[must_use]
pub fn validate_structure(doc: &SoulDocument, file: &str, config: &ValidatorConfig) -> ValidationReport {
    let mut report = ValidationReport::new(file);

    for section in &config.required_sections {
        if !doc.has_section(section) {
            report.push(
                Finding::error(format!("Missing required section: {section}")).field("structure"),
            );
        }
    }

    let mut untagged = 0usize;
    for bullet in doc.bullets() {
        match &bullet.tag {
            None => {
                untagged += 1;
                report.push(
                    Finding::error(format!(
                        "Line {}: Bullet has no [CORE] or [MUTABLE] tag: \"{}...\"",
                        bullet.line,
                        preview(&bullet.text, 60)
                    ))
                    .at_line(bullet.line)
                    .field("tag"),
                );
            }
            Some(BulletTag::Unrecognized(marker)) => report.push(
                Finding::error(format!(
                    "Line {}: Invalid tag \"{marker}\" (valid: [CORE], [MUTABLE])",
                    bullet.line
                ))
                .at_line(bullet.line)
                .field("tag"),
            ),
            Some(_) => {}
        }

        if bullet.has_leading_tag() {
            report.push(
                Finding::error(format!(
                    "Line {}: Tag is at START of bullet (must be at END): \"{}\"",
                    bullet.line,
                    preview(&bullet.text, 60)
                ))
                .at_line(bullet.line)
                .field("tag_position"),
            );
        }
    }

    for orphan in doc.orphan_subsections() {
        report.push(
            Finding::warning(format!(
                "Subsection without parent section: \"{}\"",
                preview(&orphan.text, 60)
            ))
            .at_line(orphan.line),
        );
    }

    for duplicate in doc.duplicate_sections() {
        report.push(
            Finding::warning(format!(
                "Duplicate section header: \"{}\" (merged with first occurrence)",
                duplicate.text
            ))
            .at_line(duplicate.line),
        );
    }

    report.set_stat("sections", doc.section_count());
    report.set_stat("total_bullets", doc.bullets().len());
    report.set_stat("core_bullets", doc.count_tag(&BulletTag::Immutable));
    report.set_stat("mutable_bullets", doc.count_tag(&BulletTag::Mutable));
    report.set_stat("untagged_bullets", untagged);
    report
}

/// Validate a document file, optionally saving or checking a snapshot
///
/// Never fails with an error: an unreadable document or snapshot becomes a
/// FAIL report.
#[must_use]
pub fn validate_soul(path: &Path, mode: SnapshotMode<'_>, config: &ValidatorConfig) -> ValidationReport {
    let file = path.display().to_string();
    let doc = match SoulDocument::load(path) {
        Ok(doc) => doc,
        Err(e) if e.is_not_found() => {
            return ValidationReport::unreadable(file.clone(), format!("File not found: {file}"))
        }
        Err(e) => return ValidationReport::unreadable(file, e.to_string()),
    };
    let current = ImmutableSnapshot::capture(&doc);

    match mode {
        SnapshotMode::Save(snapshot_path) => {
            return match current.save(snapshot_path) {
                Ok(()) => ValidationReport::new(file)
                    .with_stat("action", "snapshot_saved")
                    .with_stat("path", snapshot_path.display().to_string())
                    .with_stat("core_count", current.len()),
                Err(e) => ValidationReport::unreadable(file, format!("Could not save snapshot: {e}")),
            };
        }
        SnapshotMode::Check(snapshot_path) => {
            let mut report = validate_structure(&doc, &file, config);
            match ImmutableSnapshot::load(snapshot_path) {
                Ok(saved) => {
                    let violations = saved.compare(&current, config.match_prefix_len);
                    tracing::info!(
                        "snapshot check against {}: {} violation(s)",
                        snapshot_path.display(),
                        violations.len()
                    );
                    report.extend(violations.into_iter().map(|v| v.into_finding()));
                }
                Err(e) if e.is_not_found() => report.push(
                    Finding::error(format!(
                        "Snapshot file not found: {}",
                        snapshot_path.display()
                    ))
                    .field("[CORE]"),
                ),
                Err(e) => report.push(Finding::error(format!("Unusable snapshot: {e}")).field("[CORE]")),
            }
            report
        }
        SnapshotMode::Off => validate_structure(&doc, &file, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_core::Status;

    const VALID: &str = "## Personality
- Curious about people [MUTABLE]
## Philosophy
- Always act with integrity [CORE]
## Boundaries
- Never share private data [CORE]
## Continuity
- Keeps a journal [MUTABLE]
";

    #[test]
    fn valid_document_passes() {
        let doc = SoulDocument::parse(VALID);
        let report = validate_structure(&doc, "SOUL.md", &ValidatorConfig::default());
        assert_eq!(report.status, Status::Pass, "{:?}", report.errors);
        assert_eq!(report.stats["core_bullets"], 2);
        assert_eq!(report.stats["mutable_bullets"], 2);
        assert_eq!(report.stats["sections"], 4);
    }

    #[test]
    fn missing_section_fails() {
        let doc = SoulDocument::parse(&VALID.replace("## Continuity", "## Memory"));
        let report = validate_structure(&doc, "SOUL.md", &ValidatorConfig::default());
        assert!(report.has_error_containing("Missing required section: ## Continuity"));
    }

    #[test]
    fn tag_defects_are_errors() {
        let text = format!("{VALID}- [MUTABLE] Leading tag\n- Untagged\n- Odd [LEGACY]\n");
        let report = validate_structure(&SoulDocument::parse(&text), "SOUL.md", &ValidatorConfig::default());
        assert!(report.has_error_containing("Tag is at START of bullet"));
        assert!(report.has_error_containing("Bullet has no [CORE] or [MUTABLE] tag"));
        assert!(report.has_error_containing("Invalid tag \"[LEGACY]\""));
        assert_eq!(report.stats["untagged_bullets"], 2);
    }

    #[test]
    fn orphan_subsection_is_warning_only() {
        let text = format!("### Stray\n{VALID}");
        let report = validate_structure(&SoulDocument::parse(&text), "SOUL.md", &ValidatorConfig::default());
        assert_eq!(report.status, Status::Pass);
        assert!(report.has_warning_containing("Subsection without parent section"));
    }
}
