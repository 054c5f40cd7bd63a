//! Promotion and reflection tracking for significant entries
//!
//! Notable and pivotal journal entries must be copied into the significant
//! log and eventually reflected upon. Pivotal entries need immediate
//! reflection; notable entries may queue up to a configured backlog.

use crate::index::{JournalIndex, Significance};
use evo_core::jsonl::{collect_ids, read_json_lines};
use evo_core::{Finding, ValidationReport, ValidatorConfig};
use std::collections::HashSet;
use std::path::Path;

/// Check promotion and reflection of the significant entries in `index`
///
/// `significant_log` is the JSONL file mirroring notable and pivotal
/// entries. A log that is missing while such entries exist yields a single
/// error rather than one per entry.
#[must_use]
pub fn check_significance(
    index: &JournalIndex,
    significant_log: &Path,
    config: &ValidatorConfig,
) -> ValidationReport {
    let file = significant_log.display().to_string();
    let promoted: Option<HashSet<String>> = match read_json_lines(significant_log) {
        Ok(lines) => Some(collect_ids(&lines).into_iter().collect()),
        Err(e) if e.is_not_found() => None,
        Err(e) => return ValidationReport::unreadable(file, e.to_string()),
    };

    let mut report = ValidationReport::new(file);
    let significant: Vec<_> = index.significant_entries().collect();
    let (mut notable, mut pivotal) = (0usize, 0usize);
    let (mut unreflected_notable, mut unreflected_pivotal) = (0usize, 0usize);

    for entry in &significant {
        match entry.significance {
            Some(Significance::Pivotal) => {
                pivotal += 1;
                if entry.is_unreflected() {
                    unreflected_pivotal += 1;
                    report.push(
                        Finding::error(format!(
                            "Pivotal experience {} is unreflected: pivotal experiences require immediate reflection",
                            entry.id
                        ))
                        .in_file(entry.origin.file.display().to_string())
                        .at_line(entry.origin.line)
                        .field("reflected"),
                    );
                }
            }
            _ => {
                notable += 1;
                if entry.is_unreflected() {
                    unreflected_notable += 1;
                }
            }
        }
    }

    match &promoted {
        None if !significant.is_empty() => report.push(Finding::error(format!(
            "Found {notable} notable + {pivotal} pivotal experiences but significant.jsonl does not exist. Notable/pivotal MUST be promoted."
        ))),
        None => {}
        Some(promoted) => {
            for entry in significant.iter().filter(|e| !promoted.contains(&e.id)) {
                report.push(
                    Finding::error(format!(
                        "{} experience {} was not promoted to significant.jsonl",
                        entry.significance.map_or_else(String::new, |s| s.to_string()),
                        entry.id
                    ))
                    .in_file(entry.origin.file.display().to_string())
                    .at_line(entry.origin.line),
                );
            }
        }
    }

    if unreflected_notable > config.notable_backlog {
        report.push(Finding::warning(format!(
            "{unreflected_notable} notable experiences are unreflected (backlog tolerance {})",
            config.notable_backlog
        )));
    }

    tracing::info!(
        "significance: {} significant entries, {} unreflected pivotal, {} unreflected notable",
        significant.len(),
        unreflected_pivotal,
        unreflected_notable
    );

    report.set_stat("notable", notable);
    report.set_stat("pivotal", pivotal);
    report.set_stat("promoted", promoted.as_ref().map_or(0, HashSet::len));
    report.set_stat("unreflected_notable", unreflected_notable);
    report.set_stat("unreflected_pivotal", unreflected_pivotal);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_core::Status;
    use evo_test_utils::{entry, reflected_entry, TestWorkspace};
    use pretty_assertions::assert_eq;

    fn scan(ws: &TestWorkspace) -> JournalIndex {
        JournalIndex::scan_dir(&ws.experiences_dir(), &ValidatorConfig::default()).unwrap()
    }

    #[test]
    fn promoted_and_reflected_entries_pass() {
        let ws = TestWorkspace::new();
        let notable = reflected_entry("EXP-20250101-0002", "notable");
        ws.write_experiences(
            "2025-01-01",
            &[entry("EXP-20250101-0001", "routine"), notable.clone()],
        );
        ws.write_significant(&[notable]);

        let report = check_significance(&scan(&ws), &ws.significant_path(), &ValidatorConfig::default());
        assert_eq!(report.status, Status::Pass, "{:?}", report.errors);
        assert_eq!(report.stats["promoted"], 1);
    }

    #[test]
    fn missing_log_is_one_error() {
        let ws = TestWorkspace::new();
        ws.write_experiences(
            "2025-01-01",
            &[
                reflected_entry("EXP-20250101-0001", "notable"),
                reflected_entry("EXP-20250101-0002", "pivotal"),
            ],
        );
        let report = check_significance(&scan(&ws), &ws.significant_path(), &ValidatorConfig::default());
        assert_eq!(report.errors.len(), 1);
        assert!(report.has_error_containing("1 notable + 1 pivotal"));
    }

    #[test]
    fn unpromoted_and_unreflected_pivotal_fail() {
        let ws = TestWorkspace::new();
        let pivotal = entry("EXP-20250101-0001", "pivotal");
        ws.write_experiences(
            "2025-01-01",
            &[pivotal.clone(), reflected_entry("EXP-20250101-0002", "notable")],
        );
        ws.write_significant(&[pivotal]);

        let report = check_significance(&scan(&ws), &ws.significant_path(), &ValidatorConfig::default());
        assert!(report.has_error_containing("Pivotal experience EXP-20250101-0001 is unreflected"));
        assert!(report.has_error_containing("notable experience EXP-20250101-0002 was not promoted"));
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn notable_backlog_beyond_tolerance_warns() {
        let ws = TestWorkspace::new();
        let entries: Vec<_> = (1..=3)
            .map(|n| entry(&format!("EXP-20250101-000{n}"), "notable"))
            .collect();
        ws.write_experiences("2025-01-01", &entries);
        ws.write_significant(&entries);

        let config = ValidatorConfig::default().with_notable_backlog(2);
        let report = check_significance(&scan(&ws), &ws.significant_path(), &config);
        assert_eq!(report.status, Status::Pass);
        assert!(report.has_warning_containing("3 notable experiences are unreflected"));

        let relaxed = check_significance(&scan(&ws), &ws.significant_path(), &ValidatorConfig::default());
        assert!(relaxed.warnings.is_empty());
    }
}
