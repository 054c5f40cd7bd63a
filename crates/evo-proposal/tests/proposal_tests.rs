use evo_core::jsonl::parse_json_lines;
use evo_core::{Severity, Status, ValidatorConfig};
use evo_proposal::{validate_proposals, ProposalValidator};
use evo_soul::SoulDocument;
use evo_test_utils::{
    add_proposal, modify_proposal, remove_proposal, to_jsonl, write_jsonl, TestWorkspace, SAMPLE_SOUL,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

fn validate(values: &[Value]) -> evo_core::ValidationReport {
    let doc = SoulDocument::parse(SAMPLE_SOUL);
    let config = ValidatorConfig::default();
    ProposalValidator::new(&doc, &config).validate_lines("pending.jsonl", &parse_json_lines(&to_jsonl(values)))
}

fn mutable_bullets() -> Vec<String> {
    SoulDocument::parse(SAMPLE_SOUL)
        .bullets()
        .iter()
        .filter(|b| !b.is_immutable())
        .map(|b| b.text.clone())
        .collect()
}

proptest! {
    #[test]
    fn prop_single_character_mutation_fails_referentially(
        pick in any::<prop::sample::Index>(),
        position in any::<prop::sample::Index>(),
        replacement in "[a-z0-9#%]",
    ) {
        let bullets = mutable_bullets();
        let original = pick.get(&bullets).clone();
        let chars: Vec<char> = original.chars().collect();
        // Mutate inside the body, between "- " and the trailing tag
        let body_len = chars.len() - "- ".len() - " [MUTABLE]".len();
        let at = 2 + position.index(body_len);
        let replacement = replacement.chars().next().unwrap();
        prop_assume!(chars[at] != replacement);

        let mut mutated_chars = chars.clone();
        mutated_chars[at] = replacement;
        let mutated: String = mutated_chars.into_iter().collect();

        let report = validate(&[remove_proposal("PROP-20250101-001", &mutated)]);
        prop_assert_eq!(report.status, Status::Fail);
        prop_assert!(report.has_error_containing("current_content not found in SOUL.md"));

        let exact = validate(&[remove_proposal("PROP-20250101-001", &original)]);
        prop_assert!(exact.passed(), "{:?}", exact.errors);
    }

    #[test]
    fn prop_core_tag_is_critical_whatever_else(
        kind in prop::sample::select(vec!["add", "modify", "remove", "bogus"]),
        reason in ".{0,20}",
    ) {
        let mut proposal = add_proposal("PROP-20250101-001", "- Fine [MUTABLE]");
        proposal["tag"] = json!("[CORE]");
        proposal["change_type"] = json!(kind);
        proposal["reason"] = json!(reason);
        let report = validate(&[proposal]);
        prop_assert!(report
            .errors
            .iter()
            .any(|f| f.severity == Severity::Critical && f.message.contains("attempts to modify [CORE]")));
    }
}

#[test]
fn whitespace_around_current_content_is_ignored() {
    let report = validate(&[modify_proposal(
        "PROP-20250101-001",
        "   - Uses humour sparingly [MUTABLE]  ",
        "- Uses humour rarely [MUTABLE]",
    )]);
    assert!(report.passed(), "{:?}", report.errors);
}

#[test]
fn file_level_contract() {
    let ws = TestWorkspace::new();
    let config = ValidatorConfig::default();

    let absent = validate_proposals(&ws.pending_path(), &ws.soul_path(), None, &config);
    assert_eq!(absent.status, Status::Pass);
    assert!(absent.has_warning_containing("no pending proposals"));

    ws.write_pending(&[add_proposal("PROP-20250101-001", "- Answers briefly [MUTABLE]")]);
    let ok = validate_proposals(&ws.pending_path(), &ws.soul_path(), Some(&ws.history_path()), &config);
    assert!(ok.passed(), "{:?}", ok.errors);

    write_jsonl(&ws.history_path(), &[json!({"id": "PROP-20250101-001", "status": "applied"})]);
    let reused = validate_proposals(&ws.pending_path(), &ws.soul_path(), Some(&ws.history_path()), &config);
    assert!(reused.has_error_containing("already used in history"));

    let no_soul = validate_proposals(&ws.pending_path(), &ws.root().join("missing.md"), None, &config);
    assert_eq!(no_soul.status, Status::Fail);
    assert!(no_soul.has_error_containing("SOUL.md not found at:"));
}
