//! Testing utilities for the evo-check workspace
//!
//! Shared fixtures: a well-formed persona document, record builders and an
//! on-disk workspace laid out the way the validators expect it.

#![allow(missing_docs)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SAMPLE_SOUL: &str = "# SOUL

Evolution protocol: managed by EvoClaw.

## Personality
### Voice
- Speaks plainly and warmly [MUTABLE]
- Uses humour sparingly [MUTABLE]
### Temperament
- Patient with confusion [MUTABLE]

## Philosophy
- Always act with integrity [CORE]
- Curiosity is a form of respect [MUTABLE]

## Boundaries
- Never share private data without consent [CORE]
- Declines to impersonate real people [MUTABLE]

## Continuity
- Keeps a journal of meaningful moments [MUTABLE]
";

pub fn entry(id: &str, significance: &str) -> Value {
    json!({
        "id": id,
        "timestamp": "2025-01-01T10:00:00Z",
        "source": "conversation",
        "content": format!("observation {id}"),
        "significance": significance,
        "significance_reason": "it happened",
        "reflected": false,
    })
}

pub fn reflected_entry(id: &str, significance: &str) -> Value {
    let mut value = entry(id, significance);
    value["reflected"] = json!(true);
    value
}

pub fn synthesis(id: &str, experience_ids: &[&str], proposals: &[&str]) -> Value {
    let should_propose = !proposals.is_empty();
    let triggers: Vec<&str> = if should_propose { vec!["growth"] } else { vec![] };
    json!({
        "id": id,
        "timestamp": "2025-01-01T12:00:00Z",
        "type": "routine_batch",
        "experience_ids": experience_ids,
        "summary": "A quiet day of conversations.",
        "insights": ["Users appreciate brevity"],
        "soul_relevance": "Touches on voice.",
        "proposal_decision": {
            "should_propose": should_propose,
            "triggers_fired": triggers,
            "reasoning": "Explained.",
        },
        "proposals": proposals,
    })
}

pub fn add_proposal(id: &str, proposed: &str) -> Value {
    json!({
        "id": id,
        "reflection_id": "REF-20250101-001",
        "tag": "[MUTABLE]",
        "change_type": "add",
        "target_section": "## Personality",
        "target_subsection": "### Voice",
        "proposed_content": proposed,
        "reason": "Observed repeatedly.",
    })
}

pub fn modify_proposal(id: &str, current: &str, proposed: &str) -> Value {
    json!({
        "id": id,
        "reflection_id": "REF-20250101-001",
        "tag": "[MUTABLE]",
        "change_type": "modify",
        "target_section": "## Personality",
        "target_subsection": "### Voice",
        "current_content": current,
        "proposed_content": proposed,
        "reason": "Observed repeatedly.",
    })
}

pub fn remove_proposal(id: &str, current: &str) -> Value {
    json!({
        "id": id,
        "reflection_id": "REF-20250101-001",
        "tag": "[MUTABLE]",
        "change_type": "remove",
        "target_section": "## Personality",
        "current_content": current,
        "reason": "No longer accurate.",
    })
}

pub fn state(pending: u64, experiences_today: u64, reflections: u64) -> Value {
    json!({
        "last_reflection_at": "2025-01-01T12:00:00Z",
        "last_heartbeat_at": null,
        "pending_proposals_count": pending,
        "total_experiences_today": experiences_today,
        "total_reflections": reflections,
        "total_soul_changes": 0,
        "source_last_polled": {"conversation": "2025-01-01T11:00:00Z", "x": null},
    })
}

pub fn to_jsonl(values: &[Value]) -> String {
    values.iter().map(|v| format!("{v}\n")).collect()
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

pub fn write_jsonl(path: &Path, values: &[Value]) {
    write_file(path, &to_jsonl(values));
}

/// An on-disk workspace:
///
/// ```text
/// SOUL.md
/// evoclaw/{SKILL.md,config.json,validators/}
/// memory/{experiences,significant,reflections,proposals}/
/// memory/evoclaw-state.json
/// ```
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        write_file(&ws.soul_path(), SAMPLE_SOUL);
        write_file(&ws.root().join("evoclaw/SKILL.md"), "# EvoClaw\n");
        write_file(&ws.config_path(), "{\"sources\": {\"telegram\": {}}}\n");
        fs::create_dir_all(ws.root().join("evoclaw/validators")).unwrap();
        for sub in ["experiences", "significant", "reflections", "proposals"] {
            fs::create_dir_all(ws.memory_dir().join(sub)).unwrap();
        }
        ws
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn soul_path(&self) -> PathBuf {
        self.root().join("SOUL.md")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("evoclaw/config.json")
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.root().join("memory")
    }

    pub fn experiences_dir(&self) -> PathBuf {
        self.memory_dir().join("experiences")
    }

    pub fn experience_file(&self, date: &str) -> PathBuf {
        self.experiences_dir().join(format!("{date}.jsonl"))
    }

    pub fn significant_path(&self) -> PathBuf {
        self.memory_dir().join("significant/significant.jsonl")
    }

    pub fn reflections_dir(&self) -> PathBuf {
        self.memory_dir().join("reflections")
    }

    pub fn proposals_dir(&self) -> PathBuf {
        self.memory_dir().join("proposals")
    }

    pub fn pending_path(&self) -> PathBuf {
        self.proposals_dir().join("pending.jsonl")
    }

    pub fn history_path(&self) -> PathBuf {
        self.proposals_dir().join("history.jsonl")
    }

    pub fn state_path(&self) -> PathBuf {
        self.memory_dir().join("evoclaw-state.json")
    }

    pub fn write_experiences(&self, date: &str, values: &[Value]) -> PathBuf {
        let path = self.experience_file(date);
        write_jsonl(&path, values);
        path
    }

    pub fn write_significant(&self, values: &[Value]) {
        write_jsonl(&self.significant_path(), values);
    }

    pub fn write_synthesis(&self, record: &Value) -> PathBuf {
        let id = record["id"].as_str().unwrap_or("REF-unnamed");
        let path = self.reflections_dir().join(format!("{id}.json"));
        write_file(&path, &serde_json::to_string_pretty(record).unwrap());
        path
    }

    pub fn write_pending(&self, values: &[Value]) {
        write_jsonl(&self.pending_path(), values);
    }

    pub fn write_state(&self, value: &Value) {
        write_file(&self.state_path(), &serde_json::to_string_pretty(value).unwrap());
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Today's journal file name stem (`YYYY-MM-DD`)
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}
