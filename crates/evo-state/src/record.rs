//! Shape checks for the cached state record

use evo_core::fields::type_name;
use evo_core::time::is_iso8601;
use evo_core::{Finding, RecordFields, ValidatorConfig};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields the state record must carry (values may be null)
pub const REQUIRED_FIELDS: &[&str] = &[
    "last_reflection_at",
    "last_heartbeat_at",
    "pending_proposals_count",
    "total_experiences_today",
    "total_reflections",
    "total_soul_changes",
    "source_last_polled",
];

/// Cached counters and timestamps, each `None` when absent, null or malformed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CachedState {
    /// Last synthesis run
    pub last_reflection_at: Option<String>,
    /// Last scheduler tick
    pub last_heartbeat_at: Option<String>,
    /// Claimed number of pending proposals
    pub pending_proposals_count: Option<u64>,
    /// Claimed number of journal entries today
    pub total_experiences_today: Option<u64>,
    /// Claimed number of synthesis records
    pub total_reflections: Option<u64>,
    /// Number of applied document edits
    pub total_soul_changes: Option<u64>,
    /// Last poll time per source
    pub source_last_polled: BTreeMap<String, Option<String>>,
}

impl CachedState {
    /// Read a state value, returning the typed record and every shape finding
    #[must_use]
    pub fn read(value: &Value, config: &ValidatorConfig) -> (Self, Vec<Finding>) {
        let mut fields = match RecordFields::from_value(value, None) {
            Ok(fields) => fields,
            Err(finding) => return (Self::default(), vec![finding]),
        };
        fields.allow_null(REQUIRED_FIELDS);
        fields.require(REQUIRED_FIELDS);

        let mut state = Self {
            last_reflection_at: timestamp(&mut fields, "last_reflection_at"),
            last_heartbeat_at: timestamp(&mut fields, "last_heartbeat_at"),
            pending_proposals_count: fields.counter("pending_proposals_count"),
            total_experiences_today: fields.counter("total_experiences_today"),
            total_reflections: fields.counter("total_reflections"),
            total_soul_changes: fields.counter("total_soul_changes"),
            source_last_polled: BTreeMap::new(),
        };

        if let Some(polled) = fields.object("source_last_polled") {
            for (source, ts) in polled {
                let name = format!("source_last_polled.{source}");
                let parsed = match ts {
                    Value::Null => None,
                    Value::String(text) if is_iso8601(text) => Some(text.clone()),
                    Value::String(text) => {
                        fields.report(&name, format!("Invalid ISO-8601: \"{text}\""));
                        None
                    }
                    other => {
                        fields.report(
                            &name,
                            format!("Must be ISO-8601 string or null, got {}", type_name(other)),
                        );
                        None
                    }
                };
                if !config.is_known_source(source) {
                    fields.report_finding(
                        &name,
                        Finding::warning(format!("Unknown source in source_last_polled: \"{source}\"")),
                    );
                }
                state.source_last_polled.insert(source.clone(), parsed);
            }
        }

        (state, fields.into_findings())
    }
}

fn timestamp(fields: &mut RecordFields<'_>, name: &str) -> Option<String> {
    match fields.raw(name)? {
        Value::String(text) if is_iso8601(text) => Some(text.clone()),
        Value::String(text) => {
            fields.report(name, format!("Invalid ISO-8601: \"{text}\""));
            None
        }
        other => {
            fields.report(
                name,
                format!("Must be ISO-8601 string or null, got {}", type_name(other)),
            );
            None
        }
    }
}
