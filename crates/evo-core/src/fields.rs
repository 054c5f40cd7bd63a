//! Typed field extraction from loosely-shaped JSON records
//!
//! Stored records are JSON objects written by an external pipeline, so any
//! field may be missing or carry the wrong type. [`RecordFields`] reads each
//! field into an explicit `Option<T>` and turns every type mismatch into a
//! structural [`Finding`] instead of aborting, which lets the validators
//! keep checking the remaining fields of the same record.
//!
//! JSON `null` satisfies [`require`](RecordFields::require) but is a type
//! error for the typed readers, unless the field was declared with
//! [`allow_null`](RecordFields::allow_null). [`raw`](RecordFields::raw)
//! always maps `null` to `None`.

use crate::report::Finding;
use serde_json::{Map, Value};

/// JSON type name used in messages
#[must_use]
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Field reader over one JSON object
#[derive(Debug)]
pub struct RecordFields<'a> {
    map: &'a Map<String, Value>,
    line: Option<usize>,
    prefix: Option<String>,
    nullable: Vec<&'static str>,
    findings: Vec<Finding>,
}

impl<'a> RecordFields<'a> {
    /// Wrap a JSON value that must be an object
    ///
    /// # Errors
    /// Returns a structural finding if `value` is not an object.
    pub fn from_value(value: &'a Value, line: Option<usize>) -> Result<Self, Finding> {
        match value {
            Value::Object(map) => Ok(Self::new(map, line)),
            other => Err(Finding::error(format!(
                "Expected JSON object, got {}",
                type_name(other)
            ))
            .at(line)),
        }
    }

    /// Wrap an object
    #[must_use]
    pub fn new(map: &'a Map<String, Value>, line: Option<usize>) -> Self {
        Self {
            map,
            line,
            prefix: None,
            nullable: Vec::new(),
            findings: Vec::new(),
        }
    }

    /// Reader for a nested object; field paths are reported as `prefix.field`
    #[must_use]
    pub fn nested(map: &'a Map<String, Value>, line: Option<usize>, prefix: &str) -> Self {
        Self {
            map,
            line,
            prefix: Some(prefix.to_string()),
            nullable: Vec::new(),
            findings: Vec::new(),
        }
    }

    /// Qualified field path
    #[must_use]
    pub fn path(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        }
    }

    /// Whether the key is present (even if null)
    #[inline]
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Raw value
    #[inline]
    #[must_use]
    pub fn raw(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    /// Accept `null` for these fields: typed readers return `None` silently
    pub fn allow_null(&mut self, names: &[&'static str]) {
        self.nullable.extend_from_slice(names);
    }

    // Present value; `null` is reported against `expected` unless allowed.
    fn value(&mut self, name: &str, expected: &str) -> Option<&'a Value> {
        match self.map.get(name)? {
            Value::Null if self.nullable.iter().any(|n| *n == name) => None,
            Value::Null => {
                self.report(name, format!("{name} must be {expected}, got null"));
                None
            }
            value => Some(value),
        }
    }

    /// Report every missing key in `names`, in the given order
    pub fn require(&mut self, names: &[&str]) {
        for name in names {
            if !self.has(name) {
                let message = match &self.prefix {
                    Some(prefix) => format!("Missing required field in {prefix}: {name}"),
                    None => format!("Missing required field: {name}"),
                };
                self.report(name, message);
            }
        }
    }

    /// String field; wrong types are reported
    pub fn string(&mut self, name: &str) -> Option<&'a str> {
        match self.value(name, "a string")? {
            Value::String(s) => Some(s.as_str()),
            other => {
                let message = format!("{name} must be a string, got {}", type_name(other));
                self.report(name, message);
                None
            }
        }
    }

    /// Strict boolean field
    pub fn boolean(&mut self, name: &str) -> Option<bool> {
        match self.value(name, "boolean")? {
            Value::Bool(b) => Some(*b),
            other => {
                let message = format!(
                    "{name} must be boolean, got {}: {other}",
                    type_name(other)
                );
                self.report(name, message);
                None
            }
        }
    }

    /// Array field
    pub fn array(&mut self, name: &str) -> Option<&'a Vec<Value>> {
        match self.value(name, "an array")? {
            Value::Array(items) => Some(items),
            _ => {
                self.report(name, format!("{name} must be an array"));
                None
            }
        }
    }

    /// Array field whose items are rendered as strings
    ///
    /// Non-string items are kept in their JSON text form so that a later
    /// format check reports them verbatim.
    pub fn string_list(&mut self, name: &str) -> Option<Vec<String>> {
        self.array(name).map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
    }

    /// Object field
    pub fn object(&mut self, name: &str) -> Option<&'a Map<String, Value>> {
        match self.value(name, "an object")? {
            Value::Object(map) => Some(map),
            other => {
                let message = format!("{name} must be an object, got {}", type_name(other));
                self.report(name, message);
                None
            }
        }
    }

    /// Non-negative integer counter
    pub fn counter(&mut self, name: &str) -> Option<u64> {
        let value = self.value(name, "an integer")?;
        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        let message = match value.as_i64() {
            Some(n) => format!("Must be non-negative, got {n}"),
            None => format!("Must be integer, got {}: {value}", type_name(value)),
        };
        self.report(name, message);
        None
    }

    /// Record an error against a field
    pub fn report(&mut self, name: &str, message: impl Into<String>) {
        let finding = Finding::error(message).at(self.line).field(self.path(name));
        self.findings.push(finding);
    }

    /// Record an arbitrary finding against a field
    pub fn report_finding(&mut self, name: &str, finding: Finding) {
        let finding = finding.at(self.line).field(self.path(name));
        self.findings.push(finding);
    }

    /// Findings collected so far
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Consume reader, returning its findings
    #[must_use]
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_non_object() {
        let value = json!([1, 2]);
        let err = RecordFields::from_value(&value, Some(3)).unwrap_err();
        assert_eq!(err.message, "Expected JSON object, got array");
        assert_eq!(err.location.line, Some(3));
    }

    #[test]
    fn reports_missing_fields_in_order() {
        let value = json!({"id": "x"});
        let mut fields = RecordFields::from_value(&value, None).unwrap();
        fields.require(&["id", "content", "source"]);
        let messages: Vec<_> = fields.findings().iter().map(|f| f.message.clone()).collect();
        assert_eq!(
            messages,
            vec!["Missing required field: content", "Missing required field: source"]
        );
    }

    #[test]
    fn null_is_a_type_error_unless_allowed() {
        let value = json!({"tag": null, "ids": null, "decision": null, "reflected": null});
        let mut fields = RecordFields::from_value(&value, Some(2)).unwrap();
        fields.allow_null(&["reflected"]);
        fields.require(&["tag", "ids", "decision", "reflected"]);
        assert_eq!(fields.string("tag"), None);
        assert_eq!(fields.array("ids"), None);
        assert_eq!(fields.object("decision"), None);
        assert_eq!(fields.boolean("reflected"), None);
        assert_eq!(fields.raw("tag"), None);

        let messages: Vec<_> = fields.findings().iter().map(|f| f.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "tag must be a string, got null",
                "ids must be an array, got null",
                "decision must be an object, got null",
            ]
        );
        assert!(fields.findings().iter().all(|f| f.location.line == Some(2)));
    }

    #[test]
    fn boolean_is_strict() {
        let value = json!({"reflected": "yes"});
        let mut fields = RecordFields::from_value(&value, Some(1)).unwrap();
        assert_eq!(fields.boolean("reflected"), None);
        assert_eq!(
            fields.findings()[0].message,
            "reflected must be boolean, got string: \"yes\""
        );
    }

    #[test]
    fn nested_paths_are_qualified() {
        let value = json!({"should_propose": 1});
        let map = value.as_object().unwrap();
        let mut fields = RecordFields::nested(map, None, "proposal_decision");
        fields.require(&["reasoning"]);
        fields.boolean("should_propose");
        let findings = fields.into_findings();
        assert_eq!(
            findings[0].location.field.as_deref(),
            Some("proposal_decision.reasoning")
        );
        assert_eq!(
            findings[0].message,
            "Missing required field in proposal_decision: reasoning"
        );
        assert_eq!(
            findings[1].location.field.as_deref(),
            Some("proposal_decision.should_propose")
        );
    }

    #[test]
    fn counters() {
        let value = json!({"a": 3, "b": -1, "c": 1.5, "d": true});
        let mut fields = RecordFields::from_value(&value, None).unwrap();
        assert_eq!(fields.counter("a"), Some(3));
        assert_eq!(fields.counter("b"), None);
        assert_eq!(fields.counter("c"), None);
        assert_eq!(fields.counter("d"), None);
        let findings = fields.into_findings();
        assert_eq!(findings[0].message, "Must be non-negative, got -1");
        assert!(findings[1].message.starts_with("Must be integer, got number"));
        assert!(findings[2].message.starts_with("Must be integer, got boolean"));
    }

    #[test]
    fn string_list_keeps_non_strings_verbatim() {
        let value = json!({"ids": ["EXP-20250101-0001", 7]});
        let mut fields = RecordFields::from_value(&value, None).unwrap();
        assert_eq!(
            fields.string_list("ids"),
            Some(vec!["EXP-20250101-0001".to_string(), "7".to_string()])
        );
    }
}
