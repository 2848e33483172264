//! Parse response payloads.
//!
//! The backend answers a parse request either with a bare list of
//! diagnostics or with an object carrying `diagnostics` and `highlights`
//! lists. The shape is decoded once into [`ParseResponse`] so consumers never
//! re-inspect raw JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Diagnostic severity as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[serde(alias = "error")]
    Error,
    #[serde(alias = "warning")]
    Warning,
    #[serde(alias = "information", alias = "INFO", alias = "info")]
    Information,
    #[serde(alias = "hint")]
    Hint,
}

impl Severity {
    /// Single-letter kind used in location lists.
    pub const fn letter(self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warning => 'W',
            Self::Information => 'I',
            Self::Hint => 'H',
        }
    }
}

/// One diagnostic reported for a buffer.
///
/// Lines and columns are 1-based, as the editor counts them.
///
/// # Examples
///
/// ```
/// use bufsync_core::{Diagnostic, Severity};
///
/// let diag: Diagnostic = serde_json::from_str(
///     r#"{"line_num": 3, "column_num": 5, "kind": "ERROR", "text": "expected ';'"}"#,
/// )
/// .unwrap();
///
/// assert_eq!(diag.line, 3);
/// assert_eq!(diag.severity, Severity::Error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(alias = "line_num")]
    pub line: u32,
    #[serde(alias = "column_num", alias = "col")]
    pub column: u32,
    #[serde(alias = "kind")]
    pub severity: Severity,
    #[serde(alias = "text")]
    pub message: String,
}

/// One semantic highlight span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    pub line: u32,
    #[serde(alias = "col")]
    pub column: u32,
    /// Highlight group name, e.g. `Member` or `Namespace`.
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl Highlight {
    /// Span length in bytes, the unit editor columns are measured in.
    pub fn span_len(&self) -> usize {
        self.text.len()
    }
}

/// Decoded response of a parse request.
///
/// # Examples
///
/// ```
/// use bufsync_core::ParseResponse;
/// use serde_json::json;
///
/// let bare = ParseResponse::from_value(json!([
///     {"line": 1, "column": 1, "severity": "WARNING", "message": "unused"}
/// ]));
/// assert_eq!(bare.diagnostics().len(), 1);
/// assert!(bare.highlights().is_empty());
///
/// let keyed = ParseResponse::from_value(json!({
///     "highlights": [{"line": 2, "col": 4, "type": "Member", "text": "size"}]
/// }));
/// assert!(keyed.diagnostics().is_empty());
/// assert_eq!(keyed.highlights()[0].kind, "Member");
///
/// assert!(ParseResponse::from_value(json!("oops")).is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseResponse {
    /// Bare list: the whole response is the diagnostics list.
    Diagnostics(Vec<Diagnostic>),
    /// Keyed object; missing keys decode as empty lists.
    Keyed {
        diagnostics: Vec<Diagnostic>,
        highlights: Vec<Highlight>,
    },
    /// Any other shape. Treated as empty.
    #[default]
    Unrecognized,
}

impl ParseResponse {
    /// Decodes a raw backend payload.
    ///
    /// Entries that fail to decode are skipped with a warning so one bad
    /// entry does not drop the rest of the list.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Diagnostics(decode_list(items, "diagnostics")),
            Value::Object(mut fields) => Self::Keyed {
                diagnostics: take_list(&mut fields, "diagnostics"),
                highlights: take_list(&mut fields, "highlights"),
            },
            other => {
                tracing::debug!("Unrecognized parse response shape: {}", value_kind(&other));
                Self::Unrecognized
            }
        }
    }

    /// Diagnostics carried by this response, empty when there are none.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Diagnostics(diagnostics) | Self::Keyed { diagnostics, .. } => diagnostics,
            Self::Unrecognized => &[],
        }
    }

    /// Highlights carried by this response. Only keyed responses have any.
    pub fn highlights(&self) -> &[Highlight] {
        match self {
            Self::Keyed { highlights, .. } => highlights,
            Self::Diagnostics(_) | Self::Unrecognized => &[],
        }
    }

    /// Returns true when the response carries neither diagnostics nor highlights.
    pub fn is_empty(&self) -> bool {
        self.diagnostics().is_empty() && self.highlights().is_empty()
    }
}

fn take_list<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Vec<T> {
    match fields.remove(key) {
        Some(Value::Array(items)) => decode_list(items, key),
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            tracing::warn!(
                "Ignoring `{}` field of kind {} in parse response",
                key,
                value_kind(&other)
            );
            Vec::new()
        }
    }
}

fn decode_list<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Skipping malformed entry in {}: {}", what, e);
                None
            }
        })
        .collect()
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error_at(line: u32) -> Value {
        json!({"line": line, "column": 1, "severity": "ERROR", "message": "bad"})
    }

    #[test]
    fn test_bare_list_is_diagnostics() {
        let response = ParseResponse::from_value(json!([error_at(1), error_at(2)]));
        assert!(matches!(response, ParseResponse::Diagnostics(_)));
        assert_eq!(response.diagnostics().len(), 2);
        assert!(response.highlights().is_empty());
    }

    #[test]
    fn test_keyed_object_extracts_nested_lists() {
        let response = ParseResponse::from_value(json!({
            "diagnostics": [error_at(4)],
            "highlights": [{"line": 4, "column": 2, "type": "Variable", "text": "x"}],
            "unrelated": true
        }));
        assert_eq!(response.diagnostics()[0].line, 4);
        assert_eq!(response.highlights()[0].kind, "Variable");
    }

    #[test]
    fn test_highlights_only_yields_no_diagnostics() {
        let response = ParseResponse::from_value(json!({
            "highlights": [{"line": 1, "column": 1, "type": "Namespace", "text": "std"}]
        }));
        assert!(response.diagnostics().is_empty());
        assert_eq!(response.highlights().len(), 1);
    }

    #[test]
    fn test_unexpected_shapes_are_empty() {
        for value in [json!(null), json!(12), json!("text"), json!(true)] {
            let response = ParseResponse::from_value(value);
            assert_eq!(response, ParseResponse::Unrecognized);
            assert!(response.is_empty());
        }
    }

    #[test]
    fn test_non_list_field_is_empty() {
        let response = ParseResponse::from_value(json!({"diagnostics": {"line": 1}}));
        assert!(response.diagnostics().is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let response = ParseResponse::from_value(json!([
            error_at(1),
            {"line": "not a number"},
            error_at(3)
        ]));
        let lines: Vec<u32> = response.diagnostics().iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn test_backend_field_aliases() {
        let diag: Diagnostic = serde_json::from_value(json!({
            "line_num": 10,
            "column_num": 3,
            "kind": "warning",
            "text": "shadowed"
        }))
        .unwrap();
        assert_eq!(diag.column, 3);
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(diag.message, "shadowed");
    }

    #[test]
    fn test_highlight_span_len_is_bytes() {
        let highlight = Highlight {
            line: 1,
            column: 1,
            kind: "Variable".into(),
            text: "größe".into(),
        };
        assert_eq!(highlight.span_len(), 7);
    }

    #[test]
    fn test_severity_letters() {
        assert_eq!(Severity::Error.letter(), 'E');
        assert_eq!(Severity::Warning.letter(), 'W');
        assert_eq!(Severity::Information.letter(), 'I');
        assert_eq!(Severity::Hint.letter(), 'H');
    }
}
