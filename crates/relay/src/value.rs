//! Captured argument values and their flattening into a single line.

use serde::Serialize;

/// Placeholder rendered for values whose structured serialization fails.
pub const OPAQUE_PLACEHOLDER: &str = "[Object]";

/// Marker prefixing styled console text. The styling itself arrives as a
/// separate CSS-declaration argument and carries no information worth
/// keeping.
const STYLE_MARKER: &str = "%c";

/// One captured log argument.
#[derive(Debug, Clone, PartialEq)]
pub enum LogValue {
    Null,
    /// Browser-relayed console streams distinguish a missing value from an
    /// explicit null.
    Undefined,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    /// An error-like value, rendered as `name: message`.
    Error { name: String, message: String },
    Json(serde_json::Value),
    /// Stand-in for a value that could not be serialized.
    Unserializable,
    /// A named field from a structured event.
    Field { name: String, value: Box<LogValue> },
}

impl LogValue {
    /// Capture any serializable value. A value whose serialization fails is
    /// replaced with a placeholder instead of propagating the error.
    pub fn from_serialize<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => LogValue::Json(json),
            Err(_) => LogValue::Unserializable,
        }
    }
}

/// Flatten captured arguments into one display/transport line.
///
/// Values render independently; empty renderings are dropped and the rest
/// joined with single spaces. Total for any input.
pub fn format_values(values: &[LogValue]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(render)
        .filter(|part| !part.is_empty())
        .collect();
    parts.join(" ")
}

fn render(value: &LogValue) -> String {
    match value {
        LogValue::Null => "null".to_string(),
        LogValue::Undefined => "undefined".to_string(),
        LogValue::Bool(value) => value.to_string(),
        LogValue::Int(value) => value.to_string(),
        LogValue::Uint(value) => value.to_string(),
        LogValue::Float(value) => value.to_string(),
        LogValue::Text(text) => render_text(text),
        LogValue::Error { name, message } => format!("{name}: {message}"),
        LogValue::Json(json) => {
            serde_json::to_string(json).unwrap_or_else(|_| OPAQUE_PLACEHOLDER.to_string())
        }
        LogValue::Unserializable => OPAQUE_PLACEHOLDER.to_string(),
        LogValue::Field { name, value } => {
            let rendered = render(value);
            if rendered.is_empty() {
                String::new()
            } else {
                format!("{name}={rendered}")
            }
        }
    }
}

/// Strip `%c` style markers and drop the CSS declarations that accompany
/// them; any other text passes through unchanged.
fn render_text(text: &str) -> String {
    if let Some(rest) = text.strip_prefix(STYLE_MARKER) {
        return rest.to_string();
    }
    if text.starts_with("font-") || text.starts_with("color:") {
        return String::new();
    }
    text.to_string()
}
