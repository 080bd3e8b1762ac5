// ─── Cypher value encoding ────────────────────────────────────
//
// Two encodings appear in the emitted statements: plain identifiers and
// machine ids are single-quoted with `'`/`\` escaped; human-entered names
// are JSON-encoded (double-quoted) so arbitrary text survives verbatim.
// Absent pool/lane references serialize as the literal `null`.

/// Single-quoted Cypher string with `\` and `'` escaped.
pub fn quoted(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// JSON-encoded string (double-quoted).
pub fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// JSON-encoded string, or `null` when absent.
pub fn json_or_null(value: Option<&str>) -> String {
    match value {
        Some(s) => json_string(s),
        None => "null".to_string(),
    }
}

/// True when `label` can stand as a Cypher relationship type without quoting.
pub fn is_identifier(label: &str) -> bool {
    let mut chars = label.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Uppercase, spaces/hyphens to underscores; anything still not a valid
/// identifier collapses to `FLOW`.
pub fn sanitize_relationship(label: &str) -> String {
    let upper = label.to_uppercase().replace([' ', '-'], "_");
    if is_identifier(&upper) {
        upper
    } else {
        "FLOW".to_string()
    }
}
