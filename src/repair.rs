//! Response repair
//!
//! Turns a free-text reply from the generation service into a structured value for one
//! section key. Strategies run from strict to lenient and the first one that yields a value
//! carrying the key wins:
//!
//! 1. direct parse of the whole reply
//! 2. parse after stripping code fences
//! 3. balanced-span extraction (first complete `{...}` / `[...]`, string-aware)
//! 4. cosmetic repair (trailing commas, bare keys, raw newlines in strings, truncation)
//! 5. pattern scraping of `"<key>": "..."` or `"<key>": [...]` straight out of the text
//!
//! Nothing here panics or errors on malformed input; failure is `RepairedValue::Unrecoverable`.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

/// Strategy that produced a repaired value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    Direct,
    FenceStripped,
    BalancedSpan,
    Cosmetic,
    PatternScrape,
}

/// Result of running the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum RepairedValue {
    /// An object that carries the requested key.
    Parsed {
        value: Value,
        strategy: RepairStrategy,
    },
    Unrecoverable,
}

impl RepairedValue {
    /// Value stored under `key`, if the reply was recovered.
    pub fn section_value(&self, key: &str) -> Option<&Value> {
        match self {
            RepairedValue::Parsed { value, .. } => value.get(key),
            RepairedValue::Unrecoverable => None,
        }
    }

    pub fn strategy(&self) -> Option<RepairStrategy> {
        match self {
            RepairedValue::Parsed { strategy, .. } => Some(*strategy),
            RepairedValue::Unrecoverable => None,
        }
    }
}

/// Recover a structured value for `key` from a raw reply.
pub fn repair(raw: &str, key: &str) -> RepairedValue {
    let outcome = run_strategies(raw, key);
    match &outcome {
        RepairedValue::Parsed { strategy, .. } => {
            debug!(section = key, strategy = ?strategy, "Recovered structured reply");
        }
        RepairedValue::Unrecoverable => {
            debug!(
                section = key,
                reply_chars = raw.chars().count(),
                "No strategy recovered a structured reply"
            );
        }
    }
    outcome
}

fn run_strategies(raw: &str, key: &str) -> RepairedValue {
    let parsed = |value: Value, strategy: RepairStrategy| RepairedValue::Parsed { value, strategy };

    if let Some(value) = parse_for_key(raw.trim(), key) {
        return parsed(value, RepairStrategy::Direct);
    }

    let unfenced = strip_fences(raw);
    if let Some(text) = unfenced {
        if let Some(value) = parse_for_key(text, key) {
            return parsed(value, RepairStrategy::FenceStripped);
        }
    }
    let body = unfenced.unwrap_or(raw);

    for span in balanced_spans(body) {
        if let Some(value) = parse_for_key(span, key) {
            return parsed(value, RepairStrategy::BalancedSpan);
        }
    }

    if let Some(start) = body.find(['{', '[']) {
        let candidate = match extract_balanced_span(&body[start..]) {
            Some(span) => span,
            None => &body[start..],
        };
        if let Some(value) = parse_for_key(&cosmetic_repair(candidate), key) {
            return parsed(value, RepairStrategy::Cosmetic);
        }
    }

    if let Some(value) = scrape_key(raw, key) {
        return parsed(value, RepairStrategy::PatternScrape);
    }

    RepairedValue::Unrecoverable
}

/// Parse `text` and accept it only if it can serve `key`: an object carrying the key,
/// or a bare string/array that is wrapped under the key.
fn parse_for_key(text: &str, key: &str) -> Option<Value> {
    if text.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(text).ok()?;
    match value {
        Value::Object(ref object) if object.contains_key(key) => Some(value),
        Value::String(_) | Value::Array(_) => Some(wrap(key, value)),
        _ => None,
    }
}

fn wrap(key: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Value::Object(object)
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)(?:```|$)").ok())
        .as_ref()
}

/// Contents of the first code fence, or `None` when the reply has no fence markers.
///
/// An unterminated fence yields everything after the opening marker.
pub fn strip_fences(raw: &str) -> Option<&str> {
    let captures = fence_regex()?.captures(raw)?;
    captures.get(1).map(|m| m.as_str().trim())
}

/// The first complete `{...}` or `[...]` span in `text`, byte-for-byte.
///
/// Nesting is tracked outside of quoted strings only, so braces inside string values and
/// escaped quotes do not affect depth.
pub fn extract_balanced_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    span_end(text.as_bytes(), start).map(|end| &text[start..end])
}

/// Every balanced span in `text`, scanning forward past each span (or past an opening
/// delimiter that never closes).
fn balanced_spans(text: &str) -> impl Iterator<Item = &str> {
    let bytes = text.as_bytes();
    let mut cursor = 0usize;
    std::iter::from_fn(move || {
        while cursor < bytes.len() {
            let offset = text[cursor..].find(['{', '['])?;
            let start = cursor + offset;
            match span_end(bytes, start) {
                Some(end) => {
                    cursor = end;
                    return Some(&text[start..end]);
                }
                None => cursor = start + 1,
            }
        }
        None
    })
}

/// Byte index one past the delimiter that closes the structure opened at `start`.
fn span_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Fix common near-miss syntax outside of string literals:
/// trailing commas before a closer, bare identifier keys before a colon, raw control
/// characters inside strings, and structures cut off before their closers.
pub fn cosmetic_repair(text: &str) -> String {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if escaped {
                escaped = false;
                out.push(c);
            } else {
                match c {
                    '\\' => {
                        escaped = true;
                        out.push(c);
                    }
                    '"' => {
                        in_string = false;
                        out.push(c);
                    }
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(c),
                }
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                closers.pop();
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, None | Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            c if (c.is_ascii_alphabetic() || c == '_') && expects_key(&out) => {
                let end = chars[i..]
                    .iter()
                    .position(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-'))
                    .map_or(chars.len(), |p| i + p);
                let ident: String = chars[i..end].iter().collect();
                let next = chars[end..].iter().find(|ch| !ch.is_whitespace());
                if next == Some(&':') {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
                i = end;
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    if !closers.is_empty() {
        let trimmed_len = out.trim_end().trim_end_matches(',').trim_end().len();
        out.truncate(trimmed_len);
        if out.ends_with(':') {
            out.push_str("null");
        }
        while let Some(closer) = closers.pop() {
            out.push(closer);
        }
    }
    out
}

/// True when the last significant character written opens an object member.
fn expects_key(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('{') | Some(','))
}

/// Last resort: pull `"<key>": "<string>"` or `"<key>": [<items>]` out of arbitrary text.
pub fn scrape_key(raw: &str, key: &str) -> Option<Value> {
    let escaped_key = regex::escape(key);

    let string_pattern = format!(r#"(?s)"{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, escaped_key);
    if let Ok(re) = Regex::new(&string_pattern) {
        if let Some(captured) = re.captures(raw).and_then(|c| c.get(1)) {
            return Some(wrap(key, Value::String(decode_string(captured.as_str()))));
        }
    }

    let array_pattern = format!(r#"(?s)"{}"\s*:\s*(\[.*\])"#, escaped_key);
    if let Ok(re) = Regex::new(&array_pattern) {
        if let Some(captured) = re.captures(raw).and_then(|c| c.get(1)) {
            if let Some(items) = recover_array(captured.as_str()) {
                return Some(wrap(key, items));
            }
        }
    }

    None
}

fn decode_string(captured: &str) -> String {
    let quoted = format!("\"{}\"", captured);
    if let Ok(decoded) = serde_json::from_str::<String>(&quoted) {
        return decoded;
    }
    let repaired = cosmetic_repair(&quoted);
    serde_json::from_str::<String>(&repaired).unwrap_or_else(|_| {
        captured
            .replace("\\n", "\n")
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    })
}

/// Parse a greedy `[...]` capture: whole, first balanced prefix, cosmetically repaired, or
/// as the individual objects it still contains.
fn recover_array(captured: &str) -> Option<Value> {
    let candidates = [
        Some(captured.to_string()),
        extract_balanced_span(captured).map(str::to_string),
        Some(cosmetic_repair(
            extract_balanced_span(captured).unwrap_or(captured),
        )),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(&candidate) {
            return Some(value);
        }
    }

    let inner = captured.get(1..).unwrap_or_default();
    let records: Vec<Value> = balanced_spans(inner)
        .filter_map(|span| serde_json::from_str::<Value>(span).ok())
        .filter(Value::is_object)
        .collect();
    if records.is_empty() {
        None
    } else {
        Some(Value::Array(records))
    }
}
