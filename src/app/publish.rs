//! Display summary line for outbound status documents.
//!
//! A status document with an `index` produces a fixed-width line such as
//! `[  7] motion on`, shown on the LCD as the latest event.

use core::fmt::Write;

use serde_json::Value;

/// Longest line the event row can hold.
pub const EVENT_LINE_MAX: usize = 31;

pub type EventLine = heapless::String<EVENT_LINE_MAX>;

/// Build the display line for a status document, or `None` when the
/// document carries no `index`.
///
/// The index is rendered as a u8 right-aligned in three columns; floats are
/// truncated and values outside `0..=255` render as `0`. `type` and `event`
/// are appended when present, once if they are textually identical.
pub fn event_line(doc: &Value) -> Option<EventLine> {
    let index = doc.get("index")?;
    let index = index
        .as_u64()
        .or_else(|| {
            index
                .as_f64()
                .filter(|f| (0.0..256.0).contains(f))
                .map(|f| f as u64)
        })
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(0);

    let mut line = EventLine::new();
    let _ = write!(line, "[{:>3}]", index);

    let kind = doc.get("type").map(token);
    let event = doc.get("event").map(token);
    match (kind, event) {
        (Some(k), Some(e)) if k == e => append(&mut line, &k),
        (Some(k), Some(e)) => {
            append(&mut line, &k);
            append(&mut line, &e);
        }
        (Some(t), None) | (None, Some(t)) => append(&mut line, &t),
        (None, None) => {}
    }
    Some(line)
}

fn token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append ` <word>`, truncating at the line capacity.
fn append(line: &mut EventLine, word: &str) {
    for c in core::iter::once(' ').chain(word.chars()) {
        if line.push(c).is_err() {
            return;
        }
    }
}
