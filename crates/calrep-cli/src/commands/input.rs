//! Reading calendar event exports.
//!
//! Accepts a JSON array of events, a provider list response
//! (`{"items": [...]}`), a single event object, or JSON Lines.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use calrep_core::RawEvent;
use serde_json::Value;

/// Records read from an event export.
#[derive(Debug, Default)]
pub struct EventInput {
    pub events: Vec<RawEvent>,
    /// One message per record that could not be read. Those records are
    /// skipped, the rest of the export is kept.
    pub rejected: Vec<String>,
}

/// Reads events from a file, or from stdin when the path is `-`.
pub fn read_events(path: &Path) -> Result<EventInput> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read events from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read events from {}", path.display()))?
    };
    parse_events(&content)
}

/// Reads events and drops those from calendars not in `calendars`.
pub fn load_events(path: &Path, calendars: &[String]) -> Result<EventInput> {
    let input = read_events(path)?;
    tracing::debug!(
        count = input.events.len(),
        rejected = input.rejected.len(),
        path = %path.display(),
        "read events"
    );
    Ok(EventInput {
        events: filter_calendars(input.events, calendars),
        rejected: input.rejected,
    })
}

/// Parses an event export in any supported layout.
///
/// Fails only when the export as a whole has the wrong shape. Individual
/// records that cannot be read end up in [`EventInput::rejected`].
pub fn parse_events(content: &str) -> Result<EventInput> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(EventInput::default());
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => Ok(from_items(items)),
        Ok(Value::Object(mut object)) => match object.remove("items") {
            Some(Value::Array(items)) => Ok(from_items(items)),
            Some(_) => bail!("\"items\" must be an array"),
            None => Ok(from_items(vec![Value::Object(object)])),
        },
        Ok(_) => bail!("expected a JSON array or object of events"),
        Err(_) => Ok(parse_lines(trimmed)),
    }
}

fn reject(input: &mut EventInput, message: String) {
    tracing::warn!(error = %message, "skipping unreadable event record");
    input.rejected.push(message);
}

fn from_items(items: Vec<Value>) -> EventInput {
    let mut input = EventInput::default();
    for (index, item) in items.into_iter().enumerate() {
        let id = item.get("id").map(ToString::to_string);
        match serde_json::from_value(item) {
            Ok(event) => input.events.push(event),
            Err(err) => {
                let message = match id {
                    Some(id) => format!("unreadable event record {index} (id {id}): {err}"),
                    None => format!("unreadable event record {index}: {err}"),
                };
                reject(&mut input, message);
            }
        }
    }
    input
}

fn parse_lines(content: &str) -> EventInput {
    let mut input = EventInput::default();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(event) => input.events.push(event),
            Err(err) => reject(
                &mut input,
                format!("unreadable event record on line {}: {err}", index + 1),
            ),
        }
    }
    input
}

/// Keeps records belonging to one of the configured calendars.
///
/// Records without a calendar ID belong to `primary`.
pub fn filter_calendars(events: Vec<RawEvent>, calendars: &[String]) -> Vec<RawEvent> {
    let before = events.len();
    let kept: Vec<_> = events
        .into_iter()
        .filter(|event| {
            let calendar = event.calendar_id.as_deref().unwrap_or("primary");
            calendars.iter().any(|c| c == calendar)
        })
        .collect();
    if kept.len() < before {
        tracing::debug!(
            ignored = before - kept.len(),
            "ignored events from unconfigured calendars"
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = r#"{"id":"a","summary":"@MKT Launch","start":{"dateTime":"2024-03-04T09:00:00Z"},"end":{"dateTime":"2024-03-04T10:00:00Z"}}"#;

    #[test]
    fn parses_array() {
        let input = parse_events(&format!("[{EVENT}, {EVENT}]")).unwrap();
        assert_eq!(input.events.len(), 2);
        assert!(input.rejected.is_empty());
        assert_eq!(input.events[0].summary.as_deref(), Some("@MKT Launch"));
    }

    #[test]
    fn parses_list_response() {
        let input = parse_events(&format!(r#"{{"kind":"calendar#events","items":[{EVENT}]}}"#))
            .unwrap();
        assert_eq!(input.events.len(), 1);
        assert_eq!(input.events[0].id.as_deref(), Some("a"));
    }

    #[test]
    fn parses_json_lines() {
        let input = parse_events(&format!("{EVENT}\n\n{EVENT}\n")).unwrap();
        assert_eq!(input.events.len(), 2);
    }

    #[test]
    fn parses_single_object() {
        assert_eq!(parse_events(EVENT).unwrap().events.len(), 1);
    }

    #[test]
    fn empty_input_has_no_events() {
        let input = parse_events("  \n").unwrap();
        assert!(input.events.is_empty());
        assert!(input.rejected.is_empty());
    }

    #[test]
    fn bad_line_is_skipped_with_line_number() {
        let input = parse_events(&format!("{EVENT}\nnot json\n{EVENT}\n")).unwrap();
        assert_eq!(input.events.len(), 2);
        assert_eq!(input.rejected.len(), 1);
        assert!(input.rejected[0].contains("line 2"), "{:?}", input.rejected);
    }

    #[test]
    fn unreadable_items_are_skipped_and_counted() {
        let numeric_id = r#"{"id":42,"summary":"Numeric id","start":{"dateTime":"2024-03-05T09:00:00Z"}}"#;
        let bare_start = r#"{"id":"flat","summary":"Flat start","start":"2024-03-05"}"#;
        let content = format!(r#"{{"items":[{EVENT}, {numeric_id}, {bare_start}, {EVENT}]}}"#);

        let input = parse_events(&content).unwrap();
        assert_eq!(input.events.len(), 2);
        assert_eq!(input.rejected.len(), 2);
        assert!(input.rejected[0].contains("record 1 (id 42)"), "{:?}", input.rejected);
        assert!(input.rejected[1].contains("record 2 (id \"flat\")"), "{:?}", input.rejected);
    }

    #[test]
    fn wrong_export_shape_still_fails() {
        assert!(parse_events(r#"{"items": 3}"#).is_err());
        assert!(parse_events("42").is_err());
    }

    #[test]
    fn unknown_calendars_are_ignored() {
        let mut team = parse_events(EVENT).unwrap().events.remove(0);
        team.calendar_id = Some("team@example.com".to_string());
        let mut other = team.clone();
        other.calendar_id = Some("holidays".to_string());
        let primary = parse_events(EVENT).unwrap().events.remove(0);

        let kept = filter_calendars(
            vec![team, other, primary],
            &["primary".to_string(), "team@example.com".to_string()],
        );
        let calendars: Vec<_> = kept.iter().map(|e| e.calendar_id.as_deref()).collect();
        assert_eq!(calendars, vec![Some("team@example.com"), None]);
    }
}
