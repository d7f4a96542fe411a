//! Marker-based parsing of AT command replies.
//!
//! Device replies are line-oriented text of the shape
//! `^TOKEN: <comma separated values>` followed by an `OK` trailer. Devices
//! omit fields, add stray whitespace and sometimes wrap values in quotes or
//! parentheses, so parsing is tolerant extraction rather than grammar
//! parsing: find the marker line, split on commas and map tokens through the
//! spec's field list.

use crate::catalog::CommandSpec;
use std::collections::BTreeMap;
use thiserror::Error;

/// Parsed configuration values, field name → value.
///
/// A field with a blank value is considered not configured and is never
/// inserted.
pub type FieldMap = BTreeMap<String, String>;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response contains no {0:?} line")]
    NoMatch(&'static str),
}

/// Extracts the spec's fields from a raw device reply.
pub fn parse(spec: &CommandSpec, raw: &str) -> Result<FieldMap, ParseError> {
    let payload = marker_payload(spec, raw).ok_or(ParseError::NoMatch(spec.marker))?;

    let mut fields = FieldMap::new();
    for (token, field) in payload.split(',').zip(spec.fields) {
        let value = strip_noise(token);
        if value.is_empty() {
            continue;
        }
        let value = match field.decode {
            Some(table) => table
                .decode(value)
                .map_or_else(|| value.to_string(), str::to_string),
            None => value.to_string(),
        };
        fields.insert(field.name.to_string(), value);
    }

    Ok(fields)
}

/// Everything after the marker on the first line that carries it.
///
/// Blank lines and the `OK`/`ERROR` trailer are protocol noise; command
/// echoes before the marker on the same line are tolerated.
fn marker_payload<'a>(spec: &CommandSpec, raw: &'a str) -> Option<&'a str> {
    raw.lines().find_map(|line| {
        let line = line.trim();
        if line.is_empty() || line == "OK" || line == "ERROR" {
            return None;
        }
        line.find(spec.marker)
            .map(|at| line[at + spec.marker.len()..].trim())
    })
}

fn strip_noise(token: &str) -> &str {
    let token = strip_wrap(token.trim(), '"', '"');
    strip_wrap(token, '(', ')').trim()
}

fn strip_wrap(s: &str, open: char, close: char) -> &str {
    let mut chars = s.chars();
    if s.len() >= 2 && chars.next() == Some(open) && chars.last() == Some(close) {
        &s[open.len_utf8()..s.len() - close.len_utf8()]
    } else {
        s
    }
}
