// Copyright 2025 the Slim Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parsers for trigger and emit declarations.
//!
//! ## Trigger grammar
//!
//! ```text
//! triggers := segment ( "|" segment )*
//! segment  := event | event WS "on" WS selector
//! ```
//!
//! Segments that do not fit the grammar are dropped with a warning; the rest
//! are kept in declaration order. Parsing never fails.
//!
//! ## Emit grammar
//!
//! ```text
//! emit  := event | event WS "after" WS delay
//! delay := number [ "ms" | "s" ]
//! ```

use std::sync::LazyLock;

use regex::Regex;
use smallvec::smallvec;

use crate::types::{APPEAR, EmitSpec, EventSpec, EventSpecs};

static SEGMENT_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\s*").expect("valid regex"));
static SCOPE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+on\s+").expect("valid regex"));
static DELAY_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+after\s+").expect("valid regex"));

/// Parse a trigger declaration such as `"click on .row | appear"`.
pub fn parse_event_specs(declaration: &str) -> EventSpecs {
    SEGMENT_SEPARATOR
        .split(declaration.trim())
        .filter_map(parse_segment)
        .collect()
}

fn parse_segment(segment: &str) -> Option<EventSpec> {
    let segment = segment.trim();
    if segment.is_empty() {
        tracing::warn!(declaration = segment, "dropping empty trigger segment");
        return None;
    }
    let parts: Vec<&str> = SCOPE_SEPARATOR.split(segment).collect();
    let (event, scope) = match parts.as_slice() {
        [event] => (*event, None),
        [event, scope] => (*event, Some(scope.trim())),
        _ => {
            tracing::warn!(declaration = segment, "dropping trigger with more than one `on`");
            return None;
        }
    };
    if !is_event_name(event) {
        tracing::warn!(declaration = segment, "dropping trigger with malformed event name");
        return None;
    }
    match scope {
        Some("") => {
            tracing::warn!(declaration = segment, "dropping trigger with empty scope");
            None
        }
        Some(scope) => Some(EventSpec::scoped(event, scope)),
        None => Some(EventSpec::local(event)),
    }
}

fn is_event_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace)
}

/// Trigger used when an element declares none.
///
/// Forms submit, buttons click, inputs and selects change; everything else appears.
pub fn default_event_specs(tag: &str) -> EventSpecs {
    let event = match tag.to_ascii_lowercase().as_str() {
        "form" => "submit",
        "button" => "click",
        "input" | "select" => "change",
        _ => APPEAR,
    };
    smallvec![EventSpec::local(event)]
}

/// Parse an emit declaration such as `"saved after 1.5s"`.
///
/// Returns `None` (with a warning) for an empty event name, a malformed delay,
/// or more than one `after`.
pub fn parse_emit_spec(declaration: &str) -> Option<EmitSpec> {
    let declaration = declaration.trim();
    let parts: Vec<&str> = DELAY_SEPARATOR.split(declaration).collect();
    let (event, delay_ms) = match parts.as_slice() {
        [event] => (*event, 0),
        [event, delay] => match parse_duration_ms(delay) {
            Some(ms) => (*event, ms),
            None => {
                tracing::warn!(declaration, "dropping emit with malformed delay");
                return None;
            }
        },
        _ => {
            tracing::warn!(declaration, "dropping emit with more than one `after`");
            return None;
        }
    };
    if !is_event_name(event) {
        tracing::warn!(declaration, "dropping emit with malformed event name");
        return None;
    }
    Some(EmitSpec {
        event: event.to_owned(),
        delay_ms,
    })
}

/// Parse a delay: a non-negative number with an optional `ms` or `s` unit,
/// rounded to the nearest millisecond. A bare number is milliseconds.
pub fn parse_duration_ms(value: &str) -> Option<u64> {
    let value = value.trim();
    let (number, scale) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1000.0)
    } else {
        (value, 1.0)
    };
    let number: f64 = number.trim_end().parse().ok()?;
    let ms = (number * scale).round();
    if !ms.is_finite() || ms < 0.0 || ms > u64::MAX as f64 {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "range checked above"
    )]
    let ms = ms as u64;
    Some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn scoped_and_local_segments() {
        let specs = parse_event_specs("click on .x | appear");
        assert_eq!(
            specs.as_slice(),
            &[EventSpec::scoped("click", ".x"), EventSpec::local("appear")]
        );
    }

    #[test]
    fn whitespace_around_separators() {
        let specs = parse_event_specs("  items:updated|  hash:change   on   #nav > a ");
        assert_eq!(
            specs.as_slice(),
            &[
                EventSpec::local("items:updated"),
                EventSpec::scoped("hash:change", "#nav > a")
            ]
        );
    }

    #[test]
    fn malformed_segments_are_dropped() {
        let specs = parse_event_specs("click on .a on .b | | submit | on .x | drop on  ");
        assert_eq!(specs.as_slice(), &[EventSpec::local("submit")]);
        assert!(parse_event_specs("").is_empty());
        assert!(parse_event_specs("   ").is_empty());
    }

    #[test]
    fn tag_defaults() {
        let first = |tag: &str| default_event_specs(tag)[0].event.clone();
        assert_eq!(first("form"), "submit");
        assert_eq!(first("BUTTON"), "click");
        assert_eq!(first("input"), "change");
        assert_eq!(first("select"), "change");
        assert_eq!(first("div"), "appear");
        assert_eq!(first("textarea"), "appear");
    }

    #[test]
    fn emit_delays() {
        let ready = |delay_ms| {
            Some(EmitSpec {
                event: "ready".into(),
                delay_ms,
            })
        };
        assert_eq!(parse_emit_spec("ready"), ready(0));
        assert_eq!(parse_emit_spec("ready after 2s"), ready(2000));
        assert_eq!(parse_emit_spec("ready after 500"), ready(500));
        assert_eq!(parse_emit_spec("ready after 250ms"), ready(250));
        assert_eq!(parse_emit_spec("ready after 1.5s"), ready(1500));
        assert_eq!(parse_emit_spec("ready after 0.4"), ready(0));
        assert_eq!(parse_emit_spec("ready after abc"), None);
        assert_eq!(parse_emit_spec("ready after -1"), None);
        assert_eq!(parse_emit_spec("ready after 1 after 2"), None);
        assert_eq!(parse_emit_spec(" after 2s"), None);
        assert_eq!(parse_emit_spec(""), None);
    }

    proptest! {
        #[test]
        fn trigger_parsing_never_yields_empty_names(input in ".{0,64}") {
            for spec in parse_event_specs(&input) {
                prop_assert!(!spec.event.is_empty());
                prop_assert!(!spec.event.contains(char::is_whitespace));
                if let Some(scope) = &spec.scope {
                    prop_assert!(!scope.is_empty());
                }
            }
        }

        #[test]
        fn emit_parsing_never_panics(input in ".{0,64}") {
            if let Some(emit) = parse_emit_spec(&input) {
                prop_assert!(!emit.event.is_empty());
            }
        }

        #[test]
        fn whole_seconds_scale(secs in 0_u32..100_000) {
            prop_assert_eq!(parse_duration_ms(&format!("{secs}s")), Some(u64::from(secs) * 1000));
        }
    }
}
