//! IPC message dispatch — parse s-expressions and route to handlers.

use std::time::Duration;

use lexpr::Value;
use tracing::{debug, warn};

use super::escape_string;
use crate::keyboard::{Hand, HandSample, LayoutTemplate};
use crate::state::KeyboardSession;

/// Where tick timestamps come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickClock {
    /// Use the message's `:t` field (seconds).
    Message,
    /// Use a driver-supplied timestamp; `:t` is ignored.
    Fixed(Duration),
}

/// Per-message dispatch options.
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    pub clock: TickClock,
    /// Attach the render snapshot to tick responses.
    pub snapshots: bool,
}

/// Parse an s-expression message and dispatch to the appropriate handler.
/// Returns the response followed by any events the message produced.
pub fn handle_message(
    session: &mut KeyboardSession,
    raw: &str,
    opts: DispatchOptions,
) -> Vec<String> {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("malformed s-expression: {}", e);
            return vec![error_response(0, &format!("malformed s-expression: {e}"))];
        }
    };

    let msg_type = get_keyword(&value, "type");
    let msg_id = get_int(&value, "id").unwrap_or(0);

    let response = match msg_type.as_deref() {
        Some("tick") => handle_tick(session, msg_id, &value, opts),
        Some("status") => Ok(handle_status(session, msg_id)),
        Some("config") => handle_config(session, msg_id, &value),
        Some("reset") => {
            session.reset();
            Ok(ok_response(msg_id))
        }
        Some("flush") => Ok(handle_flush(session, msg_id)),
        Some(other) => Err(format!("unknown message type: {other}")),
        None => Err("missing :type".to_string()),
    };

    let response = response.unwrap_or_else(|reason| {
        warn!(msg_id, "request failed: {}", reason);
        error_response(msg_id, &reason)
    });

    let mut out = vec![response];
    out.extend(session.take_events().iter().map(|e| e.to_sexp()));
    out
}

// ── Handlers ───────────────────────────────────────────────

fn handle_tick(
    session: &mut KeyboardSession,
    msg_id: i64,
    value: &Value,
    opts: DispatchOptions,
) -> Result<String, String> {
    let now = match opts.clock {
        TickClock::Fixed(now) => now,
        TickClock::Message => match get_float(value, "t") {
            Some(t) if t >= 0.0 => Duration::try_from_secs_f64(t)
                .map_err(|_| "invalid :t (non-negative seconds)".to_string())?,
            _ => return Err("invalid :t (non-negative seconds)".to_string()),
        },
    };
    let samples = match get_value(value, "samples") {
        Some(list) => parse_samples(list)?,
        None => Vec::new(),
    };

    let snapshot = session.tick(&samples, now);
    debug!(
        "tick t={}ms samples={} phase={}",
        now.as_millis(),
        samples.len(),
        snapshot.phase.as_str()
    );

    if opts.snapshots {
        Ok(format!(
            "(:type :response :id {} :status :ok :phase {} :snapshot {})",
            msg_id,
            snapshot.phase.as_str(),
            snapshot.to_sexp()
        ))
    } else {
        Ok(format!(
            "(:type :response :id {} :status :ok :phase {})",
            msg_id,
            snapshot.phase.as_str()
        ))
    }
}

fn handle_status(session: &KeyboardSession, msg_id: i64) -> String {
    format!(
        "(:type :response :id {} :status :ok :keyboard {} :buffer \"{}\")",
        msg_id,
        session.status_sexp(),
        escape_string(&session.buffer.text())
    )
}

fn handle_flush(session: &mut KeyboardSession, msg_id: i64) -> String {
    let text = session.flush();
    format!(
        "(:type :response :id {} :status :ok :text \"{}\")",
        msg_id,
        escape_string(&text)
    )
}

/// Validate every supplied field first, then apply them together.
fn handle_config(
    session: &mut KeyboardSession,
    msg_id: i64,
    value: &Value,
) -> Result<String, String> {
    let key_hold = optional_ms(value, "key-hold-ms", 50, 10_000)?;
    let activation = optional_ms(value, "activation-ms", 100, 30_000)?;
    let deactivation = optional_ms(value, "deactivation-ms", 100, 30_000)?;
    let debounce = optional_ms(value, "min-commit-interval-ms", 0, 5_000)?;
    let tolerance = match get_float(value, "tolerance-px") {
        Some(t) if t > 0.0 && t <= 200.0 => Some(t as f32),
        Some(_) => return Err("invalid :tolerance-px (0-200)".to_string()),
        None => None,
    };
    let template = match get_string(value, "template") {
        Some(name) => Some(
            LayoutTemplate::from_str(&name).ok_or_else(|| format!("unknown template: {name}"))?,
        ),
        None => None,
    };

    if key_hold.is_none()
        && activation.is_none()
        && deactivation.is_none()
        && debounce.is_none()
        && tolerance.is_none()
        && template.is_none()
    {
        return Err("no config fields given".to_string());
    }

    let machine = &mut session.machine;
    if let Some(hold) = key_hold {
        machine.set_key_hold(hold);
    }
    if let Some(hold) = activation {
        machine.set_activation_hold(hold);
    }
    if let Some(hold) = deactivation {
        machine.set_deactivation_hold(hold);
    }
    if let Some(interval) = debounce {
        machine.set_min_commit_interval(interval);
    }
    if let Some(tol) = tolerance {
        machine.set_anchor_tolerance(tol);
    }
    if let Some(t) = template {
        machine.set_template(t, t.default_metrics());
    }

    Ok(format!(
        "(:type :response :id {} :status :ok :keyboard {})",
        msg_id,
        session.status_sexp()
    ))
}

/// Read an optional millisecond field and check it against `[min, max]`.
fn optional_ms(value: &Value, key: &str, min: i64, max: i64) -> Result<Option<Duration>, String> {
    match get_keyword(value, key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<i64>() {
            Ok(ms) if ms >= min && ms <= max => Ok(Some(Duration::from_millis(ms as u64))),
            _ => Err(format!("invalid :{key} ({min}-{max})")),
        },
    }
}

/// Parse `((:hand left :x 1 :y 2) ...)` into samples.
fn parse_samples(list: &Value) -> Result<Vec<HandSample>, String> {
    let mut samples = Vec::new();
    let mut current = list;
    loop {
        match current {
            Value::Cons(pair) => {
                samples.push(parse_sample(pair.car())?);
                current = pair.cdr();
            }
            Value::Null | Value::Nil => break,
            Value::Symbol(s) if s.as_ref() == "nil" => break,
            _ => return Err("invalid :samples (expected a list)".to_string()),
        }
    }
    Ok(samples)
}

fn parse_sample(item: &Value) -> Result<HandSample, String> {
    let hand = match get_keyword(item, "hand") {
        Some(name) => Hand::from_str(&name).ok_or_else(|| format!("unknown hand: {name}"))?,
        None => return Err("sample missing :hand".to_string()),
    };
    let x = get_float(item, "x").ok_or("sample missing :x")?;
    let y = get_float(item, "y").ok_or("sample missing :y")?;
    if !x.is_finite() || !y.is_finite() {
        return Err("sample coordinates must be finite".to_string());
    }
    Ok(HandSample::new(hand, x as f32, y as f32))
}

// ── Helpers ────────────────────────────────────────────────

fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

fn is_key(car: &Value, key: &str) -> bool {
    match car {
        Value::Keyword(k) => k.as_ref() == key,
        Value::Symbol(s) => s.strip_prefix(':') == Some(key),
        _ => false,
    }
}

/// Find the raw value following `:key` in a plist.
fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = value;
    while let Value::Cons(pair) = current {
        if is_key(pair.car(), key) {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Extract a keyword value from an s-expression plist.
/// Handles both `Value::Keyword("key")` (elisp parser) and
/// `Value::Symbol(":key")` (default parser) forms.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    Some(match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s: &str = v;
            s.strip_prefix(':').unwrap_or(s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "t" } else { "nil" }).to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    })
}

/// Extract an integer value from an s-expression plist.
fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a string value from an s-expression plist.
fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Extract a floating-point value from an s-expression plist.
fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

// ── Tests ──────────────────────────────────────────────────
