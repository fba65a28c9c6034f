//! Strategy predicates.
//!
//! [`evaluate`] selects the predicate for a strategy configuration and
//! applies it to the caller input. The result is `Some(bool)` when the
//! predicate could be computed and `None` when the input (or the
//! configuration) cannot be interpreted for that strategy — numeric, date
//! and time parse failures yield `None`; a payload that is not valid JSON
//! yields `Some(false)`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use switcher_core::snapshot::{Operation, StrategyConfig, StrategyKind};

use crate::network::ip_matches_any;
use crate::payload::{parse_json, payload_paths};
use crate::timed_match::TimedMatch;

/// Evaluate a strategy configuration against an input value.
pub async fn evaluate(
    strategy_config: &StrategyConfig,
    input: &str,
    matcher: &TimedMatch,
) -> Option<bool> {
    let operation = strategy_config.operation?;
    let values = &strategy_config.values;

    match strategy_config.strategy {
        StrategyKind::Value => eval_value(operation, values, input),
        StrategyKind::Numeric => eval_numeric(operation, values, input),
        StrategyKind::Date => eval_date(operation, values, input),
        StrategyKind::Time => eval_time(operation, values, input),
        StrategyKind::Payload => eval_payload(operation, values, input),
        StrategyKind::Network => eval_network(operation, values, input),
        StrategyKind::Regex => eval_regex(operation, values, input, matcher).await,
    }
}

fn eval_value(operation: Operation, values: &[String], input: &str) -> Option<bool> {
    let present = values.iter().any(|v| v == input);
    match operation {
        Operation::Exist | Operation::Equal => Some(present),
        Operation::NotExist | Operation::NotEqual => Some(!present),
        _ => None,
    }
}

fn eval_numeric(operation: Operation, values: &[String], input: &str) -> Option<bool> {
    let input: f64 = input.parse().ok()?;
    let values: Vec<f64> = values
        .iter()
        .map(|v| v.parse())
        .collect::<Result<_, _>>()
        .ok()?;

    #[allow(clippy::float_cmp)]
    let present = values.iter().any(|v| *v == input);
    match operation {
        Operation::Exist | Operation::Equal => Some(present),
        Operation::NotExist | Operation::NotEqual => Some(!present),
        Operation::Greater => Some(values.iter().any(|v| input > *v)),
        Operation::Lower => Some(values.iter().any(|v| input < *v)),
        Operation::Between => between(&input, &values),
        _ => None,
    }
}

fn eval_date(operation: Operation, values: &[String], input: &str) -> Option<bool> {
    let input = parse_date(input)?;
    let values: Vec<NaiveDateTime> = values.iter().map(|v| parse_date(v)).collect::<Option<_>>()?;
    ordered(operation, &input, &values)
}

fn eval_time(operation: Operation, values: &[String], input: &str) -> Option<bool> {
    let input = parse_time(input)?;
    let values: Vec<NaiveTime> = values.iter().map(|v| parse_time(v)).collect::<Option<_>>()?;
    ordered(operation, &input, &values)
}

fn eval_payload(operation: Operation, values: &[String], input: &str) -> Option<bool> {
    let Some(payload) = parse_json(input) else {
        return Some(false);
    };
    let paths = payload_paths(&payload);

    match operation {
        Operation::HasOne => Some(values.iter().any(|v| paths.contains(v))),
        Operation::HasAll => Some(values.iter().all(|v| paths.contains(v))),
        _ => None,
    }
}

fn eval_network(operation: Operation, values: &[String], input: &str) -> Option<bool> {
    match operation {
        Operation::Exist => Some(ip_matches_any(input, values)),
        // Any match means false.
        Operation::NotExist => Some(!ip_matches_any(input, values)),
        _ => Some(false),
    }
}

async fn eval_regex(
    operation: Operation,
    values: &[String],
    input: &str,
    matcher: &TimedMatch,
) -> Option<bool> {
    match operation {
        Operation::Exist => Some(matcher.try_match(values, input, false).await),
        Operation::NotExist => Some(!matcher.try_match(values, input, false).await),
        Operation::Equal => Some(matcher.try_match(values, input, true).await),
        Operation::NotEqual => Some(!matcher.try_match(values, input, true).await),
        _ => None,
    }
}

/// Ordering operations shared by DATE and TIME strategies. `GREATER` and
/// `LOWER` are inclusive at equality; `BETWEEN` bounds are inclusive.
fn ordered<T: PartialOrd>(operation: Operation, input: &T, values: &[T]) -> Option<bool> {
    match operation {
        Operation::Lower => Some(values.iter().any(|v| input <= v)),
        Operation::Greater => Some(values.iter().any(|v| input >= v)),
        Operation::Between => between(input, values),
        _ => None,
    }
}

fn between<T: PartialOrd>(input: &T, values: &[T]) -> Option<bool> {
    if values.len() < 2 {
        return None;
    }
    Some(*input >= values[0] && *input <= values[1])
}

/// Parse `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD` (midnight when the time is
/// missing).
fn parse_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}
