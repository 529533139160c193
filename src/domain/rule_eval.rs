//! Rule evaluation over a symbol's bar history.
//!
//! # Evaluation Semantics
//!
//! - Comparison rules: evaluate at the given bar index
//! - `CROSS_ABOVE`/`CROSS_BELOW`: require `index >= 1`, return `false` at index 0
//! - `AND`: short-circuits on first `false`
//! - `OR`: short-circuits on first `true`
//! - `CONSECUTIVE(rule, N)`: child must be true for N consecutive bars ending at current
//! - `ANY_OF(rule, N)`: child must be true at least once in the last N bars
//!
//! Moving averages in warmup resolve to NaN, and every comparison against
//! NaN is false. Averages come from an [`AverageCache`] tied to `bars`.

use crate::domain::event::DataEvent;
use crate::domain::moving_average::{Average, AverageCache};
use crate::domain::rule::{Operand, Rule};

const EPSILON: f64 = 1e-9;

pub fn evaluate(rule: &Rule, bars: &[DataEvent], index: usize, cache: &mut AverageCache) -> bool {
    if index >= bars.len() {
        return false;
    }
    match rule {
        Rule::CrossAbove { left, right } => {
            if index == 0 {
                return false;
            }
            let left_curr = resolve_operand(left, bars, index, cache);
            let right_curr = resolve_operand(right, bars, index, cache);
            let left_prev = resolve_operand(left, bars, index - 1, cache);
            let right_prev = resolve_operand(right, bars, index - 1, cache);

            left_curr > right_curr && left_prev <= right_prev
        }
        Rule::CrossBelow { left, right } => {
            if index == 0 {
                return false;
            }
            let left_curr = resolve_operand(left, bars, index, cache);
            let right_curr = resolve_operand(right, bars, index, cache);
            let left_prev = resolve_operand(left, bars, index - 1, cache);
            let right_prev = resolve_operand(right, bars, index - 1, cache);

            left_curr < right_curr && left_prev >= right_prev
        }
        Rule::Above { left, right } => {
            resolve_operand(left, bars, index, cache) > resolve_operand(right, bars, index, cache)
        }
        Rule::Below { left, right } => {
            resolve_operand(left, bars, index, cache) < resolve_operand(right, bars, index, cache)
        }
        Rule::Between {
            operand,
            lower,
            upper,
        } => {
            let val = resolve_operand(operand, bars, index, cache);
            val >= *lower && val <= *upper
        }
        Rule::Equals { left, right } => {
            let left_val = resolve_operand(left, bars, index, cache);
            let right_val = resolve_operand(right, bars, index, cache);
            (left_val - right_val).abs() < EPSILON
        }
        Rule::And(rules) => rules.iter().all(|r| evaluate(r, bars, index, cache)),
        Rule::Or(rules) => rules.iter().any(|r| evaluate(r, bars, index, cache)),
        Rule::Not(rule) => !evaluate(rule, bars, index, cache),
        Rule::Consecutive { rule, count } => {
            if *count == 0 || index + 1 < *count {
                return false;
            }
            ((index + 1 - *count)..=index).all(|i| evaluate(rule, bars, i, cache))
        }
        Rule::AnyOf { rule, count } => {
            if *count == 0 {
                return false;
            }
            let start = index.saturating_sub(*count - 1);
            (start..=index).any(|i| evaluate(rule, bars, i, cache))
        }
    }
}

fn resolve_operand(
    operand: &Operand,
    bars: &[DataEvent],
    index: usize,
    cache: &mut AverageCache,
) -> f64 {
    let bar = &bars[index];
    match operand {
        Operand::Open => bar.open,
        Operand::High => bar.high,
        Operand::Low => bar.low,
        Operand::Close => bar.close,
        Operand::Volume => bar.volume,
        Operand::Constant(v) => *v,
        Operand::Sma(n) => cache.value(Average::Sma(*n), bars, index).unwrap_or(f64::NAN),
        Operand::Ema(n) => cache.value(Average::Ema(*n), bars, index).unwrap_or(f64::NAN),
    }
}
