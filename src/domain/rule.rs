//! Rule AST for the gating DSL.
//!
//! - `Operand`: what can be compared (bar fields, constants, moving averages)
//! - `Rule`: comparison, composite and temporal variants
//!
//! `Display` renders a rule back into the DSL text accepted by
//! `rule_parser::parse`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    Constant(f64),
    /// Simple moving average of close over n bars.
    Sma(usize),
    /// Exponential moving average of close, seeded with the first SMA.
    Ema(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    Between {
        operand: Operand,
        lower: f64,
        upper: f64,
    },
    Equals {
        left: Operand,
        right: Operand,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    Consecutive {
        rule: Box<Rule>,
        count: usize,
    },
    AnyOf {
        rule: Box<Rule>,
        count: usize,
    },
}

impl Rule {
    /// Bars of history the rule needs before it can be true.
    pub fn lookback(&self) -> usize {
        match self {
            Rule::CrossAbove { left, right } | Rule::CrossBelow { left, right } => {
                left.lookback().max(right.lookback()) + 1
            }
            Rule::Above { left, right }
            | Rule::Below { left, right }
            | Rule::Equals { left, right } => left.lookback().max(right.lookback()),
            Rule::Between { operand, .. } => operand.lookback(),
            Rule::And(rules) | Rule::Or(rules) => {
                rules.iter().map(Rule::lookback).max().unwrap_or(1)
            }
            Rule::Not(rule) => rule.lookback(),
            Rule::Consecutive { rule, count } | Rule::AnyOf { rule, count } => {
                rule.lookback() + count.saturating_sub(1)
            }
        }
    }
}

impl Operand {
    pub fn lookback(&self) -> usize {
        match self {
            Operand::Sma(n) | Operand::Ema(n) => (*n).max(1),
            _ => 1,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => f.write_str("open"),
            Operand::High => f.write_str("high"),
            Operand::Low => f.write_str("low"),
            Operand::Close => f.write_str("close"),
            Operand::Volume => f.write_str("volume"),
            Operand::Constant(v) => write!(f, "{v}"),
            Operand::Sma(n) => write!(f, "SMA({n})"),
            Operand::Ema(n) => write!(f, "EMA({n})"),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, keyword: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{keyword}(")?;
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{rule}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({left}, {right})"),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({left}, {right})"),
            Rule::Above { left, right } => write!(f, "ABOVE({left}, {right})"),
            Rule::Below { left, right } => write!(f, "BELOW({left}, {right})"),
            Rule::Equals { left, right } => write!(f, "EQUALS({left}, {right})"),
            Rule::Between {
                operand,
                lower,
                upper,
            } => write!(f, "BETWEEN({operand}, {lower}, {upper})"),
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(rule) => write!(f, "NOT({rule})"),
            Rule::Consecutive { rule, count } => write!(f, "CONSECUTIVE({rule}, {count})"),
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({rule}, {count})"),
        }
    }
}
