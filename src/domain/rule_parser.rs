//! Rule DSL parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to AST with
//! meaningful error messages including character offset, expected/found tokens.

use crate::domain::error::ParseError;
use crate::domain::rule::{Operand, Rule};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        remaining.starts_with(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            Ok(())
        } else {
            let found = self.peek_word();
            Err(self.error(format!("expected '{}', found '{}'", keyword, found)))
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self
            .remaining()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.pos == start {
            return Err(ParseError {
                message: "expected integer".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    /// An integer that must be at least 1, e.g. a period or a window size.
    fn parse_count(&mut self, what: &str) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let n = self.parse_integer()?;
        if n == 0 {
            return Err(ParseError {
                message: format!("{} must be at least 1", what),
                position: start,
            });
        }
        Ok(n)
    }

    fn parse_average(&mut self, keyword: &str) -> Result<Operand, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;
        let period = self.parse_count("period")?;
        self.expect_char(')')?;
        Ok(match keyword {
            "SMA" => Operand::Sma(period),
            _ => Operand::Ema(period),
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return Ok(Operand::Constant(self.parse_number()?));
        }

        let word = self.peek_word();
        let field = match word.as_str() {
            "open" => Operand::Open,
            "high" => Operand::High,
            "low" => Operand::Low,
            "close" => Operand::Close,
            "volume" => Operand::Volume,
            "SMA" | "EMA" => return self.parse_average(&word),
            _ => {
                return Err(self.error(format!(
                    "expected operand (open, high, low, close, volume, number, SMA, EMA), found '{}'",
                    word
                )));
            }
        };
        self.pos += word.len();
        Ok(field)
    }

    fn parse_comparison(&mut self, keyword: &str) -> Result<Rule, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let left = self.parse_operand()?;
        self.expect_char(',')?;
        let right = self.parse_operand()?;
        self.expect_char(')')?;

        Ok(match keyword {
            "CROSS_ABOVE" => Rule::CrossAbove { left, right },
            "CROSS_BELOW" => Rule::CrossBelow { left, right },
            "ABOVE" => Rule::Above { left, right },
            "BELOW" => Rule::Below { left, right },
            _ => Rule::Equals { left, right },
        })
    }

    fn parse_between(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("BETWEEN")?;
        self.expect_char('(')?;

        let operand = self.parse_operand()?;
        self.expect_char(',')?;
        let lower = self.parse_number()?;
        self.expect_char(',')?;
        let upper = self.parse_number()?;
        self.expect_char(')')?;

        Ok(Rule::Between {
            operand,
            lower,
            upper,
        })
    }

    /// AND/OR with two or more comma-separated rules.
    fn parse_list(&mut self, keyword: &str) -> Result<Rule, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;

        let mut rules = vec![self.parse_rule()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }

        if rules.len() < 2 {
            return Err(self.error(format!("{} requires at least 2 rules", keyword)));
        }

        Ok(match keyword {
            "AND" => Rule::And(rules),
            _ => Rule::Or(rules),
        })
    }

    fn parse_not(&mut self) -> Result<Rule, ParseError> {
        self.expect_keyword("NOT")?;
        self.expect_char('(')?;
        let rule = self.parse_rule()?;
        self.expect_char(')')?;
        Ok(Rule::Not(Box::new(rule)))
    }

    /// CONSECUTIVE/ANY_OF: a child rule and a bar count.
    fn parse_window(&mut self, keyword: &str) -> Result<Rule, ParseError> {
        self.expect_keyword(keyword)?;
        self.expect_char('(')?;
        let rule = Box::new(self.parse_rule()?);
        self.expect_char(',')?;
        let count = self.parse_count("count")?;
        self.expect_char(')')?;
        Ok(match keyword {
            "CONSECUTIVE" => Rule::Consecutive { rule, count },
            _ => Rule::AnyOf { rule, count },
        })
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        self.skip_whitespace();

        for keyword in ["CROSS_ABOVE", "CROSS_BELOW", "ABOVE", "BELOW", "EQUALS"] {
            if self.peek_keyword(keyword) {
                return self.parse_comparison(keyword);
            }
        }
        if self.peek_keyword("BETWEEN") {
            return self.parse_between();
        }
        for keyword in ["AND", "OR"] {
            if self.peek_keyword(keyword) {
                return self.parse_list(keyword);
            }
        }
        if self.peek_keyword("NOT") {
            return self.parse_not();
        }
        for keyword in ["CONSECUTIVE", "ANY_OF"] {
            if self.peek_keyword(keyword) {
                return self.parse_window(keyword);
            }
        }

        let word = self.peek_word();
        Err(self.error(format!("expected rule, found '{}'", word)))
    }

    fn parse(&mut self) -> Result<Rule, ParseError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after rule: '{}'",
                self.remaining()
            )));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_above() {
        let rule = parse("ABOVE(close, 100)").unwrap();
        assert_eq!(
            rule,
            Rule::Above {
                left: Operand::Close,
                right: Operand::Constant(100.0)
            }
        );
    }

    #[test]
    fn parse_below_with_averages() {
        let rule = parse("BELOW(SMA(20), EMA(50))").unwrap();
        assert_eq!(
            rule,
            Rule::Below {
                left: Operand::Sma(20),
                right: Operand::Ema(50)
            }
        );
    }

    #[test]
    fn parse_crosses() {
        assert!(matches!(
            parse("CROSS_ABOVE(SMA(20), SMA(50))").unwrap(),
            Rule::CrossAbove { .. }
        ));
        assert!(matches!(
            parse("CROSS_BELOW(close, EMA(200))").unwrap(),
            Rule::CrossBelow { .. }
        ));
    }

    #[test]
    fn parse_between() {
        match parse("BETWEEN(close, 10.5, 99.99)").unwrap() {
            Rule::Between {
                operand,
                lower,
                upper,
            } => {
                assert_eq!(operand, Operand::Close);
                assert!((lower - 10.5).abs() < f64::EPSILON);
                assert!((upper - 99.99).abs() < f64::EPSILON);
            }
            other => panic!("expected Between rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_equals() {
        assert!(matches!(
            parse("EQUALS(close, 100.5)").unwrap(),
            Rule::Equals { .. }
        ));
    }

    #[test]
    fn parse_variadic_and_or() {
        match parse("AND(ABOVE(close, 100), BELOW(close, 150), ABOVE(volume, 0))").unwrap() {
            Rule::And(rules) => assert_eq!(rules.len(), 3),
            other => panic!("expected And rule, got {other:?}"),
        }
        match parse("OR(ABOVE(close, 100), BELOW(close, 50))").unwrap() {
            Rule::Or(rules) => assert_eq!(rules.len(), 2),
            other => panic!("expected Or rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_temporal() {
        match parse("CONSECUTIVE(ABOVE(close, 100), 3)").unwrap() {
            Rule::Consecutive { count, .. } => assert_eq!(count, 3),
            other => panic!("expected Consecutive rule, got {other:?}"),
        }
        match parse("ANY_OF(ABOVE(close, 100), 5)").unwrap() {
            Rule::AnyOf { count, .. } => assert_eq!(count, 5),
            other => panic!("expected AnyOf rule, got {other:?}"),
        }
    }

    #[test]
    fn parse_deeply_nested() {
        let rule = parse(
            "NOT(AND(OR(ABOVE(close, 100), BELOW(close, 50)), CONSECUTIVE(ABOVE(volume, 1000), 3)))",
        )
        .unwrap();
        assert!(matches!(rule, Rule::Not(_)));
    }

    #[test]
    fn parse_whitespace_handling() {
        let rule = parse("  ABOVE  (  close  ,  SMA ( 5 )  )  ").unwrap();
        assert_eq!(
            rule,
            Rule::Above {
                left: Operand::Close,
                right: Operand::Sma(5)
            }
        );
    }

    #[test]
    fn parse_price_fields() {
        for (input, expected) in [
            ("ABOVE(open, 100)", Operand::Open),
            ("ABOVE(high, 100)", Operand::High),
            ("ABOVE(low, 100)", Operand::Low),
            ("ABOVE(close, 100)", Operand::Close),
            ("ABOVE(volume, 100)", Operand::Volume),
        ] {
            match parse(input).unwrap() {
                Rule::Above { left, .. } => assert_eq!(left, expected),
                other => panic!("expected Above rule, got {other:?}"),
            }
        }
    }

    #[test]
    fn parse_negative_numbers() {
        match parse("ABOVE(close, -100.5)").unwrap() {
            Rule::Above {
                right: Operand::Constant(v),
                ..
            } => assert!((v + 100.5).abs() < f64::EPSILON),
            other => panic!("expected Above rule, got {other:?}"),
        }
    }

    #[test]
    fn display_output_parses_back() {
        for input in [
            "CROSS_ABOVE(SMA(20), EMA(50))",
            "BETWEEN(close, 50, 150.5)",
            "AND(ABOVE(close, 100), NOT(EQUALS(volume, 0)), ANY_OF(BELOW(low, -1.5), 4))",
            "OR(CONSECUTIVE(ABOVE(close, open), 3), CROSS_BELOW(close, SMA(10)))",
        ] {
            let rule = parse(input).unwrap();
            assert_eq!(rule.to_string(), input);
            assert_eq!(parse(&rule.to_string()).unwrap(), rule);
        }
    }

    #[test]
    fn error_unexpected_token() {
        let err = parse("ABOVE(close, )").unwrap_err();
        assert!(err.message.contains("expected"));
        assert_eq!(err.position, 13);
    }

    #[test]
    fn error_missing_paren() {
        let err = parse("ABOVE(close, 100").unwrap_err();
        assert!(err.message.contains("expected ')'"));
    }

    #[test]
    fn error_invalid_rule() {
        let err = parse("INVALID(close, 100)").unwrap_err();
        assert!(err.message.contains("expected rule"));
    }

    #[test]
    fn error_unknown_operand() {
        let err = parse("ABOVE(RSI(14), 50)").unwrap_err();
        assert!(err.message.contains("expected operand"));
        assert_eq!(err.position, 6);
    }

    #[test]
    fn error_zero_period_and_count() {
        let err = parse("ABOVE(close, SMA(0))").unwrap_err();
        assert!(err.message.contains("period must be at least 1"));
        let err = parse("CONSECUTIVE(ABOVE(close, 1), 0)").unwrap_err();
        assert!(err.message.contains("count must be at least 1"));
    }

    #[test]
    fn error_trailing_input() {
        let err = parse("ABOVE(close, 100) garbage").unwrap_err();
        assert!(err.message.contains("unexpected input"));
    }

    #[test]
    fn error_missing_comma() {
        let err = parse("ABOVE(close 100)").unwrap_err();
        assert!(err.message.contains("expected ','"));
    }

    #[test]
    fn error_single_child_lists() {
        let err = parse("AND(ABOVE(close, 100))").unwrap_err();
        assert!(err.message.contains("AND requires at least 2 rules"));
        let err = parse("OR(ABOVE(close, 100))").unwrap_err();
        assert!(err.message.contains("OR requires at least 2 rules"));
    }

    #[test]
    fn error_display_with_context() {
        let input = "CROSS_ABOVE(SMA(20), , SMA(50))";
        let err = parse(input).unwrap_err();
        let ctx = err.display_with_context(input);
        assert!(ctx.contains('^'));
        assert!(ctx.contains("position"));
    }

    #[test]
    fn case_sensitive_keywords() {
        let err = parse("above(close, 100)").unwrap_err();
        assert!(err.message.contains("expected rule"));
    }

    #[test]
    fn error_empty_input() {
        let err = parse("").unwrap_err();
        assert!(err.message.contains("expected rule"));
        assert_eq!(err.position, 0);
        assert!(parse("   ").is_err());
    }
}
