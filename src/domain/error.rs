//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for replaytrader.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("backtest has no {handler} handler configured")]
    MissingHandler { handler: &'static str },

    #[error("backtest has no symbols configured")]
    NoSymbols,

    #[error("{stage} handler failed: {reason}")]
    Handler { stage: &'static str, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReplayError {
    /// Shorthand for a fatal failure raised inside one of the pipeline handlers.
    pub fn handler(stage: &'static str, reason: impl Into<String>) -> Self {
        ReplayError::Handler {
            stage,
            reason: reason.into(),
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ReplayError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&ReplayError> for std::process::ExitCode {
    fn from(err: &ReplayError) -> Self {
        let code: u8 = match err {
            ReplayError::Io(_) => 1,
            ReplayError::ConfigParse { .. }
            | ReplayError::ConfigMissing { .. }
            | ReplayError::ConfigInvalid { .. } => 2,
            ReplayError::NoData { .. } | ReplayError::Data { .. } => 3,
            ReplayError::RuleParse(_) | ReplayError::RuleInvalid { .. } => 4,
            ReplayError::MissingHandler { .. }
            | ReplayError::NoSymbols
            | ReplayError::Handler { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "expected ')'".into(),
            position: 6,
        };
        let shown = err.display_with_context("ABOVE(close");
        let lines: Vec<&str> = shown.lines().collect();
        assert_eq!(lines[0], "ABOVE(close");
        assert_eq!(lines[1], "      ^");
        assert_eq!(lines[2], "parse error at position 6: expected ')'");
    }

    #[test]
    fn handler_error_message() {
        let err = ReplayError::handler("strategy", "boom");
        assert_eq!(err.to_string(), "strategy handler failed: boom");
    }

    #[test]
    fn missing_handler_message() {
        let err = ReplayError::MissingHandler { handler: "exchange" };
        assert_eq!(err.to_string(), "backtest has no exchange handler configured");
    }

    #[test]
    fn rule_parse_is_transparent() {
        let err: ReplayError = ParseError {
            message: "bad".into(),
            position: 0,
        }
        .into();
        assert_eq!(err.to_string(), "parse error at position 0: bad");
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;
        let code = |e: &ReplayError| format!("{:?}", ExitCode::from(e));
        assert_eq!(code(&ReplayError::NoSymbols), format!("{:?}", ExitCode::from(5)));
        assert_eq!(
            code(&ReplayError::invalid("backtest", "initial_cash", "x")),
            format!("{:?}", ExitCode::from(2))
        );
        assert_eq!(
            code(&ReplayError::NoData {
                symbol: "AAPL".into()
            }),
            format!("{:?}", ExitCode::from(3))
        );
    }
}
