use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const MAX_TICKER_LEN: usize = 20;

/// Normalized security identifier. The entity key across every stage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse and normalize a ticker to uppercase.
    ///
    /// Exchange suffixes (`7203.T`), share classes (`BRK-B`, `BF/B`) and
    /// leading digits are accepted.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyTicker);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ConfigError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '/');
            if !valid {
                return Err(ConfigError::TickerInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_ticker() {
        let parsed = Ticker::parse(" aapl ").expect("ticker should parse");
        assert_eq!(parsed.as_str(), "AAPL");
    }

    #[test]
    fn accepts_exchange_suffix_and_share_class() {
        assert_eq!(Ticker::parse("7203.t").expect("parse").as_str(), "7203.T");
        assert_eq!(Ticker::parse("brk-b").expect("parse").as_str(), "BRK-B");
    }

    #[test]
    fn rejects_empty_ticker() {
        let err = Ticker::parse("   ").expect_err("must fail");
        assert!(matches!(err, ConfigError::EmptyTicker));
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = Ticker::parse("AAPL$").expect_err("must fail");
        assert!(matches!(err, ConfigError::TickerInvalidChar { index: 4, .. }));
    }

    #[test]
    fn deserializes_through_validation() {
        let err = serde_json::from_str::<Ticker>("\"\"").expect_err("must fail");
        assert!(err.to_string().contains("empty"));
    }
}
