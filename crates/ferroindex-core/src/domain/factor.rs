use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Numeric attribute of a candidate usable for ranking and weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    MarketCap,
    FreeFloatMarketCap,
    Liquidity,
    Volume,
    DividendYield,
    PriceToEarnings,
    PriceToBook,
    Revenue,
}

impl Factor {
    pub const ALL: [Self; 8] = [
        Self::MarketCap,
        Self::FreeFloatMarketCap,
        Self::Liquidity,
        Self::Volume,
        Self::DividendYield,
        Self::PriceToEarnings,
        Self::PriceToBook,
        Self::Revenue,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MarketCap => "market_cap",
            Self::FreeFloatMarketCap => "free_float_market_cap",
            Self::Liquidity => "liquidity",
            Self::Volume => "volume",
            Self::DividendYield => "dividend_yield",
            Self::PriceToEarnings => "price_to_earnings",
            Self::PriceToBook => "price_to_book",
            Self::Revenue => "revenue",
        }
    }
}

impl Display for Factor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Factor {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "market_cap" => Ok(Self::MarketCap),
            "free_float_market_cap" | "free_float" => Ok(Self::FreeFloatMarketCap),
            "liquidity" => Ok(Self::Liquidity),
            "volume" | "average_daily_volume" => Ok(Self::Volume),
            "dividend_yield" => Ok(Self::DividendYield),
            "price_to_earnings" | "pe_ratio" | "pe" => Ok(Self::PriceToEarnings),
            "price_to_book" | "pb_ratio" | "pb" => Ok(Self::PriceToBook),
            "revenue" => Ok(Self::Revenue),
            _ => Err(ConfigError::UnknownFactor {
                value: value.trim().to_owned(),
            }),
        }
    }
}
