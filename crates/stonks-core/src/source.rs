use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Identifier of the adapter that served (or failed) an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// Session-authenticated Yahoo client (cookie + crumb).
    Yahoo,
    /// Anonymous Yahoo chart endpoint.
    YahooChart,
    AlphaVantage,
    Finnhub,
    Polygon,
    Synthetic,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::YahooChart => "yahoo_chart",
            Self::AlphaVantage => "alpha_vantage",
            Self::Finnhub => "finnhub",
            Self::Polygon => "polygon",
            Self::Synthetic => "synthetic",
        }
    }

    pub const fn requires_api_key(self) -> bool {
        matches!(self, Self::AlphaVantage | Self::Finnhub | Self::Polygon)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSelector {
    #[default]
    Yahoo,
    AlphaVantage,
    Finnhub,
    Polygon,
    Mock,
}

impl ProviderSelector {
    pub const ALL: [Self; 5] = [
        Self::Yahoo,
        Self::AlphaVantage,
        Self::Finnhub,
        Self::Polygon,
        Self::Mock,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::AlphaVantage => "alpha_vantage",
            Self::Finnhub => "finnhub",
            Self::Polygon => "polygon",
            Self::Mock => "mock",
        }
    }

    /// Parse a selector; unknown names take the default Yahoo path.
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// Paid provider this selector pins, if any.
    pub const fn paid_provider(self) -> Option<ProviderId> {
        match self {
            Self::AlphaVantage => Some(ProviderId::AlphaVantage),
            Self::Finnhub => Some(ProviderId::Finnhub),
            Self::Polygon => Some(ProviderId::Polygon),
            Self::Yahoo | Self::Mock => None,
        }
    }
}

impl Display for ProviderSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderSelector {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "alpha_vantage" | "alphavantage" => Ok(Self::AlphaVantage),
            "finnhub" => Ok(Self::Finnhub),
            "polygon" => Ok(Self::Polygon),
            "mock" => Ok(Self::Mock),
            other => Err(ValidationError::InvalidProvider {
                value: other.to_owned(),
            }),
        }
    }
}
