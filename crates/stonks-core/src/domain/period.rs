//! Period tokens and the window policy applied before provider dispatch.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{PriceRow, ProviderId, ValidationError};

/// Ceiling used for `max` by the synthetic generator.
pub const SYNTHETIC_MAX_DAYS: u32 = 3000;
/// Ceiling used for `max` by providers queried with an explicit date range.
pub const CALENDAR_MAX_DAYS: u32 = 3650;

/// Human period token accepted by the fetch entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[default]
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Self; 7] = [
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::Max,
    ];

    /// Token as sent in Yahoo's `range` parameter.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }

    /// Parse a token, falling back to `2y` for anything unrecognized.
    pub fn parse_lenient(token: &str) -> Self {
        token.parse().unwrap_or_default()
    }

    /// Calendar days covered by the period; `None` for `max`.
    pub const fn days(self) -> Option<u32> {
        match self {
            Self::OneMonth => Some(30),
            Self::ThreeMonths => Some(90),
            Self::SixMonths => Some(180),
            Self::OneYear => Some(365),
            Self::TwoYears => Some(730),
            Self::FiveYears => Some(1825),
            Self::Max => None,
        }
    }

    /// Day count with `max` resolved against a provider ceiling.
    pub fn lookback_days(self, ceiling: u32) -> u32 {
        self.days().unwrap_or(ceiling)
    }

    /// First date kept by a client-side filter; `None` means unbounded.
    pub fn cutoff(self, today: Date) -> Option<Date> {
        self.days()
            .map(|days| today.saturating_sub(Duration::days(i64::from(days))))
    }

    /// Alpha Vantage `outputsize`: the compact series holds ~100 sessions.
    pub const fn alpha_vantage_output_size(self) -> &'static str {
        match self {
            Self::TwoYears | Self::FiveYears | Self::Max => "full",
            _ => "compact",
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1mo" => Ok(Self::OneMonth),
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            "max" => Ok(Self::Max),
            other => Err(ValidationError::InvalidPeriod {
                value: other.to_owned(),
            }),
        }
    }
}

/// Window actually requested from a provider plus the optional client-side
/// cutoff applied to its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub fetch: Period,
    pub post_filter: Option<Period>,
}

/// Short windows are widened so the 50-row indicator windows have history.
pub const fn widen_for_indicators(requested: Period) -> Period {
    match requested {
        Period::OneMonth | Period::ThreeMonths => Period::SixMonths,
        other => other,
    }
}

/// Window policy per provider.
///
/// Yahoo paths fetch the widened window and return it unfiltered, so a
/// `1mo` request yields roughly six months of rows. Paid providers fetch and
/// filter with the requested period. Changing the Yahoo asymmetry only
/// touches this function.
pub fn plan_window(requested: Period, provider: ProviderId) -> WindowPlan {
    match provider {
        ProviderId::Yahoo | ProviderId::YahooChart => WindowPlan {
            fetch: widen_for_indicators(requested),
            post_filter: None,
        },
        ProviderId::AlphaVantage | ProviderId::Finnhub | ProviderId::Polygon => WindowPlan {
            fetch: requested,
            post_filter: Some(requested),
        },
        ProviderId::Synthetic => WindowPlan {
            fetch: requested,
            post_filter: None,
        },
    }
}

/// Keep rows dated on or after `today - period`; `max` keeps everything.
pub fn filter_by_period(rows: Vec<PriceRow>, period: Period, today: Date) -> Vec<PriceRow> {
    match period.cutoff(today) {
        Some(cutoff) => rows.into_iter().filter(|row| row.date >= cutoff).collect(),
        None => rows,
    }
}
