use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::ValidationError;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Canonical daily OHLCV row.
///
/// The date carries no zone: adapters strip provider offsets before building
/// rows, so two rows compare by calendar day only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceRow {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_positive("open", open)?;
        validate_positive("high", high)?;
        validate_positive("low", low)?;
        validate_positive("close", close)?;

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    /// Build a row from provider fields where anything but `open`/`close`
    /// may be missing.
    ///
    /// Returns `None` when open or close is absent or when a present price
    /// is not a finite positive number. Missing high/low fall back to the
    /// open/close envelope and a missing volume counts as zero.
    pub fn from_partial(
        date: Date,
        open: Option<f64>,
        high: Option<f64>,
        low: Option<f64>,
        close: Option<f64>,
        volume: Option<f64>,
    ) -> Option<Self> {
        let open = open?;
        let close = close?;
        let high = high.unwrap_or_else(|| open.max(close));
        let low = low.unwrap_or_else(|| open.min(close));
        let volume = volume
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value.round() as u64)
            .unwrap_or(0);

        Self::new(date, open, high, low, close, volume).ok()
    }
}

/// Canonical row augmented with series-level indicator columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub price: PriceRow,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub signal_line: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
}

impl IndicatorRow {
    pub fn date(&self) -> Date {
        self.price.date
    }

    pub fn close(&self) -> f64 {
        self.price.close
    }
}

/// Headline pulled from a public news feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub url: String,
    pub source: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub summary: String,
}

/// Sort rows ascending by date and collapse duplicate dates.
///
/// When a provider repeats a date (Yahoo appends a live bar for the current
/// session) the last occurrence wins.
pub fn canonicalize(mut rows: Vec<PriceRow>) -> Vec<PriceRow> {
    // stable sort keeps provider order within a date
    rows.sort_by_key(|row| row.date);

    let mut output: Vec<PriceRow> = Vec::with_capacity(rows.len());
    for row in rows {
        match output.last_mut() {
            Some(last) if last.date == row.date => *last = row,
            _ => output.push(row),
        }
    }
    output
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}
