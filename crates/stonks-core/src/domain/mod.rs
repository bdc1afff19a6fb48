//! # Domain Models
//!
//! Canonical value types shared by adapters, the indicator engine and the
//! router. Everything here is constructed per call and owned by the caller.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker |
//! | [`Period`] | Human period token (`1mo` .. `max`) |
//! | [`PriceRow`] | Canonical daily OHLCV row |
//! | [`IndicatorRow`] | Price row plus indicator columns |
//! | [`NewsItem`] | Headline from a news feed |

mod models;
mod period;
mod symbol;

pub use models::{canonicalize, IndicatorRow, NewsItem, PriceRow};
pub use period::{
    filter_by_period, plan_window, widen_for_indicators, Period, WindowPlan, CALENDAR_MAX_DAYS,
    SYNTHETIC_MAX_DAYS,
};
pub use symbol::Symbol;
