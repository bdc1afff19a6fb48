//! Series-level technical indicators over canonical daily rows.
//!
//! | Column | Definition |
//! |--------|------------|
//! | `sma_20`, `sma_50` | trailing mean of close, null until the window is full |
//! | `ema_12`, `ema_26` | `α = 2/(span+1)`, seeded with the first close |
//! | `rsi` | 14-row mean gain over mean loss; zero loss yields 100 |
//! | `macd` | `ema_12 - ema_26` |
//! | `signal_line` | 9-span EMA of `macd` |
//! | `upper_band`, `lower_band` | `sma_20 ± 2σ`, σ the trailing-20 sample deviation |
//!
//! After every column is computed, leading nulls are back-filled from the
//! first value and any remaining nulls forward-filled from the last one.

use thiserror::Error;
use time::Date;

use crate::{IndicatorRow, PriceRow};

const SMA_SHORT: usize = 20;
const SMA_LONG: usize = 50;
const EMA_FAST: usize = 12;
const EMA_SLOW: usize = 26;
const SIGNAL_SPAN: usize = 9;
const RSI_WINDOW: usize = 14;
const BAND_WIDTH: f64 = 2.0;

/// Input rows violate the canonical series contract.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("rows are not in ascending date order at index {index} ({date})")]
    Unsorted { index: usize, date: Date },
    #[error("duplicate date {date} at index {index}")]
    DuplicateDate { index: usize, date: Date },
    #[error("close at index {index} is not finite")]
    NonFiniteClose { index: usize },
}

/// Validate the series, then compute every indicator column.
pub fn try_compute(rows: &[PriceRow]) -> Result<Vec<IndicatorRow>, IndicatorError> {
    for (index, row) in rows.iter().enumerate() {
        if !row.close.is_finite() {
            return Err(IndicatorError::NonFiniteClose { index });
        }
        if index == 0 {
            continue;
        }
        let previous = rows[index - 1].date;
        if row.date == previous {
            return Err(IndicatorError::DuplicateDate {
                index,
                date: row.date,
            });
        }
        if row.date < previous {
            return Err(IndicatorError::Unsorted {
                index,
                date: row.date,
            });
        }
    }

    Ok(compute(rows))
}

/// Compute indicator columns for rows already in canonical order.
///
/// Pure and deterministic; the output has one row per input row.
pub fn compute(rows: &[PriceRow]) -> Vec<IndicatorRow> {
    let close = rows.iter().map(|row| row.close).collect::<Vec<_>>();

    let sma_20 = fill_gaps(rolling(&close, SMA_SHORT, mean));
    let sma_50 = fill_gaps(rolling(&close, SMA_LONG, mean));
    let ema_12 = ema(&close, EMA_FAST);
    let ema_26 = ema(&close, EMA_SLOW);
    let macd = ema_12
        .iter()
        .zip(&ema_26)
        .map(|(fast, slow)| fast - slow)
        .collect::<Vec<_>>();
    let signal = ema(&macd, SIGNAL_SPAN);
    let rsi = fill_gaps(rsi(&close, RSI_WINDOW));

    let (upper, lower): (Vec<_>, Vec<_>) = rolling(&close, SMA_SHORT, |window| {
        let centre = mean(window);
        (centre, BAND_WIDTH * sample_std(window, centre))
    })
    .into_iter()
    .map(|band| match band {
        Some((centre, width)) => (Some(centre + width), Some(centre - width)),
        None => (None, None),
    })
    .unzip();
    let upper = fill_gaps(upper);
    let lower = fill_gaps(lower);

    rows.iter()
        .enumerate()
        .map(|(i, price)| IndicatorRow {
            price: *price,
            sma_20: sma_20[i],
            sma_50: sma_50[i],
            ema_12: Some(ema_12[i]),
            ema_26: Some(ema_26[i]),
            rsi: rsi[i],
            macd: Some(macd[i]),
            signal_line: Some(signal[i]),
            upper_band: upper[i],
            lower_band: lower[i],
        })
        .collect()
}

/// Apply `f` to every full trailing window; shorter prefixes yield `None`.
fn rolling<T>(values: &[f64], window: usize, f: impl Fn(&[f64]) -> T) -> Vec<Option<T>> {
    (0..values.len())
        .map(|end| {
            (end + 1 >= window).then(|| f(&values[end + 1 - window..=end]))
        })
        .collect()
}

fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

fn sample_std(window: &[f64], centre: f64) -> f64 {
    if window.len() < 2 {
        return 0.0;
    }
    let squares = window.iter().map(|x| (x - centre).powi(2)).sum::<f64>();
    (squares / (window.len() - 1) as f64).sqrt()
}

/// Seeded with the first value, so a constant series stays exactly constant.
fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut output = Vec::with_capacity(values.len());
    let mut previous = None;

    for &value in values {
        let next = match previous {
            None => value,
            Some(prev) => prev + alpha * (value - prev),
        };
        output.push(next);
        previous = Some(next);
    }
    output
}

/// The difference before the first close counts as flat, so the first value
/// lands on row `window - 1`.
fn rsi(close: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut output = vec![None; close.len()];
    if window == 0 || close.len() < window {
        return output;
    }

    let deltas = std::iter::once(0.0)
        .chain(close.windows(2).map(|pair| pair[1] - pair[0]))
        .collect::<Vec<_>>();
    for end in window - 1..close.len() {
        let span = &deltas[end + 1 - window..=end];
        let gain = span.iter().map(|d| d.max(0.0)).sum::<f64>() / window as f64;
        let loss = span.iter().map(|d| (-d).max(0.0)).sum::<f64>() / window as f64;

        output[end] = Some(if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        });
    }
    output
}

/// Back-fill the head from the first value, then forward-fill the rest.
fn fill_gaps(mut column: Vec<Option<f64>>) -> Vec<Option<f64>> {
    let Some(first) = column.iter().flatten().copied().next() else {
        return column;
    };

    let mut last = first;
    for slot in &mut column {
        if let Some(value) = *slot {
            last = value;
        } else {
            *slot = Some(last);
        }
    }
    column
}
