use std::f64::consts::TAU;

use time::{Date, Duration};

use crate::adapters::today_utc;
use crate::data_source::{HistoryFuture, HistoryRequest, HistorySource};
use crate::{Period, PriceRow, ProviderId, SYNTHETIC_MAX_DAYS};

const START_PRICE: f64 = 150.0;
const DAILY_VOLATILITY: f64 = 0.02;

/// Terminal fallback: a geometric random walk with one row per calendar day.
///
/// Unseeded generators draw fresh entropy per call; seeded ones produce the
/// same walk every time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticGenerator {
    seed: Option<u64>,
}

impl SyntheticGenerator {
    pub const fn new() -> Self {
        Self { seed: None }
    }

    pub const fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    /// Rows ending today (UTC).
    pub fn generate(&self, period: Period) -> Vec<PriceRow> {
        self.generate_until(period, today_utc())
    }

    /// Rows ending at `last`, inclusive.
    pub fn generate_until(&self, period: Period, last: Date) -> Vec<PriceRow> {
        let len = period.lookback_days(SYNTHETIC_MAX_DAYS);
        let mut rng = match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };

        let mut log_return = 0.0;
        (0..len)
            .map(|index| {
                if index > 0 {
                    log_return += DAILY_VOLATILITY * standard_normal(&mut rng);
                }
                let price = START_PRICE * f64::exp(log_return);
                let back = i64::from(len - 1 - index);

                PriceRow {
                    date: last.saturating_sub(Duration::days(back)),
                    open: price,
                    high: price * 1.01,
                    low: price * 0.99,
                    close: price,
                    volume: rng.u64(1_000_000..5_000_000),
                }
            })
            .collect()
    }
}

impl HistorySource for SyntheticGenerator {
    fn id(&self) -> ProviderId {
        ProviderId::Synthetic
    }

    fn daily_history<'a>(&'a self, req: HistoryRequest) -> HistoryFuture<'a> {
        Box::pin(async move { Ok(self.generate(req.window)) })
    }
}

/// Box-Muller transform; `1 - f64()` keeps the log argument in (0, 1].
fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn length_follows_period_with_max_ceiling() {
        let generator = SyntheticGenerator::seeded(7);
        assert_eq!(generator.generate(Period::OneMonth).len(), 30);
        assert_eq!(generator.generate(Period::TwoYears).len(), 730);
        assert_eq!(generator.generate(Period::Max).len(), 3000);
    }

    #[test]
    fn walk_starts_at_base_price_with_fixed_envelope() {
        let rows = SyntheticGenerator::seeded(42).generate_until(Period::SixMonths, date!(2024 - 06 - 30));

        assert_eq!(rows[0].close, 150.0);
        assert_eq!(rows[0].date, date!(2024 - 01 - 03));
        assert_eq!(rows.last().map(|row| row.date), Some(date!(2024 - 06 - 30)));

        for pair in rows.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
        for row in &rows {
            assert!(row.close > 0.0);
            assert_eq!(row.open, row.close);
            assert!((row.high - row.close * 1.01).abs() < 1e-9);
            assert!((row.low - row.close * 0.99).abs() < 1e-9);
            assert!((1_000_000..5_000_000).contains(&row.volume));
        }
    }

    #[test]
    fn seeded_walks_are_reproducible() {
        let day = date!(2024 - 06 - 30);
        let a = SyntheticGenerator::seeded(9).generate_until(Period::OneYear, day);
        let b = SyntheticGenerator::seeded(9).generate_until(Period::OneYear, day);
        let c = SyntheticGenerator::seeded(10).generate_until(Period::OneYear, day);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn daily_returns_are_roughly_two_percent() {
        let rows = SyntheticGenerator::seeded(3).generate_until(Period::Max, date!(2024 - 06 - 30));
        let returns = rows
            .windows(2)
            .map(|pair| (pair[1].close / pair[0].close).ln())
            .collect::<Vec<_>>();
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;

        assert!(mean.abs() < 0.003, "mean {mean}");
        assert!((var.sqrt() - 0.02).abs() < 0.002, "std {}", var.sqrt());
    }
}
