//! Market sentiment: a bounded, mean-reverting random walk.
//!
//! Each day the index moves a fraction of the way back toward its baseline
//! and then receives uniform noise drawn from the session's seeded
//! [`ChaCha8Rng`]:
//!
//! ```text
//! s' = clamp(s + reversion_rate * (baseline - s) + noise, 0, 100)
//! ```
//!
//! The band is always derived from the scalar. The last *published* band is
//! remembered only so the pipeline can emit `SentimentChanged` on band
//! transitions instead of every day.

use cryptopolis_types::SentimentBand;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::config::SentimentConfig;

/// Decimal places kept on the index.
const INDEX_SCALE: u32 = 2;

/// Persistent sentiment state, including the session's random stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentState {
    /// Current index in `[0, 100]`.
    value: Decimal,
    /// Band most recently announced to subscribers.
    published_band: SentimentBand,
    /// Operator override; when set the walk is replaced by this value.
    pin: Option<Decimal>,
    /// The session's only source of randomness.
    rng: ChaCha8Rng,
}

impl SentimentState {
    /// Start the index at `initial` (clamped) with a stream seeded by `seed`.
    pub fn new(initial: Decimal, seed: u64) -> Self {
        let value = clamp_index(initial);
        Self {
            value,
            published_band: SentimentBand::classify(value),
            pin: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Current index.
    pub const fn value(&self) -> Decimal {
        self.value
    }

    /// Band of the current index.
    pub fn band(&self) -> SentimentBand {
        SentimentBand::classify(self.value)
    }

    /// Band most recently published.
    pub const fn published_band(&self) -> SentimentBand {
        self.published_band
    }

    /// Active pin, if any.
    pub const fn pin(&self) -> Option<Decimal> {
        self.pin
    }

    /// Hold the index at `value` from the next day on, or release it with
    /// `None`. Pinned values are clamped into range.
    pub fn set_pin(&mut self, value: Option<Decimal>) {
        self.pin = value.map(clamp_index);
    }

    /// The session's random stream. Every stochastic decision in the
    /// simulation draws from here, in pipeline order.
    pub const fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// Result of one day of sentiment movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentUpdate {
    /// The new index.
    pub value: Decimal,
    /// Its band.
    pub band: SentimentBand,
    /// Whether the band differs from the previously published one.
    pub band_changed: bool,
}

/// Stateless stepping rule for [`SentimentState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentEngine {
    baseline: Decimal,
    reversion_rate: Decimal,
    noise_amplitude: Decimal,
}

impl SentimentEngine {
    /// Build the engine from configuration.
    pub fn new(config: &SentimentConfig) -> Self {
        Self {
            baseline: config.baseline,
            reversion_rate: config.reversion_rate,
            noise_amplitude: config.noise_amplitude,
        }
    }

    /// Advance the index by one day.
    ///
    /// A pinned state takes the pin and draws nothing from the stream, so
    /// pinning does not shift later event rolls relative to each other.
    pub fn advance(&self, state: &mut SentimentState) -> SentimentUpdate {
        let next = match state.pin {
            Some(pin) => pin,
            None => {
                let pull = self
                    .reversion_rate
                    .saturating_mul(self.baseline.saturating_sub(state.value));
                let noise = self.draw_noise(&mut state.rng);
                state.value.saturating_add(pull).saturating_add(noise)
            }
        };
        state.value = clamp_index(next).round_dp(INDEX_SCALE);

        let band = SentimentBand::classify(state.value);
        let band_changed = band != state.published_band;
        state.published_band = band;

        SentimentUpdate {
            value: state.value,
            band,
            band_changed,
        }
    }

    /// Uniform noise in `[-amplitude, +amplitude]` at hundredths resolution.
    fn draw_noise(&self, rng: &mut ChaCha8Rng) -> Decimal {
        let span = self
            .noise_amplitude
            .saturating_mul(Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .unwrap_or(0);
        if span <= 0 {
            return Decimal::ZERO;
        }
        let hundredths = rng.random_range(span.saturating_neg()..=span);
        Decimal::new(hundredths, INDEX_SCALE)
    }
}

/// Clamp into the index range.
fn clamp_index(value: Decimal) -> Decimal {
    value.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(reversion: Decimal, noise: Decimal) -> SentimentEngine {
        SentimentEngine::new(&SentimentConfig {
            initial: Decimal::from(50),
            baseline: Decimal::from(50),
            reversion_rate: reversion,
            noise_amplitude: noise,
        })
    }

    #[test]
    fn stays_within_bounds() {
        let eng = engine(Decimal::new(5, 2), Decimal::from(40));
        let mut state = SentimentState::new(Decimal::from(50), 7);
        for _ in 0..5_000 {
            let update = eng.advance(&mut state);
            assert!(update.value >= Decimal::ZERO && update.value <= Decimal::ONE_HUNDRED);
            assert_eq!(update.band, SentimentBand::classify(update.value));
        }
    }

    #[test]
    fn reverts_toward_baseline_without_noise() {
        let eng = engine(Decimal::new(5, 1), Decimal::ZERO);
        let mut state = SentimentState::new(Decimal::from(10), 1);
        let first = eng.advance(&mut state);
        assert_eq!(first.value, Decimal::from(30));
        let second = eng.advance(&mut state);
        assert_eq!(second.value, Decimal::from(40));
    }

    #[test]
    fn band_change_is_reported_once() {
        let eng = engine(Decimal::ONE, Decimal::ZERO);
        let mut state = SentimentState::new(Decimal::from(10), 1);
        assert_eq!(state.published_band(), SentimentBand::ExtremeFear);

        let first = eng.advance(&mut state);
        assert_eq!(first.band, SentimentBand::Neutral);
        assert!(first.band_changed);

        let second = eng.advance(&mut state);
        assert!(!second.band_changed);
    }

    #[test]
    fn pin_overrides_walk_and_is_clamped() {
        let eng = engine(Decimal::new(1, 1), Decimal::ZERO);
        let mut state = SentimentState::new(Decimal::from(50), 3);
        state.set_pin(Some(Decimal::from(150)));
        assert_eq!(state.pin(), Some(Decimal::ONE_HUNDRED));

        for _ in 0..3 {
            let update = eng.advance(&mut state);
            assert_eq!(update.value, Decimal::ONE_HUNDRED);
            assert_eq!(update.band, SentimentBand::ExtremeGreed);
        }

        state.set_pin(None);
        let released = eng.advance(&mut state);
        assert_eq!(released.value, Decimal::from(95));
    }

    #[test]
    fn same_seed_same_walk() {
        let eng = engine(Decimal::new(1, 1), Decimal::from(8));
        let mut a = SentimentState::new(Decimal::from(50), 42);
        let mut b = SentimentState::new(Decimal::from(50), 42);
        for _ in 0..100 {
            assert_eq!(eng.advance(&mut a), eng.advance(&mut b));
        }
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_diverge() {
        let eng = engine(Decimal::new(1, 1), Decimal::from(8));
        let mut a = SentimentState::new(Decimal::from(50), 1);
        let mut b = SentimentState::new(Decimal::from(50), 2);
        let walk_a: Vec<Decimal> = (0..20).map(|_| eng.advance(&mut a).value).collect();
        let walk_b: Vec<Decimal> = (0..20).map(|_| eng.advance(&mut b).value).collect();
        assert_ne!(walk_a, walk_b);
    }
}
