//! Internal helpers for input validation and timestamps.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every operation rejects bad input the same way, before a
//! store transaction is opened.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use crate::{EngineError, ResultEngine};

/// Trim a required name, rejecting blank input.
pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn ensure_positive(value: i64, label: &str) -> ResultEngine<()> {
    if value <= 0 {
        return Err(EngineError::InvalidInput(format!("{label} must be > 0")));
    }
    Ok(())
}

pub(crate) fn ensure_non_negative(value: i64, label: &str) -> ResultEngine<()> {
    if value < 0 {
        return Err(EngineError::InvalidInput(format!("{label} must be >= 0")));
    }
    Ok(())
}

/// `games_played * tariff`, validated.
pub(crate) fn dues_amount(games_played: i64, tariff: i64) -> ResultEngine<i64> {
    ensure_positive(games_played, "games played")?;
    ensure_non_negative(tariff, "tariff")?;
    games_played
        .checked_mul(tariff)
        .ok_or_else(|| EngineError::InvalidInput("dues amount overflows".to_string()))
}

/// `balance + delta`, kept inside `-i64::MAX..=i64::MAX` so a debt can always
/// be negated.
pub(crate) fn checked_balance(balance: i64, delta: i64) -> ResultEngine<i64> {
    balance
        .checked_add(delta)
        .filter(|balance| *balance != i64::MIN)
        .ok_or_else(|| EngineError::InvalidInput("balance overflows".to_string()))
}

/// Hands out strictly increasing timestamps with microsecond resolution.
///
/// Journal ordering and range resets rely on timestamps, so two writes never
/// share one even when they land in the same microsecond.
#[derive(Debug, Default)]
pub(crate) struct MonotonicClock {
    last_micros: AtomicI64,
}

impl MonotonicClock {
    pub(crate) fn now(&self) -> DateTime<Utc> {
        let wall = Utc::now().timestamp_micros();
        let mut last = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = wall.max(last + 1);
            match self.last_micros.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return DateTime::from_timestamp_micros(next).unwrap_or_else(Utc::now),
                Err(actual) => last = actual,
            }
        }
    }
}
