//! Engine configuration.

use std::time::Duration;

use domain::{DEFAULT_AFFIRMATIVE_REPLIES, Discount, MatchCriteria, ReplyMatcher};

use crate::error::{FillError, Result};

/// Widest accepted date skew, in days.
pub const MAX_DATE_SKEW_DAYS: i64 = 366;

/// Tunables for matching, offers, booking and the sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillConfig {
    /// Maximum distance in days between a requested date and the slot date.
    pub max_date_skew_days: i64,
    /// Maximum number of candidates per offer.
    pub max_candidates: usize,
    pub min_discount_percent: u8,
    pub max_discount_percent: u8,
    pub min_response_window: Duration,
    pub max_response_window: Duration,
    /// How often the scheduled sweeper runs.
    pub sweep_interval: Duration,
    /// Upper bound on a single booking service call.
    pub booking_timeout: Duration,
    /// Filter candidates on their morning/afternoon preference.
    pub honor_time_preference: bool,
    /// Country code assumed for national-format sender numbers.
    pub default_country_code: String,
    /// Replies treated as an acceptance.
    pub affirmative_replies: Vec<String>,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            max_date_skew_days: 3,
            max_candidates: 10,
            min_discount_percent: 0,
            max_discount_percent: Discount::MAX_PERCENT,
            min_response_window: Duration::from_secs(60 * 60),
            max_response_window: Duration::from_secs(48 * 60 * 60),
            sweep_interval: Duration::from_secs(15 * 60),
            booking_timeout: Duration::from_secs(10),
            honor_time_preference: false,
            default_country_code: "1".to_string(),
            affirmative_replies: DEFAULT_AFFIRMATIVE_REPLIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FillConfig {
    /// Checks that the bounds are consistent.
    ///
    /// A sweep interval longer than a quarter of the shortest response window
    /// is allowed but logged, since expired offers would linger.
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_DATE_SKEW_DAYS).contains(&self.max_date_skew_days) {
            return Err(FillError::InvalidConfig(format!(
                "max_date_skew_days must be within 0..={MAX_DATE_SKEW_DAYS}"
            )));
        }
        if self.max_candidates == 0 {
            return Err(FillError::InvalidConfig(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        if self.min_discount_percent > self.max_discount_percent
            || self.max_discount_percent > Discount::MAX_PERCENT
        {
            return Err(FillError::InvalidConfig(format!(
                "discount bounds {}..={} invalid",
                self.min_discount_percent, self.max_discount_percent
            )));
        }
        if self.min_response_window.is_zero()
            || self.min_response_window > self.max_response_window
        {
            return Err(FillError::InvalidConfig(format!(
                "response window bounds {:?}..={:?} invalid",
                self.min_response_window, self.max_response_window
            )));
        }
        if self.sweep_interval.is_zero() || self.booking_timeout.is_zero() {
            return Err(FillError::InvalidConfig(
                "sweep_interval and booking_timeout must be positive".to_string(),
            ));
        }
        if self.default_country_code.is_empty()
            || !self.default_country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(FillError::InvalidConfig(format!(
                "default_country_code {:?} must be digits",
                self.default_country_code
            )));
        }

        if self.sweep_interval > self.min_response_window / 4 {
            tracing::warn!(
                sweep_interval = ?self.sweep_interval,
                min_response_window = ?self.min_response_window,
                "sweep interval exceeds a quarter of the shortest response window"
            );
        }
        Ok(())
    }

    /// Candidate filter derived from this configuration.
    pub fn match_criteria(&self) -> MatchCriteria {
        MatchCriteria {
            max_date_skew_days: self.max_date_skew_days,
            max_candidates: self.max_candidates,
            honor_time_preference: self.honor_time_preference,
        }
    }

    pub fn reply_matcher(&self) -> ReplyMatcher {
        ReplyMatcher::new(&self.affirmative_replies)
    }

    /// Validates an admin-chosen discount against the configured bounds.
    pub fn check_discount(&self, percent: u8) -> Result<Discount> {
        if percent < self.min_discount_percent || percent > self.max_discount_percent {
            return Err(FillError::InvalidDiscount {
                percent,
                min: self.min_discount_percent,
                max: self.max_discount_percent,
            });
        }
        Ok(Discount::new(percent)?)
    }

    /// Validates an admin-chosen response window against the configured
    /// bounds.
    pub fn check_response_window(&self, window: chrono::Duration) -> Result<()> {
        let min = self.min_response_window.as_secs() as i64 / 60;
        let max = self.max_response_window.as_secs() as i64 / 60;
        let in_range = window
            .to_std()
            .is_ok_and(|w| w >= self.min_response_window && w <= self.max_response_window);
        if !in_range {
            return Err(FillError::InvalidResponseWindow {
                minutes: window.num_minutes(),
                min,
                max,
            });
        }
        Ok(())
    }
}
