//! Retention rules
//!
//! Durations are stored as raw milliseconds, `0` meaning "retain forever".
//! [`RetentionPeriod`] renders them in the largest unit reached, for display
//! only.

use crate::error::{FieldIssue, IssueKind, ValidationError};
use crate::options::EntityOptions;
use crate::rules::{expect_domain, DisplayField, TransitionRules};
use cfg_snapshot::{ConfigDomain, ConfigSnapshot, RetentionSettings};
use std::fmt::{self, Display, Formatter};

const SECOND_MS: f64 = 1_000.0;
const MINUTE_MS: f64 = 60.0 * SECOND_MS;
const HOUR_MS: f64 = 60.0 * MINUTE_MS;
const DAY_MS: f64 = 24.0 * HOUR_MS;

/// Average year length in days
pub const DAYS_PER_YEAR: f64 = 365.25;
/// Average month length in days
pub const DAYS_PER_MONTH: f64 = 30.44;

/// Display unit: name, size in ms, and the threshold from which it is used
///
/// Years start at 365 calendar days and months at 30, so a plain 365-day
/// count reads as one year rather than twelve months.
const UNITS: [(&str, f64, f64); 7] = [
    ("year", DAYS_PER_YEAR * DAY_MS, 365.0 * DAY_MS),
    ("month", DAYS_PER_MONTH * DAY_MS, 30.0 * DAY_MS),
    ("week", 7.0 * DAY_MS, 7.0 * DAY_MS),
    ("day", DAY_MS, DAY_MS),
    ("hour", HOUR_MS, HOUR_MS),
    ("minute", MINUTE_MS, MINUTE_MS),
    ("second", SECOND_MS, 0.0),
];

/// Rendered label for a zero duration
pub const FOREVER: &str = "Forever";

/// Non-negative retention duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetentionPeriod(u64);

impl RetentionPeriod {
    /// Retain forever
    pub const FOREVER: Self = Self(0);

    /// From milliseconds
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds
    #[inline]
    #[must_use]
    pub const fn millis(self) -> u64 {
        self.0
    }

    /// Whether this is the "forever" sentinel
    #[inline]
    #[must_use]
    pub const fn is_forever(self) -> bool {
        self.0 == 0
    }
}

/// A negative duration was supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("negative duration: {0}ms")]
pub struct NegativeDuration(pub i64);

impl TryFrom<i64> for RetentionPeriod {
    type Error = NegativeDuration;

    fn try_from(ms: i64) -> Result<Self, Self::Error> {
        u64::try_from(ms)
            .map(Self)
            .map_err(|_| NegativeDuration(ms))
    }
}

impl Display for RetentionPeriod {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_forever() {
            return f.write_str(FOREVER);
        }

        let ms = self.0 as f64;
        let mut index = UNITS
            .iter()
            .position(|&(_, _, threshold)| ms >= threshold)
            .unwrap_or(UNITS.len() - 1);
        // rounding can carry into the next unit up: 59.96 seconds is a minute
        while index > 0
            && round_tenth(ms / UNITS[index].1) * UNITS[index].1 >= UNITS[index - 1].2
        {
            index -= 1;
        }

        let (unit, size, _) = UNITS[index];
        let amount = format!("{:.1}", round_tenth(ms / size));
        let plural = if amount == "1.0" { "" } else { "s" };
        write!(f, "{amount} {unit}{plural}")
    }
}

fn round_tenth(amount: f64) -> f64 {
    (amount * 10.0).round() / 10.0
}

/// Render a millisecond count, or `None` when it is negative
#[must_use]
pub fn humanize_millis(ms: i64) -> Option<String> {
    RetentionPeriod::try_from(ms).ok().map(|period| period.to_string())
}

/// Rules for the retention domain
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionRules;

impl RetentionRules {
    /// Create new retention rules
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TransitionRules for RetentionRules {
    fn domain(&self) -> ConfigDomain {
        ConfigDomain::Retention
    }

    fn validate(&self, draft: &ConfigSnapshot) -> Result<(), ValidationError> {
        expect_domain(ConfigDomain::Retention, draft)?;
        let settings = RetentionSettings::from_snapshot(draft)?;

        let issues = settings
            .durations
            .iter()
            .filter(|(_, ms)| *ms < 0)
            .map(|&(key, ms)| FieldIssue::new(key, IssueKind::NegativeDuration(ms)))
            .collect();

        ValidationError::check(ConfigDomain::Retention, issues)
    }

    fn describe(&self, snapshot: &ConfigSnapshot, _options: &EntityOptions) -> Vec<DisplayField> {
        let Ok(settings) = RetentionSettings::from_snapshot(snapshot) else {
            return Vec::new();
        };

        let mut fields: Vec<DisplayField> = settings
            .durations
            .iter()
            .map(|&(key, ms)| {
                let text = humanize_millis(ms).unwrap_or_else(|| format!("Invalid ({ms}ms)"));
                DisplayField::new(key, text)
            })
            .collect();

        fields.push(DisplayField::new(
            cfg_snapshot::schema::AUDIT_TRAILS_ENABLED,
            toggle(settings.audit_trails_enabled),
        ));
        fields.push(DisplayField::new(
            cfg_snapshot::schema::SEARCH_TRAILS_ENABLED,
            toggle(settings.search_trails_enabled),
        ));
        fields
    }
}

fn toggle(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}
