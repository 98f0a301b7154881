//! Refresh scheduling for individual feeds.
//!
//! Each configured url carries an explicit [`FeedSchedule`]. Its next
//! allowed refresh is recomputed after every successful fetch by
//! [`next_refresh`], a pure function of the publisher's hint and the
//! configured bounds.

use chrono::{DateTime, Duration, Utc};

/// Per-url refresh state owned by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSchedule {
    /// Feed url.
    pub url: String,

    /// Earliest instant at which the feed may be fetched again.
    pub next_refresh: DateTime<Utc>,
}

impl FeedSchedule {
    /// Schedule for a url that is due immediately.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            next_refresh: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Whether the feed may be fetched at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_refresh
    }
}

/// Compute the next allowed refresh instant.
///
/// The publisher's `hint` is clamped into `[now + min, now + max]`. Without
/// a hint the feed is refreshed again after `max`.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use feedrelay::feeds::next_refresh;
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let next = next_refresh(now, None, Duration::seconds(10), Duration::hours(1));
/// assert_eq!(next, now + Duration::hours(1));
/// ```
pub fn next_refresh(
    now: DateTime<Utc>,
    hint: Option<DateTime<Utc>>,
    min: Duration,
    max: Duration,
) -> DateTime<Utc> {
    let earliest = add_saturating(now, min);
    let latest = add_saturating(now, max).max(earliest);
    match hint {
        Some(hint) => hint.clamp(earliest, latest),
        None => latest,
    }
}

fn add_saturating(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_hint_inside_bounds_is_kept() {
        let hint = now() + Duration::minutes(30);
        let next = next_refresh(now(), Some(hint), Duration::seconds(10), Duration::hours(24));
        assert_eq!(next, hint);
    }

    #[test]
    fn test_hint_below_min_is_raised() {
        let hint = now() - Duration::minutes(5);
        let next = next_refresh(now(), Some(hint), Duration::minutes(1), Duration::hours(24));
        assert_eq!(next, now() + Duration::minutes(1));
    }

    #[test]
    fn test_hint_above_max_is_lowered() {
        let hint = now() + Duration::days(7);
        let next = next_refresh(now(), Some(hint), Duration::seconds(10), Duration::hours(24));
        assert_eq!(next, now() + Duration::hours(24));
    }

    #[test]
    fn test_missing_hint_uses_max() {
        let next = next_refresh(now(), None, Duration::seconds(10), Duration::hours(2));
        assert_eq!(next, now() + Duration::hours(2));
    }

    #[test]
    fn test_new_schedule_is_due() {
        let schedule = FeedSchedule::new("https://example.com/feed.xml");
        assert!(schedule.is_due(now()));
    }

    #[test]
    fn test_schedule_not_due_before_next_refresh() {
        let schedule = FeedSchedule {
            url: "https://example.com/feed.xml".to_string(),
            next_refresh: now() + Duration::seconds(1),
        };
        assert!(!schedule.is_due(now()));
        assert!(schedule.is_due(now() + Duration::seconds(1)));
    }
}
