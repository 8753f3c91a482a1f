use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};

use crate::model::DateKey;

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Today's date key as seen from `zone`, never from the host's local zone.
    #[must_use]
    pub fn today_in(&self, zone: ReferenceZone) -> DateKey {
        zone.date_key(self.now())
    }
}

//
// ─── REFERENCE ZONE ────────────────────────────────────────────────────────────
//

/// Default reference offset: UTC+01:00.
pub const DEFAULT_REFERENCE_OFFSET_MINUTES: i32 = 60;

/// The single time zone every player's "today" is resolved in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(FixedOffset);

impl ReferenceZone {
    /// Zone at `minutes` east of UTC. Returns `None` outside ±24h.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self)
    }

    #[must_use]
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        self.0
    }

    /// Calendar day of `instant` in this zone.
    #[must_use]
    pub fn date_key(&self, instant: DateTime<Utc>) -> DateKey {
        DateKey::from_date(instant.with_timezone(&self.0).date_naive())
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_REFERENCE_OFFSET_MINUTES).unwrap_or_else(Self::utc)
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), fixed_now() + Duration::hours(2));
    }

    #[test]
    fn today_is_resolved_in_reference_zone() {
        // 2023-11-14T22:13:20Z is already the 15th at UTC+2 but still the 14th at UTC.
        let clock = fixed_clock();
        let utc = ReferenceZone::utc();
        let east = ReferenceZone::from_offset_minutes(120).unwrap();
        let west = ReferenceZone::from_offset_minutes(-300).unwrap();

        assert_eq!(clock.today_in(utc).to_string(), "2023-11-14");
        assert_eq!(clock.today_in(east).to_string(), "2023-11-15");
        assert_eq!(clock.today_in(west).to_string(), "2023-11-14");
    }

    #[test]
    fn default_zone_is_utc_plus_one() {
        let zone = ReferenceZone::default();
        assert_eq!(zone.offset().local_minus_utc(), 3600);
        assert!(ReferenceZone::from_offset_minutes(24 * 60).is_none());
    }
}
