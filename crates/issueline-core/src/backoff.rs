//! Backoff policy: how long to wait before the next attempt
//!
//! Stateless. The only input besides the attempt number is an optional wait
//! suggested by the server (`Retry-After`), which wins over the exponential
//! schedule. Randomness for jitter is passed in so tests can seed it.

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use rand::Rng;

/// Exponential backoff with jitter and a ceiling on server-suggested waits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Wait before the second attempt (attempt 1 failed)
    pub base: Duration,
    /// Upper bound of the computed (pre-jitter) wait
    pub max_delay: Duration,
    /// Jitter is drawn from `[0, jitter_fraction * computed)`
    pub jitter_fraction: f64,
    /// Upper bound applied to `Retry-After` values
    pub max_retry_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            jitter_fraction: 0.25,
            max_retry_after: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    /// Computed wait before jitter: `base * 2^(attempt-1)`, capped at `max_delay`.
    ///
    /// Attempt 0 is treated as attempt 1.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exp).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Wait before the next attempt after `attempt` failed.
    ///
    /// `retry_after` is the server hint already converted to a duration
    /// (see [`parse_retry_after`]). When present it is used as-is, clamped to
    /// `max_retry_after`, without jitter.
    pub fn delay<R: Rng + ?Sized>(
        &self,
        attempt: u32,
        retry_after: Option<Duration>,
        rng: &mut R,
    ) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_retry_after);
        }
        let computed = self.base_delay(attempt);
        // NaN and negative fractions mean no jitter; anything above 1 is 1
        let fraction = self.jitter_fraction.clamp(0.0, 1.0);
        if fraction.is_nan() || fraction <= 0.0 || computed.is_zero() {
            return computed;
        }
        let jitter = Duration::try_from_secs_f64(computed.as_secs_f64() * fraction * rng.gen::<f64>())
            .unwrap_or(Duration::ZERO);
        computed.saturating_add(jitter)
    }
}

/// Parse a `Retry-After` header value relative to `now`.
///
/// Accepts delta-seconds (`"120"`) or an HTTP-date in IMF-fixdate, RFC 850 or
/// asctime form. Dates in the past yield a zero wait. Anything else is `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse::<u64>().ok().map(Duration::from_secs);
    }
    let at = parse_http_date(value)?;
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Obsolete forms still allowed by RFC 9110
    const LEGACY: [&str; 2] = ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];
    LEGACY
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            base: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_fraction: 0.5,
            max_retry_after: Duration::from_secs(120),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap()
    }

    #[test]
    fn base_delay_doubles() {
        let p = policy();
        assert_eq!(p.base_delay(1), Duration::from_secs(1));
        assert_eq!(p.base_delay(2), Duration::from_secs(2));
        assert_eq!(p.base_delay(3), Duration::from_secs(4));
        assert_eq!(p.base_delay(4), Duration::from_secs(8));
    }

    #[test]
    fn base_delay_monotonic_and_capped() {
        let p = policy();
        let mut prev = Duration::ZERO;
        for attempt in 1..=200 {
            let d = p.base_delay(attempt);
            assert!(d >= prev, "attempt {attempt}: {d:?} < {prev:?}");
            assert!(d <= p.max_delay);
            prev = d;
        }
        assert_eq!(p.base_delay(200), p.max_delay);
        assert_eq!(p.base_delay(u32::MAX), p.max_delay);
    }

    #[test]
    fn attempt_zero_same_as_one() {
        let p = policy();
        assert_eq!(p.base_delay(0), p.base_delay(1));
    }

    #[test]
    fn jitter_within_bounds() {
        let p = policy();
        let mut rng = StdRng::seed_from_u64(7);
        for attempt in 1..=10 {
            let base = p.base_delay(attempt);
            for _ in 0..50 {
                let d = p.delay(attempt, None, &mut rng);
                assert!(d >= base);
                assert!(d <= base.mul_f64(1.0 + p.jitter_fraction));
            }
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let p = BackoffPolicy {
            jitter_fraction: 0.0,
            ..policy()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(p.delay(3, None, &mut rng), Duration::from_secs(4));
    }

    #[test]
    fn out_of_range_jitter_fraction_is_clamped() {
        let mut rng = StdRng::seed_from_u64(11);
        for fraction in [f64::INFINITY, 5.0] {
            let p = BackoffPolicy {
                jitter_fraction: fraction,
                ..policy()
            };
            let d = p.delay(2, None, &mut rng);
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(4));
        }
        for fraction in [f64::NAN, f64::NEG_INFINITY, -1.0] {
            let p = BackoffPolicy {
                jitter_fraction: fraction,
                ..policy()
            };
            assert_eq!(p.delay(2, None, &mut rng), Duration::from_secs(2));
        }
    }

    #[test]
    fn huge_delays_saturate() {
        let p = BackoffPolicy {
            base: Duration::MAX,
            max_delay: Duration::MAX,
            jitter_fraction: 1.0,
            ..policy()
        };
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(p.delay(1, None, &mut rng), Duration::MAX);
    }

    #[test]
    fn retry_after_takes_precedence() {
        let p = policy();
        let mut rng = StdRng::seed_from_u64(3);
        // Exponential schedule at attempt 1 would be ~1s
        assert_eq!(
            p.delay(1, Some(Duration::from_secs(5)), &mut rng),
            Duration::from_secs(5)
        );
        // ...and at attempt 10 it would be 30s
        assert_eq!(
            p.delay(10, Some(Duration::from_secs(5)), &mut rng),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn retry_after_clamped() {
        let p = policy();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(
            p.delay(1, Some(Duration::from_secs(86_400)), &mut rng),
            p.max_retry_after
        );
    }

    #[test]
    fn parse_seconds() {
        assert_eq!(parse_retry_after("5", now()), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 0 ", now()), Some(Duration::ZERO));
    }

    #[test]
    fn parse_imf_fixdate() {
        let d = parse_retry_after("Wed, 21 Oct 2015 07:28:30 GMT", now());
        assert_eq!(d, Some(Duration::from_secs(30)));
    }

    #[test]
    fn parse_rfc850_date() {
        let d = parse_retry_after("Wednesday, 21-Oct-15 07:29:00 GMT", now());
        assert_eq!(d, Some(Duration::from_secs(60)));
    }

    #[test]
    fn parse_asctime_date() {
        let d = parse_retry_after("Wed Oct 21 07:28:10 2015", now());
        assert_eq!(d, Some(Duration::from_secs(10)));
    }

    #[test]
    fn past_date_is_zero() {
        let d = parse_retry_after("Wed, 21 Oct 2015 07:00:00 GMT", now());
        assert_eq!(d, Some(Duration::ZERO));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_retry_after("", now()), None);
        assert_eq!(parse_retry_after("soon", now()), None);
        assert_eq!(parse_retry_after("-5", now()), None);
        assert_eq!(parse_retry_after("1.5", now()), None);
    }
}
