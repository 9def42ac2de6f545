//! Cosmetic progress estimation.

use std::time::Duration;

/// Linear 0–90 estimate of a processing job's progress over the poll window.
///
/// Purely presentational: 100 is only ever set on confirmed completion, and
/// nothing may infer job state from this number.
pub fn estimate(started: tokio::time::Instant, now: tokio::time::Instant, window: Duration) -> u8 {
    if window.is_zero() {
        return 90;
    }
    let elapsed = now.saturating_duration_since(started);
    let ratio = elapsed.as_secs_f64() / window.as_secs_f64();
    (ratio * 90.0).min(90.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_caps_at_ninety() {
        let window = Duration::from_secs(180);
        let t0 = tokio::time::Instant::now();

        assert_eq!(estimate(t0, t0, window), 0);
        assert_eq!(estimate(t0, t0 + Duration::from_secs(90), window), 45);
        assert_eq!(estimate(t0, t0 + Duration::from_secs(180), window), 90);
        // Never reaches 100 on elapsed time alone.
        assert_eq!(estimate(t0, t0 + Duration::from_secs(3600), window), 90);
    }
}
