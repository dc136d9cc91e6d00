use chrono::Duration;

/// Quantization step for unit progress, in percent points.
pub const PROGRESS_STEP: u8 = 5;

/// Share of a lesson's duration that must be watched before the lesson
/// counts as completed.
pub const COMPLETION_RATIO: f64 = 0.95;

//
// ─── HEARTBEAT CLAMP ───────────────────────────────────────────────────────────
//

/// Clamp a heartbeat's reported watch-time delta.
///
/// The applied delta never exceeds:
/// - the wall-clock time elapsed since the previous heartbeat (`elapsed`),
///   when a previous heartbeat exists — a client cannot report more watched
///   seconds than real seconds passed;
/// - the lesson's remaining un-watched duration, so per-lesson watch time
///   never exceeds the lesson duration.
///
/// The first heartbeat for a lesson has no baseline and passes `None` for
/// `elapsed`; it is bounded by the remaining duration only. A backdated
/// `elapsed` (negative duration) clamps to zero.
#[must_use]
pub fn clamp_heartbeat_delta(
    reported_secs: u32,
    elapsed: Option<Duration>,
    watched_secs: u32,
    duration_secs: u32,
) -> u32 {
    let mut allowed = duration_secs.saturating_sub(watched_secs);

    if let Some(elapsed) = elapsed {
        let elapsed_secs = u32::try_from(elapsed.num_seconds().max(0)).unwrap_or(u32::MAX);
        allowed = allowed.min(elapsed_secs);
    }

    reported_secs.min(allowed)
}

//
// ─── UNIT PROGRESS ─────────────────────────────────────────────────────────────
//

/// Compute unit progress from per-lesson `(watch_time_secs, duration_secs)`
/// pairs covering every lesson of the course.
///
/// Lessons the learner has not started contribute zero watch time but their
/// duration still counts toward the denominator. Watch time is clamped to
/// the lesson duration before aggregation, so stale or over-reported rows
/// cannot push the ratio past 100%.
///
/// Returns a multiple of [`PROGRESS_STEP`] in `[0, 100]`; a course with zero
/// total duration reports zero progress.
#[must_use]
pub fn unit_progress<I>(lessons: I) -> u8
where
    I: IntoIterator<Item = (u32, u32)>,
{
    let mut watched: u64 = 0;
    let mut duration: u64 = 0;

    for (watch_secs, duration_secs) in lessons {
        watched += u64::from(watch_secs.min(duration_secs));
        duration += u64::from(duration_secs);
    }

    if duration == 0 {
        return 0;
    }

    // Ratios stay within [0, 1] after the per-lesson clamp; f64 holds any
    // realistic seconds total exactly.
    #[allow(clippy::cast_precision_loss)]
    let raw = (watched as f64 / duration as f64 * 100.0).clamp(0.0, 100.0);

    let step = f64::from(PROGRESS_STEP);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let stepped = ((raw / step).floor() * step) as u8;
    stepped
}

/// True once the watched share of a lesson reaches [`COMPLETION_RATIO`].
///
/// A zero-duration lesson can never complete through watching.
#[must_use]
pub fn is_watch_complete(watched_secs: u32, duration_secs: u32) -> bool {
    duration_secs > 0 && f64::from(watched_secs) >= COMPLETION_RATIO * f64::from(duration_secs)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_first_heartbeat_bounded_by_duration_only() {
        assert_eq!(clamp_heartbeat_delta(30, None, 0, 600), 30);
        assert_eq!(clamp_heartbeat_delta(900, None, 0, 600), 600);
    }

    #[test]
    fn clamp_limits_delta_to_elapsed_wall_clock() {
        let elapsed = Duration::seconds(10);
        assert_eq!(clamp_heartbeat_delta(30, Some(elapsed), 0, 600), 10);
        assert_eq!(clamp_heartbeat_delta(5, Some(elapsed), 0, 600), 5);
    }

    #[test]
    fn clamp_never_exceeds_remaining_duration() {
        let elapsed = Duration::seconds(120);
        assert_eq!(clamp_heartbeat_delta(120, Some(elapsed), 550, 600), 50);
        assert_eq!(clamp_heartbeat_delta(120, Some(elapsed), 600, 600), 0);
    }

    #[test]
    fn clamp_backdated_elapsed_applies_nothing() {
        let elapsed = Duration::seconds(-30);
        assert_eq!(clamp_heartbeat_delta(30, Some(elapsed), 0, 600), 0);
    }

    #[test]
    fn unit_progress_is_quantized_to_five() {
        // 30s of 600s = 5%; 299s = 49.8% -> 45%; 300s = 50%.
        assert_eq!(unit_progress([(30, 600)]), 5);
        assert_eq!(unit_progress([(299, 600)]), 45);
        assert_eq!(unit_progress([(300, 600)]), 50);
        assert_eq!(unit_progress([(600, 600)]), 100);
    }

    #[test]
    fn unit_progress_counts_unstarted_lessons_in_denominator() {
        // 300s watched of a 600s course spread over two lessons.
        assert_eq!(unit_progress([(300, 300), (0, 300)]), 50);
    }

    #[test]
    fn unit_progress_zero_total_duration_is_zero() {
        assert_eq!(unit_progress([]), 0);
        assert_eq!(unit_progress([(0, 0), (0, 0)]), 0);
    }

    #[test]
    fn unit_progress_clamps_overwatched_lessons() {
        // A row with watch > duration (e.g. written before the clamp existed)
        // must not push progress past 100.
        assert_eq!(unit_progress([(900, 600)]), 100);
        assert_eq!(unit_progress([(900, 600), (0, 600)]), 50);
    }

    #[test]
    fn watch_complete_at_ninety_five_percent() {
        assert!(!is_watch_complete(569, 600));
        assert!(is_watch_complete(570, 600));
        assert!(is_watch_complete(600, 600));
        assert!(!is_watch_complete(0, 0));
    }
}
