use std::collections::HashMap;

use crate::model::{McqAttempt, QuestionId};

/// Quiz score as a rounded percentage of correct answers among attempted
/// questions. No attempts means no score yet, reported as 0.
#[must_use]
pub fn quiz_score(correct: usize, attempted: usize) -> u8 {
    if attempted == 0 {
        return 0;
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = correct as f64 / attempted as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = (ratio * 100.0).round() as u8;
    percent
}

/// Compute the quiz score from attempt records.
///
/// Attempts are unique per question in storage, but the aggregate collapses
/// duplicates anyway, keeping the most recent attempt per question — a
/// re-answered question counts once, with its latest answer.
#[must_use]
pub fn quiz_score_from_attempts<'a, I>(attempts: I) -> u8
where
    I: IntoIterator<Item = &'a McqAttempt>,
{
    let mut latest: HashMap<QuestionId, &McqAttempt> = HashMap::new();
    for attempt in attempts {
        latest
            .entry(attempt.question_id())
            .and_modify(|current| {
                if attempt.attempted_at() >= current.attempted_at() {
                    *current = attempt;
                }
            })
            .or_insert(attempt);
    }

    let attempted = latest.len();
    let correct = latest.values().filter(|a| a.is_correct()).count();
    quiz_score(correct, attempted)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
