use crate::models::{DailyFocusPoint, FocusSession, MoodEntry};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeSet;

/// Number of consecutive days, ending today or yesterday, with at least one
/// completed session. A day without a completion breaks the streak.
pub fn current_streak<I>(completion_dates: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = completion_dates.into_iter().collect();

    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor = cursor - Duration::days(1);
    }
    streak
}

pub fn streak_from_sessions(sessions: &[FocusSession], today: NaiveDate) -> u32 {
    current_streak(
        sessions
            .iter()
            .filter_map(|session| session.completed_at)
            .map(|at| at.date_naive()),
        today,
    )
}

/// Scores of entries logged in the trailing `days` window, oldest first.
pub fn mood_trend(entries: &[MoodEntry], today: NaiveDate, days: u32) -> Vec<u8> {
    let mut window = entries_within(entries, today, days);
    window.sort_by_key(|entry| entry.created_at);
    window.into_iter().map(|entry| entry.mood_score).collect()
}

/// Start of the trailing `days` window ending at `now`, never earlier than
/// the Unix epoch.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .map_or(DateTime::<Utc>::UNIX_EPOCH, |start| start.max(DateTime::<Utc>::UNIX_EPOCH))
}

pub fn entries_within(entries: &[MoodEntry], today: NaiveDate, days: u32) -> Vec<MoodEntry> {
    let from = Duration::try_days(i64::from(days))
        .and_then(|span| today.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN);
    entries
        .iter()
        .filter(|entry| entry.created_at.date_naive() >= from)
        .cloned()
        .collect()
}

pub fn build_focus_week(sessions: &[FocusSession]) -> Vec<DailyFocusPoint> {
    build_focus_week_at(Utc::now().date_naive(), sessions)
}

pub fn build_focus_week_at(today: NaiveDate, sessions: &[FocusSession]) -> Vec<DailyFocusPoint> {
    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset);
        let mut sessions_completed = 0u32;
        let mut focus_minutes = 0u32;
        for session in sessions {
            let Some(completed_at) = session.completed_at else {
                continue;
            };
            if completed_at.date_naive() == date {
                sessions_completed = sessions_completed.saturating_add(1);
                focus_minutes =
                    focus_minutes.saturating_add(session.actual_duration_minutes.unwrap_or(0));
            }
        }
        last_7_days.push(DailyFocusPoint {
            date: date.to_string(),
            sessions_completed,
            focus_minutes,
        });
    }
    last_7_days
}
