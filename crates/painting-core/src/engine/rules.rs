//! Notification decision rules
//!
//! Everything in this module is pure: the same paintings and the same `now`
//! always produce the same decisions. Nothing here remembers what was sent
//! before, so running a sweep twice on one day decides the same sends twice.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RuleConfig;
use crate::model::Painting;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Round a duration up to whole days
///
/// `ceil_days(6d 1h) == 7`, `ceil_days(7d) == 7`, `ceil_days(-1h) == 0`.
pub fn ceil_days(delta: Duration) -> i64 {
    let millis = delta.num_milliseconds();
    let days = millis / MILLIS_PER_DAY;
    if millis % MILLIS_PER_DAY > 0 {
        days + 1
    } else {
        days
    }
}

/// Effect of a single write on a painting's lending state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Available (or absent) before, lent after
    BecameLent,
    /// Still available, still lent, or returned
    NoTransition,
}

/// Classify a write given the record before it (`None` on create) and after it
pub fn classify_transition(before: Option<&Painting>, after: &Painting) -> Transition {
    let was_lent = before.is_some_and(Painting::is_lent);
    if !was_lent && after.is_lent() {
        Transition::BecameLent
    } else {
        Transition::NoTransition
    }
}

/// Kinds of notification the engine can decide on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    LendingConfirmation,
    ReminderDue,
    OverdueNotice,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NotificationKind::LendingConfirmation => "lending confirmation",
            NotificationKind::ReminderDue => "reminder",
            NotificationKind::OverdueNotice => "overdue notice",
        };
        f.write_str(name)
    }
}

/// A decided notification, carrying the painting as it was when decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    LendingConfirmation {
        painting: Painting,
    },
    ReminderDue {
        painting: Painting,
        days_remaining: i64,
    },
    OverdueNotice {
        painting: Painting,
        days_overdue: i64,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::LendingConfirmation { .. } => NotificationKind::LendingConfirmation,
            NotificationEvent::ReminderDue { .. } => NotificationKind::ReminderDue,
            NotificationEvent::OverdueNotice { .. } => NotificationKind::OverdueNotice,
        }
    }

    pub fn painting(&self) -> &Painting {
        match self {
            NotificationEvent::LendingConfirmation { painting }
            | NotificationEvent::ReminderDue { painting, .. }
            | NotificationEvent::OverdueNotice { painting, .. } => painting,
        }
    }
}

/// Confirmation to send for a write, if the write started a lending episode
pub fn lending_confirmation(before: Option<&Painting>, after: &Painting) -> Option<NotificationEvent> {
    match classify_transition(before, after) {
        Transition::BecameLent => Some(NotificationEvent::LendingConfirmation {
            painting: after.clone(),
        }),
        Transition::NoTransition => None,
    }
}

/// Reminder and overdue cadence used by the daily sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepRules {
    reminder_days_before: i64,
    overdue_repeat_days: i64,
}

impl Default for SweepRules {
    fn default() -> Self {
        Self {
            reminder_days_before: 7,
            overdue_repeat_days: 7,
        }
    }
}

impl From<&RuleConfig> for SweepRules {
    fn from(config: &RuleConfig) -> Self {
        Self {
            reminder_days_before: config.reminder_days_before,
            overdue_repeat_days: config.overdue_repeat_days,
        }
    }
}

impl SweepRules {
    /// Reminder due for this painting today, if any
    ///
    /// Fires only when the due date is exactly `reminder_days_before` days
    /// away after rounding up. A missed day is not caught up later.
    pub fn reminder(&self, painting: &Painting, now: DateTime<Utc>) -> Option<NotificationEvent> {
        let due = eligible_due_date(painting)?;
        let days_remaining = ceil_days(due - now);
        (days_remaining == self.reminder_days_before).then(|| NotificationEvent::ReminderDue {
            painting: painting.clone(),
            days_remaining,
        })
    }

    /// Overdue notice due for this painting today, if any
    ///
    /// Fires on the first overdue day and on every multiple of
    /// `overdue_repeat_days` after that.
    pub fn overdue(&self, painting: &Painting, now: DateTime<Utc>) -> Option<NotificationEvent> {
        let due = eligible_due_date(painting)?;
        if due >= now {
            return None;
        }
        let days_overdue = ceil_days(now - due);
        (days_overdue == 1 || days_overdue % self.overdue_repeat_days == 0).then(|| {
            NotificationEvent::OverdueNotice {
                painting: painting.clone(),
                days_overdue,
            }
        })
    }

    /// Decide every reminder and overdue notice for one sweep
    ///
    /// Reminders come first, then overdue notices, each in input order.
    pub fn evaluate(&self, paintings: &[Painting], now: DateTime<Utc>) -> Vec<NotificationEvent> {
        let reminders = paintings.iter().filter_map(|p| self.reminder(p, now));
        let overdue = paintings.iter().filter_map(|p| self.overdue(p, now));
        reminders.chain(overdue).collect()
    }
}

/// Due date of a painting that can be notified about
///
/// Available paintings and paintings whose due date is missing or
/// unparseable are excluded. Being lent already implies a borrower email.
fn eligible_due_date(painting: &Painting) -> Option<DateTime<Utc>> {
    if !painting.is_lent() {
        return None;
    }
    painting.due_at()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PaintingDraft, PaintingId};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn lent(due: Option<DateTime<Utc>>) -> Painting {
        let mut draft = PaintingDraft::new("Harbour").lent_to("Ann", "ann@example.com");
        draft.due_date = due.map(|d| d.to_rfc3339());
        Painting::from_draft(PaintingId(1), draft, "admin", now())
    }

    fn available() -> Painting {
        Painting::from_draft(PaintingId(2), PaintingDraft::new("Dunes"), "admin", now())
    }

    #[test]
    fn ceil_days_rounds_up_partial_days() {
        assert_eq!(ceil_days(Duration::days(7)), 7);
        assert_eq!(ceil_days(Duration::days(6) + Duration::hours(1)), 7);
        assert_eq!(ceil_days(Duration::days(7) + Duration::milliseconds(1)), 8);
        assert_eq!(ceil_days(Duration::hours(-1)), 0);
        assert_eq!(ceil_days(Duration::zero()), 0);
        assert_eq!(ceil_days(Duration::days(-2) - Duration::hours(3)), -2);
    }

    #[test]
    fn became_lent_only_from_available_or_absent() {
        let lent = lent(None);
        let available = available();

        assert_eq!(classify_transition(None, &lent), Transition::BecameLent);
        assert_eq!(classify_transition(Some(&available), &lent), Transition::BecameLent);
        assert_eq!(classify_transition(Some(&lent), &lent), Transition::NoTransition);
        assert_eq!(classify_transition(Some(&lent), &available), Transition::NoTransition);
        assert_eq!(classify_transition(Some(&available), &available), Transition::NoTransition);
        assert_eq!(classify_transition(None, &available), Transition::NoTransition);
    }

    #[test]
    fn lending_confirmation_snapshots_the_new_state() {
        let after = lent(None);
        let event = lending_confirmation(Some(&available()), &after).unwrap();
        assert_eq!(event.kind(), NotificationKind::LendingConfirmation);
        assert_eq!(event.painting(), &after);
        assert!(lending_confirmation(Some(&after), &after).is_none());
    }

    #[test]
    fn reminder_fires_only_at_exactly_seven_days() {
        let rules = SweepRules::default();
        for days in [6, 8] {
            let p = lent(Some(now() + Duration::days(days)));
            assert!(rules.reminder(&p, now()).is_none(), "{} days", days);
        }

        let p = lent(Some(now() + Duration::days(7)));
        match rules.reminder(&p, now()) {
            Some(NotificationEvent::ReminderDue { days_remaining, .. }) => {
                assert_eq!(days_remaining, 7)
            }
            other => panic!("expected reminder, got {:?}", other),
        }

        // Ceiling arithmetic: 6 days and a few hours counts as 7
        let p = lent(Some(now() + Duration::days(6) + Duration::hours(15)));
        assert!(rules.reminder(&p, now()).is_some());
    }

    #[test]
    fn overdue_fires_on_day_one_and_multiples_of_seven() {
        let rules = SweepRules::default();
        for days in 1..=30 {
            let p = lent(Some(now() - Duration::days(days)));
            let expected = days == 1 || days % 7 == 0;
            assert_eq!(rules.overdue(&p, now()).is_some(), expected, "{} days overdue", days);
        }
    }

    #[test]
    fn due_now_or_later_is_not_overdue() {
        let rules = SweepRules::default();
        assert!(rules.overdue(&lent(Some(now())), now()).is_none());
        assert!(rules.overdue(&lent(Some(now() + Duration::hours(1))), now()).is_none());
    }

    #[test]
    fn available_or_dateless_paintings_are_skipped() {
        let rules = SweepRules::default();
        let mut available_but_dated = available();
        available_but_dated.due_date = Some((now() + Duration::days(7)).to_rfc3339());

        let mut malformed = lent(None);
        malformed.due_date = Some("whenever".to_string());

        let items = vec![available_but_dated, lent(None), malformed];
        assert!(rules.evaluate(&items, now()).is_empty());
    }

    #[test]
    fn blank_borrower_email_is_never_eligible() {
        let rules = SweepRules::default();
        let mut reminder = lent(Some(now() + Duration::days(7)));
        reminder.borrower_email = Some(String::new());
        let mut overdue = lent(Some(now() - Duration::days(7)));
        overdue.borrower_email = Some(String::new());

        assert!(!reminder.is_lent());
        assert!(rules.evaluate(&[reminder, overdue], now()).is_empty());
    }

    #[test]
    fn evaluate_is_deterministic_and_orders_reminders_first() {
        let rules = SweepRules::default();
        let overdue = lent(Some(now() - Duration::days(14)));
        let mut reminder = lent(Some(now() + Duration::days(7)));
        reminder.id = PaintingId(9);
        let items = vec![overdue, reminder];

        let first = rules.evaluate(&items, now());
        let second = rules.evaluate(&items, now());
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].kind(), NotificationKind::ReminderDue);
        assert_eq!(first[1].kind(), NotificationKind::OverdueNotice);
    }

    #[test]
    fn custom_cadence_from_config() {
        let config = RuleConfig {
            reminder_days_before: 3,
            overdue_repeat_days: 5,
            ..RuleConfig::default()
        };
        let rules = SweepRules::from(&config);
        assert!(rules.reminder(&lent(Some(now() + Duration::days(3))), now()).is_some());
        assert!(rules.overdue(&lent(Some(now() - Duration::days(10))), now()).is_some());
        assert!(rules.overdue(&lent(Some(now() - Duration::days(7))), now()).is_none());
    }
}
