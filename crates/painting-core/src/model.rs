//! Painting records
//!
//! A painting is either available or lent. There is no stored status column:
//! the state is derived from the borrower fields, and [`Painting::lending_state`]
//! is the only place that derivation happens.
//!
//! Dates are kept as the text the record store holds. A stored date that does
//! not parse is treated the same as no date at all.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a painting record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaintingId(pub i64);

impl fmt::Display for PaintingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lending state derived from the borrower fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LendingState {
    /// In the collection's custody
    Available,
    /// Held by a borrower (name and email both present)
    Lent,
}

/// A painting record as held by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Painting {
    /// Record identifier
    pub id: PaintingId,
    /// Display name
    pub title: String,
    /// Free-form category
    pub category: Option<String>,
    /// Where the painting normally hangs
    pub address: Option<String>,
    /// Relative or absolute link to the uploaded image
    pub image_url: Option<String>,
    /// Name of the current borrower
    pub borrower_name: Option<String>,
    /// Email of the current borrower
    pub borrower_email: Option<String>,
    /// Phone number of the current borrower
    pub borrower_phone: Option<String>,
    /// When the painting left custody
    pub lent_date: Option<String>,
    /// When the painting is expected back
    pub due_date: Option<String>,
    /// User that created the record
    pub created_by: Option<String>,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// User that last modified the record
    pub modified_by: Option<String>,
    /// Last modification time
    pub modified_at: Option<DateTime<Utc>>,
}

impl Painting {
    /// Build a new record from a draft
    ///
    /// Stamps both audit pairs with `actor` and `now`. Stores assign their own
    /// id on insert, so `id` only matters for records that are never stored.
    pub fn from_draft(
        id: PaintingId,
        draft: PaintingDraft,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let draft = draft.normalized();
        Self {
            id,
            title: draft.title,
            category: draft.category,
            address: draft.address,
            image_url: draft.image_url,
            borrower_name: draft.borrower_name,
            borrower_email: draft.borrower_email,
            borrower_phone: draft.borrower_phone,
            lent_date: draft.lent_date,
            due_date: draft.due_date,
            created_by: Some(actor.to_string()),
            created_at: Some(now),
            modified_by: Some(actor.to_string()),
            modified_at: Some(now),
        }
    }

    /// Replace every editable field with the draft's values
    pub(crate) fn apply_draft(&mut self, draft: PaintingDraft, actor: &str, now: DateTime<Utc>) {
        let draft = draft.normalized();
        self.title = draft.title;
        self.category = draft.category;
        self.address = draft.address;
        self.image_url = draft.image_url;
        self.borrower_name = draft.borrower_name;
        self.borrower_email = draft.borrower_email;
        self.borrower_phone = draft.borrower_phone;
        self.lent_date = draft.lent_date;
        self.due_date = draft.due_date;
        self.modified_by = Some(actor.to_string());
        self.modified_at = Some(now);
    }

    /// The editable fields of this record
    pub fn to_draft(&self) -> PaintingDraft {
        PaintingDraft {
            title: self.title.clone(),
            category: self.category.clone(),
            address: self.address.clone(),
            image_url: self.image_url.clone(),
            borrower_name: self.borrower_name.clone(),
            borrower_email: self.borrower_email.clone(),
            borrower_phone: self.borrower_phone.clone(),
            lent_date: self.lent_date.clone(),
            due_date: self.due_date.clone(),
        }
    }

    /// Derive the lending state
    ///
    /// Lent iff both borrower name and borrower email are non-empty.
    pub fn lending_state(&self) -> LendingState {
        if present(&self.borrower_name) && present(&self.borrower_email) {
            LendingState::Lent
        } else {
            LendingState::Available
        }
    }

    /// Shorthand for `lending_state() == LendingState::Lent`
    pub fn is_lent(&self) -> bool {
        self.lending_state() == LendingState::Lent
    }

    /// Address notifications for this painting go to, if any
    pub fn recipient(&self) -> Option<&str> {
        self.borrower_email.as_deref().filter(|s| !s.is_empty())
    }

    /// Parsed due date
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_date.as_deref().and_then(parse_date)
    }

    /// Parsed lent date
    pub fn lent_at(&self) -> Option<DateTime<Utc>> {
        self.lent_date.as_deref().and_then(parse_date)
    }
}

/// Editable fields of a painting, used for create and full-replacement update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintingDraft {
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub borrower_name: Option<String>,
    #[serde(default)]
    pub borrower_email: Option<String>,
    #[serde(default)]
    pub borrower_phone: Option<String>,
    #[serde(default)]
    pub lent_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl PaintingDraft {
    /// Create a draft for an available painting
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the borrower
    pub fn lent_to(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.borrower_name = Some(name.into());
        self.borrower_email = Some(email.into());
        self
    }

    /// Set the borrower phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.borrower_phone = Some(phone.into());
        self
    }

    /// Set the lent date
    pub fn with_lent_date(mut self, date: impl Into<String>) -> Self {
        self.lent_date = Some(date.into());
        self
    }

    /// Set the due date
    pub fn with_due_date(mut self, date: impl Into<String>) -> Self {
        self.due_date = Some(date.into());
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the location
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the image link
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Clear the borrower and lending dates
    pub fn returned(mut self) -> Self {
        self.borrower_name = None;
        self.borrower_email = None;
        self.borrower_phone = None;
        self.lent_date = None;
        self.due_date = None;
        self
    }

    /// Trim text and turn blank optional fields into `None`
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            category: blank_to_none(self.category),
            address: blank_to_none(self.address),
            image_url: blank_to_none(self.image_url),
            borrower_name: blank_to_none(self.borrower_name),
            borrower_email: blank_to_none(self.borrower_email),
            borrower_phone: blank_to_none(self.borrower_phone),
            lent_date: blank_to_none(self.lent_date),
            due_date: blank_to_none(self.due_date),
        }
    }

    /// Check the draft can be written
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::invalid_input("Painting title cannot be empty"));
        }
        Ok(())
    }
}

/// Parse a stored date
///
/// Accepts RFC 3339 instants and plain `YYYY-MM-DD` dates. Plain dates are
/// taken as midnight UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn painting(name: Option<&str>, email: Option<&str>) -> Painting {
        let mut draft = PaintingDraft::new("Water Lilies");
        draft.borrower_name = name.map(String::from);
        draft.borrower_email = email.map(String::from);
        Painting::from_draft(PaintingId(1), draft, "admin", Utc::now())
    }

    #[test]
    fn lent_requires_both_name_and_email() {
        assert_eq!(painting(None, None).lending_state(), LendingState::Available);
        assert_eq!(painting(Some("Ann"), None).lending_state(), LendingState::Available);
        assert_eq!(painting(None, Some("a@x.com")).lending_state(), LendingState::Available);
        assert_eq!(painting(Some("Ann"), Some("a@x.com")).lending_state(), LendingState::Lent);
    }

    #[test]
    fn blank_borrower_fields_count_as_absent() {
        let p = painting(Some("   "), Some("a@x.com"));
        assert!(p.borrower_name.is_none());
        assert!(!p.is_lent());
    }

    #[test]
    fn parse_date_accepts_plain_dates_as_utc_midnight() {
        let parsed = parse_date("2025-03-14").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_date_accepts_rfc3339() {
        let parsed = parse_date("2025-03-14T10:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 14, 8, 30, 0).unwrap());
    }

    #[test]
    fn malformed_dates_are_no_date() {
        assert!(parse_date("next tuesday").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_date("2025-13-40").is_none());

        let mut p = painting(Some("Ann"), Some("a@x.com"));
        p.due_date = Some("soon".to_string());
        assert!(p.due_at().is_none());
    }

    #[test]
    fn apply_draft_stamps_modifier() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let mut p = Painting::from_draft(PaintingId(3), PaintingDraft::new("Dunes"), "alice", created);
        p.apply_draft(PaintingDraft::new("Dunes II"), "bob", later);

        assert_eq!(p.title, "Dunes II");
        assert_eq!(p.created_by.as_deref(), Some("alice"));
        assert_eq!(p.created_at, Some(created));
        assert_eq!(p.modified_by.as_deref(), Some("bob"));
        assert_eq!(p.modified_at, Some(later));
    }

    #[test]
    fn empty_title_is_rejected() {
        assert!(PaintingDraft::new("  ").validate().is_err());
        assert!(PaintingDraft::new("Dunes").validate().is_ok());
    }
}
