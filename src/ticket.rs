//! Ticket domain model and the fixed 9-column ledger row codec.
//!
//! The external ledger is a free-text row store: anything a human can type can
//! show up in a cell. Enum parsing therefore never rejects — unknown labels
//! coerce to documented defaults — and timestamp parsing is lenient (a
//! malformed timestamp reads as `None`, which downstream treats as not stale).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger header row. Column order is part of the schema.
pub const LEDGER_HEADER: [&str; 9] = [
    "Ticket ID",
    "Created At",
    "Channel",
    "Customer",
    "Issue",
    "Priority",
    "Status",
    "Last Updated",
    "Notes",
];

// ── Enums ───────────────────────────────────────────────────────────

/// Ticket priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Parse a free-text label. Unknown values coerce to `Medium` — a ticket
    /// is still created even when the classifier invents a priority.
    pub fn from_label(label: &str) -> Self {
        match normalize(label).as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    /// Row-encoding label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Ticket category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Billing,
    General,
    Other,
}

impl Category {
    /// Parse a free-text label. Unknown values coerce to `Other`.
    pub fn from_label(label: &str) -> Self {
        match normalize(label).as_str() {
            "technical" => Self::Technical,
            "billing" => Self::Billing,
            "general" => Self::General,
            "other" => Self::Other,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Technical => "Technical",
            Self::Billing => "Billing",
            Self::General => "General",
            Self::Other => "Other",
        }
    }
}

/// Ticket lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Resolved,
    Escalated,
}

impl Status {
    /// Parse a free-text label. Unknown values coerce to `InProgress`, the
    /// default for classifier-detected status updates.
    pub fn from_label(label: &str) -> Self {
        match normalize(label).as_str() {
            "open" => Self::Open,
            "inprogress" => Self::InProgress,
            "resolved" => Self::Resolved,
            "escalated" => Self::Escalated,
            _ => Self::InProgress,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Escalated => "Escalated",
        }
    }

    /// Directed transition graph. Identity transitions are always allowed so
    /// a follow-up can refresh `last_updated` without changing status.
    pub fn can_transition_to(&self, to: Status) -> bool {
        if *self == to {
            return true;
        }
        match self {
            Self::Open => matches!(to, Self::InProgress | Self::Resolved | Self::Escalated),
            Self::InProgress => matches!(to, Self::Resolved | Self::Escalated),
            Self::Resolved | Self::Escalated => false,
        }
    }
}

fn normalize(label: &str) -> String {
    label
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .to_lowercase()
}

// ── Ticket ──────────────────────────────────────────────────────────

/// One support ticket, as read from (or written to) the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Globally unique, assigned once at write time. `T<digits>` shape.
    pub id: String,
    /// Immutable creation time. `None` if the stored cell is malformed.
    pub created_at: Option<DateTime<Utc>>,
    /// Refreshed on every status-affecting write. `None` reads as not stale.
    pub last_updated: Option<DateTime<Utc>>,
    /// Opaque identifier of the originating group/conversation.
    pub channel_ref: String,
    pub customer: String,
    pub issue: String,
    pub priority: Priority,
    pub category: Category,
    pub status: Status,
    /// Append-oriented free text.
    pub notes: String,
}

impl Ticket {
    /// Encode as the 9-column ledger row.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            self.channel_ref.clone(),
            self.customer.clone(),
            self.issue.clone(),
            self.priority.label().to_string(),
            self.status.label().to_string(),
            self.last_updated.map(|t| t.to_rfc3339()).unwrap_or_default(),
            self.notes.clone(),
        ]
    }

    /// Decode a ledger row. Returns `None` for rows that cannot possibly be
    /// tickets (too short, or empty id cell); everything else coerces.
    ///
    /// The row schema carries no category column, so `category` is
    /// write-time-only: decoded tickets always read back as
    /// [`Category::Other`].
    pub fn from_row(row: &[String]) -> Option<Self> {
        if row.len() < 9 || row[0].trim().is_empty() {
            return None;
        }
        Some(Self {
            id: row[0].trim().to_string(),
            category: Category::Other,
            created_at: parse_timestamp(&row[1]),
            channel_ref: row[2].clone(),
            customer: row[3].clone(),
            issue: row[4].clone(),
            priority: Priority::from_label(&row[5]),
            status: Status::from_label(&row[6]),
            last_updated: parse_timestamp(&row[7]),
            notes: row[8].clone(),
        })
    }
}

/// Classifier output for a new ticket, before the ledger assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketDraft {
    pub channel_ref: String,
    pub customer: String,
    pub issue: String,
    pub priority: Priority,
    pub category: Category,
}

/// Lenient timestamp parse: RFC 3339, or `None`.
pub fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(cell.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_labels_round_trip() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::from_label(p.label()), p);
        }
    }

    #[test]
    fn unknown_priority_defaults_to_medium() {
        assert_eq!(Priority::from_label("urgent!!"), Priority::Medium);
        assert_eq!(Priority::from_label(""), Priority::Medium);
    }

    #[test]
    fn unknown_category_defaults_to_other() {
        assert_eq!(Category::from_label("sales"), Category::Other);
        assert_eq!(Category::from_label("BILLING"), Category::Billing);
    }

    #[test]
    fn status_parses_spaced_and_snake_labels() {
        assert_eq!(Status::from_label("In Progress"), Status::InProgress);
        assert_eq!(Status::from_label("in_progress"), Status::InProgress);
        assert_eq!(Status::from_label("OPEN"), Status::Open);
        assert_eq!(Status::from_label("done-ish"), Status::InProgress);
    }

    #[test]
    fn transition_graph_enforced() {
        assert!(Status::Open.can_transition_to(Status::InProgress));
        assert!(Status::Open.can_transition_to(Status::Resolved));
        assert!(Status::Open.can_transition_to(Status::Escalated));
        assert!(Status::InProgress.can_transition_to(Status::Resolved));
        assert!(!Status::InProgress.can_transition_to(Status::Open));
        assert!(!Status::Resolved.can_transition_to(Status::Open));
        assert!(!Status::Escalated.can_transition_to(Status::InProgress));
    }

    #[test]
    fn identity_transitions_always_allowed() {
        for s in [
            Status::Open,
            Status::InProgress,
            Status::Resolved,
            Status::Escalated,
        ] {
            assert!(s.can_transition_to(s));
        }
    }

    #[test]
    fn row_round_trip() {
        let now = Utc::now();
        let ticket = Ticket {
            id: "T17000000000001234".into(),
            created_at: Some(now),
            last_updated: Some(now),
            channel_ref: "group-42".into(),
            customer: "Ada".into(),
            issue: "Payment page times out".into(),
            priority: Priority::High,
            category: Category::Billing,
            status: Status::Open,
            notes: String::new(),
        };

        let row = ticket.to_row();
        assert_eq!(row.len(), 9);
        assert_eq!(row[6], "Open");

        let back = Ticket::from_row(&row).unwrap();
        assert_eq!(back.id, ticket.id);
        assert_eq!(back.priority, Priority::High);
        // The row carries no category cell, so decode falls back to Other.
        assert_eq!(back.category, Category::Other);
        assert_eq!(back.status, Status::Open);
        assert_eq!(
            back.last_updated.unwrap().timestamp(),
            now.timestamp()
        );
    }

    #[test]
    fn short_or_headerless_rows_are_skipped() {
        assert!(Ticket::from_row(&["T1".to_string()]).is_none());
        let blank_id: Vec<String> = vec!["".into(); 9];
        assert!(Ticket::from_row(&blank_id).is_none());
    }

    #[test]
    fn malformed_timestamp_reads_as_none() {
        let mut row: Vec<String> = vec!["T1".into(); 9];
        row[1] = "yesterday".into();
        row[7] = "not a date".into();
        let ticket = Ticket::from_row(&row).unwrap();
        assert!(ticket.created_at.is_none());
        assert!(ticket.last_updated.is_none());
    }
}
