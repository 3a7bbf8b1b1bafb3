//! Follow-up message composition.
//!
//! `compose_follow_up` is a pure function: same ticket + same staleness in,
//! same text out. It never panics; tickets missing required fields get a
//! generic fallback sentence instead.

use std::sync::LazyLock;

use regex::Regex;

use crate::ticket::{Priority, Ticket};

/// Message language, chosen by `detect_locale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    English,
    Spanish,
}

static SPANISH_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(problema|ayuda|necesito|urgente|cuenta|pago|factura|pedido|hola|gracias|funciona)\b",
    )
    .expect("static regex")
});

/// Heuristic language detection over ticket text: Spanish diacritics or
/// common Spanish keywords imply Spanish, everything else is English.
pub fn detect_locale(text: &str) -> Locale {
    let has_diacritics = text
        .chars()
        .any(|c| "áéíóúñüÁÉÍÓÚÑÜ¿¡".contains(c));
    if has_diacritics || SPANISH_KEYWORDS.is_match(text) {
        Locale::Spanish
    } else {
        Locale::English
    }
}

/// Compose the follow-up text for a stale ticket.
///
/// `hours_stale` is the caller-computed staleness at the reference time, so
/// repeated calls with identical inputs produce identical output.
pub fn compose_follow_up(ticket: &Ticket, hours_stale: i64) -> String {
    if ticket.id.trim().is_empty()
        || ticket.customer.trim().is_empty()
        || ticket.issue.trim().is_empty()
    {
        return "⏰ A support ticket in this group is still open and waiting for an update. \
                Please reply here or update its status."
            .to_string();
    }

    let locale = detect_locale(&format!("{} {}", ticket.customer, ticket.issue));
    let elapsed = format_elapsed(hours_stale.max(0), locale);
    let priority_marker = match (ticket.priority, locale) {
        (Priority::High, Locale::English) => "\n⚠️ HIGH priority",
        (Priority::High, Locale::Spanish) => "\n⚠️ Prioridad ALTA",
        _ => "",
    };

    match locale {
        Locale::English => format!(
            "⏰ Follow-up on ticket {id}\n\
             Customer: {customer}\n\
             Issue: {issue}\n\
             This ticket has been open for {elapsed} without an update.{priority_marker}\n\
             Please reply here or update its status.",
            id = ticket.id,
            customer = ticket.customer,
            issue = ticket.issue,
        ),
        Locale::Spanish => format!(
            "⏰ Seguimiento del ticket {id}\n\
             Cliente: {customer}\n\
             Problema: {issue}\n\
             Este ticket lleva {elapsed} sin actualización.{priority_marker}\n\
             Por favor responde aquí o actualiza su estado.",
            id = ticket.id,
            customer = ticket.customer,
            issue = ticket.issue,
        ),
    }
}

fn format_elapsed(hours: i64, locale: Locale) -> String {
    match locale {
        Locale::English => {
            if hours >= 48 {
                format!("{} days", hours / 24)
            } else if hours == 1 {
                "1 hour".to_string()
            } else {
                format!("{hours} hours")
            }
        }
        Locale::Spanish => {
            if hours >= 48 {
                format!("{} días", hours / 24)
            } else if hours == 1 {
                "1 hora".to_string()
            } else {
                format!("{hours} horas")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{Category, Status};

    fn ticket(customer: &str, issue: &str, priority: Priority) -> Ticket {
        Ticket {
            id: "T1000".into(),
            created_at: None,
            last_updated: None,
            channel_ref: "group-1".into(),
            customer: customer.into(),
            issue: issue.into(),
            priority,
            category: Category::Technical,
            status: Status::Open,
            notes: String::new(),
        }
    }

    #[test]
    fn english_follow_up_has_id_elapsed_and_priority() {
        let t = ticket("Ada", "Checkout page returns 500", Priority::High);
        let text = compose_follow_up(&t, 3);
        assert!(text.contains("T1000"));
        assert!(text.contains("3 hours"));
        assert!(text.contains("HIGH"));
        assert!(text.contains("Ada"));
    }

    #[test]
    fn spanish_detected_from_keywords() {
        let t = ticket("María", "Tengo un problema con el pago", Priority::Medium);
        let text = compose_follow_up(&t, 5);
        assert!(text.contains("Seguimiento"));
        assert!(text.contains("5 horas"));
        assert!(!text.contains("ALTA"));
    }

    #[test]
    fn spanish_detected_from_diacritics() {
        assert_eq!(detect_locale("la página no carga"), Locale::Spanish);
        assert_eq!(detect_locale("page will not load"), Locale::English);
    }

    #[test]
    fn composition_is_idempotent() {
        let t = ticket("Ada", "VPN flaps", Priority::Low);
        assert_eq!(compose_follow_up(&t, 7), compose_follow_up(&t, 7));
    }

    #[test]
    fn missing_fields_fall_back_to_generic_sentence() {
        let mut t = ticket("", "VPN flaps", Priority::High);
        let text = compose_follow_up(&t, 3);
        assert!(text.contains("still open"));
        assert!(!text.contains("T1000"));

        t.customer = "Ada".into();
        t.issue = "  ".into();
        assert!(compose_follow_up(&t, 3).contains("still open"));
    }

    #[test]
    fn elapsed_switches_to_days() {
        let t = ticket("Ada", "Slow dashboard", Priority::Medium);
        let text = compose_follow_up(&t, 49);
        assert!(text.contains("2 days"));
    }

    #[test]
    fn single_hour_is_singular() {
        let t = ticket("Ada", "Slow dashboard", Priority::Medium);
        assert!(compose_follow_up(&t, 1).contains("1 hour"));
    }
}
