// 💳 Payment Resolver - Latest monthly fee per member
//
// Ordering is a strict total order:
//   1. parsed `fecha` descending (time-of-day counts)
//   2. unparseable `fecha` sorts after every parseable one
//   3. ties keep collection order (stable sort, first recorded wins)
//
// Never cached: payments can change between two decisions.

use crate::db::{MemberId, Payment};
use crate::temporal::parse_timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Payment category the access policy looks at
pub const MONTHLY_FEE: &str = "mensualidad";

/// Substring marking a pending payment
pub const PENDING_MARKER: &str = "pendiente";

/// Substring marking a settled payment
pub const PAID_MARKER: &str = "pagado";

/// Most recent "Mensualidad" payment for `member_id`, if any
pub fn latest_monthly_payment<'a>(payments: &'a [Payment], member_id: &MemberId) -> Option<&'a Payment> {
    latest_payment_of_type(payments, member_id, MONTHLY_FEE)
}

/// Most recent payment of category `tipo` (case-insensitive) for `member_id`.
///
/// Payments with an empty `fecha` never qualify.
pub fn latest_payment_of_type<'a>(
    payments: &'a [Payment],
    member_id: &MemberId,
    tipo: &str,
) -> Option<&'a Payment> {
    let tipo = tipo.trim().to_lowercase();

    let mut candidates: Vec<(Option<NaiveDateTime>, &Payment)> = payments
        .iter()
        .filter(|p| &p.usuario_id == member_id)
        .filter(|p| p.tipo.trim().to_lowercase() == tipo)
        .filter(|p| !p.fecha.trim().is_empty())
        .map(|p| {
            let parsed = parse_timestamp(&p.fecha);
            if parsed.is_none() {
                tracing::warn!(payment_id = p.id, fecha = %p.fecha, "unparseable payment date");
            }
            (parsed, p)
        })
        .collect();

    candidates.sort_by(|a, b| newest_first(a.0, b.0));
    candidates.first().map(|(_, p)| *p)
}

fn newest_first(a: Option<NaiveDateTime>, b: Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ============================================================================
// PAYMENT STATUS
// ============================================================================

/// Status flags read from a payment's free-text `estado`.
///
/// Matching is case-insensitive by substring, so both flags can be set
/// at once ("pagado parcial, pendiente resto").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub is_pending: bool,
    pub is_paid: bool,
}

impl PaymentStatus {
    pub fn read(estado: &str, pending_marker: &str, paid_marker: &str) -> Self {
        let estado = estado.to_lowercase();
        PaymentStatus {
            is_pending: contains_marker(&estado, pending_marker),
            is_paid: contains_marker(&estado, paid_marker),
        }
    }

    /// Status of `payment`, or all-false when there is none
    pub fn of(payment: Option<&Payment>, pending_marker: &str, paid_marker: &str) -> Self {
        payment
            .map(|p| Self::read(&p.estado, pending_marker, paid_marker))
            .unwrap_or_default()
    }

    pub fn is_recognized(&self) -> bool {
        self.is_pending || self.is_paid
    }
}

fn contains_marker(estado_lower: &str, marker: &str) -> bool {
    let marker = marker.trim().to_lowercase();
    !marker.is_empty() && estado_lower.contains(&marker)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pago(id: i64, usuario: i64, tipo: &str, estado: &str, fecha: &str) -> Payment {
        Payment::new(id, usuario, tipo, estado, fecha)
    }

    #[test]
    fn test_picks_most_recent_monthly_fee() {
        let payments = vec![
            pago(1, 1, "Mensualidad", "Pagado", "2025-01-05"),
            pago(2, 1, "Mensualidad", "Pendiente", "2025-03-05"),
            pago(3, 1, "Mensualidad", "Pagado", "2025-02-05"),
        ];

        let latest = latest_monthly_payment(&payments, &MemberId::from(1)).unwrap();
        assert_eq!(latest.id, 2);
    }

    #[test]
    fn test_filters_member_type_and_empty_date() {
        let payments = vec![
            pago(1, 2, "Mensualidad", "Pagado", "2025-05-01"),
            pago(2, 1, "Matrícula", "Pagado", "2025-05-01"),
            pago(3, 1, "Mensualidad", "Pagado", ""),
            pago(4, 1, "MENSUALIDAD", "Pagado", "2025-01-01"),
        ];

        let latest = latest_monthly_payment(&payments, &MemberId::from(1)).unwrap();
        assert_eq!(latest.id, 4);
        assert!(latest_monthly_payment(&payments, &MemberId::from(3)).is_none());
    }

    #[test]
    fn test_unparseable_dates_sort_oldest() {
        let payments = vec![
            pago(1, 1, "Mensualidad", "Pagado", "ayer"),
            pago(2, 1, "Mensualidad", "Pendiente", "2020-01-01"),
        ];

        let latest = latest_monthly_payment(&payments, &MemberId::from(1)).unwrap();
        assert_eq!(latest.id, 2);

        let only_bad = vec![pago(7, 1, "Mensualidad", "Pagado", "ayer")];
        assert_eq!(latest_monthly_payment(&only_bad, &MemberId::from(1)).unwrap().id, 7);
    }

    #[test]
    fn test_ties_keep_collection_order() {
        let payments = vec![
            pago(1, 1, "Mensualidad", "Pendiente", "2025-04-01"),
            pago(2, 1, "Mensualidad", "Pagado", "2025-04-01"),
        ];

        let latest = latest_monthly_payment(&payments, &MemberId::from(1)).unwrap();
        assert_eq!(latest.id, 1);
    }

    #[test]
    fn test_time_of_day_breaks_same_day() {
        let payments = vec![
            pago(1, 1, "Mensualidad", "Pendiente", "2025-04-01T09:00:00"),
            pago(2, 1, "Mensualidad", "Pagado", "2025-04-01T18:30:00"),
        ];

        let latest = latest_monthly_payment(&payments, &MemberId::from(1)).unwrap();
        assert_eq!(latest.id, 2);
    }

    #[test]
    fn test_string_and_numeric_member_ids_match() {
        let payments = vec![Payment::new(1, MemberId::new(" 9 "), "Mensualidad", "Pagado", "2025-01-01")];
        assert!(latest_monthly_payment(&payments, &MemberId::from(9)).is_some());
    }

    #[test]
    fn test_payment_status_flags() {
        let paid = PaymentStatus::read("PAGADO", PENDING_MARKER, PAID_MARKER);
        assert!(paid.is_paid && !paid.is_pending);

        let pending = PaymentStatus::read("Pendiente de cobro", PENDING_MARKER, PAID_MARKER);
        assert!(pending.is_pending && !pending.is_paid);

        let other = PaymentStatus::read("Anulado", PENDING_MARKER, PAID_MARKER);
        assert!(!other.is_recognized());

        assert_eq!(PaymentStatus::of(None, PENDING_MARKER, PAID_MARKER), PaymentStatus::default());
    }
}
