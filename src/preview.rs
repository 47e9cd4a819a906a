// 👀 Live Preview - Payment summary while the DNI is being typed
//
// Only members who would pass eligibility right now get a preview.
// Pending vs. paid changes the status tag, not whether a preview exists.
// Pure: safe to call on every keystroke.

use crate::db::{Member, Payment};
use crate::rules::AccessPolicy;
use crate::temporal::{days_until, format_date_or_na};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewStatus {
    Ok,
    Pending,
}

impl PreviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewStatus::Ok => "OK",
            PreviewStatus::Pending => "PENDIENTE",
        }
    }
}

/// Display-ready payment/expiry summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPreview {
    pub member_name: String,

    /// Latest monthly payment date, `DD/MM/YYYY` or "N/D"
    pub payment_date: String,

    /// Membership expiry, `DD/MM/YYYY` or "N/D"
    pub expiry_date: String,

    pub days_remaining: i64,
    pub status: PreviewStatus,
}

impl PaymentPreview {
    /// "1 día" / "N días"
    pub fn days_label(&self) -> String {
        if self.days_remaining == 1 {
            "1 día".to_string()
        } else {
            format!("{} días", self.days_remaining)
        }
    }
}

impl fmt::Display for PaymentPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Último pago: {} | Vence: {} ({}) | {}",
            self.payment_date,
            self.expiry_date,
            self.days_label(),
            self.status.as_str()
        )
    }
}

/// Preview for a partial DNI, or None when there is nothing to show
pub fn build_preview(
    policy: &AccessPolicy,
    partial_dni: &str,
    members: &[Member],
    payments: &[Payment],
    today: NaiveDate,
) -> Option<PaymentPreview> {
    let dni = partial_dni.trim();
    if dni.chars().count() < policy.min_dni_len {
        return None;
    }

    let member = members.iter().find(|m| m.dni.trim() == dni)?;
    let eligibility = policy.assess(member, payments, today);
    if !eligibility.is_eligible(policy.pending_payment) {
        return None;
    }

    let latest = eligibility.latest?;
    let days_remaining = days_until(&member.fecha_vencimiento, today)?;

    Some(PaymentPreview {
        member_name: member.nombre.clone(),
        payment_date: format_date_or_na(&latest.fecha),
        expiry_date: format_date_or_na(&member.fecha_vencimiento),
        days_remaining,
        status: if eligibility.is_pending() {
            PreviewStatus::Pending
        } else {
            PreviewStatus::Ok
        },
    })
}

// ============================================================================
// TESTS
// ============================================================================
