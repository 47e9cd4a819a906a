// 🚦 Access Policy - Rules as data
// Membership expiry + latest monthly payment → ternary access decision

use crate::db::{Member, Payment};
use crate::payments::{latest_payment_of_type, PaymentStatus, MONTHLY_FEE, PAID_MARKER, PENDING_MARKER};
use crate::temporal::is_membership_current;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// POLICY DEFINITION
// ============================================================================

/// What a pending last payment means at the door
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPaymentRule {
    /// Let the member in, flagged with a warning
    #[default]
    Warn,

    /// Strict variant: a pending last payment blocks entry
    Deny,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    /// Shortest DNI accepted for lookup (and for live preview)
    pub min_dni_len: usize,

    /// Longest DNI the keypad accepts
    pub max_dni_len: usize,

    /// Payment category that counts as the monthly fee
    pub monthly_fee_type: String,

    pub pending_marker: String,
    pub paid_marker: String,

    pub pending_payment: PendingPaymentRule,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        AccessPolicy {
            min_dni_len: 5,
            max_dni_len: 8,
            monthly_fee_type: MONTHLY_FEE.to_string(),
            pending_marker: PENDING_MARKER.to_string(),
            paid_marker: PAID_MARKER.to_string(),
            pending_payment: PendingPaymentRule::Warn,
        }
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Candidate DNI rejected before any lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Empty,
    TooShort { len: usize, min: usize },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Empty => write!(f, "Por favor ingrese un DNI"),
            InputError::TooShort { .. } => write!(f, "DNI inválido (muy corto)"),
        }
    }
}

impl std::error::Error for InputError {}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Allowed,
    AllowedWithWarning,
    Denied,
    NotFound,
    ValidationError(InputError),
}

impl Outcome {
    /// Both allowed variants admit the member and log an entry
    pub fn is_allowed(&self) -> bool {
        matches!(self, Outcome::Allowed | Outcome::AllowedWithWarning)
    }
}

/// One reason an access attempt was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// Expiry on file but past (or unreadable)
    MembershipExpired { expiry: String },

    /// No expiry date on file
    NoMembership,

    NoMonthlyPayment,

    /// Only under `PendingPaymentRule::Deny`
    PendingPayment,

    /// Latest payment is neither paid nor pending
    InvalidPaymentStatus { estado: String },
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::MembershipExpired { expiry } => write!(f, "tu cuota venció el {}", expiry),
            DenialReason::NoMembership => write!(f, "no registrás una membresía vigente"),
            DenialReason::NoMonthlyPayment => write!(f, "no tenés un pago de Mensualidad registrado"),
            DenialReason::PendingPayment => {
                write!(f, "tenés el último pago de Mensualidad en estado PENDIENTE")
            }
            DenialReason::InvalidPaymentStatus { estado } => write!(
                f,
                "el último pago de Mensualidad tiene un estado no válido ({})",
                estado
            ),
        }
    }
}

/// Outcome plus the member it concerns and, when denied, why
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub outcome: Outcome,
    pub member: Option<Member>,
    pub reasons: Vec<DenialReason>,
}

impl Decision {
    pub(crate) fn without_member(outcome: Outcome) -> Self {
        Decision {
            outcome,
            member: None,
            reasons: Vec::new(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome.is_allowed()
    }

    pub fn member_name(&self) -> Option<&str> {
        self.member.as_ref().map(|m| m.nombre.as_str())
    }
}

// ============================================================================
// ELIGIBILITY
// ============================================================================

/// Everything the policy knows about one member on one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eligibility<'a> {
    pub membership_current: bool,
    pub latest: Option<&'a Payment>,
    pub status: PaymentStatus,
}

impl<'a> Eligibility<'a> {
    pub fn has_payment(&self) -> bool {
        self.latest.is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_pending
    }

    pub fn valid_payment_state(&self, rule: PendingPaymentRule) -> bool {
        match rule {
            PendingPaymentRule::Warn => self.status.is_recognized(),
            PendingPaymentRule::Deny => !self.status.is_pending,
        }
    }

    pub fn is_eligible(&self, rule: PendingPaymentRule) -> bool {
        self.membership_current && self.has_payment() && self.valid_payment_state(rule)
    }

    /// Reasons in display order: membership first, then payment
    pub fn denial_reasons(&self, member: &Member, rule: PendingPaymentRule) -> Vec<DenialReason> {
        let mut reasons = Vec::new();

        if !self.membership_current {
            if member.fecha_vencimiento.is_empty() {
                reasons.push(DenialReason::NoMembership);
            } else {
                reasons.push(DenialReason::MembershipExpired {
                    expiry: member.fecha_vencimiento.clone(),
                });
            }
        }

        match self.latest {
            None => reasons.push(DenialReason::NoMonthlyPayment),
            Some(_) if self.valid_payment_state(rule) => {}
            Some(_) if rule == PendingPaymentRule::Deny => reasons.push(DenialReason::PendingPayment),
            Some(payment) => reasons.push(DenialReason::InvalidPaymentStatus {
                estado: payment.estado.clone(),
            }),
        }

        reasons
    }
}

// ============================================================================
// POLICY ENGINE
// ============================================================================

impl AccessPolicy {
    /// Trimmed candidate DNI, or why it can't be looked up
    pub fn validate_input(&self, dni: &str) -> Result<String, InputError> {
        let dni = dni.trim();
        let len = dni.chars().count();

        if len == 0 {
            return Err(InputError::Empty);
        }
        if len < self.min_dni_len {
            return Err(InputError::TooShort {
                len,
                min: self.min_dni_len,
            });
        }

        Ok(dni.to_string())
    }

    /// Evaluate `member` against its own payments as of `today`
    pub fn assess<'a>(&self, member: &Member, payments: &'a [Payment], today: NaiveDate) -> Eligibility<'a> {
        let latest = latest_payment_of_type(payments, &member.id, &self.monthly_fee_type);

        Eligibility {
            membership_current: is_membership_current(&member.fecha_vencimiento, today),
            latest,
            status: PaymentStatus::of(latest, &self.pending_marker, &self.paid_marker),
        }
    }

    /// Full decision for a submitted DNI. Pure: records nothing.
    pub fn decide(&self, dni: &str, members: &[Member], payments: &[Payment], today: NaiveDate) -> Decision {
        let dni = match self.validate_input(dni) {
            Ok(dni) => dni,
            Err(err) => return Decision::without_member(Outcome::ValidationError(err)),
        };

        let member = match members.iter().find(|m| m.dni.trim() == dni) {
            Some(member) => member,
            None => {
                tracing::info!(dni = %dni, "dni not found");
                return Decision::without_member(Outcome::NotFound);
            }
        };

        let eligibility = self.assess(member, payments, today);
        tracing::debug!(
            member_id = %member.id,
            membership_current = eligibility.membership_current,
            has_payment = eligibility.has_payment(),
            pending = eligibility.status.is_pending,
            paid = eligibility.status.is_paid,
            "eligibility assessed"
        );

        let (outcome, reasons) = if !eligibility.is_eligible(self.pending_payment) {
            (Outcome::Denied, eligibility.denial_reasons(member, self.pending_payment))
        } else if eligibility.is_pending() {
            (Outcome::AllowedWithWarning, Vec::new())
        } else {
            (Outcome::Allowed, Vec::new())
        };

        tracing::info!(member_id = %member.id, outcome = ?outcome, "access decided");

        Decision {
            outcome,
            member: Some(member.clone()),
            reasons,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
