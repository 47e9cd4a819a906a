// 🏋️ Kiosk - Submit, preview and keypad state for the door terminal
//
// Per submission:
//   Idle → Validating → {NotFound | Denied | Allowed | AllowedWithWarning} → Idle
//
// The terminal state holds (busy) until the front-end calls `reset()` after
// its display delay. Input validation errors never leave Idle.

use crate::db::{EntryRecord, KeyValueStore, RecordStore};
use crate::entries::record_entry;
use crate::feedback::{feedback_for, Severity};
use crate::preview::{build_preview, PaymentPreview};
use crate::rules::{AccessPolicy, Decision, Outcome};
use crate::temporal::{Clock, SystemClock};
use anyhow::{bail, Result};

// ============================================================================
// FRONT-END COLLABORATORS
// ============================================================================

/// Message area of the kiosk screen
pub trait MessageDisplay {
    fn show(&mut self, text: &str, severity: Severity);
    fn clear(&mut self) {}
}

/// Speaker; see [`Severity::tones`] for what each cue sounds like
pub trait SoundCue {
    fn play(&mut self, severity: Severity);
}

/// Keypad and submit button enablement
pub trait InputLock {
    fn set_input_enabled(&mut self, enabled: bool);
}

/// Collaborator that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl MessageDisplay for Headless {
    fn show(&mut self, _text: &str, _severity: Severity) {}
}

impl SoundCue for Headless {
    fn play(&mut self, _severity: Severity) {}
}

impl InputLock for Headless {
    fn set_input_enabled(&mut self, _enabled: bool) {}
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskState {
    Idle,
    Validating,
    Resolved(Outcome),
}

/// What `submit` hands back to the front-end
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitResult {
    pub outcome: Outcome,
    pub reason_text: String,
    pub member_name: Option<String>,
    pub severity: Severity,
    pub badge: String,

    /// Entry written for this submission (allowed outcomes only)
    pub entry: Option<EntryRecord>,
}

/// Digits typed on the keypad so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DniInput {
    digits: String,
    max_len: usize,
}

impl DniInput {
    pub fn new(max_len: usize) -> Self {
        DniInput {
            digits: String::new(),
            max_len,
        }
    }

    /// Append an ASCII digit. Non-digits and overflow are ignored.
    pub fn push_digit(&mut self, digit: char) -> bool {
        if !digit.is_ascii_digit() || self.digits.len() >= self.max_len {
            return false;
        }
        self.digits.push(digit);
        true
    }

    pub fn backspace(&mut self) -> bool {
        self.digits.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}

// ============================================================================
// KIOSK
// ============================================================================

pub struct Kiosk<S, C = SystemClock> {
    store: RecordStore<S>,
    policy: AccessPolicy,
    clock: C,
    state: KioskState,
    input: DniInput,
    display: Box<dyn MessageDisplay>,
    sound: Box<dyn SoundCue>,
    input_lock: Box<dyn InputLock>,
}

impl<S: KeyValueStore, C: Clock> Kiosk<S, C> {
    pub fn new(store: RecordStore<S>, policy: AccessPolicy, clock: C) -> Self {
        let input = DniInput::new(policy.max_dni_len);
        Kiosk {
            store,
            policy,
            clock,
            state: KioskState::Idle,
            input,
            display: Box::new(Headless),
            sound: Box::new(Headless),
            input_lock: Box::new(Headless),
        }
    }

    pub fn with_display(mut self, display: impl MessageDisplay + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    pub fn with_sound(mut self, sound: impl SoundCue + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    pub fn with_input_lock(mut self, input_lock: impl InputLock + 'static) -> Self {
        self.input_lock = Box::new(input_lock);
        self
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn state(&self) -> &KioskState {
        &self.state
    }

    /// True from the start of a lookup until `reset()`
    pub fn is_busy(&self) -> bool {
        self.state != KioskState::Idle
    }

    /// Decide on `dni`, record the entry when allowed, and notify the front-end.
    ///
    /// Fails only when the kiosk is busy or the store itself fails.
    pub fn submit(&mut self, dni: &str) -> Result<SubmitResult> {
        if self.is_busy() {
            bail!("kiosk is busy: reset before the next submission");
        }

        if let Err(err) = self.policy.validate_input(dni) {
            tracing::debug!(error = %err, "input rejected");
            let decision = Decision::without_member(Outcome::ValidationError(err));
            return Ok(self.render(&decision, None));
        }

        self.state = KioskState::Validating;
        self.input_lock.set_input_enabled(false);

        let (decision, entry) = match self.resolve(dni) {
            Ok(resolved) => resolved,
            Err(err) => {
                self.state = KioskState::Idle;
                self.input_lock.set_input_enabled(true);
                return Err(err);
            }
        };

        let result = self.render(&decision, entry);
        self.state = KioskState::Resolved(decision.outcome);
        Ok(result)
    }

    /// Submit whatever is on the keypad
    pub fn submit_input(&mut self) -> Result<SubmitResult> {
        let dni = self.input.as_str().to_string();
        self.submit(&dni)
    }

    /// Live preview for a partial DNI. Read-only.
    pub fn preview(&self, partial_dni: &str) -> Result<Option<PaymentPreview>> {
        if partial_dni.trim().chars().count() < self.policy.min_dni_len {
            return Ok(None);
        }

        let members = self.store.load_members()?;
        let payments = self.store.load_payments()?;
        Ok(build_preview(&self.policy, partial_dni, &members, &payments, self.clock.today()))
    }

    /// Back to Idle: clears the keypad and the message, re-enables input
    pub fn reset(&mut self) {
        self.state = KioskState::Idle;
        self.input.clear();
        self.display.clear();
        self.input_lock.set_input_enabled(true);
    }

    // ========================================================================
    // KEYPAD
    // ========================================================================

    pub fn input(&self) -> &str {
        self.input.as_str()
    }

    /// Type one digit; returns the refreshed preview
    pub fn push_digit(&mut self, digit: char) -> Result<Option<PaymentPreview>> {
        if !self.is_busy() && self.input.push_digit(digit) {
            self.display.clear();
        }
        self.current_preview()
    }

    pub fn backspace(&mut self) -> Result<Option<PaymentPreview>> {
        if !self.is_busy() && self.input.backspace() {
            self.display.clear();
        }
        self.current_preview()
    }

    pub fn clear_input(&mut self) {
        if self.is_busy() {
            return;
        }
        self.input.clear();
        self.display.clear();
    }

    fn current_preview(&self) -> Result<Option<PaymentPreview>> {
        self.preview(self.input.as_str())
    }

    fn resolve(&mut self, dni: &str) -> Result<(Decision, Option<EntryRecord>)> {
        let members = self.store.load_members()?;
        let payments = self.store.load_payments()?;

        let decision = self.policy.decide(dni, &members, &payments, self.clock.today());

        let entry = match &decision.member {
            Some(member) if decision.is_allowed() => {
                Some(record_entry(&mut self.store, &member.id, self.clock.now())?)
            }
            _ => None,
        };

        Ok((decision, entry))
    }

    fn render(&mut self, decision: &Decision, entry: Option<EntryRecord>) -> SubmitResult {
        let feedback = feedback_for(decision);

        self.display.show(&feedback.message, feedback.severity);
        self.sound.play(feedback.severity);

        SubmitResult {
            outcome: decision.outcome.clone(),
            reason_text: feedback.message,
            member_name: decision.member_name().map(str::to_string),
            severity: feedback.severity,
            badge: feedback.badge,
            entry,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
