// Gym Access - Kiosk Core Library
// Access decisions, entry log and live preview for the door terminal

pub mod config;
pub mod db;
pub mod entries;
pub mod feedback;
pub mod kiosk;
pub mod payments;
pub mod preview;
pub mod rules;
pub mod temporal;

// Re-export commonly used types
pub use config::KioskConfig;
pub use db::{
    EntryRecord, KeyValueStore, Member, MemberId, MemoryStore, Payment, RecordStore, SqliteStore,
    ENTRIES_KEY, MEMBERS_KEY, NEXT_ID_KEY, PAYMENTS_KEY,
};
pub use entries::record_entry;
pub use feedback::{feedback_for, Feedback, Severity, Tone, Waveform};
pub use kiosk::{
    DniInput, Headless, InputLock, Kiosk, KioskState, MessageDisplay, SoundCue, SubmitResult,
};
pub use payments::{latest_monthly_payment, latest_payment_of_type, PaymentStatus};
pub use preview::{build_preview, PaymentPreview, PreviewStatus};
pub use rules::{
    AccessPolicy, Decision, DenialReason, Eligibility, InputError, Outcome, PendingPaymentRule,
};
pub use temporal::{
    days_until, format_date_display, is_membership_current, parse_date_only, Clock, FixedClock,
    SystemClock,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
