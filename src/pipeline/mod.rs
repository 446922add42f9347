//! Inquiry notification pipeline.
//!
//! Flow: form submission → [`Inquiry::validate`] → user confirmation email →
//! admin notification email → [`NotifyOutcome`] for the caller to act on.

pub mod inquiry;
pub mod notifier;

pub use inquiry::{Inquiry, InquiryKind};
pub use notifier::{InquiryNotifier, NotifierConfig, NotifyOutcome};
