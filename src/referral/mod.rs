//! Referral codes and the referral engine.

mod code;
mod engine;

pub use code::ReferralCode;
pub use engine::{ReferralEngine, VerifyOutcome};
