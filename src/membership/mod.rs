//! Channel membership gate.
//!
//! A user is verified when they are present in every required channel.
//! Referral credit and the partner directory are both behind this gate.

mod checker;
mod verifier;

pub use checker::MembershipChecker;
pub use verifier::{MembershipVerifier, Verification};
