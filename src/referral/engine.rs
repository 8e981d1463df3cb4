//! Referral flow: record the referrer on first contact, credit it once the
//! referred user passes verification.

use teloxide::types::UserId;
use tracing::{debug, info, warn};

use super::ReferralCode;
use crate::database::{Contact, Database, ReferralCredit, ReferralRepository, UserRepository};
use crate::error::BotResult;
use crate::membership::{MembershipVerifier, Verification};
use crate::notify::Notifier;
use crate::utils::html_escape;

/// What a verification attempt produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyOutcome {
    pub verification: Verification,
    /// Set when this attempt credited the user's referrer.
    pub credit: Option<ReferralCredit>,
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        self.verification.is_verified()
    }
}

/// What a `/start` produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartOutcome {
    /// The user had never been seen before this start.
    pub first_contact: bool,
    /// Referrer recorded by this start.
    pub referrer: Option<UserId>,
    pub verify: VerifyOutcome,
}

#[derive(Clone)]
pub struct ReferralEngine {
    users: UserRepository,
    ledger: ReferralRepository,
    verifier: MembershipVerifier,
}

impl ReferralEngine {
    pub fn new(db: &Database, verifier: MembershipVerifier) -> Self {
        Self {
            users: UserRepository::new(db),
            ledger: ReferralRepository::new(db),
            verifier,
        }
    }

    /// Handle a `/start` with its payload.
    ///
    /// `seen_first` tells whether an earlier step of the same update already
    /// created the record. The payload only counts on first contact.
    pub async fn start(&self, contact: &Contact, payload: &str, seen_first: bool) -> BotResult<StartOutcome> {
        let created = self.users.ensure(contact).await?;
        let first_contact = seen_first || created;

        let mut referrer = None;
        if first_contact && let Some(candidate) = self.resolve(contact.id, payload).await? {
            if self.users.set_referred_by(contact.id, candidate).await? {
                info!("User {} was referred by {}", contact.id, candidate);
                referrer = Some(candidate);
            }
        }

        let verify = self.verify(contact.id, false).await?;

        Ok(StartOutcome {
            first_contact,
            referrer,
            verify,
        })
    }

    /// Run the membership check, store the result and credit a pending
    /// referral if the user is now verified.
    ///
    /// `fresh` bypasses the verdict cache.
    pub async fn verify(&self, user: UserId, fresh: bool) -> BotResult<VerifyOutcome> {
        let verification = if fresh {
            self.verifier.verify_fresh(user).await
        } else {
            self.verifier.verify(user).await
        };

        self.users.set_verified(user, verification.is_verified()).await?;

        let credit = if verification.is_verified() {
            self.ledger.credit_pending(user).await?
        } else {
            None
        };

        if let Some(credit) = &credit {
            info!(
                "Credited referral of {} to {} (total {})",
                credit.referred, credit.referrer, credit.referrer_total
            );
        }

        Ok(VerifyOutcome { verification, credit })
    }

    /// Forget the user's verification so the next start checks again.
    /// Credits already granted stay in the ledger.
    pub async fn reset(&self, user: UserId) -> BotResult<()> {
        self.verifier.forget(user);
        self.users.set_verified(user, false).await
    }

    /// Tell both parties about a fresh credit. Delivery failures are logged.
    pub async fn announce(&self, notifier: &dyn Notifier, credit: &ReferralCredit, referred_name: &str) {
        let to_referrer = format!(
            "🎉 <b>New Referral!</b>\n\n\
             User: {}\n\
             Total Referrals: {}\n\
             Keep sharing to unlock more features!",
            html_escape(referred_name),
            credit.referrer_total
        );
        if let Err(e) = notifier.notify(credit.referrer, &to_referrer).await {
            warn!("Failed to notify referrer {}: {}", credit.referrer, e);
        }

        let to_referred = "🤝 <b>Referral confirmed!</b>\n\nThe friend who invited you has been credited. Welcome to the club!";
        if let Err(e) = notifier.notify(credit.referred, to_referred).await {
            warn!("Failed to notify referred user {}: {}", credit.referred, e);
        }
    }

    async fn resolve(&self, user: UserId, payload: &str) -> BotResult<Option<UserId>> {
        let Some(code) = ReferralCode::parse(payload) else {
            if !payload.trim().is_empty() {
                debug!("Ignoring start payload {:?} from {}", payload, user);
            }
            return Ok(None);
        };

        let referrer = code.referrer();
        if referrer == user {
            debug!("Ignoring self-referral by {}", user);
            return Ok(None);
        }

        if !self.users.exists(referrer).await? {
            debug!("Referral code {} from {} names an unknown user", code, user);
            return Ok(None);
        }

        Ok(Some(referrer))
    }
}
