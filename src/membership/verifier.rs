//! Channel membership verification with a short-lived verdict cache.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use teloxide::types::UserId;
use tracing::{debug, warn};

use super::MembershipChecker;
use crate::config::RequiredChannel;

/// Result of checking every required channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Verification {
    /// Names of channels the user has not joined.
    pub missing: Vec<String>,
    /// Names of channels whose lookup failed.
    pub unavailable: Vec<String>,
}

impl Verification {
    /// Verified only when every channel answered "member".
    pub fn is_verified(&self) -> bool {
        self.missing.is_empty() && self.unavailable.is_empty()
    }
}

/// Checks membership in all required channels.
///
/// Lookup failures count as "not a member". Positive verdicts are cached
/// for the re-check window; negative ones are not, so a user who just
/// joined can retry immediately.
#[derive(Clone)]
pub struct MembershipVerifier {
    checker: Arc<dyn MembershipChecker>,
    channels: Arc<[RequiredChannel]>,
    verified: Cache<u64, ()>,
}

impl MembershipVerifier {
    pub fn new(
        checker: Arc<dyn MembershipChecker>,
        channels: Vec<RequiredChannel>,
        ttl: Duration,
    ) -> Self {
        let verified = Cache::builder()
            .max_capacity(50_000)
            .time_to_live(ttl)
            .build();

        Self {
            checker,
            channels: channels.into(),
            verified,
        }
    }

    pub fn channels(&self) -> &[RequiredChannel] {
        &self.channels
    }

    /// Verify a user, answering from the cache when possible.
    pub async fn verify(&self, user: UserId) -> Verification {
        if self.verified.get(&user.0).is_some() {
            debug!("Membership cache hit for user {}", user);
            return Verification::default();
        }
        self.verify_fresh(user).await
    }

    /// Verify a user against the Telegram API, ignoring the cache.
    pub async fn verify_fresh(&self, user: UserId) -> Verification {
        let mut result = Verification::default();

        for channel in self.channels.iter() {
            match self.checker.is_member(&channel.chat, user).await {
                Ok(true) => {}
                Ok(false) => result.missing.push(channel.name.clone()),
                Err(e) => {
                    warn!("Membership check for user {} in {} failed: {}", user, channel.name, e);
                    result.unavailable.push(channel.name.clone());
                }
            }
        }

        if result.is_verified() {
            self.verified.insert(user.0, ());
        } else {
            self.verified.invalidate(&user.0);
        }

        debug!("Membership of user {}: {:?}", user, result);
        result
    }

    /// Drop a cached verdict.
    pub fn forget(&self, user: UserId) {
        self.verified.invalidate(&user.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticChecker, channels};

    fn verifier(checker: StaticChecker) -> (MembershipVerifier, Arc<StaticChecker>) {
        let checker = Arc::new(checker);
        let verifier = MembershipVerifier::new(
            checker.clone(),
            channels(),
            Duration::from_secs(3600),
        );
        (verifier, checker)
    }

    #[tokio::test]
    async fn member_of_every_channel_is_verified() {
        let (verifier, _) = verifier(StaticChecker::with_members([7]));
        assert!(verifier.verify(UserId(7)).await.is_verified());
    }

    #[tokio::test]
    async fn missing_channel_is_reported_by_name() {
        let checker = StaticChecker::with_members([7]);
        checker.leave("@second", 7);
        let (verifier, _) = verifier(checker);

        let result = verifier.verify(UserId(7)).await;
        assert!(!result.is_verified());
        assert_eq!(result.missing, vec!["Second".to_string()]);
    }

    #[tokio::test]
    async fn lookup_errors_fail_closed() {
        let (verifier, _) = verifier(StaticChecker::failing());

        let result = verifier.verify(UserId(7)).await;
        assert!(!result.is_verified());
        assert_eq!(result.unavailable.len(), 2);
    }

    #[tokio::test]
    async fn positive_verdict_is_cached_until_forgotten() {
        let (verifier, checker) = verifier(StaticChecker::with_members([7]));

        assert!(verifier.verify(UserId(7)).await.is_verified());
        checker.remove(7);
        assert!(verifier.verify(UserId(7)).await.is_verified());
        assert!(!verifier.verify_fresh(UserId(7)).await.is_verified());

        checker.admit(7);
        verifier.verify(UserId(7)).await;
        checker.remove(7);
        verifier.forget(UserId(7));
        assert!(!verifier.verify(UserId(7)).await.is_verified());
    }
}
