//! Best-effort delivery to many users.

use teloxide::types::UserId;
use tracing::{debug, info};

use crate::notify::Notifier;

/// Outcome of a broadcast.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    /// Users the message could not be delivered to.
    pub failed: Vec<UserId>,
}

/// Send `html` to every recipient. A failed delivery never stops the loop.
pub async fn deliver_all(notifier: &dyn Notifier, recipients: &[UserId], html: &str) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for &user in recipients {
        report.attempted += 1;
        match notifier.notify(user, html).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!("Broadcast to {} failed: {}", user, e);
                report.failed.push(user);
            }
        }
    }

    info!(
        "Broadcast finished: {} delivered, {} failed, {} attempted",
        report.delivered,
        report.failed.len(),
        report.attempted
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingNotifier;

    #[tokio::test]
    async fn failures_do_not_stop_delivery() {
        let notifier = RecordingNotifier::failing_for([2, 4]);
        let recipients: Vec<UserId> = (1..=5).map(UserId).collect();

        let report = deliver_all(&notifier, &recipients, "hi").await;

        assert_eq!(notifier.attempted(), recipients);
        assert_eq!(report.attempted, 5);
        assert_eq!(report.delivered, 3);
        assert_eq!(report.failed, vec![UserId(2), UserId(4)]);
    }

    #[tokio::test]
    async fn every_delivery_failing_still_attempts_all() {
        let notifier = RecordingNotifier::failing_for(1..=3);
        let recipients: Vec<UserId> = (1..=3).map(UserId).collect();

        let report = deliver_all(&notifier, &recipients, "hi").await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 0);
        assert_eq!(notifier.attempted().len(), 3);
    }
}
