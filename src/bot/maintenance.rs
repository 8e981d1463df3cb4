//! Daily maintenance: database backup and a report to the admin.

use std::path::PathBuf;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::admin::AdminTools;
use crate::database::UserStats;
use crate::error::BotResult;
use crate::notify::Notifier;

const PERIOD: Duration = Duration::from_secs(24 * 60 * 60);
const FIRST_RUN_DELAY: Duration = Duration::from_secs(10);

/// Run [`run_daily`] shortly after start and every 24 hours after that.
pub fn spawn<N>(admin: AdminTools, notifier: N) -> JoinHandle<()>
where
    N: Notifier + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + FIRST_RUN_DELAY, PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            info!("🔄 Running daily maintenance tasks...");
            match run_daily(&admin, &notifier).await {
                Ok(()) => info!("✅ Daily maintenance completed"),
                Err(e) => error!("Daily maintenance failed: {}", e),
            }
        }
    })
}

/// Back up the database and send the daily report.
///
/// A failed backup is reported rather than aborting the report.
pub async fn run_daily(admin: &AdminTools, notifier: &dyn Notifier) -> BotResult<()> {
    let caller = admin.admin_id();

    let backup = match admin.backup(caller).await {
        Ok(path) => {
            info!("✅ Daily backup created: {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("Daily backup failed: {}", e);
            None
        }
    };

    let stats = admin.stats(caller).await?;
    notifier.notify(caller, &daily_report(&stats, backup.as_ref())).await
}

fn daily_report(stats: &UserStats, backup: Option<&PathBuf>) -> String {
    format!(
        "📊 <b>Daily Report</b>\n\n\
         👥 Total Users: {}\n\
         ✅ Verified: {}\n\
         📈 Total Referrals: {}\n\
         💾 Backup: {}",
        stats.total,
        stats.verified,
        stats.total_referrals,
        if backup.is_some() { "✅ Created" } else { "❌ Failed" },
    )
}
