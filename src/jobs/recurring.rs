//! Background task that posts recurring transactions.
//!
//! Runs once at startup and then on a fixed interval (daily by default).
//! A failed run is retried on the [`RetryPolicy`] schedule; once that is
//! exhausted the error is logged and the task waits for the next tick.

use std::time::Duration;

use chrono::Utc;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error, info};

use crate::{db::DbPool, jobs::retry::RetryPolicy, services::recurring_service};

/// Spawn the recurring-transaction task on the current runtime.
pub fn spawn(pool: DbPool, every: Duration, policy: RetryPolicy) -> JoinHandle<()> {
    tokio::spawn(run(pool, every, policy))
}

async fn run(pool: DbPool, every: Duration, policy: RetryPolicy) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = every.as_secs(), "recurring transaction job started");

    loop {
        interval.tick().await;
        let today = Utc::now().date_naive();
        debug!(%today, "recurring transaction run starting");

        let result = policy
            .run("recurring_transactions", || {
                recurring_service::process_due(&pool, today)
            })
            .await;

        if let Err(err) = result {
            error!(
                error = %err,
                attempts = policy.max_attempts(),
                "recurring transaction run failed; waiting for next interval"
            );
        }
    }
}
