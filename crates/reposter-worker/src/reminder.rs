//! Periodic reminder to refresh the session credential.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use reposter_notify::{Notification, Notifier};

/// Send a reminder every `period`, the first one after a full period.
pub async fn run_reminder(notifier: Arc<dyn Notifier>, operator_id: String, period: Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        match notifier.notify(&Notification::reminder(&operator_id)).await {
            Ok(()) => info!("Sent credential reminder"),
            Err(e) => warn!(error = %e, "Failed to send credential reminder"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reposter_notify::NotifyResult;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn notify(&self, notification: &Notification) -> NotifyResult<()> {
            self.sent.lock().unwrap().push(notification.content.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_reminder_waits_a_full_period() {
        let recorder = Arc::new(Recorder::default());
        let period = Duration::from_secs(3600);
        let task = tokio::spawn(run_reminder(recorder.clone(), "42".to_string(), period));

        tokio::time::sleep(Duration::from_secs(1800)).await;
        assert!(recorder.sent.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(5500)).await;
        task.abort();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            "<@42> Reminder to update session ID soon! It's been one month!"
        );
    }
}
