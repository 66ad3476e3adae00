use std::{collections::HashMap, future::Future, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::{mail::Mailer, store::StoreError, DbPool};

use super::{NotificationSource, Notifier, PgNotificationSource, Recipient};

/// Re-dispatches alerts for every qualifying submission created within
/// `window` before `now`. Returns how many alerts the mailer accepted.
///
/// Nothing records which submissions were already alerted, so a row that
/// stays in the window is sent again on every run.
pub async fn sweep<S, M>(
    source: &mut S,
    notifier: &Notifier<M>,
    window: TimeDelta,
    now: DateTime<Utc>,
) -> Result<usize, StoreError>
where
    S: NotificationSource,
    M: Mailer,
{
    let cutoff = now - window;
    let submissions = source.submissions_since(cutoff).await?;
    let mut recipients: HashMap<i32, Option<Recipient>> = HashMap::new();
    let mut sent = 0;

    for submission in submissions.iter().filter(|s| notifier.qualifies(s)) {
        if !recipients.contains_key(&submission.restaurant_id) {
            let recipient = source.recipient(submission.restaurant_id).await?;
            recipients.insert(submission.restaurant_id, recipient);
        }
        let recipient = recipients
            .get(&submission.restaurant_id)
            .and_then(Option::as_ref);
        if notifier.dispatch(submission, recipient).await {
            sent += 1;
        }
    }

    info!(sent, since = %cutoff, "Low rating sweep finished");
    Ok(sent)
}

/// One sweep over the database, as run by the periodic task and the manual
/// trigger.
pub async fn sweep_database<M: Mailer>(
    pool: &DbPool,
    notifier: &Notifier<M>,
    window: TimeDelta,
) -> Result<usize, StoreError> {
    let mut source = PgNotificationSource::new(pool.clone());
    sweep(&mut source, notifier, window, Utc::now()).await
}

/// Calls `run` every `period`, starting one period from now. Failures are
/// logged and the schedule continues.
pub async fn run_periodic<F, Fut>(period: Duration, mut run: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<usize, StoreError>>,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(period_secs = period.as_secs(), "Low rating sweeper scheduled");
    loop {
        ticker.tick().await;
        match run().await {
            Ok(sent) => info!(sent, "Periodic low rating sweep completed"),
            Err(err) => error!("Periodic low rating sweep failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use chrono::TimeZone;
    use tokio::sync::Semaphore;

    use super::super::testing::*;
    use super::super::{Submission, SubmissionKind};
    use super::*;
    use crate::mail::{EmailMessage, MailError};

    struct MemorySource {
        submissions: Vec<Submission>,
        recipients: HashMap<i32, Recipient>,
        recipient_lookups: usize,
        fail: bool,
    }

    impl MemorySource {
        fn new(submissions: Vec<Submission>) -> Self {
            Self {
                submissions,
                recipients: HashMap::new(),
                recipient_lookups: 0,
                fail: false,
            }
        }
    }

    impl NotificationSource for MemorySource {
        async fn submissions_since(
            &mut self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Submission>, StoreError> {
            if self.fail {
                return Err(StoreError::NotFound);
            }
            Ok(self
                .submissions
                .iter()
                .filter(|s| s.created_at >= cutoff)
                .cloned()
                .collect())
        }

        async fn recipient(&mut self, restaurant_id: i32) -> Result<Option<Recipient>, StoreError> {
            self.recipient_lookups += 1;
            Ok(self.recipients.get(&restaurant_id).cloned())
        }
    }

    /// Single-connection pool shared by a source and a mailer. Each side
    /// holds a permit only while it talks to the database.
    struct SharedPool {
        connections: Arc<Semaphore>,
    }

    impl SharedPool {
        fn single() -> Self {
            Self {
                connections: Arc::new(Semaphore::new(1)),
            }
        }
    }

    struct PooledSource {
        inner: MemorySource,
        connections: Arc<Semaphore>,
    }

    impl NotificationSource for PooledSource {
        async fn submissions_since(
            &mut self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Submission>, StoreError> {
            let _conn = self.connections.acquire().await.unwrap();
            self.inner.submissions_since(cutoff).await
        }

        async fn recipient(&mut self, restaurant_id: i32) -> Result<Option<Recipient>, StoreError> {
            let _conn = self.connections.acquire().await.unwrap();
            self.inner.recipient(restaurant_id).await
        }
    }

    struct PooledMailer {
        connections: Arc<Semaphore>,
        sent: AtomicUsize,
    }

    impl Mailer for PooledMailer {
        async fn send(&self, _message: &EmailMessage) -> Result<(), MailError> {
            let _conn = self
                .connections
                .try_acquire()
                .map_err(|_| StoreError::Conflict("pool exhausted".to_string()))?;
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
    }

    fn at(hours_ago: i64, mut submission: Submission) -> Submission {
        submission.created_at = now() - TimeDelta::hours(hours_ago);
        submission
    }

    #[tokio::test]
    async fn sweep_sends_qualifying_rows_inside_the_window() {
        let mut source = MemorySource::new(vec![
            at(1, submission(SubmissionKind::Feedback, 1, 5, 2.7)),
            at(2, submission(SubmissionKind::Feedback, 2, 5, 3.1)),
            at(3, submission(SubmissionKind::Complaint, 3, 5, 4.7)),
            at(30, submission(SubmissionKind::Feedback, 4, 5, 1.0)),
        ]);
        source
            .recipients
            .insert(5, recipient("Kebapçı", Some("owner@example.com")));
        let notifier = Notifier::new(RecordingMailer::default(), settings());

        let sent = sweep(&mut source, &notifier, TimeDelta::hours(24), now())
            .await
            .unwrap();

        assert_eq!(sent, 2);
        assert_eq!(notifier.mailer.sent().len(), 2);
        assert_eq!(source.recipient_lookups, 1);
    }

    #[tokio::test]
    async fn sweep_resends_on_every_run() {
        let mut source =
            MemorySource::new(vec![at(1, submission(SubmissionKind::Complaint, 1, 5, 2.0))]);
        source
            .recipients
            .insert(5, recipient("Kebapçı", Some("owner@example.com")));
        let notifier = Notifier::new(RecordingMailer::default(), settings());

        sweep(&mut source, &notifier, TimeDelta::hours(24), now())
            .await
            .unwrap();
        sweep(&mut source, &notifier, TimeDelta::hours(24), now())
            .await
            .unwrap();

        assert_eq!(notifier.mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn sweep_counts_only_successful_sends() {
        let mut source = MemorySource::new(vec![
            at(1, submission(SubmissionKind::Feedback, 1, 5, 2.0)),
            at(1, submission(SubmissionKind::Feedback, 2, 6, 2.0)),
            at(1, submission(SubmissionKind::Feedback, 3, 7, 2.0)),
            at(1, submission(SubmissionKind::Feedback, 4, 8, 2.0)),
        ]);
        source
            .recipients
            .insert(5, recipient("Kebapçı", Some("owner@example.com")));
        source
            .recipients
            .insert(6, recipient("Pideci", Some("broken@example.com")));
        source.recipients.insert(7, recipient("Sahipsiz", None));
        let mailer = RecordingMailer {
            fail_for: Some("broken@example.com".to_string()),
            ..Default::default()
        };
        let notifier = Notifier::new(mailer, settings());

        let sent = sweep(&mut source, &notifier, TimeDelta::hours(24), now())
            .await
            .unwrap();

        assert_eq!(sent, 1);
        assert_eq!(notifier.mailer.sent()[0].to, "owner@example.com");
    }

    #[tokio::test]
    async fn sweep_propagates_source_failures() {
        let mut source = MemorySource::new(vec![]);
        source.fail = true;
        let notifier = Notifier::new(RecordingMailer::default(), settings());

        assert!(sweep(&mut source, &notifier, TimeDelta::hours(24), now())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn sweep_leaves_a_connection_free_for_the_mailer() {
        let pool = SharedPool::single();
        let mut inner = MemorySource::new(vec![
            at(1, submission(SubmissionKind::Feedback, 1, 5, 2.0)),
            at(2, submission(SubmissionKind::Complaint, 2, 6, 4.5)),
        ]);
        inner
            .recipients
            .insert(5, recipient("Kebapçı", Some("owner@example.com")));
        inner
            .recipients
            .insert(6, recipient("Pideci", Some("pide@example.com")));
        let mut source = PooledSource {
            inner,
            connections: pool.connections.clone(),
        };
        let mailer = PooledMailer {
            connections: pool.connections.clone(),
            sent: AtomicUsize::new(0),
        };
        let notifier = Notifier::new(mailer, settings());

        let sent = sweep(&mut source, &notifier, TimeDelta::hours(24), now())
            .await
            .unwrap();

        assert_eq!(sent, 2);
        assert_eq!(notifier.mailer.sent.load(Ordering::SeqCst), 2);
        assert_eq!(pool.connections.available_permits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_runner_waits_one_period_before_first_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();

        let runner = run_periodic(Duration::from_secs(60 * 60), move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst)) }
        });

        let _ = tokio::time::timeout(Duration::from_secs(30 * 60), runner).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_runner_keeps_going_after_failures() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let period = Duration::from_secs(60 * 60);

        let runner = run_periodic(period, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StoreError::NotFound)
                } else {
                    Ok(0)
                }
            }
        });

        let _ = tokio::time::timeout(Duration::from_secs(150 * 60), runner).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
