//! Low-rating alerts for restaurant owners.
//!
//! A submission qualifies when it is a complaint, or feedback whose average
//! rating is at or below the configured threshold. Qualifying submissions are
//! rendered into an email and handed to a [`Mailer`]. Delivery problems are
//! logged and reported as `false`; they never fail the caller.

use std::future::Future;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    mail::{EmailMessage, MailError, Mailer},
    models::{Complaint, Feedback},
    store::StoreError,
};

pub mod source;
pub mod sweep;
mod template;

pub use source::PgNotificationSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionKind {
    Feedback,
    Complaint,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Feedback => "feedback",
            SubmissionKind::Complaint => "complaint",
        }
    }
}

/// The fields of a feedback or complaint row that an alert needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub kind: SubmissionKind,
    pub id: i32,
    pub restaurant_id: i32,
    pub customer_name: String,
    pub food_rating: i32,
    pub service_rating: i32,
    pub atmosphere_rating: i32,
    pub average_rating: f64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Feedback> for Submission {
    fn from(feedback: &Feedback) -> Self {
        Self {
            kind: SubmissionKind::Feedback,
            id: feedback.id,
            restaurant_id: feedback.restaurant_id,
            customer_name: feedback.name.clone(),
            food_rating: feedback.food_rating,
            service_rating: feedback.service_rating,
            atmosphere_rating: feedback.atmosphere_rating,
            average_rating: feedback.average_rating,
            comment: feedback.comment.clone(),
            created_at: feedback.created_at,
        }
    }
}

impl From<&Complaint> for Submission {
    fn from(complaint: &Complaint) -> Self {
        Self {
            kind: SubmissionKind::Complaint,
            id: complaint.id,
            restaurant_id: complaint.restaurant_id,
            customer_name: complaint.name.clone(),
            food_rating: complaint.food_rating,
            service_rating: complaint.service_rating,
            atmosphere_rating: complaint.atmosphere_rating,
            average_rating: complaint.average_rating,
            comment: Some(complaint.comment.clone()),
            created_at: complaint.created_at,
        }
    }
}

/// Who an alert for a given restaurant goes to.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub restaurant_name: String,
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub notify_on_low_rating: bool,
    pub low_rating_threshold: f64,
    pub sender: String,
}

pub fn should_notify(kind: SubmissionKind, average_rating: f64, threshold: f64) -> bool {
    match kind {
        SubmissionKind::Complaint => true,
        SubmissionKind::Feedback => average_rating <= threshold,
    }
}

/// Reads the data a sweep or a single alert needs.
pub trait NotificationSource {
    fn submissions_since(
        &mut self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Submission>, StoreError>> + Send;

    /// `None` when the restaurant does not exist.
    fn recipient(
        &mut self,
        restaurant_id: i32,
    ) -> impl Future<Output = Result<Option<Recipient>, StoreError>> + Send;
}

pub struct Notifier<M> {
    mailer: M,
    settings: NotificationSettings,
}

impl<M: Mailer> Notifier<M> {
    pub fn new(mailer: M, settings: NotificationSettings) -> Self {
        Self { mailer, settings }
    }

    pub fn qualifies(&self, submission: &Submission) -> bool {
        should_notify(
            submission.kind,
            submission.average_rating,
            self.settings.low_rating_threshold,
        )
    }

    /// Sends the alert for `submission` to the restaurant owner.
    ///
    /// Returns `true` only when the mailer accepted the message.
    pub async fn dispatch(&self, submission: &Submission, recipient: Option<&Recipient>) -> bool {
        let kind = submission.kind.as_str();

        if !self.settings.notify_on_low_rating {
            info!("Low rating notifications are turned off");
            return false;
        }

        if !self.qualifies(submission) {
            info!(
                kind,
                id = submission.id,
                average_rating = submission.average_rating,
                "Submission is above the low rating threshold"
            );
            return false;
        }

        let Some(recipient) = recipient else {
            error!(
                restaurant_id = submission.restaurant_id,
                "Restaurant not found for {kind} {}", submission.id
            );
            return false;
        };
        let Some(owner_email) = recipient.owner_email.as_deref() else {
            error!(
                restaurant_id = submission.restaurant_id,
                "No owner found for restaurant {}", submission.restaurant_id
            );
            return false;
        };

        info!(
            kind,
            id = submission.id,
            to = owner_email,
            restaurant = %recipient.restaurant_name,
            "Sending low rating notification"
        );
        match self
            .send_to(submission, &recipient.restaurant_name, owner_email)
            .await
        {
            Ok(()) => {
                info!(kind, id = submission.id, "Low rating notification sent");
                true
            }
            Err(MailError::Disabled) => {
                warn!(kind, id = submission.id, "Email delivery is disabled");
                false
            }
            Err(err) => {
                error!(kind, id = submission.id, "Cannot send low rating notification: {err}");
                false
            }
        }
    }

    /// Renders and sends the alert to an explicit address, skipping the
    /// threshold rule.
    pub async fn send_to(
        &self,
        submission: &Submission,
        restaurant_name: &str,
        to: &str,
    ) -> Result<(), MailError> {
        let rendered = template::render(submission, restaurant_name);
        let message = EmailMessage {
            from: self.settings.sender.clone(),
            to: to.to_string(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        };
        self.mailer.send(&message).await
    }
}

/// Looks up the recipient of a freshly stored submission and dispatches the
/// alert. Lookup failures are logged and reported as `false`.
pub async fn notify_submission<S, M>(
    source: &mut S,
    notifier: &Notifier<M>,
    submission: &Submission,
) -> bool
where
    S: NotificationSource,
    M: Mailer,
{
    if !notifier.settings.notify_on_low_rating || !notifier.qualifies(submission) {
        return false;
    }
    match source.recipient(submission.restaurant_id).await {
        Ok(recipient) => notifier.dispatch(submission, recipient.as_ref()).await,
        Err(err) => {
            error!(
                restaurant_id = submission.restaurant_id,
                "Cannot load notification recipient: {err}"
            );
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub fail_for: Option<String>,
        pub disabled: bool,
    }

    impl RecordingMailer {
        pub fn sent(&self) -> Vec<EmailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if self.disabled {
                return Err(MailError::Disabled);
            }
            if self.fail_for.as_deref() == Some(message.to.as_str()) {
                return Err(MailError::Store(StoreError::NotFound));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    pub fn settings() -> NotificationSettings {
        NotificationSettings {
            notify_on_low_rating: true,
            low_rating_threshold: 3.0,
            sender: "contact@mutfakyazilim.com".to_string(),
        }
    }

    pub fn submission(kind: SubmissionKind, id: i32, restaurant_id: i32, average: f64) -> Submission {
        Submission {
            kind,
            id,
            restaurant_id,
            customer_name: "Ayşe".to_string(),
            food_rating: 2,
            service_rating: 3,
            atmosphere_rating: 3,
            average_rating: average,
            comment: None,
            created_at: Utc.with_ymd_and_hms(2025, 3, 14, 18, 5, 0).unwrap(),
        }
    }

    pub fn recipient(name: &str, email: Option<&str>) -> Recipient {
        Recipient {
            restaurant_name: name.to_string(),
            owner_email: email.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn complaints_always_qualify() {
        assert!(should_notify(SubmissionKind::Complaint, 5.0, 3.0));
        assert!(should_notify(SubmissionKind::Complaint, 1.0, 3.0));
    }

    #[test]
    fn feedback_qualifies_at_or_below_threshold() {
        assert!(should_notify(SubmissionKind::Feedback, 2.7, 3.0));
        assert!(should_notify(SubmissionKind::Feedback, 3.0, 3.0));
        assert!(!should_notify(SubmissionKind::Feedback, 3.1, 3.0));
    }

    #[tokio::test]
    async fn dispatch_sends_low_feedback_to_owner() {
        let notifier = Notifier::new(RecordingMailer::default(), settings());
        let owner = recipient("Kebapçı", Some("owner@example.com"));

        let sent = notifier
            .dispatch(
                &submission(SubmissionKind::Feedback, 11, 5, 2.7),
                Some(&owner),
            )
            .await;

        assert!(sent);
        let messages = notifier.mailer.sent();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to, "owner@example.com");
        assert_eq!(messages[0].from, "contact@mutfakyazilim.com");
        assert!(messages[0].subject.contains("2.7"));
    }

    #[tokio::test]
    async fn dispatch_skips_feedback_above_threshold() {
        let notifier = Notifier::new(RecordingMailer::default(), settings());
        let owner = recipient("Kebapçı", Some("owner@example.com"));

        let sent = notifier
            .dispatch(
                &submission(SubmissionKind::Feedback, 12, 5, 3.1),
                Some(&owner),
            )
            .await;

        assert!(!sent);
        assert!(notifier.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn dispatch_sends_high_rated_complaints() {
        let notifier = Notifier::new(RecordingMailer::default(), settings());
        let owner = recipient("Kebapçı", Some("owner@example.com"));

        assert!(
            notifier
                .dispatch(
                    &submission(SubmissionKind::Complaint, 3, 5, 4.7),
                    Some(&owner)
                )
                .await
        );
    }

    #[tokio::test]
    async fn dispatch_is_off_when_low_rating_alerts_are_disabled() {
        let mut disabled = settings();
        disabled.notify_on_low_rating = false;
        let notifier = Notifier::new(RecordingMailer::default(), disabled);
        let owner = recipient("Kebapçı", Some("owner@example.com"));

        assert!(
            !notifier
                .dispatch(
                    &submission(SubmissionKind::Complaint, 3, 5, 1.0),
                    Some(&owner)
                )
                .await
        );
        assert!(notifier.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn dispatch_fails_without_restaurant_or_owner() {
        let notifier = Notifier::new(RecordingMailer::default(), settings());
        let low = submission(SubmissionKind::Feedback, 1, 5, 1.0);

        assert!(!notifier.dispatch(&low, None).await);
        assert!(
            !notifier
                .dispatch(&low, Some(&recipient("Kebapçı", None)))
                .await
        );
        assert!(notifier.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn dispatch_reports_mailer_failures_as_false() {
        let failing = RecordingMailer {
            fail_for: Some("owner@example.com".to_string()),
            ..Default::default()
        };
        let notifier = Notifier::new(failing, settings());
        let owner = recipient("Kebapçı", Some("owner@example.com"));
        assert!(
            !notifier
                .dispatch(&submission(SubmissionKind::Feedback, 1, 5, 1.0), Some(&owner))
                .await
        );

        let disabled = RecordingMailer {
            disabled: true,
            ..Default::default()
        };
        let notifier = Notifier::new(disabled, settings());
        assert!(
            !notifier
                .dispatch(&submission(SubmissionKind::Feedback, 1, 5, 1.0), Some(&owner))
                .await
        );
    }

    #[test]
    fn complaint_rows_always_carry_their_comment() {
        let complaint = Complaint {
            id: 4,
            name: "Mehmet".to_string(),
            email: "mehmet@example.com".to_string(),
            phone: "5551234567".to_string(),
            food_rating: 4,
            service_rating: 5,
            atmosphere_rating: 4,
            average_rating: 4.3,
            comment: "Cold soup".to_string(),
            restaurant_id: 2,
            created_at: Utc::now(),
        };

        let submission = Submission::from(&complaint);
        assert_eq!(submission.kind, SubmissionKind::Complaint);
        assert_eq!(submission.comment.as_deref(), Some("Cold soup"));
        assert_eq!(submission.restaurant_id, 2);
    }
}
