//! Notification fan-out.
//!
//! Every operation ends up in `Notifier::dispatch`, which walks its
//! requests one after the other and counts the successful sends. A failed
//! send is logged and counted out; it never stops the remaining sends.

mod templates;

use crate::domain::{Company, Drive, PersonName, RecipientEmail, RollNumber, Student};
use crate::mail_client::{MailClient, MailError, NotificationRequest};
use crate::records::{RecordError, RecordStore};

pub use templates::broadcast_body;

/// An address plus the fields used to personalise the body.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub email: RecipientEmail,
    pub name: Option<PersonName>,
    pub roll_no: Option<RollNumber>,
}

impl From<&Student> for Recipient {
    fn from(student: &Student) -> Self {
        Self {
            email: student.email.clone(),
            name: Some(student.profile.name.clone()),
            roll_no: Some(student.profile.roll_no.clone()),
        }
    }
}

impl From<RecipientEmail> for Recipient {
    fn from(email: RecipientEmail) -> Self {
        Self {
            email,
            name: None,
            roll_no: None,
        }
    }
}

/// Outcome of a bulk send. An empty audience yields `0/0`, which counts as
/// a successful dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DispatchResult {
    pub success_count: usize,
    pub total_count: usize,
}

impl DispatchResult {
    pub fn failed_count(&self) -> usize {
        self.total_count - self.success_count
    }
}

pub struct Notifier {
    mail_client: MailClient,
    institution: String,
    portal_url: String,
}

impl Notifier {
    pub fn new(mail_client: MailClient, institution: String, portal_url: String) -> Self {
        Self {
            mail_client,
            institution,
            portal_url: portal_url.trim_end_matches('/').to_string(),
        }
    }

    #[tracing::instrument(name = "send student welcome", skip(self, recipient), fields(recipient = %recipient.email))]
    pub async fn send_student_welcome(&self, recipient: &Recipient) -> Result<(), MailError> {
        let rendered =
            templates::student_welcome(recipient, &self.institution, &self.portal_url);
        self.mail_client
            .send(NotificationRequest::new(
                recipient.email.clone(),
                rendered.subject,
                rendered.html_body,
            ))
            .await
    }

    #[tracing::instrument(name = "send bulk student welcome", skip_all, fields(total = recipients.len()))]
    pub async fn send_bulk_student_welcome(&self, recipients: &[Recipient]) -> DispatchResult {
        let requests = recipients.iter().map(|recipient| {
            let rendered =
                templates::student_welcome(recipient, &self.institution, &self.portal_url);
            NotificationRequest::new(recipient.email.clone(), rendered.subject, rendered.html_body)
        });
        self.dispatch(requests).await
    }

    #[tracing::instrument(name = "send company approval", skip(self, company), fields(company_id = %company.id))]
    pub async fn send_company_approval(&self, company: &Company) -> Result<(), MailError> {
        let rendered =
            templates::company_approval(company, &self.institution, &self.portal_url);
        self.mail_client
            .send(NotificationRequest::new(
                company.hr_email.clone(),
                rendered.subject,
                rendered.html_body,
            ))
            .await
    }

    /// Announces `drive` to every student its eligibility admits. Only the
    /// eligibility lookup can fail; send failures are counted.
    #[tracing::instrument(name = "notify eligible students", skip(self, records, drive, company), fields(drive_id = %drive.id))]
    pub async fn notify_eligible_students(
        &self,
        records: &dyn RecordStore,
        drive: &Drive,
        company: &Company,
    ) -> Result<DispatchResult, RecordError> {
        let students = records.eligible_students(&drive.eligibility).await?;
        let rendered = templates::drive_announcement(drive, company, &self.portal_url);

        let requests = students.iter().map(|student| {
            NotificationRequest::new(
                student.email.clone(),
                rendered.subject.as_str(),
                rendered.html_body.as_str(),
            )
        });
        Ok(self.dispatch(requests).await)
    }

    /// Broadcasts a plain text message (typically a reviewed mail-bot draft).
    #[tracing::instrument(name = "send bulk notification", skip(self, recipients, text), fields(total = recipients.len()))]
    pub async fn send_bulk_notification(
        &self,
        recipients: &[RecipientEmail],
        subject: &str,
        text: &str,
    ) -> DispatchResult {
        let html_body = broadcast_body(text);
        let requests = recipients
            .iter()
            .map(|email| NotificationRequest::new(email.clone(), subject, html_body.as_str()));
        self.dispatch(requests).await
    }

    async fn dispatch<I>(&self, requests: I) -> DispatchResult
    where
        I: IntoIterator<Item = NotificationRequest>,
    {
        let mut result = DispatchResult::default();

        for request in requests {
            result.total_count += 1;
            let recipient = request.recipient.clone();
            match self.mail_client.send(request).await {
                Ok(()) => result.success_count += 1,
                Err(e) => tracing::warn!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    %recipient,
                    "failed to deliver notification, moving on"
                ),
            }
        }

        tracing::info!(
            success_count = result.success_count,
            total_count = result.total_count,
            "dispatch finished"
        );
        result
    }
}
