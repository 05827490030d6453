//! Notification dispatcher.
//!
//! Renders a fired job into its message body and fans out to the recipient
//! set: the fixed administrative distribution list, plus the lead's phone
//! when one was frozen into the job at registration time. Every recipient
//! send is independent — a failure for one never aborts the siblings.

use uuid::Uuid;

use relay_common::types::{DispatchResult, NotificationJob, Template};
use relay_engine::phone;
use relay_engine::scheduler::Dispatch;

use crate::gateway::{Gateway, LinkPreview};
use crate::templates;

/// Dispatcher over an outbound messaging gateway.
pub struct Dispatcher<G: Gateway> {
    gateway: G,
    admin_phones: Vec<String>,
    country_code: String,
}

impl<G: Gateway> Dispatcher<G> {
    pub fn new(gateway: G, admin_phones: Vec<String>, country_code: &str) -> Self {
        Self {
            gateway,
            admin_phones,
            country_code: country_code.to_string(),
        }
    }

    fn render(job: &NotificationJob) -> String {
        let first_name = job.args["first_name"].as_str().unwrap_or("");
        let meeting_hm = job.args["meeting_hm"].as_str().unwrap_or("");
        let meeting_full = job.args["meeting_full"].as_str().unwrap_or("");
        let link = job.args["meeting_link"].as_str();
        templates::render(job.template, first_name, meeting_hm, meeting_full, link)
    }

    /// Rich-link attachment for confirmation jobs that carry a meeting link.
    fn link_preview(job: &NotificationJob) -> Option<LinkPreview> {
        if job.template != Template::Confirmation {
            return None;
        }
        let url = job.args["meeting_link"].as_str()?;
        Some(LinkPreview {
            url: url.to_string(),
            title: "Reunião confirmada".to_string(),
            description: job.args["meeting_full"].as_str().unwrap_or("").to_string(),
            image: None,
        })
    }

    async fn send_one(
        &self,
        recipient: &str,
        body: &str,
        link: Option<&LinkPreview>,
    ) -> DispatchResult {
        let outcome = match link {
            Some(link) => self.gateway.send_link(recipient, body, link).await,
            None => self.gateway.send_text(recipient, body).await,
        };
        match outcome {
            Ok(()) => DispatchResult::sent(recipient),
            Err(err) => DispatchResult::failed(recipient, err.to_string()),
        }
    }
}

impl<G: Gateway> Dispatch for Dispatcher<G> {
    async fn dispatch(&self, job: NotificationJob) -> Vec<DispatchResult> {
        let delivery_id = Uuid::new_v4();
        let body = Self::render(&job);
        let link = Self::link_preview(&job);
        let mut results = Vec::new();

        if job.recipient_set.includes_admins() {
            for admin in &self.admin_phones {
                results.push(self.send_one(admin, &body, None).await);
            }
        }

        if job.recipient_set.includes_lead() {
            // Identity is read from the job args; absence is a resolution
            // miss, not a failure.
            if let Some(lead) = job.args["lead_phone"].as_str() {
                let to = phone::to_dispatch_form(lead, &self.country_code);
                results.push(self.send_one(&to, &body, link.as_ref()).await);
            }
        }

        let failed = results.iter().filter(|r| !r.ok).count();
        tracing::info!(
            %delivery_id,
            job_id = %job.job_id,
            template = %job.template,
            recipients = results.len(),
            failed,
            "Dispatch completed"
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_common::error::RelayError;
    use relay_common::types::RecipientSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGateway {
        sent: Mutex<Vec<(String, String)>>,
        links: Mutex<Vec<(String, String)>>,
        /// Recipients whose sends should fail.
        failing: Vec<String>,
    }

    impl Gateway for FakeGateway {
        async fn send_text(&self, phone: &str, body: &str) -> Result<(), RelayError> {
            if self.failing.iter().any(|f| f == phone) {
                return Err(RelayError::Gateway("unreachable".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), body.to_string()));
            Ok(())
        }

        async fn send_link(
            &self,
            phone: &str,
            body: &str,
            link: &LinkPreview,
        ) -> Result<(), RelayError> {
            self.links
                .lock()
                .unwrap()
                .push((phone.to_string(), link.url.clone()));
            self.send_text(phone, body).await
        }
    }

    fn reminder_job(recipient_set: RecipientSet, lead_phone: Option<&str>) -> NotificationJob {
        NotificationJob {
            job_id: "wa:bk_1:4h".to_string(),
            fire_at: chrono::Utc::now(),
            recipient_set,
            template: Template::FourHoursBefore,
            args: serde_json::json!({
                "first_name": "Maria",
                "meeting_hm": "15:00",
                "lead_phone": lead_phone,
            }),
        }
    }

    #[tokio::test]
    async fn test_fans_out_to_admins_and_lead() {
        let gateway = FakeGateway::default();
        let dispatcher = Dispatcher::new(
            gateway,
            vec!["5511900000001".to_string(), "5511900000002".to_string()],
            "55",
        );

        let results = dispatcher
            .dispatch(reminder_job(RecipientSet::Both, Some("11912345678")))
            .await;

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.ok));
        let sent = dispatcher.gateway.sent.lock().unwrap();
        let recipients: Vec<&str> = sent.iter().map(|(p, _)| p.as_str()).collect();
        // Lead number goes out in dispatch form.
        assert_eq!(
            recipients,
            vec!["5511900000001", "5511900000002", "5511912345678"]
        );
        assert!(sent[0].1.contains("15:00"));
    }

    #[tokio::test]
    async fn test_resolution_miss_sends_admin_only() {
        let gateway = FakeGateway::default();
        let dispatcher = Dispatcher::new(gateway, vec!["5511900000001".to_string()], "55");

        let results = dispatcher
            .dispatch(reminder_job(RecipientSet::Both, None))
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].recipient, "5511900000001");
    }

    #[tokio::test]
    async fn test_lead_failure_does_not_abort_admins() {
        let gateway = FakeGateway {
            failing: vec!["5511912345678".to_string()],
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(gateway, vec!["5511900000001".to_string()], "55");

        let results = dispatcher
            .dispatch(reminder_job(RecipientSet::Both, Some("11912345678")))
            .await;

        assert_eq!(results.len(), 2);
        assert!(results[0].ok, "admin send must succeed");
        assert!(!results[1].ok, "lead send fails independently");
        assert!(results[1].error.as_deref().unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn test_admin_failure_does_not_abort_lead() {
        let gateway = FakeGateway {
            failing: vec!["5511900000001".to_string()],
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(gateway, vec!["5511900000001".to_string()], "55");

        let results = dispatcher
            .dispatch(reminder_job(RecipientSet::Both, Some("11912345678")))
            .await;

        assert!(!results[0].ok);
        assert!(results[1].ok, "lead send proceeds after admin failure");
    }

    #[tokio::test]
    async fn test_confirmation_sends_rich_link_to_lead() {
        let gateway = FakeGateway::default();
        let dispatcher = Dispatcher::new(gateway, vec!["5511900000001".to_string()], "55");

        let job = NotificationJob {
            job_id: "wa:bk_1:confirm".to_string(),
            fire_at: chrono::Utc::now(),
            recipient_set: RecipientSet::Both,
            template: Template::Confirmation,
            args: serde_json::json!({
                "first_name": "Maria",
                "meeting_full": "10/03/2024 - 03:00pm",
                "lead_phone": "11912345678",
                "meeting_link": "https://meet.example.com/abc",
            }),
        };

        let results = dispatcher.dispatch(job).await;
        assert_eq!(results.len(), 2);

        // Admins get the plain body; the lead gets the rich-link variant.
        let links = dispatcher.gateway.links.lock().unwrap();
        assert_eq!(
            links.as_slice(),
            &[(
                "5511912345678".to_string(),
                "https://meet.example.com/abc".to_string()
            )]
        );
    }
}
