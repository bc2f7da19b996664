// src/mailer.rs
//! Thin client for a transactional mail HTTP API. Notifications are
//! best-effort: callers dispatch them from a spawned task and the state
//! transition that triggered them never waits on delivery.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailerError {
    #[error("Mail request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Mail API error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct Mailer {
    client: Client,
    api_url: String,
    api_key: String,
    from_address: String,
}

#[derive(Debug, Serialize)]
struct SendMailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl Mailer {
    pub fn new(api_url: String, api_key: String, from_address: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_url,
            api_key,
            from_address,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), MailerError> {
        let request = SendMailRequest {
            from: &self.from_address,
            to,
            subject,
            text,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!("Sent mail to {}: {}", to, subject);
        Ok(())
    }

    pub async fn send_appointment_approved(
        &self,
        to: &str,
        therapist_name: &str,
        date: &chrono::DateTime<chrono::Utc>,
        meeting_link: &str,
    ) -> Result<(), MailerError> {
        let text = format!(
            "Your session with {} is approved for {}. Zoom: {}",
            therapist_name,
            date.format("%B %d, %Y at %H:%M UTC"),
            meeting_link
        );
        self.send(to, "Your Therapy Session is Approved", &text).await
    }
}
