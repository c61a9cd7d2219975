//! Fire-and-forget transactional notifications.
//!
//! Three message shapes leave this core: the purchase confirmation with
//! the license code and activation link, the claim-created alert to the
//! operator, and the daily activity summary. Delivery modes, in
//! resolution order:
//! 1. POST to a webhook URL (for DIY delivery)
//! 2. Send via the Resend API when an API key is configured
//! 3. Disabled (log only)
//!
//! Dispatch is detached from the request path: a failed or slow mail
//! provider never turns a successful operation into a failed request.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::queries::ActivityStats;
use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Format a Unix timestamp as a human-readable date (e.g., "Jan 15, 2024")
fn format_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%b %d, %Y").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

/// Format an integer cent amount as "19.99 EUR".
fn format_amount(cents: i64, currency: &str) -> String {
    format!("{}.{:02} {}", cents / 100, (cents % 100).abs(), currency)
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Purchase confirmation to the buyer: license code + download link.
    LicenseIssued {
        email: String,
        customer_name: Option<String>,
        license_code: String,
        amount_paid_cents: i64,
        currency: String,
        purchased_at: i64,
    },
    /// Alert to the operator address that a claim was opened.
    ClaimCreated {
        claim_number: String,
        email: String,
        claim_type: String,
        subject: String,
        license_code: Option<String>,
    },
    /// Periodic aggregate to the operator address.
    DailySummary { stats: ActivityStats },
}

/// Result of attempting a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    WebhookCalled,
    Disabled,
    /// The message targets the operator address and none is configured.
    NoRecipient,
}

struct RenderedMessage {
    to: String,
    subject: String,
    text: String,
}

/// Resend API request body.
#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: &'a str,
}

/// Resend API response.
#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct Notifier {
    client: Client,
    api_key: Option<String>,
    from_email: String,
    webhook_url: Option<String>,
    operator_email: Option<String>,
    base_url: String,
}

impl Notifier {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.resend_api_key.clone(),
            from_email: config.email_from.clone(),
            webhook_url: config.notify_webhook_url.clone(),
            operator_email: config.operator_email.clone(),
            base_url: config.base_url.clone(),
        }
    }

    /// Hand a notification to a detached task. Never blocks the caller;
    /// failures are logged and dropped.
    pub fn dispatch(&self, notification: Notification) {
        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier.deliver(&notification).await {
                Ok(outcome) => {
                    tracing::debug!(?outcome, "notification handled");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "notification delivery failed");
                }
            }
        });
    }

    async fn deliver(&self, notification: &Notification) -> Result<SendOutcome> {
        // Webhook delivery forwards the structured payload as-is.
        if let Some(ref webhook_url) = self.webhook_url {
            return self.call_webhook(webhook_url, notification).await;
        }

        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!("no notification delivery configured, skipping");
            return Ok(SendOutcome::Disabled);
        };

        let Some(message) = self.render(notification) else {
            tracing::warn!("no operator email configured, dropping operator notification");
            return Ok(SendOutcome::NoRecipient);
        };

        self.send_via_resend(api_key, &message).await
    }

    fn render(&self, notification: &Notification) -> Option<RenderedMessage> {
        match notification {
            Notification::LicenseIssued {
                email,
                customer_name,
                license_code,
                amount_paid_cents,
                currency,
                purchased_at,
            } => {
                let greeting = customer_name.as_deref().unwrap_or("reader");
                let activation_link =
                    format!("{}/activate?code={}", self.base_url, license_code);
                Some(RenderedMessage {
                    to: email.clone(),
                    subject: "Your reading access is ready".to_string(),
                    text: format!(
                        "Hi {},\n\nThanks for your purchase of {} on {}.\n\nYour license code:\n\n    {}\n\nOpen this link on the device you want to read on:\n{}\n\nOr enter the code by hand in the app. Keep this email; the code is your proof of purchase.",
                        greeting,
                        format_amount(*amount_paid_cents, currency),
                        format_date(*purchased_at),
                        license_code,
                        activation_link
                    ),
                })
            }
            Notification::ClaimCreated {
                claim_number,
                email,
                claim_type,
                subject,
                license_code,
            } => Some(RenderedMessage {
                to: self.operator_email.clone()?,
                subject: format!("[{}] New support claim: {}", claim_number, subject),
                text: format!(
                    "Claim {} opened.\n\nFrom: {}\nType: {}\nLicense code: {}\nSubject: {}",
                    claim_number,
                    email,
                    claim_type,
                    license_code.as_deref().unwrap_or("(none given)"),
                    subject
                ),
            }),
            Notification::DailySummary { stats } => Some(RenderedMessage {
                to: self.operator_email.clone()?,
                subject: "Daily license activity".to_string(),
                text: format!(
                    "Activity since {}:\n\nLicenses issued: {}\nDevices activated: {}\nSupport claims opened: {}",
                    format_date(stats.window_start),
                    stats.licenses_issued,
                    stats.devices_activated,
                    stats.claims_opened
                ),
            }),
        }
    }

    async fn send_via_resend(
        &self,
        api_key: &str,
        message: &RenderedMessage,
    ) -> Result<SendOutcome> {
        let request = ResendEmailRequest {
            from: &self.from_email,
            to: vec![&message.to],
            subject: &message.subject,
            text: &message.text,
        };

        let response = self
            .client
            .post(RESEND_API_URL)
            .timeout(SEND_TIMEOUT)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("email service error: {}", e)))?;

        if response.status().is_success() {
            let _result: ResendEmailResponse = response
                .json()
                .await
                .map_err(|_| AppError::Internal("email service response error".into()))?;
            tracing::info!(to = %message.to, "notification sent via Resend");
            Ok(SendOutcome::Sent)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Internal(format!(
                "email service error: {} - {}",
                status, body
            )))
        }
    }

    async fn call_webhook(
        &self,
        webhook_url: &str,
        notification: &Notification,
    ) -> Result<SendOutcome> {
        let response = self
            .client
            .post(webhook_url)
            .timeout(SEND_TIMEOUT)
            .header("Content-Type", "application/json")
            .header("X-Readgate-Event", "notification")
            .json(notification)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("webhook call failed: {}", e)))?;

        if response.status().is_success() {
            tracing::info!(webhook_url = %webhook_url, "notification webhook called");
        } else {
            // Webhook errors shouldn't block anything; the dev can check
            // their webhook logs.
            let status = response.status();
            tracing::error!(status = %status, webhook_url = %webhook_url, "notification webhook returned error");
        }
        Ok(SendOutcome::WebhookCalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_kind_serialization() {
        let n = Notification::ClaimCreated {
            claim_number: "SUP-20240115-0042".to_string(),
            email: "reader@example.com".to_string(),
            claim_type: "device_limit".to_string(),
            subject: "Help".to_string(),
            license_code: None,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "claim_created");
        assert_eq!(json["claim_number"], "SUP-20240115-0042");
    }

    #[test]
    fn amount_formatting() {
        assert_eq!(format_amount(1999, "EUR"), "19.99 EUR");
        assert_eq!(format_amount(500, "USD"), "5.00 USD");
        assert_eq!(format_amount(100000, "JPY"), "1000.00 JPY");
    }
}
