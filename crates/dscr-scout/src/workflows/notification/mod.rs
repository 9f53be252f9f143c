//! Digest delivery channels.

mod digest;

pub use digest::render_digest;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::workflows::domain::ListingRecord;
use crate::workflows::failure::{CollaboratorError, CollaboratorResult, ReasonCode};
use crate::workflows::http;
use crate::workflows::pipeline::{DigestNotifier, RunId};

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Logs the digest instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct DryRunNotifier;

#[async_trait]
impl DigestNotifier for DryRunNotifier {
    fn recipients(&self) -> String {
        "dry-run".to_string()
    }

    async fn send_digest(
        &self,
        listings: &[ListingRecord],
        run_id: &RunId,
    ) -> CollaboratorResult<bool> {
        info!(
            run_id = %run_id,
            count = listings.len(),
            "[dry-run] would send digest"
        );
        for line in render_digest(listings, run_id).lines() {
            info!(run_id = %run_id, "[dry-run] {line}");
        }
        Ok(true)
    }
}

/// Twilio account and WhatsApp sender/recipient numbers.
#[derive(Clone, PartialEq, Eq)]
pub struct WhatsAppChannel {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from: String,
    pub to: String,
}

impl std::fmt::Debug for WhatsAppChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppChannel")
            .field("base_url", &self.base_url)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_PREFIX) {
        number.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{number}")
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

/// Sends the digest as one WhatsApp message through the Twilio Messages API.
#[derive(Debug, Clone)]
pub struct WhatsAppNotifier {
    client: Client,
    channel: WhatsAppChannel,
}

impl WhatsAppNotifier {
    pub fn new(channel: WhatsAppChannel, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: http::build_client(timeout)?,
            channel,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.channel.base_url.trim_end_matches('/'),
            self.channel.account_sid
        )
    }
}

#[async_trait]
impl DigestNotifier for WhatsAppNotifier {
    fn recipients(&self) -> String {
        whatsapp_address(&self.channel.to)
    }

    async fn send_digest(
        &self,
        listings: &[ListingRecord],
        run_id: &RunId,
    ) -> CollaboratorResult<bool> {
        let body = render_digest(listings, run_id);
        let form = [
            ("From", whatsapp_address(&self.channel.from)),
            ("To", whatsapp_address(&self.channel.to)),
            ("Body", body),
        ];

        let notify_error = |detail: String| {
            error!(run_id = %run_id, error = %detail, "digest delivery failed");
            CollaboratorError::new(ReasonCode::Notify, detail)
        };

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.channel.account_sid, Some(&self.channel.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|err| notify_error(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(notify_error(format!("status {}: {}", status.as_u16(), detail.trim())));
        }

        let sid = response
            .json::<MessageResource>()
            .await
            .ok()
            .and_then(|message| message.sid)
            .unwrap_or_default();
        info!(run_id = %run_id, sid = %sid, count = listings.len(), "digest sent");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> WhatsAppChannel {
        WhatsAppChannel {
            base_url: "https://api.twilio.example/".to_string(),
            account_sid: "AC123".to_string(),
            auth_token: "token-value".to_string(),
            from: "+15550001".to_string(),
            to: "whatsapp:+15550100".to_string(),
        }
    }

    #[test]
    fn recipients_use_whatsapp_addresses() {
        let notifier = WhatsAppNotifier::new(channel(), Duration::from_secs(5)).expect("client");
        assert_eq!(notifier.recipients(), "whatsapp:+15550100");
        assert_eq!(whatsapp_address("+15550001"), "whatsapp:+15550001");
        assert_eq!(DryRunNotifier.recipients(), "dry-run");
    }

    #[test]
    fn messages_url_targets_account() {
        let notifier = WhatsAppNotifier::new(channel(), Duration::from_secs(5)).expect("client");
        assert_eq!(
            notifier.messages_url(),
            "https://api.twilio.example/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn debug_output_hides_token() {
        assert!(!format!("{:?}", channel()).contains("token-value"));
    }

    #[tokio::test]
    async fn dry_run_always_reports_delivery() {
        let sent = DryRunNotifier
            .send_digest(&[], &RunId("Run-1".to_string()))
            .await
            .expect("dry run succeeds");
        assert!(sent);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_notify_error() {
        let notifier = WhatsAppNotifier::new(
            WhatsAppChannel {
                base_url: "http://127.0.0.1:9".to_string(),
                ..channel()
            },
            Duration::from_millis(200),
        )
        .expect("client");
        let err = notifier
            .send_digest(&[], &RunId("Run-1".to_string()))
            .await
            .expect_err("nothing listening");
        assert_eq!(err.code, ReasonCode::Notify);
    }
}
