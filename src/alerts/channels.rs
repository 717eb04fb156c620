//! Alert notification channels
//!
//! Channels are fire-and-forget: the engine calls [`AlertChannel::send`] once
//! per alert and only logs the outcome.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::{AlertingConfig, EmailConfig, SlackConfig};
use crate::util::HTTP_TIMEOUT;

pub const EMAIL_SUBJECT: &str = "Linux Resource Alert";

#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, message: &str) -> Result<()>;
}

/// Email, chat webhook and log channels, in that order, for every enabled entry.
pub fn build_channels(config: &AlertingConfig, client: &Client) -> Result<Vec<Box<dyn AlertChannel>>> {
    let mut channels: Vec<Box<dyn AlertChannel>> = vec![];

    if let Some(email) = &config.email
        && email.enabled
    {
        channels.push(Box::new(EmailChannel::new(email)?));
    }

    if let Some(slack) = &config.slack
        && slack.enabled
    {
        channels.push(Box::new(WebhookChannel::new(client.clone(), slack)));
    }

    if config.log.enabled {
        channels.push(Box::new(LogChannel));
    }

    Ok(channels)
}

/// Writes the alert to the process log at `WARN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl AlertChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &str) -> Result<()> {
        warn!(event = "alert", "{message}");
        Ok(())
    }
}

/// Chat webhook (Slack incoming-webhook format): `POST {"text": message}`.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(client: Client, config: &SlackConfig) -> Self {
        Self {
            client,
            url: config.webhook_url.clone(),
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn name(&self) -> &str {
        "slack"
    }

    #[instrument(skip_all)]
    async fn send(&self, message: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .timeout(HTTP_TIMEOUT)
            .json(&json!({ "text": message }))
            .send()
            .await
            .context("failed to send webhook alert")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("webhook alert failed with status {status}: {body}");
        }

        info!("successfully sent webhook alert");
        Ok(())
    }
}

/// SMTP mail using STARTTLS and login credentials.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .with_context(|| format!("invalid SMTP server `{}`", config.smtp_server))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(HTTP_TIMEOUT * 2))
            .build();

        let from = config
            .sender()
            .parse()
            .with_context(|| format!("invalid sender address `{}`", config.sender()))?;
        let to = config
            .to
            .parse()
            .with_context(|| format!("invalid recipient address `{}`", config.to))?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip_all)]
    async fn send(&self, message: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(EMAIL_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .context("failed to build alert email")?;

        self.transport
            .send(email)
            .await
            .context("failed to send email alert")?;

        info!("successfully sent email alert");
        Ok(())
    }
}
