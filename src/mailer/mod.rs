//! SMTP submission behind a small trait so the delivery service can be
//! exercised without a live relay.

use async_trait::async_trait;
use lettre::transport::smtp::{self, authentication::Credentials};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use std::net::IpAddr;

use crate::config::{Config, SenderCredentials};

#[cfg(test)]
pub mod mock;

/// Reply codes a relay uses to refuse or require authentication.
const AUTH_FAILURE_CODES: [u16; 4] = [454, 530, 534, 535];

/// Reply codes a relay uses to turn the session away, normally as its greeting.
const SESSION_REFUSED_CODES: [u16; 2] = [421, 554];

#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    #[error("SMTP authentication failed: {0}")]
    Auth(String),

    #[error("Could not connect to SMTP relay: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    /// Opens a session, logs in with `credentials` and submits `message`.
    async fn send(
        &self,
        credentials: &SenderCredentials,
        message: Message,
    ) -> Result<(), MailError>;

    /// Opens a session and logs in without submitting anything.
    async fn verify(&self, credentials: &SenderCredentials) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    relay: String,
    port: u16,
    tls: bool,
}

impl SmtpMailer {
    /// Plaintext is honoured only for loopback relays; anything else keeps TLS.
    pub fn new(config: &Config) -> Self {
        let tls = if config.smtp_tls {
            true
        } else if is_loopback(&config.smtp_relay) {
            tracing::warn!(
                "SMTP TLS disabled, credentials go in plaintext to {}:{}",
                config.smtp_relay,
                config.smtp_port
            );
            false
        } else {
            tracing::warn!(
                "Ignoring smtp_tls = false for non-loopback relay '{}', using TLS",
                config.smtp_relay
            );
            true
        };

        Self {
            relay: config.smtp_relay.clone(),
            port: config.smtp_port,
            tls,
        }
    }

    fn transport(
        &self,
        credentials: &SenderCredentials,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let creds = Credentials::new(
            credentials.address.clone(),
            credentials.password.clone(),
        );

        let builder = if self.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.relay)
                .map_err(|e| MailError::Connect(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.relay)
        };

        Ok(builder.port(self.port).credentials(creds).build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        credentials: &SenderCredentials,
        message: Message,
    ) -> Result<(), MailError> {
        let mailer = self.transport(credentials)?;

        tracing::debug!("Submitting message via {}:{}", self.relay, self.port);

        mailer.send(message).await.map(|_| ()).map_err(classify)
    }

    async fn verify(&self, credentials: &SenderCredentials) -> Result<(), MailError> {
        let mailer = self.transport(credentials)?;

        match mailer.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MailError::Connect(
                "relay dropped the session after login".to_string(),
            )),
            Err(e) => Err(classify(e)),
        }
    }
}

fn is_loopback(relay: &str) -> bool {
    relay.eq_ignore_ascii_case("localhost")
        || relay
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

fn classify(err: smtp::Error) -> MailError {
    if let Some(code) = err.status() {
        let code = u16::from(code);
        if SESSION_REFUSED_CODES.contains(&code) {
            return MailError::Connect(err.to_string());
        }
        if AUTH_FAILURE_CODES.contains(&code) {
            return MailError::Auth(err.to_string());
        }
        return MailError::Other(err.to_string());
    }

    if err.is_timeout() || err.is_tls() || caused_by_io(&err) {
        return MailError::Connect(err.to_string());
    }

    MailError::Other(err.to_string())
}

fn caused_by_io(err: &smtp::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        if inner.is::<std::io::Error>() {
            return true;
        }
        source = inner.source();
    }
    false
}
