use async_trait::async_trait;
use lettre::Message;

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use super::{MailError, Mailer};
use crate::config::SenderCredentials;

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub credentials: SenderCredentials,
    pub recipients: Vec<String>,
    pub raw: String,
}

/// Records every submission and answers with a fixed outcome.
pub struct MockMailer {
    outcome: Result<(), MailError>,
    sent: Mutex<Vec<SentMessage>>,
    verified: AtomicUsize,
}

impl MockMailer {
    pub fn succeeding() -> Self {
        Self {
            outcome: Ok(()),
            sent: Mutex::new(Vec::new()),
            verified: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: MailError) -> Self {
        Self {
            outcome: Err(err),
            sent: Mutex::new(Vec::new()),
            verified: AtomicUsize::new(0),
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn verified(&self) -> usize {
        self.verified.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(
        &self,
        credentials: &SenderCredentials,
        message: Message,
    ) -> Result<(), MailError> {
        let recipients = message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect();

        self.sent.lock().unwrap().push(SentMessage {
            credentials: credentials.clone(),
            recipients,
            raw: String::from_utf8_lossy(&message.formatted()).into_owned(),
        });

        self.outcome.clone()
    }

    async fn verify(&self, _credentials: &SenderCredentials) -> Result<(), MailError> {
        self.verified.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
