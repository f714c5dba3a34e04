use crate::{
    config::{Config, SenderCredentials},
    dto::{SendEbookRequest, SendEbookResponse},
    mailer::{MailError, Mailer},
};

use lettre::Message;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType};

use std::{io, sync::Arc};

pub const SUBJECT: &str = "Your Copy of Money Talk's 📘";
pub const BODY: &str = "Thanks for your interest! Here's your ebook attached.";
const EBOOK_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Email is required.")]
    MissingEmail,

    #[error("Recipient email cannot be empty.")]
    EmptyEmail,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Sender email or password is not configured")]
    Configuration,

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ebook file '{filename}' not found")]
    AttachmentMissing { filename: String },

    #[error("Could not read or attach ebook file: {0}")]
    Attachment(String),

    #[error("SMTP authentication failed: {0}")]
    MailAuth(String),

    #[error("Could not connect to SMTP server: {0}")]
    MailConnect(String),

    #[error("Unexpected error while sending email: {0}")]
    MailUnknown(String),
}

impl From<MailError> for DeliveryError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Auth(detail) => Self::MailAuth(detail),
            MailError::Connect(detail) => Self::MailConnect(detail),
            MailError::Other(detail) => Self::MailUnknown(detail),
        }
    }
}

pub struct DeliveryService {
    config: Config,
    mailer: Arc<dyn Mailer>,
}

impl DeliveryService {
    pub fn new(config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    /// Emails the ebook to the address in `request`. `None` stands for a
    /// payload that was absent or could not be decoded.
    pub async fn send_ebook(
        &self,
        request: Option<SendEbookRequest>,
    ) -> Result<SendEbookResponse, DeliveryError> {
        let credentials = self
            .config
            .sender_credentials()
            .ok_or(DeliveryError::Configuration)?;

        let recipient = recipient_from(request)?;
        let ebook = self.read_ebook().await?;
        let (from, to) = self.mailboxes(&credentials, &recipient).await?;
        let message = self.build_message(from, to, ebook)?;

        tracing::info!("Sending ebook to '{}'", recipient);

        self.mailer.send(&credentials, message).await?;

        tracing::info!("Ebook sent successfully to {}", recipient);

        Ok(SendEbookResponse::sent(&recipient))
    }

    async fn read_ebook(&self) -> Result<Vec<u8>, DeliveryError> {
        tokio::fs::read(&self.config.ebook_path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => DeliveryError::AttachmentMissing {
                    filename: self.config.ebook_filename(),
                },
                _ => DeliveryError::Attachment(format!(
                    "{}: {e}",
                    self.config.ebook_path.display()
                )),
            })
    }

    /// Parses both addresses. A parse failure is only reported once a relay
    /// session has been tried, so a login or connection problem takes
    /// precedence over a bad address, as it would on the wire.
    async fn mailboxes(
        &self,
        credentials: &SenderCredentials,
        recipient: &str,
    ) -> Result<(Mailbox, Mailbox), DeliveryError> {
        let parsed = credentials
            .address
            .parse::<Mailbox>()
            .map_err(|e| format!("invalid sender address '{}': {e}", credentials.address))
            .and_then(|from| {
                recipient
                    .parse::<Mailbox>()
                    .map(|to| (from, to))
                    .map_err(|e| format!("invalid recipient address '{recipient}': {e}"))
            });

        match parsed {
            Ok(mailboxes) => Ok(mailboxes),
            Err(detail) => {
                self.mailer.verify(credentials).await?;
                Err(DeliveryError::MailUnknown(detail))
            }
        }
    }

    fn build_message(
        &self,
        from: Mailbox,
        to: Mailbox,
        ebook: Vec<u8>,
    ) -> Result<Message, DeliveryError> {
        let content_type = ContentType::parse(EBOOK_CONTENT_TYPE)
            .map_err(|e| DeliveryError::Attachment(e.to_string()))?;
        let attachment = Attachment::new(self.config.ebook_filename()).body(ebook, content_type);

        Message::builder()
            .from(from)
            .to(to)
            .subject(SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(BODY.to_string()))
                    .singlepart(attachment),
            )
            .map_err(|e| DeliveryError::MailUnknown(e.to_string()))
    }
}

fn recipient_from(request: Option<SendEbookRequest>) -> Result<String, ValidationError> {
    match request.and_then(|r| r.email) {
        None => Err(ValidationError::MissingEmail),
        Some(None) => Err(ValidationError::EmptyEmail),
        Some(Some(email)) if email.is_empty() => Err(ValidationError::EmptyEmail),
        Some(Some(email)) => Ok(email),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mailer::mock::MockMailer;

    use std::{io::Write, path::PathBuf};

    fn config_with_ebook(path: PathBuf) -> Config {
        Config {
            sender: Some("books@example.com".to_string()),
            sender_password: Some("secret".to_string()),
            ebook_path: path,
            ..Config::default()
        }
    }

    fn ebook_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("MoneyTalks")
            .suffix(".pdf")
            .tempfile()
            .unwrap();
        file.write_all(b"%PDF-1.4 fake ebook").unwrap();
        file
    }

    fn request(email: &str) -> Option<SendEbookRequest> {
        Some(SendEbookRequest {
            email: Some(Some(email.to_string())),
        })
    }

    #[test]
    fn recipient_validation() {
        assert!(matches!(
            recipient_from(None),
            Err(ValidationError::MissingEmail)
        ));
        assert!(matches!(
            recipient_from(Some(SendEbookRequest::default())),
            Err(ValidationError::MissingEmail)
        ));
        assert!(matches!(
            recipient_from(request("")),
            Err(ValidationError::EmptyEmail)
        ));
        assert!(matches!(
            recipient_from(Some(SendEbookRequest { email: Some(None) })),
            Err(ValidationError::EmptyEmail)
        ));
        assert_eq!(recipient_from(request("a@b.c")).unwrap(), "a@b.c");
    }

    #[tokio::test]
    async fn message_carries_pdf_attachment() {
        let file = ebook_file();
        let mailer = Arc::new(MockMailer::succeeding());
        let service = DeliveryService::new(config_with_ebook(file.path().into()), mailer.clone());

        let response = service.send_ebook(request("reader@example.com")).await.unwrap();
        assert!(response.message.contains("reader@example.com"));

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        let delivery = &sent[0];
        assert_eq!(delivery.credentials.address, "books@example.com");
        assert_eq!(delivery.recipients, vec!["reader@example.com".to_string()]);
        assert!(delivery.raw.contains("From: books@example.com"));
        assert!(delivery.raw.contains("application/pdf"));
        assert!(delivery.raw.contains("MoneyTalks"));
        assert!(delivery.raw.contains(BODY));
    }

    #[tokio::test]
    async fn missing_ebook_skips_transport() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MockMailer::succeeding());
        let service = DeliveryService::new(
            config_with_ebook(dir.path().join("MoneyTalks.pdf")),
            mailer.clone(),
        );

        let err = service
            .send_ebook(request("reader@example.com"))
            .await
            .unwrap_err();

        assert!(
            matches!(&err, DeliveryError::AttachmentMissing { filename } if filename == "MoneyTalks.pdf")
        );
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn unreadable_ebook_is_an_attachment_error() {
        // A directory exists but cannot be read as a file
        let dir = tempfile::tempdir().unwrap();
        let mailer = Arc::new(MockMailer::succeeding());
        let service = DeliveryService::new(config_with_ebook(dir.path().into()), mailer.clone());

        let err = service
            .send_ebook(request("reader@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::Attachment(_)), "got {err:?}");
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn unparsable_recipient_is_reported_as_send_failure() {
        let file = ebook_file();
        let mailer = Arc::new(MockMailer::succeeding());
        let service = DeliveryService::new(config_with_ebook(file.path().into()), mailer.clone());

        let err = service.send_ebook(request("not an address")).await.unwrap_err();

        assert!(matches!(err, DeliveryError::MailUnknown(_)), "got {err:?}");
        assert_eq!(mailer.verified(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn login_failure_outranks_unparsable_recipient() {
        let file = ebook_file();
        let mailer = Arc::new(MockMailer::failing(MailError::Auth("535".into())));
        let service = DeliveryService::new(config_with_ebook(file.path().into()), mailer.clone());

        let err = service.send_ebook(request("not an address")).await.unwrap_err();

        assert!(matches!(err, DeliveryError::MailAuth(_)), "got {err:?}");
        assert_eq!(mailer.verified(), 1);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn transport_errors_keep_their_kind() {
        let file = ebook_file();

        for (failure, expected) in [
            (MailError::Auth("535".into()), "auth"),
            (MailError::Connect("refused".into()), "connect"),
            (MailError::Other("boom".into()), "unknown"),
        ] {
            let mailer = Arc::new(MockMailer::failing(failure));
            let service =
                DeliveryService::new(config_with_ebook(file.path().into()), mailer.clone());

            let err = service
                .send_ebook(request("reader@example.com"))
                .await
                .unwrap_err();

            let kind = match err {
                DeliveryError::MailAuth(_) => "auth",
                DeliveryError::MailConnect(_) => "connect",
                DeliveryError::MailUnknown(_) => "unknown",
                other => panic!("unexpected error {other:?}"),
            };
            assert_eq!(kind, expected);
            assert_eq!(mailer.sent().len(), 1);
        }
    }
}
