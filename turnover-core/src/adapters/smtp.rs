//! SMTP mail sink - delivers a CSV export as an email attachment

use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpSettings;
use crate::domain::result::{Error, Result};
use crate::ports::MailSink;

/// Mail sink over a configured SMTP relay
///
/// One message per account-with-recipient, one CSV attachment each. Send
/// failures are surfaced as `Error::Email` so the orchestrator can treat
/// them as per-account, non-fatal conditions.
pub struct Mailer {
    settings: SmtpSettings,
}

impl Mailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

impl MailSink for Mailer {
    fn send_csv(&self, to: &str, subject: &str, file_path: &Path) -> Result<()> {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::email(format!("attachment has no file name: {file_path:?}")))?;
        let body = std::fs::read(file_path)?;

        let content_type = ContentType::parse("text/csv")
            .map_err(|e| Error::email(format!("invalid attachment content type: {e}")))?;
        let attachment = Attachment::new(file_name).body(body, content_type);

        let message = Message::builder()
            .from(
                self.settings
                    .username
                    .parse()
                    .map_err(|e| Error::email(format!("invalid sender address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| Error::email(format!("invalid recipient address {to:?}: {e}")))?)
            .subject(subject)
            .multipart(MultiPart::mixed().singlepart(attachment))
            .map_err(|e| Error::email(format!("failed to build message: {e}")))?;

        let builder = if self.settings.use_tls {
            SmtpTransport::starttls_relay(&self.settings.host)
                .map_err(|e| Error::email(format!("invalid SMTP relay: {e}")))?
        } else {
            SmtpTransport::builder_dangerous(&self.settings.host)
        };
        let transport = builder
            .port(self.settings.port)
            .credentials(Credentials::new(
                self.settings.username.clone(),
                self.settings.password.clone(),
            ))
            .build();

        transport
            .send(&message)
            .map_err(|e| Error::email(format!("send to {to} failed: {e}")))?;

        Ok(())
    }
}
