//! Mail delivery port

use std::path::Path;

use crate::domain::result::Result;

/// Mail delivery abstraction
///
/// One production implementation (SMTP); tests substitute a fake so the
/// non-fatal send-failure path can be exercised without a relay.
pub trait MailSink: Send + Sync {
    /// Send one CSV file as an attachment to one recipient
    fn send_csv(&self, to: &str, subject: &str, file_path: &Path) -> Result<()>;
}
