//! Outbound notifications.
//!
//! Scheduled reports and the startup notice share one transport.

pub mod transport;

pub use transport::{ReportTransport, SmtpMailer};

use crate::error::DeliveryError;
use crate::report::{startup_subject, STARTUP_BODY};
use chrono::{DateTime, FixedOffset};
use tracing::info;

/// Send the "server started" notice.
///
/// Callers treat a failure here as fatal: a server whose mail path is broken
/// should not start accepting submissions.
pub async fn send_startup_notice<T>(
    transport: &T,
    now: &DateTime<FixedOffset>,
) -> Result<(), DeliveryError>
where
    T: ReportTransport + ?Sized,
{
    transport.send(&startup_subject(now), STARTUP_BODY).await?;
    info!("Startup notice sent");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;
    use chrono::TimeZone;

    fn start_time() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2026, 6, 14, 8, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_startup_notice_content() {
        let transport = RecordingTransport::new();
        send_startup_notice(&transport, &start_time()).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].subject,
            "Experiment Server Started: 2026-06-14T08:00:00+01:00"
        );
        assert_eq!(sent[0].html_body, "Server started");
    }

    #[tokio::test]
    async fn test_startup_notice_propagates_failure() {
        let transport = RecordingTransport::failing();
        let result = send_startup_notice(&transport, &start_time()).await;

        tokio_test::assert_err!(result);
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_shared_transport() {
        let transport = std::sync::Arc::new(RecordingTransport::new());
        tokio_test::assert_ok!(send_startup_notice(&transport, &start_time()).await);
        assert_eq!(transport.sent().len(), 1);
    }
}
