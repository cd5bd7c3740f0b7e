//! Alert delivery
//!
//! An [`Alert`] is built by the monitor when a host reaches its failure
//! threshold and handed to a [`Notifier`]. Delivery is fire-and-forget:
//! the monitor logs the outcome and moves on.

use crate::error::{Error, Result};
use crate::manifest::{MailConfig, TlsMode};
use chrono::{DateTime, Local};
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};

/// Timestamp format used in alert bodies
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A host that reached its consecutive-failure threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Host address
    pub address: String,
    /// Host label
    pub label: String,
    /// Threshold that was reached
    pub threshold: u32,
    /// When the threshold was reached
    pub timestamp: DateTime<Local>,
}

impl Alert {
    pub fn new(address: &str, label: &str, threshold: u32) -> Self {
        Self {
            address: address.to_string(),
            label: label.to_string(),
            threshold,
            timestamp: Local::now(),
        }
    }

    /// Mail subject line
    pub fn subject(&self) -> String {
        format!("Ping Failure Alert: {} ({})", self.address, self.label)
    }

    /// Plain-text mail body
    pub fn body(&self) -> String {
        format!(
            "The IP address {} ({}) has failed to respond to ping requests {} times in a row at {}.",
            self.address,
            self.label,
            self.threshold,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

impl std::fmt::Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) failed {} consecutive probes at {}",
            self.address,
            self.label,
            self.threshold,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

/// Something that can deliver an alert
pub trait Notifier {
    /// Attempt delivery once
    fn notify(&self, alert: &Alert) -> Result<()>;

    /// Human-readable description of where alerts go
    fn destination(&self) -> String;
}

/// Delivers alerts as mail through an SMTP relay
pub struct SmtpCourier {
    transport: SmtpTransport,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
}

impl SmtpCourier {
    /// Build a courier from config
    ///
    /// Addresses are parsed up front so a typo fails at startup rather than
    /// at the first alert.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let sender: Mailbox = config.sender.parse()?;
        let recipients = config
            .recipients
            .iter()
            .map(|r| r.parse::<Mailbox>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let builder = match config.tls {
            TlsMode::Required => SmtpTransport::starttls_relay(&config.relay)?,
            TlsMode::Opportunistic => {
                let params = TlsParameters::new(config.relay.clone())?;
                SmtpTransport::builder_dangerous(&config.relay).tls(Tls::Opportunistic(params))
            }
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(config.timeout_duration()));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            sender,
            recipients,
        })
    }

    /// Compose the mail for an alert
    ///
    /// The body goes out as plain 7bit text. lettre falls back to its own
    /// encoding when the text does not fit 7bit (non-ASCII labels).
    pub fn compose(&self, alert: &Alert) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.sender.clone())
            .subject(alert.subject())
            .header(ContentType::TEXT_PLAIN)
            .header(ContentTransferEncoding::SevenBit);

        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        Ok(builder.body(alert.body())?)
    }
}

impl Notifier for SmtpCourier {
    fn notify(&self, alert: &Alert) -> Result<()> {
        let message = self.compose(alert)?;
        self.transport.send(&message).map_err(Error::MailTransport)?;
        Ok(())
    }

    fn destination(&self) -> String {
        self.recipients
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn mail_config() -> MailConfig {
        toml::from_str(
            r#"
sender = "sender@example.com"
recipients = ["your@example.com", "someone@example.com"]
relay = "mail.example.com"
"#,
        )
        .unwrap()
    }

    fn fixed_alert() -> Alert {
        Alert {
            address: "10.0.0.5".into(),
            label: "db1".into(),
            threshold: 3,
            timestamp: Local.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap(),
        }
    }

    #[test]
    fn test_alert_subject_and_body() {
        let alert = fixed_alert();
        assert_eq!(alert.subject(), "Ping Failure Alert: 10.0.0.5 (db1)");
        assert_eq!(
            alert.body(),
            "The IP address 10.0.0.5 (db1) has failed to respond to ping requests 3 times in a row at 2024-03-01 14:05:09."
        );
    }

    #[test]
    fn test_alert_display() {
        assert_eq!(
            fixed_alert().to_string(),
            "10.0.0.5 (db1) failed 3 consecutive probes at 2024-03-01 14:05:09"
        );
    }

    #[test]
    fn test_courier_destination() {
        let courier = SmtpCourier::from_config(&mail_config()).unwrap();
        assert_eq!(courier.destination(), "your@example.com, someone@example.com");
    }

    #[test]
    fn test_compose_message() {
        let courier = SmtpCourier::from_config(&mail_config()).unwrap();
        let message = courier.compose(&fixed_alert()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: sender@example.com"));
        assert!(raw.contains("your@example.com"));
        assert!(raw.contains("someone@example.com"));
        assert!(raw.contains("Subject: Ping Failure Alert: 10.0.0.5 (db1)"));
        assert!(raw.contains("Content-Transfer-Encoding: 7bit"));
        assert!(raw.contains(&fixed_alert().body()));
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut config = mail_config();
        config.sender = "not an address".into();
        let err = SmtpCourier::from_config(&config).err().unwrap();
        assert!(matches!(err, Error::MailAddress(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_opportunistic_tls_builds() {
        let mut config = mail_config();
        config.tls = TlsMode::Opportunistic;
        config.username = Some("monitor".into());
        config.password = Some("secret".into());
        assert!(SmtpCourier::from_config(&config).is_ok());
    }
}
