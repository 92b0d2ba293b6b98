//! SMTP notifier using Lettre.

use crate::config::EmailConfig;
use ausflug_core::notify::{ConsoleNotifier, Notifier, NotifyError, OutgoingEmail, Recipient};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Sender and staff inbox.
#[derive(Clone, Debug)]
struct Addresses {
    from: Mailbox,
    staff: Mailbox,
}

impl Addresses {
    fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        Ok(Self {
            from: parse_mailbox(&config.from)?,
            staff: parse_mailbox(&config.admin)?,
        })
    }

    fn message(&self, email: &OutgoingEmail) -> Result<Message, NotifyError> {
        let to = match &email.to {
            Recipient::Customer(address) => parse_mailbox(address)?,
            Recipient::Staff => self.staff.clone(),
        };
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| NotifyError::InvalidMessage(format!("Failed to build email: {e}")))
    }
}

/// Sends plain-text e-mails over SMTP with STARTTLS.
#[derive(Clone)]
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    addresses: Addresses,
}

impl SmtpNotifier {
    /// Builds the notifier. Credentials are only used when a user name is set.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::InvalidMessage`] for unparseable sender or staff addresses
    /// and [`NotifyError::Transport`] if the relay cannot be set up.
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let addresses = Addresses::new(config)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Transport(format!("SMTP relay error: {e}")))?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            addresses,
        })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("Invalid address {address:?}: {e}")))
}

impl Notifier for SmtpNotifier {
    fn send(
        &self,
        email: OutgoingEmail,
    ) -> Pin<Box<dyn Future<Output = Result<(), NotifyError>> + Send + '_>> {
        Box::pin(async move {
            let message = self.addresses.message(&email)?;
            self.transport
                .send(message)
                .await
                .map_err(|e| NotifyError::Transport(format!("Failed to send email: {e}")))?;
            tracing::debug!(subject = %email.subject, "email sent");
            Ok(())
        })
    }
}

/// SMTP when a host is configured, the console notifier otherwise.
///
/// # Errors
///
/// Returns [`NotifyError`] if the SMTP notifier cannot be built.
pub fn build_notifier(config: &EmailConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    if config.smtp_enabled() {
        tracing::info!(host = %config.host, port = config.port, "using SMTP notifier");
        Ok(Arc::new(SmtpNotifier::new(config)?))
    } else {
        tracing::warn!("EMAIL_HOST not set; e-mails are logged instead of sent");
        Ok(Arc::new(ConsoleNotifier))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(host: &str) -> EmailConfig {
        EmailConfig {
            host: host.to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            from: "Ausflug Team <noreply@ausflugagypten.com>".to_string(),
            admin: "info@ausflugagypten.com".to_string(),
        }
    }

    #[test]
    fn staff_mail_goes_to_the_admin_inbox() {
        let addresses = Addresses::new(&config("smtp.example.com")).unwrap();
        let message = addresses
            .message(&OutgoingEmail {
                to: Recipient::Staff,
                subject: "New booking request AE-12345678".to_string(),
                body: "details".to_string(),
            })
            .unwrap();
        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 1);
        assert_eq!(envelope.to()[0].to_string(), "info@ausflugagypten.com");
        assert_eq!(
            envelope.from().map(ToString::to_string).as_deref(),
            Some("noreply@ausflugagypten.com")
        );
    }

    #[test]
    fn bad_customer_address_is_an_invalid_message() {
        let addresses = Addresses::new(&config("smtp.example.com")).unwrap();
        let result = addresses.message(&OutgoingEmail {
            to: Recipient::Customer("not an address".to_string()),
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        assert!(matches!(result, Err(NotifyError::InvalidMessage(_))));
    }

    #[test]
    fn bad_sender_is_rejected_up_front() {
        let mut config = config("smtp.example.com");
        config.from = "nobody".to_string();
        assert!(matches!(
            Addresses::new(&config),
            Err(NotifyError::InvalidMessage(_))
        ));
    }

    #[tokio::test]
    async fn console_notifier_without_host() {
        let notifier = build_notifier(&config("")).unwrap();
        notifier
            .send(OutgoingEmail {
                to: Recipient::Staff,
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .await
            .unwrap();
    }
}
