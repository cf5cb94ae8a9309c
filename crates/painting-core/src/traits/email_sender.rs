// # Email Sender Trait
//
// Defines the interface for delivering a rendered email through a
// transactional-email provider.
//
// ## Implementations
//
// - Resend: `painting-mail-resend` crate
//
// ## Usage
//
// ```rust,ignore
// use painting_core::traits::{EmailSender, OutgoingEmail};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let sender = /* EmailSender implementation */;
//
//     sender.send(&OutgoingEmail {
//         to: "borrower@example.com".to_string(),
//         subject: "Painting Loan Confirmation: Dunes".to_string(),
//         html: "<p>Hello</p>".to_string(),
//     }).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Provider acknowledgement of an accepted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Provider-assigned message id, when the provider returns one
    pub message_id: Option<String>,
}

/// Trait for email sender implementations
///
/// # Trust Level: Untrusted
///
/// Senders are external integrations and are kept single-shot:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/SMTP calls to their own endpoint
/// - ✅ Map provider responses to success or [`crate::Error`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by `NotificationEngine`)
/// - ❌ Decide whether a notification is due (owned by `NotificationEngine`)
/// - ❌ Read or write painting records (owned by `ItemStore`)
/// - ❌ Spawn tasks
///
/// A send that never returns stalls the sweep that issued it. Senders should
/// configure a request timeout on their client.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one message
    ///
    /// # Returns
    ///
    /// - `Ok(SendReceipt)`: The provider accepted the message
    /// - `Err(Error)`: Delivery failed; the engine logs it and moves on
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, crate::Error>;

    /// Get the sender name (for logging/debugging)
    fn sender_name(&self) -> &'static str;
}

/// Helper trait for constructing email senders from configuration
pub trait EmailSenderFactory: Send + Sync {
    /// Create an EmailSender instance from configuration
    fn create(
        &self,
        config: &crate::config::SenderConfig,
    ) -> Result<Box<dyn EmailSender>, crate::Error>;
}
