// # Resend Email Sender
//
// This crate provides an EmailSender for the Resend transactional email API.
//
// ## Behaviour
//
// - ✅ One HTTP request per message
// - ✅ Full error propagation to the engine (engine owns retries)
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error mapping for HTTP status codes (401, 403, 422, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (owned by NotificationEngine)
// - ❌ NO background tasks
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - API key MUST be provided via environment variables only
// - Sender MUST fail fast if the key is empty
//
// ## API Reference
//
// - Send email: POST `https://api.resend.com/emails`
//   body `{"from": "...", "to": ["..."], "subject": "...", "html": "..."}`,
//   response `{"id": "..."}`

use async_trait::async_trait;
use painting_core::config::SenderConfig;
use painting_core::traits::{EmailSender, EmailSenderFactory, OutgoingEmail, SendReceipt};
use painting_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resend API endpoint for sending a single email
const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable that switches the factory into dry-run mode
const MAIL_MODE_ENV: &str = "PAINTING_MAIL_MODE";

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Resend email sender
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot. Retries and scheduling are owned by
/// `NotificationEngine`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true the sender logs the message it would send and
/// returns a receipt without a message id. No request is made.
///
/// # Security
///
/// The Debug implementation does NOT expose the API key.
pub struct ResendSender {
    /// Resend API key
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Sender address, e.g. "Collection <loans@example.com>"
    from: String,

    /// Endpoint the request is posted to
    endpoint: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: log instead of sending
    dry_run: bool,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ResendSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendSender")
            .field("api_key", &"<REDACTED>")
            .field("from", &self.from)
            .field("endpoint", &self.endpoint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ResendSender {
    /// Create a new Resend sender
    ///
    /// # Parameters
    ///
    /// - `api_key`: Resend API key
    /// - `from`: Sender address shown to recipients
    /// - `dry_run`: If true, log messages instead of sending them
    ///
    /// # Errors
    ///
    /// - `Error::Config`: Empty key or sender address
    /// - `Error::Http`: The HTTP client could not be built
    pub fn new(api_key: impl Into<String>, from: impl Into<String>, dry_run: bool) -> Result<Self> {
        let api_key = api_key.into();
        let from = from.into();

        if api_key.is_empty() {
            return Err(Error::config("Resend API key cannot be empty"));
        }
        if from.trim().is_empty() {
            return Err(Error::config("Resend sender address cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            from,
            endpoint: RESEND_EMAILS_URL.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a sender in live mode
    pub fn new_live(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self> {
        Self::new(api_key, from, false)
    }

    /// Create a sender in dry-run mode
    pub fn new_dry_run(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self> {
        Self::new(api_key, from, true)
    }

    /// Post to a different endpoint (for proxies and tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Whether this sender only logs
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Map a non-success Resend response to an error
fn status_error(status: u16, body: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid Resend API key or sender domain not verified. Status: {}",
            status
        )),
        422 => Error::invalid_input(format!("Resend rejected the message: {}", body)),
        429 => Error::rate_limited(format!("Resend rate limit exceeded. Status: {}", status)),
        500..=599 => Error::sender(
            "resend",
            format!("Resend server error (transient): {} - {}", status, body),
        ),
        _ => Error::sender("resend", format!("Send failed: {} - {}", status, body)),
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt> {
        if email.to.trim().is_empty() {
            return Err(Error::invalid_input("Recipient address is empty"));
        }

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send email from {} to {} with subject {:?} ({} bytes of HTML)",
                self.from,
                email.to,
                email.subject,
                email.html.len()
            );
            return Ok(SendReceipt { message_id: None });
        }

        tracing::debug!("Sending email to {} via Resend", email.to);

        let request = SendEmailRequest {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::sender("resend", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        let body: SendEmailResponse = response
            .json()
            .await
            .map_err(|e| Error::sender("resend", format!("Failed to parse response: {}", e)))?;

        Ok(SendReceipt { message_id: body.id })
    }

    fn sender_name(&self) -> &'static str {
        "resend"
    }
}

/// Factory for the `resend` sender type
pub struct ResendFactory;

impl EmailSenderFactory for ResendFactory {
    fn create(&self, config: &SenderConfig) -> Result<Box<dyn EmailSender>> {
        match config {
            SenderConfig::Resend { api_key, from } => {
                if api_key.is_empty() {
                    return Err(Error::config("Resend API key is required"));
                }

                let dry_run = std::env::var(MAIL_MODE_ENV)
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!("Resend sender running in DRY-RUN mode - no emails will be sent");
                }

                Ok(Box::new(ResendSender::new(api_key.clone(), from.clone(), dry_run)?))
            }
            _ => Err(Error::config("Invalid config for Resend sender")),
        }
    }
}

/// Register the Resend sender with a registry
///
/// # Example
///
/// ```rust
/// use painting_core::ComponentRegistry;
///
/// let registry = ComponentRegistry::new();
/// painting_mail_resend::register(&registry);
/// assert!(registry.has_sender("resend"));
/// ```
pub fn register(registry: &painting_core::ComponentRegistry) {
    registry.register_sender("resend", Box::new(ResendFactory));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "ann@example.com".to_string(),
            subject: "Painting Loan Confirmation: Dunes".to_string(),
            html: "<p>Hello</p>".to_string(),
        }
    }

    /// Serve one canned HTTP response and hand back the raw request
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/emails", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(split) = text.find("\r\n\r\n") {
                    let content_length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + content_length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&raw).to_string()
        });

        (url, handle)
    }

    #[test]
    fn test_factory_creation() {
        let config = SenderConfig::Resend {
            api_key: "re_test".to_string(),
            from: "onboarding@resend.dev".to_string(),
        };
        let sender = ResendFactory.create(&config).unwrap();
        assert_eq!(sender.sender_name(), "resend");
    }

    #[test]
    fn test_factory_missing_key() {
        let config = SenderConfig::Resend {
            api_key: String::new(),
            from: "onboarding@resend.dev".to_string(),
        };
        assert!(ResendFactory.create(&config).is_err());
        assert!(ResendFactory.create(&SenderConfig::Disabled).is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = ResendSender::new("", "a@b.c", false).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let sender = ResendSender::new_live("re_secret_12345", "a@b.c").unwrap();
        let debug_str = format!("{:?}", sender);
        assert!(!debug_str.contains("re_secret_12345"));
        assert!(debug_str.contains("ResendSender"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(status_error(401, ""), Error::Authentication(_)));
        assert!(matches!(status_error(403, ""), Error::Authentication(_)));
        assert!(matches!(status_error(422, "bad to"), Error::InvalidInput(m) if m.contains("bad to")));
        assert!(matches!(status_error(429, ""), Error::RateLimited(_)));
        assert!(matches!(status_error(503, "down"), Error::Sender { message, .. } if message.contains("transient")));
        assert!(matches!(status_error(404, ""), Error::Sender { .. }));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_send() {
        let sender = ResendSender::new_dry_run("re_test", "a@b.c")
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/unreachable");
        assert!(sender.is_dry_run());
        let receipt = sender.send(&email()).await.unwrap();
        assert_eq!(receipt.message_id, None);
    }

    #[tokio::test]
    async fn test_send_posts_json_with_bearer_auth() {
        let (url, server) = one_shot_server("HTTP/1.1 200 OK", r#"{"id":"49a3999c-0ce1"}"#).await;
        let sender = ResendSender::new_live("re_test_key", "Collection <loans@example.com>")
            .unwrap()
            .with_endpoint(url);

        let receipt = sender.send(&email()).await.unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("49a3999c-0ce1"));

        let request = server.await.unwrap();
        let lower = request.to_lowercase();
        assert!(request.starts_with("POST /emails"));
        assert!(lower.contains("authorization: bearer re_test_key"));
        assert!(request.contains(r#""to":["ann@example.com"]"#));
        assert!(request.contains(r#""from":"Collection <loans@example.com>""#));
        assert!(request.contains(r#""subject":"Painting Loan Confirmation: Dunes""#));
    }

    #[tokio::test]
    async fn test_send_maps_rate_limit() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 429 Too Many Requests",
            r#"{"name":"rate_limit_exceeded"}"#,
        )
        .await;
        let sender = ResendSender::new_live("re_test_key", "a@b.c").unwrap().with_endpoint(url);

        let err = sender.send(&email()).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_recipient_rejected() {
        let sender = ResendSender::new_dry_run("re_test", "a@b.c").unwrap();
        let mut message = email();
        message.to = " ".to_string();
        assert!(matches!(sender.send(&message).await.unwrap_err(), Error::InvalidInput(_)));
    }
}
