use async_trait::async_trait;

use crate::error::AuthResult;

/// Trait for the outbound message channel. Implement this to integrate with
/// your delivery service (SMTP, SendGrid, SES, etc.).
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send a message.
    ///
    /// - `to`: recipient address
    /// - `subject`: subject line
    /// - `html`: HTML body (may be empty)
    /// - `text`: plain-text body (may be empty)
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> AuthResult<()>;
}

/// Development provider that writes messages to stderr instead of delivering
/// them. No external dependencies.
pub struct ConsoleEmailProvider;

#[async_trait]
impl EmailProvider for ConsoleEmailProvider {
    async fn send(&self, to: &str, subject: &str, _html: &str, text: &str) -> AuthResult<()> {
        eprintln!("[EMAIL] To: {to} | Subject: {subject} | Body: {text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingProvider {
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl EmailProvider for RecordingProvider {
        async fn send(&self, to: &str, subject: &str, _html: &str, _text: &str) -> AuthResult<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_console_provider_send() {
        let provider = ConsoleEmailProvider;
        provider
            .send("user@example.com", "Your code", "<p>123456</p>", "123456")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_provider_usable_as_trait_object() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let provider: Arc<dyn EmailProvider> = Arc::new(RecordingProvider { sent: sent.clone() });
        provider.send("a@b.com", "s1", "", "t").await.unwrap();
        provider.send("c@d.com", "s2", "", "t").await.unwrap();

        let messages = sent.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].0, "a@b.com");
        assert_eq!(messages[1].1, "s2");
    }
}
