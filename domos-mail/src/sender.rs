use crate::traits::MailTransport;
use crate::types::OutboundEmail;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReport {
    Delivered { attempts: u32 },
    Failed { attempts: u32, error: String },
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryReport::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryReport::Delivered { attempts } | DeliveryReport::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// One line of the delivery failure log.
#[derive(Debug, Serialize)]
struct FailureRecord<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
    error: &'a str,
    attempts: u32,
}

/// Sends replies with a fixed retry budget. Delivery failure is reported and logged,
/// never returned as an error.
pub struct ReplySender<T> {
    transport: T,
    from: String,
    policy: RetryPolicy,
    failure_log: PathBuf,
}

impl<T: MailTransport> ReplySender<T> {
    pub fn new(transport: T, from: impl Into<String>, failure_log: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            from: from.into(),
            policy: RetryPolicy::default(),
            failure_log: failure_log.into(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn failure_log(&self) -> &Path {
        &self.failure_log
    }

    /// Reply to `to` with `Re: <subject>`, copying `cc`.
    #[tracing::instrument(level = "info", skip_all, fields(to = %to, cc = %cc))]
    pub async fn send(&self, to: &str, subject: &str, body: &str, cc: &str) -> DeliveryReport {
        let message = OutboundEmail {
            from: self.from.clone(),
            to: to.to_string(),
            cc: Some(cc.to_string()).filter(|cc| !cc.trim().is_empty()),
            subject: format!("Re: {subject}"),
            body: body.to_string(),
        };

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.transport.deliver(&message).await {
                Ok(()) => {
                    tracing::info!(attempt, "reply delivered");
                    return DeliveryReport::Delivered { attempts: attempt };
                }
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(attempt, error = %e, "reply delivery attempt failed; retrying");
                    tokio::time::sleep(self.policy.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    let error = e.to_string();
                    tracing::error!(attempts = attempt, error = %error, "giving up on reply delivery");
                    let record = FailureRecord {
                        to,
                        subject,
                        body,
                        error: &error,
                        attempts: attempt,
                    };
                    if let Err(log_err) = append_failure(&self.failure_log, &record).await {
                        tracing::error!(
                            path = %self.failure_log.display(),
                            error = %log_err,
                            "failed to record delivery failure"
                        );
                    }
                    return DeliveryReport::Failed {
                        attempts: attempt,
                        error,
                    };
                }
            }
        }
    }
}

async fn append_failure(path: &Path, record: &FailureRecord<'_>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(record)?;
    line.push('\n');
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MailError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails the first `failures` attempts, then succeeds.
    struct Flaky {
        failures: u32,
        sent: Mutex<Vec<OutboundEmail>>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MailTransport for Flaky {
        async fn deliver(&self, message: &OutboundEmail) -> Result<()> {
            let mut sent = self.sent.lock().expect("lock");
            sent.push(message.clone());
            if sent.len() as u32 <= self.failures {
                return Err(MailError::Connection("smtp timeout".to_string()));
            }
            Ok(())
        }
    }

    fn no_delay() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn first_attempt_success_writes_no_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("send_failures.log");
        let sender = ReplySender::new(Flaky::new(0), "pm@example.com", &log).with_policy(no_delay());

        let report = sender
            .send("jane@example.com", "Leak", "We're on it.", "maintenance@propertymanager.com")
            .await;

        assert_eq!(report, DeliveryReport::Delivered { attempts: 1 });
        assert!(!log.exists());
        let sent = sender.transport.sent.lock().expect("lock");
        assert_eq!(sent[0].subject, "Re: Leak");
        assert_eq!(sent[0].from, "pm@example.com");
        assert_eq!(sent[0].cc.as_deref(), Some("maintenance@propertymanager.com"));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("send_failures.log");
        let sender = ReplySender::new(Flaky::new(2), "", &log).with_policy(no_delay());

        let report = sender.send("a@b.c", "Hi", "body", "ops@propertymanager.com").await;
        assert!(report.is_delivered());
        assert_eq!(report.attempts(), 3);
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn exhausted_retries_append_one_json_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("output").join("send_failures.log");
        let sender = ReplySender::new(Flaky::new(u32::MAX), "", &log).with_policy(no_delay());

        let report = sender.send("a@b.c", "Rent", "Thanks", "ops@propertymanager.com").await;
        assert!(!report.is_delivered());
        assert_eq!(report.attempts(), 3);
        assert_eq!(sender.transport.sent.lock().expect("lock").len(), 3);

        sender.send("d@e.f", "Second", "Again", "ops@propertymanager.com").await;

        let contents = std::fs::read_to_string(&log).expect("log written");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json line");
        assert_eq!(first["to"], "a@b.c");
        assert_eq!(first["subject"], "Rent");
        assert_eq!(first["body"], "Thanks");
        assert_eq!(first["attempts"], 3);
        assert!(
            first["error"]
                .as_str()
                .expect("error string")
                .contains("smtp timeout")
        );
    }

    #[tokio::test]
    async fn blank_cc_is_omitted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sender = ReplySender::new(Flaky::new(0), "", dir.path().join("f.log"))
            .with_policy(no_delay());
        sender.send("a@b.c", "Hi", "body", "  ").await;
        assert_eq!(sender.transport.sent.lock().expect("lock")[0].cc, None);
    }
}
