use crate::error::Result;
use crate::types::{InboundEmail, MailboxSession, OutboundEmail};
use async_trait::async_trait;

#[async_trait]
pub trait MailboxSource: Send + Sync {
    /// Authenticate and confirm the mailbox is reachable.
    async fn connect(&self) -> Result<MailboxSession>;

    /// Unread messages in listing order, capped at `limit` when given.
    async fn list_unread(
        &self,
        session: &MailboxSession,
        limit: Option<usize>,
    ) -> Result<Vec<InboundEmail>>;

    /// Flag a message so the next run does not pick it up again.
    async fn mark_processed(&self, session: &MailboxSession, message_id: &str) -> Result<()>;
}

/// A single delivery attempt. Retry lives in [`crate::ReplySender`].
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: &OutboundEmail) -> Result<()>;
}
