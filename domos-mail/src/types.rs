/// An authenticated mailbox, as confirmed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxSession {
    pub email_address: String,
}

/// One unread message, already decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEmail {
    pub id: String,
    /// Raw `From` header.
    pub from: String,
    /// Bare address extracted from `from`.
    pub sender_address: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub body: String,
}
