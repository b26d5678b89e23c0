//! Mailbox access for the Domos assistant.
//!
//! Pure I/O: pulls unread tenant mail out of a Gmail inbox and delivers replies, with
//! bounded retry and a local log of replies that could not be delivered.

mod error;
mod gmail;
mod mime;
mod sender;
mod traits;
mod types;

pub use error::{MailError, Result};
pub use gmail::GmailClient;
pub use mime::{decode_header_value, extract_email_address};
pub use sender::{DeliveryReport, ReplySender, RetryPolicy};
pub use traits::{MailTransport, MailboxSource};
pub use types::{InboundEmail, MailboxSession, OutboundEmail};
