//! Mail composition and delivery.
//!
//! [`Message`] is the backend-neutral mail the entry pipeline produces.
//! [`Mailer`] is the delivery seam: [`LettreMailer`] hands messages to
//! sendmail or an SMTP relay, [`StdoutMailer`] prints them.

mod message;
mod transport;

use std::future::Future;

use thiserror::Error;

pub use message::{BodyType, Headers, Message};
pub use transport::{LettreMailer, StdoutMailer};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address {0}")]
    Address(String),

    #[error("Invalid header name '{0}'")]
    Header(String),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Invalid SMTP server '{0}'")]
    Server(String),

    #[error("Delivery failed: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Delivers composed messages.
pub trait Mailer {
    fn send(&self, message: &Message) -> impl Future<Output = Result<(), MailError>> + Send;
}
