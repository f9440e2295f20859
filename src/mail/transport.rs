use std::io::Write;

use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::ExposeSecret;

use super::{MailError, Mailer, Message};
use crate::config::FeedOptions;

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SMTPS_PORT: u16 = 465;

/// Delivery through a local sendmail binary or an SMTP relay.
pub enum LettreMailer {
    Sendmail(AsyncSendmailTransport<Tokio1Executor>),
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
}

impl LettreMailer {
    /// Pick and configure the transport from the feed's options.
    pub fn from_options(options: &FeedOptions) -> Result<Self, MailError> {
        if !options.use_smtp {
            tracing::debug!(command = %options.sendmail, "Using sendmail transport");
            return Ok(Self::Sendmail(
                AsyncSendmailTransport::<Tokio1Executor>::new_with_command(&options.sendmail),
            ));
        }

        let default_port = if options.smtp_ssl {
            DEFAULT_SMTPS_PORT
        } else {
            DEFAULT_SMTP_PORT
        };
        let (host, port) = split_server(&options.smtp_server, default_port)?;

        let builder = if options.smtp_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?
        .port(port);

        let builder = if options.smtp_auth {
            builder.credentials(Credentials::new(
                options.smtp_username.clone(),
                options.smtp_password.expose_secret().to_string(),
            ))
        } else {
            builder
        };

        tracing::debug!(host, port, ssl = options.smtp_ssl, "Using SMTP transport");
        Ok(Self::Smtp(builder.build()))
    }
}

impl Mailer for LettreMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        let email = message.to_lettre()?;
        match self {
            Self::Sendmail(transport) => transport
                .send(email)
                .await
                .map_err(|e| MailError::Transport(e.to_string())),
            Self::Smtp(transport) => transport
                .send(email)
                .await
                .map(|_| ())
                .map_err(|e| MailError::Transport(e.to_string())),
        }
    }
}

/// Writes each message to stdout instead of delivering it.
#[derive(Debug, Default)]
pub struct StdoutMailer;

impl Mailer for StdoutMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        let raw = message.formatted()?;
        let mut out = std::io::stdout().lock();
        out.write_all(&raw)?;
        out.write_all(b"\n\n")?;
        out.flush()?;
        Ok(())
    }
}

/// Split `host[:port]`.
fn split_server(server: &str, default_port: u16) -> Result<(&str, u16), MailError> {
    let server = server.trim();
    match server.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => port
            .parse()
            .map(|port| (host, port))
            .map_err(|_| MailError::Server(server.to_string())),
        Some(_) => Err(MailError::Server(server.to_string())),
        None if server.is_empty() => Err(MailError::Server(server.to_string())),
        None => Ok((server, default_port)),
    }
}
