// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Passcode delivery.

use std::time::Duration;

use async_trait::async_trait;
use idcheck_core::SmtpConfig;
use idcheck_core::error::IdCheckError;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

const SUBJECT: &str = "Your OTP Code";

/// Port on which the relay expects implicit TLS rather than STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_passcode(&self, to: &str, code: &str, ttl: Duration)
    -> Result<(), IdCheckError>;
}

fn passcode_body(code: &str, ttl: Duration) -> String {
    let minutes = (ttl.as_secs() / 60).max(1);
    format!("Your OTP is {code}. It will expire in {minutes} minutes.")
}

/// Sends passcodes through an authenticated SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, credentials: Credentials) -> Result<Self, IdCheckError> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|err| IdCheckError::Mail(format!("invalid sender address: {err}")))?;

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.relay)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.relay)
        }
        .map_err(|err| IdCheckError::Mail(err.to_string()))?;

        let transport = builder.port(config.port).credentials(credentials).build();
        info!(relay = %config.relay, port = config.port, "SMTP mailer initialised");
        Ok(Self { transport, sender })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_passcode(
        &self,
        to: &str,
        code: &str,
        ttl: Duration,
    ) -> Result<(), IdCheckError> {
        let recipient: Mailbox = to
            .parse()
            .map_err(|err| IdCheckError::Mail(format!("invalid recipient {to}: {err}")))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(passcode_body(code, ttl))
            .map_err(|err| IdCheckError::Mail(err.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|err| IdCheckError::Mail(err.to_string()))?;
        info!(recipient = to, "passcode mailed");
        Ok(())
    }
}

/// Writes passcodes to the log. Used when no SMTP relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_passcode(
        &self,
        to: &str,
        code: &str,
        ttl: Duration,
    ) -> Result<(), IdCheckError> {
        info!(recipient = to, body = %passcode_body(code, ttl), "passcode not mailed (no SMTP relay)");
        Ok(())
    }
}
