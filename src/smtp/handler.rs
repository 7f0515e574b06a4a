//! Per-connection SMTP session driver

use crate::smtp::commands::SmtpCommandHandler;
use crate::smtp::connection::Connection;
use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::smtp::store::MailStore;

use std::sync::Arc;

/// Drives one SMTP session from greeting to disconnect.
///
/// The server hands each accepted connection to one of these; failures stay
/// inside the session and never reach the accept loop.
pub struct SessionHandler {
    connection: Connection,
    store: Arc<dyn MailStore>,
    hostname: String,
}

impl SessionHandler {
    /// Create a handler for one accepted connection
    pub fn new(connection: Connection, store: Arc<dyn MailStore>, hostname: &str) -> Self {
        Self {
            connection,
            store,
            hostname: hostname.to_owned(),
        }
    }

    /// Run the session to completion, logging any failure
    pub fn run(self) {
        let peer = self
            .connection
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown peer".to_owned());

        if let Err(e) = self.serve() {
            log::debug!("session with {peer} ended: {e}");
        }
    }

    fn serve(self) -> Result<(), SmtpError> {
        let Self {
            mut connection,
            store,
            hostname,
        } = self;

        let commands = SmtpCommandHandler::new(&hostname);
        let mut session = SmtpSession::new();

        connection.write_response(&SmtpResponse::greeting(&hostname))?;

        while let Some(line) = connection.read_line()? {
            // Data lines are taken verbatim, commands are trimmed
            if session.is_reading_data() {
                if let Some(response) = collect_data(&line, &mut session, store.as_ref()) {
                    connection.write_response(&response)?;
                }
                continue;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match commands.handle(line, &mut session) {
                Ok(response) => {
                    let done = response.code == 221;
                    connection.write_response(&response)?;
                    if done {
                        break;
                    }
                }
                Err(e) => connection.write_response(&SmtpResponse::for_error(&e))?,
            }
        }

        Ok(())
    }
}

/// Feed one line of DATA input to the session.
///
/// Returns the response to send, or `None` while more data is expected.
fn collect_data(
    line: &str,
    session: &mut SmtpSession,
    store: &dyn MailStore,
) -> Option<SmtpResponse> {
    if line == "." {
        return match session.finish_data() {
            Ok(email) => {
                store.add_message(email);
                Some(SmtpResponse::ok())
            }
            Err(e) => {
                session.reset();
                Some(SmtpResponse::for_error(&e))
            }
        };
    }

    // Strip the transparency dot (RFC 821 section 4.5.2)
    let unstuffed = line.strip_prefix('.').unwrap_or(line);
    match session.add_data_line(unstuffed.to_string()) {
        Ok(()) => None,
        Err(e) => {
            session.reset();
            Some(SmtpResponse::for_error(&e))
        }
    }
}
