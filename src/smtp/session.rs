//! Per-connection protocol state

use crate::smtp::email::Email;
use crate::smtp::error::{SmtpError, SmtpLimits};

/// Where a session sits in the SMTP command sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum SmtpState {
    /// Connected, no HELO yet
    Initial,
    /// HELO accepted
    Greeted,
    /// MAIL FROM accepted
    SenderSet,
    /// One or more RCPT TO accepted
    RecipientsSet,
    /// Between DATA and the terminating dot
    ReadingData,
}

/// State for one client session.
///
/// Tracks the command sequence plus the envelope and data of the
/// transaction in progress. One transaction at a time; a completed or
/// aborted transaction returns the session to [`SmtpState::Greeted`].
#[derive(Debug)]
pub struct SmtpSession {
    pub state: SmtpState,
    /// Envelope sender from MAIL FROM
    pub from: Option<String>,
    /// Envelope recipients from RCPT TO
    pub recipients: Vec<String>,
    /// Domain the client announced in HELO
    pub client_domain: Option<String>,
    data: Vec<String>,
    data_size: usize,
}

impl SmtpSession {
    pub fn new() -> Self {
        Self {
            state: SmtpState::Initial,
            from: None,
            recipients: Vec::new(),
            client_domain: None,
            data: Vec::new(),
            data_size: 0,
        }
    }

    fn clear_transaction(&mut self) {
        self.from = None;
        self.recipients.clear();
        self.data.clear();
        self.data_size = 0;
    }

    /// Abort the transaction in progress. The HELO domain survives.
    pub fn reset(&mut self) {
        self.clear_transaction();
        self.state = SmtpState::Greeted;
    }

    /// Record the client's HELO domain and drop any open transaction.
    pub fn set_client_domain(&mut self, domain: String) -> Result<(), SmtpError> {
        if domain.len() > SmtpLimits::DOMAIN_MAX_LENGTH {
            return Err(SmtpError::DomainTooLong {
                max: SmtpLimits::DOMAIN_MAX_LENGTH,
            });
        }

        self.client_domain = Some(domain);
        self.reset();
        Ok(())
    }

    /// Begin a transaction with the given reverse-path.
    pub fn set_sender(&mut self, sender: String) -> Result<(), SmtpError> {
        if sender.len() > SmtpLimits::PATH_MAX_LENGTH {
            return Err(SmtpError::PathTooLong {
                max: SmtpLimits::PATH_MAX_LENGTH,
            });
        }

        self.clear_transaction();
        self.from = Some(sender);
        self.state = SmtpState::SenderSet;
        Ok(())
    }

    /// Add a forward-path to the transaction.
    pub fn add_recipient(&mut self, recipient: String) -> Result<(), SmtpError> {
        if recipient.len() > SmtpLimits::PATH_MAX_LENGTH {
            return Err(SmtpError::PathTooLong {
                max: SmtpLimits::PATH_MAX_LENGTH,
            });
        }

        if self.recipients.len() >= SmtpLimits::MAX_RECIPIENTS {
            return Err(SmtpError::TooManyRecipients {
                max: SmtpLimits::MAX_RECIPIENTS,
            });
        }

        self.recipients.push(recipient);
        self.state = SmtpState::RecipientsSet;
        Ok(())
    }

    /// Switch to data collection.
    pub fn start_data(&mut self) -> Result<(), SmtpError> {
        if self.state != SmtpState::RecipientsSet {
            return Err(SmtpError::InvalidState(
                "DATA requires at least one recipient".to_owned(),
            ));
        }

        self.data.clear();
        self.data_size = 0;
        self.state = SmtpState::ReadingData;
        Ok(())
    }

    pub fn is_reading_data(&self) -> bool {
        self.state == SmtpState::ReadingData
    }

    /// Append one line of mail data, enforcing the line and total limits.
    pub fn add_data_line(&mut self, line: String) -> Result<(), SmtpError> {
        // Count the CRLF the wire form carried
        let line_size = line.len() + 2;

        if line_size > SmtpLimits::TEXT_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::TEXT_LINE_MAX_LENGTH,
            });
        }

        if self.data_size + line_size > SmtpLimits::MAX_DATA_SIZE {
            return Err(SmtpError::TooMuchData {
                max: SmtpLimits::MAX_DATA_SIZE,
            });
        }

        self.data.push(line);
        self.data_size += line_size;
        Ok(())
    }

    /// Close the transaction and hand back the captured email.
    pub fn finish_data(&mut self) -> Result<Email, SmtpError> {
        if self.state != SmtpState::ReadingData {
            return Err(SmtpError::InvalidState("not collecting data".to_owned()));
        }

        if self.recipients.is_empty() {
            return Err(SmtpError::InvalidState(
                "transaction has no recipients".to_owned(),
            ));
        }

        let from = self
            .from
            .take()
            .ok_or_else(|| SmtpError::InvalidState("transaction has no sender".to_owned()))?;

        let email = Email::new(
            from,
            std::mem::take(&mut self.recipients),
            self.data.join("\n"),
        );

        self.data.clear();
        self.data_size = 0;
        self.state = SmtpState::Greeted;
        Ok(email)
    }

    /// Whether the command is acceptable in the current state.
    pub fn can_handle(&self, command: &str) -> bool {
        match command.to_uppercase().as_str() {
            #[cfg(feature = "ehlo")]
            "EHLO" => true,
            "HELO" | "NOOP" | "QUIT" => true,
            "MAIL" => self.state == SmtpState::Greeted,
            "RCPT" => matches!(self.state, SmtpState::SenderSet | SmtpState::RecipientsSet),
            "DATA" => self.state == SmtpState::RecipientsSet,
            "RSET" => self.state != SmtpState::Initial,
            _ => false,
        }
    }

    /// Bytes of mail data collected so far, CRLF counted per line.
    pub fn data_size(&self) -> usize {
        self.data_size
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}
