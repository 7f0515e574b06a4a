//! SMTP wire responses

use crate::smtp::error::SmtpError;
#[cfg(feature = "ehlo")]
use crate::smtp::error::SmtpLimits;

/// A reply to send back to the client.
///
/// Carries the numeric code, the reply text, and any extra capability lines
/// for multiline replies.
#[derive(Debug, Clone)]
pub struct SmtpResponse {
    pub code: u16,
    pub message: String,
    pub extensions: Vec<String>,
}

impl SmtpResponse {
    /// Single-line reply
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            message: message.to_owned(),
            extensions: Vec::new(),
        }
    }

    /// Multiline reply; every line carries the same code
    pub fn with_extensions(code: u16, message: &str, extensions: Vec<String>) -> Self {
        Self {
            code,
            message: message.to_owned(),
            extensions,
        }
    }

    /// 250 OK
    pub fn ok() -> Self {
        Self::new(250, "OK")
    }

    /// 220 service greeting sent when a client connects
    pub fn greeting(hostname: &str) -> Self {
        Self::new(220, &format!("{hostname} Service ready"))
    }

    /// 250 HELO acknowledgement
    pub fn helo(hostname: &str, client_domain: &str) -> Self {
        Self::new(250, &format!("{hostname} Hello {client_domain}"))
    }

    /// 250 EHLO acknowledgement listing the supported capabilities
    #[cfg(feature = "ehlo")]
    pub fn ehlo(hostname: &str, client_domain: &str) -> Self {
        let capabilities = vec![
            "PIPELINING".to_owned(),
            format!("SIZE {}", SmtpLimits::MAX_DATA_SIZE),
        ];
        Self::with_extensions(250, &format!("{hostname} Hello {client_domain}"), capabilities)
    }

    /// 354 go-ahead after DATA
    pub fn data_start() -> Self {
        Self::new(354, "End data with <CR><LF>.<CR><LF>")
    }

    /// 221 closing reply to QUIT
    pub fn goodbye() -> Self {
        Self::new(221, "Bye")
    }

    /// The reply that reports an error to the client
    pub fn for_error(error: &SmtpError) -> Self {
        let code = match error {
            SmtpError::Io(_) | SmtpError::Bind(_) | SmtpError::Startup(_) => 421,
            SmtpError::InvalidCommand | SmtpError::LineTooLong { .. } => 500,
            SmtpError::InvalidSyntax(_)
            | SmtpError::PathTooLong { .. }
            | SmtpError::DomainTooLong { .. }
            | SmtpError::UserTooLong { .. } => 501,
            SmtpError::InvalidState(_) => 503,
            SmtpError::TooManyRecipients { .. } | SmtpError::TooMuchData { .. } => 552,
        };
        let message = match error {
            // Internal failures are not the client's business
            SmtpError::Io(_) | SmtpError::Bind(_) | SmtpError::Startup(_) => {
                "Service not available".to_owned()
            }
            _ => error.to_string(),
        };
        Self::new(code, &message)
    }

    /// Render the reply in wire format, CRLF terminated
    pub fn format(&self) -> String {
        if self.extensions.is_empty() {
            return format!("{} {}\r\n", self.code, self.message);
        }

        let mut wire = format!("{}-{}\r\n", self.code, self.message);
        for (i, line) in self.extensions.iter().enumerate() {
            // The last line switches from dash to space
            let separator = if i == self.extensions.len() - 1 { ' ' } else { '-' };
            wire.push_str(&format!("{}{}{}\r\n", self.code, separator, line));
        }
        wire
    }

    /// 2xx replies
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// 4xx and 5xx replies
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_replies() {
        let cases = [
            (SmtpResponse::ok(), 250, "OK"),
            (SmtpResponse::greeting("mail.local"), 220, "mail.local Service ready"),
            (
                SmtpResponse::helo("server.local", "client.local"),
                250,
                "server.local Hello client.local",
            ),
            (
                SmtpResponse::data_start(),
                354,
                "End data with <CR><LF>.<CR><LF>",
            ),
            (SmtpResponse::goodbye(), 221, "Bye"),
        ];

        for (response, code, message) in cases {
            assert_eq!(response.code, code);
            assert_eq!(response.message, message);
            assert!(response.extensions.is_empty());
        }
    }

    #[cfg(feature = "ehlo")]
    #[test]
    fn test_ehlo_reply_lists_capabilities() {
        let response = SmtpResponse::ehlo("server.local", "client.local");
        assert_eq!(response.code, 250);

        let formatted = response.format();
        assert!(formatted.starts_with("250-server.local Hello client.local\r\n"));
        assert!(formatted.contains("250-PIPELINING\r\n"));
        assert!(formatted.ends_with("250 SIZE 10485760\r\n"));
    }

    #[test]
    fn test_for_error_codes() {
        let cases = [
            (SmtpError::InvalidCommand, 500),
            (SmtpError::LineTooLong { max: 512 }, 500),
            (SmtpError::InvalidSyntax("bad".to_owned()), 501),
            (SmtpError::PathTooLong { max: 256 }, 501),
            (SmtpError::DomainTooLong { max: 64 }, 501),
            (SmtpError::UserTooLong { max: 64 }, 501),
            (SmtpError::InvalidState("MAIL first".to_owned()), 503),
            (SmtpError::TooManyRecipients { max: 100 }, 552),
            (SmtpError::TooMuchData { max: 10 }, 552),
        ];

        for (error, code) in cases {
            let response = SmtpResponse::for_error(&error);
            assert_eq!(response.code, code, "wrong code for {error}");
            assert_eq!(response.message, error.to_string());
        }
    }

    #[test]
    fn test_for_error_hides_io_details() {
        let error = SmtpError::Io(std::io::Error::other("boom"));
        let response = SmtpResponse::for_error(&error);
        assert_eq!(response.code, 421);
        assert_eq!(response.message, "Service not available");
    }

    #[test]
    fn test_single_line_format() {
        assert_eq!(SmtpResponse::ok().format(), "250 OK\r\n");
    }

    #[test]
    fn test_multiline_format() {
        let response = SmtpResponse::with_extensions(
            250,
            "Hello",
            vec!["PIPELINING".to_owned(), "SIZE 1000".to_owned()],
        );
        assert_eq!(
            response.format(),
            "250-Hello\r\n250-PIPELINING\r\n250 SIZE 1000\r\n"
        );
    }

    #[test]
    fn test_classification() {
        assert!(SmtpResponse::ok().is_success());
        assert!(!SmtpResponse::ok().is_error());

        let refused = SmtpResponse::new(421, "Service not available");
        assert!(refused.is_error());
        assert!(!refused.is_success());

        assert!(SmtpResponse::new(500, "Error").is_error());
        assert!(!SmtpResponse::new(500, "Error").is_success());
    }
}
