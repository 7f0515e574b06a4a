//! Error types for the SMTP server

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to bind listening socket: {0}")]
    Bind(std::io::Error),

    #[error("Server failed to start: {0}")]
    Startup(String),

    #[error("Syntax error, command unrecognized")]
    InvalidCommand,

    #[error("Bad sequence of commands: {0}")]
    InvalidState(String),

    #[error("Syntax error: {0}")]
    InvalidSyntax(String),

    #[error("Line too long (max {max} characters)")]
    LineTooLong { max: usize },

    #[error("Path too long (max {max} characters)")]
    PathTooLong { max: usize },

    #[error("Too many recipients (max {max})")]
    TooManyRecipients { max: usize },

    #[error("Too much mail data (max {max} bytes)")]
    TooMuchData { max: usize },

    #[error("Domain name too long (max {max} characters)")]
    DomainTooLong { max: usize },

    #[error("User name too long (max {max} characters)")]
    UserTooLong { max: usize },
}

/// Size limits from RFC 821 section 4.5.3
pub struct SmtpLimits;

impl SmtpLimits {
    /// User name part of an address
    pub const USER_MAX_LENGTH: usize = 64;

    /// Domain name part of an address
    pub const DOMAIN_MAX_LENGTH: usize = 64;

    /// Reverse-path or forward-path, angle brackets included
    pub const PATH_MAX_LENGTH: usize = 256;

    /// Command line, CRLF included
    pub const COMMAND_LINE_MAX_LENGTH: usize = 512;

    /// Reply line, CRLF included
    pub const REPLY_LINE_MAX_LENGTH: usize = 512;

    /// Text line of mail data, CRLF included
    pub const TEXT_LINE_MAX_LENGTH: usize = 1000;

    /// Recipients per transaction
    pub const MAX_RECIPIENTS: usize = 100;

    /// Total mail data per message. RFC 821 leaves this one open; 10 MB
    /// keeps an in-memory capture store bounded.
    pub const MAX_DATA_SIZE: usize = 10 * 1024 * 1024;
}
