//! # Mailsink
//!
//! Mailsink is an embedded SMTP server for testing.
//!
//! It captures everything submitted to it in a mail store, so email code can
//! be tested against a real socket without mocks and without delivering
//! anything.
//!
//! ## Quick Start
//!
//! ```rust
//! use mailsink::{MemoryMailStore, RunningServer, ServerConfig, SmtpServer};
//! use std::io::{BufRead, BufReader, Write};
//! use std::net::TcpStream;
//! use std::sync::Arc;
//!
//! // Create a server on an ephemeral port and start it on a background thread
//! let config = ServerConfig::new().with_port(0);
//! let server = Arc::new(SmtpServer::new("test.local", config));
//! server.set_mail_store(Arc::new(MemoryMailStore::new()));
//!
//! let running = RunningServer::start(server).unwrap();
//! let addr = running.addr().unwrap();
//!
//! // Application sends email to the server's address
//! let mut stream = TcpStream::connect(addr).unwrap();
//! let mut reader = BufReader::new(stream.try_clone().unwrap());
//! let mut reply = String::new();
//! reader.read_line(&mut reply).unwrap(); // 220 greeting
//!
//! for command in [
//!     "HELO client.local",
//!     "MAIL FROM:<hanako@example.com>",
//!     "RCPT TO:<tarou@example.com>",
//!     "DATA",
//! ] {
//!     writeln!(stream, "{command}\r").unwrap();
//!     reply.clear();
//!     reader.read_line(&mut reply).unwrap();
//! }
//!
//! for line in ["Subject: Greetings", "", "Hello from the quick start.", "."] {
//!     writeln!(stream, "{line}\r").unwrap();
//! }
//! reply.clear();
//! reader.read_line(&mut reply).unwrap(); // 250 OK
//!
//! // Check the contents of the captured email
//! running.anticipate_message_count(1, 2000);
//! let email = running.message(0).unwrap();
//! assert!(email.is_from("hanako@example.com"));
//! assert_eq!(email.subject(), Some("Greetings"));
//!
//! running.stop().unwrap();
//! ```
//!
//! ## Command set
//!
//! The server speaks the RFC 821 minimal implementation: `HELO`, `MAIL FROM`,
//! `RCPT TO` (repeatable within a transaction), `DATA`, `RSET`, `NOOP`, and
//! `QUIT`. With the `ehlo` cargo feature enabled it also answers `EHLO` with
//! a capability list.
//!
//! ## Scope
//!
//! This is a capture server, not a mail transfer agent:
//!
//! - messages live in memory and are never persisted or relayed
//! - no authentication
//! - no SSL/TLS
//!
//! ## Size limits
//!
//! RFC 821 section 4.5.3 limits are enforced: 64-character user and domain
//! names, 256-character paths, 512-character command lines, 1000-character
//! text lines, and 100 recipients per transaction. Total mail data is capped
//! at 10 MB per message.
//!
//! ## Email Handling
//!
//! Sessions append finished emails to the server's [`MailStore`]. The
//! default store discards everything; install a [`MemoryMailStore`] to keep
//! messages for inspection. Use `anticipate_message_count()` to wait for
//! in-flight deliveries with a bounded poll instead of a bare
//! `thread::sleep()`.

mod smtp;

pub use smtp::{
    Connection, Email, MailStore, MemoryMailStore, NullMailStore, RunningServer, ServerConfig,
    SessionHandler, SmtpCommandHandler, SmtpError, SmtpLimits, SmtpResponse, SmtpServer,
    SmtpSession, SmtpState,
};
