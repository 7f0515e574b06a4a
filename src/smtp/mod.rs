//! SMTP server implementation

pub mod commands;
pub mod config;
pub mod connection;
pub mod email;
pub mod error;
pub mod handler;
pub mod response;
pub mod server;
pub mod session;
pub mod store;

pub use commands::SmtpCommandHandler;
pub use config::ServerConfig;
pub use connection::Connection;
pub use email::Email;
pub use error::{SmtpError, SmtpLimits};
pub use handler::SessionHandler;
pub use response::SmtpResponse;
pub use server::{RunningServer, SmtpServer};
pub use session::{SmtpSession, SmtpState};
pub use store::{MailStore, MemoryMailStore, NullMailStore};
