//! Mail store backends for captured messages

use crate::smtp::email::Email;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Storage for messages captured by the server.
///
/// Implementations must tolerate concurrent appends from session workers
/// together with concurrent reads from a controlling test thread.
pub trait MailStore: Send + Sync {
    /// Record a captured message
    fn add_message(&self, email: Email);

    /// Snapshot of all captured messages, in the order they finished parsing
    fn messages(&self) -> Vec<Email>;

    /// A single captured message, or `None` when the index is out of range
    fn message(&self, index: usize) -> Option<Email>;

    /// Number of captured messages
    fn email_count(&self) -> usize;

    /// Discard all captured messages
    fn clear_messages(&self);
}

/// In-memory store that keeps every captured message
#[derive(Debug, Default)]
pub struct MemoryMailStore {
    messages: Mutex<Vec<Email>>,
}

impl MemoryMailStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Email>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MailStore for MemoryMailStore {
    fn add_message(&self, email: Email) {
        self.lock().push(email);
    }

    fn messages(&self) -> Vec<Email> {
        self.lock().clone()
    }

    fn message(&self, index: usize) -> Option<Email> {
        self.lock().get(index).cloned()
    }

    fn email_count(&self) -> usize {
        self.lock().len()
    }

    fn clear_messages(&self) {
        self.lock().clear();
    }
}

/// Store that accepts every message and discards it
#[derive(Debug, Default)]
pub struct NullMailStore;

impl NullMailStore {
    /// Create a new null store
    pub fn new() -> Self {
        Self
    }
}

impl MailStore for NullMailStore {
    fn add_message(&self, _email: Email) {}

    fn messages(&self) -> Vec<Email> {
        Vec::new()
    }

    fn message(&self, _index: usize) -> Option<Email> {
        None
    }

    fn email_count(&self) -> usize {
        0
    }

    fn clear_messages(&self) {}
}
