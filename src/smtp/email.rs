//! Captured email messages

use std::time::SystemTime;

/// One message accepted by the server.
///
/// Holds the envelope as the client gave it plus the raw mail data.
/// The data keeps header and body together; the accessors below do
/// just enough parsing for test assertions.
#[derive(Debug, Clone)]
pub struct Email {
    /// Envelope sender
    pub from: String,
    /// Envelope recipients
    pub recipients: Vec<String>,
    /// Raw mail data, headers and body, newline separated
    pub data: String,
    /// When the terminating dot arrived
    pub received_at: SystemTime,
}

impl Email {
    pub fn new(from: String, recipients: Vec<String>, data: String) -> Self {
        Self {
            from,
            recipients,
            data,
            received_at: SystemTime::now(),
        }
    }

    /// Look up a header value by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.data
            .lines()
            .take_while(|line| !line.is_empty())
            .find_map(|line| {
                let (field, value) = line.split_once(':')?;
                field
                    .eq_ignore_ascii_case(name)
                    .then(|| value.trim_start())
            })
    }

    /// Value of the Subject header, if the message has one.
    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    /// Everything after the first blank line.
    pub fn body(&self) -> Option<&str> {
        self.data.split_once("\n\n").map(|(_, body)| body)
    }

    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.recipients.iter().any(|addr| addr == recipient)
    }

    pub fn is_from(&self, sender: &str) -> bool {
        self.from == sender
    }

    /// Substring search over the raw data, headers included.
    pub fn contains(&self, text: &str) -> bool {
        self.data.contains(text)
    }

    /// Size of the raw data in bytes.
    pub fn data_size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(data: &str) -> Email {
        Email::new(
            "sender@example.com".to_owned(),
            vec!["recipient@example.com".to_owned()],
            data.to_owned(),
        )
    }

    #[test]
    fn test_new_email_keeps_envelope() {
        let email = sample("Subject: Test\n\nHello World");

        assert_eq!(email.from, "sender@example.com");
        assert_eq!(email.recipients, ["recipient@example.com"]);
        assert_eq!(email.data, "Subject: Test\n\nHello World");
        assert!(email.received_at <= SystemTime::now());
    }

    #[test]
    fn test_recipient_lookup() {
        let email = Email::new(
            "sender@example.com".to_owned(),
            vec!["user1@example.com".to_owned(), "user2@example.com".to_owned()],
            "Test email".to_owned(),
        );

        assert!(email.has_recipient("user1@example.com"));
        assert!(email.has_recipient("user2@example.com"));
        assert!(!email.has_recipient("user3@example.com"));
    }

    #[test]
    fn test_sender_lookup() {
        let email = sample("Test email");

        assert!(email.is_from("sender@example.com"));
        assert!(!email.is_from("other@example.com"));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let email = sample("Subject: Test Email\nX-Priority: 1\n\nHello World");

        assert_eq!(email.header("Subject"), Some("Test Email"));
        assert_eq!(email.header("subject"), Some("Test Email"));
        assert_eq!(email.header("X-PRIORITY"), Some("1"));
        assert_eq!(email.header("Missing"), None);
    }

    #[test]
    fn test_header_lookup_stops_at_body() {
        let email = sample("From: sender@example.com\n\nSubject: not a header");

        assert_eq!(email.header("Subject"), None);
    }

    #[test]
    fn test_subject_accessor() {
        let with_subject = sample("Subject: Test Email\nFrom: sender@example.com\n\nHello");
        assert_eq!(with_subject.subject(), Some("Test Email"));

        let without_subject = sample("From: sender@example.com\n\nHello");
        assert_eq!(without_subject.subject(), None);
    }

    #[test]
    fn test_body_starts_after_blank_line() {
        let email = sample("Subject: Test\n\nHello World\nSecond line");
        assert_eq!(email.body(), Some("Hello World\nSecond line"));

        // Headers only, no blank line
        let headers_only = sample("Subject: Test\nFrom: sender@example.com");
        assert_eq!(headers_only.body(), None);
    }

    #[test]
    fn test_contains_searches_everything() {
        let email = sample("Subject: Important Message\n\nThis is a test email");

        assert!(email.contains("Important"));
        assert!(email.contains("test email"));
        assert!(!email.contains("not found"));
    }

    #[test]
    fn test_data_size_in_bytes() {
        assert_eq!(sample("Hello").data_size(), 5);
    }
}
