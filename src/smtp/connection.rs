//! Client connection wrapper with line-buffered reads

use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::response::SmtpResponse;

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// How long a client may stay silent before its reads fail
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// One accepted client connection.
///
/// Owned by exactly one session handler; dropping it closes the transport.
#[derive(Debug)]
pub struct Connection {
    reader: BufReader<TcpStream>,
    stream: TcpStream,
}

impl Connection {
    /// Wrap an accepted stream, applying the default idle-read timeout
    pub fn new(stream: TcpStream) -> Result<Self, SmtpError> {
        Self::with_idle_timeout(stream, IDLE_TIMEOUT)
    }

    /// Wrap an accepted stream with a caller-chosen idle-read timeout
    pub fn with_idle_timeout(stream: TcpStream, timeout: Duration) -> Result<Self, SmtpError> {
        stream.set_read_timeout(Some(timeout))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { reader, stream })
    }

    /// Read one line without its trailing CRLF.
    ///
    /// Returns `Ok(None)` when the client closed the connection and an error
    /// when the idle timeout elapses or the read fails.
    pub fn read_line(&mut self) -> Result<Option<String>, SmtpError> {
        let mut buffer = Vec::new();
        if self.reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }

        let mut line = String::from_utf8_lossy(&buffer).into_owned();
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Write a response and flush it to the client
    pub fn write_response(&mut self, response: &SmtpResponse) -> Result<(), SmtpError> {
        let formatted = response.format();
        let fits = formatted
            .lines()
            .all(|line| line.len() + 2 <= SmtpLimits::REPLY_LINE_MAX_LENGTH);

        if fits {
            self.stream.write_all(formatted.as_bytes())?;
        } else {
            let truncated = SmtpResponse::new(response.code, "Response too long (truncated)");
            self.stream.write_all(truncated.format().as_bytes())?;
        }
        self.stream.flush()?;
        Ok(())
    }

    /// Address of the connected client, when still available
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Read};
    use std::net::TcpListener;

    fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn test_read_line_strips_crlf() {
        let (mut client, server) = socket_pair();
        let mut connection = Connection::new(server).unwrap();

        client.write_all(b"HELO client.local\r\n").unwrap();
        assert_eq!(
            connection.read_line().unwrap(),
            Some("HELO client.local".to_string())
        );

        client.write_all(b"NOOP\n").unwrap();
        assert_eq!(connection.read_line().unwrap(), Some("NOOP".to_string()));
    }

    #[test]
    fn test_read_line_preserves_inner_whitespace() {
        let (mut client, server) = socket_pair();
        let mut connection = Connection::new(server).unwrap();

        client.write_all(b"  leading and  inner  \r\n").unwrap();
        assert_eq!(
            connection.read_line().unwrap(),
            Some("  leading and  inner  ".to_string())
        );
    }

    #[test]
    fn test_read_line_handles_invalid_utf8() {
        let (mut client, server) = socket_pair();
        let mut connection = Connection::new(server).unwrap();

        client.write_all(&[0xFF, 0xFE, b'\r', b'\n']).unwrap();
        let line = connection.read_line().unwrap().unwrap();
        assert_eq!(line, "\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_read_line_none_on_close() {
        let (client, server) = socket_pair();
        let mut connection = Connection::new(server).unwrap();

        drop(client);
        assert_eq!(connection.read_line().unwrap(), None);
    }

    #[test]
    fn test_read_line_times_out() {
        let (_client, server) = socket_pair();
        let mut connection =
            Connection::with_idle_timeout(server, Duration::from_millis(50)).unwrap();

        // Client stays silent, so the read must fail instead of hanging
        assert!(connection.read_line().is_err());
    }

    #[test]
    fn test_write_response() {
        let (client, server) = socket_pair();
        let mut connection = Connection::new(server).unwrap();

        connection.write_response(&SmtpResponse::ok()).unwrap();
        drop(connection);

        let mut reader = BufReader::new(client);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "250 OK\r\n");
    }

    #[test]
    fn test_write_response_truncates_oversized_reply() {
        let (client, server) = socket_pair();
        let mut connection = Connection::new(server).unwrap();

        let oversized = SmtpResponse::new(250, &"a".repeat(SmtpLimits::REPLY_LINE_MAX_LENGTH));
        connection.write_response(&oversized).unwrap();
        drop(connection);

        let mut reply = String::new();
        let mut reader = BufReader::new(client);
        reader.read_to_string(&mut reply).unwrap();
        assert_eq!(reply, "250 Response too long (truncated)\r\n");
    }

    #[test]
    fn test_peer_addr() {
        let (client, server) = socket_pair();
        let connection = Connection::new(server).unwrap();

        assert_eq!(connection.peer_addr(), Some(client.local_addr().unwrap()));
    }
}
