//! Walkthrough of the mailsink API: start a server, submit mail over a
//! plain TCP client, then inspect what the store captured.

use mailsink::{MemoryMailStore, RunningServer, ServerConfig, SmtpServer};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

fn main() {
    println!("Mailsink Basic Usage Example");
    println!("============================");

    // An ephemeral port keeps the example runnable anywhere
    let config = ServerConfig::new().with_port(0);
    let server = Arc::new(SmtpServer::new("example.local", config));
    server.set_mail_store(Arc::new(MemoryMailStore::new()));

    let running = match RunningServer::start(server) {
        Ok(running) => running,
        Err(e) => {
            eprintln!("Server error: {e}");
            return;
        }
    };

    let Some(addr) = running.addr() else {
        eprintln!("Server has no listening address");
        return;
    };
    println!("Server started on {addr}");

    println!("\nSending a message to one recipient...");
    if let Err(e) = send_message(
        addr,
        "Test Email from Mailsink",
        &["recipient@example.com"],
        &["A first message to demonstrate capture."],
    ) {
        eprintln!("Failed to send email: {e}");
        return;
    }

    running.anticipate_message_count(1, 1000);
    match running.message(0) {
        Some(email) => {
            println!("\nCaptured:");
            println!("  From: {}", email.from);
            println!("  To: {:?}", email.recipients);
            println!("  Received at: {:?}", email.received_at);
            println!("  Data:");
            for line in email.data.lines() {
                println!("    {line}");
            }
        }
        None => {
            eprintln!("Timeout: no email captured within 1 second");
            return;
        }
    }

    println!("\nSending a message to two recipients...");
    if let Err(e) = send_message(
        addr,
        "Second Test Email",
        &["recipient@example.com", "another@example.com"],
        &["A second message, this one to multiple recipients."],
    ) {
        eprintln!("Failed to send email: {e}");
        return;
    }

    running.anticipate_message_count(2, 1000);
    let emails = running.messages();
    println!("\nCaptured {} email(s) total", emails.len());

    let for_recipient = emails
        .iter()
        .filter(|email| email.has_recipient("recipient@example.com"))
        .count();
    println!("Emails for recipient@example.com: {for_recipient}");

    let from_sender = emails
        .iter()
        .filter(|email| email.is_from("sender@example.com"))
        .count();
    println!("Emails from sender@example.com: {from_sender}");

    if let Err(e) = running.stop() {
        eprintln!("Server shutdown error: {e}");
    }
}

/// Submit one message over a raw TCP client, echoing each server reply.
fn send_message(
    addr: SocketAddr,
    subject: &str,
    recipients: &[&str],
    body: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = TcpStream::connect(addr)?;
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut greeting = String::new();
    reader.read_line(&mut greeting)?;
    print!("S: {greeting}");

    exchange(&mut stream, &mut reader, "HELO client.example.com")?;
    exchange(&mut stream, &mut reader, "MAIL FROM:<sender@example.com>")?;
    for recipient in recipients {
        exchange(&mut stream, &mut reader, &format!("RCPT TO:<{recipient}>"))?;
    }
    exchange(&mut stream, &mut reader, "DATA")?;

    // Mail data flows without per-line replies until the dot
    writeln!(stream, "From: sender@example.com")?;
    writeln!(stream, "To: {}", recipients.join(", "))?;
    writeln!(stream, "Subject: {subject}")?;
    writeln!(stream)?;
    for line in body {
        writeln!(stream, "{line}")?;
    }
    exchange(&mut stream, &mut reader, ".")?;

    exchange(&mut stream, &mut reader, "QUIT")?;
    Ok(())
}

/// Send one line and read the single-line reply it earns.
fn exchange(
    stream: &mut TcpStream,
    reader: &mut BufReader<TcpStream>,
    line: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    writeln!(stream, "{line}")?;
    let mut reply = String::new();
    reader.read_line(&mut reply)?;
    print!("S: {reply}");
    Ok(())
}
