use mailsink::{MemoryMailStore, RunningServer, ServerConfig, SmtpServer};
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let port = args
        .get(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(2525);

    let hostname = if args.len() > 2 {
        args[2].as_str()
    } else {
        "mailsink.local"
    };

    println!("Starting Mailsink SMTP server...");
    println!("Port: {port}");
    println!("Hostname: {hostname}");

    let config = ServerConfig::from_env().with_port(port);
    let server = Arc::new(SmtpServer::new(hostname, config));
    server.set_mail_store(Arc::new(MemoryMailStore::new()));
    server.set_threaded(true);

    let running = match RunningServer::start(server) {
        Ok(running) => running,
        Err(e) => {
            eprintln!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    if let Some(addr) = running.addr() {
        println!("Listening on {addr}");
    }

    let mut seen = 0;
    loop {
        thread::sleep(Duration::from_secs(1));
        for email in running.messages().into_iter().skip(seen) {
            seen += 1;
            println!(
                "Received email #{} from: {} to: {:?}",
                seen, email.from, email.recipients
            );
            if let Some(subject) = email.subject() {
                println!("  Subject: {subject}");
            }
        }
    }
}
