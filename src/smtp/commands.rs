//! Command parsing and dispatch

use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

/// Maps command lines to state changes and replies.
///
/// Borrows the server hostname for greeting text; one handler serves a
/// whole session.
#[derive(Debug)]
pub struct SmtpCommandHandler<'a> {
    hostname: &'a str,
}

impl<'a> SmtpCommandHandler<'a> {
    pub fn new(hostname: &'a str) -> Self {
        Self { hostname }
    }

    /// Run one command line against the session.
    pub fn handle(
        &self,
        line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if line.len() > SmtpLimits::COMMAND_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
            });
        }

        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };

        match verb.to_uppercase().as_str() {
            "HELO" => self.helo(arg, session),
            #[cfg(feature = "ehlo")]
            "EHLO" => self.ehlo(arg, session),
            "MAIL" => self.mail(arg, session),
            "RCPT" => self.rcpt(arg, session),
            "DATA" => self.data(arg, session),
            "RSET" => self.rset(session),
            "NOOP" => Ok(SmtpResponse::ok()),
            "QUIT" => Ok(SmtpResponse::goodbye()),
            _ => Err(SmtpError::InvalidCommand),
        }
    }

    fn helo(&self, arg: &str, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        let domain = client_domain("HELO", arg)?;
        session.set_client_domain(domain.to_owned())?;
        Ok(SmtpResponse::helo(self.hostname, domain))
    }

    #[cfg(feature = "ehlo")]
    fn ehlo(&self, arg: &str, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        let domain = client_domain("EHLO", arg)?;
        session.set_client_domain(domain.to_owned())?;
        Ok(SmtpResponse::ehlo(self.hostname, domain))
    }

    fn mail(&self, arg: &str, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        if !session.can_handle("MAIL") {
            return Err(SmtpError::InvalidState("MAIL requires HELO first".to_owned()));
        }

        let addr = parse_path(arg, "FROM:")?;
        validate_address(&addr)?;
        session.set_sender(addr)?;

        Ok(SmtpResponse::ok())
    }

    fn rcpt(&self, arg: &str, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        if !session.can_handle("RCPT") {
            return Err(SmtpError::InvalidState("RCPT requires MAIL first".to_owned()));
        }

        let addr = parse_path(arg, "TO:")?;
        validate_address(&addr)?;
        session.add_recipient(addr)?;

        Ok(SmtpResponse::ok())
    }

    fn data(&self, arg: &str, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        if !session.can_handle("DATA") {
            return Err(SmtpError::InvalidState("DATA requires RCPT first".to_owned()));
        }

        if !arg.is_empty() {
            return Err(SmtpError::InvalidSyntax("DATA takes no argument".to_owned()));
        }

        session.start_data()?;
        Ok(SmtpResponse::data_start())
    }

    fn rset(&self, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        if !session.can_handle("RSET") {
            return Err(SmtpError::InvalidState("RSET requires HELO first".to_owned()));
        }

        session.reset();
        Ok(SmtpResponse::ok())
    }
}

/// First word of a HELO or EHLO argument.
fn client_domain<'b>(verb: &str, arg: &'b str) -> Result<&'b str, SmtpError> {
    arg.split_whitespace()
        .next()
        .ok_or_else(|| SmtpError::InvalidSyntax(format!("{verb} requires a domain argument")))
}

/// Pull the address out of a `FROM:<addr>` or `TO:<addr>` argument.
/// The tag is matched case-insensitively and a space may follow it.
fn parse_path(arg: &str, tag: &str) -> Result<String, SmtpError> {
    let tagged = arg
        .get(..tag.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(tag));
    if !tagged {
        return Err(SmtpError::InvalidSyntax(format!("Expected {tag}<address>")));
    }

    let path = arg[tag.len()..].trim();
    let addr = path
        .strip_prefix('<')
        .and_then(|p| p.strip_suffix('>'))
        .ok_or_else(|| {
            SmtpError::InvalidSyntax("Expected address in angle brackets".to_owned())
        })?;

    if addr.is_empty() {
        return Err(SmtpError::InvalidSyntax("Empty address path".to_owned()));
    }

    Ok(addr.to_owned())
}

/// Check the user@domain shape and the per-part length limits.
fn validate_address(addr: &str) -> Result<(), SmtpError> {
    let (user, domain) = addr
        .split_once('@')
        .filter(|(user, domain)| !user.is_empty() && !domain.is_empty())
        .ok_or_else(|| {
            SmtpError::InvalidSyntax("Address must have user@domain form".to_owned())
        })?;

    if user.len() > SmtpLimits::USER_MAX_LENGTH {
        return Err(SmtpError::UserTooLong {
            max: SmtpLimits::USER_MAX_LENGTH,
        });
    }

    if domain.len() > SmtpLimits::DOMAIN_MAX_LENGTH {
        return Err(SmtpError::DomainTooLong {
            max: SmtpLimits::DOMAIN_MAX_LENGTH,
        });
    }

    Ok(())
}
