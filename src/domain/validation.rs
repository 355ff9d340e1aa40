use crate::domain::error::{TcpHexError, TcpHexResult};
use std::net::IpAddr;

/// Accept an IPv4/IPv6 literal, `localhost` or a dotted DNS name.
pub fn validate_host(host: &str) -> TcpHexResult<()> {
    let host = host.trim();
    if host.is_empty() {
        return Err(TcpHexError::MissingParameter("ipAddress"));
    }

    if host.parse::<IpAddr>().is_ok() || host.eq_ignore_ascii_case("localhost") || is_domain_name(host) {
        Ok(())
    } else {
        Err(TcpHexError::InvalidInput(format!(
            "Invalid IP address or hostname: {}",
            host
        )))
    }
}

/// Parse a port in 1..=65535.
pub fn validate_port(port: &str) -> TcpHexResult<u16> {
    let port = port.trim();
    if port.is_empty() {
        return Err(TcpHexError::MissingParameter("port"));
    }

    match port.parse::<u16>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(TcpHexError::InvalidInput(format!(
            "Invalid port: {} (must be 1-65535)",
            port
        ))),
    }
}

fn is_domain_name(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let (tld, rest) = match labels.split_last() {
        Some(parts) => parts,
        None => return false,
    };
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    rest.iter().all(|label| is_domain_label(label))
}

fn is_domain_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            label.len() <= 63
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}
