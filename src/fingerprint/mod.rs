//! Client fingerprinting
//!
//! Turns a raw request (socket address plus headers) into the structured
//! client fields stored on every click. User-agent parsing is a best-effort
//! text heuristic: anything woothee cannot classify degrades to "Unknown"
//! rather than failing.

use axum::http::HeaderMap;
use std::net::IpAddr;
use woothee::parser::Parser;

pub const UNKNOWN: &str = "Unknown";

/// Structured technology fields derived from a raw request. Geography is
/// resolved separately by the geo lookup collaborator.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
    pub referrer: Option<String>,
    pub browser: String,
    pub device: String,
    pub operating_system: String,
}

/// Build a fingerprint from request headers and the socket address.
pub fn fingerprint(headers: &HeaderMap, socket_ip: IpAddr) -> ClientInfo {
    let ip_address = extract_client_ip(headers, socket_ip);

    let user_agent = header_str(headers, "user-agent").unwrap_or_default();
    let referrer = header_str(headers, "referer").filter(|r| !r.is_empty());

    let (browser, device, operating_system) = parse_user_agent(&user_agent);

    ClientInfo {
        ip_address,
        user_agent,
        referrer,
        browser,
        device,
        operating_system,
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Extract the client IP: first entry of `x-forwarded-for` when present,
/// otherwise the direct connection address.
pub fn extract_client_ip(headers: &HeaderMap, socket_ip: IpAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| socket_ip.to_string())
}

/// Map a raw user-agent string to `(browser, device, operating_system)`
/// labels. Unrecognized input resolves to "Unknown" on every axis.
pub fn parse_user_agent(user_agent: &str) -> (String, String, String) {
    let parser = Parser::new();

    let Some(result) = parser.parse(user_agent) else {
        return (UNKNOWN.to_string(), UNKNOWN.to_string(), UNKNOWN.to_string());
    };

    let browser = labeled(result.name, result.version);

    let device = match result.category {
        "pc" => "Desktop".to_string(),
        "smartphone" | "mobilephone" => "Mobile".to_string(),
        "tablet" => "Tablet".to_string(),
        "crawler" => "Bot".to_string(),
        _ => UNKNOWN.to_string(),
    };

    let operating_system = labeled(result.os, &result.os_version);

    (browser, device, operating_system)
}

/// Join a family and version into one label, dropping unknown parts.
fn labeled(family: &str, version: &str) -> String {
    if family.is_empty() || family == "UNKNOWN" {
        return UNKNOWN.to_string();
    }
    if version.is_empty() || version == "UNKNOWN" {
        family.to_string()
    } else {
        format!("{family} {version}")
    }
}
