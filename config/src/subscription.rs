use std::io;
use std::io::Read;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::node::{Node, Nodes, Ping, Protocol};

const STANDARD_ENGINE: base64::engine::fast_portable::FastPortable =
    base64::engine::fast_portable::FastPortable::from(
        &base64::alphabet::STANDARD,
        base64::engine::fast_portable::FastPortableConfig::new()
            .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent),
    );

const URL_SAFE_ENGINE: base64::engine::fast_portable::FastPortable =
    base64::engine::fast_portable::FastPortable::from(
        &base64::alphabet::URL_SAFE,
        base64::engine::fast_portable::FastPortableConfig::new()
            .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent),
    );

/// The subscription blob is not valid base64 in either alphabet.
#[derive(Debug, Error)]
#[error("invalid subscription encoding: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);

/// One subscription entry that could not be turned into a node.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{entry}: {reason}")]
pub struct ParseError {
    pub entry: String,
    pub reason: String,
}

impl ParseError {
    fn new(entry: &str, reason: impl Into<String>) -> ParseError {
        ParseError {
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }
}

pub fn fetch_subscription(url: &str, timeout: Duration) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    let _size = ureq::get(url)
        .timeout(timeout)
        .call()
        .map_err(|e| io::Error::other(format!("fetch subscription: {e}")))?
        .into_reader()
        .read_to_end(&mut data)?;
    Ok(data)
}

/// Decodes the subscription blob into one line per node entry.
///
/// Feeds use either the standard or the URL-safe alphabet and frequently drop
/// the padding, so both engines are tried before giving up. A whitespace-only
/// payload is an empty subscription, not an error.
pub fn decode_subscription(raw: &[u8]) -> Result<Vec<String>, DecodeError> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Ok(vec![]);
    }
    let decoded = decode_b64(&compact)?;
    let text = String::from_utf8_lossy(&decoded);
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn decode_b64(input: impl AsRef<[u8]>) -> Result<Vec<u8>, base64::DecodeError> {
    let input = input.as_ref();
    base64::decode_engine(input, &STANDARD_ENGINE)
        .or_else(|_| base64::decode_engine(input, &URL_SAFE_ENGINE))
}

/// Parses every entry, keeping the valid nodes in subscription order and
/// collecting the failures for one aggregated report. A malformed entry never
/// aborts the rest of the list.
pub fn parse_nodes<S: AsRef<str>>(entries: &[S]) -> (Nodes, Vec<ParseError>) {
    let mut nodes = Vec::with_capacity(entries.len());
    let mut failures = Vec::new();
    for entry in entries {
        match parse_node(entry.as_ref()) {
            Ok(node) => nodes.push(node),
            Err(err) => {
                tracing::debug!(entry = %err.entry, reason = %err.reason, "skip entry");
                failures.push(err);
            }
        }
    }
    (nodes, failures)
}

pub fn parse_node(entry: &str) -> Result<Node, ParseError> {
    if let Some(payload) = entry.strip_prefix("vmess://") {
        parse_vmess(entry, payload)
    } else if let Some(payload) = entry.strip_prefix("ss://") {
        parse_ss(entry, payload)
    } else if entry.starts_with("trojan://") {
        parse_trojan(entry)
    } else if entry.starts_with("vless://") {
        parse_vless(entry)
    } else {
        Err(ParseError::new(entry, "unknown scheme"))
    }
}

#[derive(Deserialize)]
struct VmessLink {
    #[serde(default)]
    ps: String,
    add: String,
    #[serde(with = "port_value")]
    port: u16,
    id: String,
    #[serde(default)]
    net: String,
    #[serde(default, rename = "type")]
    typ: String,
    #[serde(default)]
    tls: String,
}

/// The wire format carries the port either as a JSON number or a string.
mod port_value {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Num(u16),
        Str(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        match PortRepr::deserialize(deserializer)? {
            PortRepr::Num(port) => Ok(port),
            PortRepr::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::custom(format!("non-numeric port: {s}"))),
        }
    }
}

fn parse_vmess(entry: &str, payload: &str) -> Result<Node, ParseError> {
    let raw =
        decode_b64(payload).map_err(|e| ParseError::new(entry, format!("bad base64: {e}")))?;
    let link: VmessLink = serde_json::from_slice(&raw)
        .map_err(|e| ParseError::new(entry, format!("bad vmess payload: {e}")))?;
    if link.port == 0 {
        return Err(ParseError::new(entry, "port out of range"));
    }
    let name = if link.ps.is_empty() {
        link.add.clone()
    } else {
        link.ps
    };
    Ok(Node {
        name,
        protocol: Protocol::Vmess,
        addr: link.add,
        port: link.port,
        uid: link.id,
        method: link.typ,
        net: default_if_empty(link.net, "tcp"),
        tls: default_if_empty(link.tls, "none"),
        ping: Ping::Unmeasured,
    })
}

fn parse_ss(entry: &str, payload: &str) -> Result<Node, ParseError> {
    if payload.contains('@') {
        // SIP002: ss://base64(method:password)@host:port/?plugin=...#name
        let url = parse_url(entry)?;
        let (addr, port) = host_port(entry, &url)?;
        let userinfo = percent_decode_str(url.username()).decode_utf8_lossy();
        let decoded = decode_b64(userinfo.as_bytes())
            .map_err(|e| ParseError::new(entry, format!("bad base64 userinfo: {e}")))?;
        let decoded = String::from_utf8_lossy(&decoded);
        let (method, password) = decoded
            .split_once(':')
            .ok_or_else(|| ParseError::new(entry, "missing method:password"))?;
        Ok(Node {
            name: fragment_name(&url).unwrap_or_else(|| addr.clone()),
            protocol: Protocol::Shadowsocks,
            addr,
            port,
            uid: password.to_string(),
            method: method.to_string(),
            net: "tcp".to_string(),
            tls: "none".to_string(),
            ping: Ping::Unmeasured,
        })
    } else {
        // Legacy: ss://base64(method:password@host:port)#name
        let (encoded, fragment) = match payload.split_once('#') {
            Some((encoded, fragment)) => (encoded, Some(fragment)),
            None => (payload, None),
        };
        let decoded = decode_b64(encoded)
            .map_err(|e| ParseError::new(entry, format!("bad base64: {e}")))?;
        let decoded = String::from_utf8_lossy(&decoded);
        let (userinfo, hostinfo) = decoded
            .rsplit_once('@')
            .ok_or_else(|| ParseError::new(entry, "missing @host:port"))?;
        let (method, password) = userinfo
            .split_once(':')
            .ok_or_else(|| ParseError::new(entry, "missing method:password"))?;
        let (host, port) = hostinfo
            .rsplit_once(':')
            .ok_or_else(|| ParseError::new(entry, "missing port"))?;
        let port = parse_port(entry, port)?;
        let name = fragment
            .map(|f| percent_decode_str(f).decode_utf8_lossy().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| host.to_string());
        Ok(Node {
            name,
            protocol: Protocol::Shadowsocks,
            addr: host.to_string(),
            port,
            uid: password.to_string(),
            method: method.to_string(),
            net: "tcp".to_string(),
            tls: "none".to_string(),
            ping: Ping::Unmeasured,
        })
    }
}

fn parse_trojan(entry: &str) -> Result<Node, ParseError> {
    let url = parse_url(entry)?;
    let (addr, port) = host_port(entry, &url)?;
    let password = percent_decode_str(url.username())
        .decode_utf8_lossy()
        .to_string();
    if password.is_empty() {
        return Err(ParseError::new(entry, "missing password"));
    }
    Ok(Node {
        name: fragment_name(&url).unwrap_or_else(|| addr.clone()),
        protocol: Protocol::Trojan,
        addr,
        port,
        uid: password,
        method: String::new(),
        net: "tcp".to_string(),
        tls: "tls".to_string(),
        ping: Ping::Unmeasured,
    })
}

fn parse_vless(entry: &str) -> Result<Node, ParseError> {
    let url = parse_url(entry)?;
    let (addr, port) = host_port(entry, &url)?;
    let uid = percent_decode_str(url.username())
        .decode_utf8_lossy()
        .to_string();
    if uid.is_empty() {
        return Err(ParseError::new(entry, "missing user id"));
    }
    let mut net = "tcp".to_string();
    let mut tls = "none".to_string();
    let mut method = String::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "type" => net = value.into_owned(),
            "security" => tls = value.into_owned(),
            "encryption" => method = value.into_owned(),
            _ => {}
        }
    }
    Ok(Node {
        name: fragment_name(&url).unwrap_or_else(|| addr.clone()),
        protocol: Protocol::Vless,
        addr,
        port,
        uid,
        method,
        net,
        tls,
        ping: Ping::Unmeasured,
    })
}

fn parse_url(entry: &str) -> Result<Url, ParseError> {
    Url::parse(entry).map_err(|e| ParseError::new(entry, format!("invalid url: {e}")))
}

fn host_port(entry: &str, url: &Url) -> Result<(String, u16), ParseError> {
    let host = url
        .host_str()
        .ok_or_else(|| ParseError::new(entry, "missing host"))?
        .to_string();
    let port = url
        .port()
        .ok_or_else(|| ParseError::new(entry, "missing port"))?;
    Ok((host, port))
}

fn parse_port(entry: &str, port: &str) -> Result<u16, ParseError> {
    match port.trim().parse() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ParseError::new(entry, format!("non-numeric port: {port}"))),
    }
}

fn fragment_name(url: &Url) -> Option<String> {
    url.fragment()
        .map(|f| percent_decode_str(f).decode_utf8_lossy().to_string())
        .filter(|name| !name.is_empty())
}

fn default_if_empty(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
