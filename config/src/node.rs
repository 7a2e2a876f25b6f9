use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// One candidate proxy server parsed from a subscription entry.
///
/// `addr` and `port` are always present and syntactically valid once a node
/// has been constructed; `ping` is the only field mutated afterwards, by the
/// prober orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Protocol")]
    pub protocol: Protocol,
    #[serde(rename = "Addr")]
    pub addr: String,
    #[serde(rename = "Port")]
    pub port: u16,
    /// Password or user id, depending on the protocol.
    #[serde(rename = "UID")]
    pub uid: String,
    /// Cipher or obfuscation method, protocol dependent.
    #[serde(rename = "Type", default)]
    pub method: String,
    /// Transport, e.g. tcp/ws.
    #[serde(rename = "Net", default)]
    pub net: String,
    /// Security mode, e.g. none/tls.
    #[serde(rename = "TLS", default)]
    pub tls: String,
    #[serde(rename = "Ping", with = "ping_repr", default)]
    pub ping: Ping,
}

pub type Nodes = Vec<Node>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Vmess,
    #[serde(rename = "ss")]
    Shadowsocks,
    Trojan,
    Vless,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Vmess => "vmess",
            Protocol::Shadowsocks => "ss",
            Protocol::Trojan => "trojan",
            Protocol::Vless => "vless",
        };
        f.write_str(name)
    }
}

/// Measured latency of a node.
///
/// The variant order gives the derived `Ord` the ranking the chooser needs:
/// measured values sort ascending, unmeasured after every measured value,
/// unreachable last.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Ping {
    Millis(u64),
    #[default]
    Unmeasured,
    Unreachable,
}

impl Display for Ping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ping::Millis(ms) => write!(f, "{ms}ms"),
            Ping::Unmeasured => f.write_str("-"),
            Ping::Unreachable => f.write_str("timeout"),
        }
    }
}

/// Persisted representation: 0 = unmeasured, negative = unreachable,
/// positive = milliseconds.
mod ping_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Ping;

    pub fn serialize<S>(ping: &Ping, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value: i64 = match ping {
            Ping::Millis(ms) => *ms as i64,
            Ping::Unmeasured => 0,
            Ping::Unreachable => -1,
        };
        serializer.serialize_i64(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Ping, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match i64::deserialize(deserializer)? {
            0 => Ping::Unmeasured,
            value if value < 0 => Ping::Unreachable,
            value => Ping::Millis(value as u64),
        })
    }
}

/// Stable sort by measured latency. Unreachable nodes end up after every
/// measured node; ties keep subscription order.
pub fn sort_by_ping(nodes: &mut [Node]) {
    nodes.sort_by_key(|node| node.ping);
}
