mod node;
mod subscription;
mod v2ray;

pub use node::{sort_by_ping, Node, Nodes, Ping, Protocol};
pub use subscription::{
    decode_subscription, fetch_subscription, parse_node, parse_nodes, DecodeError, ParseError,
};
pub use v2ray::{
    default_outbounds, InboundConfig, LogConfig, OutboundConfig, RoutingConfig, RoutingRule,
    StreamSettings, V2rayConfig, PROXY_TAG,
};

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Persisted v2sub state, shared between runs. Field names match the on-disk
/// JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "SubUrl", default)]
    pub sub_url: String,
    #[serde(rename = "Nodes", default)]
    pub nodes: Nodes,
    #[serde(rename = "V2rayConfig", default)]
    pub v2ray: V2rayConfig,
}

impl Config {
    pub fn load(path: &Path) -> io::Result<Config> {
        let data = fs::read(path)?;
        serde_json::from_slice(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let data = serde_json::to_vec_pretty(self).map_err(io::Error::other)?;
        fs::write(path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v2sub.json");

        let mut config = Config::default();
        config.sub_url = "https://example.com/sub".to_string();
        config.nodes.push(Node {
            name: "n1".to_string(),
            protocol: Protocol::Trojan,
            addr: "example.com".to_string(),
            port: 443,
            uid: "secret".to_string(),
            method: String::new(),
            net: "tcp".to_string(),
            tls: "tls".to_string(),
            ping: Ping::Millis(42),
        });
        config.save(&path).unwrap();

        let back = Config::load(&path).unwrap();
        assert_eq!(back.sub_url, config.sub_url);
        assert_eq!(back.nodes, config.nodes);
    }

    #[test]
    fn test_config_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_config_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v2sub.json");
        fs::write(&path, b"{not json").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
