use config::{
    default_outbounds, Node, OutboundConfig, Protocol, RoutingConfig, StreamSettings, V2rayConfig,
    PROXY_TAG,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::trojan::TrojanConfig;

/// The selected node's protocol has no outbound branch. Fatal: nothing may
/// be written after this.
#[derive(Debug, Error)]
#[error("unsupported protocol: {0}")]
pub struct UnsupportedProtocol(pub String);

#[derive(Clone, Debug, Serialize)]
pub struct VnextUser {
    pub id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct VnextConfig {
    pub address: String,
    pub port: u16,
    pub users: Vec<VnextUser>,
}

#[derive(Clone, Debug, Serialize)]
pub struct VnextOutboundSetting {
    pub vnext: Vec<VnextConfig>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SsServerConfig {
    pub address: String,
    pub port: u16,
    pub method: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SsOutboundSetting {
    pub servers: Vec<SsServerConfig>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SocksServerConfig {
    pub address: String,
    pub port: u16,
}

#[derive(Clone, Debug, Serialize)]
pub struct SocksOutboundSetting {
    pub servers: Vec<SocksServerConfig>,
}

/// Result of synthesizing one node: the outbound entry for the engine and,
/// for trojan only, the relay config that must be installed first.
#[derive(Debug)]
pub struct Synthesis {
    pub outbound: OutboundConfig,
    pub relay: Option<TrojanConfig>,
}

pub fn synthesize(node: &Node) -> Result<Synthesis, UnsupportedProtocol> {
    let (protocol, settings, stream, relay) = match node.protocol {
        Protocol::Vmess => (
            "vmess",
            to_setting(VnextOutboundSetting {
                vnext: vec![VnextConfig {
                    address: node.addr.clone(),
                    port: node.port,
                    users: vec![VnextUser {
                        id: node.uid.clone(),
                    }],
                }],
            }),
            StreamSettings {
                network: node.net.clone(),
                security: node.tls.clone(),
            },
            None,
        ),
        Protocol::Shadowsocks => (
            "shadowsocks",
            to_setting(SsOutboundSetting {
                servers: vec![SsServerConfig {
                    address: node.addr.clone(),
                    port: node.port,
                    method: node.method.clone(),
                    password: node.uid.clone(),
                }],
            }),
            plain_tcp(),
            None,
        ),
        Protocol::Trojan => {
            // The engine reaches the local relay over socks; the relay holds
            // the actual trojan credentials.
            let relay = TrojanConfig::client(&node.addr, node.port, &node.uid);
            let setting = to_setting(SocksOutboundSetting {
                servers: vec![SocksServerConfig {
                    address: relay.local_addr.clone(),
                    port: relay.local_port,
                }],
            });
            ("socks", setting, plain_tcp(), Some(relay))
        }
        Protocol::Vless => return Err(UnsupportedProtocol(node.protocol.to_string())),
    };

    Ok(Synthesis {
        outbound: OutboundConfig {
            protocol: protocol.to_string(),
            settings: Some(settings),
            stream_settings: Some(stream),
            tag: PROXY_TAG.to_string(),
        },
        relay,
    })
}

fn plain_tcp() -> StreamSettings {
    StreamSettings {
        network: "tcp".to_string(),
        security: "none".to_string(),
    }
}

fn to_setting<T: Serialize>(setting: T) -> Value {
    serde_json::to_value(setting).expect("outbound setting serializes")
}

/// Prepends the synthesized outbound to the default entries so the proxy
/// takes priority while the fallback routes stay available.
pub fn install_outbound(cfg: &mut V2rayConfig, outbound: OutboundConfig) {
    let mut outbounds = Vec::with_capacity(3);
    outbounds.push(outbound);
    outbounds.extend(default_outbounds());
    cfg.outbounds = outbounds;
}

pub fn set_global_proxy(cfg: &mut V2rayConfig) {
    cfg.routing = RoutingConfig::global();
}

pub fn set_rule_proxy(cfg: &mut V2rayConfig) {
    cfg.routing = RoutingConfig::rule_based();
}

pub fn listen_on_wan(cfg: &mut V2rayConfig) {
    for inbound in &mut cfg.inbounds {
        inbound.listen = "0.0.0.0".to_string();
    }
}

pub fn listen_on_local(cfg: &mut V2rayConfig) {
    for inbound in &mut cfg.inbounds {
        inbound.listen = "127.0.0.1".to_string();
    }
}

/// Overrides the socks/http inbound ports; zero keeps the current port.
pub fn set_inbound_ports(cfg: &mut V2rayConfig, socks: u16, http: u16) {
    for inbound in &mut cfg.inbounds {
        let port = match inbound.tag.as_str() {
            "socks" => socks,
            "http" => http,
            _ => 0,
        };
        if port != 0 {
            inbound.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trojan::{TROJAN_LOCAL_ADDR, TROJAN_LOCAL_PORT};
    use config::Ping;

    fn node(protocol: Protocol) -> Node {
        Node {
            name: "n1".to_string(),
            protocol,
            addr: "1.2.3.4".to_string(),
            port: 443,
            uid: "abc".to_string(),
            method: "aes-256-gcm".to_string(),
            net: "ws".to_string(),
            tls: "tls".to_string(),
            ping: Ping::Unmeasured,
        }
    }

    #[test]
    fn test_synthesize_vmess() {
        let synthesis = synthesize(&node(Protocol::Vmess)).unwrap();
        assert!(synthesis.relay.is_none());

        let outbound = synthesis.outbound;
        assert_eq!(outbound.protocol, "vmess");
        assert_eq!(outbound.tag, PROXY_TAG);
        let stream = outbound.stream_settings.unwrap();
        assert_eq!(stream.network, "ws");
        assert_eq!(stream.security, "tls");
        let settings = outbound.settings.unwrap();
        assert_eq!(settings["vnext"][0]["address"], "1.2.3.4");
        assert_eq!(settings["vnext"][0]["port"], 443);
        assert_eq!(settings["vnext"][0]["users"][0]["id"], "abc");
    }

    #[test]
    fn test_synthesize_shadowsocks() {
        let synthesis = synthesize(&node(Protocol::Shadowsocks)).unwrap();
        assert!(synthesis.relay.is_none());

        let outbound = synthesis.outbound;
        assert_eq!(outbound.protocol, "shadowsocks");
        let stream = outbound.stream_settings.unwrap();
        assert_eq!(stream.network, "tcp");
        assert_eq!(stream.security, "none");
        let settings = outbound.settings.unwrap();
        assert_eq!(settings["servers"][0]["address"], "1.2.3.4");
        assert_eq!(settings["servers"][0]["method"], "aes-256-gcm");
        assert_eq!(settings["servers"][0]["password"], "abc");
    }

    #[test]
    fn test_synthesize_trojan_targets_local_relay() {
        let synthesis = synthesize(&node(Protocol::Trojan)).unwrap();

        let relay = synthesis.relay.unwrap();
        assert_eq!(relay.remote_addr, "1.2.3.4");
        assert_eq!(relay.remote_port, 443);
        assert_eq!(relay.password, vec!["abc".to_string()]);

        let outbound = synthesis.outbound;
        assert_eq!(outbound.protocol, "socks");
        let settings = outbound.settings.unwrap();
        assert_eq!(settings["servers"][0]["address"], TROJAN_LOCAL_ADDR);
        assert_eq!(settings["servers"][0]["port"], u64::from(TROJAN_LOCAL_PORT));
        assert_eq!(settings["servers"][0]["address"], relay.local_addr);
        let stream = outbound.stream_settings.unwrap();
        assert_eq!(stream.network, "tcp");
        assert_eq!(stream.security, "none");
    }

    #[test]
    fn test_synthesize_vless_is_unsupported() {
        let err = synthesize(&node(Protocol::Vless)).unwrap_err();
        assert_eq!(err.to_string(), "unsupported protocol: vless");
    }

    #[test]
    fn test_install_outbound_prepends_proxy() {
        let mut cfg = V2rayConfig::default();
        let synthesis = synthesize(&node(Protocol::Vmess)).unwrap();
        install_outbound(&mut cfg, synthesis.outbound);

        let tags: Vec<&str> = cfg.outbounds.iter().map(|o| o.tag.as_str()).collect();
        assert_eq!(tags, vec!["proxy", "direct", "block"]);
    }

    #[test]
    fn test_routing_and_listen_toggles() {
        let mut cfg = V2rayConfig::default();

        set_global_proxy(&mut cfg);
        assert!(cfg.routing.rules.is_empty());
        set_rule_proxy(&mut cfg);
        assert!(!cfg.routing.rules.is_empty());

        listen_on_wan(&mut cfg);
        assert!(cfg.inbounds.iter().all(|i| i.listen == "0.0.0.0"));
        listen_on_local(&mut cfg);
        assert!(cfg.inbounds.iter().all(|i| i.listen == "127.0.0.1"));
    }

    #[test]
    fn test_set_inbound_ports() {
        let mut cfg = V2rayConfig::default();
        set_inbound_ports(&mut cfg, 7890, 0);
        let socks = cfg.inbounds.iter().find(|i| i.tag == "socks").unwrap();
        let http = cfg.inbounds.iter().find(|i| i.tag == "http").unwrap();
        assert_eq!(socks.port, 7890);
        assert_eq!(http.port, 1081);
    }
}
