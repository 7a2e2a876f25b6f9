use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tag of the synthesized proxy outbound. Routing falls through to the
/// default outbounds when rules send traffic elsewhere.
pub const PROXY_TAG: &str = "proxy";

/// v2ray engine configuration document, camelCase on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct V2rayConfig {
    pub log: LogConfig,
    pub inbounds: Vec<InboundConfig>,
    pub outbounds: Vec<OutboundConfig>,
    pub routing: RoutingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogConfig {
    pub loglevel: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InboundConfig {
    pub tag: String,
    pub port: u16,
    pub listen: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundConfig {
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<StreamSettings>,
    pub tag: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    pub network: String,
    pub security: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    pub domain_strategy: String,
    pub rules: Vec<RoutingRule>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub outbound_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<String>>,
}

/// Fallback outbounds that always follow the synthesized proxy entry.
pub fn default_outbounds() -> Vec<OutboundConfig> {
    vec![
        OutboundConfig {
            protocol: "freedom".to_string(),
            settings: None,
            stream_settings: None,
            tag: "direct".to_string(),
        },
        OutboundConfig {
            protocol: "blackhole".to_string(),
            settings: None,
            stream_settings: None,
            tag: "block".to_string(),
        },
    ]
}

impl RoutingConfig {
    /// Private and mainland ranges go direct, everything else hits the first
    /// outbound, i.e. the proxy.
    pub fn rule_based() -> RoutingConfig {
        RoutingConfig {
            domain_strategy: "IPIfNonMatch".to_string(),
            rules: vec![
                RoutingRule {
                    rule_type: "field".to_string(),
                    outbound_tag: "direct".to_string(),
                    ip: Some(vec!["geoip:private".to_string(), "geoip:cn".to_string()]),
                    domain: None,
                },
                RoutingRule {
                    rule_type: "field".to_string(),
                    outbound_tag: "direct".to_string(),
                    ip: None,
                    domain: Some(vec!["geosite:cn".to_string()]),
                },
            ],
        }
    }

    /// No rules: all traffic goes through the proxy outbound.
    pub fn global() -> RoutingConfig {
        RoutingConfig {
            domain_strategy: "AsIs".to_string(),
            rules: vec![],
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        RoutingConfig::rule_based()
    }
}

impl Default for V2rayConfig {
    fn default() -> Self {
        V2rayConfig {
            log: LogConfig {
                loglevel: "warning".to_string(),
            },
            inbounds: vec![
                InboundConfig {
                    tag: "socks".to_string(),
                    port: 1080,
                    listen: "127.0.0.1".to_string(),
                    protocol: "socks".to_string(),
                    settings: Some(json!({"auth": "noauth", "udp": true})),
                },
                InboundConfig {
                    tag: "http".to_string(),
                    port: 1081,
                    listen: "127.0.0.1".to_string(),
                    protocol: "http".to_string(),
                    settings: None,
                },
            ],
            outbounds: default_outbounds(),
            routing: RoutingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shell_shape() {
        let cfg = V2rayConfig::default();
        let tags: Vec<&str> = cfg.inbounds.iter().map(|i| i.tag.as_str()).collect();
        assert_eq!(tags, vec!["socks", "http"]);
        assert!(cfg.inbounds.iter().all(|i| i.listen == "127.0.0.1"));
        let tags: Vec<&str> = cfg.outbounds.iter().map(|o| o.tag.as_str()).collect();
        assert_eq!(tags, vec!["direct", "block"]);
        assert!(!cfg.routing.rules.is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let cfg = V2rayConfig::default();
        let value = serde_json::to_value(&cfg).unwrap();
        assert_eq!(value["routing"]["domainStrategy"], "IPIfNonMatch");
        assert_eq!(value["routing"]["rules"][0]["type"], "field");
        assert_eq!(value["routing"]["rules"][0]["outboundTag"], "direct");
        // Unset outbound settings are omitted, not null.
        assert!(value["outbounds"][0].get("settings").is_none());
    }
}
