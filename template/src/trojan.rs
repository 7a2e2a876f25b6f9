use serde::{Deserialize, Serialize};

/// Listener the relay binds and the socks outbound targets. The primary
/// engine does not speak trojan, so a local trojan client bridges it.
pub const TROJAN_LOCAL_ADDR: &str = "127.0.0.1";
pub const TROJAN_LOCAL_PORT: u16 = 10808;

/// trojan client config, snake_case on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrojanConfig {
    pub run_type: String,
    pub log_level: u8,
    pub local_addr: String,
    pub local_port: u16,
    pub remote_addr: String,
    pub remote_port: u16,
    pub password: Vec<String>,
}

impl TrojanConfig {
    pub fn client(remote_addr: &str, remote_port: u16, password: &str) -> TrojanConfig {
        TrojanConfig {
            run_type: "client".to_string(),
            log_level: 1,
            local_addr: TROJAN_LOCAL_ADDR.to_string(),
            local_port: TROJAN_LOCAL_PORT,
            remote_addr: remote_addr.to_string(),
            remote_port,
            password: vec![password.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trojan_client_config_wire_format() {
        let relay = TrojanConfig::client("remote.example.com", 443, "secret");
        let value = serde_json::to_value(&relay).unwrap();
        assert_eq!(value["run_type"], "client");
        assert_eq!(value["local_addr"], TROJAN_LOCAL_ADDR);
        assert_eq!(value["local_port"], u64::from(TROJAN_LOCAL_PORT));
        assert_eq!(value["remote_addr"], "remote.example.com");
        assert_eq!(value["remote_port"], 443);
        assert_eq!(value["password"][0], "secret");
    }
}
