mod outbound;
mod trojan;

pub use outbound::{
    install_outbound, listen_on_local, listen_on_wan, set_global_proxy, set_inbound_ports,
    set_rule_proxy, synthesize, SocksOutboundSetting, SocksServerConfig, SsOutboundSetting,
    SsServerConfig, Synthesis, UnsupportedProtocol, VnextConfig, VnextOutboundSetting, VnextUser,
};
pub use trojan::{TrojanConfig, TROJAN_LOCAL_ADDR, TROJAN_LOCAL_PORT};
