use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Node};

use crate::service::ServiceControl;

pub const TROJAN_SERVICE: &str = "trojan.service";
pub const V2RAY_SERVICE: &str = "v2ray.service";

pub struct Paths {
    pub v2sub: PathBuf,
    pub v2ray: PathBuf,
    pub trojan: PathBuf,
}

pub struct Toggles {
    pub global: bool,
    pub wan: bool,
    pub socks: u16,
    pub http: u16,
}

/// Turns the selected node into running configuration.
///
/// For trojan the relay config is written and the relay restarted before the
/// engine config is touched: the engine's outbound points at the relay's
/// listener, so the relay must already be up when the engine comes back.
pub fn apply_selection(
    cfg: &mut Config,
    node: &Node,
    toggles: &Toggles,
    services: &dyn ServiceControl,
    paths: &Paths,
) -> Result<()> {
    let synthesis = template::synthesize(node)?;

    if let Some(relay) = &synthesis.relay {
        let data = serde_json::to_vec_pretty(relay)?;
        fs::write(&paths.trojan, data)
            .with_context(|| format!("write trojan config {}", paths.trojan.display()))?;
        println!("Restarting trojan service...");
        services
            .restart(TROJAN_SERVICE)
            .context("restart trojan service")?;
    }

    template::install_outbound(&mut cfg.v2ray, synthesis.outbound);
    if toggles.global {
        template::set_global_proxy(&mut cfg.v2ray);
    } else {
        template::set_rule_proxy(&mut cfg.v2ray);
    }
    if toggles.wan {
        template::listen_on_wan(&mut cfg.v2ray);
    } else {
        template::listen_on_local(&mut cfg.v2ray);
    }
    template::set_inbound_ports(&mut cfg.v2ray, toggles.socks, toggles.http);

    cfg.save(&paths.v2sub)
        .with_context(|| format!("write v2sub config {}", paths.v2sub.display()))?;

    let engine = serde_json::to_vec_pretty(&cfg.v2ray)?;
    fs::write(&paths.v2ray, engine)
        .with_context(|| format!("write v2ray config {}", paths.v2ray.display()))?;
    println!("Restarting v2ray service...");
    services
        .restart(V2RAY_SERVICE)
        .context("restart v2ray service")?;
    Ok(())
}
