mod app;
mod logger;
mod service;
mod table;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_std::task::block_on;
use clap::Parser;
use config::{Config, Nodes};

use crate::app::{apply_selection, Paths, Toggles};
use crate::logger::setup_logger;
use crate::service::Systemctl;

const V2SUB_CONFIG: &str = "/etc/v2sub.json";
const V2RAY_CONFIG: &str = "/etc/v2ray.json";
const TROJAN_CONFIG: &str = "/etc/trojan.json";

const WAITING_FOR_SUB: Duration = Duration::from_secs(10);
const WAITING_FOR_PING: Duration = Duration::from_secs(5);

/// Subscription based v2ray node switcher.
#[derive(Debug, Parser)]
#[command(name = "v2sub", version)]
struct Opt {
    /// Refresh the subscription even if nodes are cached.
    #[arg(long)]
    sub: bool,
    /// Subscription address; overrides and updates the cached one.
    #[arg(long, value_name = "URL")]
    url: Option<String>,
    /// Skip latency probing.
    #[arg(long)]
    no_ping: bool,
    /// Sort nodes by measured latency before display.
    #[arg(long)]
    sort: bool,
    /// Route all traffic through the proxy instead of by rule.
    #[arg(long)]
    global: bool,
    /// Accept inbound connections from the network, not only loopback.
    #[arg(long)]
    wan: bool,
    /// Quick switch: reuse cached nodes and skip probing.
    #[arg(short, long)]
    quick: bool,
    /// v2ray config file.
    #[arg(long, value_name = "FILE", default_value = V2RAY_CONFIG)]
    config: PathBuf,
    /// Socks inbound port override.
    #[arg(long, value_name = "PORT", default_value_t = 0)]
    socks: u16,
    /// Http inbound port override.
    #[arg(long, value_name = "PORT", default_value_t = 0)]
    http: u16,
    /// Log file.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    setup_logger(opt.log.as_deref())?;

    let v2sub_path = Path::new(V2SUB_CONFIG);
    let mut cfg = load_or_default(v2sub_path);

    let use_cache = !opt.sub && opt.url.is_none() && !cfg.nodes.is_empty();
    let mut nodes = if use_cache {
        println!("Using cached subscription, pass --sub to refresh.");
        cfg.nodes.clone()
    } else {
        refresh_subscription(&mut cfg, opt.url.as_deref())?
    };
    if nodes.is_empty() {
        bail!("subscription yielded no usable nodes");
    }

    if !(opt.no_ping || opt.quick) {
        println!(
            "Probing node latency, waiting up to {}s...",
            WAITING_FOR_PING.as_secs()
        );
        block_on(probe::ping_nodes(&mut nodes, WAITING_FOR_PING));
        if opt.sort {
            config::sort_by_ping(&mut nodes);
        }
    }

    table::print_nodes(&nodes);
    let index = select_node(nodes.len())?;
    let node = nodes[index].clone();
    println!("[{}] ping: {}", node.name, node.ping);

    cfg.nodes = nodes;
    let paths = Paths {
        v2sub: v2sub_path.to_path_buf(),
        v2ray: opt.config.clone(),
        trojan: PathBuf::from(TROJAN_CONFIG),
    };
    let toggles = Toggles {
        global: opt.global,
        wan: opt.wan,
        socks: opt.socks,
        http: opt.http,
    };
    apply_selection(&mut cfg, &node, &toggles, &Systemctl, &paths)?;

    println!("All done.");
    Ok(())
}

fn load_or_default(path: &Path) -> Config {
    match Config::load(path) {
        Ok(cfg) => cfg,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            println!("First run, {} will be created.", path.display());
            Config::default()
        }
        Err(err) => {
            eprintln!("Config {} is damaged, starting over: {err}", path.display());
            Config::default()
        }
    }
}

fn refresh_subscription(cfg: &mut Config, url_flag: Option<&str>) -> Result<Nodes> {
    if let Some(url) = url_flag {
        cfg.sub_url = url.to_string();
    }
    if cfg.sub_url.is_empty() {
        cfg.sub_url = prompt_line("Subscription url: ")?;
    } else {
        println!("Subscription url: {}", cfg.sub_url);
    }

    println!("Fetching subscription...");
    let raw = config::fetch_subscription(&cfg.sub_url, WAITING_FOR_SUB).with_context(|| {
        format!(
            "no subscription data within {}s, check the url and network",
            WAITING_FOR_SUB.as_secs()
        )
    })?;
    let entries = config::decode_subscription(&raw).context("check the subscription encoding")?;
    let (nodes, failures) = config::parse_nodes(&entries);
    if !failures.is_empty() {
        println!("Could not parse {} entries:", failures.len());
        for failure in &failures {
            println!("  {}", failure.entry);
        }
    }
    Ok(nodes)
}

fn select_node(count: usize) -> Result<usize> {
    loop {
        let line = prompt_line("Node number: ")?;
        match line.parse::<usize>() {
            Ok(index) if index < count => return Ok(index),
            _ => println!("No such node."),
        }
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    let read = std::io::stdin().read_line(&mut line)?;
    if read == 0 {
        bail!("stdin closed");
    }
    Ok(line.trim().to_string())
}
