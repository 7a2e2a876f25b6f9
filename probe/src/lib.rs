use std::time::{Duration, Instant};

use async_std::net::TcpStream;
use async_std::prelude::*;
use async_std::task::spawn;
use config::{Node, Ping};
use futures_util::stream::FuturesUnordered;
use tracing::debug;

/// Measures TCP connect latency for every node, one task per node, all
/// bounded by one shared deadline.
///
/// Results come back over the join-handle stream and are written into each
/// node's `ping` slot by this orchestrator only, so a probe that finishes
/// after the deadline is never observed and no slot is written twice. Probes
/// still in flight when the deadline fires are abandoned, not cancelled.
/// Node order is never changed; there is no error return.
pub async fn ping_nodes(nodes: &mut [Node], deadline: Duration) {
    let mut probes: FuturesUnordered<_> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let target = format!("{}:{}", node.addr, node.port);
            spawn(async move { (index, probe_once(&target, deadline).await) })
        })
        .collect();

    let collect = async {
        while let Some((index, ping)) = probes.next().await {
            nodes[index].ping = ping;
        }
    };
    let _ = collect.timeout(deadline).await;
}

async fn probe_once(addr: &str, deadline: Duration) -> Ping {
    let started = Instant::now();
    match TcpStream::connect(addr).timeout(deadline).await {
        Ok(Ok(_stream)) => {
            let elapsed = started.elapsed().as_millis() as u64;
            Ping::Millis(elapsed.max(1))
        }
        Ok(Err(err)) => {
            debug!(addr, %err, "probe failed");
            Ping::Unreachable
        }
        Err(_) => {
            debug!(addr, "probe deadline elapsed");
            Ping::Unreachable
        }
    }
}
