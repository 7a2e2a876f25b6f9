use config::Node;

pub fn print_nodes(nodes: &[Node]) {
    println!(
        "{:<5} {:<8} {:<30} {:<26} {:>6} {:>10}",
        "No.", "Proto", "Name", "Addr", "Port", "Ping"
    );
    for (index, node) in nodes.iter().enumerate() {
        println!(
            "{:<5} {:<8} {:<30} {:<26} {:>6} {:>10}",
            index,
            node.protocol.to_string(),
            truncate(&node.name, 30),
            truncate(&node.addr, 26),
            node.port,
            node.ping.to_string(),
        );
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if out.len() < text.len() {
        out.push('…');
    }
    out
}
