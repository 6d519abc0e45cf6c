use clap::Parser;
use log::{error, info, LevelFilter};
use std::process;
use std::sync::mpsc;
use std::thread;

use emberchain::network::{broadcast_block, connect_peers, server};
use emberchain::{
    Blockchain, InMemoryPeerRegistry, NodeConfig, Opt, PeerInfo, PeerRegistry, TxService, Wallet,
};

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();
    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> emberchain::Result<()> {
    let mut seed_peers = Vec::new();
    for endpoint in &opt.peers {
        seed_peers.push(PeerInfo::parse(endpoint)?);
    }
    let config = NodeConfig::new(NodeConfig::resolve_port(opt.tcp_port), seed_peers);

    let chain = Blockchain::new();
    let service = TxService::new();
    let wallet = Wallet::new(service.clone())?;
    info!("Wallet address: {}", wallet.address());

    let registry = InMemoryPeerRegistry::new();
    for peer in &config.seed_peers {
        registry.upsert_peer(&peer.ip, peer.port);
    }

    let (peer_tx, peer_rx) = mpsc::channel();

    let accept_tx = peer_tx.clone();
    let tcp_port = config.tcp_port;
    thread::spawn(move || {
        if let Err(e) = server::start(tcp_port, accept_tx) {
            error!("TCP listener error: {e}");
        }
    });

    // Announce our tail to the seed peers; their replies drive the initial
    // sync through the regular message loop.
    let seeds = connect_peers(&registry);
    if !seeds.is_empty() {
        let latest = (*chain.latest_block()).clone();
        broadcast_block(&latest, seeds, &peer_tx);
    }

    emberchain::start_tasks(peer_rx, chain, service);
    Ok(())
}
