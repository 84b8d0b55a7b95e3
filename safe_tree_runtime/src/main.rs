//! safe-tree: open a session, replay it and check its latest snapshot.
//!
//! Usage: safe-tree [config.json]

use std::path::Path;
use std::process::ExitCode;

use tracing::{error, info};

use safe_tree_kernel::{Registry, Tier};
use safe_tree_runtime::config::RuntimeConfig;
use safe_tree_runtime::drift;
use safe_tree_runtime::session::Session;

fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::load(Path::new(&path))?,
        None => RuntimeConfig::default(),
    };
    info!(data_dir = %config.data_dir.display(), session_id = %config.session_id, "starting");

    let mut session = Session::open(
        &config.data_dir,
        &config.session_id,
        config.module.clone(),
        config.snapshot_interval,
    )?;
    let live_hash = session.current_hash();
    let events = session.load_events()?;
    let replayed = session.replay_full()?;

    let mut ok = true;
    if replayed == live_hash {
        println!("[PASS] replay: {} events, hash={}", events.len(), replayed);
    } else {
        ok = false;
        println!("[FAIL] replay: open={} replay={}", live_hash, replayed);
    }

    if drift::verify_determinism(&events)? {
        println!("[PASS] determinism");
    } else {
        ok = false;
        println!("[FAIL] determinism: two replays differ");
    }

    match session.verify_latest_snapshot()? {
        Some(true) => println!("[PASS] latest snapshot matches replay"),
        Some(false) => {
            ok = false;
            println!("[FAIL] latest snapshot does not match replay");
        }
        None => println!("[SKIP] no snapshot yet"),
    }

    print_summary(session.module().registry());
    Ok(ok)
}

fn print_summary(registry: &Registry) {
    println!("organizations: {}", registry.orgs.len());
    for org in registry.orgs.values() {
        let nodes: Vec<_> = registry
            .safes
            .values()
            .filter(|n| n.org == org.org_hash)
            .collect();
        let roots = nodes.iter().filter(|n| n.tier == Tier::Root).count();
        let pending = nodes.iter().filter(|n| n.tier == Tier::Removed).count();
        println!(
            "  {} {:?}: roots={} live={} pending_remove={} limit={} nonce={} deny_helper={:?} listed={}",
            org.org_hash,
            org.name,
            roots,
            nodes.len() - pending,
            pending,
            org.depth_tree_limit,
            org.nonce,
            org.deny_helper,
            org.listed.count,
        );
    }
}
