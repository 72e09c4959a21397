//! `run` subcommand: the schedule daemon.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use lumicycle_lib::supervisor::Supervisor;

use super::Result;

pub(super) async fn cmd_run(config_path: Option<&Path>) -> Result<()> {
    let config = super::load_valid_config(config_path)?;

    println!(
        "[lumicycle] {} states, checking every {} ms, target {}",
        config.states.len(),
        config.check_interval,
        config.url
    );
    println!("[lumicycle] press Ctrl+C to stop");

    let mut supervisor = Supervisor::new(config)?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        log::info!("shutdown requested");
        trigger.cancel();
    });

    supervisor.run(shutdown).await;
    Ok(())
}

/// Resolve when the process receives Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                log::warn!("cannot install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
