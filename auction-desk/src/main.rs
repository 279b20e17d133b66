// Auction desk entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Build the content store, chain and wallet clients
// 4. Probe the wallet; show the wallet-missing screen if it does not answer
// 5. Create mpsc channels and the coordinator state
// 6. Spawn the coordinator task
// 7. Run the TUI until the user quits
// 8. Cleanup on exit

use std::sync::Arc;

use auction_desk::account_sync::WalletProvider;
use auction_desk::app;
use auction_desk::chain::rpc::{JsonRpcClient, RpcChain, RpcWallet};
use auction_desk::config;
use auction_desk::storage::ipfs::IpfsClient;
use auction_desk::tui;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Auction desk starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: rpc={}, ws={}, ipfs={}",
        config.rpc.http_url, config.rpc.ws_url, config.ipfs.api_url
    );

    // 3. Clients
    let rpc = Arc::new(JsonRpcClient::new(config.rpc.http_url.clone()));
    let store = Arc::new(IpfsClient::new(&config.ipfs));
    let chain = Arc::new(RpcChain::new(&config, Arc::clone(&rpc)));
    let wallet = Arc::new(RpcWallet::new(
        Arc::clone(&rpc),
        config.rpc.accounts_method.clone(),
    ));

    // 4. Wallet probe
    match wallet.probe().await {
        Ok(client) => info!("Wallet provider answered: {}", client),
        Err(e) => {
            warn!("No wallet provider at {}: {}", config.rpc.http_url, e);
            tui::run_wallet_missing(&config.rpc.http_url, &e.to_string()).await?;
            info!("Auction desk exiting without a wallet");
            return Ok(());
        }
    }

    // 5. Channels and coordinator state
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(1024);
    let (app_state, channels) = app::AppState::new(config, store, chain, wallet);

    // 6. Spawn coordinator task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, channels, ui_tx, app_state).await {
            error!("Coordinator loop error: {}", e);
        }
    });

    // 7. Run the TUI event loop (blocking until user quits)
    info!("Application ready");
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {}", e);
    }

    // 8. Cleanup: wait for the coordinator to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Auction desk shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("auction-desk.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("auction_desk=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
