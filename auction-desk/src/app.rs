// Application state and orchestration logic.
//
// The coordinator loop owns every piece of session state. Network work runs
// in spawned tasks that report back over `OpReport`; contract events arrive
// from the chain subscriptions; user commands arrive from the TUI. The three
// periodic tasks (account poll, log drain, log tail) live in a `Session` that
// is replaced whenever the active account changes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::account_sync::{account_changed, active_account, AccountPoll, WalletProvider};
use crate::auction::listing::{run_listing, validate_listing, ListingError, ListingOutcome};
use crate::auction::session::{
    apply_edit, end_time_ms, ContractState, ListingDraft, Selection, TokenView, DEFAULT_PRICE,
};
use crate::auction::ValidationError;
use crate::chain::abi::{ContractEvent, EventPayload};
use crate::chain::units::{from_wei, to_wei};
use crate::chain::{same_address, AuctionInfo, ChainClient, ChainError, ContractHandle, Receipt, TokenId};
use crate::config::{Config, TimerConfig};
use crate::event_log::{EventLog, LogSink};
use crate::protocol::{AppSnapshot, FormField, Mode, UiUpdate, UserCommand};
use crate::storage::{ContentStore, Metadata};

/// Capacity of the report and event channels.
const CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Reports from spawned tasks
// ---------------------------------------------------------------------------

/// Results of network operations, sent back to the loop.
///
/// Reports that only make sense for the view they were started from carry
/// the generation current at spawn time; the loop discards stale ones.
#[derive(Debug)]
pub enum OpReport {
    AccountsPolled {
        seq: u64,
        result: Result<Vec<String>, ChainError>,
    },
    Deployed {
        account: String,
        result: Result<String, ChainError>,
    },
    ListingFinished {
        generation: u64,
        contract: String,
        result: Result<ListingOutcome, ListingError>,
    },
    OwnerLoaded {
        generation: u64,
        result: Result<String, ChainError>,
    },
    MetadataLoaded {
        generation: u64,
        result: Result<Metadata, String>,
    },
    InfoLoaded {
        generation: u64,
        result: Result<AuctionInfo, ChainError>,
    },
    TxSettled {
        action: &'static str,
        result: Result<Receipt, ChainError>,
    },
}

/// Receiving ends of the channels the loop listens on, created with the state.
pub struct AppChannels {
    pub op_rx: mpsc::Receiver<OpReport>,
    pub event_rx: mpsc::Receiver<ContractEvent>,
    pub log_rx: mpsc::UnboundedReceiver<String>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ContentStore>,
    pub chain: Arc<dyn ChainClient>,
    pub wallet: Arc<dyn WalletProvider>,
    /// Producer side of the event log; cloned into spawned tasks.
    pub log: LogSink,
    pub event_log: EventLog,
    pub op_tx: mpsc::Sender<OpReport>,
    pub event_tx: mpsc::Sender<ContractEvent>,

    pub account: Option<String>,
    pub mode: Mode,
    /// Deployed contract per account. Entries are never replaced.
    pub bindings: BTreeMap<String, String>,
    /// Accounts with a deploy in flight.
    pub deploying: HashSet<String>,
    /// Minted token ids per contract, append-only.
    pub token_ids: BTreeMap<String, Vec<TokenId>>,
    pub draft: ListingDraft,
    pub selection: Selection,
    pub token: TokenView,
    pub bid_price: String,
    pub added_file_cid: Option<String>,
    pub added_metadata_cid: Option<String>,
    pub account_poll: AccountPoll,

    /// Bumped on every active-account change. The loop restarts its
    /// `Session` when this moves.
    pub session_generation: u64,
    /// Bumped whenever the draft form is reset. Guards listing results.
    pub form_generation: u64,
    /// Bumped whenever the selection changes or is reset. Guards token reads.
    pub selection_generation: u64,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn ContentStore>,
        chain: Arc<dyn ChainClient>,
        wallet: Arc<dyn WalletProvider>,
    ) -> (Self, AppChannels) {
        let (op_tx, op_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (log, log_rx) = LogSink::new();
        let event_log = EventLog::new(config.log.max_display_chars);

        let state = AppState {
            config,
            store,
            chain,
            wallet,
            log,
            event_log,
            op_tx,
            event_tx,
            account: None,
            mode: Mode::Listing,
            bindings: BTreeMap::new(),
            deploying: HashSet::new(),
            token_ids: BTreeMap::new(),
            draft: ListingDraft::default(),
            selection: Selection::default(),
            token: TokenView::default(),
            bid_price: DEFAULT_PRICE.to_string(),
            added_file_cid: None,
            added_metadata_cid: None,
            account_poll: AccountPoll::default(),
            session_generation: 0,
            form_generation: 0,
            selection_generation: 0,
        };
        let channels = AppChannels {
            op_rx,
            event_rx,
            log_rx,
        };
        (state, channels)
    }

    /// Contract bound to the active account.
    pub fn active_contract(&self) -> Option<&str> {
        self.account
            .as_ref()
            .and_then(|a| self.bindings.get(a))
            .map(String::as_str)
    }

    pub fn contract_state(&self) -> ContractState {
        match &self.account {
            Some(a) if self.bindings.contains_key(a) => ContractState::Ready,
            Some(a) if self.deploying.contains(a) => ContractState::Deploying,
            _ => ContractState::NoContract,
        }
    }

    /// Token ids minted on `contract`, matching the address in any case.
    pub fn token_ids_for(&self, contract: &str) -> &[TokenId] {
        self.token_ids
            .iter()
            .find(|(c, _)| same_address(c, contract))
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Reset draft, selection and token view to their initial values.
    pub fn reset_view(&mut self) {
        self.draft = ListingDraft::default();
        self.selection = Selection::default();
        self.token = TokenView::default();
        self.bid_price = DEFAULT_PRICE.to_string();
        self.added_file_cid = None;
        self.added_metadata_cid = None;
        self.form_generation += 1;
        self.selection_generation += 1;
    }

    pub fn build_snapshot(&self) -> AppSnapshot {
        let token_ids = self
            .selection
            .contract
            .as_deref()
            .map(|c| self.token_ids_for(c).to_vec())
            .unwrap_or_default();

        AppSnapshot {
            account: self.account.clone(),
            mode: self.mode,
            contract_state: self.contract_state(),
            contract_address: self.active_contract().map(str::to_string),
            contracts: self.bindings.clone(),
            token_ids,
            selection: self.selection.clone(),
            draft: self.draft.clone(),
            added_file_cid: self.added_file_cid.clone(),
            added_metadata_cid: self.added_metadata_cid.clone(),
            token: self.token.clone(),
            bid_price: self.bid_price.clone(),
            can_end: self.token.owned_by(self.account.as_deref()),
            log_capacity: self.event_log.max_display_chars(),
        }
    }

    // ---- Spawning ----

    /// Start a deploy for the active account unless one exists or is running.
    pub fn trigger_deploy(&mut self) -> Result<bool, ValidationError> {
        let account = self.account.clone().ok_or(ValidationError::MissingAccount)?;
        if self.bindings.contains_key(&account) || self.deploying.contains(&account) {
            debug!("deploy for {} ignored: already bound or in flight", account);
            return Ok(false);
        }
        self.deploying.insert(account.clone());
        self.log.push("create contract.");
        info!("deploying contract for {}", account);

        let chain = self.chain.clone();
        let log = self.log.clone();
        let op_tx = self.op_tx.clone();
        tokio::spawn(async move {
            let result = chain.deploy(&account, &log).await;
            let _ = op_tx.send(OpReport::Deployed { account, result }).await;
        });
        Ok(true)
    }

    /// Subscribe to the events of a freshly bound contract. Runs detached so
    /// a slow WebSocket handshake never holds up the binding.
    fn spawn_subscription(&self, address: String) {
        let chain = self.chain.clone();
        let log = self.log.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = chain.subscribe(&address, event_tx).await {
                warn!("subscription to {} failed: {}", address, e);
                log.push(format!("subscribe failed: address[{address}] {e}"));
            }
        });
    }

    fn spawn_account_poll(&mut self) {
        let seq = self.account_poll.begin();
        let wallet = self.wallet.clone();
        let op_tx = self.op_tx.clone();
        tokio::spawn(async move {
            let result = wallet.request_accounts().await;
            let _ = op_tx.send(OpReport::AccountsPolled { seq, result }).await;
        });
    }

    /// Fire the three independent reads for the selected token.
    fn spawn_token_reads(&self, contract: &str, token_id: TokenId) {
        let generation = self.selection_generation;
        let handle = ContractHandle::new(self.chain.clone(), contract);

        let h = handle.clone();
        let tx = self.op_tx.clone();
        tokio::spawn(async move {
            let result = h.owner_of(token_id).await;
            let _ = tx.send(OpReport::OwnerLoaded { generation, result }).await;
        });

        let h = handle.clone();
        let tx = self.op_tx.clone();
        let store = self.store.clone();
        tokio::spawn(async move {
            let result = match h.token_uri(token_id).await {
                Ok(uri) => store.fetch_metadata(&uri).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };
            let _ = tx.send(OpReport::MetadataLoaded { generation, result }).await;
        });

        let tx = self.op_tx.clone();
        tokio::spawn(async move {
            let result = handle.get_info(token_id).await;
            let _ = tx.send(OpReport::InfoLoaded { generation, result }).await;
        });
    }
}

// ---------------------------------------------------------------------------
// Session timers
// ---------------------------------------------------------------------------

/// The three periodic tasks of one account session.
///
/// Dropping a `Session` stops all three; `start` creates fresh ones.
struct Session {
    generation: u64,
    account_poll: Interval,
    log_drain: Interval,
    log_tail: Interval,
}

impl Session {
    fn start(generation: u64, timers: &TimerConfig) -> Self {
        let make = |period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        };
        debug!("starting session generation {}", generation);
        Session {
            generation,
            account_poll: make(timers.account_poll()),
            log_drain: make(timers.log_drain()),
            log_tail: make(timers.log_tail()),
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the coordinator loop until `Quit` or the command channel closes.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    channels: AppChannels,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Coordinator loop started");
    let AppChannels {
        mut op_rx,
        mut event_rx,
        mut log_rx,
    } = channels;

    let mut session = Session::start(state.session_generation, &state.config.timers);
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.build_snapshot())))
        .await;

    loop {
        if session.generation != state.session_generation {
            session = Session::start(state.session_generation, &state.config.timers);
        }

        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            Some(report) = op_rx.recv() => {
                handle_op_report(&mut state, report, &ui_tx).await;
            }

            Some(event) = event_rx.recv() => {
                handle_contract_event(&mut state, event, &ui_tx).await;
            }

            Some(line) = log_rx.recv() => {
                state.event_log.push(line);
            }

            _ = session.account_poll.tick() => {
                state.spawn_account_poll();
            }

            _ = session.log_drain.tick() => {
                if let Some(c) = state.event_log.drain_tick() {
                    let _ = ui_tx.send(UiUpdate::LogAppend(c)).await;
                }
            }

            _ = session.log_tail.tick() => {
                let _ = ui_tx.send(UiUpdate::TailLog).await;
            }
        }
    }

    info!("Coordinator loop exiting");
    Ok(())
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.build_snapshot())))
        .await;
}

async fn alert(ui_tx: &mpsc::Sender<UiUpdate>, err: ValidationError) {
    info!("validation failed: {}", err);
    let _ = ui_tx.send(UiUpdate::Alert(err.to_string())).await;
}

// ---------------------------------------------------------------------------
// User commands
// ---------------------------------------------------------------------------

/// Handle a user command from the TUI.
pub async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::SwitchMode(mode) => {
            info!("Switched to mode: {:?}", mode);
            state.reset_view();
            state.mode = mode;
        }
        UserCommand::Edit { field, edit } => {
            if field == FormField::BidPrice {
                apply_edit(&mut state.bid_price, edit);
            } else {
                state.draft.apply(field, edit);
            }
        }
        UserCommand::Deploy => {
            if let Err(e) = state.trigger_deploy() {
                alert(ui_tx, e).await;
            }
        }
        UserCommand::List => start_listing(state, ui_tx).await,
        UserCommand::SelectContract(contract) => {
            state.selection_generation += 1;
            state.selection = Selection {
                contract,
                token_id: None,
            };
            state.token = TokenView::default();
        }
        UserCommand::SelectToken(token_id) => {
            state.selection_generation += 1;
            state.selection.token_id = token_id;
            state.token = TokenView::default();
            if let Some((contract, id)) = state.selection.complete() {
                let contract = contract.to_string();
                debug!("loading token {} of {}", id, contract);
                state.spawn_token_reads(&contract, id);
            }
        }
        UserCommand::Bid => send_bid(state, ui_tx).await,
        UserCommand::EndAuction => send_auction_end(state, ui_tx).await,
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
    send_snapshot(state, ui_tx).await;
}

async fn start_listing(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let request = match validate_listing(
        state.account.as_deref(),
        state.active_contract(),
        &state.draft,
    ) {
        Ok(r) => r,
        Err(e) => {
            alert(ui_tx, e).await;
            return;
        }
    };

    state.log.push("make nft.");
    let generation = state.form_generation;
    let contract = request.contract.clone();
    let handle = ContractHandle::new(state.chain.clone(), contract.clone());
    let store = state.store.clone();
    let gateway = state.config.ipfs.gateway_url.clone();
    let log = state.log.clone();
    let op_tx = state.op_tx.clone();
    tokio::spawn(async move {
        let result = run_listing(store.as_ref(), &handle, &gateway, request, &log).await;
        let _ = op_tx
            .send(OpReport::ListingFinished {
                generation,
                contract,
                result,
            })
            .await;
    });
}

/// The active account and a complete selection, or the reason there is none.
fn bid_target(state: &AppState) -> Result<(String, String, TokenId), ValidationError> {
    let account = state.account.clone().ok_or(ValidationError::MissingAccount)?;
    let (contract, token_id) = state
        .selection
        .complete()
        .ok_or(ValidationError::NoSelection)?;
    Ok((account, contract.to_string(), token_id))
}

async fn send_bid(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let (account, contract, token_id) = match bid_target(state) {
        Ok(t) => t,
        Err(e) => return alert(ui_tx, e).await,
    };
    let Some(value) = to_wei(&state.bid_price) else {
        let err = ValidationError::InvalidAmount {
            field: "bid",
            value: state.bid_price.clone(),
        };
        return alert(ui_tx, err).await;
    };

    state.log.push(format!(
        "send bid. account[{account}] contract[{contract}] tokenId[{token_id}] bidPrice[{}]",
        state.bid_price
    ));
    let handle = ContractHandle::new(state.chain.clone(), contract);
    let log = state.log.clone();
    let op_tx = state.op_tx.clone();
    tokio::spawn(async move {
        let result = handle.bid(&account, token_id, value, &log).await;
        let _ = op_tx
            .send(OpReport::TxSettled {
                action: "bid",
                result,
            })
            .await;
    });
}

async fn send_auction_end(state: &mut AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let (account, contract, token_id) = match bid_target(state) {
        Ok(t) => t,
        Err(e) => return alert(ui_tx, e).await,
    };

    state.log.push(format!(
        "send auction end. account[{account}] contract[{contract}] tokenId[{token_id}]"
    ));
    let handle = ContractHandle::new(state.chain.clone(), contract);
    let log = state.log.clone();
    let op_tx = state.op_tx.clone();
    tokio::spawn(async move {
        let result = handle.auction_end(&account, token_id, &log).await;
        let _ = op_tx
            .send(OpReport::TxSettled {
                action: "auction end",
                result,
            })
            .await;
    });
}

// ---------------------------------------------------------------------------
// Operation reports
// ---------------------------------------------------------------------------

/// Apply the result of a spawned network operation.
pub async fn handle_op_report(
    state: &mut AppState,
    report: OpReport,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match report {
        OpReport::AccountsPolled { seq, result } => {
            let accounts = match result {
                Ok(a) => a,
                Err(e) => {
                    state.account_poll.accept(seq);
                    debug!("account poll failed: {}", e);
                    return;
                }
            };
            if !state.account_poll.accept(seq) {
                debug!("discarding stale account poll #{}", seq);
                return;
            }
            let polled = active_account(&accounts);
            if !account_changed(state.account.as_deref(), polled.as_deref()) {
                return;
            }
            apply_account_change(state, polled);
        }
        OpReport::Deployed { account, result } => {
            state.deploying.remove(&account);
            match result {
                Ok(address) => {
                    if state.bindings.contains_key(&account) {
                        warn!("ignoring second contract {} for {}", address, account);
                    } else {
                        info!("contract {} bound to {}", address, account);
                        state.bindings.insert(account, address.clone());
                        state.spawn_subscription(address);
                    }
                }
                Err(e) => warn!("deploy for {} failed: {}", account, e),
            }
        }
        OpReport::ListingFinished {
            generation,
            contract,
            result,
        } => {
            let current = generation == state.form_generation;
            match result {
                Ok(outcome) => {
                    state
                        .token_ids
                        .entry(contract)
                        .or_default()
                        .push(outcome.token_id);
                    if current {
                        state.added_file_cid = Some(outcome.asset_cid.to_string());
                        state.added_metadata_cid = Some(outcome.metadata_cid.to_string());
                    }
                }
                Err(ListingError::Invalid(e)) => {
                    if current {
                        alert(ui_tx, e).await;
                    }
                }
                // The pipeline has already logged the failing step.
                Err(e) => {
                    warn!("listing failed: {}", e);
                    let orphaned = e.orphaned();
                    if let [asset, metadata] = orphaned.as_slice() {
                        if current {
                            state.added_file_cid = Some(asset.to_string());
                            state.added_metadata_cid = Some(metadata.to_string());
                        }
                    }
                }
            }
        }
        OpReport::OwnerLoaded { generation, result } => {
            if generation != state.selection_generation {
                debug!("discarding stale owner read");
                return;
            }
            match result {
                Ok(owner) => state.token.owner = owner,
                Err(e) => warn!("ownerOf failed: {}", e),
            }
        }
        OpReport::MetadataLoaded { generation, result } => {
            if generation != state.selection_generation {
                debug!("discarding stale metadata read");
                return;
            }
            match result {
                Ok(metadata) => state.token.metadata = Some(metadata),
                Err(e) => warn!("metadata load failed: {}", e),
            }
        }
        OpReport::InfoLoaded { generation, result } => {
            if generation != state.selection_generation {
                debug!("discarding stale getInfo read");
                return;
            }
            match result {
                Ok(info) => {
                    state.token.apply_info(&info);
                    state.bid_price = from_wei(info.price);
                }
                Err(e) => warn!("getInfo failed: {}", e),
            }
        }
        OpReport::TxSettled { action, result } => match result {
            Ok(receipt) => info!("{} settled in tx {}", action, receipt.tx_hash),
            Err(e) => warn!("{} failed: {}", action, e),
        },
    }
    send_snapshot(state, ui_tx).await;
}

/// Switch to a new active account: reset the view, restart the session
/// timers, and optionally start a deploy.
fn apply_account_change(state: &mut AppState, account: Option<String>) {
    info!(
        "active account changed: {:?} -> {:?}",
        state.account, account
    );
    state.account = account;
    state.reset_view();
    state.session_generation += 1;

    if state.config.session.auto_deploy
        && state.account.is_some()
        && state.contract_state() == ContractState::NoContract
    {
        if let Err(e) = state.trigger_deploy() {
            debug!("auto deploy skipped: {}", e);
        }
    }
}

// ---------------------------------------------------------------------------
// Contract events
// ---------------------------------------------------------------------------

/// Apply an event from one of the session's contract subscriptions.
///
/// Mint events are only logged. Auction events update the token view when
/// they concern the current selection in bidding mode and are dropped
/// otherwise.
pub async fn handle_contract_event(
    state: &mut AppState,
    event: ContractEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    if let EventPayload::Mint {
        token_id,
        creater,
        metadata_uri,
        price,
        auction_end_time,
    } = &event.payload
    {
        let end = i64::try_from(end_time_ms(*auction_end_time))
            .ok()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| auction_end_time.to_string());
        state.log.push(format!(
            "mint event: tokenId[{token_id}] creater[{creater}] metadataUri[{metadata_uri}] price(eth)[{}] auctionEndTime[{end}]",
            from_wei(*price)
        ));
        return;
    }

    if state.mode != Mode::Bidding
        || !state
            .selection
            .matches(&event.address, event.payload.token_id())
    {
        debug!(
            "dropping event for {} token {}: not selected",
            event.address,
            event.payload.token_id()
        );
        return;
    }

    if state.token.apply_event(&event.payload) {
        send_snapshot(state, ui_tx).await;
    }
}
