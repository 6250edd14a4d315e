//! Background inbox engine.
//!
//! One task owns the notification store, the view state machine and the
//! popup notifier. Every state change happens on that task:
//! - user actions arrive through `InboxHandle` over an mpsc channel
//! - fetches and mark-read requests run as spawned tasks and report back
//!   through an internal channel, so their results are applied in arrival
//!   order on the same loop
//! - a fixed interval (5 minutes by default) schedules refreshes
//!
//! Nothing in flight is cancelled when the view moves on.

use crate::config::{InboxConfig, MAX_REFRESH_INTERVAL_SECS};
use crate::error::AppError;
use crate::models::notification::{NotificationId, NotificationMessage};
use crate::models::snapshot::{InboxSnapshot, InboxTab};
use crate::services::app_launcher::AppLauncher;
use crate::services::inbox_events::{
    ErrorSource, InboxErrorPayload, InboxEvent, InboxUpdatedPayload, PopupPayload,
};
use crate::services::inbox_view::{InboxView, ViewEffect, ViewEvent};
use crate::services::notification_client::{Ack, NotificationApi};
use crate::services::notification_store::{NotificationStore, SnapshotApplied};
use crate::services::popup::PopupNotifier;
use crate::services::read_sync::ReadStateSynchronizer;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio::time::{self, Instant, Interval};

/// Query parameters the billing app is opened with.
const BILLING_QUERY: &[(&str, &str)] = &[("openRecharge", "true")];

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// User actions on the inbox and popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxAction {
    Open,
    Close,
    SwitchTab(InboxTab),
    Select(NotificationId),
    Back,
    DetailCharge,
    PopupViewDetail,
    PopupDismiss,
    PopupCharge,
}

/// Observable engine state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxState {
    pub view: InboxView,
    /// Popup currently rendered (only while the inbox is closed).
    pub popup: Option<NotificationMessage>,
    pub unread_count: usize,
    pub read_count: usize,
    pub locale: String,
    pub last_refreshed: Option<i64>,
    pub last_error: Option<String>,
}

type RefreshReply = oneshot::Sender<Result<SnapshotApplied, AppError>>;
type AckReply = oneshot::Sender<Result<Ack, AppError>>;

/// Commands that can be sent to the engine.
#[derive(Debug)]
pub enum InboxCommand {
    Act(InboxAction, oneshot::Sender<InboxState>),
    Refresh(RefreshReply),
    MarkRead(BTreeSet<NotificationId>, AckReply),
    MarkAllRead(AckReply),
    SetLocale(String),
    GetState(oneshot::Sender<InboxState>),
    UpdateConfig(InboxConfig),
    Stop,
}

/// Results of spawned network work.
#[derive(Debug)]
enum Settled {
    Fetch {
        result: Result<Vec<NotificationMessage>, AppError>,
        reply: Option<RefreshReply>,
    },
    Mutation {
        result: Result<Ack, AppError>,
        reply: Option<AckReply>,
    },
}

/// Lightweight handle for controlling the inbox engine.
///
/// Cheap to clone; all calls are messages to the engine task.
#[derive(Clone)]
pub struct InboxHandle {
    command_tx: mpsc::Sender<InboxCommand>,
    events: broadcast::Sender<InboxEvent>,
    snapshots: watch::Receiver<Arc<InboxSnapshot>>,
    config: Arc<RwLock<InboxConfig>>,
}

fn engine_stopped() -> AppError {
    AppError::internal("Inbox engine not running")
}

impl InboxHandle {
    async fn send(&self, command: InboxCommand) -> Result<(), AppError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| engine_stopped())
    }

    /// Run a user action; returns the state after it was applied.
    pub async fn act(&self, action: InboxAction) -> Result<InboxState, AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(InboxCommand::Act(action, tx)).await?;
        rx.await.map_err(|_| engine_stopped())
    }

    pub async fn open(&self) -> Result<InboxState, AppError> {
        self.act(InboxAction::Open).await
    }

    pub async fn close(&self) -> Result<InboxState, AppError> {
        self.act(InboxAction::Close).await
    }

    pub async fn switch_tab(&self, tab: InboxTab) -> Result<InboxState, AppError> {
        self.act(InboxAction::SwitchTab(tab)).await
    }

    /// Open a message from the list; marks it read if it was unread.
    pub async fn select(&self, id: impl Into<NotificationId>) -> Result<InboxState, AppError> {
        self.act(InboxAction::Select(id.into())).await
    }

    pub async fn back(&self) -> Result<InboxState, AppError> {
        self.act(InboxAction::Back).await
    }

    pub async fn detail_charge(&self) -> Result<InboxState, AppError> {
        self.act(InboxAction::DetailCharge).await
    }

    pub async fn popup_view_detail(&self) -> Result<InboxState, AppError> {
        self.act(InboxAction::PopupViewDetail).await
    }

    pub async fn popup_dismiss(&self) -> Result<InboxState, AppError> {
        self.act(InboxAction::PopupDismiss).await
    }

    pub async fn popup_charge(&self) -> Result<InboxState, AppError> {
        self.act(InboxAction::PopupCharge).await
    }

    /// Refresh now and wait for the outcome.
    pub async fn refresh(&self) -> Result<SnapshotApplied, AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(InboxCommand::Refresh(tx)).await?;
        rx.await.map_err(|_| engine_stopped())?
    }

    /// Mark `ids` read and wait for the server's answer.
    pub async fn mark_read<I>(&self, ids: I) -> Result<Ack, AppError>
    where
        I: IntoIterator<Item = NotificationId>,
    {
        let (tx, rx) = oneshot::channel();
        self.send(InboxCommand::MarkRead(ids.into_iter().collect(), tx))
            .await?;
        rx.await.map_err(|_| engine_stopped())?
    }

    /// Mark everything currently unread as read.
    pub async fn mark_all_read(&self) -> Result<Ack, AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(InboxCommand::MarkAllRead(tx)).await?;
        rx.await.map_err(|_| engine_stopped())?
    }

    /// Switch locale; triggers a refresh when it changed.
    pub async fn set_locale(&self, locale: impl Into<String>) -> Result<(), AppError> {
        self.send(InboxCommand::SetLocale(locale.into())).await
    }

    pub async fn state(&self) -> Result<InboxState, AppError> {
        let (tx, rx) = oneshot::channel();
        self.send(InboxCommand::GetState(tx)).await?;
        rx.await.map_err(|_| engine_stopped())
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<InboxSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<Arc<InboxSnapshot>> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InboxEvent> {
        self.events.subscribe()
    }

    /// Update the configuration. The refresh interval takes effect immediately.
    pub async fn update_config(&self, config: InboxConfig) -> Result<(), AppError> {
        config.validate()?;
        *self.config.write().await = config.clone();
        self.send(InboxCommand::UpdateConfig(config)).await
    }

    pub async fn get_config(&self) -> InboxConfig {
        self.config.read().await.clone()
    }

    /// Stop the engine. In-flight requests finish but are no longer applied.
    pub async fn stop(&self) -> Result<(), AppError> {
        self.send(InboxCommand::Stop).await
    }
}

/// Inbox engine owning all mutable inbox state.
pub struct InboxEngine<A: NotificationApi> {
    api: Arc<A>,
    sync: ReadStateSynchronizer<A>,
    store: NotificationStore,
    view: InboxView,
    popup: PopupNotifier,
    launcher: Arc<dyn AppLauncher>,
    config: InboxConfig,
    events: broadcast::Sender<InboxEvent>,
    settled_tx: mpsc::UnboundedSender<Settled>,
}

impl<A: NotificationApi> InboxEngine<A> {
    /// Start the engine on the current tokio runtime.
    ///
    /// The first refresh runs immediately; later ones every
    /// `config.interval_secs`.
    pub fn start_background(
        api: Arc<A>,
        launcher: Arc<dyn AppLauncher>,
        config: InboxConfig,
    ) -> InboxHandle {
        let (command_tx, command_rx) = mpsc::channel::<InboxCommand>(32);
        let (settled_tx, settled_rx) = mpsc::unbounded_channel::<Settled>();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let store = NotificationStore::new(config.locale.clone());
        let snapshots = store.subscribe();
        let shared_config = Arc::new(RwLock::new(config.clone()));

        let engine = InboxEngine {
            sync: ReadStateSynchronizer::new(api.clone()),
            api,
            store,
            view: InboxView::Closed,
            popup: PopupNotifier::new(),
            launcher,
            config,
            events: events.clone(),
            settled_tx,
        };

        tokio::spawn(engine.run(command_rx, settled_rx));

        InboxHandle {
            command_tx,
            events,
            snapshots,
            config: shared_config,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<InboxCommand>,
        mut settled: mpsc::UnboundedReceiver<Settled>,
    ) {
        log::info!(
            "[inbox] Engine started, interval={}s",
            self.config.interval_secs
        );

        self.spawn_refresh(None);
        let mut interval = Self::interval(self.config.interval_secs);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    log::debug!("[inbox] Periodic refresh");
                    self.spawn_refresh(None);
                }
                Some(outcome) = settled.recv() => self.on_settled(outcome),
                command = commands.recv() => match command {
                    Some(InboxCommand::Stop) | None => break,
                    Some(command) => self.on_command(command, &mut interval),
                },
            }
        }

        log::info!("[inbox] Engine stopped");
    }

    /// Interval whose first tick is one period from now.
    ///
    /// The period is clamped to `1..=MAX_REFRESH_INTERVAL_SECS`; configs
    /// handed to `start_background` are not validated.
    fn interval(secs: u64) -> Interval {
        let period = Duration::from_secs(secs.clamp(1, MAX_REFRESH_INTERVAL_SECS));
        time::interval_at(Instant::now() + period, period)
    }

    fn on_command(&mut self, command: InboxCommand, interval: &mut Interval) {
        match command {
            InboxCommand::Act(action, reply) => {
                self.on_action(action);
                let _ = reply.send(self.state());
            }
            InboxCommand::Refresh(reply) => self.spawn_refresh(Some(reply)),
            InboxCommand::MarkRead(ids, reply) => self.dispatch_mark_read(ids, Some(reply)),
            InboxCommand::MarkAllRead(reply) => {
                let snapshot = self.store.current_snapshot();
                log::info!(
                    "[inbox] Marking {} unread notification(s) read",
                    snapshot.unread_count()
                );
                if self.popup.dismiss() {
                    self.emit_popup();
                }
                self.dispatch_mark_all_read(snapshot, reply);
            }
            InboxCommand::SetLocale(locale) => {
                if self.store.set_locale(locale) {
                    log::info!("[inbox] Locale changed to {}", self.store.locale());
                    self.spawn_refresh(None);
                }
            }
            InboxCommand::GetState(reply) => {
                let _ = reply.send(self.state());
            }
            InboxCommand::UpdateConfig(config) => {
                if config.interval_secs != self.config.interval_secs {
                    log::info!("[inbox] Config updated, interval={}s", config.interval_secs);
                    *interval = Self::interval(config.interval_secs);
                }
                if self.store.set_locale(config.locale.clone()) {
                    self.spawn_refresh(None);
                }
                self.config = config;
            }
            // Handled by the loop.
            InboxCommand::Stop => {}
        }
    }

    fn on_action(&mut self, action: InboxAction) {
        match action {
            InboxAction::Open => self.apply_view_event(ViewEvent::Open),
            InboxAction::Close => self.apply_view_event(ViewEvent::Close),
            InboxAction::SwitchTab(tab) => self.apply_view_event(ViewEvent::SwitchTab(tab)),
            InboxAction::Back => self.apply_view_event(ViewEvent::Back),
            InboxAction::DetailCharge => self.apply_view_event(ViewEvent::Charge),
            InboxAction::Select(id) => {
                let snapshot = self.store.current_snapshot();
                match snapshot.find(&id) {
                    Some(message) => self.apply_view_event(ViewEvent::Select(message.clone())),
                    None => log::warn!("[inbox] Selected unknown notification {}", id),
                }
            }
            InboxAction::PopupViewDetail => {
                if let Some(outcome) = self.popup.view_detail() {
                    self.emit_popup();
                    self.run_effects(outcome.effects);
                    if let Some(event) = outcome.view_event {
                        self.apply_view_event(event);
                    }
                }
            }
            InboxAction::PopupDismiss => {
                if self.popup.dismiss() {
                    self.emit_popup();
                }
            }
            InboxAction::PopupCharge => {
                if let Some(outcome) = self.popup.charge() {
                    self.emit_popup();
                    self.run_effects(outcome.effects);
                }
            }
        }
    }

    fn apply_view_event(&mut self, event: ViewEvent) {
        let snapshot = self.store.current_snapshot();
        let view = std::mem::take(&mut self.view);
        let transition = view.transition(event, &snapshot);
        self.view = transition.view;

        if transition.accepted {
            self.emit(InboxEvent::ViewChanged(self.view.clone()));
            // A popup held while the inbox was open shows up again on close.
            if self.view.is_closed() && self.popup.current().is_some() {
                self.emit_popup();
            }
        }
        self.run_effects(transition.effects);
    }

    fn run_effects(&mut self, effects: Vec<ViewEffect>) {
        for effect in effects {
            match effect {
                ViewEffect::MarkRead(ids) => {
                    self.dispatch_mark_read(ids.into_iter().collect(), None)
                }
                ViewEffect::DismissPopup => {
                    if self.popup.dismiss() {
                        self.emit_popup();
                    }
                }
                ViewEffect::LaunchBilling => self.launch_billing(),
            }
        }
    }

    fn launch_billing(&self) {
        match self
            .launcher
            .open_app(&self.config.billing_app_key, BILLING_QUERY)
        {
            Ok(()) => {}
            Err(e) if e.is_missing_collaborator() => {
                log::info!(
                    "[inbox] Billing app {} not installed, skipping",
                    self.config.billing_app_key
                );
            }
            Err(e) => {
                log::warn!("[inbox] Failed to open billing app: {}", e);
                self.emit_error(ErrorSource::Launch, &e);
            }
        }
    }

    fn spawn_refresh(&self, reply: Option<RefreshReply>) {
        let api = self.api.clone();
        let tx = self.settled_tx.clone();
        tokio::spawn(async move {
            let result = api.list().await;
            let _ = tx.send(Settled::Fetch { result, reply });
        });
    }

    fn dispatch_mark_read(&self, ids: BTreeSet<NotificationId>, reply: Option<AckReply>) {
        let sync = self.sync.clone();
        let tx = self.settled_tx.clone();
        tokio::spawn(async move {
            let result = sync.mark_read(ids).await;
            let _ = tx.send(Settled::Mutation { result, reply });
        });
    }

    /// Mark read what is unread in `snapshot`; later arrivals stay unread.
    fn dispatch_mark_all_read(&self, snapshot: Arc<InboxSnapshot>, reply: AckReply) {
        let sync = self.sync.clone();
        let tx = self.settled_tx.clone();
        tokio::spawn(async move {
            let result = sync.mark_all_unread_as_read(&snapshot).await;
            let _ = tx.send(Settled::Mutation {
                result,
                reply: Some(reply),
            });
        });
    }

    fn on_settled(&mut self, outcome: Settled) {
        match outcome {
            Settled::Fetch { result, reply } => {
                let result = self.store.apply_fetch(result);
                match &result {
                    Ok(applied) => self.on_snapshot(applied.clone()),
                    Err(e) => self.emit_error(ErrorSource::Refresh, e),
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Settled::Mutation { result, reply } => {
                if let Err(e) = &result {
                    self.emit_error(ErrorSource::MarkRead, e);
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
                // Pull authoritative state whether or not the server accepted.
                self.spawn_refresh(None);
            }
        }
    }

    fn on_snapshot(&mut self, applied: SnapshotApplied) {
        let snapshot = self.store.current_snapshot();
        let popup_changed = self
            .popup
            .reconcile(snapshot.popup_candidate.as_ref(), applied.new_popup);

        self.emit(InboxEvent::Updated(InboxUpdatedPayload {
            unread_count: applied.unread_count,
            read_count: applied.read_count,
            locale: snapshot.locale.clone(),
        }));
        if popup_changed {
            self.emit_popup();
        }
    }

    fn state(&self) -> InboxState {
        let snapshot = self.store.current_snapshot();
        InboxState {
            view: self.view.clone(),
            popup: self.popup.visible(&self.view).cloned(),
            unread_count: snapshot.unread_count(),
            read_count: snapshot.read_count(),
            locale: self.store.locale().to_string(),
            last_refreshed: snapshot.fetched_at,
            last_error: self.store.last_error().map(str::to_string),
        }
    }

    fn emit(&self, event: InboxEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_popup(&self) {
        let snapshot = self.store.current_snapshot();
        let message = self
            .popup
            .visible(&self.view)
            .map(|m| snapshot.display(m));
        self.emit(InboxEvent::Popup(PopupPayload { message }));
    }

    fn emit_error(&self, source: ErrorSource, error: &AppError) {
        self.emit(InboxEvent::Error(InboxErrorPayload {
            source,
            message: error.to_string(),
        }));
    }
}
