mod listener;
mod pump;
mod settings;

pub use listener::{ChannelListener, Origin};
pub use settings::BridgeSettings;

use domain::command::{CallbackId, TextJob};
use domain::discovery::{DiscoveryFilter, DiscoveryHandle};
use domain::driver::{ConnectionState, DeviceScanner, PrinterDriver};
use domain::error::{BridgeError, Result};
use domain::event::EventPublisher;
use domain::printer::{PrinterLanguage, PrinterSeries, PrinterStatus, PrinterTarget, Session};
use domain::{BridgeEvent, DriverFault};
use infrastructure::{BridgeConfig, DriverFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::callback::CallbackRouter;
use crate::command::{CommandDispatcher, CommandHandle, CommandRequest, Dispatch, ImageOptions};
use crate::discovery::{DeviceSink, DiscoveryController};
use crate::session::SessionManager;
use listener::NotificationQueue;

/// Everything the bridge mutates, guarded by one lock
struct BridgeState {
    session: SessionManager,
    discovery: DiscoveryController,
    dispatcher: CommandDispatcher,
    router: CallbackRouter,
}

struct BridgeInner {
    state: Mutex<BridgeState>,
    notifications: NotificationQueue,
    publisher: Arc<dyn EventPublisher>,
    settings: BridgeSettings,
    shutdown: CancellationToken,
}

/// Device-session façade over one printer driver.
///
/// Cheap to clone; every clone drives the same session. Driver notifications
/// are applied by a background pump spawned in [`PrinterBridge::new`].
#[derive(Clone)]
pub struct PrinterBridge {
    inner: Arc<BridgeInner>,
}

impl PrinterBridge {
    /// Build the bridge and spawn its notification pump.
    /// Must be called from within a Tokio runtime.
    pub fn new(
        printer: Box<dyn PrinterDriver>,
        scanner: Box<dyn DeviceScanner>,
        publisher: Arc<dyn EventPublisher>,
        settings: BridgeSettings,
    ) -> Self {
        let (notifications, rx) = NotificationQueue::new();
        let state = BridgeState {
            session: SessionManager::new(printer),
            discovery: DiscoveryController::new(
                scanner,
                settings.stop_retry_limit,
                settings.stop_retry_delay,
            ),
            dispatcher: CommandDispatcher::new(settings.limits, settings.check_status),
            router: CallbackRouter::default(),
        };
        let inner = Arc::new(BridgeInner {
            state: Mutex::new(state),
            notifications,
            publisher,
            settings,
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(pump::run(
            Arc::downgrade(&inner),
            rx,
            inner.shutdown.clone(),
        ));
        Self { inner }
    }

    /// Build the bridge with the drivers named by `config`
    pub fn from_config(
        config: &BridgeConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> anyhow::Result<Self> {
        let drivers = DriverFactory::create(config)?;
        info!(
            driver = drivers.printer.driver_type(),
            "Printer bridge configured"
        );
        Ok(Self::new(
            drivers.printer,
            drivers.scanner,
            publisher,
            BridgeSettings::from_config(config),
        ))
    }

    // --- Discovery ---

    pub async fn start_discovery(
        &self,
        filter: DiscoveryFilter,
        sink: Box<dyn DeviceSink>,
    ) -> Result<DiscoveryHandle> {
        let started = {
            let mut state = self.lock().await;
            let notifications = &self.inner.notifications;
            state
                .discovery
                .start(&filter, sink, |scan| notifications.listener(Origin::Scan(scan)))
                .await?
        };
        if let Some(timeout) = self.inner.settings.discovery_timeout {
            self.arm_scan_timer(started.handle.clone(), started.timer, timeout);
        }
        Ok(started.handle)
    }

    pub async fn stop_discovery(&self, handle: &DiscoveryHandle) -> Result<()> {
        let ended = {
            let mut state = self.lock().await;
            state.discovery.stop(handle).await?
        };
        if ended {
            self.publish(BridgeEvent::discovery_ended(handle.clone(), "stopped"))
                .await;
        }
        Ok(())
    }

    pub async fn active_discovery(&self) -> Option<DiscoveryHandle> {
        self.lock().await.discovery.active_handle().cloned()
    }

    // --- Session ---

    pub async fn connect(
        &self,
        target: &str,
        series: PrinterSeries,
        language: PrinterLanguage,
    ) -> Result<Session> {
        let (target, driver, attempt) = {
            let mut state = self.lock().await;
            if !state.session.connection_state().can_connect() {
                return Err(BridgeError::AlreadyConnected);
            }
            let target = PrinterTarget::new(target)?;
            let (driver, attempt) = state.session.begin_connect()?;
            (target, driver, attempt)
        };

        info!(printer = %target, series = %series, "🔌 Connecting to printer...");
        // The attempt owns the driver on its own task so the driver always
        // returns to the session manager, even if this future is dropped
        let abandoned = CancellationToken::new();
        let _abandon_on_drop = abandoned.clone().drop_guard();
        let bridge = self.clone();
        let task = tokio::spawn(async move {
            bridge
                .run_connect(driver, attempt, target, series, language, abandoned)
                .await
        });
        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Connection attempt task failed");
                Err(BridgeError::DriverError(DriverFault::Io(e.to_string())))
            }
        }
    }

    async fn run_connect(
        &self,
        mut driver: Box<dyn PrinterDriver>,
        attempt: u64,
        target: PrinterTarget,
        series: PrinterSeries,
        language: PrinterLanguage,
        abandoned: CancellationToken,
    ) -> Result<Session> {
        let listener = self.inner.notifications.listener(Origin::Session(attempt));
        let outcome = tokio::select! {
            result = SessionManager::open(
                driver.as_mut(),
                target.clone(),
                series,
                language,
                listener,
                self.inner.settings.connect_timeout,
            ) => Some(result),
            _ = abandoned.cancelled() => None,
        };

        let result = match outcome {
            Some(result) if !abandoned.is_cancelled() => result,
            outcome => {
                warn!(printer = %target, "Connection attempt abandoned by caller, rolling back");
                // A failed attempt already left the driver closed
                if !matches!(outcome, Some(Err(_))) {
                    if let Err(e) = driver.disconnect().await {
                        warn!(printer = %target, error = %e, "Cleanup after abandoned connect failed");
                    }
                }
                self.lock().await.session.complete_connect(driver, None);
                return Err(BridgeError::DriverError(DriverFault::Io(
                    "connection attempt abandoned".to_string(),
                )));
            }
        };

        self.lock()
            .await
            .session
            .complete_connect(driver, result.as_ref().ok().cloned());

        match result {
            Ok(session) => {
                self.publish(BridgeEvent::session_opened(
                    session.target.clone(),
                    session.series,
                ))
                .await;
                Ok(session)
            }
            Err(e) => {
                error!(printer = %target, error = %e, "❌ Connection failed");
                Err(e)
            }
        }
    }

    /// Close the session. In-flight commands are aborted with `ConnectionLost`.
    pub async fn disconnect(&self) -> Result<Session> {
        let (session, mut events) = {
            let mut guard = self.lock().await;
            let state = &mut *guard;
            if !state.session.is_connected() {
                return Err(BridgeError::NotConnected);
            }
            let events = state
                .dispatcher
                .abort_all(&mut state.router, BridgeError::ConnectionLost);
            let session = state.session.disconnect().await?;
            (session, events)
        };
        events.insert(
            0,
            BridgeEvent::session_closed(session.target.clone(), "disconnect requested"),
        );
        self.publish_all(events).await;
        Ok(session)
    }

    pub async fn session(&self) -> Option<Session> {
        self.lock().await.session.session().cloned()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.lock().await.session.connection_state()
    }

    pub async fn printer_status(&self) -> Result<PrinterStatus> {
        self.lock().await.session.status().await
    }

    pub fn supported_models() -> Vec<&'static str> {
        PrinterSeries::supported_models()
    }

    // --- Commands ---

    pub async fn print_text(&self, job: TextJob) -> Result<CommandHandle> {
        self.dispatch(CommandRequest::Text(job)).await
    }

    pub async fn print_image(&self, data: Vec<u8>, options: ImageOptions) -> Result<CommandHandle> {
        self.dispatch(CommandRequest::Image { data, options }).await
    }

    pub async fn send_data(&self, bytes: Vec<u8>) -> Result<CommandHandle> {
        self.dispatch(CommandRequest::Raw(bytes)).await
    }

    /// Callback id of the command currently in flight
    pub async fn in_flight(&self) -> Option<CallbackId> {
        self.lock()
            .await
            .dispatcher
            .in_flight()
            .map(|flight| flight.callback_id.clone())
    }

    async fn dispatch(&self, request: CommandRequest) -> Result<CommandHandle> {
        let dispatch = {
            let mut guard = self.lock().await;
            let state = &mut *guard;
            state
                .dispatcher
                .dispatch(&mut state.session, &mut state.router, request)
                .await?
        };
        match dispatch {
            Dispatch::Accepted { handle, watchdog } => {
                self.arm_watchdog(handle.callback_id().clone(), watchdog);
                Ok(handle)
            }
            Dispatch::Resolved { handle, event } => {
                self.publish(event).await;
                Ok(handle)
            }
        }
    }

    /// Stop discovery, close the session and stop the notification pump
    pub async fn shutdown(&self) {
        if let Some(handle) = self.active_discovery().await {
            if let Err(e) = self.stop_discovery(&handle).await {
                warn!(error = %e, "Discovery stop during shutdown failed");
            }
        }
        match self.disconnect().await {
            Ok(_) | Err(BridgeError::NotConnected) => {}
            Err(e) => warn!(error = %e, "Disconnect during shutdown failed"),
        }
        self.inner.shutdown.cancel();
        info!("Printer bridge shut down");
    }

    // --- Internals ---

    async fn lock(&self) -> MutexGuard<'_, BridgeState> {
        self.inner.state.lock().await
    }

    fn arm_watchdog(&self, callback_id: CallbackId, token: CancellationToken) {
        let bridge = Arc::downgrade(&self.inner);
        let timeout = self.inner.settings.command_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if let Some(inner) = bridge.upgrade() {
                        PrinterBridge { inner }.expire_command(&callback_id).await;
                    }
                }
            }
        });
    }

    async fn expire_command(&self, callback_id: &CallbackId) {
        let event = {
            let mut guard = self.lock().await;
            let state = &mut *guard;
            state.dispatcher.expire(&mut state.router, callback_id)
        };
        if let Some(event) = event {
            self.publish(event).await;
        }
    }

    fn arm_scan_timer(&self, handle: DiscoveryHandle, token: CancellationToken, timeout: Duration) {
        let bridge = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if let Some(inner) = bridge.upgrade() {
                        PrinterBridge { inner }.expire_scan(&handle).await;
                    }
                }
            }
        });
    }

    async fn expire_scan(&self, handle: &DiscoveryHandle) {
        let ended = self.lock().await.discovery.expire(handle).await;
        if let Some(handle) = ended {
            self.publish(BridgeEvent::discovery_ended(handle, "timed out"))
                .await;
        }
    }

    async fn publish(&self, event: BridgeEvent) {
        if let Err(e) = self.inner.publisher.publish(event).await {
            warn!(error = %e, "Failed to publish bridge event");
        }
    }

    async fn publish_all(&self, events: Vec<BridgeEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.inner.publisher.publish_batch(events).await {
            warn!(error = %e, "Failed to publish bridge events");
        }
    }
}
