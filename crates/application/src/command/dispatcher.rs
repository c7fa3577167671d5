use chrono::{DateTime, Utc};
use domain::command::{
    CallbackId, CommandKind, CommandOutcome, CommandPayload, CompletionReport, Halftone,
    ImageJob, ImageMode, JobId, PayloadLimits, TextJob, validate_raw,
};
use domain::error::{BridgeError, Result};
use domain::{BridgeEvent, DriverFault};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::image_probe;
use crate::callback::{CallbackRouter, Completion};
use crate::session::SessionManager;

/// Rendering options sent along with an image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub mode: ImageMode,
    pub halftone: Halftone,
    pub cut: bool,
}

/// Command as requested by a caller, before validation
#[derive(Debug, Clone)]
pub enum CommandRequest {
    Text(TextJob),
    Image { data: Vec<u8>, options: ImageOptions },
    Raw(Vec<u8>),
}

/// Caller's token for a dispatched command
#[derive(Debug)]
pub struct CommandHandle {
    kind: CommandKind,
    completion: Completion,
}

impl CommandHandle {
    pub fn callback_id(&self) -> &CallbackId {
        self.completion.callback_id()
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Wait for the command's terminal outcome
    pub async fn wait(self) -> CommandOutcome {
        self.completion.wait().await
    }
}

/// Command accepted by the driver and awaiting completion
#[derive(Debug)]
pub struct InFlight {
    pub callback_id: CallbackId,
    pub job_id: JobId,
    pub kind: CommandKind,
    pub accepted_at: DateTime<Utc>,
    watchdog: CancellationToken,
}

/// Result of a dispatch that passed the synchronous checks
pub enum Dispatch {
    /// The driver accepted the job; arm the watchdog with this token
    Accepted {
        handle: CommandHandle,
        watchdog: CancellationToken,
    },
    /// The command failed before reaching the printer
    Resolved {
        handle: CommandHandle,
        event: BridgeEvent,
    },
}

/// Validates commands and keeps at most one in flight
pub struct CommandDispatcher {
    limits: PayloadLimits,
    check_status: bool,
    in_flight: Option<InFlight>,
}

impl CommandDispatcher {
    pub fn new(limits: PayloadLimits, check_status: bool) -> Self {
        Self {
            limits,
            check_status,
            in_flight: None,
        }
    }

    pub fn in_flight(&self) -> Option<&InFlight> {
        self.in_flight.as_ref()
    }

    /// Turn a request into a validated driver payload
    pub fn prepare(&self, request: CommandRequest) -> Result<CommandPayload> {
        match request {
            CommandRequest::Text(job) => {
                job.validate(&self.limits)?;
                Ok(CommandPayload::Text(job))
            }
            CommandRequest::Image { data, options } => {
                if data.is_empty() {
                    return Err(BridgeError::InvalidPayload("Image is empty".to_string()));
                }
                if data.len() > self.limits.max_image_bytes {
                    return Err(BridgeError::InvalidPayload(format!(
                        "Image too large: {} bytes (max {})",
                        data.len(),
                        self.limits.max_image_bytes
                    )));
                }
                let info = image_probe::probe(&data)?;
                Ok(CommandPayload::Image(ImageJob {
                    data,
                    format: info.format,
                    width: info.width,
                    height: info.height,
                    mode: options.mode,
                    halftone: options.halftone,
                    cut: options.cut,
                }))
            }
            CommandRequest::Raw(bytes) => {
                validate_raw(&bytes, &self.limits)?;
                Ok(CommandPayload::Raw(bytes))
            }
        }
    }

    /// Check, register and forward one command.
    ///
    /// Errors returned here never reached the driver. Anything that fails
    /// after registration resolves through the router instead.
    pub async fn dispatch(
        &mut self,
        session: &mut SessionManager,
        router: &mut CallbackRouter,
        request: CommandRequest,
    ) -> Result<Dispatch> {
        let driver = session.driver_mut()?;
        let payload = self.prepare(request)?;
        if let Some(flight) = &self.in_flight {
            debug!(callback_id = %flight.callback_id, "Dispatch refused, command in flight");
            return Err(BridgeError::Busy);
        }

        let kind = payload.kind();
        let callback_id = CallbackId::generate();
        let completion = router.register(callback_id.clone(), kind)?;
        let handle = CommandHandle { kind, completion };

        if self.check_status {
            match driver.status().await {
                Ok(status) if status.is_printable() => {}
                Ok(status) => {
                    warn!(callback_id = %callback_id, ?status, "Printer not ready");
                    return Ok(self.reject(router, handle, BridgeError::NotReady(status)));
                }
                Err(fault) => {
                    return Ok(self.reject(router, handle, BridgeError::DriverError(fault)));
                }
            }
        }

        match driver.send_command(&payload).await {
            Ok(job_id) => {
                router.mark_in_flight(&callback_id)?;
                info!(
                    callback_id = %callback_id,
                    job_id = %job_id,
                    bytes = payload.byte_len(),
                    "✅ {} job accepted",
                    kind.as_str()
                );
                let watchdog = CancellationToken::new();
                self.in_flight = Some(InFlight {
                    callback_id,
                    job_id,
                    kind,
                    accepted_at: Utc::now(),
                    watchdog: watchdog.clone(),
                });
                Ok(Dispatch::Accepted { handle, watchdog })
            }
            Err(fault) => {
                warn!(callback_id = %callback_id, error = %fault, "❌ Driver rejected job");
                Ok(self.reject(router, handle, BridgeError::DriverError(fault)))
            }
        }
    }

    /// Driver reported the outcome of `job_id`
    pub fn complete(
        &mut self,
        router: &mut CallbackRouter,
        job_id: &JobId,
        result: std::result::Result<CompletionReport, DriverFault>,
    ) -> Option<BridgeEvent> {
        match &self.in_flight {
            Some(flight) if &flight.job_id == job_id => {}
            _ => {
                debug!(job_id = %job_id, "Completion for a job no longer in flight, ignored");
                return None;
            }
        }
        let flight = self.in_flight.take()?;
        flight.watchdog.cancel();

        let outcome = match result {
            Ok(report) => CommandOutcome::Completed(report),
            Err(fault) => CommandOutcome::Failed(BridgeError::DriverError(fault)),
        };
        Self::resolve(router, &flight.callback_id, outcome)
    }

    /// Watchdog for `callback_id` fired
    pub fn expire(&mut self, router: &mut CallbackRouter, callback_id: &CallbackId) -> Option<BridgeEvent> {
        match &self.in_flight {
            Some(flight) if &flight.callback_id == callback_id => {}
            _ => return None,
        }
        let flight = self.in_flight.take()?;
        let elapsed = Utc::now() - flight.accepted_at;
        warn!(
            callback_id = %callback_id,
            job_id = %flight.job_id,
            elapsed_ms = elapsed.num_milliseconds(),
            "Command timed out"
        );
        Self::resolve(
            router,
            callback_id,
            CommandOutcome::Failed(BridgeError::DriverError(DriverFault::Timeout)),
        )
    }

    /// Abort everything pending, e.g. because the session went away
    pub fn abort_all(&mut self, router: &mut CallbackRouter, reason: BridgeError) -> Vec<BridgeEvent> {
        if let Some(flight) = self.in_flight.take() {
            flight.watchdog.cancel();
        }
        let outcome = CommandOutcome::Aborted(reason.clone());
        router
            .abort_all(reason)
            .into_iter()
            .map(|(id, kind)| {
                warn!(callback_id = %id, "Command aborted: {}", outcome.label());
                BridgeEvent::command_resolved(id, kind, &outcome)
            })
            .collect()
    }

    fn reject(&self, router: &mut CallbackRouter, handle: CommandHandle, error: BridgeError) -> Dispatch {
        let callback_id = handle.callback_id().clone();
        let kind = handle.kind();
        let outcome = CommandOutcome::Failed(error);
        let event = Self::resolve(router, &callback_id, outcome.clone())
            .unwrap_or_else(|| BridgeEvent::command_resolved(callback_id, kind, &outcome));
        Dispatch::Resolved { handle, event }
    }

    fn resolve(
        router: &mut CallbackRouter,
        callback_id: &CallbackId,
        outcome: CommandOutcome,
    ) -> Option<BridgeEvent> {
        let event_outcome = outcome.clone();
        match router.resolve(callback_id, outcome) {
            Ok(kind) => Some(BridgeEvent::command_resolved(
                callback_id.clone(),
                kind,
                &event_outcome,
            )),
            Err(e) => {
                warn!(callback_id = %callback_id, error = %e, "Could not resolve command");
                None
            }
        }
    }
}
