use chrono::{DateTime, Utc};
use domain::command::{CallbackId, CommandKind, CommandOutcome, CommandState};
use domain::error::{BridgeError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Resolved ids remembered to tell late resolutions from unknown ids
const DEFAULT_TOMBSTONES: usize = 1024;

/// Command waiting for its terminal outcome
#[derive(Debug)]
pub struct PendingCommand {
    pub callback_id: CallbackId,
    pub kind: CommandKind,
    pub state: CommandState,
    pub issued_at: DateTime<Utc>,
    responder: oneshot::Sender<CommandOutcome>,
}

/// Receiving side of a registered callback
#[derive(Debug)]
pub struct Completion {
    callback_id: CallbackId,
    rx: oneshot::Receiver<CommandOutcome>,
}

impl Completion {
    pub fn callback_id(&self) -> &CallbackId {
        &self.callback_id
    }

    /// Wait for the terminal outcome.
    /// A router dropped without resolving counts as a lost connection.
    pub async fn wait(self) -> CommandOutcome {
        self.rx
            .await
            .unwrap_or(CommandOutcome::Aborted(BridgeError::ConnectionLost))
    }
}

/// Maps pending callback ids to their eventual outcome
pub struct CallbackRouter {
    pending: HashMap<CallbackId, PendingCommand>,
    resolved: HashSet<CallbackId>,
    resolved_order: VecDeque<CallbackId>,
    capacity: usize,
}

impl Default for CallbackRouter {
    fn default() -> Self {
        Self::new(DEFAULT_TOMBSTONES)
    }
}

impl CallbackRouter {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: HashMap::new(),
            resolved: HashSet::new(),
            resolved_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn register(&mut self, callback_id: CallbackId, kind: CommandKind) -> Result<Completion> {
        if self.pending.contains_key(&callback_id) {
            return Err(BridgeError::AlreadyRegistered(callback_id));
        }
        // A reused id starts a new life
        if self.resolved.remove(&callback_id) {
            self.resolved_order.retain(|id| id != &callback_id);
        }

        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            callback_id.clone(),
            PendingCommand {
                callback_id: callback_id.clone(),
                kind,
                state: CommandState::Issued,
                issued_at: Utc::now(),
                responder: tx,
            },
        );
        debug!(callback_id = %callback_id, kind = kind.as_str(), "Callback registered");
        Ok(Completion { callback_id, rx })
    }

    pub fn mark_in_flight(&mut self, callback_id: &CallbackId) -> Result<()> {
        let Some(pending) = self.pending.get_mut(callback_id) else {
            return Err(self.missing(callback_id));
        };
        match pending.state.to_in_flight() {
            Ok(state) => pending.state = state,
            Err(reason) => warn!(callback_id = %callback_id, "Unexpected transition: {}", reason),
        }
        Ok(())
    }

    /// Deliver the terminal outcome for `callback_id`, exactly once
    pub fn resolve(&mut self, callback_id: &CallbackId, outcome: CommandOutcome) -> Result<CommandKind> {
        let Some(mut pending) = self.pending.remove(callback_id) else {
            return Err(self.missing(callback_id));
        };

        let next = match &outcome {
            CommandOutcome::Completed(_) => pending.state.to_completed(),
            CommandOutcome::Failed(_) => pending.state.to_failed(),
            CommandOutcome::Aborted(_) => pending.state.to_aborted(),
        };
        match next {
            Ok(state) => pending.state = state,
            Err(reason) => warn!(callback_id = %callback_id, "Unexpected transition: {}", reason),
        }

        debug!(
            callback_id = %callback_id,
            outcome = outcome.label(),
            "Callback resolved"
        );
        if pending.responder.send(outcome).is_err() {
            debug!(callback_id = %callback_id, "Completion receiver already dropped");
        }
        self.remember(callback_id.clone());
        Ok(pending.kind)
    }

    /// Resolve every pending command as aborted
    pub fn abort_all(&mut self, reason: BridgeError) -> Vec<(CallbackId, CommandKind)> {
        let ids: Vec<CallbackId> = self.pending.keys().cloned().collect();
        ids.into_iter()
            .filter_map(|id| {
                self.resolve(&id, CommandOutcome::Aborted(reason.clone()))
                    .ok()
                    .map(|kind| (id, kind))
            })
            .collect()
    }

    pub fn state_of(&self, callback_id: &CallbackId) -> Option<CommandState> {
        self.pending.get(callback_id).map(|p| p.state)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn missing(&self, callback_id: &CallbackId) -> BridgeError {
        if self.resolved.contains(callback_id) {
            BridgeError::AlreadyResolved(callback_id.clone())
        } else {
            BridgeError::UnknownCallback(callback_id.clone())
        }
    }

    fn remember(&mut self, callback_id: CallbackId) {
        if self.resolved_order.len() == self.capacity {
            if let Some(oldest) = self.resolved_order.pop_front() {
                self.resolved.remove(&oldest);
            }
        }
        self.resolved.insert(callback_id.clone());
        self.resolved_order.push_back(callback_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::command::{CompletionReport, JobId};

    fn completed() -> CommandOutcome {
        CommandOutcome::Completed(CompletionReport {
            job_id: JobId::new("job-1"),
            bytes_sent: 5,
        })
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let mut router = CallbackRouter::default();
        let id = CallbackId::from_raw("cb-1");

        let completion = router.register(id.clone(), CommandKind::Print).unwrap();
        router.mark_in_flight(&id).unwrap();
        assert_eq!(router.state_of(&id), Some(CommandState::InFlight));

        assert_eq!(router.resolve(&id, completed()).unwrap(), CommandKind::Print);
        assert_eq!(completion.wait().await, completed());
        assert_eq!(router.pending_count(), 0);
    }

    #[test]
    fn test_double_resolve_is_rejected() {
        let mut router = CallbackRouter::default();
        let id = CallbackId::from_raw("cb-1");
        let _completion = router.register(id.clone(), CommandKind::Print).unwrap();
        router.mark_in_flight(&id).unwrap();

        router.resolve(&id, completed()).unwrap();
        assert_eq!(
            router.resolve(&id, completed()),
            Err(BridgeError::AlreadyResolved(id))
        );
    }

    #[test]
    fn test_unknown_callback() {
        let mut router = CallbackRouter::default();
        let id = CallbackId::from_raw("never");
        assert_eq!(
            router.resolve(&id, completed()),
            Err(BridgeError::UnknownCallback(id.clone()))
        );
        assert_eq!(
            router.mark_in_flight(&id),
            Err(BridgeError::UnknownCallback(id))
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let mut router = CallbackRouter::default();
        let id = CallbackId::from_raw("dup");
        let _first = router.register(id.clone(), CommandKind::SendData).unwrap();
        assert!(matches!(
            router.register(id.clone(), CommandKind::SendData),
            Err(BridgeError::AlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn test_abort_all_notifies_each_once() {
        let mut router = CallbackRouter::default();
        let a = router
            .register(CallbackId::from_raw("a"), CommandKind::Print)
            .unwrap();
        let b = router
            .register(CallbackId::from_raw("b"), CommandKind::SendData)
            .unwrap();

        let aborted = router.abort_all(BridgeError::ConnectionLost);
        assert_eq!(aborted.len(), 2);
        assert!(router.abort_all(BridgeError::ConnectionLost).is_empty());

        assert_eq!(
            a.wait().await,
            CommandOutcome::Aborted(BridgeError::ConnectionLost)
        );
        assert_eq!(
            b.wait().await,
            CommandOutcome::Aborted(BridgeError::ConnectionLost)
        );
    }

    #[test]
    fn test_tombstones_are_bounded() {
        let mut router = CallbackRouter::new(2);
        for name in ["a", "b", "c"] {
            let id = CallbackId::from_raw(name);
            let _c = router.register(id.clone(), CommandKind::Print).unwrap();
            router
                .resolve(&id, CommandOutcome::Failed(BridgeError::Busy))
                .unwrap();
        }

        let oldest = CallbackId::from_raw("a");
        assert_eq!(
            router.resolve(&oldest, completed()),
            Err(BridgeError::UnknownCallback(oldest))
        );
        let newest = CallbackId::from_raw("c");
        assert_eq!(
            router.resolve(&newest, completed()),
            Err(BridgeError::AlreadyResolved(newest))
        );
    }

    #[tokio::test]
    async fn test_dropped_router_aborts_completion() {
        let mut router = CallbackRouter::default();
        let completion = router
            .register(CallbackId::from_raw("x"), CommandKind::Print)
            .unwrap();
        drop(router);
        assert_eq!(
            completion.wait().await,
            CommandOutcome::Aborted(BridgeError::ConnectionLost)
        );
    }
}
