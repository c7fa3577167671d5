use domain::driver::{ConnectionState, DriverListener, PrinterDriver};
use domain::error::{BridgeError, Result};
use domain::printer::{PrinterLanguage, PrinterSeries, PrinterStatus, PrinterTarget, Session};
use domain::DriverFault;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Owns the printer driver and the single active session.
///
/// The driver is lent out for the duration of a connection attempt so a slow
/// printer does not hold the bridge lock; while it is out the state is
/// `Connecting` and every other session operation sees no session.
pub struct SessionManager {
    driver: Option<Box<dyn PrinterDriver>>,
    state: ConnectionState,
    session: Option<Session>,
    /// Id of the latest connection attempt, tags its driver listener
    attempt: u64,
}

impl SessionManager {
    pub fn new(driver: Box<dyn PrinterDriver>) -> Self {
        Self {
            driver: Some(driver),
            state: ConnectionState::Disconnected,
            session: None,
            attempt: 0,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected() && self.session.is_some()
    }

    /// True while the session opened by connection attempt `attempt` is live
    pub fn is_current(&self, attempt: u64) -> bool {
        self.is_connected() && self.attempt == attempt
    }

    /// Reserve the driver for a connection attempt.
    /// Returns the driver and the id of the attempt.
    pub fn begin_connect(&mut self) -> Result<(Box<dyn PrinterDriver>, u64)> {
        let next = self
            .state
            .to_connecting()
            .map_err(|_| BridgeError::AlreadyConnected)?;
        let driver = self.driver.take().ok_or(BridgeError::AlreadyConnected)?;
        self.state = next;
        self.attempt += 1;
        Ok((driver, self.attempt))
    }

    /// Run the driver side of a connection attempt, bounded by `timeout`
    pub async fn open(
        driver: &mut dyn PrinterDriver,
        target: PrinterTarget,
        series: PrinterSeries,
        language: PrinterLanguage,
        listener: Arc<dyn DriverListener>,
        timeout: Duration,
    ) -> Result<Session> {
        let attempt = tokio::time::timeout(
            timeout,
            driver.connect(&target, series, language, listener),
        )
        .await;
        match attempt {
            Ok(Ok(())) => Ok(Session::open(target, series, language)),
            Ok(Err(fault)) => Err(BridgeError::DriverError(fault)),
            Err(_) => {
                warn!(printer = %target, "Connection attempt timed out after {:?}", timeout);
                if let Err(e) = driver.disconnect().await {
                    warn!(printer = %target, error = %e, "Cleanup after connect timeout failed");
                }
                Err(BridgeError::DriverError(DriverFault::Timeout))
            }
        }
    }

    /// Return the driver and record the result of the attempt
    pub fn complete_connect(&mut self, driver: Box<dyn PrinterDriver>, session: Option<Session>) {
        self.driver = Some(driver);
        match session {
            Some(session) => {
                info!(
                    printer = %session.target,
                    series = %session.series,
                    "🖨️ Printer session opened"
                );
                self.state = self
                    .state
                    .to_connected()
                    .unwrap_or(ConnectionState::Connected);
                self.session = Some(session);
            }
            None => {
                self.state = self.state.to_disconnected();
                self.session = None;
            }
        }
    }

    /// Close the session on request
    pub async fn disconnect(&mut self) -> Result<Session> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        self.close("disconnect requested")
            .await
            .ok_or(BridgeError::NotConnected)
    }

    /// Destroy the session after the driver reported the link gone
    pub async fn teardown(&mut self, reason: &str) -> Option<Session> {
        if !self.is_connected() {
            return None;
        }
        warn!("🔌 Printer connection lost: {}", reason);
        self.close(reason).await
    }

    pub async fn status(&mut self) -> Result<PrinterStatus> {
        let driver = self.driver_mut()?;
        Ok(driver.status().await?)
    }

    /// Driver of the live session
    pub fn driver_mut(&mut self) -> Result<&mut (dyn PrinterDriver + 'static)> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }
        self.driver
            .as_deref_mut()
            .ok_or(BridgeError::NotConnected)
    }

    async fn close(&mut self, reason: &str) -> Option<Session> {
        let session = self.session.take()?;
        self.state = self.state.to_disconnected();
        if let Some(driver) = self.driver.as_mut() {
            // Driver-side failures never keep a session alive
            if let Err(e) = driver.disconnect().await {
                warn!(printer = %session.target, error = %e, "Driver disconnect failed");
            }
        }
        info!(printer = %session.target, reason = reason, "Printer session closed");
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::SimulatedPrinter;

    #[test]
    fn test_session_tracks_its_connection_attempt() {
        let mut manager = SessionManager::new(Box::new(SimulatedPrinter::default()));
        let (driver, first) = manager.begin_connect().unwrap();
        assert!(matches!(
            manager.begin_connect(),
            Err(BridgeError::AlreadyConnected)
        ));
        let target = PrinterTarget::new("TCP:10.0.0.1").unwrap();
        let session = Session::open(target, PrinterSeries::TmT88, PrinterLanguage::Ank);
        manager.complete_connect(driver, Some(session));
        assert!(manager.is_current(first));
        assert!(!manager.is_current(first + 1));
    }

    #[tokio::test]
    async fn test_new_attempt_retires_old_session_id() {
        let mut manager = SessionManager::new(Box::new(SimulatedPrinter::default()));
        let (driver, first) = manager.begin_connect().unwrap();
        manager.complete_connect(driver, None);
        assert!(!manager.is_current(first));

        let (driver, second) = manager.begin_connect().unwrap();
        assert_ne!(first, second);
        let target = PrinterTarget::new("TCP:10.0.0.2").unwrap();
        manager.complete_connect(
            driver,
            Some(Session::open(target, PrinterSeries::TmT88, PrinterLanguage::Ank)),
        );
        manager.disconnect().await.unwrap();
        assert!(!manager.is_current(second));
    }
}
