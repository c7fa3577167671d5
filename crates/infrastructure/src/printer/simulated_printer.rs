use async_trait::async_trait;
use domain::command::{CommandPayload, CompletionReport, JobId};
use domain::driver::{DriverEvent, DriverListener, PrinterDriver};
use domain::printer::{PrinterLanguage, PrinterSeries, PrinterStatus, PrinterTarget};
use domain::DriverFault;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SimulatorConfig;

#[derive(Default)]
struct SimulatorState {
    target: Option<PrinterTarget>,
    listener: Option<Arc<dyn DriverListener>>,
    sent: Vec<(JobId, CommandPayload)>,
    next_job: u64,
    connect_count: u32,
}

/// In-memory printer.
///
/// Clones share state, so a test can keep one handle while the bridge owns
/// another and inspect what was sent or simulate hardware events.
#[derive(Clone)]
pub struct SimulatedPrinter {
    config: SimulatorConfig,
    state: Arc<Mutex<SimulatorState>>,
}

impl Default for SimulatedPrinter {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl SimulatedPrinter {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SimulatorState::default())),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.target.is_some()
    }

    pub async fn connect_count(&self) -> u32 {
        self.state.lock().await.connect_count
    }

    /// Jobs accepted so far, oldest first
    pub async fn sent_jobs(&self) -> Vec<(JobId, CommandPayload)> {
        self.state.lock().await.sent.clone()
    }

    pub async fn last_job_id(&self) -> Option<JobId> {
        self.state.lock().await.sent.last().map(|(id, _)| id.clone())
    }

    /// Report the outcome of a job, as the hardware would
    pub async fn finish_job(&self, job_id: &JobId, result: Result<CompletionReport, DriverFault>) {
        let listener = self.state.lock().await.listener.clone();
        if let Some(listener) = listener {
            listener.notify(DriverEvent::JobFinished {
                job_id: job_id.clone(),
                result,
            });
        }
    }

    /// Simulate the printer going away (cable pulled, power off)
    pub async fn drop_connection(&self, reason: &str) {
        let listener = {
            let mut state = self.state.lock().await;
            state.target = None;
            state.listener.take()
        };
        if let Some(listener) = listener {
            info!("Simulated printer dropped connection: {}", reason);
            listener.notify(DriverEvent::ConnectionLost {
                reason: reason.to_string(),
            });
        }
    }
}

#[async_trait]
impl PrinterDriver for SimulatedPrinter {
    async fn connect(
        &mut self,
        target: &PrinterTarget,
        series: PrinterSeries,
        language: PrinterLanguage,
        listener: Arc<dyn DriverListener>,
    ) -> Result<(), DriverFault> {
        if let Some(code) = self.config.fail_connect_with {
            return Err(DriverFault::Code(code));
        }

        let mut state = self.state.lock().await;
        state.target = Some(target.clone());
        state.listener = Some(listener);
        state.connect_count += 1;
        info!(
            "Simulated printer connected: {} ({}, {:?})",
            target, series, language
        );
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DriverFault> {
        let mut state = self.state.lock().await;
        state.target = None;
        state.listener = None;
        Ok(())
    }

    async fn send_command(&mut self, payload: &CommandPayload) -> Result<JobId, DriverFault> {
        let (job_id, listener) = {
            let mut state = self.state.lock().await;
            let listener = state
                .listener
                .clone()
                .ok_or_else(|| DriverFault::Io("simulated printer not connected".to_string()))?;
            state.next_job += 1;
            let job_id = JobId::new(format!("sim-{}", state.next_job));
            state.sent.push((job_id.clone(), payload.clone()));
            (job_id, listener)
        };
        debug!("Simulated job {} accepted ({} bytes)", job_id, payload.byte_len());

        if self.config.complete_jobs {
            let result = match self.config.fail_jobs_with {
                Some(code) => Err(DriverFault::Code(code)),
                None => Ok(CompletionReport {
                    job_id: job_id.clone(),
                    bytes_sent: payload.byte_len(),
                }),
            };
            let latency = Duration::from_millis(self.config.job_latency_ms);
            let finished = job_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(latency).await;
                listener.notify(DriverEvent::JobFinished {
                    job_id: finished,
                    result,
                });
            });
        }

        Ok(job_id)
    }

    async fn status(&mut self) -> Result<PrinterStatus, DriverFault> {
        if self.state.lock().await.target.is_none() {
            return Err(DriverFault::Io("simulated printer not connected".to_string()));
        }
        Ok(PrinterStatus {
            online: !self.config.offline,
            ..PrinterStatus::ready()
        })
    }

    fn driver_type(&self) -> &'static str {
        "Simulator"
    }
}
