use async_trait::async_trait;
use domain::DriverFault;
use domain::command::{CommandPayload, CompletionReport, JobId};
use domain::driver::{DriverEvent, DriverListener, PrinterDriver};
use domain::printer::{
    PrinterLanguage, PrinterSeries, PrinterStatus, PrinterTarget, TargetInterface,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{error, info, warn};

use super::escpos;

/// Raw TCP printer (ESC/POS over port 9100)
pub struct NetworkPrinter {
    default_port: u16,
    timeout: Duration,
    stream: Option<TcpStream>,
    listener: Option<Arc<dyn DriverListener>>,
    address: Option<String>,
    next_job: u64,
}

impl NetworkPrinter {
    pub fn new(default_port: u16, timeout: Duration) -> Self {
        Self {
            default_port,
            timeout,
            stream: None,
            listener: None,
            address: None,
            next_job: 0,
        }
    }

    /// Socket address for `target`, adding the default port when it has none
    fn socket_address(&self, target: &PrinterTarget) -> Result<String, DriverFault> {
        match target.interface() {
            TargetInterface::Tcp | TargetInterface::Unspecified => {}
            other => {
                return Err(DriverFault::Unsupported(format!(
                    "{} targets are not reachable over raw TCP",
                    other.as_str()
                )));
            }
        }
        let address = target.address();
        if address.parse::<SocketAddr>().is_ok() {
            Ok(address.to_string())
        } else {
            Ok(format!("{}:{}", address, self.default_port))
        }
    }

    fn drop_stream(&mut self, reason: String) {
        self.stream = None;
        if let Some(address) = self.address.take() {
            warn!("Dropped connection to printer at {}: {}", address, reason);
        }
        if let Some(listener) = self.listener.take() {
            listener.notify(DriverEvent::ConnectionLost { reason });
        }
    }
}

#[async_trait]
impl PrinterDriver for NetworkPrinter {
    async fn connect(
        &mut self,
        target: &PrinterTarget,
        _series: PrinterSeries,
        _language: PrinterLanguage,
        listener: Arc<dyn DriverListener>,
    ) -> Result<(), DriverFault> {
        let address = self.socket_address(target)?;
        info!("Connecting to printer at {}", address);
        match tokio::time::timeout(self.timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => {
                info!("Connected to printer!");
                self.stream = Some(stream);
                self.listener = Some(listener);
                self.address = Some(address);
                Ok(())
            }
            Ok(Err(e)) => Err(DriverFault::Io(e.to_string())),
            Err(_) => Err(DriverFault::Timeout),
        }
    }

    async fn disconnect(&mut self) -> Result<(), DriverFault> {
        self.listener = None;
        self.address = None;
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
        Ok(())
    }

    async fn send_command(&mut self, payload: &CommandPayload) -> Result<JobId, DriverFault> {
        let bytes = escpos::encode_payload(payload)?;
        let Some(stream) = &mut self.stream else {
            return Err(DriverFault::Io("printer not connected".to_string()));
        };

        let write = async {
            stream.write_all(&bytes).await?;
            stream.flush().await
        };
        let written = tokio::time::timeout(self.timeout, write).await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Failed to write to printer: {}", e);
                self.drop_stream(e.to_string());
                return Err(DriverFault::Io(e.to_string()));
            }
            Err(_) => {
                error!("Write to printer timed out");
                self.drop_stream("write timed out".to_string());
                return Err(DriverFault::Timeout);
            }
        }

        self.next_job += 1;
        let job_id = JobId::new(format!("tcp-{}", self.next_job));
        // A raw socket has no completion report; the flushed write is the outcome
        if let Some(listener) = &self.listener {
            listener.notify(DriverEvent::JobFinished {
                job_id: job_id.clone(),
                result: Ok(CompletionReport {
                    job_id: job_id.clone(),
                    bytes_sent: bytes.len(),
                }),
            });
        }
        Ok(job_id)
    }

    async fn status(&mut self) -> Result<PrinterStatus, DriverFault> {
        // Raw TCP carries no status channel; a live socket is all we know
        if self.stream.is_some() {
            Ok(PrinterStatus::ready())
        } else {
            Err(DriverFault::Io("printer not connected".to_string()))
        }
    }

    fn driver_type(&self) -> &'static str {
        "Network"
    }
}
