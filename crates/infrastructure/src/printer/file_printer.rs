use async_trait::async_trait;
use domain::DriverFault;
use domain::command::{CommandPayload, CompletionReport, JobId};
use domain::driver::{DriverEvent, DriverListener, PrinterDriver};
use domain::printer::{PrinterLanguage, PrinterSeries, PrinterStatus, PrinterTarget};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use super::escpos;

/// Virtual printer appending every job to a file or network share
pub struct FilePrinter {
    path: PathBuf,
    listener: Option<Arc<dyn DriverListener>>,
    next_job: u64,
}

impl FilePrinter {
    pub fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            listener: None,
            next_job: 0,
        }
    }
}

#[async_trait]
impl PrinterDriver for FilePrinter {
    async fn connect(
        &mut self,
        target: &PrinterTarget,
        _series: PrinterSeries,
        _language: PrinterLanguage,
        listener: Arc<dyn DriverListener>,
    ) -> Result<(), DriverFault> {
        info!("Printing {} to file/share: {:?}", target, self.path);
        // Open and close per job so a share is never held locked
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DriverFault::Io(e.to_string()))?;
        self.listener = Some(listener);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), DriverFault> {
        self.listener = None;
        Ok(())
    }

    async fn send_command(&mut self, payload: &CommandPayload) -> Result<JobId, DriverFault> {
        let Some(listener) = self.listener.clone() else {
            return Err(DriverFault::Io("printer not connected".to_string()));
        };
        let bytes = escpos::encode_payload(payload)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!("Failed to open printer file {:?}: {}", self.path, e);
                DriverFault::Io(e.to_string())
            })?;
        if let Err(e) = file.write_all(&bytes).await {
            error!("Failed to write to printer file: {}", e);
            return Err(DriverFault::Io(e.to_string()));
        }
        if let Err(e) = file.flush().await {
            error!("Failed to flush to printer file: {}", e);
            return Err(DriverFault::Io(e.to_string()));
        }

        self.next_job += 1;
        let job_id = JobId::new(format!("file-{}", self.next_job));
        listener.notify(DriverEvent::JobFinished {
            job_id: job_id.clone(),
            result: Ok(CompletionReport {
                job_id: job_id.clone(),
                bytes_sent: bytes.len(),
            }),
        });
        Ok(job_id)
    }

    async fn status(&mut self) -> Result<PrinterStatus, DriverFault> {
        if self.listener.is_some() {
            Ok(PrinterStatus::ready())
        } else {
            Err(DriverFault::Io("printer not connected".to_string()))
        }
    }

    fn driver_type(&self) -> &'static str {
        "File"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::command::TextJob;

    struct Ignore;

    impl DriverListener for Ignore {
        fn notify(&self, _event: DriverEvent) {}
    }

    #[tokio::test]
    async fn test_jobs_are_appended() {
        let path = std::env::temp_dir().join(format!("epos_file_{}.bin", uuid::Uuid::new_v4()));
        let mut printer = FilePrinter::new(path.to_str().unwrap());
        let target = PrinterTarget::new("file").unwrap();

        printer
            .connect(&target, PrinterSeries::TmT88, PrinterLanguage::Ank, Arc::new(Ignore))
            .await
            .unwrap();
        printer
            .send_command(&CommandPayload::Raw(vec![0x41]))
            .await
            .unwrap();
        printer
            .send_command(&CommandPayload::Text(TextJob::new("B")))
            .await
            .unwrap();

        let written = tokio::fs::read(&path).await.unwrap();
        assert_eq!(written[0], 0x41);
        assert!(written.ends_with(b"B\n"));

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_send_before_connect() {
        let mut printer = FilePrinter::new("unused.bin");
        let result = printer.send_command(&CommandPayload::Raw(vec![1])).await;
        assert!(matches!(result, Err(DriverFault::Io(_))));
    }
}
