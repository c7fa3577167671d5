use application::{CommandHandle, ImageOptions, PrinterBridge};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::command::{CommandOutcome, Halftone, ImageMode, TextAlign, TextEncoding, TextJob};
use domain::discovery::{DeviceType, DiscoveryFilter, DiscoveryHandle, PortType};
use domain::{BridgeError, BridgeEvent, CallbackId, DeviceInfo, PrinterLanguage, PrinterSeries};
use infrastructure::config::SessionConfig;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::{HostError, HostOutput, HostRequest, HostResponse};

/// Series and language used when a connect request names none we know
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectDefaults {
    pub series: PrinterSeries,
    pub language: PrinterLanguage,
}

impl ConnectDefaults {
    pub fn from_config(config: &SessionConfig) -> Self {
        let series = PrinterSeries::from_model_name(&config.default_series).unwrap_or_else(|| {
            warn!(series = %config.default_series, "Unknown default series, using TM-T88");
            PrinterSeries::default()
        });
        let language = PrinterLanguage::from_id(config.default_language).unwrap_or_else(|| {
            warn!(language = config.default_language, "Unknown default language, using ANK");
            PrinterLanguage::default()
        });
        Self { series, language }
    }
}

/// Translates host commands into bridge calls and reports their results
#[derive(Clone)]
pub struct CommandHost {
    bridge: PrinterBridge,
    defaults: ConnectDefaults,
    out: mpsc::UnboundedSender<HostOutput>,
}

impl CommandHost {
    pub fn new(
        bridge: PrinterBridge,
        defaults: ConnectDefaults,
        out: mpsc::UnboundedSender<HostOutput>,
    ) -> Self {
        Self {
            bridge,
            defaults,
            out,
        }
    }

    pub fn bridge(&self) -> &PrinterBridge {
        &self.bridge
    }

    /// Parse one JSON line and handle it
    pub async fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        match serde_json::from_str::<HostRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                warn!(error = %e, "Received non-JSON command");
                let error = HostError::MalformedRequest(e.to_string());
                self.send(HostResponse::error("", &error));
            }
        }
    }

    pub async fn handle(&self, request: HostRequest) {
        info!(callback_id = %request.callback_id, action = %request.action, "Received command");

        // `None` when the action reports through its own stream of results
        let result = match request.action.as_str() {
            "startDiscover" => self.start_discover(&request).await.map(|_| None),
            "stopDiscover" => self.stop_discover(&request).await.map(Some),
            "connectPrinter" => self.connect_printer(&request).await.map(Some),
            "disconnectPrinter" => self.disconnect_printer().await.map(Some),
            "printText" => self.print_text(&request).await.map(|_| None),
            "printImage" => self.print_image(&request).await.map(|_| None),
            "sendData" => self.send_data(&request).await.map(|_| None),
            "getPrinterStatus" => self.printer_status().await.map(Some),
            "getSupportedModels" => Ok(Some(json!(PrinterBridge::supported_models()))),
            other => Err(HostError::UnknownAction(other.to_string())),
        };

        match result {
            Ok(Some(message)) => self.send(HostResponse::ok(&request.callback_id, message)),
            Ok(None) => {}
            Err(e) => {
                warn!(
                    callback_id = %request.callback_id,
                    action = %request.action,
                    code = e.code(),
                    "❌ {}", e
                );
                self.send(HostResponse::error(&request.callback_id, &e));
            }
        }
    }

    // --- Discovery ---

    async fn start_discover(&self, request: &HostRequest) -> Result<(), HostError> {
        let filter = match request.arg(0) {
            Some(value) => parse_filter(value)?,
            None => DiscoveryFilter::default(),
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<DeviceInfo>();
        let handle = self.bridge.start_discovery(filter, Box::new(tx)).await?;
        let callback_id = request.callback_id.clone();
        self.send(HostResponse::progress(
            &callback_id,
            json!({ "handle": handle.to_string() }),
        ));

        let out = self.out.clone();
        tokio::spawn(async move {
            while let Some(device) = rx.recv().await {
                debug!(device = %device.device_name, printer = %device.target, "🔍 Forwarding device");
                let response = HostResponse::progress(&callback_id, to_message(&device));
                if out.send(HostOutput::Response(response)).is_err() {
                    return;
                }
            }
            // The sink closes once the scan is over
            let response = HostResponse::ok(
                &callback_id,
                json!({ "handle": handle.to_string(), "finished": true }),
            );
            let _ = out.send(HostOutput::Response(response));
        });
        Ok(())
    }

    async fn stop_discover(&self, request: &HostRequest) -> Result<Value, HostError> {
        let handle = match request.arg(0) {
            Some(Value::String(id)) => DiscoveryHandle::new(CallbackId::from_raw(id.as_str())),
            Some(other) => {
                return Err(HostError::payload(format!(
                    "Discovery handle must be a string, got {other}"
                )));
            }
            None => self
                .bridge
                .active_discovery()
                .await
                .ok_or(BridgeError::NotInProgress)?,
        };

        self.bridge.stop_discovery(&handle).await?;
        Ok(json!({ "handle": handle.to_string(), "stopped": true }))
    }

    // --- Session ---

    async fn connect_printer(&self, request: &HostRequest) -> Result<Value, HostError> {
        let target = match request.arg(0) {
            Some(Value::String(target)) => target.clone(),
            Some(Value::Object(device)) => device
                .get("target")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| BridgeError::InvalidTarget("device has no target".to_string()))?,
            _ => return Err(BridgeError::InvalidTarget("missing target".to_string()).into()),
        };
        let series = self.series_arg(request.arg(1));
        let language = self.language_arg(request.arg(2));

        let session = self.bridge.connect(&target, series, language).await?;
        Ok(json!({
            "target": session.target.as_str(),
            "series": session.series.model_name(),
            "seriesId": session.series_id(),
            "languageId": session.language_id(),
        }))
    }

    fn series_arg(&self, value: Option<&Value>) -> PrinterSeries {
        let Some(value) = value else {
            return self.defaults.series;
        };
        let series = match value {
            Value::String(name) => PrinterSeries::from_model_name(name),
            Value::Number(n) => n
                .as_i64()
                .and_then(|id| i32::try_from(id).ok())
                .and_then(PrinterSeries::from_id),
            _ => None,
        };
        series.unwrap_or_else(|| {
            warn!(series = %value, fallback = %self.defaults.series, "Unknown printer series");
            self.defaults.series
        })
    }

    fn language_arg(&self, value: Option<&Value>) -> PrinterLanguage {
        let Some(value) = value else {
            return self.defaults.language;
        };
        value
            .as_i64()
            .and_then(|id| i32::try_from(id).ok())
            .and_then(PrinterLanguage::from_id)
            .unwrap_or_else(|| {
                warn!(language = %value, "Unknown printer language");
                self.defaults.language
            })
    }

    async fn disconnect_printer(&self) -> Result<Value, HostError> {
        let session = self.bridge.disconnect().await?;
        Ok(json!({ "target": session.target.as_str(), "disconnected": true }))
    }

    async fn printer_status(&self) -> Result<Value, HostError> {
        let status = self.bridge.printer_status().await?;
        let mut message = to_message(&status);
        if let Value::Object(fields) = &mut message {
            fields.insert("isPrintable".to_string(), Value::Bool(status.is_printable()));
        }
        Ok(message)
    }

    // --- Commands ---

    async fn print_text(&self, request: &HostRequest) -> Result<(), HostError> {
        let text = match request.arg(0) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(lines)) => lines
                .iter()
                .map(|line| match line {
                    Value::String(s) => Ok(s.as_str()),
                    other => Err(HostError::payload(format!("Text line must be a string, got {other}"))),
                })
                .collect::<Result<String, _>>()?,
            _ => return Err(HostError::payload("Missing text")),
        };

        let mut job = TextJob::new(text);
        if let Some(font) = request.arg(1) {
            job.style.font = small_int(font, "font")?;
        }
        if let Some(size) = request.arg(2) {
            job.style.size = small_int(size, "size")?;
        }
        if let Some(align) = request.arg(3) {
            job.style.align = align
                .as_i64()
                .and_then(TextAlign::from_index)
                .ok_or_else(|| HostError::payload(format!("Invalid alignment {align}")))?;
        }
        job.cut = flag(request.arg(4));
        if let Some(encoding) = request.arg(5) {
            job.encoding = encoding
                .as_str()
                .and_then(TextEncoding::from_name)
                .ok_or_else(|| HostError::payload(format!("Unsupported encoding {encoding}")))?;
        }

        let handle = self.bridge.print_text(job).await?;
        self.track(&request.callback_id, handle);
        Ok(())
    }

    async fn print_image(&self, request: &HostRequest) -> Result<(), HostError> {
        let data = match request.arg(0) {
            Some(Value::String(data)) => decode_image_data(data)?,
            _ => return Err(HostError::payload("Missing image data")),
        };

        let mut options = ImageOptions::default();
        if let Some(mode) = request.arg(1) {
            options.mode = mode
                .as_i64()
                .and_then(ImageMode::from_index)
                .ok_or_else(|| HostError::payload(format!("Invalid print mode {mode}")))?;
        }
        if let Some(halftone) = request.arg(2) {
            options.halftone = halftone
                .as_i64()
                .and_then(Halftone::from_index)
                .ok_or_else(|| HostError::payload(format!("Invalid halftone {halftone}")))?;
        }
        options.cut = flag(request.arg(3));

        let handle = self.bridge.print_image(data, options).await?;
        self.track(&request.callback_id, handle);
        Ok(())
    }

    async fn send_data(&self, request: &HostRequest) -> Result<(), HostError> {
        let bytes = match request.arg(0) {
            Some(Value::String(encoded)) => STANDARD
                .decode(encoded.trim())
                .map_err(|e| HostError::payload(format!("Data is not valid base64: {e}")))?,
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| {
                    v.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| HostError::payload(format!("Invalid byte {v}")))
                })
                .collect::<Result<Vec<u8>, _>>()?,
            _ => Vec::new(),
        };

        let handle = self.bridge.send_data(bytes).await?;
        self.track(&request.callback_id, handle);
        Ok(())
    }

    /// Acknowledge an accepted command, then report its outcome when it resolves
    fn track(&self, callback_id: &str, handle: CommandHandle) {
        self.send(HostResponse::progress(
            callback_id,
            json!({
                "state": "accepted",
                "commandId": handle.callback_id().as_str(),
                "kind": handle.kind().as_str(),
            }),
        ));

        let callback_id = callback_id.to_string();
        let out = self.out.clone();
        tokio::spawn(async move {
            let response = match handle.wait().await {
                CommandOutcome::Completed(report) => HostResponse::ok(
                    &callback_id,
                    json!({
                        "state": "completed",
                        "jobId": report.job_id.as_str(),
                        "bytesSent": report.bytes_sent,
                    }),
                ),
                CommandOutcome::Failed(e) | CommandOutcome::Aborted(e) => {
                    HostResponse::error(&callback_id, &e.into())
                }
            };
            let _ = out.send(HostOutput::Response(response));
        });
    }

    fn send(&self, response: HostResponse) {
        if self.out.send(HostOutput::Response(response)).is_err() {
            warn!("Host output closed, dropping response");
        }
    }
}

/// Copy bridge events onto the host output stream
pub async fn forward_events(
    mut events: mpsc::UnboundedReceiver<BridgeEvent>,
    out: mpsc::UnboundedSender<HostOutput>,
) {
    while let Some(event) = events.recv().await {
        if out.send(HostOutput::Event { event }).is_err() {
            break;
        }
    }
}

fn to_message<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn flag(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

fn small_int(value: &Value, name: &str) -> Result<u8, HostError> {
    value
        .as_i64()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| HostError::payload(format!("Invalid {name} {value}")))
}

/// Accepts a `data:` URL or bare base64
fn decode_image_data(data: &str) -> Result<Vec<u8>, HostError> {
    let encoded = match data.strip_prefix("data:") {
        Some(rest) => {
            let (meta, body) = rest
                .split_once(',')
                .ok_or_else(|| HostError::payload("Data URL has no payload"))?;
            if !meta.ends_with(";base64") {
                return Err(HostError::payload("Data URL must be base64 encoded"));
            }
            body
        }
        None => data,
    };
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| HostError::payload(format!("Image is not valid base64: {e}")))
}

fn parse_filter(value: &Value) -> Result<DiscoveryFilter, HostError> {
    let options = value
        .as_object()
        .ok_or_else(|| HostError::payload("Discovery filter must be an object"))?;
    let mut filter = DiscoveryFilter::default();

    if let Some(port) = options.get("portType").filter(|v| !v.is_null()) {
        filter.port_type = match port {
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(PortType::All),
                Some(1) => Some(PortType::Tcp),
                Some(2) => Some(PortType::Bluetooth),
                Some(3) => Some(PortType::Usb),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_uppercase().as_str() {
                "ALL" => Some(PortType::All),
                "TCP" => Some(PortType::Tcp),
                "BT" | "BLUETOOTH" => Some(PortType::Bluetooth),
                "USB" => Some(PortType::Usb),
                _ => None,
            },
            _ => None,
        }
        .ok_or_else(|| HostError::payload(format!("Invalid port type {port}")))?;
    }

    if let Some(kind) = options.get("deviceType").filter(|v| !v.is_null()) {
        filter.device_type = match kind {
            Value::Number(n) if n.as_i64() == Some(0) => Some(DeviceType::All),
            Value::Number(n) if n.as_i64() == Some(1) => Some(DeviceType::Printer),
            Value::String(s) if s.eq_ignore_ascii_case("all") => Some(DeviceType::All),
            Value::String(s) if s.eq_ignore_ascii_case("printer") => Some(DeviceType::Printer),
            _ => None,
        }
        .ok_or_else(|| HostError::payload(format!("Invalid device type {kind}")))?;
    }

    if let Some(epson_only) = options
        .get("epsonFilter")
        .or_else(|| options.get("epsonOnly"))
        .and_then(Value::as_bool)
    {
        filter.epson_only = epson_only;
    }
    if let Some(bonded) = options.get("bondedDevices").and_then(Value::as_bool) {
        filter.bonded_devices = bonded;
    }

    Ok(filter)
}
