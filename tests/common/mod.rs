//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use conversion_gate::backend::{
    BackendError, CompressionOutput, ConversionBackend, ConversionJob, ConversionOutput,
};
use conversion_gate::uploads::ValidatedUpload;
use conversion_gate::{GateConfig, HttpServer, Shutdown};
use serde_json::json;
use tokio::net::TcpListener;

pub const API_KEY: &str = "integration-test-key";

pub const PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\n%%EOF";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR";

/// Records every job it receives and answers with a small fixed payload.
#[derive(Default)]
pub struct RecordingBackend {
    pub pages: u32,
    pub calls: AtomicUsize,
    pub operations: Mutex<Vec<&'static str>>,
}

impl RecordingBackend {
    pub fn with_pages(pages: u32) -> Arc<Self> {
        Arc::new(Self {
            pages,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConversionBackend for RecordingBackend {
    fn page_count(&self, _document: &ValidatedUpload) -> Result<u32, BackendError> {
        Ok(self.pages)
    }

    fn convert(&self, job: ConversionJob) -> Result<ConversionOutput, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let operation = job.operation();
        self.operations.lock().unwrap().push(operation);

        Ok(match job {
            ConversionJob::SplitPdf { pages, .. } => {
                ConversionOutput::attachment(format!("pages:{:?}", pages.pages()), "application/pdf", "pdf")
            }
            ConversionJob::MergePdfs { documents } => ConversionOutput::attachment(
                format!("merged:{}", documents.len()),
                "application/pdf",
                "pdf",
            ),
            ConversionJob::PdfInfo { .. } => ConversionOutput::json(&json!({ "pages": self.pages })),
            ConversionJob::ProtectPdf {
                user_password,
                owner_password,
                ..
            } => ConversionOutput::attachment(
                format!(
                    "user:{} owner:{}",
                    user_password.expose(),
                    owner_password.as_ref().map_or("-", |p| p.expose())
                ),
                "application/pdf",
                "pdf",
            ),
            ConversionJob::PdfToOfx {
                bank_id,
                account_id,
                account_type,
                ..
            } => ConversionOutput::attachment(
                format!("{bank_id}/{account_id}/{}", account_type.as_str()),
                "application/x-ofx",
                "ofx",
            ),
            ConversionJob::ExtractText { document } => ConversionOutput::json(&json!({
                "filename": document.sanitized_filename(),
                "total_pages": self.pages,
                "pages": [],
            })),
            ConversionJob::CompressImage {
                quality,
                max_dimension,
                output: CompressionOutput::Metrics { include_file },
                ..
            } => ConversionOutput::json(&json!({
                "quality": quality,
                "max_dimension": max_dimension,
                "include_file": include_file,
            })),
            ConversionJob::CompressImage { quality, .. } => {
                ConversionOutput::attachment(format!("quality:{quality}"), "image/jpeg", "jpg")
            }
            _ => ConversionOutput::attachment("ok", "application/octet-stream", "bin"),
        })
    }
}

/// Takes `delay` per conversion and counts the ones that ran to the end.
pub struct SlowBackend {
    pub delay: Duration,
    pub finished: AtomicUsize,
}

impl SlowBackend {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            finished: AtomicUsize::new(0),
        })
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

impl ConversionBackend for SlowBackend {
    fn page_count(&self, _document: &ValidatedUpload) -> Result<u32, BackendError> {
        Ok(1)
    }

    fn convert(&self, _job: ConversionJob) -> Result<ConversionOutput, BackendError> {
        std::thread::sleep(self.delay);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(ConversionOutput::attachment("late", "application/pdf", "pdf"))
    }
}

/// A running gate on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.auth.api_key = API_KEY.into();
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

pub async fn start_gate(config: GateConfig, backend: Arc<dyn ConversionBackend>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, backend);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });

    TestServer { addr, shutdown }
}

pub fn file_part(name: &str, content: &'static [u8]) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(content).file_name(name.to_string())
}
