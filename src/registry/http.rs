//! Blocking HTTP transfers over `ureq`

use super::Fetcher;
use crate::error::{CartwheelError, CartwheelResult};
use crate::ui::TransferProgress;
use async_trait::async_trait;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use ureq::http::Response;
use ureq::{Agent, Body};

const CHUNK_SIZE: usize = 64 * 1024;

/// Stop signal shared with a transfer running on the blocking pool
#[derive(Debug, Clone, Default)]
struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> CartwheelResult<()> {
        if self.0.load(Ordering::SeqCst) {
            return Err(CartwheelError::Interrupted);
        }
        Ok(())
    }
}

/// Cancels the transfer when the awaiting future is dropped (Ctrl-C)
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// HTTP client with one global timeout applied to every request
#[derive(Clone)]
pub struct HttpClient {
    agent: Agent,
}

/// Method, URL and headers of a request, owned so it can cross into the
/// blocking pool
#[derive(Debug, Clone, Default)]
pub(crate) struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            // Status codes are checked by the caller so error bodies can be reported
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    /// GET a small text body
    pub(crate) async fn get_text(&self, request: HttpRequest) -> CartwheelResult<String> {
        let agent = self.agent.clone();
        run_blocking(move || {
            let mut response = send_get(&agent, &request)?;
            let url = request.url.clone();
            ensure_success(&mut response, &format!("GET {}", url))?;
            response
                .body_mut()
                .read_to_string()
                .map_err(|e| CartwheelError::http(format!("reading response of {}", url), e))
        })
        .await
    }

    /// GET a body and stream it into `destination`
    pub(crate) async fn download(
        &self,
        request: HttpRequest,
        destination: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<u64> {
        let agent = self.agent.clone();
        let destination = destination.to_path_buf();
        let cancel = CancelFlag::default();
        let _guard = CancelOnDrop(cancel.clone());
        run_blocking(move || {
            let result = download_blocking(&agent, &request, &destination, &progress, &cancel);
            match result {
                Ok(bytes) => progress.finish(bytes),
                Err(_) => progress.abandon(),
            }
            result
        })
        .await
    }

    /// PUT the contents of `file`, returning status and body of the response
    pub(crate) async fn put_file(
        &self,
        request: HttpRequest,
        file: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<(u16, String)> {
        let agent = self.agent.clone();
        let file = file.to_path_buf();
        let cancel = CancelFlag::default();
        let _guard = CancelOnDrop(cancel.clone());
        run_blocking(move || {
            let result = put_blocking(&agent, &request, &file, &cancel);
            match result {
                Ok((_, _, bytes)) => progress.finish(bytes),
                Err(_) => progress.abandon(),
            }
            result.map(|(status, body, _)| (status, body))
        })
        .await
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch_to(
        &self,
        url: &str,
        destination: &Path,
        progress: TransferProgress,
    ) -> CartwheelResult<u64> {
        self.download(HttpRequest::new(url), destination, progress).await
    }

    async fn fetch_text(&self, url: &str) -> CartwheelResult<String> {
        self.get_text(HttpRequest::new(url)).await
    }
}

async fn run_blocking<T, F>(task: F) -> CartwheelResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CartwheelResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| CartwheelError::Internal(format!("transfer task failed: {}", e)))?
}

fn send_get(agent: &Agent, request: &HttpRequest) -> CartwheelResult<Response<Body>> {
    debug!("GET {}", request.url);
    let mut builder = agent.get(&request.url);
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    for (key, value) in &request.query {
        builder = builder.query(key.as_str(), value.as_str());
    }
    builder
        .call()
        .map_err(|e| CartwheelError::http(format!("GET {}", request.url), e))
}

fn ensure_success(response: &mut Response<Body>, context: &str) -> CartwheelResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    debug!("{} answered {}: {}", context, status, body.trim());
    Err(CartwheelError::http(
        context.to_string(),
        ureq::Error::StatusCode(status.as_u16()),
    ))
}

fn download_blocking(
    agent: &Agent,
    request: &HttpRequest,
    destination: &Path,
    progress: &TransferProgress,
    cancel: &CancelFlag,
) -> CartwheelResult<u64> {
    let context = format!("GET {}", request.url);
    let mut response = send_get(agent, request)?;
    ensure_success(&mut response, &context)?;

    let total = response.body().content_length();
    let reader = response.body_mut().with_config().limit(u64::MAX).reader();
    let result = stream_to_file(reader, destination, total, progress, cancel, &context);
    if result.is_err() {
        // Nothing may be left behind once the scratch guard on the async side has run
        let _ = std::fs::remove_file(destination);
    }
    result
}

/// Copy `reader` into a new `destination` chunk by chunk, stopping as soon
/// as `cancel` is raised
fn stream_to_file(
    mut reader: impl Read,
    destination: &Path,
    total: Option<u64>,
    progress: &TransferProgress,
    cancel: &CancelFlag,
    context: &str,
) -> CartwheelResult<u64> {
    cancel.check()?;
    let mut file = std::fs::File::create(destination)
        .map_err(|e| CartwheelError::io(format!("creating {}", destination.display()), e))?;

    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut done: u64 = 0;
    loop {
        cancel.check()?;
        let read = reader
            .read(&mut buffer)
            .map_err(|e| CartwheelError::io(format!("reading body of {}", context), e))?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .map_err(|e| CartwheelError::io(format!("writing {}", destination.display()), e))?;
        done += read as u64;
        progress.update(done, total);
    }
    file.flush()
        .map_err(|e| CartwheelError::io(format!("writing {}", destination.display()), e))?;
    cancel.check()?;

    debug!("Downloaded {} bytes to {}", done, destination.display());
    Ok(done)
}

fn put_blocking(
    agent: &Agent,
    request: &HttpRequest,
    file: &Path,
    cancel: &CancelFlag,
) -> CartwheelResult<(u16, String, u64)> {
    cancel.check()?;
    let data = std::fs::read(file)
        .map_err(|e| CartwheelError::io(format!("reading {}", file.display()), e))?;
    let size = data.len() as u64;

    cancel.check()?;
    debug!("PUT {} ({} bytes)", request.url, size);
    let mut builder = agent.put(&request.url);
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    let mut response = builder
        .send(&data[..])
        .map_err(|e| CartwheelError::http(format!("PUT {}", request.url), e))?;

    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Ok((status, body, size))
}
