//! Reqwest-based streaming transport adapter.
//!
//! Each [`TransportSession`] owns one `reqwest::Client`. Resuming a task spawns
//! the request on a tokio runtime; the spawned task feeds the delegate and is
//! aborted by [`TransportSession::invalidate_and_cancel`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::error::{classify_reqwest_error, TransportError};
use crate::traits::{
    Headers, ResponseDisposition, ResponseMeta, StreamRequest, Transport, TransportConfig,
    TransportDelegate, TransportSession, TransportTask,
};

/// Transport implementation using reqwest.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use eventsource_session::adapters::ReqwestTransport;
/// use eventsource_session::EventSourceSession;
///
/// let transport = Arc::new(ReqwestTransport::new()?);
/// let session = EventSourceSession::from_url("https://example.com/events", transport)?;
/// session.start();
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    runtime: Handle,
}

impl ReqwestTransport {
    /// Create a transport bound to the current tokio runtime.
    pub fn new() -> Result<Self, TransportError> {
        Handle::try_current()
            .map(Self::with_runtime)
            .map_err(|e| TransportError::NoRuntime {
                message: e.to_string(),
            })
    }

    /// Create a transport that spawns requests on the given runtime.
    pub fn with_runtime(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Convert our Headers type into a reqwest HeaderMap.
    fn header_map(headers: &Headers) -> Result<HeaderMap, TransportError> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                TransportError::InvalidHeader { name: name.clone() }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                TransportError::InvalidHeader { name: name.clone() }
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    /// Convert reqwest headers to our Headers type.
    fn convert_headers(headers: &HeaderMap) -> Headers {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }
}

impl Transport for ReqwestTransport {
    fn create_session(
        &self,
        config: TransportConfig,
    ) -> Result<Box<dyn TransportSession>, TransportError> {
        let mut builder =
            reqwest::Client::builder().default_headers(Self::header_map(&config.headers)?);
        if let Some(timeout) = config.resource_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| TransportError::Other {
            message: e.to_string(),
        })?;

        Ok(Box::new(ReqwestSession {
            client,
            runtime: self.runtime.clone(),
            idle_timeout: config.request_timeout,
            shared: Arc::new(SessionTasks::default()),
        }))
    }
}

/// Abort handles of every spawned request, plus the invalidation flag.
#[derive(Debug, Default)]
struct SessionTasks {
    invalidated: AtomicBool,
    running: Mutex<Vec<AbortHandle>>,
}

impl SessionTasks {
    fn register(&self, handle: AbortHandle) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    fn abort_all(&self) {
        self.invalidated.store(true, Ordering::SeqCst);
        let handles = std::mem::take(
            &mut *self.running.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            handle.abort();
        }
    }
}

struct ReqwestSession {
    client: reqwest::Client,
    runtime: Handle,
    idle_timeout: Option<Duration>,
    shared: Arc<SessionTasks>,
}

impl TransportSession for ReqwestSession {
    fn stream_request(
        &mut self,
        request: StreamRequest,
        delegate: Arc<dyn TransportDelegate>,
    ) -> Result<Box<dyn TransportTask>, TransportError> {
        if self.shared.invalidated.load(Ordering::SeqCst) {
            return Err(TransportError::Cancelled);
        }
        let url = reqwest::Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl {
            url: request.url.clone(),
            message: e.to_string(),
        })?;
        let headers = ReqwestTransport::header_map(&request.headers)?;

        Ok(Box::new(ReqwestTask {
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            idle_timeout: self.idle_timeout,
            shared: Arc::clone(&self.shared),
            pending: Some((url, headers, delegate)),
        }))
    }

    fn invalidate_and_cancel(&mut self) {
        debug!("Invalidating reqwest transport session");
        self.shared.abort_all();
    }
}

impl Drop for ReqwestSession {
    fn drop(&mut self) {
        self.shared.abort_all();
    }
}

struct ReqwestTask {
    client: reqwest::Client,
    runtime: Handle,
    idle_timeout: Option<Duration>,
    shared: Arc<SessionTasks>,
    /// Taken on the first resume
    pending: Option<(reqwest::Url, HeaderMap, Arc<dyn TransportDelegate>)>,
}

impl TransportTask for ReqwestTask {
    fn resume(&mut self) {
        if self.shared.invalidated.load(Ordering::SeqCst) {
            debug!("Ignoring resume on an invalidated session");
            return;
        }
        let Some((url, headers, delegate)) = self.pending.take() else {
            return;
        };
        let request = self.client.get(url.clone()).headers(headers);
        let handle = self.runtime.spawn(run_stream(
            request,
            url.to_string(),
            self.idle_timeout,
            delegate,
        ));
        self.shared.register(handle.abort_handle());
    }
}

/// Drive one request to completion, reporting everything to the delegate.
async fn run_stream(
    request: reqwest::RequestBuilder,
    url: String,
    idle_timeout: Option<Duration>,
    delegate: Arc<dyn TransportDelegate>,
) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(%url, "Event stream request failed: {}", e);
            delegate.on_complete(Some(classify_reqwest_error(&e, &url)));
            return;
        }
    };

    let meta = ResponseMeta::with_headers(
        response.status().as_u16(),
        ReqwestTransport::convert_headers(response.headers()),
    );
    if delegate.on_response(&meta) == ResponseDisposition::Cancel {
        debug!(%url, "Delegate cancelled the response");
        delegate.on_complete(Some(TransportError::Cancelled));
        return;
    }

    let mut body = response.bytes_stream();
    loop {
        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    delegate.on_complete(Some(TransportError::Timeout {
                        message: format!("no data for {:?}", limit),
                    }));
                    return;
                }
            },
            None => body.next().await,
        };

        match next {
            Some(Ok(chunk)) => delegate.on_data(&chunk),
            Some(Err(e)) => {
                warn!(%url, "Event stream body failed: {}", e);
                delegate.on_complete(Some(classify_reqwest_error(&e, &url)));
                return;
            }
            None => {
                debug!(%url, "Event stream ended");
                delegate.on_complete(None);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_without_runtime_fails() {
        let result = ReqwestTransport::new();
        assert!(matches!(result, Err(TransportError::NoRuntime { .. })));
    }

    #[tokio::test]
    async fn test_new_inside_runtime() {
        let transport = ReqwestTransport::new().unwrap();
        let session = transport.create_session(TransportConfig::unbounded());
        assert!(session.is_ok());
    }

    #[test]
    fn test_header_map_rejects_invalid_names() {
        let mut headers = Headers::new();
        headers.insert("bad header".to_string(), "x".to_string());
        let err = ReqwestTransport::header_map(&headers).unwrap_err();
        assert_eq!(
            err,
            TransportError::InvalidHeader {
                name: "bad header".to_string()
            }
        );
    }

    #[test]
    fn test_convert_headers() {
        let mut header_map = HeaderMap::new();
        header_map.insert(
            reqwest::header::CONTENT_TYPE,
            "text/event-stream".parse().unwrap(),
        );
        let headers = ReqwestTransport::convert_headers(&header_map);
        assert_eq!(
            headers.get("content-type"),
            Some(&"text/event-stream".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        struct NoopDelegate;
        impl TransportDelegate for NoopDelegate {
            fn on_response(&self, _: &ResponseMeta) -> ResponseDisposition {
                ResponseDisposition::Allow
            }
            fn on_data(&self, _: &[u8]) {}
            fn on_complete(&self, _: Option<TransportError>) {}
        }

        let transport = ReqwestTransport::new().unwrap();
        let mut session = transport
            .create_session(TransportConfig::unbounded())
            .unwrap();
        let result = session.stream_request(StreamRequest::get("not a url"), Arc::new(NoopDelegate));
        assert!(matches!(result, Err(TransportError::InvalidUrl { .. })));

        session.invalidate_and_cancel();
        let result = session.stream_request(
            StreamRequest::get("http://127.0.0.1:59999/events"),
            Arc::new(NoopDelegate),
        );
        assert!(matches!(result, Err(TransportError::Cancelled)));
    }
}
