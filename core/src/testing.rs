//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Transport};

/// A request as observed by the mock, copied out of the caller's buffers.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub(crate) url: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
}

impl Recorded {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// A scripted reply.
pub(crate) enum Reply {
    Body { status: u16, body: String },
    Fail(String),
}

impl Reply {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Reply::Body {
            status,
            body: body.to_string(),
        }
    }
}

type Responder = dyn Fn(&HttpRequest<'_>) -> Result<HttpResponse, TransportError> + Send + Sync;

pub(crate) struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    responder: Option<Box<Responder>>,
    recorded: Mutex<Vec<Recorded>>,
    open: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Answer requests with `replies` in order.
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            responder: None,
            recorded: Mutex::new(Vec::new()),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer every request by calling `responder`.
    pub(crate) fn with_responder(
        responder: impl Fn(&HttpRequest<'_>) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::new([])
        }
    }

    pub(crate) fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().clone()
    }

    /// Response streams handed out and not yet dropped.
    pub(crate) fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn next_reply(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        if let Some(responder) = &self.responder {
            return responder(request);
        }
        match self.replies.lock().pop_front() {
            Some(Reply::Body { status, body }) => {
                Ok(HttpResponse::new(status, Cursor::new(body.into_bytes())))
            }
            Some(Reply::Fail(msg)) => Err(TransportError::Other(msg)),
            None => Err(TransportError::Other("no scripted reply left".to_string())),
        }
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        self.recorded.lock().push(Recorded {
            url: request.url.to_string(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: request.body.to_vec(),
        });

        let response = self.next_reply(&request)?;
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: response.status,
            body: Box::new(Tracked {
                inner: response.body,
                open: Arc::clone(&self.open),
            }),
        })
    }
}

struct Tracked {
    inner: Box<dyn Read>,
    open: Arc<AtomicUsize>,
}

impl Read for Tracked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
