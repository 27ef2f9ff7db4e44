//! The POST → drain → decode pipeline shared by sending and uploading.

use std::io::Read;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::codec::Codec;
use crate::error::{BotError, TransportError};
use crate::http::{HttpMethod, HttpRequest, Transport};

/// POST `body` to `url` and decode the response into `T`.
///
/// The response stream is read to the end into `response_buf` and dropped
/// before decoding starts, so the connection is released even when decoding
/// fails. `response_buf` is cleared first; the caller owns clearing it
/// afterwards.
pub(crate) fn post<C, T>(
    transport: &dyn Transport,
    codec: &C,
    url: &str,
    headers: &[(&str, &str)],
    body: &[u8],
    response_buf: &mut Vec<u8>,
) -> Result<T, BotError>
where
    C: Codec,
    T: DeserializeOwned,
{
    let request = HttpRequest {
        method: HttpMethod::Post,
        url,
        headers,
        body,
    };
    trace!(bytes = body.len(), "dispatching request");

    let response = transport.execute(request)?;
    let status = response.status;

    response_buf.clear();
    let mut stream = response.body;
    let drained = stream.read_to_end(response_buf);
    drop(stream);
    drained.map_err(TransportError::Io)?;

    debug!(status, bytes = response_buf.len(), "received response");
    codec.decode(response_buf).map_err(BotError::Decode)
}
