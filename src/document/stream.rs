//! Range-request streaming
//!
//! Serves the cached document bytes with single-range HTTP support so
//! viewers can load documents progressively:
//!
//! - `HEAD` → 200 with the full length, no body
//! - `GET` without `Range` → 200 with the whole file
//! - `GET` with `Range: bytes=start-end` → 206 with exactly that span
//!
//! Only the first range of a multi-range header is honoured.

use std::io::SeekFrom;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Response, StatusCode},
};
use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};

use super::local_cache::LocalCache;
use super::{DocumentError, DocumentResult};

/// Content type of streamed documents
pub const DOCUMENT_CONTENT_TYPE: &str = "application/pdf";

const CHUNK_SIZE: usize = 64 * 1024;

/// Inclusive byte span within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the span; never zero
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for a file of `size` bytes
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// What a request's `Range` header asks for, resolved against the file size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRequest {
    /// No usable range: serve everything
    Full,
    Partial(ByteRange),
    /// Well-formed range that lies outside the file
    Unsatisfiable,
}

/// Resolve a `Range` header against a file of `size` bytes.
///
/// Malformed headers are ignored (full response), as HTTP allows.
pub fn resolve_range(header: Option<&str>, size: u64) -> RangeRequest {
    let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeRequest::Full;
    };
    let first = spec.split(',').next().unwrap_or("").trim();
    let Some((start, end)) = first.split_once('-') else {
        return RangeRequest::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // Suffix form: the last `n` bytes
        return match end.parse::<u64>() {
            Ok(0) => RangeRequest::Unsatisfiable,
            Ok(_) if size == 0 => RangeRequest::Unsatisfiable,
            Ok(n) => RangeRequest::Partial(ByteRange {
                start: size.saturating_sub(n),
                end: size - 1,
            }),
            Err(_) => RangeRequest::Full,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return RangeRequest::Full;
    };
    let end = if end.is_empty() {
        size.saturating_sub(1)
    } else {
        match end.parse::<u64>() {
            Ok(end) => end,
            Err(_) => return RangeRequest::Full,
        }
    };

    if size == 0 || start >= size || start > end {
        return RangeRequest::Unsatisfiable;
    }

    RangeRequest::Partial(ByteRange {
        start,
        end: end.min(size - 1),
    })
}

/// Serves cached documents over HTTP with range support
#[derive(Clone)]
pub struct RangeStreamer {
    cache: LocalCache,
}

impl RangeStreamer {
    pub fn new(cache: LocalCache) -> Self {
        Self { cache }
    }

    pub async fn stream(
        &self,
        id: &str,
        method: &Method,
        range: Option<&str>,
    ) -> DocumentResult<Response<Body>> {
        let path = self.cache.ensure_local(id).await?;
        let size = tokio::fs::metadata(&path).await?.len();

        let builder = Response::builder()
            .header(header::CONTENT_TYPE, DOCUMENT_CONTENT_TYPE)
            .header(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

        if method == Method::HEAD {
            return finish(
                builder
                    .status(StatusCode::OK)
                    .header(header::CONTENT_LENGTH, size)
                    .body(Body::empty()),
            );
        }

        match resolve_range(range, size) {
            RangeRequest::Full => {
                let file = tokio::fs::File::open(&path).await?;
                finish(
                    builder
                        .status(StatusCode::OK)
                        .header(header::CONTENT_LENGTH, size)
                        .body(Body::from_stream(chunked(file.take(size)))),
                )
            }
            RangeRequest::Partial(span) => {
                let mut file = tokio::fs::File::open(&path).await?;
                file.seek(SeekFrom::Start(span.start)).await?;

                tracing::debug!(
                    doc_id = %id,
                    start = span.start,
                    end = span.end,
                    size = size,
                    "Serving byte range"
                );

                finish(
                    builder
                        .status(StatusCode::PARTIAL_CONTENT)
                        .header(header::CONTENT_RANGE, span.content_range(size))
                        .header(header::CONTENT_LENGTH, span.len())
                        .body(Body::from_stream(chunked(file.take(span.len())))),
                )
            }
            RangeRequest::Unsatisfiable => finish(
                builder
                    .status(StatusCode::RANGE_NOT_SATISFIABLE)
                    .header(header::CONTENT_RANGE, format!("bytes */{}", size))
                    .body(Body::empty()),
            ),
        }
    }
}

fn finish(response: axum::http::Result<Response<Body>>) -> DocumentResult<Response<Body>> {
    response.map_err(|e| DocumentError::Internal(format!("Failed to build response: {}", e)))
}

/// Read `reader` to the end in fixed-size chunks
fn chunked<R>(reader: R) -> impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(Some(reader), |state| async move {
        let mut reader = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(buf), Some(reader)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
}
