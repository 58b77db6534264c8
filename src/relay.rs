//! Low-latency streaming relay.
//!
//! Delivers a resolved encoding to a consumer in two sequential upstream
//! requests:
//!
//! 1. a bounded `Range: bytes=0-{N-1}` prefix, flushed as soon as it
//!    arrives so the consumer hears audio after one origin round trip;
//! 2. a `Range: bytes={N}-` continuation, relayed chunk by chunk.
//!
//! The bytes written to the sink are exactly the media object, in order,
//! with no gap or overlap at the prefix boundary. Origins that ignore
//! `Range` (plain 200) are handled by truncating the prefix and skipping
//! the already-sent bytes of the continuation. Origins that answer a range
//! with fewer bytes than the disclosed object length get further
//! continuation requests from the first missing byte; a 206 that starts
//! anywhere else is an error.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use http::header::{
    HeaderMap, HeaderValue, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_RANGE, CONTENT_TYPE, RANGE,
    TRANSFER_ENCODING, USER_AGENT,
};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, field, info, instrument, warn, Span};
use uuid::Uuid;

use crate::backend::AudioEncoding;
use crate::fingerprint::random_identity;

/// Default size of the pre-buffered prefix.
pub const DEFAULT_PREFIX_BYTES: u64 = 64 * 1024;

const RANGE_NOT_SATISFIABLE: u16 = 416;

/// Origin or body failure while relaying.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("origin request failed: {0}")]
    Transport(String),

    #[error("origin answered HTTP {0}")]
    Status(u16),

    #[error("origin body interrupted: {0}")]
    Body(String),

    #[error("origin answered a range starting at byte {got}, expected {expected}")]
    Misplaced { expected: u64, got: u64 },
}

/// The consumer went away.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("consumer disconnected")]
pub struct SinkClosed;

/// Byte range requested from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// The first `n` bytes.
    Prefix(u64),
    /// Everything from offset `start` to the end.
    From(u64),
}

impl ByteRange {
    pub fn header_value(self) -> String {
        match self {
            ByteRange::Prefix(n) => format!("bytes=0-{}", n.saturating_sub(1)),
            ByteRange::From(start) => format!("bytes={start}-"),
        }
    }

    /// First object offset covered by the range.
    pub fn start(self) -> u64 {
        match self {
            ByteRange::Prefix(_) => 0,
            ByteRange::From(start) => start,
        }
    }
}

pub type ByteStream = BoxStream<'static, Result<Bytes, RelayError>>;

/// An origin response whose body has not been read yet.
pub struct OriginResponse {
    /// `true` for 206, `false` when the origin ignored the range.
    pub partial: bool,
    /// Object offset of the first body byte; always 0 when not partial.
    pub start: u64,
    /// Full object length, when the origin disclosed it.
    pub total_len: Option<u64>,
    pub body: ByteStream,
}

/// Where media bytes come from.
#[async_trait]
pub trait MediaOrigin: Send + Sync {
    /// Request `range` of the object at `url`. Non-2xx is an error.
    async fn fetch(&self, url: &str, range: ByteRange) -> Result<OriginResponse, RelayError>;
}

/// reqwest-backed [`MediaOrigin`].
#[derive(Clone)]
pub struct HttpOrigin {
    client: Client,
}

impl HttpOrigin {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaOrigin for HttpOrigin {
    async fn fetch(&self, url: &str, range: ByteRange) -> Result<OriginResponse, RelayError> {
        let response = self
            .client
            .get(url)
            .header(RANGE, range.header_value())
            .header(USER_AGENT, random_identity())
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }

        let partial = status == StatusCode::PARTIAL_CONTENT;
        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let (start, total_len) = if partial {
            let content_range = content_range.as_deref();
            (
                content_range.and_then(content_range_start).unwrap_or(range.start()),
                content_range.and_then(content_range_total),
            )
        } else {
            (0, response.content_length())
        };

        let body = response
            .bytes_stream()
            .map_err(|e| RelayError::Body(e.to_string()))
            .boxed();

        Ok(OriginResponse {
            partial,
            start,
            total_len,
            body,
        })
    }
}

/// First byte position from `Content-Range: bytes 65536-999999/1000000`.
fn content_range_start(value: &str) -> Option<u64> {
    value
        .trim()
        .strip_prefix("bytes")?
        .trim_start()
        .split('-')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Total length from `Content-Range: bytes 0-65535/1000000`.
fn content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// Response metadata announced before any body byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayHead {
    pub content_type: String,
    pub session: Uuid,
}

impl RelayHead {
    pub fn for_encoding(encoding: &AudioEncoding) -> Self {
        Self {
            content_type: encoding.content_type().to_string(),
            session: Uuid::new_v4(),
        }
    }

    /// Content type, range support, chunked transfer and no caching.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&self.content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
        );
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers
    }
}

/// Destination of a relay.
#[async_trait]
pub trait RelaySink: Send {
    async fn announce(&mut self, head: RelayHead) -> Result<(), SinkClosed>;

    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;

    /// Report a failure; bytes already written stay written.
    async fn fail(&mut self, error: &RelayError);

    fn is_closed(&self) -> bool;
}

/// How a relay ended without an origin error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed { bytes: u64 },
    Disconnected { bytes: u64 },
}

struct Pumped {
    written: u64,
    disconnected: bool,
}

/// Relay `encoding` from `origin` into `sink`.
///
/// A failed prefix fails the whole relay. After the prefix, the sink is
/// checked before each continuation is requested and before every upstream
/// read; a closed sink drops the upstream body at once. The object counts
/// as complete once the disclosed total length is reached, or, when no
/// length was disclosed, at the end of a body.
#[instrument(skip_all, fields(session = field::Empty, content_type = field::Empty))]
pub async fn relay<O, S>(
    origin: &O,
    encoding: &AudioEncoding,
    prefix_bytes: u64,
    sink: &mut S,
) -> Result<RelayOutcome, RelayError>
where
    O: MediaOrigin + ?Sized,
    S: RelaySink + ?Sized,
{
    let prefix_bytes = prefix_bytes.max(1);
    let head = RelayHead::for_encoding(encoding);
    Span::current()
        .record("session", field::display(head.session))
        .record("content_type", head.content_type.as_str());

    if sink.announce(head).await.is_err() {
        return Ok(RelayOutcome::Disconnected { bytes: 0 });
    }

    let prefix = match origin.fetch(&encoding.url, ByteRange::Prefix(prefix_bytes)).await {
        Ok(response) => response,
        Err(err) => return Err(fail(sink, err).await),
    };
    let mut total_len = prefix.total_len;

    let pumped = match leading_skip(&prefix, 0) {
        Ok(skip) => pump(prefix.body, sink, skip, Some(prefix_bytes)).await,
        Err(err) => Err(err),
    };
    let mut sent = match pumped {
        Ok(pumped) if pumped.disconnected => {
            return Ok(RelayOutcome::Disconnected {
                bytes: pumped.written,
            })
        }
        Ok(pumped) => pumped.written,
        Err(err) => return Err(fail(sink, err).await),
    };
    debug!(bytes = sent, "prefix flushed");

    // A short prefix only means the end when the origin did not say otherwise
    if total_len.map_or(sent < prefix_bytes, |total| sent >= total) {
        info!(bytes = sent, "relay complete within prefix");
        return Ok(RelayOutcome::Completed { bytes: sent });
    }

    loop {
        if sink.is_closed() {
            debug!(bytes = sent, "consumer left before continuation");
            return Ok(RelayOutcome::Disconnected { bytes: sent });
        }

        let continuation = match origin.fetch(&encoding.url, ByteRange::From(sent)).await {
            Ok(response) => response,
            Err(RelayError::Status(RANGE_NOT_SATISFIABLE)) => {
                return Ok(RelayOutcome::Completed { bytes: sent });
            }
            Err(err) => return Err(fail(sink, err).await),
        };
        total_len = total_len.or(continuation.total_len);

        let pumped = match leading_skip(&continuation, sent) {
            Ok(skip) => pump(continuation.body, sink, skip, None).await,
            Err(err) => Err(err),
        };
        let pumped = match pumped {
            Ok(pumped) => pumped,
            Err(err) => return Err(fail(sink, err).await),
        };
        sent += pumped.written;

        if pumped.disconnected {
            debug!(bytes = sent, "consumer left during continuation");
            return Ok(RelayOutcome::Disconnected { bytes: sent });
        }

        match total_len {
            Some(total) if sent < total => {
                if pumped.written == 0 {
                    let err = RelayError::Body(format!("origin stalled at byte {sent} of {total}"));
                    return Err(fail(sink, err).await);
                }
                debug!(bytes = sent, total, "short range answer, continuing");
            }
            _ => {
                info!(bytes = sent, "relay complete");
                return Ok(RelayOutcome::Completed { bytes: sent });
            }
        }
    }
}

/// Bytes to drop from `response` so relaying resumes at `offset`.
///
/// A full (200) body starts at byte 0; a 206 must start exactly at `offset`.
fn leading_skip(response: &OriginResponse, offset: u64) -> Result<u64, RelayError> {
    if !response.partial {
        return Ok(offset);
    }
    if response.start == offset {
        Ok(0)
    } else {
        Err(RelayError::Misplaced {
            expected: offset,
            got: response.start,
        })
    }
}

async fn fail<S: RelaySink + ?Sized>(sink: &mut S, err: RelayError) -> RelayError {
    warn!(error = %err, "relay failed");
    sink.fail(&err).await;
    err
}

/// Copy `body` into `sink`, dropping the first `skip` bytes and stopping
/// after `limit` bytes when given.
async fn pump<S: RelaySink + ?Sized>(
    mut body: ByteStream,
    sink: &mut S,
    mut skip: u64,
    limit: Option<u64>,
) -> Result<Pumped, RelayError> {
    let mut written = 0u64;

    loop {
        if sink.is_closed() {
            return Ok(Pumped {
                written,
                disconnected: true,
            });
        }

        let Some(chunk) = body.next().await else {
            break;
        };
        let mut chunk = chunk?;

        if skip > 0 {
            let dropped = skip.min(chunk.len() as u64);
            chunk = chunk.slice(usize::try_from(dropped).unwrap_or(chunk.len())..);
            skip -= dropped;
        }

        if let Some(limit) = limit {
            let room = usize::try_from(limit - written).unwrap_or(usize::MAX);
            chunk.truncate(room);
        }

        if !chunk.is_empty() {
            let len = chunk.len() as u64;
            if sink.write(chunk).await.is_err() {
                return Ok(Pumped {
                    written,
                    disconnected: true,
                });
            }
            written += len;
        }

        if limit.is_some_and(|limit| written >= limit) {
            break;
        }
    }

    Ok(Pumped {
        written,
        disconnected: false,
    })
}

/// [`RelaySink`] feeding an HTTP response body through channels.
pub struct ChannelSink {
    head: Option<oneshot::Sender<RelayHead>>,
    body: mpsc::Sender<Result<Bytes, RelayError>>,
}

/// Receiving half of [`channel`].
pub struct RelayReceiver {
    pub head: oneshot::Receiver<RelayHead>,
    pub body: mpsc::Receiver<Result<Bytes, RelayError>>,
}

/// A sink/receiver pair; `capacity` bounds in-flight chunks.
pub fn channel(capacity: usize) -> (ChannelSink, RelayReceiver) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(capacity.max(1));
    (
        ChannelSink {
            head: Some(head_tx),
            body: body_tx,
        },
        RelayReceiver {
            head: head_rx,
            body: body_rx,
        },
    )
}

#[async_trait]
impl RelaySink for ChannelSink {
    async fn announce(&mut self, head: RelayHead) -> Result<(), SinkClosed> {
        self.head.take().ok_or(SinkClosed)?.send(head).map_err(|_| SinkClosed)
    }

    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.body.send(Ok(chunk)).await.map_err(|_| SinkClosed)
    }

    async fn fail(&mut self, error: &RelayError) {
        let _ = self.body.send(Err(error.clone())).await;
    }

    fn is_closed(&self) -> bool {
        self.body.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::backend::Container;

    const OBJECT_LEN: usize = 1_000_000;
    const CHUNK: usize = 8192;
    const PREFIX: u64 = 64 * 1024;

    fn media_object(len: usize) -> Bytes {
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>().into()
    }

    /// In-memory origin with call and pull counters.
    struct FakeOrigin {
        object: Bytes,
        honor_ranges: bool,
        fail_status: Option<u16>,
        /// Upper bound on the bytes in any 206 body.
        range_cap: Option<usize>,
        /// Continuations start this many bytes past the requested offset.
        misplace_by: usize,
        ranges: Mutex<Vec<ByteRange>>,
        pulled: Arc<AtomicUsize>,
    }

    impl FakeOrigin {
        fn new(object: Bytes) -> Self {
            Self {
                object,
                honor_ranges: true,
                fail_status: None,
                range_cap: None,
                misplace_by: 0,
                ranges: Mutex::new(Vec::new()),
                pulled: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn requests(&self) -> Vec<ByteRange> {
            self.ranges.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaOrigin for FakeOrigin {
        async fn fetch(&self, _url: &str, range: ByteRange) -> Result<OriginResponse, RelayError> {
            self.ranges.lock().unwrap().push(range);
            if let Some(code) = self.fail_status {
                return Err(RelayError::Status(code));
            }

            let len = self.object.len();
            let (start, data) = if self.honor_ranges {
                let (start, end) = match range {
                    ByteRange::Prefix(n) => (0, (n as usize).min(len)),
                    ByteRange::From(start) => ((start as usize + self.misplace_by).min(len), len),
                };
                if start >= len {
                    return Err(RelayError::Status(RANGE_NOT_SATISFIABLE));
                }
                let end = self.range_cap.map_or(end, |cap| end.min(start + cap));
                (start, self.object.slice(start..end))
            } else {
                (0, self.object.clone())
            };

            let chunks: Vec<Result<Bytes, RelayError>> = data
                .chunks(CHUNK)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            let pulled = Arc::clone(&self.pulled);
            let body = futures::stream::iter(chunks)
                .inspect(move |_| {
                    pulled.fetch_add(1, Ordering::SeqCst);
                })
                .boxed();

            Ok(OriginResponse {
                partial: self.honor_ranges,
                start: start as u64,
                total_len: Some(len as u64),
                body,
            })
        }
    }

    /// Collects everything; closes itself after `close_after` bytes.
    #[derive(Default)]
    struct VecSink {
        head: Option<RelayHead>,
        writes: Vec<Bytes>,
        failed: Option<RelayError>,
        close_after: Option<usize>,
    }

    impl VecSink {
        fn bytes(&self) -> Vec<u8> {
            self.writes.iter().flat_map(|b| b.iter().copied()).collect()
        }

        fn written(&self) -> usize {
            self.writes.iter().map(Bytes::len).sum()
        }
    }

    #[async_trait]
    impl RelaySink for VecSink {
        async fn announce(&mut self, head: RelayHead) -> Result<(), SinkClosed> {
            self.head = Some(head);
            Ok(())
        }

        async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
            if self.is_closed() {
                return Err(SinkClosed);
            }
            self.writes.push(chunk);
            Ok(())
        }

        async fn fail(&mut self, error: &RelayError) {
            self.failed = Some(error.clone());
        }

        fn is_closed(&self) -> bool {
            self.close_after.is_some_and(|limit| self.written() >= limit)
        }
    }

    fn encoding() -> AudioEncoding {
        AudioEncoding {
            url: "https://media.example/audio".into(),
            container: Container::M4a,
            bitrate_bps: 128_000,
            mime_type: Some("audio/mp4; codecs=\"mp4a.40.2\"".into()),
            codec: None,
        }
    }

    #[tokio::test]
    async fn prefix_then_continuation_is_byte_exact() {
        let object = media_object(OBJECT_LEN);
        let origin = FakeOrigin::new(object.clone());
        let mut sink = VecSink::default();

        let outcome = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Completed { bytes: OBJECT_LEN as u64 });
        assert_eq!(
            origin.requests(),
            vec![ByteRange::Prefix(PREFIX), ByteRange::From(PREFIX)]
        );
        let bytes = sink.bytes();
        assert_eq!(&bytes[..PREFIX as usize], &object[..PREFIX as usize]);
        assert_eq!(bytes.len(), OBJECT_LEN);
        assert_eq!(bytes, object.to_vec());
    }

    #[tokio::test]
    async fn origin_ignoring_ranges_is_still_exact() {
        let object = media_object(OBJECT_LEN);
        let mut origin = FakeOrigin::new(object.clone());
        origin.honor_ranges = false;
        let mut sink = VecSink::default();

        relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(sink.bytes(), object.to_vec());
    }

    #[tokio::test]
    async fn small_object_needs_one_request() {
        let object = media_object(10_000);
        let origin = FakeOrigin::new(object.clone());
        let mut sink = VecSink::default();

        let outcome = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Completed { bytes: 10_000 });
        assert_eq!(origin.requests().len(), 1);
        assert_eq!(sink.bytes(), object.to_vec());
    }

    #[tokio::test]
    async fn object_of_exactly_prefix_size_needs_one_request() {
        let origin = FakeOrigin::new(media_object(PREFIX as usize));
        let mut sink = VecSink::default();

        relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(origin.requests().len(), 1);
        assert_eq!(sink.written(), PREFIX as usize);
    }

    #[tokio::test]
    async fn short_range_answers_are_continued() {
        let object = media_object(OBJECT_LEN);
        let mut origin = FakeOrigin::new(object.clone());
        origin.range_cap = Some(40_000);
        let mut sink = VecSink::default();

        let outcome = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Completed { bytes: OBJECT_LEN as u64 });
        let requests = origin.requests();
        assert_eq!(requests[0], ByteRange::Prefix(PREFIX));
        assert_eq!(requests[1], ByteRange::From(40_000));
        assert_eq!(requests.len(), OBJECT_LEN.div_ceil(40_000));
        assert_eq!(sink.bytes(), object.to_vec());
    }

    #[tokio::test]
    async fn capped_prefix_without_total_ends_stream() {
        struct Unsized(FakeOrigin);

        #[async_trait]
        impl MediaOrigin for Unsized {
            async fn fetch(&self, url: &str, range: ByteRange) -> Result<OriginResponse, RelayError> {
                let mut response = self.0.fetch(url, range).await?;
                response.total_len = None;
                Ok(response)
            }
        }

        let mut inner = FakeOrigin::new(media_object(OBJECT_LEN));
        inner.range_cap = Some(1000);
        let origin = Unsized(inner);
        let mut sink = VecSink::default();

        let outcome = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Completed { bytes: 1000 });
        assert_eq!(origin.0.requests().len(), 1);
    }

    #[tokio::test]
    async fn misplaced_continuation_is_an_error() {
        let mut origin = FakeOrigin::new(media_object(OBJECT_LEN));
        origin.misplace_by = 10;
        let mut sink = VecSink::default();

        let err = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap_err();

        let expected = RelayError::Misplaced {
            expected: PREFIX,
            got: PREFIX + 10,
        };
        assert_eq!(err, expected);
        assert_eq!(sink.failed, Some(expected));
        assert_eq!(sink.written(), PREFIX as usize);
    }

    #[tokio::test]
    async fn failed_prefix_fails_relay() {
        let mut origin = FakeOrigin::new(media_object(OBJECT_LEN));
        origin.fail_status = Some(403);
        let mut sink = VecSink::default();

        let err = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap_err();

        assert_eq!(err, RelayError::Status(403));
        assert_eq!(sink.failed, Some(RelayError::Status(403)));
        assert!(sink.writes.is_empty());
        assert_eq!(origin.requests().len(), 1);
    }

    #[tokio::test]
    async fn disconnect_after_prefix_skips_continuation() {
        let origin = FakeOrigin::new(media_object(OBJECT_LEN));
        let mut sink = VecSink {
            close_after: Some(PREFIX as usize),
            ..VecSink::default()
        };

        let outcome = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Disconnected { bytes: PREFIX });
        assert_eq!(origin.requests(), vec![ByteRange::Prefix(PREFIX)]);
    }

    #[tokio::test]
    async fn disconnect_mid_continuation_stops_reading() {
        let origin = FakeOrigin::new(media_object(OBJECT_LEN));
        let close_at = PREFIX as usize + 3 * CHUNK;
        let mut sink = VecSink {
            close_after: Some(close_at),
            ..VecSink::default()
        };

        let outcome = relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        assert_eq!(outcome, RelayOutcome::Disconnected { bytes: close_at as u64 });
        let prefix_chunks = PREFIX as usize / CHUNK;
        assert_eq!(origin.pulled.load(Ordering::SeqCst), prefix_chunks + 3);
    }

    #[tokio::test]
    async fn head_is_announced_before_bytes() {
        let origin = FakeOrigin::new(media_object(1000));
        let mut sink = VecSink::default();

        relay(&origin, &encoding(), PREFIX, &mut sink).await.unwrap();

        let head = sink.head.expect("head announced");
        assert_eq!(head.content_type, "audio/mp4");
        let headers = head.headers();
        assert_eq!(headers[CONTENT_TYPE], "audio/mp4");
        assert_eq!(headers[ACCEPT_RANGES], "bytes");
        assert_eq!(headers[TRANSFER_ENCODING], "chunked");
        assert_eq!(headers[CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn channel_sink_delivers_head_and_body() {
        let (mut sink, mut rx) = channel(4);
        let origin = FakeOrigin::new(media_object(20_000));

        let task = tokio::spawn(async move { relay(&origin, &encoding(), PREFIX, &mut sink).await });

        let head = (&mut rx.head).await.unwrap();
        assert_eq!(head.content_type, "audio/mp4");
        let mut received = Vec::new();
        while let Some(chunk) = rx.body.recv().await {
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, media_object(20_000).to_vec());
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn channel_sink_closes_with_receiver() {
        let (sink, rx) = channel(1);
        assert!(!sink.is_closed());
        drop(rx);
        assert!(sink.is_closed());
    }

    #[test]
    fn channel_sink_applies_backpressure() {
        let (mut sink, mut rx) = channel(1);
        tokio_test::block_on(sink.write(Bytes::from_static(b"a"))).unwrap();

        let mut blocked = tokio_test::task::spawn(sink.write(Bytes::from_static(b"b")));
        tokio_test::assert_pending!(blocked.poll());

        assert_eq!(rx.body.try_recv().unwrap().unwrap(), Bytes::from_static(b"a"));
        assert!(blocked.is_woken());
        tokio_test::assert_ready_ok!(blocked.poll());
    }

    #[test]
    fn range_header_values() {
        assert_eq!(ByteRange::Prefix(65_536).header_value(), "bytes=0-65535");
        assert_eq!(ByteRange::From(65_536).header_value(), "bytes=65536-");
    }

    #[test]
    fn parses_content_range_start() {
        assert_eq!(content_range_start("bytes 65536-999999/1000000"), Some(65_536));
        assert_eq!(content_range_start("bytes 0-99/*"), Some(0));
        assert_eq!(content_range_start("garbage"), None);
    }

    #[test]
    fn parses_content_range_total() {
        assert_eq!(content_range_total("bytes 0-65535/1000000"), Some(1_000_000));
        assert_eq!(content_range_total("bytes 0-65535/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }
}
