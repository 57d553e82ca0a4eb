//! Source and target handles, and the resolver boundary that opens them.
//!
//! The engine never resolves URLs itself. A [`Resolver`] turns a source URL
//! into a [`SourceHandle`] and a target URL into a [`TargetHandle`]; the
//! engine only reads, writes and closes them.

use std::fmt;
use std::io::{self, Read, Write};

/// An open source stream with its declared length and optional checksum.
///
/// The stream is released when the handle is dropped, which the engine does
/// on every exit path of a copy.
pub struct SourceHandle {
    url: String,
    stream: Box<dyn Read + Send>,
    length: u64,
    checksum: Option<Vec<u8>>,
}

impl SourceHandle {
    /// Wrap a readable stream of `length` bytes.
    pub fn new(url: impl Into<String>, stream: impl Read + Send + 'static, length: u64) -> Self {
        Self {
            url: url.into(),
            stream: Box::new(stream),
            length,
            checksum: None,
        }
    }

    /// Declare the SHA-256 digest of the stream content.
    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<Vec<u8>>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Declared length. Authoritative for the transfer.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Declared checksum, if any.
    pub fn checksum(&self) -> Option<&[u8]> {
        self.checksum.as_deref()
    }

    pub(crate) fn stream_mut(&mut self) -> &mut (dyn Read + Send) {
        &mut *self.stream
    }

    pub(crate) fn set_checksum_if_missing(&mut self, checksum: Option<&[u8]>) {
        if self.checksum.is_none() {
            self.checksum = checksum.map(<[u8]>::to_vec);
        }
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceHandle")
            .field("url", &self.url)
            .field("length", &self.length)
            .field("checksum", &self.checksum.as_deref().map(hex::encode))
            .finish_non_exhaustive()
    }
}

/// A writable, closeable sink for one target.
///
/// `close` consumes the sink, so a sink is closed at most once by
/// construction; the engine guarantees it is closed exactly once.
pub trait Sink: Send {
    /// Write the whole buffer.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Finish the sink.
    ///
    /// `completed` is true when the sink received the full stream, the
    /// stream was verified, and no write to this sink failed. Sinks that
    /// stage data (temp files, multipart uploads) should commit only then.
    fn close(self: Box<Self>, completed: bool) -> io::Result<()>;
}

/// Adapter turning any [`Write`] into a [`Sink`] that flushes on close.
#[derive(Debug)]
pub struct WriterSink<W> {
    inner: W,
}

impl<W> WriterSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.inner.write_all(buf)
    }

    fn close(mut self: Box<Self>, _completed: bool) -> io::Result<()> {
        self.inner.flush()
    }
}

/// An open target: its URL and the sink that receives its bytes.
pub struct TargetHandle {
    url: String,
    sink: Box<dyn Sink>,
}

impl TargetHandle {
    /// Pair a URL with an open sink.
    pub fn new(url: impl Into<String>, sink: impl Sink + 'static) -> Self {
        Self {
            url: url.into(),
            sink: Box::new(sink),
        }
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn into_parts(self) -> (String, Box<dyn Sink>) {
        (self.url, self.sink)
    }
}

impl fmt::Debug for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetHandle")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// Opens sources and targets by URL.
///
/// Implementations decide what a URL means (local path, object key, ...).
/// Open failures are reported as plain IO errors; the engine classifies
/// them as source-open or target-open failures.
pub trait Resolver: Send + Sync {
    /// Open `url` for reading.
    fn open_source(&self, url: &str) -> io::Result<SourceHandle>;

    /// Open `url` for writing `length` bytes.
    ///
    /// `checksum` is the source digest when known, for backends that can
    /// validate uploads server-side.
    fn open_target(&self, url: &str, length: u64, checksum: Option<&[u8]>)
    -> io::Result<TargetHandle>;

    /// Whether `target` names the same object as `source`.
    ///
    /// Such a target is refused before it is opened, since opening it for
    /// writing would destroy the source. The default never matches.
    fn is_same_object(&self, source: &str, target: &str) -> bool {
        let _ = (source, target);
        false
    }
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn open_source(&self, url: &str) -> io::Result<SourceHandle> {
        (**self).open_source(url)
    }

    fn open_target(
        &self,
        url: &str,
        length: u64,
        checksum: Option<&[u8]>,
    ) -> io::Result<TargetHandle> {
        (**self).open_target(url, length, checksum)
    }

    fn is_same_object(&self, source: &str, target: &str) -> bool {
        (**self).is_same_object(source, target)
    }
}
