//! Test doubles shared by the engine tests.
//!
//! Every double records what the engine did to it, so tests can assert
//! byte-for-byte content and exactly-once closing on every branch.

use crate::handle::{Resolver, SourceHandle, Sink, TargetHandle};
use crate::progress::ProgressSink;
use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Deterministic test payload.
pub(crate) fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Readable stream over a buffer that can fail or end early, and counts drops.
pub(crate) struct MemStream {
    data: Vec<u8>,
    pos: usize,
    fail_at: Option<usize>,
    drops: Arc<AtomicUsize>,
}

impl Read for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.fail_at.is_some_and(|at| self.pos >= at) {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
        }
        let mut end = (self.pos + buf.len()).min(self.data.len());
        if let Some(at) = self.fail_at {
            end = end.min(at.max(self.pos));
        }
        let n = end - self.pos;
        buf[..n].copy_from_slice(&self.data[self.pos..end]);
        self.pos = end;
        Ok(n)
    }
}

impl Drop for MemStream {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builder for in-memory sources.
#[derive(Clone, Default)]
pub(crate) struct MemSource {
    pub data: Vec<u8>,
    /// Declared length; defaults to `data.len()`
    pub length: Option<u64>,
    pub checksum: Option<Vec<u8>>,
    /// Read error once this many bytes have been produced
    pub fail_at: Option<usize>,
    pub drops: Arc<AtomicUsize>,
}

impl MemSource {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Declare more bytes than the stream will produce.
    pub(crate) fn truncated(data: Vec<u8>, declared: u64) -> Self {
        Self {
            length: Some(declared),
            ..Self::new(data)
        }
    }

    pub(crate) fn handle(&self, url: &str) -> SourceHandle {
        let stream = MemStream {
            data: self.data.clone(),
            pos: 0,
            fail_at: self.fail_at,
            drops: self.drops.clone(),
        };
        let length = self.length.unwrap_or(self.data.len() as u64);
        let handle = SourceHandle::new(url, stream, length);
        match &self.checksum {
            Some(checksum) => handle.with_checksum(checksum.clone()),
            None => handle,
        }
    }

    pub(crate) fn drop_count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

/// What a recording target saw.
#[derive(Debug, Default)]
pub(crate) struct TargetLog {
    pub data: Vec<u8>,
    pub writes: usize,
    pub writes_after_failure: usize,
    pub failed: bool,
    pub closes: usize,
    pub completed: Option<bool>,
}

/// Behaviour of a recording target.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TargetBehavior {
    /// Fail the write that starts at or beyond this offset
    pub fail_write_at: Option<usize>,
    pub fail_close: bool,
}

impl TargetBehavior {
    pub(crate) fn fail_write_at(offset: usize) -> Self {
        Self {
            fail_write_at: Some(offset),
            ..Self::default()
        }
    }

    pub(crate) fn fail_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }
}

/// Sink that records writes and closes into a shared [`TargetLog`].
pub(crate) struct RecordingSink {
    log: Arc<Mutex<TargetLog>>,
    behavior: TargetBehavior,
}

impl RecordingSink {
    pub(crate) fn new(behavior: TargetBehavior) -> (Self, Arc<Mutex<TargetLog>>) {
        let log = Arc::new(Mutex::new(TargetLog::default()));
        (
            Self {
                log: log.clone(),
                behavior,
            },
            log,
        )
    }
}

impl Sink for RecordingSink {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.writes += 1;
        if log.failed {
            log.writes_after_failure += 1;
        }
        if self
            .behavior
            .fail_write_at
            .is_some_and(|at| log.data.len() >= at)
        {
            log.failed = true;
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
        }
        log.data.extend_from_slice(buf);
        Ok(())
    }

    fn close(self: Box<Self>, completed: bool) -> io::Result<()> {
        let mut log = self.log.lock().unwrap();
        log.closes += 1;
        log.completed = Some(completed);
        if self.behavior.fail_close {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }
}

/// Open recording targets for `behaviors`, named `t1`, `t2`, ...
pub(crate) fn recording_targets(
    behaviors: &[TargetBehavior],
) -> (Vec<TargetHandle>, Vec<Arc<Mutex<TargetLog>>>) {
    behaviors
        .iter()
        .enumerate()
        .map(|(i, behavior)| {
            let (sink, log) = RecordingSink::new(*behavior);
            (TargetHandle::new(format!("t{}", i + 1), sink), log)
        })
        .unzip()
}

/// Panic unless every log shows exactly one close.
pub(crate) fn assert_closed_once(logs: &[Arc<Mutex<TargetLog>>]) {
    for (i, log) in logs.iter().enumerate() {
        let closes = log.lock().unwrap().closes;
        assert_eq!(closes, 1, "target t{} closed {} times", i + 1, closes);
    }
}

/// Resolver over in-memory sources and recording targets.
#[derive(Default)]
pub(crate) struct MemResolver {
    sources: HashMap<String, MemSource>,
    target_behaviors: HashMap<String, TargetBehavior>,
    unopenable_targets: Vec<String>,
    pub source_opens: AtomicUsize,
    pub target_logs: Mutex<Vec<(String, Arc<Mutex<TargetLog>>)>>,
}

impl MemResolver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_source(mut self, url: &str, source: MemSource) -> Self {
        self.sources.insert(url.to_owned(), source);
        self
    }

    pub(crate) fn with_target(mut self, url: &str, behavior: TargetBehavior) -> Self {
        self.target_behaviors.insert(url.to_owned(), behavior);
        self
    }

    pub(crate) fn with_unopenable_target(mut self, url: &str) -> Self {
        self.unopenable_targets.push(url.to_owned());
        self
    }

    /// Logs of every target opened so far, in open order.
    pub(crate) fn logs(&self) -> Vec<(String, Arc<Mutex<TargetLog>>)> {
        self.target_logs.lock().unwrap().clone()
    }

    pub(crate) fn log(&self, url: &str) -> Arc<Mutex<TargetLog>> {
        self.logs()
            .into_iter()
            .find(|(u, _)| u == url)
            .map(|(_, log)| log)
            .unwrap_or_else(|| panic!("target {url} was never opened"))
    }

    /// Panic unless every opened target was closed exactly once and every
    /// opened source was released.
    pub(crate) fn assert_balanced(&self) {
        for (url, log) in self.logs() {
            let closes = log.lock().unwrap().closes;
            assert_eq!(closes, 1, "target {url} closed {closes} times");
        }
        let drops: usize = self.sources.values().map(MemSource::drop_count).sum();
        assert_eq!(
            drops,
            self.source_opens.load(Ordering::SeqCst),
            "opened and released source counts differ"
        );
    }
}

impl Resolver for MemResolver {
    fn open_source(&self, url: &str) -> io::Result<SourceHandle> {
        let source = self
            .sources
            .get(url)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such object"))?;
        self.source_opens.fetch_add(1, Ordering::SeqCst);
        Ok(source.handle(url))
    }

    fn open_target(
        &self,
        url: &str,
        _length: u64,
        _checksum: Option<&[u8]>,
    ) -> io::Result<TargetHandle> {
        if self.unopenable_targets.iter().any(|u| u == url) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "access denied",
            ));
        }
        let behavior = self.target_behaviors.get(url).copied().unwrap_or_default();
        let (sink, log) = RecordingSink::new(behavior);
        self.target_logs
            .lock()
            .unwrap()
            .push((url.to_owned(), log));
        Ok(TargetHandle::new(url, sink))
    }

    fn is_same_object(&self, source: &str, target: &str) -> bool {
        source == target
    }
}

/// Progress sink that records every update and fails every other call.
#[derive(Default)]
pub(crate) struct FlakyProgress {
    pub total: AtomicU64,
    pub calls: AtomicU64,
}

impl ProgressSink for FlakyProgress {
    fn inc(&self, bytes: u64) -> io::Result<()> {
        self.total.fetch_add(bytes, Ordering::SeqCst);
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call % 2 == 1 {
            return Err(io::Error::other("progress display gone"));
        }
        Ok(())
    }
}
