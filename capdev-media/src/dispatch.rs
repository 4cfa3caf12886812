//! Frame delivery from the host's sample thread to caller callbacks
//!
//! The host calls [`SampleSink::on_sample`] on a thread it owns. The
//! dispatcher wraps each sample with a snapshot of the stream's resolved
//! configuration and runs the callback synchronously on that thread.
//!
//! Callbacks must return promptly: a stalled callback stalls capture. They
//! must also not call back into graph control methods (`stop`, `reset_graph`
//! and friends), which wait for the callback to finish. Use [`frame_queue`]
//! to move frames to a task that is allowed to do both.

use bytes::Bytes;
use capdev_core::{RawSample, ResolvedAudioConfig, ResolvedVideoConfig, SampleSink, StreamKind};
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// One frame as seen by a callback
#[derive(Debug)]
pub struct Frame<'a, C> {
    snapshot: &'a Arc<C>,
    /// Sample payload, only valid during the callback
    pub data: &'a [u8],
    /// Presentation start time, 100ns units
    pub start_time: i64,
    /// Presentation stop time, 100ns units
    pub stop_time: i64,
}

impl<'a, C> Frame<'a, C> {
    /// Configuration the stream was started with
    pub fn config(&self) -> &C {
        self.snapshot
    }

    /// Shared handle to the configuration snapshot
    pub fn snapshot(&self) -> Arc<C> {
        Arc::clone(self.snapshot)
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Caller-supplied frame handler
pub type FrameCallback<C> = Arc<dyn Fn(&Frame<'_, C>) + Send + Sync>;

/// Handler for video frames
pub type VideoCallback = FrameCallback<ResolvedVideoConfig>;

/// Handler for audio frames
pub type AudioCallback = FrameCallback<ResolvedAudioConfig>;

/// Delivery counters of one dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Samples handed to the callback
    pub delivered: u64,
    /// Samples that arrived while the dispatcher was inactive
    pub dropped: u64,
    /// Callback invocations that panicked
    pub callback_panics: u64,
    /// Payload bytes handed to the callback
    pub bytes: u64,
}

/// Sample sink that forwards to a caller callback
pub struct FrameDispatcher<C> {
    stream: StreamKind,
    callback: FrameCallback<C>,
    active: RwLock<Option<Arc<C>>>,
    delivered: AtomicU64,
    dropped: AtomicU64,
    panics: AtomicU64,
    bytes: AtomicU64,
}

impl<C> FrameDispatcher<C> {
    /// Inactive dispatcher for one stream
    pub fn new(stream: StreamKind, callback: FrameCallback<C>) -> Self {
        Self {
            stream,
            callback,
            active: RwLock::new(None),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            panics: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
        }
    }

    /// Start delivering with a configuration snapshot
    pub fn activate(&self, config: C) {
        *self.active.write() = Some(Arc::new(config));
        debug!("{} dispatcher active", self.stream);
    }

    /// Stop delivering
    ///
    /// Returns after any callback running on the delivery thread has
    /// finished; no callback starts afterwards until the next `activate`.
    pub fn deactivate(&self) {
        if self.active.write().take().is_some() {
            debug!("{} dispatcher inactive", self.stream);
        }
    }

    /// Whether samples currently reach the callback
    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }

    /// Snapshot of the delivery counters
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            callback_panics: self.panics.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }

    /// Hand one sample to the callback
    pub fn dispatch(&self, sample: RawSample<'_>) {
        let guard = self.active.read();
        let Some(snapshot) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let frame = Frame {
            snapshot,
            data: sample.data,
            start_time: sample.start_time,
            stop_time: sample.stop_time,
        };

        // A panic must not unwind into the host's thread
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.callback)(&frame)));
        match outcome {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(sample.data.len() as u64, Ordering::Relaxed);
            }
            Err(_) => {
                self.panics.fetch_add(1, Ordering::Relaxed);
                error!(
                    "{} frame callback panicked at {}; continuing with next sample",
                    self.stream, sample.start_time
                );
            }
        }
    }
}

impl<C: Send + Sync> SampleSink for FrameDispatcher<C> {
    fn on_sample(&self, sample: RawSample<'_>) {
        self.dispatch(sample);
    }
}

/// Frame copied out of the delivery thread
#[derive(Debug, Clone)]
pub struct OwnedFrame<C> {
    pub config: Arc<C>,
    pub data: Bytes,
    pub start_time: i64,
    pub stop_time: i64,
}

/// Receiving end of a [`frame_queue`]
#[derive(Debug)]
pub struct FrameReceiver<C> {
    receiver: mpsc::Receiver<OwnedFrame<C>>,
    dropped: Arc<AtomicU64>,
}

impl<C> FrameReceiver<C> {
    /// Wait for the next frame; `None` once the callback is gone
    pub async fn recv(&mut self) -> Option<OwnedFrame<C>> {
        self.receiver.recv().await
    }

    /// Next frame if one is queued
    pub fn try_recv(&mut self) -> Option<OwnedFrame<C>> {
        self.receiver.try_recv().ok()
    }

    /// Frames discarded because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Callback that copies frames into a bounded queue
///
/// The delivery thread never blocks on the queue; when it is full the frame
/// is discarded and counted.
pub fn frame_queue<C>(capacity: usize) -> (FrameCallback<C>, FrameReceiver<C>)
where
    C: Send + Sync + 'static,
{
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&dropped);

    let callback: FrameCallback<C> = Arc::new(move |frame: &Frame<'_, C>| {
        let owned = OwnedFrame {
            config: frame.snapshot(),
            data: Bytes::copy_from_slice(frame.data),
            start_time: frame.start_time,
            stop_time: frame.stop_time,
        };
        if sender.try_send(owned).is_err() {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    });

    (callback, FrameReceiver { receiver, dropped })
}
