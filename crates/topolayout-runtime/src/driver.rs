//! Background layout passes with results applied on the owning thread.
//!
//! A [`LayoutDriver`] belongs to the thread that owns the visible elements
//! (the UI thread). [`LayoutDriver::request_layout`] launches one worker
//! thread per pass; the worker computes a [`PositionMap`] and posts it back
//! over a channel. The owner calls [`LayoutDriver::drain`] on its own
//! schedule to apply finished passes to a [`LayoutTarget`].
//!
//! Only one pass is in flight at a time. The running flag is set before the
//! worker starts and cleared only after the owner has handled the pass
//! result, so requests arriving in between are dropped rather than queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use topolayout_core::{ElementId, GraphLayout, PositionMap, Vector2};

use crate::error::RuntimeError;

/// Where finished positions are applied.
pub trait LayoutTarget {
    /// Whether `id` is still live and subject to layout.
    fn accepts(&self, id: ElementId) -> bool;

    /// Move `id` to `position` in world coordinates.
    fn set_position(&mut self, id: ElementId, position: Vector2);
}

/// What [`LayoutDriver::request_layout`] did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A worker was started.
    Started,
    /// A pass was already in flight; the request was discarded.
    Dropped,
}

/// Message from a worker thread to the owning thread.
#[derive(Debug)]
pub enum PassMessage {
    Completed {
        generation: u64,
        positions: PositionMap,
        forced_update: bool,
    },
    Failed {
        generation: u64,
        error: String,
    },
    /// The worker unwound before producing a result.
    Aborted { generation: u64 },
    /// The layout was reset before the worker got to it; nothing ran.
    Superseded { generation: u64 },
}

impl PassMessage {
    pub fn generation(&self) -> u64 {
        match self {
            PassMessage::Completed { generation, .. }
            | PassMessage::Failed { generation, .. }
            | PassMessage::Aborted { generation }
            | PassMessage::Superseded { generation } => *generation,
        }
    }
}

/// Outcome of applying pending pass results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Pass results handled.
    pub passes: usize,
    /// Positions written to the target.
    pub applied: usize,
    /// Positions discarded because the element was removed or pinned.
    pub skipped: usize,
    /// Results discarded because the layout was reset after they started.
    pub stale: usize,
    /// Passes that failed or aborted.
    pub failed: usize,
    /// A layout asked for another pass right away.
    pub relayout_requested: bool,
}

impl DrainReport {
    /// Add `other`'s counts to this report.
    pub fn merge(&mut self, other: DrainReport) {
        self.passes += other.passes;
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.stale += other.stale;
        self.failed += other.failed;
        self.relayout_requested |= other.relayout_requested;
    }
}

/// Drives a [`GraphLayout`] one background pass at a time.
pub struct LayoutDriver<L: GraphLayout> {
    name: String,
    layout: Arc<Mutex<L>>,
    running: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    tx: Sender<PassMessage>,
    rx: Receiver<PassMessage>,
}

impl<L> LayoutDriver<L>
where
    L: GraphLayout + Send + 'static,
{
    /// Create a driver; `name` labels worker threads and log events.
    pub fn new(name: impl Into<String>, layout: L) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            name: name.into(),
            layout: Arc::new(Mutex::new(layout)),
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            tx,
            rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a pass is in flight or awaiting [`drain`](Self::drain).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a pass unless one is already in flight.
    ///
    /// `snapshot` runs on the worker thread and must capture everything the
    /// pass reads; mutations made after it runs are seen by the next pass.
    pub fn request_layout<F>(&self, snapshot: F) -> Result<RequestOutcome, RuntimeError>
    where
        F: FnOnce() -> L::Snapshot + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!(driver = %self.name, "layout_request_dropped");
            return Ok(RequestOutcome::Dropped);
        }

        let generation = self.generation();
        let current = Arc::clone(&self.generation);
        let layout = Arc::clone(&self.layout);
        let tx = self.tx.clone();

        let spawned = thread::Builder::new()
            .name(format!("{}-layout", self.name))
            .spawn(move || {
                let mut abort = AbortNotice {
                    tx: tx.clone(),
                    generation,
                    armed: true,
                };
                let snapshot = snapshot();
                let message = {
                    let mut layout = lock(&layout);
                    // A reset swaps the layout under this lock; the old
                    // snapshot must not touch the new layout's state.
                    if current.load(Ordering::SeqCst) != generation {
                        PassMessage::Superseded { generation }
                    } else {
                        match layout.execute_layout(&snapshot) {
                            Ok(positions) => PassMessage::Completed {
                                generation,
                                positions,
                                forced_update: layout.requires_forced_update(),
                            },
                            Err(err) => PassMessage::Failed {
                                generation,
                                error: err.to_string(),
                            },
                        }
                    }
                };
                abort.armed = false;
                // The driver may be gone; the result is then simply lost.
                let _ = tx.send(message);
            });

        match spawned {
            Ok(_) => {
                debug!(driver = %self.name, generation, "layout_pass_started");
                Ok(RequestOutcome::Started)
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                Err(RuntimeError::Spawn(err))
            }
        }
    }

    /// Apply every finished pass without blocking.
    pub fn drain<T: LayoutTarget + ?Sized>(&self, target: &mut T) -> DrainReport {
        let mut report = DrainReport::default();
        while let Ok(message) = self.rx.try_recv() {
            report.merge(self.apply(message, target));
        }
        report
    }

    /// Wait up to `timeout` for a pass to finish, then apply everything
    /// pending.
    pub fn drain_timeout<T: LayoutTarget + ?Sized>(
        &self,
        target: &mut T,
        timeout: Duration,
    ) -> DrainReport {
        let mut report = DrainReport::default();
        match self.rx.recv_timeout(timeout) {
            Ok(message) => report.merge(self.apply(message, target)),
            Err(RecvTimeoutError::Timeout) => {
                debug!(driver = %self.name, timeout_ms = timeout.as_millis() as u64, "layout_drain_timeout");
            }
            // The driver holds a sender, so the channel never disconnects.
            Err(RecvTimeoutError::Disconnected) => {}
        }
        report.merge(self.drain(target));
        report
    }

    /// Replace the layout. Results of passes started before the reset are
    /// discarded when drained.
    ///
    /// Blocks while a worker is inside its pass.
    pub fn reset(&self, layout: L) {
        let mut current = lock(&self.layout);
        *current = layout;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(driver = %self.name, generation, layout = current.name(), "layout_reset");
    }

    /// Run `f` against the current layout, e.g. to read statistics.
    ///
    /// Blocks while a worker is inside its pass.
    pub fn with_layout<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        f(&mut lock(&self.layout))
    }

    fn apply<T: LayoutTarget + ?Sized>(&self, message: PassMessage, target: &mut T) -> DrainReport {
        let _release = ReleaseOnDrop(&self.running);
        let mut report = DrainReport {
            passes: 1,
            ..Default::default()
        };

        if message.generation() != self.generation() {
            debug!(driver = %self.name, generation = message.generation(), "layout_pass_stale");
            report.stale = 1;
            return report;
        }

        match message {
            PassMessage::Completed {
                positions,
                forced_update,
                ..
            } => {
                for (id, position) in positions {
                    if target.accepts(id) {
                        target.set_position(id, Vector2::new(position.x.floor(), position.y.floor()));
                        report.applied += 1;
                    } else {
                        report.skipped += 1;
                    }
                }
                report.relayout_requested = forced_update;
                debug!(
                    driver = %self.name,
                    applied = report.applied,
                    skipped = report.skipped,
                    "layout_pass_applied"
                );
            }
            PassMessage::Failed { error, .. } => {
                warn!(driver = %self.name, %error, "layout_pass_failed");
                report.failed = 1;
            }
            PassMessage::Aborted { .. } => {
                warn!(driver = %self.name, "layout_pass_aborted");
                report.failed = 1;
            }
            PassMessage::Superseded { .. } => report.stale = 1,
        }
        report
    }
}

/// Posts [`PassMessage::Aborted`] if the worker unwinds while armed.
struct AbortNotice {
    tx: Sender<PassMessage>,
    generation: u64,
    armed: bool,
}

impl Drop for AbortNotice {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.tx.send(PassMessage::Aborted {
                generation: self.generation,
            });
        }
    }
}

/// Clears the running flag once a pass result has been handled, including
/// when applying it panics.
struct ReleaseOnDrop<'a>(&'a AtomicBool);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A worker that panicked mid-pass leaves the layout poisoned; its momentum
/// state is still usable, so keep going with it.
fn lock<L>(layout: &Mutex<L>) -> MutexGuard<'_, L> {
    layout
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
