//! The feeder thread.
//!
//! One long-lived thread owns the ring-buffer producer and the session
//! currently playing. It pulls stereo blocks from the session,
//! interleaves them for the device channel layout, and pushes them into
//! the ring the stream callback drains. Commands arrive over a bounded
//! channel; the callback signals a condvar after draining so the feeder
//! refills promptly.
//!
//! Only this thread ever touches a live session, so replacing a piece
//! can never leave two sets of voices sounding at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ringbuf::traits::{Observer, Producer};
use ringbuf::HeapProd;
use tracing::{debug, trace, warn};

use gapsong_engine::{Session, BLOCK_FRAMES};

use crate::error::{PlaybackError, PlaybackResult};

/// Completion callback, run on the feeder thread.
pub(crate) type OnEnded = Box<dyn FnOnce() + Send>;

/// Commands are rare (one per user action); a small bound just guards
/// against queueing behind a wedged thread.
const COMMAND_QUEUE_DEPTH: usize = 4;

/// Commands accepted by the feeder thread.
pub(crate) enum FeederCommand {
    /// Replace whatever is playing with a new piece.
    Play {
        session: Box<Session>,
        on_ended: Option<OnEnded>,
    },
    /// Cut the current piece short with its closing fade. The piece's
    /// completion callback will not run.
    Stop,
}

/// The piece currently owned by the feeder.
struct ActivePiece {
    session: Box<Session>,
    on_ended: Option<OnEnded>,
}

/// State owned by the feeder thread itself.
pub(crate) struct FeederThread {
    rx: Receiver<FeederCommand>,
    producer: HeapProd<f32>,
    /// Signaled by the stream callback after it drains the ring.
    condvar: Arc<(Mutex<bool>, Condvar)>,
    /// Set when a piece is installed, cleared when it finishes
    /// draining.
    busy: Arc<AtomicBool>,
    channels: usize,
    left: Vec<f64>,
    right: Vec<f64>,
    interleaved: Vec<f32>,
    current: Option<ActivePiece>,
}

impl FeederThread {
    /// Spawns the feeder for a device with the given channel count and
    /// returns the handle used to command it.
    pub(crate) fn spawn(producer: HeapProd<f32>, channels: usize) -> FeederHandle {
        let (tx, rx) = mpsc::sync_channel::<FeederCommand>(COMMAND_QUEUE_DEPTH);
        let condvar = Arc::new((Mutex::new(false), Condvar::new()));
        let condvar_clone = condvar.clone();
        let busy = Arc::new(AtomicBool::new(false));
        let busy_clone = busy.clone();

        let handle = thread::Builder::new()
            .name("gapsong-feeder".into())
            .spawn(move || {
                let mut feeder = FeederThread {
                    rx,
                    producer,
                    condvar: condvar_clone,
                    busy: busy_clone,
                    channels,
                    left: vec![0.0; BLOCK_FRAMES],
                    right: vec![0.0; BLOCK_FRAMES],
                    interleaved: vec![0.0; BLOCK_FRAMES * channels],
                    current: None,
                };
                feeder.run();
            })
            .expect("failed to spawn feeder thread");

        FeederHandle {
            tx: Some(tx),
            handle: Some(handle),
            condvar,
            busy,
        }
    }

    fn run(&mut self) {
        debug!("feeder thread started ({} output channels)", self.channels);

        loop {
            match self.rx.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    debug!("feeder thread exiting (command channel closed)");
                    break;
                }
            }

            if self.producer.vacant_len() >= self.interleaved.len() {
                self.feed_block();
            }

            // The callback signals after draining; the timeout keeps the
            // loop alive if the stream stalls
            let (lock, cvar) = &*self.condvar;
            let guard = lock.lock().unwrap_or_else(|e| {
                warn!("feeder condvar mutex poisoned; continuing");
                e.into_inner()
            });
            let _ = cvar
                .wait_timeout(guard, Duration::from_millis(1))
                .unwrap_or_else(|e| {
                    warn!("feeder condvar wait poisoned; continuing");
                    e.into_inner()
                });
        }
    }

    fn handle_command(&mut self, command: FeederCommand) {
        match command {
            FeederCommand::Play { session, on_ended } => {
                if self.current.is_some() {
                    // The predecessor is dropped outright, callback and
                    // all; only one piece's voices may ever be live
                    debug!("replacing the active piece");
                }
                self.current = Some(ActivePiece { session, on_ended });
                // The handle sets the flag at send time, but the
                // previous piece can drain and clear it before this
                // command is polled
                self.busy.store(true, Ordering::Release);
            }
            FeederCommand::Stop => {
                if let Some(piece) = self.current.as_mut() {
                    debug!("stop requested, fading out");
                    // An explicit stop never reports completion
                    piece.on_ended = None;
                    piece.session.stop();
                }
            }
        }
    }

    /// Produces one block: session audio while a piece is active,
    /// silence otherwise, always pushing a full block so the device
    /// never starves.
    fn feed_block(&mut self) {
        match self.current.as_mut() {
            Some(piece) => {
                piece.session.process_block(&mut self.left, &mut self.right);

                if piece.session.ended_naturally() {
                    if let Some(on_ended) = piece.on_ended.take() {
                        debug!("piece ended naturally, invoking completion callback");
                        on_ended();
                    }
                }

                interleave(&self.left, &self.right, &mut self.interleaved, self.channels);

                if piece.session.finished() {
                    debug!("piece drained, feeder idle");
                    self.current = None;
                    self.busy.store(false, Ordering::Release);
                }
            }
            None => self.interleaved.fill(0.0),
        }

        let pushed = self.producer.push_slice(&self.interleaved);
        if pushed < self.interleaved.len() {
            trace!(
                "ring full, dropped {} samples",
                self.interleaved.len() - pushed
            );
        }
    }
}

/// Spreads a stereo block across the device channel layout: channel 0
/// gets left, channel 1 right, extra channels silence. A mono device
/// gets the average of both.
fn interleave(left: &[f64], right: &[f64], out: &mut [f32], channels: usize) {
    for (frame, chunk) in out.chunks_exact_mut(channels).enumerate() {
        match channels {
            1 => chunk[0] = ((left[frame] + right[frame]) * 0.5) as f32,
            _ => {
                chunk[0] = left[frame] as f32;
                chunk[1] = right[frame] as f32;
                for extra in chunk.iter_mut().skip(2) {
                    *extra = 0.0;
                }
            }
        }
    }
}

/// Handle to the feeder thread.
///
/// Dropping it closes the command channel and joins the thread.
pub(crate) struct FeederHandle {
    tx: Option<SyncSender<FeederCommand>>,
    handle: Option<JoinHandle<()>>,
    /// Shared with the stream callbacks, which notify it after draining.
    pub(crate) condvar: Arc<(Mutex<bool>, Condvar)>,
    /// Set when a play command is queued and again when the thread
    /// installs the piece; cleared when the piece drains.
    busy: Arc<AtomicBool>,
}

impl FeederHandle {
    /// Queues a command for the feeder thread.
    pub(crate) fn send(&self, command: FeederCommand) -> PlaybackResult<()> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(PlaybackError::FeederDisconnected);
        };
        if matches!(command, FeederCommand::Play { .. }) {
            self.busy.store(true, Ordering::Release);
        }
        tx.send(command)
            .map_err(|_| PlaybackError::FeederDisconnected)
    }

    /// True while a piece is playing or draining.
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// True while the feeder thread is running.
    pub(crate) fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for FeederHandle {
    fn drop(&mut self) {
        // Close the channel first so the thread sees Disconnected and
        // exits; joining before that would deadlock
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
