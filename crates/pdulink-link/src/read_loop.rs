//! The blocking loop that drives a [`Controller`] from the read half.
//!
//! ```text
//! WaitingFrame -> Decoding -> Dispatching -> WaitingFrame
//!                    |
//!                    +-> WaitingFrame   (frame dropped)
//! any state -> Terminated               (stop signal or channel lost)
//! ```
//!
//! Read timeouts are idle ticks: the stop signal is checked and the loop
//! goes back to waiting with any partial frame still buffered.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use pdulink_frame::FrameReader;
use tracing::{info, trace, warn};

use crate::controller::{Controller, FrameOutcome};
use crate::error::{LinkError, Result};
use crate::sink::TelemetrySink;

const THREAD_NAME: &str = "pdulink-read";

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    WaitingFrame,
    Decoding,
    Dispatching,
    Terminated,
}

/// Why the loop ended.
#[derive(Debug)]
pub enum LoopExit {
    /// The stop signal was raised.
    Cancelled,
    /// EOF or a hard I/O error; the device is gone.
    ChannelLost(LinkError),
}

impl LoopExit {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoopExit::Cancelled)
    }
}

/// Result of one turn of the loop.
#[derive(Debug)]
pub enum Step {
    /// The read timed out with no complete frame.
    Idle,
    /// A frame was decoded and handed to the sink.
    Dispatched(FrameOutcome),
    /// A frame was dropped; the loop carries on.
    Dropped(LinkError),
    /// The loop is finished.
    Exit(LoopExit),
}

/// Cooperative cancellation flag shared between the loop and its owner.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop. Takes effect within one read timeout.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reads frames and feeds them to a [`Controller`] until stopped or the
/// channel is lost.
pub struct ReadLoop<R, S, W> {
    reader: FrameReader<R>,
    controller: Controller<S, W>,
    stop: StopSignal,
    state: LoopState,
}

impl<R: Read, S: TelemetrySink, W: Write> ReadLoop<R, S, W> {
    pub fn new(reader: FrameReader<R>, controller: Controller<S, W>) -> Self {
        Self::with_stop_signal(reader, controller, StopSignal::new())
    }

    /// Build a loop that observes an existing stop signal.
    pub fn with_stop_signal(
        reader: FrameReader<R>,
        controller: Controller<S, W>,
        stop: StopSignal,
    ) -> Self {
        Self {
            reader,
            controller,
            stop,
            state: LoopState::WaitingFrame,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn controller(&self) -> &Controller<S, W> {
        &self.controller
    }

    /// Run one turn: wait for a frame (up to the read timeout), decode it
    /// and dispatch it.
    ///
    /// Once the loop has terminated every further call returns
    /// `Step::Exit(LoopExit::Cancelled)`.
    pub fn step(&mut self) -> Step {
        if self.state == LoopState::Terminated || self.stop.is_stopped() {
            self.state = LoopState::Terminated;
            return Step::Exit(LoopExit::Cancelled);
        }

        self.state = LoopState::WaitingFrame;
        let raw = match self.reader.read_frame() {
            Ok(raw) => raw,
            Err(err) if err.is_timeout() => return Step::Idle,
            Err(err) if err.is_per_frame() => {
                self.controller.record_dropped_frame(&err);
                warn!(error = %err, "dropping frame");
                return Step::Dropped(err.into());
            }
            Err(err) => {
                self.state = LoopState::Terminated;
                return Step::Exit(LoopExit::ChannelLost(err.into()));
            }
        };

        self.state = LoopState::Decoding;
        let report = match self.controller.decode(&raw) {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, len = raw.len(), "dropping frame");
                self.state = LoopState::WaitingFrame;
                return Step::Dropped(err);
            }
        };

        self.state = LoopState::Dispatching;
        let outcome = self.controller.dispatch(report);
        self.state = LoopState::WaitingFrame;
        Step::Dispatched(outcome)
    }

    /// Step until the loop exits.
    pub fn run(mut self) -> LoopExit {
        info!("read loop started");
        loop {
            match self.step() {
                Step::Exit(exit) => {
                    let stats = self.controller.stats();
                    match &exit {
                        LoopExit::Cancelled => info!(
                            frames = stats.frames,
                            dropped = stats.dropped(),
                            "read loop stopped"
                        ),
                        LoopExit::ChannelLost(err) => warn!(
                            error = %err,
                            frames = stats.frames,
                            dropped = stats.dropped(),
                            "read loop lost the channel"
                        ),
                    }
                    return exit;
                }
                Step::Idle => trace!("read timeout"),
                Step::Dispatched(_) | Step::Dropped(_) => {}
            }
        }
    }
}

/// A read loop running on its own thread.
///
/// Dropping the handle stops the loop and joins the thread, which also
/// drops the read half of the port.
pub struct ReadLoopHandle {
    stop: StopSignal,
    thread: Option<JoinHandle<LoopExit>>,
}

impl ReadLoopHandle {
    /// Start `read_loop` on a thread named `pdulink-read`.
    pub fn spawn<R, S, W>(read_loop: ReadLoop<R, S, W>) -> Result<Self>
    where
        R: Read + Send + 'static,
        S: TelemetrySink + Send + 'static,
        W: Write + Send + 'static,
    {
        let stop = read_loop.stop_signal();
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || read_loop.run())
            .map_err(LinkError::Spawn)?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Ask the loop to stop without waiting for it.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// True once the loop thread has returned.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the loop to exit on its own (channel lost) or after [`stop`].
    ///
    /// [`stop`]: ReadLoopHandle::stop
    pub fn join(mut self) -> Result<LoopExit> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| LinkError::ReadLoopPanicked),
            None => Ok(LoopExit::Cancelled),
        }
    }

    /// Stop the loop and wait for it.
    pub fn stop_and_join(self) -> Result<LoopExit> {
        self.stop();
        self.join()
    }
}

impl Drop for ReadLoopHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.stop.stop();
            let _ = thread.join();
        }
    }
}
