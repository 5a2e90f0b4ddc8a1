#![forbid(unsafe_code)]

//! Command queue and tick scheduling around a [`MotionController`].
//!
//! Pointer commands can originate on any thread (input hooks, IPC bridges).
//! They are posted through a [`CommandSender`] into a FIFO channel shared with
//! the background [`Ticker`]; the thread owning the runtime drains the channel
//! and applies each command in arrival order. The controller itself is never
//! touched from more than one thread.

use std::ops::ControlFlow;
use std::sync::mpsc;
use std::time::Duration;

use perch_core::MotionClock;

use crate::command::MotionCommand;
use crate::controller::MotionController;
use crate::surface::{DisplayTopology, WindowSurface};
use crate::ticker::Ticker;

/// Cloneable handle for posting commands from other threads.
#[derive(Debug, Clone)]
pub struct CommandSender {
    inner: mpsc::Sender<MotionCommand>,
}

impl CommandSender {
    /// Queue a command. Returns `false` if the runtime is gone.
    pub fn send(&self, command: MotionCommand) -> bool {
        self.inner.send(command).is_ok()
    }
}

/// Owns a controller, its command queue, and the optional ticker.
pub struct MotionRuntime<W, D, C> {
    controller: MotionController<W, D, C>,
    sender: mpsc::Sender<MotionCommand>,
    receiver: mpsc::Receiver<MotionCommand>,
    ticker: Option<Ticker>,
    applied: u64,
}

impl<W, D, C> std::fmt::Debug for MotionRuntime<W, D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotionRuntime")
            .field("controller", &self.controller)
            .field("ticker", &self.ticker)
            .field("applied", &self.applied)
            .finish()
    }
}

impl<W: WindowSurface, D: DisplayTopology, C: MotionClock> MotionRuntime<W, D, C> {
    #[must_use]
    pub fn new(controller: MotionController<W, D, C>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            controller,
            sender,
            receiver,
            ticker: None,
            applied: 0,
        }
    }

    #[must_use]
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            inner: self.sender.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn controller(&self) -> &MotionController<W, D, C> {
        &self.controller
    }

    #[inline]
    pub fn controller_mut(&mut self) -> &mut MotionController<W, D, C> {
        &mut self.controller
    }

    /// Commands applied so far.
    #[inline]
    #[must_use]
    pub fn applied(&self) -> u64 {
        self.applied
    }

    #[inline]
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    /// Start posting [`MotionCommand::Tick`] at the preset's step cadence.
    ///
    /// Does nothing if a ticker is already running or the controller has
    /// shut down.
    pub fn start_ticker(&mut self) {
        if self.ticker.is_some() || self.controller.is_shut_down() {
            return;
        }
        let interval = Duration::from_millis(self.controller.config().tick_interval_ms());
        self.ticker = Some(Ticker::spawn(interval, self.sender.clone(), || {
            MotionCommand::Tick
        }));
    }

    /// Stop the ticker thread, if any.
    pub fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    /// Apply a command immediately, bypassing the queue.
    pub fn apply(&mut self, command: MotionCommand) -> ControlFlow<()> {
        self.applied += 1;
        let flow = self.controller.handle(command);
        if flow.is_break() {
            self.stop_ticker();
        }
        flow
    }

    /// Apply every queued command without blocking.
    pub fn pump(&mut self) -> ControlFlow<()> {
        while let Ok(command) = self.receiver.try_recv() {
            self.apply(command)?;
        }
        ControlFlow::Continue(())
    }

    /// Block applying commands until a [`MotionCommand::Shutdown`] arrives.
    pub fn run_until_shutdown(&mut self) {
        tracing::debug!("motion runtime started");
        // The runtime holds a sender, so `recv` only fails if that invariant
        // is broken; treat it as shutdown.
        while let Ok(command) = self.receiver.recv() {
            if self.apply(command).is_break() {
                break;
            }
        }
        self.shutdown();
    }

    /// Like [`run_until_shutdown`](Self::run_until_shutdown) but returns after
    /// `timeout` without a command. Returns `Break` once shut down.
    pub fn run_for(&mut self, timeout: Duration) -> ControlFlow<()> {
        while let Ok(command) = self.receiver.recv_timeout(timeout) {
            self.apply(command)?;
        }
        ControlFlow::Continue(())
    }

    /// Stop ticking and cancel any fling.
    pub fn shutdown(&mut self) {
        self.stop_ticker();
        self.controller.shutdown();
    }
}

impl<W, D, C> Drop for MotionRuntime<W, D, C> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}
