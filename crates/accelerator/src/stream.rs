// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution streams.
//!
//! A stream executes submitted work strictly in submission order. Errors are
//! sticky: once a piece of work fails, later work is skipped until the next
//! synchronization, which returns the first error and clears it. Callbacks
//! run in order with the stream and observe the status current at that point.

use crate::AccelError;
use parking_lot::Mutex;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

/// A unit of device work.
pub type StreamWork = Box<dyn FnOnce() -> Result<(), AccelError> + Send>;

/// Completion notification; receives the stream status.
pub type StreamCallback = Box<dyn FnOnce(Result<(), &AccelError>) + Send>;

/// An ordered device work queue.
pub trait Stream: Send + Sync {
    fn submit(&self, work: StreamWork) -> Result<(), AccelError>;

    /// Queues `callback` behind everything submitted so far.
    fn add_callback(&self, callback: StreamCallback) -> Result<(), AccelError>;

    /// Blocks until all submitted work has completed.
    fn synchronize(&self) -> Result<(), AccelError>;

    /// Like [`synchronize`](Self::synchronize), giving up after `timeout`.
    fn synchronize_timeout(&self, timeout: Duration) -> Result<(), AccelError>;
}

enum Command {
    Work(StreamWork),
    Callback(StreamCallback),
    Sync(mpsc::SyncSender<Result<(), AccelError>>),
}

/// A stream backed by a dedicated host worker thread.
pub struct HostStream {
    sender: Mutex<Option<mpsc::Sender<Command>>>,
    worker: Option<JoinHandle<()>>,
}

impl HostStream {
    pub fn new(label: &str) -> Result<Self, AccelError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let worker = std::thread::Builder::new()
            .name(format!("stream-{label}"))
            .spawn(move || run_worker(receiver))
            .map_err(|e| AccelError::Enqueue(format!("cannot spawn stream worker: {e}")))?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Some(worker),
        })
    }

    fn send(&self, cmd: Command) -> Result<(), AccelError> {
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(AccelError::StreamClosed)?;
        sender.send(cmd).map_err(|_| AccelError::StreamClosed)
    }

    fn sync_with(&self, timeout: Option<Duration>) -> Result<(), AccelError> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.send(Command::Sync(tx))?;
        match timeout {
            None => rx.recv().map_err(|_| AccelError::StreamClosed)?,
            Some(t) => match rx.recv_timeout(t) {
                Ok(status) => status,
                Err(mpsc::RecvTimeoutError::Timeout) => Err(AccelError::Timeout(t)),
                Err(mpsc::RecvTimeoutError::Disconnected) => Err(AccelError::StreamClosed),
            },
        }
    }
}

fn run_worker(receiver: mpsc::Receiver<Command>) {
    let mut sticky: Option<AccelError> = None;
    for cmd in receiver {
        match cmd {
            Command::Work(work) => {
                if sticky.is_some() {
                    continue;
                }
                if let Err(e) = work() {
                    tracing::debug!("stream work failed: {e}");
                    sticky = Some(e);
                }
            }
            Command::Callback(cb) => match &sticky {
                Some(e) => cb(Err(e)),
                None => cb(Ok(())),
            },
            Command::Sync(reply) => {
                let status = match sticky.take() {
                    Some(e) => Err(e),
                    None => Ok(()),
                };
                // The waiter may have timed out and gone away.
                let _ = reply.send(status);
            }
        }
    }
}

impl Stream for HostStream {
    fn submit(&self, work: StreamWork) -> Result<(), AccelError> {
        self.send(Command::Work(work))
    }

    fn add_callback(&self, callback: StreamCallback) -> Result<(), AccelError> {
        self.send(Command::Callback(callback))
    }

    fn synchronize(&self) -> Result<(), AccelError> {
        self.sync_with(None)
    }

    fn synchronize_timeout(&self, timeout: Duration) -> Result<(), AccelError> {
        self.sync_with(Some(timeout))
    }
}

impl Drop for HostStream {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.sender.lock().take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("stream worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for HostStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostStream")
            .field("open", &self.sender.lock().is_some())
            .finish()
    }
}
