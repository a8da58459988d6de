// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-thread pool of event loops.
//!
//! Each worker owns one [`EventLoop`] and drives it until shutdown;
//! processes are assigned round-robin and never migrate between loops. All
//! loops share the controller's monitor, so the registry stays
//! process-wide.

use crate::error::EngineError;
use crate::event_loop::EventLoop;
use crate::future::Future;
use crate::monitor::ProcessMonitor;
use crate::process::ProcessLogic;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wf_core::{Bundle, ProcessId, SystemClock};

type Job = Box<dyn FnOnce(&mut EventLoop) + Send>;

struct Worker {
    tx: Sender<Job>,
    handle: JoinHandle<()>,
}

/// Runs event loops on a pool of worker threads.
pub struct ProcessController {
    workers: Vec<Worker>,
    next: usize,
    monitor: Arc<ProcessMonitor>,
}

impl ProcessController {
    /// Spawn `workers` threads, each with its own loop sharing one monitor.
    pub fn new(workers: usize) -> Self {
        let monitor = Arc::new(ProcessMonitor::new());
        Self::with_monitor(workers, monitor)
    }

    pub fn with_monitor(workers: usize, monitor: Arc<ProcessMonitor>) -> Self {
        let workers = (0..workers.max(1))
            .map(|_| {
                let (tx, rx) = mpsc::channel::<Job>();
                let monitor = Arc::clone(&monitor);
                let handle = thread::spawn(move || worker_main(rx, monitor));
                Worker { tx, handle }
            })
            .collect();
        Self {
            workers,
            next: 0,
            monitor,
        }
    }

    pub fn monitor(&self) -> &Arc<ProcessMonitor> {
        &self.monitor
    }

    /// Submit work to the next loop, round-robin.
    pub fn submit(
        &mut self,
        job: impl FnOnce(&mut EventLoop) + Send + 'static,
    ) -> Result<(), EngineError> {
        let worker = &self.workers[self.next % self.workers.len()];
        self.next = self.next.wrapping_add(1);
        worker
            .tx
            .send(Box::new(job))
            .map_err(|_| EngineError::WorkerGone)
    }

    /// Create a process on the next loop and return its pid and result
    /// future. Blocks until the worker has constructed it, so input
    /// validation failures are reported synchronously.
    pub fn launch<L>(
        &mut self,
        logic: L,
        inputs: Option<Bundle>,
        pid: Option<ProcessId>,
    ) -> Result<(ProcessId, Future), EngineError>
    where
        L: ProcessLogic + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.submit(move |event_loop| {
            let result = event_loop
                .create_process(logic, inputs, pid)
                .map(|handle| (handle.pid().clone(), handle.future().clone()));
            let _ = tx.send(result);
        })?;
        rx.recv_timeout(Duration::from_secs(10))
            .map_err(|_| EngineError::WorkerGone)?
    }

    /// Abort every live process. Returns how many accepted the abort.
    pub fn abort_all(&self, msg: Option<&str>) -> usize {
        let mut aborted = 0;
        for cell in self.monitor.processes() {
            if cell.lock().abort(msg).is_ok() {
                aborted += 1;
            }
        }
        aborted
    }

    /// Stop accepting work, drain the loops, and join the workers.
    pub fn shutdown(self) {
        for worker in self.workers {
            drop(worker.tx);
            if let Err(e) = worker.handle.join() {
                tracing::error!(?e, "worker thread panicked");
            }
        }
    }
}

fn worker_main(rx: Receiver<Job>, monitor: Arc<ProcessMonitor>) {
    let mut event_loop = EventLoop::with(monitor, Arc::new(SystemClock));
    loop {
        let mut disconnected = false;
        loop {
            match rx.try_recv() {
                Ok(job) => job(&mut event_loop),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }
        if disconnected && event_loop.is_idle() {
            break;
        }
        event_loop.tick();
        if event_loop.is_idle() {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
