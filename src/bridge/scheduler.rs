// Main-thread scheduler: connection tasks submit, the host drains one item per tick.
// No per-command timeout; a handler that never returns stalls every queued command.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::BridgeError;
use super::protocol::{Command, Response};

/// A queued command awaiting main-thread execution
pub struct PendingWork {
    command: Command,
    completion: oneshot::Sender<Response>,
    enqueued_at: Instant,
}

impl PendingWork {
    fn complete(self, response: Response) {
        if self.completion.send(response).is_err() {
            warn!(command = %self.command.name, "completion dropped, submitter went away");
        }
    }
}

struct QueueState {
    items: VecDeque<PendingWork>,
    closed: bool,
}

/// Thread-safe FIFO of pending work shared between connection tasks and the
/// host loop. Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct MainThreadScheduler {
    state: Arc<Mutex<QueueState>>,
}

impl Default for MainThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MainThreadScheduler {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            })),
        }
    }

    /// Queue a command and return the receiver its response will arrive on.
    /// After shutdown the command is rejected immediately.
    fn enqueue(&self, command: Command) -> Result<oneshot::Receiver<Response>, Response> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.state.lock();
        if state.closed {
            return Err(host_gone().into());
        }
        debug!(command = %command.name, depth = state.items.len() + 1, "queued");
        state.items.push_back(PendingWork {
            command,
            completion: tx,
            enqueued_at: Instant::now(),
        });
        Ok(rx)
    }

    /// Submit a command and wait for the main thread to run it.
    pub async fn submit(&self, command: Command) -> Response {
        match self.enqueue(command) {
            Ok(rx) => rx.await.unwrap_or_else(|_| host_gone().into()),
            Err(response) => response,
        }
    }

    /// Blocking variant of [`submit`](Self::submit) for plain threads.
    /// Must not be called from inside an async runtime.
    pub fn submit_blocking(&self, command: Command) -> Response {
        match self.enqueue(command) {
            Ok(rx) => rx.blocking_recv().unwrap_or_else(|_| host_gone().into()),
            Err(response) => response,
        }
    }

    /// Run at most one pending item on the calling thread.
    ///
    /// The executor's panics are contained and reported as an `Internal`
    /// error response. Returns true if an item was run.
    pub fn run_once<F>(&self, execute: F) -> bool
    where
        F: FnOnce(Command) -> Response,
    {
        // Lock is released before the command runs so submitters never wait on a handler
        let Some(work) = self.state.lock().items.pop_front() else {
            return false;
        };

        let name = work.command.name.clone();
        debug!(command = %name, waited_ms = work.enqueued_at.elapsed().as_millis() as u64, "running");

        let response = match catch_unwind(AssertUnwindSafe(|| execute(work.command.clone()))) {
            Ok(response) => response,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(command = %name, %message, "handler panicked");
                BridgeError::Internal(message).into()
            }
        };
        work.complete(response);
        true
    }

    /// Close the queue and fail every pending item.
    /// Returns how many items were force-completed.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<PendingWork> = {
            let mut state = self.state.lock();
            state.closed = true;
            state.items.drain(..).collect()
        };

        let count = drained.len();
        for work in drained {
            work.complete(host_gone().into());
        }
        if count > 0 {
            warn!(count, "force-completed pending commands on shutdown");
        }
        count
    }

    pub fn pending(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

fn host_gone() -> BridgeError {
    BridgeError::HostUnavailable("host is shutting down".to_string())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::ErrorKind;
    use serde_json::json;
    use std::thread;
    use std::time::Duration;

    fn echo(command: Command) -> Response {
        Response::ok(json!({"ran": command.name}))
    }

    /// Spin until `count` items are queued
    fn wait_for_pending(scheduler: &MainThreadScheduler, count: usize) {
        for _ in 0..500 {
            if scheduler.pending() >= count {
                return;
            }
            thread::sleep(Duration::from_millis(2));
        }
        panic!("expected {} pending items", count);
    }

    #[test]
    fn run_once_on_empty_queue_does_nothing() {
        let scheduler = MainThreadScheduler::new();
        assert!(!scheduler.run_once(echo));
    }

    #[test]
    fn submit_blocking_returns_response_from_main_thread() {
        let scheduler = MainThreadScheduler::new();
        let main_thread = thread::current().id();

        let submitter = {
            let scheduler = scheduler.clone();
            thread::spawn(move || scheduler.submit_blocking(Command::new("ping")))
        };

        wait_for_pending(&scheduler, 1);
        let ran_on = std::cell::Cell::new(None);
        assert!(scheduler.run_once(|cmd| {
            ran_on.set(Some(thread::current().id()));
            echo(cmd)
        }));

        let response = submitter.join().unwrap();
        assert_eq!(response.result, Some(json!({"ran": "ping"})));
        assert_eq!(ran_on.get(), Some(main_thread));
    }

    #[test]
    fn items_drain_in_fifo_order_one_per_tick() {
        let scheduler = MainThreadScheduler::new();
        let mut submitters = Vec::new();
        for i in 0..3 {
            let s = scheduler.clone();
            submitters.push(thread::spawn(move || {
                s.submit_blocking(Command::new(format!("cmd{}", i)))
            }));
            wait_for_pending(&scheduler, i + 1);
        }

        let mut order = Vec::new();
        while scheduler.run_once(|cmd| {
            order.push(cmd.name.clone());
            echo(cmd)
        }) {}

        assert_eq!(order, vec!["cmd0", "cmd1", "cmd2"]);
        for handle in submitters {
            assert!(handle.join().unwrap().is_success());
        }
    }

    #[test]
    fn panicking_handler_becomes_internal_error() {
        let scheduler = MainThreadScheduler::new();
        let submitter = {
            let s = scheduler.clone();
            thread::spawn(move || s.submit_blocking(Command::new("boom")))
        };
        wait_for_pending(&scheduler, 1);

        scheduler.run_once(|_| panic!("kaboom"));

        let response = submitter.join().unwrap();
        assert_eq!(response.kind, Some(ErrorKind::Internal));
        assert!(response.message.unwrap().contains("kaboom"));

        // The queue keeps working after a panic
        let next = {
            let s = scheduler.clone();
            thread::spawn(move || s.submit_blocking(Command::new("ping")))
        };
        wait_for_pending(&scheduler, 1);
        scheduler.run_once(echo);
        assert!(next.join().unwrap().is_success());
    }

    #[test]
    fn shutdown_force_fires_pending_work() {
        let scheduler = MainThreadScheduler::new();
        let submitters: Vec<_> = (0..2)
            .map(|_| {
                let s = scheduler.clone();
                thread::spawn(move || s.submit_blocking(Command::new("get_scene_info")))
            })
            .collect();
        wait_for_pending(&scheduler, 2);

        assert_eq!(scheduler.shutdown(), 2);
        for handle in submitters {
            let response = handle.join().unwrap();
            assert_eq!(response.kind, Some(ErrorKind::HostUnavailable));
        }
    }

    #[test]
    fn submit_after_shutdown_fails_immediately() {
        let scheduler = MainThreadScheduler::new();
        scheduler.shutdown();
        assert!(scheduler.is_closed());

        let response = scheduler.submit_blocking(Command::new("ping"));
        assert_eq!(response.kind, Some(ErrorKind::HostUnavailable));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn async_submit_waits_for_host_thread() {
        let scheduler = MainThreadScheduler::new();
        let host = {
            let s = scheduler.clone();
            thread::spawn(move || {
                while !s.run_once(echo) {
                    thread::sleep(Duration::from_millis(1));
                }
            })
        };

        let response = scheduler.submit(Command::new("get_scene_info")).await;
        host.join().unwrap();
        assert_eq!(response.result, Some(json!({"ran": "get_scene_info"})));
    }
}
