//! Session client request queue
//!
//! Requests are handed to a small pool of worker threads which run the
//! transport and push the result onto a completion queue. Workers never see
//! anything but the request and an opaque tag; the owner thread applies
//! results when it calls [`SessionClient::poll`].

use crate::session::Session;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A finished request, returned to the owner thread by `poll`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<T> {
    pub tag: T,
    pub request: HttpRequest,
    pub response: HttpResponse,
}

struct Job<T> {
    request: HttpRequest,
    tag: T,
}

struct QueueState<T> {
    pending: VecDeque<Job<T>>,
    completed: VecDeque<Completion<T>>,
    in_flight: usize,
    shutdown: bool,
}

impl<T> QueueState<T> {
    fn outstanding(&self) -> usize {
        self.pending.len() + self.in_flight
    }
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    /// Signalled when a job is queued or on shutdown
    work_ready: Condvar,
    /// Signalled when a job completes
    completed_ready: Condvar,
}

/// Owns login state and the outbound request queue
pub struct SessionClient<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    workers: Vec<JoinHandle<()>>,
    session: Session,
}

impl<T: Send + 'static> SessionClient<T> {
    /// Create a client with `worker_threads` workers (at least one)
    pub fn new(transport: Arc<dyn Transport>, worker_threads: u32) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                completed: VecDeque::new(),
                in_flight: 0,
                shutdown: false,
            }),
            work_ready: Condvar::new(),
            completed_ready: Condvar::new(),
        });

        let count = worker_threads.max(1);
        let mut workers = Vec::with_capacity(count as usize);
        for index in 0..count {
            let shared = Arc::clone(&shared);
            let transport = Arc::clone(&transport);
            let handle = std::thread::Builder::new()
                .name(format!("cheevos-http-{}", index))
                .spawn(move || worker_loop(shared, transport))?;
            workers.push(handle);
        }

        tracing::debug!("Session client started with {} worker(s)", count);

        Ok(Self {
            shared,
            workers,
            session: Session::default(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Queue a request. Never blocks and never runs any completion handling.
    pub fn enqueue(&self, request: HttpRequest, tag: T) {
        tracing::trace!("Queueing request {}", request.url);
        let mut state = self.shared.state.lock();
        state.pending.push_back(Job { request, tag });
        self.shared.work_ready.notify_one();
    }

    /// Take every request that finished since the last call, in completion order.
    ///
    /// Returns immediately; an empty vector means nothing has completed.
    pub fn poll(&self) -> Vec<Completion<T>> {
        let mut state = self.shared.state.lock();
        state.completed.drain(..).collect()
    }

    /// Block until a completion is available or nothing is outstanding.
    ///
    /// Returns `true` if completions are ready to be polled. Must not be
    /// called while handling a completion.
    pub fn wait_for_activity(&self) -> bool {
        let mut state = self.shared.state.lock();
        loop {
            if !state.completed.is_empty() {
                return true;
            }
            if state.outstanding() == 0 {
                return false;
            }
            self.shared.completed_ready.wait(&mut state);
        }
    }

    /// Requests queued or running on a worker
    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding()
    }

    /// Whether any request is queued, running, or waiting to be polled
    pub fn is_busy(&self) -> bool {
        let state = self.shared.state.lock();
        state.outstanding() > 0 || !state.completed.is_empty()
    }
}

impl<T: Send + 'static> Drop for SessionClient<T> {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.work_ready.notify_all();
        }

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("HTTP worker panicked");
            }
        }
    }
}

fn worker_loop<T: Send>(shared: Arc<Shared<T>>, transport: Arc<dyn Transport>) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if let Some(job) = state.pending.pop_front() {
                    state.in_flight += 1;
                    break job;
                }
                if state.shutdown {
                    return;
                }
                shared.work_ready.wait(&mut state);
            }
        };

        // A panicking transport must not take the worker or the in-flight count with it
        let response = match catch_unwind(AssertUnwindSafe(|| transport.execute(&job.request))) {
            Ok(response) => response,
            Err(_) => {
                tracing::error!("Transport panicked while requesting {}", job.request.url);
                HttpResponse::transport_error()
            }
        };
        tracing::trace!("Request {} finished with status {}", job.request.url, response.status);

        let mut state = shared.state.lock();
        state.in_flight -= 1;
        state.completed.push_back(Completion {
            tag: job.tag,
            request: job.request,
            response,
        });
        shared.completed_ready.notify_all();
    }
}
