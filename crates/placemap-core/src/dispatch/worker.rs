use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use super::protocol::{RequestBody, ResponseBody, WorkerRequest, WorkerResponse};
use crate::{filter, search};

const WORKER_THREAD_NAME: &str = "placemap-worker";

/// Run the filter or search engine for one request body.
pub(crate) fn execute(body: RequestBody) -> ResponseBody {
    match body {
        RequestBody::Filter { places, selection } => ResponseBody::FilterComplete {
            data: filter::apply(&places, &selection),
        },
        RequestBody::Search {
            places,
            query,
            options,
        } => ResponseBody::SearchComplete {
            data: search::search(&places, &query, &options),
        },
    }
}

/// Answer a request with exactly one response carrying its token.
pub(crate) fn handle(request: WorkerRequest) -> WorkerResponse {
    handle_with(request, execute)
}

pub(crate) fn handle_with<F>(request: WorkerRequest, engine: F) -> WorkerResponse
where
    F: FnOnce(RequestBody) -> ResponseBody,
{
    let token = request.token;
    let kind = request.body.kind();
    let body = match panic::catch_unwind(AssertUnwindSafe(|| engine(request.body))) {
        Ok(body) => body,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(token, %kind, error = %message, "Engine panicked while handling request");
            ResponseBody::Error {
                request: kind,
                error: message,
            }
        }
    };
    WorkerResponse { token, body }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}

/// Dedicated OS thread running filter and search requests.
pub struct WorkerHandle {
    requests: Option<mpsc::Sender<WorkerRequest>>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn(responses: UnboundedSender<WorkerResponse>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<WorkerRequest>();
        let thread = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("Worker thread started");
                while let Ok(request) = rx.recv() {
                    if responses.send(handle(request)).is_err() {
                        debug!("Response channel closed");
                        break;
                    }
                }
                debug!("Worker thread stopped");
            })?;

        Ok(Self {
            requests: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue a request. Hands the request back if the worker is gone.
    pub fn send(&self, request: WorkerRequest) -> Result<(), WorkerRequest> {
        match &self.requests {
            Some(tx) => tx.send(request).map_err(|e| e.0),
            None => Err(request),
        }
    }

    /// A handle whose thread has already exited
    #[cfg(test)]
    pub(crate) fn disconnected() -> Self {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        Self {
            requests: Some(tx),
            thread: None,
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Worker thread panicked");
            }
        }
    }
}
