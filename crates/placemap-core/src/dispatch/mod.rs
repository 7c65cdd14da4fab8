//! Filter and search dispatch with stale-response discard.
//!
//! Every submitted request gets a token from a single increasing counter.
//! For each request kind only the latest issued token is still wanted, so a
//! response that arrives after a newer request of the same kind was issued
//! is dropped without being delivered.
//!
//! Requests run on a dedicated worker thread when one can be spawned and
//! inline otherwise. Both paths feed the same response channel, so callers
//! observe identical results.

pub mod protocol;
pub mod worker;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

use crate::filter::FilterSelection;
use crate::models::Place;
use crate::search::SearchOptions;

pub use protocol::{RequestBody, RequestKind, ResponseBody, WorkerRequest, WorkerResponse};
pub use worker::WorkerHandle;

/// A response that is still current for its request kind.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Filtered { token: u64, places: Vec<Place> },
    Searched { token: u64, places: Vec<Place> },
    Failed { token: u64, kind: RequestKind, message: String },
}

impl DispatchEvent {
    pub fn token(&self) -> u64 {
        match self {
            DispatchEvent::Filtered { token, .. }
            | DispatchEvent::Searched { token, .. }
            | DispatchEvent::Failed { token, .. } => *token,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            DispatchEvent::Filtered { .. } => RequestKind::Filter,
            DispatchEvent::Searched { .. } => RequestKind::Search,
            DispatchEvent::Failed { kind, .. } => *kind,
        }
    }
}

impl From<WorkerResponse> for DispatchEvent {
    fn from(response: WorkerResponse) -> Self {
        let token = response.token;
        match response.body {
            ResponseBody::FilterComplete { data } => DispatchEvent::Filtered { token, places: data },
            ResponseBody::SearchComplete { data } => DispatchEvent::Searched { token, places: data },
            ResponseBody::Error { request, error } => DispatchEvent::Failed {
                token,
                kind: request,
                message: error,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Worker,
    Inline,
}

pub struct Dispatcher {
    next_token: u64,
    latest: HashMap<RequestKind, u64>,
    /// Submitted requests whose responses have not been received yet
    pending: usize,
    worker: Option<WorkerHandle>,
    responses_tx: UnboundedSender<WorkerResponse>,
    responses_rx: UnboundedReceiver<WorkerResponse>,
}

impl Dispatcher {
    /// Create a dispatcher, spawning a worker thread if `use_worker` is set.
    /// Spawn failure is logged and the dispatcher runs inline.
    pub fn new(use_worker: bool) -> Self {
        let (responses_tx, responses_rx) = mpsc::unbounded_channel();
        let worker = if use_worker {
            match WorkerHandle::spawn(responses_tx.clone()) {
                Ok(worker) => Some(worker),
                Err(e) => {
                    warn!(error = %e, "Failed to spawn worker thread, running inline");
                    None
                }
            }
        } else {
            None
        };

        Self {
            next_token: 0,
            latest: HashMap::new(),
            pending: 0,
            worker,
            responses_tx,
            responses_rx,
        }
    }

    pub fn inline() -> Self {
        Self::new(false)
    }

    #[cfg(test)]
    fn with_worker(worker: WorkerHandle) -> Self {
        let mut dispatcher = Self::inline();
        dispatcher.worker = Some(worker);
        dispatcher
    }

    pub fn mode(&self) -> DispatchMode {
        if self.worker.is_some() {
            DispatchMode::Worker
        } else {
            DispatchMode::Inline
        }
    }

    pub fn submit_filter(&mut self, places: Arc<[Place]>, selection: FilterSelection) -> u64 {
        self.submit(RequestBody::Filter { places, selection })
    }

    pub fn submit_search(
        &mut self,
        places: Arc<[Place]>,
        query: impl Into<String>,
        options: SearchOptions,
    ) -> u64 {
        self.submit(RequestBody::Search {
            places,
            query: query.into(),
            options,
        })
    }

    fn submit(&mut self, body: RequestBody) -> u64 {
        self.next_token += 1;
        let token = self.next_token;
        let kind = body.kind();
        self.latest.insert(kind, token);
        self.pending += 1;
        debug!(token, %kind, "Dispatching request");

        let mut request = WorkerRequest { token, body };
        if let Some(worker) = &self.worker {
            match worker.send(request) {
                Ok(()) => return token,
                Err(returned) => request = returned,
            }
        }
        if self.worker.take().is_some() {
            error!("Worker channel closed, falling back to inline execution");
        }

        let response = worker::handle(request);
        if let Err(e) = self.responses_tx.send(response) {
            error!(error = %e, "Failed to queue inline response");
        }
        token
    }

    /// Latest token issued for a request kind
    pub fn latest_token(&self, kind: RequestKind) -> Option<u64> {
        self.latest.get(&kind).copied()
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Deliver a response unless a newer request of its kind was issued.
    fn accept(&mut self, response: WorkerResponse) -> Option<DispatchEvent> {
        let kind = response.kind();
        let latest = self.latest.get(&kind).copied().unwrap_or(0);
        if response.token < latest {
            debug!(token = response.token, latest, %kind, "Discarding stale response");
            return None;
        }
        Some(DispatchEvent::from(response))
    }

    fn received(&mut self, response: WorkerResponse) -> Option<DispatchEvent> {
        self.pending = self.pending.saturating_sub(1);
        self.accept(response)
    }

    /// Drain every response that is already available, without blocking.
    pub fn try_recv(&mut self) -> Vec<DispatchEvent> {
        let mut responses = Vec::new();
        while let Ok(response) = self.responses_rx.try_recv() {
            responses.push(response);
        }
        responses
            .into_iter()
            .filter_map(|response| self.received(response))
            .collect()
    }

    /// Wait for the next current event. Returns `None` once nothing is
    /// outstanding.
    pub async fn recv(&mut self) -> Option<DispatchEvent> {
        while self.pending > 0 {
            let response = self.responses_rx.recv().await?;
            if let Some(event) = self.received(response) {
                return Some(event);
            }
        }
        None
    }
}
