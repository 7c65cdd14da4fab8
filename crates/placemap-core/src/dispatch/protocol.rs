//! Messages exchanged with the dispatch worker.
//!
//! Requests and responses are plain serde values with an explicit token so
//! the same shapes can cross a thread, a process or a web worker boundary.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::filter::FilterSelection;
use crate::models::Place;
use crate::search::SearchOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Filter,
    Search,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Filter => write!(f, "filter"),
            RequestKind::Search => write!(f, "search"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub token: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RequestBody {
    Filter {
        places: Arc<[Place]>,
        selection: FilterSelection,
    },
    Search {
        places: Arc<[Place]>,
        query: String,
        #[serde(default)]
        options: SearchOptions,
    },
}

impl RequestBody {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestBody::Filter { .. } => RequestKind::Filter,
            RequestBody::Search { .. } => RequestKind::Search,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub token: u64,
    #[serde(flatten)]
    pub body: ResponseBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponseBody {
    FilterComplete { data: Vec<Place> },
    SearchComplete { data: Vec<Place> },
    Error { request: RequestKind, error: String },
}

impl WorkerResponse {
    /// Kind of the request this response answers
    pub fn kind(&self) -> RequestKind {
        match &self.body {
            ResponseBody::FilterComplete { .. } => RequestKind::Filter,
            ResponseBody::SearchComplete { .. } => RequestKind::Search,
            ResponseBody::Error { request, .. } => *request,
        }
    }
}
