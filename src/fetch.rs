//! Transport contract between the loader and whatever fetches resources.
//!
//! The session sends one [`FetchRequest`] per declared resource URI and
//! consumes [`FetchResponse`]s one at a time. Any transport works as long as
//! it answers every request exactly once — with a payload or with `Failed`.
//! [`FileFetcher`] is the bundled filesystem transport.

use std::fmt;
use std::path::PathBuf;

use crossbeam::channel::{Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buffer,
    Image,
    Shader,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Buffer => write!(f, "buffer"),
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::Shader => write!(f, "shader"),
        }
    }
}

pub enum FetchRequest {
    Buffer { id: String, uri: String },
    Image { id: String, uri: String },
    ShaderText { id: String, uri: String },
}

pub enum FetchResponse {
    Buffer {
        id: String,
        bytes: Vec<u8>,
    },
    Image {
        id: String,
        image: image::DynamicImage,
    },
    ShaderText {
        id: String,
        text: String,
    },
    /// A fetch that settled without a payload. The session counts it so the
    /// load converges instead of hanging on a resource that will never come.
    Failed {
        kind: ResourceKind,
        id: String,
        message: String,
    },
}

/// One settled-but-failed fetch, reported through the completion outcome.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub kind: ResourceKind,
    pub id: String,
    pub message: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\": {}", self.kind, self.id, self.message)
    }
}

fn fetch_worker_loop(
    base: PathBuf,
    rx: crossbeam::channel::Receiver<FetchRequest>,
    tx: crossbeam::channel::Sender<FetchResponse>,
) {
    while let Ok(req) = rx.recv() {
        let res = match req {
            FetchRequest::Buffer { id, uri } => {
                let err_id = id.clone();
                std::fs::read(base.join(&uri)).map_or_else(
                    |e| FetchResponse::Failed {
                        kind: ResourceKind::Buffer,
                        id: err_id,
                        message: e.to_string(),
                    },
                    |bytes| FetchResponse::Buffer { id, bytes },
                )
            }
            FetchRequest::Image { id, uri } => {
                let err_id = id.clone();
                std::fs::read(base.join(&uri))
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| {
                        image::load_from_memory(&bytes).map_err(|e| e.to_string())
                    })
                    .map_or_else(
                        |message| FetchResponse::Failed {
                            kind: ResourceKind::Image,
                            id: err_id,
                            message,
                        },
                        |image| FetchResponse::Image { id, image },
                    )
            }
            FetchRequest::ShaderText { id, uri } => {
                let err_id = id.clone();
                std::fs::read_to_string(base.join(&uri)).map_or_else(
                    |e| FetchResponse::Failed {
                        kind: ResourceKind::Shader,
                        id: err_id,
                        message: e.to_string(),
                    },
                    |text| FetchResponse::ShaderText { id, text },
                )
            }
        };

        // ignore send errors on shutdown
        let _ = tx.send(res);
    }
}

/// Filesystem transport: resolves URIs against a base directory on a small
/// worker pool and decodes images off the loading thread.
pub struct FileFetcher {
    pub requests: Sender<FetchRequest>,
    pub responses: Receiver<FetchResponse>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

impl FileFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        let (req_tx, req_rx) = crossbeam::channel::unbounded();
        let (res_tx, res_rx) = crossbeam::channel::unbounded();

        let workers = (0..2)
            .map(|_| {
                let base = base.clone();
                let rx = req_rx.clone();
                let tx = res_tx.clone();
                std::thread::spawn(move || {
                    fetch_worker_loop(base, rx, tx);
                })
            })
            .collect();

        Self {
            requests: req_tx,
            responses: res_rx,
            workers,
        }
    }

    /// Drop the request side and wait for the workers to drain.
    pub fn shutdown(self) {
        drop(self.requests);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}
