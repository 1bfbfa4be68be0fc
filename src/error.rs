use thiserror::Error;

use crate::fetch::FetchFailure;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a load.
///
/// Structural problems in the document surface synchronously from
/// [`LoadSession::begin`](crate::session::LoadSession::begin); problems found
/// while running deferred decode work surface from `deliver`/`run`; fetch
/// failures are collected and reported once through the completion outcome.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("document references missing {kind} \"{id}\"")]
    MissingRef { kind: &'static str, id: String },

    #[error("primitive in mesh \"{mesh}\" has no material")]
    MissingMaterial { mesh: String },

    #[error("primitive in mesh \"{mesh}\" has no vertex attributes")]
    NoAttributes { mesh: String },

    #[error("node \"{node}\" has neither a matrix nor translation/rotation/scale")]
    NodeWithoutTransform { node: String },

    #[error("node \"{node}\" has both a matrix and translation/rotation/scale")]
    AmbiguousNodeTransform { node: String },

    #[error(
        "attributes of a primitive in mesh \"{mesh}\" are not interleaved in \
         one buffer view with one component type"
    )]
    MixedAttributeLayout { mesh: String },

    #[error(
        "buffer view \"{view}\" wants {byte_length} bytes at offset \
         {byte_offset} of buffer \"{buffer}\" but only {available} are available"
    )]
    ViewOutOfBounds {
        view: String,
        buffer: String,
        byte_offset: usize,
        byte_length: usize,
        available: usize,
    },

    #[error(
        "accessor wants {components} components of {component_bytes} bytes at \
         offset {byte_offset} but the buffer view holds {available} bytes"
    )]
    AccessorOutOfBounds {
        byte_offset: usize,
        components: usize,
        component_bytes: usize,
        available: usize,
    },

    #[error("transport channel closed before the load completed")]
    TransportClosed,

    #[error("{} resource fetch(es) failed", .0.len())]
    ResourcesFailed(Vec<FetchFailure>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn missing(kind: &'static str, id: &str) -> Self {
        Error::MissingRef {
            kind,
            id: id.to_string(),
        }
    }
}
