//! Asynchronous scene loader for glTF-style JSON documents with external
//! binary buffers, shader texts, and images.
//!
//! Parsing runs once and never blocks: any piece of geometry whose backing
//! buffer has not arrived yet is deferred and decoded when the buffer turns
//! up, in registration order. Byte ranges ("buffer views") are carved out of
//! fetched buffers at most once and shared by every accessor that references
//! them. A load is complete only when parsing, every fetch, and every
//! deferred decode have converged; the outcome is produced exactly once.
//!
//! The transport is pluggable: anything that answers [`fetch::FetchRequest`]s
//! with [`fetch::FetchResponse`]s works. [`fetch::FileFetcher`] reads from a
//! base directory and backs [`load_from_path`]:
//!
//! ```no_run
//! # fn main() -> Result<(), gltf_scene::Error> {
//! let model = gltf_scene::load_from_path("assets/duck/duck.gltf")?;
//! for (id, scene) in &model.scenes {
//!     println!("scene {id}: {} mesh instance(s)", scene.meshes.len());
//! }
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

pub mod buffer;
pub mod cache;
pub mod document;
pub mod error;
pub mod fetch;
pub mod model;
pub mod session;

pub use error::Error;
pub use model::Model;
pub use session::LoadSession;

/// Load a `.gltf` file, fetching its buffers, shaders, and images relative
/// to the file's directory. Blocks until the load converges.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Model, Error> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&text)?;

    let base = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let fetcher = fetch::FileFetcher::new(base);
    let session = LoadSession::begin(json, fetcher.requests.clone())?;
    session.run(&fetcher.responses)
}
