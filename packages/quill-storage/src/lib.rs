pub mod models;
pub mod project_store;
pub mod snapshot;
pub mod snapshot_store;
pub mod time_serde;

mod error;

pub use error::Error;
pub use models::{Chunk, ChunkMetadata, ProjectProfile};
pub use project_store::{DirProjectStore, ProjectSource, ProjectStore};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot, SnapshotDocument};
pub use snapshot_store::{SnapshotStore, WriteOutcome};

use std::{future::Future, pin::Pin};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
