use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read snapshot at {path:?}.")]
	ReadSnapshot { path: PathBuf, source: io::Error },
	#[error("Failed to write snapshot at {path:?}.")]
	WriteSnapshot { path: PathBuf, source: io::Error },
	#[error("Failed to back up snapshot to {path:?}.")]
	Backup { path: PathBuf, source: io::Error },
	#[error("Failed to decode snapshot at {path:?}.")]
	DecodeSnapshot { path: PathBuf, source: serde_json::Error },
	#[error("Snapshot version {found} is newer than supported version {supported}.")]
	UnsupportedVersion { found: u32, supported: u32 },
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	Io(#[from] io::Error),
}
