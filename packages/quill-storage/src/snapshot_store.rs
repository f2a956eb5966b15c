use std::{
	fs,
	path::{Path, PathBuf},
	sync::Mutex,
};

use crate::{Error, Result, snapshot::Snapshot};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
	Written { backup: Option<PathBuf> },
	/// A newer generation already reached disk.
	Skipped { latest_generation: u64 },
}

/// Owns the snapshot file. Writes are serialized, take a backup of the previous file, and land via
/// a temporary file plus rename.
pub struct SnapshotStore {
	path: PathBuf,
	backup_dir: PathBuf,
	max_backups: usize,
	last_generation: Mutex<Option<u64>>,
}
impl SnapshotStore {
	pub fn new(cfg: &quill_config::Storage) -> Self {
		Self {
			path: cfg.snapshot_path.clone(),
			backup_dir: cfg.resolved_backup_dir(),
			max_backups: cfg.max_backups as usize,
			last_generation: Mutex::new(None),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn backup_dir(&self) -> &Path {
		&self.backup_dir
	}

	/// Returns `Ok(None)` when no snapshot has been written yet.
	pub fn load(&self) -> Result<Option<Snapshot>> {
		read_snapshot(&self.path)
	}

	/// Newest backup that decodes and carries a supported version. Unreadable backups are skipped.
	pub fn load_newest_backup(&self) -> Result<Option<(PathBuf, Snapshot)>> {
		for path in self.backups()?.into_iter().rev() {
			match read_snapshot(&path) {
				Ok(Some(snapshot)) => return Ok(Some((path, snapshot))),
				Ok(None) => {},
				Err(err) => {
					tracing::warn!(error = %err, backup = ?path, "Skipping unreadable backup.");
				},
			}
		}

		Ok(None)
	}

	pub fn write(&self, generation: u64, snapshot: &Snapshot) -> Result<WriteOutcome> {
		let mut last = self.last_generation.lock().unwrap_or_else(|err| err.into_inner());

		if let Some(latest) = *last
			&& generation < latest
		{
			tracing::debug!(generation, latest, "Skipping stale snapshot write.");

			return Ok(WriteOutcome::Skipped { latest_generation: latest });
		}

		let encoded = serde_json::to_vec_pretty(snapshot)?;

		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent)
				.map_err(|source| Error::WriteSnapshot { path: self.path.clone(), source })?;
		}

		let backup = self.backup_existing(generation, snapshot)?;
		let tmp = self.path.with_extension("json.tmp");

		fs::write(&tmp, &encoded).map_err(|source| Error::WriteSnapshot { path: tmp.clone(), source })?;
		fs::rename(&tmp, &self.path)
			.map_err(|source| Error::WriteSnapshot { path: self.path.clone(), source })?;

		*last = Some(generation);

		tracing::debug!(
			generation,
			documents = snapshot.documents.len(),
			projects = snapshot.project_contexts.len(),
			"Snapshot written."
		);

		Ok(WriteOutcome::Written { backup })
	}

	/// Backup files, oldest first.
	pub fn backups(&self) -> Result<Vec<PathBuf>> {
		let entries = match fs::read_dir(&self.backup_dir) {
			Ok(entries) => entries,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err.into()),
		};
		let prefix = format!("{}-", self.file_stem());
		let mut out = Vec::new();

		for entry in entries {
			let path = entry?.path();
			let is_backup = path
				.file_name()
				.and_then(|name| name.to_str())
				.is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"));

			if is_backup {
				out.push(path);
			}
		}

		out.sort();

		Ok(out)
	}

	fn backup_existing(&self, generation: u64, snapshot: &Snapshot) -> Result<Option<PathBuf>> {
		if self.max_backups == 0 || !self.path.exists() {
			return Ok(None);
		}

		fs::create_dir_all(&self.backup_dir)
			.map_err(|source| Error::Backup { path: self.backup_dir.clone(), source })?;

		let stamp = snapshot.timestamp.unix_timestamp_nanos().max(0);
		let target = self
			.backup_dir
			.join(format!("{}-{stamp:020}-{generation:010}.json", self.file_stem()));

		fs::copy(&self.path, &target).map_err(|source| Error::Backup { path: target.clone(), source })?;
		self.prune_backups()?;

		Ok(Some(target))
	}

	fn prune_backups(&self) -> Result<()> {
		let backups = self.backups()?;
		let excess = backups.len().saturating_sub(self.max_backups);

		for stale in backups.into_iter().take(excess) {
			fs::remove_file(&stale).map_err(|source| Error::Backup { path: stale.clone(), source })?;
		}

		Ok(())
	}

	fn file_stem(&self) -> String {
		self.path
			.file_stem()
			.and_then(|stem| stem.to_str())
			.unwrap_or("snapshot")
			.to_string()
	}
}

fn read_snapshot(path: &Path) -> Result<Option<Snapshot>> {
	let raw = match fs::read(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(source) => return Err(Error::ReadSnapshot { path: path.to_path_buf(), source }),
	};
	let snapshot: Snapshot = serde_json::from_slice(&raw)
		.map_err(|source| Error::DecodeSnapshot { path: path.to_path_buf(), source })?;

	snapshot.ensure_supported()?;

	Ok(Some(snapshot))
}
