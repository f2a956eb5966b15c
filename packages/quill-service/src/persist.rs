use std::{collections::BTreeMap, sync::atomic::Ordering};

use serde::Serialize;
use uuid::Uuid;

use quill_storage::{Snapshot, SnapshotStore, WriteOutcome};

use crate::{QuillService, Result};

const REEMBED_BATCH: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RehydrateReport {
	pub chunks: usize,
	pub profiles: usize,
	pub reembedded: usize,
	pub rebuilt_profiles: usize,
}

impl QuillService {
	/// Best-effort snapshot of the current state. Failures are logged, never returned.
	pub(crate) async fn persist(&self) {
		let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let contexts: BTreeMap<_, _> = self
			.profiles
			.read()
			.unwrap_or_else(|err| err.into_inner())
			.iter()
			.map(|(id, profile)| (id.clone(), profile.clone()))
			.collect();
		let snapshot = Snapshot::new(self.index.snapshot_documents(), contexts, self.clock.now());
		let store = self.snapshots.clone();

		match tokio::task::spawn_blocking(move || store.write(generation, &snapshot)).await {
			Ok(Ok(WriteOutcome::Written { backup })) => {
				tracing::debug!(generation, backup = ?backup, "Snapshot persisted.");
			},
			Ok(Ok(WriteOutcome::Skipped { latest_generation })) => {
				tracing::debug!(generation, latest_generation, "Snapshot superseded by a newer one.");
			},
			Ok(Err(err)) => {
				tracing::warn!(error = %err, generation, "Snapshot write failed.");
			},
			Err(err) => {
				tracing::warn!(error = %err, generation, "Snapshot task failed.");
			},
		}
	}

	pub(crate) async fn rehydrate(&self) -> Result<RehydrateReport> {
		let store = self.snapshots.clone();
		let loaded = tokio::task::spawn_blocking(move || load_or_recover(&store)).await.map_err(|err| {
			crate::Error::Storage { message: format!("Snapshot load task failed: {err}.") }
		})?;
		let Some(snapshot) = loaded else {
			tracing::info!(path = ?self.snapshots.path(), "No snapshot restored. Starting empty.");

			return Ok(RehydrateReport::default());
		};
		let mut report = RehydrateReport {
			chunks: snapshot.documents.len(),
			profiles: snapshot.project_contexts.len(),
			..Default::default()
		};

		self.index.restore(snapshot.documents.into_iter().map(|doc| doc.into_parts()).collect());
		*self.profiles.write().unwrap_or_else(|err| err.into_inner()) =
			snapshot.project_contexts.into_iter().collect();

		report.reembedded = self.embed_missing(&self.index.missing_vectors()).await;

		for project_id in self.index.project_ids() {
			if self.profile(&project_id).is_none() {
				self.rebuild_profile(&project_id);

				report.rebuilt_profiles += 1;
			}
		}

		if report.reembedded > 0 || report.rebuilt_profiles > 0 {
			self.persist().await;
		}

		Ok(report)
	}

	/// Embeds `missing` chunk contents in batches and stores the vectors. Stops at the first
	/// failed batch.
	pub(crate) async fn embed_missing(&self, missing: &[(Uuid, String)]) -> usize {
		let mut updated = 0;

		for batch in missing.chunks(REEMBED_BATCH) {
			let texts: Vec<String> = batch.iter().map(|(_, content)| content.clone()).collect();

			match self.embed_texts(&texts).await {
				Ok(vectors) => {
					let pairs = batch.iter().map(|(id, _)| *id).zip(vectors).collect();

					updated += self.index.set_vectors(pairs);
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						remaining = missing.len().saturating_sub(updated),
						"Re-embedding stopped. Remaining chunks stay lexical-only."
					);

					break;
				},
			}
		}

		updated
	}
}

/// Loads the live snapshot, then the newest readable backup. Unreadable state never blocks
/// startup; the service starts empty instead.
fn load_or_recover(store: &SnapshotStore) -> Option<Snapshot> {
	let err = match store.load() {
		Ok(snapshot) => return snapshot,
		Err(err) => err,
	};

	tracing::warn!(error = %err, path = ?store.path(), "Snapshot unreadable. Trying backups.");

	match store.load_newest_backup() {
		Ok(Some((path, snapshot))) => {
			tracing::warn!(backup = ?path, documents = snapshot.documents.len(), "Snapshot restored from backup.");

			Some(snapshot)
		},
		Ok(None) => {
			tracing::warn!(backup_dir = ?store.backup_dir(), "No readable backup found. Starting empty.");

			None
		},
		Err(err) => {
			tracing::warn!(error = %err, backup_dir = ?store.backup_dir(), "Backups unreadable. Starting empty.");

			None
		},
	}
}
