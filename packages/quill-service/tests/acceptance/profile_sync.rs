use quill_domain::ExtractedEntities;

use super::Harness;

const SAGA: &str = "Sigrun and Hagen crossed the river at night. Sigrun laughed as Hagen stumbled. \
	The old feud between the families burned on.";

#[tokio::test]
async fn profile_is_created_from_the_project_store_once() {
	let harness = Harness::new();

	harness.store.insert("P5", SAGA);

	let service = harness.open().await;
	let profile = service.sync_project_context("P5").await.expect("Expected a profile.");

	assert_eq!(profile.project_id, "P5");
	assert!(profile.characters.contains(&"Sigrun".to_string()));
	assert!(profile.characters.contains(&"Hagen".to_string()));
	assert!(!profile.writing_style.is_empty());

	let again = service.sync_project_context("P5").await.expect("Expected a cached profile.");

	assert_eq!(again, profile);
	assert_eq!(harness.store.reads(), 1);
}

#[tokio::test]
async fn unknown_or_blank_projects_have_no_profile() {
	let harness = Harness::new();
	let service = harness.open().await;

	assert!(service.sync_project_context("nope").await.is_none());
	assert!(service.sync_project_context("   ").await.is_none());
	assert_eq!(harness.store.reads(), 1);
}

#[tokio::test]
async fn ingestion_creates_the_profile_without_reading_the_store() {
	let harness = Harness::new();
	let service = harness.open().await;

	super::add(&service, Some("P6"), "Thor wielded Mjolnir against the frost giants. Loki laughed.").await;

	let profile = service.sync_project_context("P6").await.expect("Expected a profile.");

	assert!(profile.characters.contains(&"Thor".to_string()));
	assert_eq!(harness.store.reads(), 0);
}

#[tokio::test]
async fn merges_keep_existing_entries_and_respect_the_cap() {
	let harness = Harness::new();
	let service = harness.open().await;
	let first = ExtractedEntities {
		characters: vec!["Thor".to_string(), "Loki".to_string()],
		..Default::default()
	};
	let crowd = ExtractedEntities {
		characters: (0..30).map(|n| format!("Extra{n}")).chain(["loki".to_string()]).collect(),
		..Default::default()
	};

	service.merge_into_profile("P7", &first).await.expect("Failed to merge.");

	let profile = service.merge_into_profile("P7", &crowd).await.expect("Failed to merge.");

	assert_eq!(profile.characters.len(), 20);
	assert_eq!(&profile.characters[..3], ["Thor", "Loki", "Extra0"]);
	assert!(service.merge_into_profile(" ", &first).await.is_err());
}

#[tokio::test]
async fn synced_profiles_survive_restart() {
	let harness = Harness::new();

	harness.store.insert("P5", SAGA);

	{
		let service = harness.open().await;

		service.sync_project_context("P5").await.expect("Expected a profile.");
	}

	let reopened = harness.open().await;

	assert_eq!(reopened.profiles().len(), 1);
	assert!(reopened.sync_project_context("P5").await.is_some());
	assert_eq!(harness.store.reads(), 1);
}
