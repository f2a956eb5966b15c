use quill_domain::ContentType;

const ROSTERS: [&str; 3] = [
	"The crew included Abel, Boris, Carla, Dmitri, Elena, Farid, Greta, Hector, Ines and Jonas.",
	"The second watch included Abel, Boris, Kira, Lars, Mona, Nils, Omar, Petra, Quinn and Rosa.",
	"The final roster included Carla, Kira, Sven, Tomas, Ulla, Vera, Wren, Xander, Yuri and Zara.",
];

#[tokio::test]
async fn characters_are_a_deduplicated_union_capped_at_twenty() {
	let harness = super::Harness::new();
	let service = harness.open().await;

	for roster in ROSTERS {
		super::add(&service, Some("P2"), roster).await;
	}

	let stats = service.get_project_stats("P2");
	let mut lowered: Vec<String> = stats.characters.iter().map(|name| name.to_lowercase()).collect();

	lowered.sort();
	lowered.dedup();

	assert_eq!(stats.chunk_count, 3);
	assert_eq!(stats.document_count, 3);
	assert_eq!(stats.characters.len(), 20);
	assert_eq!(lowered.len(), 20);
	assert_eq!(stats.characters[0], "Abel");
	assert!(stats.characters.contains(&"Tomas".to_string()));
	assert!(!stats.characters.contains(&"Ulla".to_string()));
	assert!(stats.last_updated.is_some());
	assert!(!stats.writing_style.is_empty());
}

#[tokio::test]
async fn stats_count_content_types_and_average_importance() {
	let harness = super::Harness::new();
	let service = harness.open().await;

	super::add(&service, Some("P3"), "Note: TODO fix the timeline in chapter two.").await;
	super::add(&service, Some("P3"), "\"Run,\" said Ada. \"Now,\" said Bo.").await;

	let stats = service.get_project_stats("P3");
	let total: usize = stats.content_types.values().sum();

	assert_eq!(total, 2);
	assert_eq!(stats.content_types.get(&ContentType::Notes), Some(&1));
	assert!((1.0..=10.0).contains(&stats.average_importance));
}

#[tokio::test]
async fn unknown_project_has_empty_stats() {
	let harness = super::Harness::new();
	let service = harness.open().await;
	let stats = service.get_project_stats("missing");

	assert_eq!(stats.chunk_count, 0);
	assert!(stats.characters.is_empty());
	assert!(stats.last_updated.is_none());
	assert_eq!(stats.tone_analysis, "neutral");
}
