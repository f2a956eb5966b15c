use quill_service::ChunkOp;

const ORIGINAL: &str = "Thor wielded Mjolnir against the frost giants while Loki watched from a distant \
	ridge, laughing quietly as thunder rolled across the frozen valleys of Jotunheim and the warriors \
	of Asgard gathered their shields.";
const REWORDED: &str = "Thor wielded Mjolnir against the frost giants while Loki watched from a distant \
	ridge, laughing quietly as thunder rolled across the frozen valleys of Jotunheim and the warriors \
	of Asgard gathered their ancient shields.";

#[tokio::test]
async fn near_duplicate_merges_into_the_existing_chunk() {
	let harness = super::Harness::new();
	let service = harness.open().await;
	let first = super::add(&service, Some("P1"), ORIGINAL).await;
	let second = super::add(&service, Some("P1"), REWORDED).await;

	assert_eq!(first.chunks[0].op, ChunkOp::Added);
	assert_eq!(second.chunks[0].op, ChunkOp::Merged);
	assert_eq!(second.chunks[0].chunk_id, first.chunks[0].chunk_id);

	let chunks = service.chunks(Some("P1"));

	assert_eq!(chunks.len(), 1);
	assert_eq!(chunks[0].content, ORIGINAL);
	assert_eq!(service.get_project_stats("P1").chunk_count, 1);
}

#[tokio::test]
async fn duplicates_in_other_projects_are_kept() {
	let harness = super::Harness::new();
	let service = harness.open().await;

	super::add(&service, Some("P1"), ORIGINAL).await;

	let other = super::add(&service, Some("P2"), ORIGINAL).await;

	assert_eq!(other.chunks[0].op, ChunkOp::Added);
	assert_eq!(service.chunks(Some("P1")).len(), 1);
	assert_eq!(service.chunks(Some("P2")).len(), 1);
}
