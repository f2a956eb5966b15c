use quill_domain::{ContentType, text};
use quill_storage::Chunk;

use super::{SearchRequest, TimeRange};

/// Hard, AND-combined constraints applied after retrieval.
pub(super) struct SearchFilter<'a> {
	project_id: Option<&'a str>,
	user_id: Option<&'a str>,
	content_types: &'a [ContentType],
	themes: &'a [String],
	characters: &'a [String],
	min_importance: Option<f32>,
	time_range: Option<TimeRange>,
}
impl<'a> SearchFilter<'a> {
	pub(super) fn new(req: &'a SearchRequest, project_id: Option<&'a str>) -> Self {
		Self {
			project_id,
			user_id: req.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty()),
			content_types: &req.content_types,
			themes: &req.themes,
			characters: &req.characters,
			min_importance: req.min_importance.filter(|value| value.is_finite()),
			time_range: req.time_range,
		}
	}

	pub(super) fn matches(&self, chunk: &Chunk) -> bool {
		let metadata = &chunk.metadata.enrichment;

		if let Some(project_id) = self.project_id
			&& chunk.project_id() != Some(project_id)
		{
			return false;
		}
		if let Some(user_id) = self.user_id
			&& chunk.metadata.user_id.as_deref() != Some(user_id)
		{
			return false;
		}
		if !self.content_types.is_empty() && !self.content_types.contains(&metadata.content_type) {
			return false;
		}
		if !any_fuzzy(self.themes, &metadata.themes) {
			return false;
		}
		if !any_fuzzy(self.characters, &metadata.characters) {
			return false;
		}
		if let Some(min) = self.min_importance
			&& metadata.importance < min
		{
			return false;
		}
		if let Some(range) = self.time_range {
			let created_at = chunk.metadata.created_at;

			if range.start.is_some_and(|start| created_at < start)
				|| range.end.is_some_and(|end| created_at > end)
			{
				return false;
			}
		}

		true
	}
}

/// An empty request list always passes; otherwise one requested value must fuzzy-match.
fn any_fuzzy(requested: &[String], values: &[String]) -> bool {
	let mut requested = requested.iter().filter(|value| !value.trim().is_empty()).peekable();

	if requested.peek().is_none() {
		return true;
	}

	requested.any(|wanted| values.iter().any(|value| text::fuzzy_match(wanted, value)))
}
