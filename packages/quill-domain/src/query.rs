use serde::{Deserialize, Serialize};

use crate::{content_type::ContentType, entities, entities::KnownEntities, text};

/// What a query asks for, derived before ranking.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAnalysis {
	pub terms: Vec<String>,
	pub intents: Vec<ContentType>,
	pub characters: Vec<String>,
	pub themes: Vec<String>,
}

pub fn analyze(query: &str, known: &KnownEntities) -> QueryAnalysis {
	let terms = text::query_terms(query);
	let tokens = text::tokenize(query);
	let intents = ContentType::ALL
		.into_iter()
		.filter(|kind| kind.query_cues().iter().any(|cue| tokens.iter().any(|token| token == cue)))
		.collect();
	let characters = known
		.characters
		.iter()
		.filter(|name| mentions(&tokens, name))
		.cloned()
		.collect();
	let mut themes: Vec<String> =
		known.themes.iter().filter(|theme| mentions(&tokens, theme)).cloned().collect();

	text::bounded_union(&mut themes, entities::mentioned_themes(query), usize::MAX);

	QueryAnalysis { terms, intents, characters, themes }
}

/// True when every word of `entity` appears as a query token.
fn mentions(tokens: &[String], entity: &str) -> bool {
	let words = text::tokenize(entity);

	!words.is_empty() && words.iter().all(|word| tokens.contains(word))
}
