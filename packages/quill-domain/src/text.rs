use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Query terms shorter than this many characters never score.
pub const MIN_TERM_CHARS: usize = 3;

const MAX_ENTITY_CHARS: usize = 60;

pub fn normalize(text: &str) -> String {
	text.nfkc().collect::<String>().to_lowercase()
}

pub fn tokenize(text: &str) -> Vec<String> {
	let normalized = normalize(text);

	normalized.unicode_words().map(strip_possessive).filter(|word| !word.is_empty()).collect()
}

fn strip_possessive(word: &str) -> String {
	let word = word.trim_matches(|c| c == '\'' || c == '\u{2019}');
	let stem = word.strip_suffix("'s").or_else(|| word.strip_suffix("\u{2019}s")).unwrap_or(word);

	stem.to_string()
}

pub fn token_set(text: &str) -> HashSet<String> {
	tokenize(text).into_iter().filter(|token| !token.is_empty()).collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
	if a.is_empty() && b.is_empty() {
		return 1.0;
	}

	let intersection = a.intersection(b).count();
	let union = a.len() + b.len() - intersection;

	if union == 0 {
		return 0.0;
	}

	intersection as f32 / union as f32
}

pub fn query_terms(query: &str) -> Vec<String> {
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for token in tokenize(query) {
		if token.chars().count() < MIN_TERM_CHARS {
			continue;
		}
		if seen.insert(token.clone()) {
			out.push(token);
		}
	}

	out
}

pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
	if needle.is_empty() {
		return 0;
	}

	haystack.matches(needle).count()
}

/// Case-insensitive containment in either direction.
pub fn fuzzy_match(a: &str, b: &str) -> bool {
	let a = normalize(a.trim());
	let b = normalize(b.trim());

	if a.is_empty() || b.is_empty() {
		return false;
	}

	a.contains(&b) || b.contains(&a)
}

pub fn excerpt(text: &str, max_chars: usize) -> String {
	let trimmed = text.trim();

	if trimmed.chars().count() <= max_chars {
		return trimmed.to_string();
	}

	let mut cut: String = trimmed.chars().take(max_chars).collect();

	if let Some(space) = cut.rfind(char::is_whitespace)
		&& space > max_chars / 2
	{
		cut.truncate(space);
	}

	format!("{}...", cut.trim_end())
}

/// Trims, drops empties and overlong values, and de-duplicates case-insensitively while
/// keeping first-seen order.
pub fn sanitize_entities<I, S>(values: I, cap: usize) -> Vec<String>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut out = Vec::new();

	bounded_union(&mut out, values, cap);

	out
}

/// Appends unseen values to `existing` until it holds `cap` entries. Existing entries are never
/// removed or reordered. Returns how many values were added.
pub fn bounded_union<I, S>(existing: &mut Vec<String>, incoming: I, cap: usize) -> usize
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut seen: HashSet<String> = existing.iter().map(|value| normalize(value)).collect();
	let mut added = 0;

	for value in incoming {
		if existing.len() >= cap {
			break;
		}

		let value = value.as_ref().trim().trim_matches(|c| c == '"' || c == '\'').trim();

		if value.is_empty() || value.chars().count() > MAX_ENTITY_CHARS {
			continue;
		}
		if seen.insert(normalize(value)) {
			existing.push(value.to_string());

			added += 1;
		}
	}

	added
}
