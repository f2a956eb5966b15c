use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub max_words: u32,
	pub overlap_words: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextChunk {
	pub chunk_index: u32,
	pub start_offset: usize,
	pub end_offset: usize,
	pub text: String,
}

pub fn word_count(text: &str) -> usize {
	text.unicode_words().count()
}

/// Packs whole sentences into chunks of at most `max_words` words. A single sentence longer than
/// the limit becomes its own chunk. Consecutive chunks share up to `overlap_words` trailing words.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<TextChunk> {
	let max_words = cfg.max_words.max(1) as usize;
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_words = 0_usize;
	let mut current_start = 0_usize;
	let mut last_end = 0_usize;
	let mut chunk_index = 0_u32;

	for (idx, sentence) in text.split_sentence_bound_indices() {
		let sentence_words = word_count(sentence);

		if current_words + sentence_words > max_words && current_words > 0 {
			push_chunk(&mut chunks, chunk_index, current_start, last_end, &current);

			chunk_index += 1;

			let overlap = overlap_tail(&current, cfg.overlap_words);

			current_start = last_end.saturating_sub(overlap.len());
			current_words = word_count(overlap);
			current = overlap.to_string();
		}
		if current.is_empty() {
			current_start = idx;
		}

		current.push_str(sentence);

		current_words += sentence_words;
		last_end = idx + sentence.len();
	}

	if current_words > 0 {
		push_chunk(&mut chunks, chunk_index, current_start, last_end, &current);
	}

	chunks
}

fn push_chunk(chunks: &mut Vec<TextChunk>, chunk_index: u32, start: usize, end: usize, text: &str) {
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return;
	}

	chunks.push(TextChunk {
		chunk_index,
		start_offset: start,
		end_offset: end,
		text: trimmed.to_string(),
	});
}

fn overlap_tail(text: &str, overlap_words: u32) -> &str {
	if overlap_words == 0 {
		return "";
	}

	let starts: Vec<usize> = text.unicode_word_indices().map(|(idx, _)| idx).collect();
	let keep = (overlap_words as usize).min(starts.len());

	match starts.len().checked_sub(keep).and_then(|first| starts.get(first)) {
		Some(start) if keep > 0 => &text[*start..],
		_ => "",
	}
}
