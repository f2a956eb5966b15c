use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

use crate::content_type::TextSignals;

const UNKNOWN: &str = "unknown";
const NEUTRAL_TONE: &str = "neutral";

/// Describes sentence pacing and how much of the text is dialogue.
pub fn writing_style<'a, I>(samples: I) -> String
where
	I: IntoIterator<Item = &'a str>,
{
	let mut sentences = 0_usize;
	let mut words = 0_usize;
	let mut samples_seen = 0_usize;
	let mut dialogue_samples = 0_usize;

	for sample in samples {
		for sentence in sample.unicode_sentences() {
			let count = sentence.unicode_words().count();

			if count > 0 {
				sentences += 1;
				words += count;
			}
		}

		samples_seen += 1;

		if TextSignals::from_text(sample).has_dialogue() {
			dialogue_samples += 1;
		}
	}

	if sentences == 0 {
		return UNKNOWN.to_string();
	}

	let average = words as f32 / sentences as f32;
	let pacing = if average < 12.0 {
		"concise"
	} else if average < 22.0 {
		"balanced"
	} else {
		"elaborate"
	};
	let ratio = dialogue_samples as f32 / samples_seen.max(1) as f32;
	let mode = if ratio > 0.4 {
		"dialogue-driven"
	} else if ratio > 0.1 {
		"mixed narration and dialogue"
	} else {
		"narrative-focused"
	};

	format!("{pacing} sentences, {mode}")
}

/// Summarizes the dominant emotions. Ties keep first-seen order.
pub fn tone_analysis<'a, I>(emotions: I) -> String
where
	I: IntoIterator<Item = &'a str>,
{
	let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

	for (position, emotion) in emotions.into_iter().enumerate() {
		counts.entry(emotion).or_insert((0, position)).0 += 1;
	}

	let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();

	ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));

	match ranked.as_slice() {
		[] => NEUTRAL_TONE.to_string(),
		[(only, _)] => format!("predominantly {only}"),
		[(first, _), (second, _), ..] => format!("predominantly {first} with notes of {second}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_prose_is_concise_and_narrative() {
		let style = writing_style(["The wind rose. Snow fell. The hall was silent."]);

		assert_eq!(style, "concise sentences, narrative-focused");
	}

	#[test]
	fn dialogue_heavy_samples_are_detected() {
		let style = writing_style(["\"Go,\" she said. \"Now.\"", "\"Why?\" he asked."]);

		assert!(style.ends_with("dialogue-driven"), "unexpected style: {style}");
	}

	#[test]
	fn empty_input_is_unknown() {
		assert_eq!(writing_style(std::iter::empty::<&str>()), "unknown");
		assert_eq!(tone_analysis(std::iter::empty::<&str>()), "neutral");
	}

	#[test]
	fn tone_reports_top_two_emotions() {
		let tone = tone_analysis(["fear", "anger", "fear", "hope"]);

		assert_eq!(tone, "predominantly fear with notes of anger");
	}
}
