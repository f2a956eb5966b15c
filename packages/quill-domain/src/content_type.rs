use std::{
	fmt::{Display, Formatter},
	str::FromStr,
	sync::LazyLock,
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
	#[default]
	Narrative,
	Dialogue,
	Notes,
	Character,
	Plot,
	Setting,
	Theme,
}
impl ContentType {
	pub const ALL: [Self; 7] = [
		Self::Narrative,
		Self::Dialogue,
		Self::Notes,
		Self::Character,
		Self::Plot,
		Self::Setting,
		Self::Theme,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Narrative => "narrative",
			Self::Dialogue => "dialogue",
			Self::Notes => "notes",
			Self::Character => "character",
			Self::Plot => "plot",
			Self::Setting => "setting",
			Self::Theme => "theme",
		}
	}

	/// Query words that signal interest in this kind of content.
	pub fn query_cues(self) -> &'static [&'static str] {
		match self {
			Self::Narrative => &["narrative", "scene", "passage", "prose", "describe"],
			Self::Dialogue => &["dialogue", "conversation", "said", "talk", "speech", "quote"],
			Self::Notes => &["note", "notes", "todo", "idea", "reminder"],
			Self::Character => &["character", "characters", "personality", "who", "backstory"],
			Self::Plot => &["plot", "story", "happen", "happens", "event", "events", "arc"],
			Self::Setting => &["setting", "place", "location", "where", "world"],
			Self::Theme => &["theme", "themes", "meaning", "symbol", "motif"],
		}
	}
}
impl Display for ContentType {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for ContentType {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		let needle = raw.trim().to_ascii_lowercase();

		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == needle)
			.ok_or_else(|| format!("Unknown content type '{raw}'."))
	}
}

static NOTE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\b(note|notes|todo|fixme|idea)\s*:").expect("Note marker pattern must compile.")
});
static SPEAKER_LINE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?m)^\s*[A-Z][A-Za-z]{1,20}\s*:\s*\S").expect("Speaker pattern must compile.")
});
static PRONOUN_VERB: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\b(he|she|they)\s+(is|was|has|had|felt|feels|looked|looks|seemed|seems|loved|hated|wanted|wants)\b")
		.expect("Pronoun pattern must compile.")
});
static LOCATION_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\b(in|at|inside|beneath|across|near|within|outside|through|above|below)\s+(the|a|an)\s+\w+")
		.expect("Location pattern must compile.")
});

const CHARACTER_TERMS: &[&str] =
	&["character", "personality", "appearance", "backstory", "motivation", "traits", "flaw"];
const PLOT_TERMS: &[&str] = &[
	"plot", "chapter", "climax", "twist", "conflict", "resolution", "arc", "outline", "subplot",
	"foreshadowing", "act",
];
const SETTING_TERMS: &[&str] = &[
	"city", "village", "forest", "castle", "kingdom", "room", "street", "mountains", "realm",
	"landscape", "world",
];
const THEME_TERMS: &[&str] =
	&["theme", "themes", "symbol", "symbolism", "motif", "represents", "allegory", "metaphor"];

/// Lexical cues measured once per text and shared by every classification rule.
#[derive(Clone, Debug, Default)]
pub struct TextSignals {
	pub words: usize,
	pub quote_marks: usize,
	pub colons: usize,
	pub speaker_lines: usize,
	pub has_note_marker: bool,
	pub pronoun_verbs: usize,
	pub character_terms: usize,
	pub plot_terms: usize,
	pub location_phrases: usize,
	pub setting_terms: usize,
	pub theme_terms: usize,
}
impl TextSignals {
	pub fn from_text(raw: &str) -> Self {
		let tokens = text::tokenize(raw);
		let count_terms =
			|terms: &[&str]| tokens.iter().filter(|token| terms.contains(&token.as_str())).count();

		Self {
			words: tokens.len(),
			quote_marks: raw.chars().filter(|c| matches!(c, '"' | '\u{201C}' | '\u{201D}')).count(),
			colons: raw.chars().filter(|c| *c == ':').count(),
			speaker_lines: SPEAKER_LINE.find_iter(raw).count(),
			has_note_marker: NOTE_MARKER.is_match(raw),
			pronoun_verbs: PRONOUN_VERB.find_iter(raw).count(),
			character_terms: count_terms(CHARACTER_TERMS),
			plot_terms: count_terms(PLOT_TERMS),
			location_phrases: LOCATION_PHRASE.find_iter(raw).count(),
			setting_terms: count_terms(SETTING_TERMS),
			theme_terms: count_terms(THEME_TERMS),
		}
	}

	pub fn has_dialogue(&self) -> bool {
		self.quote_marks >= 2 || self.speaker_lines >= 2
	}
}

type Rule = (ContentType, fn(&TextSignals) -> bool);

/// Evaluated top to bottom; the first match wins.
const RULES: &[Rule] = &[
	(ContentType::Dialogue, is_dialogue),
	(ContentType::Notes, is_notes),
	(ContentType::Character, is_character),
	(ContentType::Plot, is_plot),
	(ContentType::Setting, is_setting),
	(ContentType::Theme, is_theme),
];

pub fn classify(raw: &str) -> ContentType {
	classify_signals(&TextSignals::from_text(raw))
}

pub fn classify_signals(signals: &TextSignals) -> ContentType {
	RULES
		.iter()
		.find(|(_, matches)| matches(signals))
		.map(|(kind, _)| *kind)
		.unwrap_or(ContentType::Narrative)
}

fn is_dialogue(signals: &TextSignals) -> bool {
	if signals.speaker_lines >= 2 {
		return true;
	}

	let density = (signals.quote_marks + signals.colons) as f32 / signals.words.max(1) as f32;

	signals.quote_marks >= 2 && density >= 0.05
}

fn is_notes(signals: &TextSignals) -> bool {
	signals.has_note_marker
}

fn is_character(signals: &TextSignals) -> bool {
	signals.pronoun_verbs >= 2 || signals.character_terms >= 2
}

fn is_plot(signals: &TextSignals) -> bool {
	signals.plot_terms >= 2
}

fn is_setting(signals: &TextSignals) -> bool {
	signals.location_phrases >= 2 || signals.setting_terms >= 2
}

fn is_theme(signals: &TextSignals) -> bool {
	signals.theme_terms >= 1
}
