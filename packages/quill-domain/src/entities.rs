use std::{
	collections::{HashMap, HashSet},
	sync::LazyLock,
};

use regex::Regex;

use crate::text;

/// Entities already validated for a project. Profile entities need less evidence to be accepted.
#[derive(Clone, Debug, Default)]
pub struct KnownEntities {
	pub characters: Vec<String>,
	pub themes: Vec<String>,
	pub settings: Vec<String>,
}
impl KnownEntities {
	pub fn is_empty(&self) -> bool {
		self.characters.is_empty() && self.themes.is_empty() && self.settings.is_empty()
	}

	fn knows_character(&self, name: &str) -> bool {
		contains_normalized(&self.characters, name)
	}

	fn knows_theme(&self, theme: &str) -> bool {
		contains_normalized(&self.themes, theme)
	}
}

pub const THEME_LEXICON: &[(&str, &[&str])] = &[
	("love", &["love", "loved", "loves", "beloved", "heart", "kiss", "romance", "passion"]),
	("death", &["death", "dead", "die", "died", "dying", "grave", "funeral", "mourning", "corpse"]),
	("power", &["power", "throne", "crown", "ruler", "control", "empire", "command", "authority"]),
	("betrayal", &["betray", "betrayed", "betrayal", "traitor", "treachery", "deceit", "lied"]),
	("friendship", &["friend", "friends", "friendship", "ally", "allies", "companion", "loyalty"]),
	(
		"family",
		&["family", "mother", "father", "sister", "brother", "son", "daughter", "parents", "children"],
	),
	("war", &["war", "battle", "soldier", "soldiers", "army", "fight", "fought", "siege", "enemy"]),
	(
		"mythology",
		&[
			"myth", "myths", "mythology", "legend", "legends", "god", "gods", "goddess", "deity",
			"deities", "giant", "giants", "immortal", "oracle", "prophecy",
		],
	),
	("redemption", &["redemption", "redeem", "redeemed", "forgive", "forgiveness", "atone"]),
	("identity", &["identity", "belong", "belonging", "mask", "disguise", "heritage", "origin"]),
	("freedom", &["freedom", "free", "escape", "escaped", "chains", "prison", "liberty", "captive"]),
	("revenge", &["revenge", "vengeance", "avenge", "avenged", "retribution", "grudge"]),
	("nature", &["forest", "river", "mountain", "sea", "storm", "tree", "trees", "wind", "rain"]),
	("magic", &["magic", "spell", "spells", "wizard", "witch", "enchanted", "curse", "rune", "runes"]),
];

const EMOTION_LEXICON: &[(&str, &[&str])] = &[
	("joy", &["happy", "joy", "joyful", "laughed", "smiled", "delight", "cheered"]),
	("sadness", &["sad", "wept", "tears", "grief", "sorrow", "cried", "mourned"]),
	("anger", &["angry", "rage", "fury", "furious", "shouted", "snarled", "seethed"]),
	("fear", &["afraid", "fear", "terror", "trembled", "scared", "dread", "panic"]),
	("surprise", &["surprised", "shock", "shocked", "gasped", "astonished", "stunned"]),
	("love", &["tender", "adored", "affection", "longing", "cherished"]),
	("hope", &["hope", "hoped", "hopeful", "dream", "dreamed"]),
	("tension", &["tense", "nervous", "anxious", "uneasy", "hesitated"]),
];

const PLOT_LEXICON: &[(&str, &[&str])] = &[
	("conflict", &["against", "fight", "fought", "battle", "struggle", "clash", "attacked"]),
	("discovery", &["discovered", "found", "revealed", "secret", "learned", "uncovered"]),
	("journey", &["journey", "travelled", "traveled", "quest", "voyage", "departed", "road"]),
	("confrontation", &["confronted", "faced", "challenged", "demanded", "accused"]),
	("loss", &["killed", "died", "murdered", "lost", "destroyed", "fell"]),
	("betrayal", &["betrayed", "deceived", "tricked", "abandoned"]),
	("decision", &["decided", "chose", "vowed", "promised", "swore"]),
	("escape", &["escaped", "fled", "ran", "vanished"]),
];

const ACTION_WORDS: &[&str] = &[
	"fought", "ran", "struck", "wielded", "attacked", "charged", "fled", "chased", "grabbed",
	"threw", "leapt", "swung", "slashed", "exploded", "crashed", "raced",
];

const SPEECH_VERBS: &[&str] = &[
	"said", "says", "asked", "replied", "whispered", "shouted", "cried", "muttered", "answered",
	"laughed", "smiled", "nodded", "sighed", "ran", "saw", "knew", "thought", "took", "stood",
	"turned", "looked",
];

const SETTING_NOUNS: &[&str] = &[
	"castle", "forest", "village", "city", "kingdom", "tavern", "mountains", "valley", "river",
	"palace", "temple", "cave", "desert", "library", "market", "garden", "battlefield", "realm",
	"harbor", "ship", "fortress", "hall",
];

const NAME_STOPWORDS: &[&str] = &[
	"a", "about", "above", "across", "after", "again", "against", "all", "also", "an", "and",
	"another", "are", "as", "at", "before", "behind", "below", "beneath", "but", "by", "chapter",
	"did", "do", "even", "every", "for", "from", "he", "her", "here", "his", "how", "i", "idea",
	"if", "in", "inside", "into", "it", "its", "just", "later", "let", "maybe", "meanwhile", "my",
	"near", "no", "not", "note", "notes", "now", "oh", "on", "once", "one", "only", "or", "our",
	"outside", "over", "perhaps", "scene", "she", "so", "some", "still", "suddenly", "that",
	"the", "their", "then", "there", "these", "they", "this", "those", "through", "to", "todo",
	"two", "under", "was", "we", "were", "what", "when", "where", "while", "who", "why", "with",
	"within", "without", "yes", "yet", "you", "your", "monday", "tuesday", "wednesday",
	"thursday", "friday", "saturday", "sunday", "january", "february", "march", "april", "may",
	"june", "july", "august", "september", "october", "november", "december",
];

const TAG_STOPWORDS: &[&str] = &[
	"about", "after", "again", "against", "also", "been", "before", "being", "could", "each",
	"from", "have", "into", "just", "like", "more", "much", "only", "over", "said", "some",
	"than", "that", "their", "them", "then", "there", "these", "they", "this", "those",
	"through", "very", "were", "what", "when", "where", "which", "while", "will", "with",
	"would", "your",
];

const MIN_TAG_CHARS: usize = 4;

static CAPITALIZED: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\b\p{Lu}\p{Ll}+\b").expect("Capitalized word pattern must compile.")
});
static NEXT_WORD: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s+(\p{L}+)").expect("Next word pattern must compile."));
static PLACE_NAME: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"\b(?i:in|at|to|from|inside|beneath|across|near|within|outside|through|into|toward|towards)\s+(\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)?)",
	)
	.expect("Place name pattern must compile.")
});

#[derive(Default)]
struct NameEvidence {
	first_seen: usize,
	count: usize,
	strong: bool,
}

/// Capitalized names that look like characters. A name is accepted when it is already known,
/// appears at least twice, appears mid-sentence, or is followed by a verb.
pub fn extract_characters(
	raw: &str,
	known: &KnownEntities,
	excluded: &[String],
	cap: usize,
) -> Vec<String> {
	let mut evidence: HashMap<&str, NameEvidence> = HashMap::new();

	for (position, found) in CAPITALIZED.find_iter(raw).enumerate() {
		let name = found.as_str();
		let lowered = name.to_lowercase();

		if NAME_STOPWORDS.contains(&lowered.as_str()) || contains_normalized(excluded, name) {
			continue;
		}

		let strong = !starts_sentence(&raw[..found.start()]) || followed_by_verb(&raw[found.end()..]);
		let entry =
			evidence.entry(name).or_insert_with(|| NameEvidence { first_seen: position, ..Default::default() });

		entry.count += 1;
		entry.strong |= strong;
	}

	let mut accepted: Vec<(&str, NameEvidence)> = evidence
		.into_iter()
		.filter(|(name, seen)| known.knows_character(name) || seen.count >= 2 || seen.strong)
		.collect();

	accepted.sort_by_key(|(_, seen)| seen.first_seen);

	text::sanitize_entities(accepted.into_iter().map(|(name, _)| name), cap)
}

/// Themes need two keyword hits, or one when the project already tracks the theme.
pub fn detect_themes(raw: &str, known: &KnownEntities, cap: usize) -> Vec<String> {
	let tokens = text::tokenize(raw);
	let normalized = text::normalize(raw);
	let mut out = Vec::new();

	for (theme, keywords) in THEME_LEXICON {
		let hits = keyword_hits(&tokens, keywords);
		let threshold = if known.knows_theme(theme) { 1 } else { 2 };

		if hits >= threshold {
			out.push((*theme).to_string());
		}
	}
	for theme in &known.themes {
		if normalized.contains(&text::normalize(theme)) {
			out.push(theme.clone());
		}
	}

	text::sanitize_entities(out, cap)
}

pub fn detect_emotions(raw: &str, cap: usize) -> Vec<String> {
	lexicon_labels(&text::tokenize(raw), EMOTION_LEXICON, cap)
}

pub fn detect_plot_elements(raw: &str, cap: usize) -> Vec<String> {
	lexicon_labels(&text::tokenize(raw), PLOT_LEXICON, cap)
}

/// Proper place names after a location preposition, setting nouns, and known project settings.
pub fn extract_settings(raw: &str, known: &KnownEntities, cap: usize) -> Vec<String> {
	let normalized = text::normalize(raw);
	let mut out: Vec<String> = PLACE_NAME
		.captures_iter(raw)
		.filter_map(|caps| caps.get(1))
		.map(|name| name.as_str().to_string())
		.filter(|name| {
			name.split_whitespace()
				.all(|word| !NAME_STOPWORDS.contains(&word.to_lowercase().as_str()))
		})
		.collect();

	for token in text::tokenize(raw) {
		if SETTING_NOUNS.contains(&token.as_str()) {
			out.push(token);
		}
	}
	for setting in &known.settings {
		if normalized.contains(&text::normalize(setting)) {
			out.push(setting.clone());
		}
	}

	text::sanitize_entities(out, cap)
}

/// Most frequent content words, ties broken by first occurrence.
pub fn semantic_tags(raw: &str, cap: usize) -> Vec<String> {
	let mut counts: HashMap<String, (usize, usize)> = HashMap::new();

	for (position, token) in text::tokenize(raw).into_iter().enumerate() {
		if token.chars().count() < MIN_TAG_CHARS
			|| TAG_STOPWORDS.contains(&token.as_str())
			|| !token.chars().all(char::is_alphabetic)
		{
			continue;
		}

		counts.entry(token).or_insert((0, position)).0 += 1;
	}

	let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();

	ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then(a.1.1.cmp(&b.1.1)));

	text::sanitize_entities(ranked.into_iter().map(|(token, _)| token), cap)
}

pub fn has_action(raw: &str) -> bool {
	text::tokenize(raw).iter().any(|token| ACTION_WORDS.contains(&token.as_str()))
}

/// Lexicon themes whose name or keywords appear in a short text such as a query.
pub fn mentioned_themes(raw: &str) -> Vec<String> {
	let tokens = text::tokenize(raw);

	THEME_LEXICON
		.iter()
		.filter(|(theme, keywords)| {
			tokens.iter().any(|token| token == theme) || keyword_hits(&tokens, keywords) > 0
		})
		.map(|(theme, _)| (*theme).to_string())
		.collect()
}

fn lexicon_labels(tokens: &[String], lexicon: &[(&str, &[&str])], cap: usize) -> Vec<String> {
	let labels = lexicon
		.iter()
		.filter(|(_, keywords)| keyword_hits(tokens, keywords) > 0)
		.map(|(label, _)| *label);

	text::sanitize_entities(labels, cap)
}

fn keyword_hits(tokens: &[String], keywords: &[&str]) -> usize {
	tokens.iter().filter(|token| keywords.contains(&token.as_str())).count()
}

fn starts_sentence(before: &str) -> bool {
	match before.trim_end().chars().last() {
		None => true,
		Some(last) => matches!(last, '.' | '!' | '?' | '"' | '\u{201C}' | '\u{201D}' | ':' | '\n'),
	}
}

fn followed_by_verb(after: &str) -> bool {
	let Some(word) = NEXT_WORD.captures(after).and_then(|caps| caps.get(1)) else {
		return false;
	};
	let word = word.as_str().to_lowercase();

	SPEECH_VERBS.contains(&word.as_str()) || (word.len() > 3 && word.ends_with("ed"))
}

fn contains_normalized(values: &[String], needle: &str) -> bool {
	let needle = text::normalize(needle.trim());

	values.iter().any(|value| text::normalize(value.trim()) == needle)
}
