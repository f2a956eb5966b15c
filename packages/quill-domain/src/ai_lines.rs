//! Secondary parser for model output that is not valid JSON, such as
//! `Characters: Thor, Loki` lines or bulleted variants.

use std::sync::LazyLock;

use regex::Regex;

use crate::metadata::ExtractedEntities;

static FIELD_LINE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\s*(?:[-*\u{2022}]\s*)?\**([A-Za-z][A-Za-z _]*?)\**\s*[:=]\s*(.*)$")
		.expect("Field line pattern must compile.")
});

/// Returns `None` when no recognized field carries a value.
pub fn parse(raw: &str) -> Option<ExtractedEntities> {
	let mut out = ExtractedEntities::default();

	for line in raw.lines() {
		let Some(caps) = FIELD_LINE.captures(line) else {
			continue;
		};
		let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
		let values = split_values(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
		let target = match normalize_key(key).as_str() {
			"characters" | "character" | "names" => &mut out.characters,
			"themes" | "theme" => &mut out.themes,
			"emotions" | "emotion" | "mood" => &mut out.emotions,
			"plotelements" | "plot" | "plotpoints" | "events" => &mut out.plot_elements,
			"semantictags" | "tags" | "keywords" => &mut out.semantic_tags,
			"settings" | "setting" | "locations" | "places" => &mut out.settings,
			_ => continue,
		};

		target.extend(values);
	}

	if out.is_empty() { None } else { Some(out) }
}

fn normalize_key(key: &str) -> String {
	key.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase()
}

fn split_values(raw: &str) -> Vec<String> {
	let raw = raw.trim().trim_start_matches('[').trim_end_matches(']');

	raw.split([',', ';'])
		.map(|value| value.trim().trim_matches(|c| c == '"' || c == '\'' || c == '.').trim())
		.filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("none"))
		.map(str::to_string)
		.collect()
}
