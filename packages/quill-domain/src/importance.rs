pub const MIN_IMPORTANCE: f32 = 1.0;
pub const MAX_IMPORTANCE: f32 = 10.0;
pub const NEUTRAL_IMPORTANCE: f32 = 5.0;

const PER_ENTITY: f32 = 0.5;
const PER_PLOT_ELEMENT: f32 = 0.75;
const COUNT_CAP: usize = 4;

#[derive(Clone, Copy, Debug, Default)]
pub struct ImportanceSignals {
	pub characters: usize,
	pub themes: usize,
	pub plot_elements: usize,
	pub has_dialogue: bool,
	pub has_action: bool,
}

pub fn score(base: f32, signals: ImportanceSignals) -> f32 {
	let mut value = base;

	value += PER_ENTITY * signals.characters.min(COUNT_CAP) as f32;
	value += PER_ENTITY * signals.themes.min(COUNT_CAP) as f32;
	value += PER_PLOT_ELEMENT * signals.plot_elements.min(COUNT_CAP) as f32;

	if signals.has_dialogue {
		value += 1.0;
	}
	if signals.has_action {
		value += 1.0;
	}

	clamp(value)
}

pub fn clamp(value: f32) -> f32 {
	if !value.is_finite() {
		return NEUTRAL_IMPORTANCE;
	}

	value.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}
