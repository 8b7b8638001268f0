use std::collections::HashMap;
use std::sync::Mutex;

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use ttf_parser::Face;

use crate::config::LabelConfig;
use crate::model::NodeRole;

const LINE_HEIGHT: f32 = 1.3;
/// Average glyph advance as a fraction of the em size, used whenever
/// no usable font face is available.
const FALLBACK_CHAR_WIDTH: f32 = 0.56;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Measured width of a single line, or `None` when no face matches
/// the requested family.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

pub(crate) fn text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * FALLBACK_CHAR_WIDTH
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let family_key = normalize_family_key(font_family);
        if !self.cache.contains_key(&family_key) {
            let face = self.load_face(font_family);
            self.cache.insert(family_key.clone(), face);
        }
        let face = self.cache.get(&family_key).and_then(|face| face.as_ref())?;
        let normalized = text.replace('\t', "    ");
        Some(face.measure_width(&normalized, font_size))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let mut names: Vec<String> = Vec::new();
        let mut generics: Vec<Family<'static>> = Vec::new();
        let mut ordered: Vec<Result<usize, usize>> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            let generic = match raw.to_ascii_lowercase().as_str() {
                "serif" => Some(Family::Serif),
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Some(Family::SansSerif)
                }
                "monospace" | "ui-monospace" => Some(Family::Monospace),
                "cursive" => Some(Family::Cursive),
                "fantasy" => Some(Family::Fantasy),
                _ => None,
            };
            match generic {
                Some(family) => {
                    ordered.push(Err(generics.len()));
                    generics.push(family);
                }
                None => {
                    ordered.push(Ok(names.len()));
                    names.push(raw.to_string());
                }
            }
        }

        let mut families: Vec<Family<'_>> = Vec::with_capacity(ordered.len().max(1));
        for token in &ordered {
            match token {
                Ok(idx) => families.push(Family::Name(names[*idx].as_str())),
                Err(idx) => families.push(generics[*idx]),
            }
        }
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded: Option<FontFace> = None;
        self.db.with_face_data(id, |data, index| {
            if let Ok(face) = Face::parse(data, index) {
                loaded = Some(FontFace::new(data.to_vec(), index, &face));
            }
        });
        loaded
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32, face: &Face<'_>) -> Self {
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Self {
            data,
            index,
            units_per_em: face.units_per_em().max(1),
            ascii_advances,
        }
    }

    fn measure_width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * FALLBACK_CHAR_WIDTH;

        if text.is_ascii() {
            let mut width = 0.0f32;
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                if advance == 0 {
                    width += fallback;
                } else {
                    width += advance as f32 * scale;
                }
            }
            return width.max(0.0);
        }

        // Non-ascii labels are rare enough that re-parsing the face is
        // acceptable.
        let Ok(face) = Face::parse(&self.data, self.index) else {
            return fallback_text_width(text, font_size);
        };
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            match face.glyph_index(ch) {
                Some(glyph_id) => {
                    let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                    width += advance as f32 * scale;
                }
                None => width += fallback,
            }
        }
        width.max(0.0)
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

// ── Label wrapping and node sizing ──────────────────────────────────

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

/// Greedy word wrap against the configured wrap width, using a width
/// function so callers can choose measured or pure char metrics.
fn wrap_label_with(text: &str, config: &LabelConfig, width_of: &dyn Fn(&str) -> f32) -> TextBlock {
    let mut lines: Vec<String> = Vec::new();
    for raw_line in text.split('\n') {
        let raw_line = raw_line.trim();
        if width_of(raw_line) <= config.wrap_width {
            lines.push(raw_line.to_string());
            continue;
        }
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if width_of(&candidate) > config.wrap_width && !current.is_empty() {
                lines.push(current);
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let width = lines.iter().map(|line| width_of(line)).fold(0.0, f32::max);
    let height = lines.len() as f32 * config.font_size * LINE_HEIGHT;
    TextBlock {
        lines,
        width,
        height,
    }
}

/// Turns a label and role into a node box. Implementations must be
/// pure so layout stays reproducible, and `Sync` so the per-cluster
/// stage can fan out.
pub trait NodeSizer: Sync {
    fn size(&self, label: &str, role: NodeRole) -> (f32, f32);
}

fn role_font_size(base: f32, role: NodeRole) -> f32 {
    match role {
        NodeRole::Category => base * 1.3,
        NodeRole::Subcategory => base * 1.15,
        NodeRole::Leaf => base,
    }
}

/// Font-backed sizer used by default.
pub struct FontSizer {
    config: LabelConfig,
}

impl FontSizer {
    pub fn new(config: &LabelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl NodeSizer for FontSizer {
    fn size(&self, label: &str, role: NodeRole) -> (f32, f32) {
        let font_size = role_font_size(self.config.font_size, role);
        let family = self.config.font_family.clone();
        let block = wrap_label_with(label, &self.config, &|line| {
            text_width(line, font_size, &family)
        });
        clamp_to_minimums(&self.config, block.width, block.height)
    }
}

/// Pure char-metric sizer. No font lookup, so tests and benches get
/// identical numbers on every machine.
pub struct CharMetricSizer {
    config: LabelConfig,
}

impl CharMetricSizer {
    pub fn new(config: &LabelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl NodeSizer for CharMetricSizer {
    fn size(&self, label: &str, role: NodeRole) -> (f32, f32) {
        let font_size = role_font_size(self.config.font_size, role);
        let block = wrap_label_with(label, &self.config, &|line| {
            fallback_text_width(line, font_size)
        });
        clamp_to_minimums(&self.config, block.width, block.height)
    }
}

fn clamp_to_minimums(config: &LabelConfig, width: f32, height: f32) -> (f32, f32) {
    (
        (width + 2.0 * config.padding_x).max(config.min_node_width),
        (height + 2.0 * config.padding_y).max(config.min_node_height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LabelConfig {
        LabelConfig::default()
    }

    #[test]
    fn empty_label_still_gets_minimum_box() {
        let sizer = CharMetricSizer::new(&config());
        let (width, height) = sizer.size("", NodeRole::Leaf);
        assert_eq!(width, config().min_node_width);
        assert_eq!(height, config().min_node_height);
    }

    #[test]
    fn wider_labels_produce_wider_boxes() {
        let sizer = CharMetricSizer::new(&config());
        let (short, _) = sizer.size("ab", NodeRole::Leaf);
        let (long, _) = sizer.size("a much longer label", NodeRole::Leaf);
        assert!(long > short);
    }

    #[test]
    fn long_labels_wrap_and_grow_taller() {
        let sizer = CharMetricSizer::new(&config());
        let (narrow_w, narrow_h) =
            sizer.size("one two three four five six seven eight nine ten", NodeRole::Leaf);
        let (_, single_h) = sizer.size("one", NodeRole::Leaf);
        assert!(narrow_w <= config().wrap_width + 2.0 * config().padding_x + 1.0);
        assert!(narrow_h > single_h);
    }

    #[test]
    fn headers_measure_larger_than_leaves() {
        let sizer = CharMetricSizer::new(&config());
        let (leaf, _) = sizer.size("identical label", NodeRole::Leaf);
        let (category, _) = sizer.size("identical label", NodeRole::Category);
        assert!(category > leaf);
    }

    #[test]
    fn fallback_width_scales_with_font_size() {
        let w14 = fallback_text_width("hello", 14.0);
        let w28 = fallback_text_width("hello", 28.0);
        assert!((w28 - w14 * 2.0).abs() < 0.01);
    }
}
