//! Keyboard layout generation.
//!
//! A layout is a flat, ordered list of key hitboxes produced from an anchor
//! point and a row template. Rows are staggered by a fixed per-row indent and
//! keys are laid out left to right with a constant gap, so wide keys push
//! their neighbours along instead of overlapping them.

use tracing::{debug, warn};

// ── Width classes ──────────────────────────────────────────

/// Width of a key as a multiple of the base key width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthClass {
    /// 1×, letters, digits and punctuation.
    Normal,
    /// 1.2×, Ctrl and Alt.
    Compact,
    /// 1.5×, Tab and Caps.
    Wide,
    /// 2×, Backspace, Enter and the 123 switch.
    Double,
    /// 2.5×, Shift.
    Shift,
    /// 6×, the space bar.
    Space,
}

impl WidthClass {
    /// Width class for a (trimmed) key label. Unknown labels are normal width.
    pub fn for_label(label: &str) -> Self {
        match label {
            "Space" => Self::Space,
            "Backspace" | "Enter" | "123" => Self::Double,
            "Shift" => Self::Shift,
            "Tab" | "Caps" => Self::Wide,
            "Ctrl" | "Alt" => Self::Compact,
            _ => Self::Normal,
        }
    }

    pub fn factor(&self) -> f32 {
        match self {
            Self::Normal => 1.0,
            Self::Compact => 1.2,
            Self::Wide => 1.5,
            Self::Double => 2.0,
            Self::Shift => 2.5,
            Self::Space => 6.0,
        }
    }
}

// ── Metrics ────────────────────────────────────────────────

/// Key geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyMetrics {
    /// Width of a normal key.
    pub key_width: f32,
    /// Height of every key.
    pub key_height: f32,
    /// Horizontal pitch; the gap between keys is `pitch_x - key_width`.
    pub pitch_x: f32,
    /// Vertical distance between row centers.
    pub pitch_y: f32,
}

impl Default for KeyMetrics {
    fn default() -> Self {
        Self {
            key_width: 60.0,
            key_height: 60.0,
            pitch_x: 75.0,
            pitch_y: 75.0,
        }
    }
}

impl KeyMetrics {
    /// Gap left between horizontally adjacent keys.
    pub fn gap(&self) -> f32 {
        self.pitch_x - self.key_width
    }
}

// ── Templates ──────────────────────────────────────────────

/// One row of raw key labels.
///
/// Raw labels may be padded with spaces as a visual width hint in the
/// template source; the padding is stripped and the width comes from
/// [`WidthClass::for_label`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowTemplate {
    /// Horizontal indent of the row, in units of `pitch_x`.
    pub indent: f32,
    pub labels: Vec<String>,
}

impl RowTemplate {
    pub fn new(indent: f32, labels: &[&str]) -> Self {
        Self {
            indent,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Built-in row sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTemplate {
    /// Compact air keyboard: ESC and digits, three letter rows, 123 and Space.
    Classic,
    /// Full QWERTY with punctuation and modifier keys.
    Full,
}

impl LayoutTemplate {
    /// String representation for IPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "classic" => Some(Self::Classic),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    /// Key geometry the template was drawn for.
    pub fn default_metrics(&self) -> KeyMetrics {
        match self {
            Self::Classic => KeyMetrics::default(),
            Self::Full => KeyMetrics {
                key_width: 50.0,
                key_height: 50.0,
                pitch_x: 60.0,
                pitch_y: 60.0,
            },
        }
    }

    pub fn rows(&self) -> Vec<RowTemplate> {
        match self {
            Self::Classic => vec![
                RowTemplate::new(
                    0.0,
                    &["ESC", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "Backspace"],
                ),
                RowTemplate::new(0.5, &["Q", "W", "E", "R", "T", "Y", "U", "I", "O", "P"]),
                RowTemplate::new(
                    1.0,
                    &["A", "S", "D", "F", "G", "H", "J", "K", "L", "Enter"],
                ),
                RowTemplate::new(1.5, &["Z", "X", "C", "V", "B", "N", "M"]),
                RowTemplate::new(1.0, &["    123   ", "           Space           "]),
            ],
            Self::Full => vec![
                RowTemplate::new(
                    0.0,
                    &[
                        "`", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "-", "=",
                        "Backspace",
                    ],
                ),
                RowTemplate::new(
                    0.5,
                    &[
                        "Tab", "Q", "W", "E", "R", "T", "Y", "U", "I", "O", "P", "[", "]", "\\",
                    ],
                ),
                RowTemplate::new(
                    1.0,
                    &[
                        "Caps", "A", "S", "D", "F", "G", "H", "J", "K", "L", ";", "'", "Enter",
                    ],
                ),
                RowTemplate::new(
                    1.5,
                    &["Shift", "Z", "X", "C", "V", "B", "N", "M", ",", ".", "/"],
                ),
                RowTemplate::new(2.0, &["Ctrl", "Alt", "Space", "ESC"]),
            ],
        }
    }
}

// ── Key spec ───────────────────────────────────────────────

/// A placed key: label plus an axis-aligned box given by center and size.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySpec {
    pub label: String,
    /// Center x in pixels.
    pub x: f32,
    /// Center y in pixels.
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl KeySpec {
    /// Left edge of the key box.
    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    /// Top edge of the key box.
    pub fn top(&self) -> f32 {
        self.y - self.height / 2.0
    }

    /// Whether the open boxes of `self` and `other` share any area.
    pub fn overlaps(&self, other: &KeySpec) -> bool {
        (self.x - other.x).abs() < (self.width + other.width) / 2.0
            && (self.y - other.y).abs() < (self.height + other.height) / 2.0
    }
}

// ── Layout ─────────────────────────────────────────────────

/// Generated key set, in insertion order (row-major, left to right).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    keys: Vec<KeySpec>,
}

impl Layout {
    /// Lay out `rows` with the first row's left edge at `anchor_x` and its
    /// center line at `anchor_y`.
    pub fn generate(
        anchor_x: f32,
        anchor_y: f32,
        rows: &[RowTemplate],
        metrics: &KeyMetrics,
    ) -> Self {
        let mut keys: Vec<KeySpec> = Vec::new();

        for (row_idx, row) in rows.iter().enumerate() {
            let y = anchor_y + row_idx as f32 * metrics.pitch_y;
            let mut cursor = anchor_x + row.indent * metrics.pitch_x;

            for raw in &row.labels {
                let label = raw.trim();
                let width = metrics.key_width * WidthClass::for_label(label).factor();

                if keys.iter().any(|k| k.label == label) {
                    warn!("Layout: duplicate key label {:?} in row {}, skipped", label, row_idx);
                } else {
                    keys.push(KeySpec {
                        label: label.to_string(),
                        x: cursor + width / 2.0,
                        y,
                        width,
                        height: metrics.key_height,
                    });
                }

                cursor += width + metrics.gap();
            }
        }

        debug!(
            "Layout generated: {} keys at ({:.0}, {:.0})",
            keys.len(),
            anchor_x,
            anchor_y
        );
        Self { keys }
    }

    /// Generate from a built-in template.
    pub fn from_template(
        anchor_x: f32,
        anchor_y: f32,
        template: LayoutTemplate,
        metrics: &KeyMetrics,
    ) -> Self {
        Self::generate(anchor_x, anchor_y, &template.rows(), metrics)
    }

    pub fn keys(&self) -> &[KeySpec] {
        &self.keys
    }

    pub fn get(&self, label: &str) -> Option<&KeySpec> {
        self.keys.iter().find(|k| k.label == label)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Label pairs whose boxes overlap. A well-formed layout returns nothing.
    pub fn overlaps(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (i, a) in self.keys.iter().enumerate() {
            for b in &self.keys[i + 1..] {
                if a.overlaps(b) {
                    pairs.push((a.label.clone(), b.label.clone()));
                }
            }
        }
        pairs
    }
}

// ── Tests ──────────────────────────────────────────────────
