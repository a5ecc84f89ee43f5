//! The semantic gap input record.
//!
//! A [`Gap`] describes the relationship between two entities: how similar
//! they are, how far apart they sit, where the midpoint lies in a 2D
//! layout, and which textual links they share. The engine consumes gaps
//! read-only; every musical parameter of a piece derives from these
//! fields.

use serde::{Deserialize, Serialize};

/// One endpoint of a gap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapEndpoint {
    /// Human-readable title, used only for naming exported files.
    pub title: String,
}

/// A semantic gap between two entities.
///
/// Records typically arrive as JSON with camelCase keys
/// (`semanticSimilarity`, `sharedLinks`, ...); field renaming maps them
/// onto the snake_case fields here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    /// Stable identifier, used as the melody seed when no links are shared.
    pub id: String,

    /// Similarity score, expected in [0, 1]. May be non-finite; the
    /// normalizer substitutes a default.
    pub semantic_similarity: f64,

    /// Distance metric, non-negative. May be non-finite; the normalizer
    /// substitutes a default.
    pub distance: f64,

    /// Midpoint (x, y) in layout space. Used directly as scale-index
    /// offsets, so negative and fractional values are meaningful.
    pub center: [f64; 2],

    /// Links shared by both endpoints, concatenated in order to seed the
    /// melody.
    #[serde(default)]
    pub shared_links: Vec<String>,

    /// Source endpoint.
    pub from: GapEndpoint,

    /// Target endpoint.
    pub to: GapEndpoint,
}

impl Gap {
    /// Returns the melody seed as UTF-16 code units.
    ///
    /// The seed string is the in-order concatenation of `shared_links`,
    /// falling back to `id` when no links are shared. Code units rather
    /// than scalar values keep the mapping stable for records produced by
    /// UTF-16 hosts.
    pub fn seed_units(&self) -> Vec<u16> {
        if self.shared_links.is_empty() {
            self.id.encode_utf16().collect()
        } else {
            self.shared_links
                .iter()
                .flat_map(|link| link.encode_utf16())
                .collect()
        }
    }
}
