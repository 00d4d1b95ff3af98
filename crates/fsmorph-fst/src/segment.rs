// Segmentation units: language-declared atomic input symbols.
//
// A language may declare multi-character graphemes (digraphs,
// trigraphs, romanized ejectives like "ch'") as single symbols. Input
// strings are segmented greedily, longest registered unit first;
// characters with no registered unit fall back to single-char units.

use hashbrown::HashMap;

/// The set of registered multi-character units, indexed by first
/// character with longer candidates tried first.
#[derive(Clone, Debug, Default)]
pub struct SegmentationUnits {
    by_first: HashMap<char, Vec<String>>,
}

impl SegmentationUnits {
    /// Register units. Single-character units are redundant (every
    /// character is already a unit) but harmless.
    pub fn new<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_first: HashMap<char, Vec<String>> = HashMap::new();
        for unit in units {
            let unit = unit.into();
            let Some(first) = unit.chars().next() else {
                continue;
            };
            if unit.chars().count() > 1 {
                by_first.entry(first).or_default().push(unit);
            }
        }
        for candidates in by_first.values_mut() {
            candidates.sort_by_key(|u| std::cmp::Reverse(u.len()));
        }
        SegmentationUnits { by_first }
    }

    /// No multi-character units: every character is its own unit.
    pub fn none() -> Self {
        SegmentationUnits::default()
    }

    /// Split a string into segmentation units, greedy longest match.
    pub fn segment(&self, s: &str) -> Vec<String> {
        let mut units = Vec::new();
        let mut rest = s;
        'outer: while let Some(first) = rest.chars().next() {
            if let Some(candidates) = self.by_first.get(&first) {
                for candidate in candidates {
                    if let Some(tail) = rest.strip_prefix(candidate.as_str()) {
                        units.push(candidate.clone());
                        rest = tail;
                        continue 'outer;
                    }
                }
            }
            let char_len = first.len_utf8();
            units.push(rest[..char_len].to_string());
            rest = &rest[char_len..];
        }
        units
    }
}
