//! Detector class labels to Arabic graphemes.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::{Arc, LazyLock},
};

use crate::{CharacterDetection, Error, MappingError, Result};

const EGYPTIAN_SYMBOLS: &[(&str, char)] = &[
    ("a", '\u{0623}'),
    ("b", '\u{0628}'),
    ("kk", '\u{0642}'),
    ("ss", '\u{0635}'),
    ("s", '\u{0633}'),
    ("tt", '\u{0637}'),
    ("o", '\u{0639}'),
    ("l", '\u{0644}'),
    ("r", '\u{0631}'),
    ("n", '\u{0646}'),
    ("m", '\u{0645}'),
    ("00", '\u{0647}'),
    ("w", '\u{0648}'),
    ("y", '\u{0649}'),
    ("g", '\u{062C}'),
    ("d", '\u{062F}'),
    ("f", '\u{0641}'),
    ("1", '\u{0661}'),
    ("2", '\u{0662}'),
    ("3", '\u{0663}'),
    ("4", '\u{0664}'),
    ("5", '\u{0665}'),
    ("6", '\u{0666}'),
    ("7", '\u{0667}'),
    ("8", '\u{0668}'),
    ("9", '\u{0669}'),
    ("0", '\u{0660}'),
];

static EGYPTIAN: LazyLock<Arc<SymbolMap>> = LazyLock::new(|| {
    Arc::new(
        SymbolMap::new(EGYPTIAN_SYMBOLS.iter().copied())
            .expect("built-in Egyptian symbol table is injective"),
    )
});

/// Injective mapping from class label to grapheme. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMap {
    symbols: BTreeMap<String, char>,
}

impl SymbolMap {
    pub fn new<L: Into<String>>(pairs: impl IntoIterator<Item = (L, char)>) -> Result<Self> {
        let mut symbols = BTreeMap::new();
        let mut owners = BTreeMap::<char, String>::new();
        for (label, grapheme) in pairs {
            let label = label.into();
            if grapheme.is_whitespace() {
                return Err(Error::Config(format!(
                    "label `{label}` is mapped to a whitespace grapheme"
                )));
            }
            match symbols.entry(label.clone()) {
                Entry::Occupied(entry) if *entry.get() != grapheme => {
                    return Err(Error::Config(format!(
                        "label `{label}` is mapped to both `{}` and `{grapheme}`",
                        entry.get()
                    )));
                }
                Entry::Occupied(_) => continue,
                Entry::Vacant(entry) => {
                    entry.insert(grapheme);
                }
            }
            if let Some(first) = owners.insert(grapheme, label.clone()) {
                return Err(Error::DuplicateGrapheme {
                    first,
                    second: label,
                    grapheme,
                });
            }
        }
        Ok(Self { symbols })
    }

    /// The shared table for Egyptian plates, built on first use.
    pub fn egyptian() -> Arc<SymbolMap> {
        Arc::clone(&EGYPTIAN)
    }

    pub fn get(&self, label: &str) -> Option<char> {
        self.symbols.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, char)> {
        self.symbols.iter().map(|(label, grapheme)| (label.as_str(), *grapheme))
    }

    /// Maps the detections at `order`, in that order. Unknown labels are dropped and reported.
    pub fn map_sequence(
        &self,
        detections: &[CharacterDetection],
        order: &[usize],
    ) -> (Vec<(usize, char)>, Vec<MappingError>) {
        let mut mapped = Vec::with_capacity(order.len());
        let mut errors = Vec::new();
        for &index in order {
            let label = &detections[index].label;
            match self.get(label) {
                Some(grapheme) => mapped.push((index, grapheme)),
                None => {
                    let error = MappingError {
                        index,
                        label: label.clone(),
                    };
                    log::warn!("Dropping detection: {error}");
                    errors.push(error);
                }
            }
        }
        (mapped, errors)
    }
}

pub fn is_digit(grapheme: char) -> bool {
    grapheme.is_numeric()
}
