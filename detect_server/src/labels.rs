//! Class label dictionary.
//!
use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use image::Rgb;

use crate::hashed;

/// One entry of the class dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub color: Rgb<u8>,
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            color: color_for(name),
        }
    }
}

/// Class-id to label mapping loaded from a newline-delimited dictionary.
///
/// Line 0 of the dictionary is the reserved background label and is never
/// mapped; every other non-empty line maps its line number to a class name.
/// Class id 0 therefore never resolves, and detections carrying it are
/// dropped by the filter.
#[derive(Debug, Default)]
pub struct LabelMap {
    classes: HashMap<u32, Label>,
}

impl LabelMap {
    /// Load the dictionary from a text file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {}", path.display()))?;

        let map = Self::parse(&raw);
        log::info!("Loaded {} class labels from {}", map.len(), path.display());

        Ok(map)
    }

    /// Build the mapping from dictionary text.
    ///
    /// Stray "background" lines beyond line 0 leave their id unmapped
    /// instead of shifting the ids after them.
    pub fn parse(raw: &str) -> Self {
        let classes = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .filter(|(idx, line)| *idx > 0 && *line != "background")
            .map(|(idx, line)| (idx as u32, Label::new(line)))
            .collect();

        Self { classes }
    }

    /// Build a mapping from plain names, assigning ids 1.. in order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (idx as u32 + 1, Label::new(name.as_ref())))
            .collect();

        Self { classes }
    }

    /// Resolve a model class id to its label, if it maps to one.
    pub fn resolve(&self, class_id: i64) -> Option<&Label> {
        let id = u32::try_from(class_id).ok()?;
        self.classes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Derive a stable display color from a class name.
fn color_for(name: &str) -> Rgb<u8> {
    let hash = hashed(name);
    // Keep each channel off the darkest quarter so boxes stay visible on
    // typical footage.
    Rgb([
        (hash >> 16) as u8 | 0x40,
        (hash >> 8) as u8 | 0x40,
        hash as u8 | 0x40,
    ])
}
