//! Named color palette.

use std::collections::BTreeMap;

use smart_leds::RGB8;

use crate::{Error, Result};

/// Name of the reserved color used to extinguish pixels.
pub const OFF_COLOR: &str = "off";

/// Raw color table as it appears in the settings: `name -> [r, g, b, brightness]`.
pub type ColorTable = BTreeMap<String, (u8, u8, u8, f32)>;

/// A single palette entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorEntry {
    pub rgb: RGB8,
    /// Brightness scalar in `[0, 1]`.
    pub brightness: f32,
}

impl ColorEntry {
    /// Returns the color with its brightness applied to every channel.
    pub fn scaled(&self) -> RGB8 {
        let scale = |channel: u8| (f32::from(channel) * self.brightness) as u8;
        RGB8::new(scale(self.rgb.r), scale(self.rgb.g), scale(self.rgb.b))
    }
}

/// Immutable color lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: BTreeMap<String, ColorEntry>,
}

impl Palette {
    /// Builds a palette from the raw color table.
    ///
    /// The table must define the reserved [`OFF_COLOR`].
    pub fn new(table: &ColorTable) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (name, &(r, g, b, brightness)) in table {
            if !(0.0..=1.0).contains(&brightness) {
                return Err(Error::InvalidColor {
                    name: name.clone(),
                    reason: format!("brightness {brightness} is out of [0, 1]"),
                });
            }

            entries.insert(
                name.clone(),
                ColorEntry {
                    rgb: RGB8::new(r, g, b),
                    brightness,
                },
            );
        }

        if !entries.contains_key(OFF_COLOR) {
            return Err(Error::UnknownColor {
                name: OFF_COLOR.to_owned(),
                owner: "the engine".to_owned(),
            });
        }
        Ok(Self { entries })
    }

    /// Returns the palette entry with the given name.
    pub fn get(&self, name: &str) -> Option<&ColorEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolves a color name into the final pixel value.
    pub fn resolve(&self, name: &str) -> Result<RGB8> {
        self.get(name)
            .map(ColorEntry::scaled)
            .ok_or_else(|| Error::UnknownColor {
                name: name.to_owned(),
                owner: "the engine".to_owned(),
            })
    }

    /// Ensures the color exists, reporting `owner` as the referencing definition.
    pub fn check(&self, name: &str, owner: impl Into<String>) -> Result<()> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(Error::UnknownColor {
                name: name.to_owned(),
                owner: owner.into(),
            })
        }
    }

    /// The reserved "off" color.
    pub fn off(&self) -> RGB8 {
        self.entries
            .get(OFF_COLOR)
            .map(ColorEntry::scaled)
            .unwrap_or_default()
    }

    /// Iterates over the color names in alphabetical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Color table used when the settings do not provide one.
pub fn default_color_table() -> ColorTable {
    [
        (OFF_COLOR, (0, 0, 0, 0.0)),
        ("white", (255, 255, 255, 1.0)),
        ("red", (255, 0, 0, 1.0)),
        ("green", (0, 255, 0, 1.0)),
        ("yellow", (255, 200, 0, 1.0)),
        ("blue", (0, 0, 255, 1.0)),
        ("orange", (255, 100, 0, 1.0)),
    ]
    .into_iter()
    .map(|(name, color)| (name.to_owned(), color))
    .collect()
}
