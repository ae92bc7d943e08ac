//! Track definitions.

use core::fmt;
use std::borrow::Borrow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{utility::UtilityId, Error, Result};

/// Unique track identifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl Borrow<str> for TrackId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single element of the track path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    /// Move the train marker to the given pixel.
    Advance(usize),
    /// Move the train marker and activate the referenced utilities.
    AdvanceAndTrigger(usize, Vec<UtilityId>),
}

impl PathStep {
    /// Returns the track pixel index of this step.
    pub fn index(&self) -> usize {
        match self {
            Self::Advance(index) | Self::AdvanceAndTrigger(index, _) => *index,
        }
    }

    /// Returns the utilities activated at this step.
    pub fn triggers(&self) -> &[UtilityId] {
        match self {
            Self::Advance(_) => &[],
            Self::AdvanceAndTrigger(_, utilities) => utilities,
        }
    }

    /// Decodes a step from its JSON shape.
    ///
    /// Accepted shapes are `34`, `[34, "util"]` and `[34, ["util_a", "util_b"]]`.
    fn from_value(value: &Value) -> core::result::Result<Self, String> {
        match value {
            Value::Number(_) => Self::decode_index(value).map(Self::Advance),
            Value::Array(items) => {
                let [index, refs] = items.as_slice() else {
                    return Err(format!(
                        "expected a two-element array, got {} elements",
                        items.len()
                    ));
                };

                let index = Self::decode_index(index)?;
                let refs = match refs {
                    Value::String(id) => vec![UtilityId(id.clone())],
                    Value::Array(ids) => ids
                        .iter()
                        .map(|id| {
                            id.as_str()
                                .map(UtilityId::from)
                                .ok_or_else(|| format!("utility reference {id} is not a string"))
                        })
                        .collect::<core::result::Result<Vec<_>, _>>()?,
                    other => return Err(format!("unexpected utility reference {other}")),
                };

                if refs.is_empty() {
                    return Err("utility reference list is empty".to_owned());
                }
                Ok(Self::AdvanceAndTrigger(index, refs))
            }
            other => Err(format!("unexpected step {other}")),
        }
    }

    fn decode_index(value: &Value) -> core::result::Result<usize, String> {
        value
            .as_u64()
            .and_then(|index| usize::try_from(index).ok())
            .ok_or_else(|| format!("pixel index {value} is not a non-negative integer"))
    }
}

/// Train path definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub path: Vec<PathStep>,
    /// Speed multiplier, always positive.
    pub speed: f64,
    /// Whether the animation re-enters the path after the last step.
    pub looping: bool,
}

#[derive(Deserialize)]
struct TrackDocument {
    id: TrackId,
    name: String,
    track_path: Vec<Value>,
    speed: f64,
    #[serde(rename = "loop", default = "default_looping")]
    looping: bool,
}

fn default_looping() -> bool {
    true
}

impl Track {
    /// Creates a looping track.
    pub fn new(id: impl Into<TrackId>, name: impl Into<String>, path: Vec<PathStep>, speed: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path,
            speed,
            looping: true,
        }
    }

    /// Parses a track JSON document.
    ///
    /// `origin` is used to describe the document in error messages.
    pub fn from_json(origin: impl fmt::Display, json: &str) -> Result<Self> {
        let document: TrackDocument =
            serde_json::from_str(json).map_err(|err| Error::json(&origin, err))?;

        let path = document
            .track_path
            .iter()
            .enumerate()
            .map(|(step, value)| {
                PathStep::from_value(value).map_err(|reason| Error::InvalidPathStep {
                    track: document.id.0.clone(),
                    step,
                    reason,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let track = Self {
            id: document.id,
            name: document.name,
            path,
            speed: document.speed,
            looping: document.looping,
        };
        track.validate()?;
        Ok(track)
    }

    /// Checks the track-local invariants.
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::EmptyTrack(self.id.0.clone()));
        }
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(Error::invalid_setting(
                "speed",
                format!("track {:?} has non-positive speed {}", self.id.0, self.speed),
            ));
        }
        Ok(())
    }

    /// Returns only the LED positions of the path, without the utility triggers.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.path.iter().map(PathStep::index)
    }

    /// Returns the total number of utility activations along the path.
    pub fn trigger_count(&self) -> usize {
        self.path.iter().map(|step| step.triggers().len()).sum()
    }
}
