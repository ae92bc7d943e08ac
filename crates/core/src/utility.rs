//! Utility light definitions.

use core::fmt;
use std::borrow::Borrow;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Unique utility identifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UtilityId(pub String);

impl fmt::Display for UtilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UtilityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl Borrow<str> for UtilityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single LED of the utility group and its "on" color.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UtilityLed {
    pub led: usize,
    pub color: String,
}

/// A group of utility LEDs sharing a single on/off state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Utility {
    pub id: UtilityId,
    pub name: String,
    /// The baseline state restored after a track run.
    pub enabled_on_init: bool,
    /// Whether the random trigger process may toggle this utility.
    pub is_random: bool,
    #[serde(rename = "utils")]
    pub leds: Vec<UtilityLed>,
}

impl Utility {
    /// Parses a utility JSON document.
    pub fn from_json(origin: impl fmt::Display, json: &str) -> Result<Self> {
        let utility: Self = serde_json::from_str(json).map_err(|err| Error::json(&origin, err))?;
        utility.validate()?;
        Ok(utility)
    }

    pub fn validate(&self) -> Result<()> {
        if self.leds.is_empty() {
            return Err(Error::EmptyUtility(self.id.0.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utility_from_json() {
        let utility = Utility::from_json(
            "inline",
            r#"{
                "id": "arrow_26",
                "name": "Arrow 26",
                "enabled_on_init": false,
                "is_random": true,
                "utils": [{"led": 26, "color": "white"}, {"led": 27, "color": "red"}]
            }"#,
        )
        .unwrap();

        assert_eq!(utility.id, UtilityId::from("arrow_26"));
        assert!(utility.is_random);
        assert_eq!(
            utility.leds,
            vec![
                UtilityLed {
                    led: 26,
                    color: "white".to_owned()
                },
                UtilityLed {
                    led: 27,
                    color: "red".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_utility_requires_leds() {
        let err = Utility::from_json(
            "inline",
            r#"{"id": "a", "name": "A", "enabled_on_init": true, "is_random": false, "utils": []}"#,
        )
        .unwrap_err();
        assert_eq!(err, Error::EmptyUtility("a".to_owned()));
    }

    #[test]
    fn test_utility_missing_field() {
        let err = Utility::from_json("utils/a.json", r#"{"id": "a", "name": "A", "utils": []}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
    }
}
