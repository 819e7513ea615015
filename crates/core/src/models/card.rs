#![allow(missing_docs)]

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{fields::number_to_value, normalize::normalize};

/// Card type whose extras describe a mod.
pub const TYPE_MOD: &str = "Mod";
/// Card type whose extras carry HP/CON and pit cost.
pub const TYPE_VEHICLE: &str = "Vehicle";
/// Named variant of [`TYPE_VEHICLE`], sharing its extras.
pub const TYPE_NAMED_VEHICLE: &str = "Named Vehicle";

/// One physical printing of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Print {
    /// Set the card was printed in.
    #[serde(default)]
    pub set_name: String,
    /// Collector number inside the set.
    #[serde(default)]
    pub card_number: String,
    /// Whether this print feeds the flat `setName`/`cardNumber` fields.
    #[serde(default)]
    pub is_primary: bool,
}

impl Print {
    /// Build a print from already trimmed fields.
    pub fn new(set_name: impl Into<String>, card_number: impl Into<String>, is_primary: bool) -> Self {
        Self {
            set_name: set_name.into(),
            card_number: card_number.into(),
            is_primary,
        }
    }

    /// Short `SET #NUM` label used by list views.
    pub fn label(&self) -> String {
        match (self.set_name.is_empty(), self.card_number.is_empty()) {
            (false, false) => format!("{} #{}", self.set_name, self.card_number),
            (false, true) => self.set_name.clone(),
            (true, false) => format!("#{}", self.card_number),
            (true, true) => String::new(),
        }
    }
}

/// Mod-specific attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModExtra {
    pub base_part: String,
    pub level1: String,
    pub level2: String,
    pub level3: String,
    pub level4: String,
}

impl ModExtra {
    /// Levels in order, for display.
    pub fn levels(&self) -> [&str; 4] {
        [&self.level1, &self.level2, &self.level3, &self.level4]
    }
}

/// Vehicle attributes. `None` means the value was never given; `NaN` is kept
/// when the source text was not numeric, and serializes as the text `"NaN"`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VehicleExtra {
    pub hp: Option<f64>,
    pub con: Option<f64>,
    pub pit_cost: Option<f64>,
}

/// Type-dependent supplementary attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Extra {
    Mod(ModExtra),
    Vehicle(VehicleExtra),
    #[default]
    None,
}

impl Extra {
    /// Mod extras, if this is a mod card.
    pub fn as_mod(&self) -> Option<&ModExtra> {
        match self {
            Extra::Mod(extra) => Some(extra),
            _ => None,
        }
    }

    /// Vehicle extras, if this is a vehicle card.
    pub fn as_vehicle(&self) -> Option<&VehicleExtra> {
        match self {
            Extra::Vehicle(extra) => Some(extra),
            _ => None,
        }
    }
}

impl Serialize for Extra {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Extra::Mod(extra) => {
                let mut map = serializer.serialize_map(Some(5))?;
                map.serialize_entry("modBasePart", &extra.base_part)?;
                map.serialize_entry("modLevel1", &extra.level1)?;
                map.serialize_entry("modLevel2", &extra.level2)?;
                map.serialize_entry("modLevel3", &extra.level3)?;
                map.serialize_entry("modLevel4", &extra.level4)?;
                map.end()
            }
            Extra::Vehicle(extra) => {
                let fields = [("hp", extra.hp), ("con", extra.con), ("pitCost", extra.pit_cost)];
                let present = fields.iter().filter(|(_, value)| value.is_some()).count();
                let mut map = serializer.serialize_map(Some(present))?;
                for (key, value) in fields {
                    if let Some(value) = value {
                        map.serialize_entry(key, &number_to_value(Some(value)))?;
                    }
                }
                map.end()
            }
            Extra::None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// Returns true for the types that carry [`VehicleExtra`].
pub fn is_vehicle_type(card_type: &str) -> bool {
    card_type == TYPE_VEHICLE || card_type == TYPE_NAMED_VEHICLE
}

/// Canonical card definition.
///
/// `set_name`/`card_number` mirror the primary print and are never edited on
/// their own. Deserializing goes through [`normalize`], so any JSON object
/// yields a valid card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub rarity: String,
    pub set_name: String,
    pub card_number: String,
    pub vehicle_types: Vec<String>,
    pub tags: Vec<String>,
    pub image_url: String,
    pub notes: String,
    pub extra: Extra,
    pub prints: Vec<Print>,
}

impl Card {
    /// The primary print, which is always first once normalized.
    pub fn primary_print(&self) -> Option<&Print> {
        self.prints.first()
    }

    /// Whether `(name, type)` identifies this card.
    pub fn same_identity(&self, name: &str, card_type: &str) -> bool {
        self.name == name && self.card_type == card_type
    }

    /// Name for list views, with a placeholder for unnamed cards.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "(unnamed)"
        } else {
            &self.name
        }
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(normalize(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vehicle_extra_omits_missing_numbers() {
        let extra = Extra::Vehicle(VehicleExtra {
            hp: Some(12.0),
            con: None,
            pit_cost: Some(3.0),
        });
        assert_eq!(serde_json::to_value(&extra).unwrap(), json!({"hp": 12.0, "pitCost": 3.0}));
    }

    #[test]
    fn non_numeric_vehicle_values_survive_a_reload() {
        let extra = Extra::Vehicle(VehicleExtra {
            hp: Some(f64::NAN),
            con: None,
            pit_cost: Some(2.0),
        });
        let value = serde_json::to_value(&extra).unwrap();
        assert_eq!(value, json!({"hp": "NaN", "pitCost": 2.0}));

        let card: Card = serde_json::from_value(json!({"type": "Vehicle", "extra": value})).unwrap();
        let reloaded = card.extra.as_vehicle().unwrap();
        assert!(reloaded.hp.map(f64::is_nan).unwrap_or(false));
        assert_eq!(reloaded.con, None);
    }

    #[test]
    fn empty_extra_is_an_empty_object() {
        assert_eq!(serde_json::to_value(Extra::None).unwrap(), json!({}));
    }

    #[test]
    fn print_labels() {
        assert_eq!(Print::new("Core", "007", true).label(), "Core #007");
        assert_eq!(Print::new("", "007", true).label(), "#007");
        assert_eq!(Print::new("Core", "", false).label(), "Core");
    }
}
