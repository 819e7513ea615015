#![allow(missing_docs)]

use serde_json::{json, Map, Value};

use super::prints::{PrintError, PrintSet};
use crate::{
    fields::{
        format_hp_con, format_optional_number, number_to_value, parse_delimited_list,
        parse_number, HpCon,
    },
    models::{is_vehicle_type, Card, Extra, Print, TYPE_MOD},
    normalize::normalize,
};

/// Editable form fields, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Type,
    Rarity,
    SetName,
    CardNumber,
    VehicleTypes,
    Tags,
    HpCon,
    PitCost,
    ModBasePart,
    ModLevel1,
    ModLevel2,
    ModLevel3,
    ModLevel4,
    ImageUrl,
    Notes,
}

impl FormField {
    /// Every field, in display order.
    pub const ALL: [FormField; 16] = [
        FormField::Name,
        FormField::Type,
        FormField::Rarity,
        FormField::SetName,
        FormField::CardNumber,
        FormField::VehicleTypes,
        FormField::Tags,
        FormField::HpCon,
        FormField::PitCost,
        FormField::ModBasePart,
        FormField::ModLevel1,
        FormField::ModLevel2,
        FormField::ModLevel3,
        FormField::ModLevel4,
        FormField::ImageUrl,
        FormField::Notes,
    ];

    /// Label shown next to the input.
    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Type => "Type",
            FormField::Rarity => "Rarity",
            FormField::SetName => "New print set",
            FormField::CardNumber => "New print #",
            FormField::VehicleTypes => "Vehicle types",
            FormField::Tags => "Tags",
            FormField::HpCon => "HP/CON",
            FormField::PitCost => "Pit cost",
            FormField::ModBasePart => "Mod base part",
            FormField::ModLevel1 => "Mod level 1",
            FormField::ModLevel2 => "Mod level 2",
            FormField::ModLevel3 => "Mod level 3",
            FormField::ModLevel4 => "Mod level 4",
            FormField::ImageUrl => "Image URL",
            FormField::Notes => "Notes",
        }
    }

    /// Whether the field is shown for a card of `card_type`.
    pub fn applies_to(self, card_type: &str) -> bool {
        match self {
            FormField::HpCon | FormField::PitCost => is_vehicle_type(card_type.trim()),
            FormField::ModBasePart
            | FormField::ModLevel1
            | FormField::ModLevel2
            | FormField::ModLevel3
            | FormField::ModLevel4 => card_type.trim() == TYPE_MOD,
            _ => true,
        }
    }

    /// Fields visible for `card_type`.
    pub fn visible(card_type: &str) -> Vec<FormField> {
        Self::ALL
            .into_iter()
            .filter(|field| field.applies_to(card_type))
            .collect()
    }
}

/// Raw text of each form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardForm {
    pub name: String,
    pub card_type: String,
    pub rarity: String,
    pub set_name: String,
    pub card_number: String,
    pub vehicle_types: String,
    pub tags: String,
    pub hp_con: String,
    pub pit_cost: String,
    pub mod_base_part: String,
    pub mod_levels: [String; 4],
    pub image_url: String,
    pub notes: String,
}

impl CardForm {
    /// Current text of `field`.
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Type => &self.card_type,
            FormField::Rarity => &self.rarity,
            FormField::SetName => &self.set_name,
            FormField::CardNumber => &self.card_number,
            FormField::VehicleTypes => &self.vehicle_types,
            FormField::Tags => &self.tags,
            FormField::HpCon => &self.hp_con,
            FormField::PitCost => &self.pit_cost,
            FormField::ModBasePart => &self.mod_base_part,
            FormField::ModLevel1 => &self.mod_levels[0],
            FormField::ModLevel2 => &self.mod_levels[1],
            FormField::ModLevel3 => &self.mod_levels[2],
            FormField::ModLevel4 => &self.mod_levels[3],
            FormField::ImageUrl => &self.image_url,
            FormField::Notes => &self.notes,
        }
    }

    /// Replace the text of `field`.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::Name => &mut self.name,
            FormField::Type => &mut self.card_type,
            FormField::Rarity => &mut self.rarity,
            FormField::SetName => &mut self.set_name,
            FormField::CardNumber => &mut self.card_number,
            FormField::VehicleTypes => &mut self.vehicle_types,
            FormField::Tags => &mut self.tags,
            FormField::HpCon => &mut self.hp_con,
            FormField::PitCost => &mut self.pit_cost,
            FormField::ModBasePart => &mut self.mod_base_part,
            FormField::ModLevel1 => &mut self.mod_levels[0],
            FormField::ModLevel2 => &mut self.mod_levels[1],
            FormField::ModLevel3 => &mut self.mod_levels[2],
            FormField::ModLevel4 => &mut self.mod_levels[3],
            FormField::ImageUrl => &mut self.image_url,
            FormField::Notes => &mut self.notes,
        };
        *slot = value.into();
    }
}

/// Editing state for one card: the form inputs plus its prints.
///
/// Passed by reference to whatever renders or mutates it; nothing here is
/// global.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    id: Option<String>,
    /// Form inputs.
    pub form: CardForm,
    /// Prints being edited.
    pub prints: PrintSet,
}

impl EditSession {
    /// Blank session for a new card.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session pre-filled from an existing card.
    ///
    /// The set/number inputs start blank: they stage the next print to add,
    /// while the card's own prints live in [`EditSession::prints`].
    pub fn from_card(card: &Card) -> Self {
        let mut form = CardForm {
            name: card.name.clone(),
            card_type: card.card_type.clone(),
            rarity: card.rarity.clone(),
            vehicle_types: card.vehicle_types.join(", "),
            tags: card.tags.join(", "),
            image_url: card.image_url.clone(),
            notes: card.notes.clone(),
            ..CardForm::default()
        };
        match &card.extra {
            Extra::Mod(extra) => {
                form.mod_base_part = extra.base_part.clone();
                for (slot, level) in form.mod_levels.iter_mut().zip(extra.levels()) {
                    *slot = level.to_string();
                }
            }
            Extra::Vehicle(extra) => {
                form.hp_con = format_hp_con(&HpCon {
                    hp: extra.hp,
                    con: extra.con,
                });
                form.pit_cost = format_optional_number(extra.pit_cost, "");
            }
            Extra::None => {}
        }
        Self {
            id: Some(card.id.clone()),
            form,
            prints: PrintSet::from_prints(&card.prints),
        }
    }

    /// Id of the card being edited, `None` for a new card.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether this session will create a new card.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    /// Add a print from the set/number inputs and clear them on success.
    pub fn add_print_from_fields(&mut self) -> Result<Print, PrintError> {
        let print = self
            .prints
            .add(&self.form.set_name, &self.form.card_number)?
            .clone();
        self.form.set_name.clear();
        self.form.card_number.clear();
        Ok(print)
    }

    /// Raw card object built from the form, ready for the normalizer.
    pub fn collect(&self) -> Value {
        let card_type = self.form.card_type.trim();
        let mut extra = Map::new();
        if card_type == TYPE_MOD {
            extra.insert("modBasePart".into(), json!(self.form.mod_base_part));
            for (index, level) in self.form.mod_levels.iter().enumerate() {
                extra.insert(format!("modLevel{}", index + 1), json!(level));
            }
        } else if is_vehicle_type(card_type) {
            let hp_con = parse_form_hp_con(&self.form.hp_con);
            extra.insert("hp".into(), number_to_value(hp_con.hp));
            extra.insert("con".into(), number_to_value(hp_con.con));
            extra.insert(
                "pitCost".into(),
                number_to_value(parse_number(&self.form.pit_cost)),
            );
        }

        let prints: Vec<Value> = self
            .prints
            .as_slice()
            .iter()
            .map(|print| {
                json!({
                    "setName": print.set_name,
                    "cardNumber": print.card_number,
                    "isPrimary": print.is_primary,
                })
            })
            .collect();

        let mut raw = json!({
            "name": self.form.name,
            "type": card_type,
            "rarity": self.form.rarity,
            "setName": self.form.set_name,
            "cardNumber": self.form.card_number,
            "vehicleTypes": parse_delimited_list(&self.form.vehicle_types),
            "tags": parse_delimited_list(&self.form.tags),
            "imageUrl": self.form.image_url,
            "notes": self.form.notes,
            "extra": extra,
            "prints": prints,
        });
        if let Some(id) = &self.id {
            raw["id"] = json!(id);
        }
        raw
    }

    /// Normalized card for the current form state.
    pub fn finish(&self) -> Card {
        normalize(&self.collect())
    }
}

/// HP/CON as typed in the form, where a `?` half (as shown for a missing
/// value) stays absent instead of becoming `NaN`.
fn parse_form_hp_con(input: &str) -> HpCon {
    let half = |text: &str| {
        if text.trim() == "?" {
            None
        } else {
            parse_number(text)
        }
    };
    match input.split_once('/') {
        Some((left, right)) => HpCon {
            hp: half(left),
            con: half(right),
        },
        None => HpCon {
            hp: half(input),
            con: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VehicleExtra;
    use serde_json::json;

    fn taxi() -> Card {
        normalize(&json!({
            "id": "card_taxi",
            "name": "Taxi",
            "type": "Vehicle",
            "vehicleTypes": ["Car"],
            "extra": {"hp": 12, "pitCost": 2},
            "prints": [
                {"setId": "Core", "cardNumber": "007"},
                {"setId": "Promo", "cardNumber": "P1"}
            ]
        }))
    }

    #[test]
    fn loads_card_into_form() {
        let session = EditSession::from_card(&taxi());
        assert_eq!(session.id(), Some("card_taxi"));
        assert_eq!(session.form.hp_con, "12/?");
        assert_eq!(session.form.pit_cost, "2");
        assert_eq!(session.form.vehicle_types, "Car");
        assert_eq!(session.prints.len(), 2);
    }

    #[test]
    fn unedited_card_comes_back_unchanged() {
        let card = taxi();
        assert_eq!(EditSession::from_card(&card).finish(), card);
    }

    #[test]
    fn missing_con_stays_missing() {
        let card = normalize(&json!({"id": "card_van", "type": "Vehicle", "extra": {"hp": 12}}));
        let saved = EditSession::from_card(&card).finish();
        let extra = saved.extra.as_vehicle().expect("vehicle extra");
        assert_eq!(extra.hp, Some(12.0));
        assert_eq!(extra.con, None);

        let mut session = EditSession::from_card(&card);
        session.form.set(FormField::HpCon, "?/5");
        let extra = session.finish().extra;
        assert_eq!(extra.as_vehicle().map(|extra| (extra.hp, extra.con)), Some((None, Some(5.0))));
    }

    #[test]
    fn cleared_prints_stay_cleared() {
        let mut session = EditSession::from_card(&taxi());
        session.prints.clear();
        let saved = session.finish();
        assert!(saved.prints.is_empty());
        assert_eq!(saved.set_name, "");
        assert_eq!(saved.card_number, "");
    }

    #[test]
    fn loaded_card_starts_with_blank_print_inputs() {
        let mut session = EditSession::from_card(&taxi());
        assert_eq!(session.form.get(FormField::SetName), "");
        assert_eq!(session.add_print_from_fields(), Err(PrintError::Empty));
        assert_eq!(session.prints.len(), 2);

        session.prints.remove(0).unwrap();
        let saved = session.finish();
        assert_eq!(saved.prints, vec![Print::new("Promo", "P1", true)]);
    }

    #[test]
    fn editing_keeps_the_id_and_primary_print_wins() {
        let mut session = EditSession::from_card(&taxi());
        session.form.set(FormField::Name, "Night Taxi");
        session.prints.set_primary(1).unwrap();

        let card = session.finish();
        assert_eq!(card.id, "card_taxi");
        assert_eq!(card.name, "Night Taxi");
        assert_eq!(card.set_name, "Promo");
        assert_eq!(card.card_number, "P1");
        assert_eq!(card.prints[0], Print::new("Promo", "P1", true));
        assert_eq!(card.prints[1], Print::new("Core", "007", false));
    }

    #[test]
    fn new_card_collects_typed_extras() {
        let mut session = EditSession::new();
        session.form.set(FormField::Name, "Bus");
        session.form.set(FormField::Type, "Vehicle");
        session.form.set(FormField::HpCon, "20/oops");
        session.form.set(FormField::PitCost, "");
        session.form.set(FormField::Tags, "slow; big");
        session.form.set(FormField::SetName, "Core");
        session.form.set(FormField::CardNumber, "012");

        let card = session.finish();
        assert!(card.id.starts_with("card_"));
        assert_eq!(card.tags, vec!["slow", "big"]);
        assert_eq!(card.prints, vec![Print::new("Core", "012", true)]);
        let extra = card.extra.as_vehicle().expect("vehicle extra");
        assert_eq!(extra.hp, Some(20.0));
        assert!(extra.con.map(f64::is_nan).unwrap_or(false));
        assert_eq!(extra.pit_cost, None);
    }

    #[test]
    fn add_print_uses_and_clears_the_inputs() {
        let mut session = EditSession::new();
        assert_eq!(session.add_print_from_fields(), Err(PrintError::Empty));

        session.form.set(FormField::SetName, "Core");
        session.form.set(FormField::CardNumber, "7");
        let print = session.add_print_from_fields().unwrap();
        assert!(print.is_primary);
        assert_eq!(session.form.get(FormField::SetName), "");

        let card = session.finish();
        assert_eq!(card.set_name, "Core");
        assert_eq!(card.card_number, "7");
    }

    #[test]
    fn mod_fields_only_apply_to_mods() {
        let visible = FormField::visible("Mod");
        assert!(visible.contains(&FormField::ModLevel4));
        assert!(!visible.contains(&FormField::HpCon));

        let mut session = EditSession::new();
        session.form.set(FormField::Type, "Crew");
        session.form.set(FormField::HpCon, "3/3");
        assert_eq!(session.finish().extra, Extra::None);

        session.form.set(FormField::Type, "Named Vehicle");
        assert_eq!(
            session.finish().extra,
            Extra::Vehicle(VehicleExtra {
                hp: Some(3.0),
                con: Some(3.0),
                pit_cost: None
            })
        );
    }
}
