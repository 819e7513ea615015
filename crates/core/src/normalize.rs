//! Conversion of arbitrary raw card records into canonical [`Card`]s.
//!
//! Every input path (the JSON data file, bulk rows, the editor form and the
//! local cache) funnels through [`normalize`]. It never fails: missing or
//! malformed fields fall back to empty values. After it runs, the prints list
//! is primary-first with exactly one primary entry, and the flat
//! `setName`/`cardNumber` fields are copies of that primary print.

use rand::Rng;
use serde_json::{Map, Value};

use crate::{
    fields::parse_number,
    models::{is_vehicle_type, Card, Extra, ModExtra, Print, VehicleExtra, TYPE_MOD},
};

const ID_PREFIX: &str = "card_";
const ID_SUFFIX_LEN: usize = 8;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Build a canonical card from any JSON value.
pub fn normalize(raw: &Value) -> Card {
    let card_type = text(raw.get("type")).trim().to_string();
    let extra = extract_extra(&card_type, raw.get("extra").and_then(Value::as_object));

    let mut prints = extract_prints(raw);
    let mut set_name = first_text(raw, &["setName", "setId"]);
    let mut card_number = first_text(raw, &["cardNumber", "cardNo"]);

    if prints.is_empty() && (!set_name.is_empty() || !card_number.is_empty()) {
        prints.push(Print::new(set_name.clone(), card_number.clone(), true));
    }

    promote_primary(&mut prints);
    if let Some(primary) = prints.first() {
        set_name = primary.set_name.clone();
        card_number = primary.card_number.clone();
    }

    let id = match raw.get("id") {
        Some(value) if truthy(Some(value)) && !text(Some(value)).trim().is_empty() => {
            text(Some(value)).trim().to_string()
        }
        _ => generate_id(),
    };

    Card {
        id,
        name: text(raw.get("name")).trim().to_string(),
        card_type,
        rarity: text(raw.get("rarity")).trim().to_string(),
        set_name,
        card_number,
        vehicle_types: string_list(raw.get("vehicleTypes")),
        tags: string_list(raw.get("tags")),
        image_url: text(raw.get("imageUrl")).trim().to_string(),
        notes: text(raw.get("notes")),
        extra,
        prints,
    }
}

/// Fresh `card_` id with a random base36 suffix.
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{ID_PREFIX}{suffix}")
}

/// Leave exactly one primary print (the first claimant, else the first entry)
/// and move it to the front.
fn promote_primary(prints: &mut Vec<Print>) {
    if prints.is_empty() {
        return;
    }
    let primary = prints.iter().position(|print| print.is_primary).unwrap_or(0);
    for (index, print) in prints.iter_mut().enumerate() {
        print.is_primary = index == primary;
    }
    if primary != 0 {
        let print = prints.remove(primary);
        prints.insert(0, print);
    }
}

fn extract_prints(raw: &Value) -> Vec<Print> {
    let Some(entries) = raw.get("prints").and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let set_name = first_text(entry, &["setName", "setId"]);
            let card_number = first_text(entry, &["cardNumber"]);
            if set_name.is_empty() && card_number.is_empty() {
                return None;
            }
            Some(Print::new(set_name, card_number, truthy(entry.get("isPrimary"))))
        })
        .collect()
}

fn extract_extra(card_type: &str, extra: Option<&Map<String, Value>>) -> Extra {
    let field = |key: &str| extra.and_then(|map| map.get(key));
    if card_type == TYPE_MOD {
        Extra::Mod(ModExtra {
            base_part: text(field("modBasePart")),
            level1: text(field("modLevel1")),
            level2: text(field("modLevel2")),
            level3: text(field("modLevel3")),
            level4: text(field("modLevel4")),
        })
    } else if is_vehicle_type(card_type) {
        Extra::Vehicle(VehicleExtra {
            hp: number(field("hp")),
            con: number(field("con")),
            pit_cost: number(field("pitCost")),
        })
    } else {
        Extra::None
    }
}

/// Loose string coercion: strings as-is, scalars by their JSON text.
pub(crate) fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        Some(Value::Bool(value)) => value.to_string(),
        _ => String::new(),
    }
}

/// First key holding non-blank text, trimmed.
fn first_text(raw: &Value, keys: &[&str]) -> String {
    keys.iter()
        .map(|key| text(raw.get(*key)).trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number
            .as_f64()
            .map(|n| n != 0.0 && !n.is_nan())
            .unwrap_or(true),
        Some(Value::String(value)) => !value.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(value)) => parse_number(value),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(scalar) => vec![scalar],
    };
    items
        .into_iter()
        .map(|item| text(Some(item)).trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_prints_become_primary() {
        let card = normalize(&json!({
            "name": "Taxi",
            "prints": [{"setId": "Core", "cardNumber": "007"}]
        }));

        assert_eq!(card.set_name, "Core");
        assert_eq!(card.card_number, "007");
        assert_eq!(card.prints, vec![Print::new("Core", "007", true)]);
    }

    #[test]
    fn flat_fields_synthesize_a_print() {
        let card = normalize(&json!({"name": "Bus", "setName": "Core", "cardNumber": "012"}));
        assert_eq!(card.prints, vec![Print::new("Core", "012", true)]);
    }

    #[test]
    fn legacy_aliases_are_read() {
        let card = normalize(&json!({"name": "Van", "setId": " Promo ", "cardNo": 3}));
        assert_eq!(card.set_name, "Promo");
        assert_eq!(card.card_number, "3");
        assert_eq!(card.prints, vec![Print::new("Promo", "3", true)]);
    }

    #[test]
    fn primary_print_wins_over_flat_fields() {
        let card = normalize(&json!({
            "name": "Taxi",
            "setName": "Old",
            "cardNumber": "001",
            "prints": [
                {"setName": "Core", "cardNumber": "007"},
                {"setName": "Promo", "cardNumber": "P1", "isPrimary": true}
            ]
        }));

        assert_eq!(card.set_name, "Promo");
        assert_eq!(card.card_number, "P1");
        assert_eq!(
            card.prints,
            vec![
                Print::new("Promo", "P1", true),
                Print::new("Core", "007", false)
            ]
        );
    }

    #[test]
    fn only_first_claimed_primary_survives() {
        let card = normalize(&json!({
            "prints": [
                {"setName": "A", "cardNumber": "1"},
                {"setName": "B", "cardNumber": "2", "isPrimary": "yes"},
                {"setName": "C", "cardNumber": "3", "isPrimary": 1}
            ]
        }));

        let primaries: Vec<_> = card.prints.iter().filter(|p| p.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(card.prints[0].set_name, "B");
        assert_eq!(card.set_name, "B");
    }

    #[test]
    fn blank_prints_and_non_array_prints_are_dropped() {
        let card = normalize(&json!({
            "prints": [{"setName": "  ", "cardNumber": ""}, {"cardNumber": " 9 "}]
        }));
        assert_eq!(card.prints, vec![Print::new("", "9", true)]);
        assert_eq!(card.card_number, "9");

        let card = normalize(&json!({"prints": {"setName": "Core"}}));
        assert!(card.prints.is_empty());
        assert_eq!(card.set_name, "");
    }

    #[test]
    fn existing_id_is_kept_and_missing_id_is_generated() {
        let card = normalize(&json!({"id": "card_fixed", "name": "Taxi"}));
        assert_eq!(card.id, "card_fixed");

        let fresh = normalize(&json!({"name": "Taxi"}));
        assert!(fresh.id.starts_with("card_"));
        assert_eq!(fresh.id.len(), "card_".len() + 8);
        assert!(fresh.id["card_".len()..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));

        let blank = normalize(&json!({"id": "", "name": "Taxi"}));
        assert_ne!(blank.id, "");
    }

    #[test]
    fn lists_are_coerced() {
        let card = normalize(&json!({
            "vehicleTypes": "Car",
            "tags": [" fast ", "", 7, null]
        }));
        assert_eq!(card.vehicle_types, vec!["Car"]);
        assert_eq!(card.tags, vec!["fast", "7"]);

        let card = normalize(&json!({"name": "Nothing"}));
        assert!(card.vehicle_types.is_empty());
        assert!(card.tags.is_empty());
    }

    #[test]
    fn extras_follow_the_card_type() {
        let vehicle = normalize(&json!({
            "type": "Named Vehicle",
            "extra": {"hp": 12, "con": "4", "pitCost": "soon", "modBasePart": "ignored"}
        }));
        let extra = vehicle.extra.as_vehicle().expect("vehicle extra");
        assert_eq!(extra.hp, Some(12.0));
        assert_eq!(extra.con, Some(4.0));
        assert!(extra.pit_cost.map(f64::is_nan).unwrap_or(false));

        let module = normalize(&json!({
            "type": "Mod",
            "extra": {"modBasePart": "Engine", "modLevel2": "+1 speed"}
        }));
        let extra = module.extra.as_mod().expect("mod extra");
        assert_eq!(extra.base_part, "Engine");
        assert_eq!(extra.levels(), ["", "+1 speed", "", ""]);

        let crew = normalize(&json!({"type": "Crew", "extra": {"hp": 3}}));
        assert_eq!(crew.extra, Extra::None);
    }

    #[test]
    fn non_object_input_still_yields_a_card() {
        let card = normalize(&json!("not a card"));
        assert_eq!(card.name, "");
        assert!(card.prints.is_empty());
        assert!(card.id.starts_with("card_"));
    }

    #[test]
    fn card_deserializes_through_the_normalizer() {
        let card: Card = serde_json::from_value(json!({
            "id": "card_taxi",
            "name": "Taxi",
            "setName": "Core",
            "cardNumber": "007"
        }))
        .unwrap();
        assert_eq!(card.prints, vec![Print::new("Core", "007", true)]);
    }
}
