//! Conversion of canonical cards back into the on-disk `drive-card.json` shape.

use serde_json::{json, Value};

use crate::models::Card;

/// Owned JSON copy of `card` in the legacy file format: prints are written as
/// `{setId, cardNumber}` and lose their primary flag (the first print is the
/// primary one).
pub fn serialize_for_export(card: &Card) -> Value {
    let prints: Vec<Value> = card
        .prints
        .iter()
        .map(|print| json!({"setId": print.set_name, "cardNumber": print.card_number}))
        .collect();

    json!({
        "id": card.id,
        "name": card.name,
        "type": card.card_type,
        "rarity": card.rarity,
        "setName": card.set_name,
        "cardNumber": card.card_number,
        "vehicleTypes": card.vehicle_types,
        "tags": card.tags,
        "imageUrl": card.image_url,
        "notes": card.notes,
        "extra": card.extra,
        "prints": prints,
    })
}

/// Export every card, preserving order.
pub fn export_cards<'a>(cards: impl IntoIterator<Item = &'a Card>) -> Value {
    Value::Array(cards.into_iter().map(serialize_for_export).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn prints_use_legacy_keys() {
        let raw = json!({
            "id": "card_taxi",
            "name": "Taxi",
            "prints": [
                {"setId": "Core", "cardNumber": "007"},
                {"setId": "Promo", "cardNumber": "P1"}
            ]
        });
        let exported = serialize_for_export(&normalize(&raw));

        assert_eq!(exported["prints"], raw["prints"]);
        assert_eq!(exported["setName"], "Core");
        assert_eq!(exported["id"], "card_taxi");
    }

    #[test]
    fn primary_print_is_exported_first() {
        let card = normalize(&json!({
            "prints": [
                {"setName": "Core", "cardNumber": "007"},
                {"setName": "Promo", "cardNumber": "P1", "isPrimary": true}
            ]
        }));
        let exported = serialize_for_export(&card);
        assert_eq!(exported["prints"][0], json!({"setId": "Promo", "cardNumber": "P1"}));
    }

    #[test]
    fn exported_value_is_detached_from_the_card() {
        let card = normalize(&json!({"name": "Bus", "setName": "Core", "cardNumber": "012"}));
        let mut exported = serialize_for_export(&card);
        exported["prints"][0]["setId"] = json!("Changed");
        exported["name"] = json!("Changed");

        assert_eq!(card.name, "Bus");
        assert_eq!(card.prints[0].set_name, "Core");
    }

    #[test]
    fn extras_are_flat_objects() {
        let card = normalize(&json!({
            "type": "Vehicle",
            "extra": {"hp": 12, "con": "nope"}
        }));
        let exported = serialize_for_export(&card);
        assert_eq!(exported["extra"]["hp"], 12.0);
        assert_eq!(exported["extra"]["con"], "NaN");
        let reloaded = normalize(&exported);
        let con = reloaded.extra.as_vehicle().and_then(|extra| extra.con);
        assert!(con.map(f64::is_nan).unwrap_or(false));
        assert!(exported["extra"].get("pitCost").is_none());

        let exported = export_cards([&card, &card]);
        assert_eq!(exported.as_array().map(Vec::len), Some(2));
    }
}
