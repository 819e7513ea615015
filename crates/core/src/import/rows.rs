use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::{
    fields::{number_to_value, parse_delimited_list, parse_hp_con, parse_number},
    models::{is_vehicle_type, TYPE_MOD},
};

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("invalid header regex"));

/// Logical card fields a bulk column can feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowField {
    Id,
    Name,
    Type,
    Rarity,
    SetName,
    CardNumber,
    VehicleTypes,
    Tags,
    HpCon,
    Hp,
    Con,
    PitCost,
    ModBasePart,
    ModLevel1,
    ModLevel2,
    ModLevel3,
    ModLevel4,
    ImageUrl,
    Notes,
}

/// Accepted header spellings per field, already in lookup form.
const SYNONYMS: &[(RowField, &[&str])] = &[
    (RowField::Id, &["id", "cardid"]),
    (RowField::Name, &["name", "cardname", "title"]),
    (RowField::Type, &["type", "cardtype", "kind"]),
    (RowField::Rarity, &["rarity", "rar"]),
    (
        RowField::SetName,
        &["setname", "set", "setid", "setcode", "expansion"],
    ),
    (
        RowField::CardNumber,
        &["cardnumber", "number", "no", "num", "cardno", "#"],
    ),
    (
        RowField::VehicleTypes,
        &["vehicletypes", "vehicletype", "vehicles"],
    ),
    (RowField::Tags, &["tags", "tag", "keywords", "traits"]),
    (RowField::HpCon, &["hpcon", "hpandcon"]),
    (RowField::Hp, &["hp", "hitpoints"]),
    (RowField::Con, &["con", "constitution"]),
    (RowField::PitCost, &["pitcost", "pit", "cost"]),
    (RowField::ModBasePart, &["modbasepart", "basepart", "modbase"]),
    (RowField::ModLevel1, &["modlevel1", "level1", "lv1", "lvl1"]),
    (RowField::ModLevel2, &["modlevel2", "level2", "lv2", "lvl2"]),
    (RowField::ModLevel3, &["modlevel3", "level3", "lv3", "lvl3"]),
    (RowField::ModLevel4, &["modlevel4", "level4", "lv4", "lvl4"]),
    (RowField::ImageUrl, &["imageurl", "image", "img", "art", "imagelink"]),
    (RowField::Notes, &["notes", "note", "text", "rules"]),
];

static HEADER_LOOKUP: Lazy<HashMap<&'static str, RowField>> = Lazy::new(|| {
    SYNONYMS
        .iter()
        .flat_map(|(field, spellings)| spellings.iter().map(move |spelling| (*spelling, *field)))
        .collect()
});

/// Column order assumed when the text has no header row.
pub const POSITIONAL_FIELDS: [RowField; 16] = [
    RowField::Name,
    RowField::Type,
    RowField::Rarity,
    RowField::SetName,
    RowField::CardNumber,
    RowField::VehicleTypes,
    RowField::Tags,
    RowField::HpCon,
    RowField::PitCost,
    RowField::ImageUrl,
    RowField::Notes,
    RowField::ModBasePart,
    RowField::ModLevel1,
    RowField::ModLevel2,
    RowField::ModLevel3,
    RowField::ModLevel4,
];

/// Case-fold a header and drop everything but ASCII letters and digits, so
/// `Card Number`, `card_number` and `CardNumber` all become `cardnumber`.
/// Headers made only of punctuation (such as `#`) are kept trimmed.
pub fn normalize_header(header: &str) -> String {
    let folded = NON_ALPHANUMERIC
        .replace_all(&header.to_lowercase(), "")
        .into_owned();
    if folded.is_empty() {
        header.trim().to_string()
    } else {
        folded
    }
}

/// Field a header resolves to, if any.
pub fn field_for_header(header: &str) -> Option<RowField> {
    HEADER_LOOKUP.get(normalize_header(header).as_str()).copied()
}

/// Whether a row looks like a header, i.e. one of its cells names the card.
pub fn is_header_row(cells: &[String]) -> bool {
    cells
        .iter()
        .any(|cell| field_for_header(cell) == Some(RowField::Name))
}

/// Map one row of cells to a raw card object for the normalizer.
///
/// With `headers`, columns are matched by name through the synonym table;
/// without, [`POSITIONAL_FIELDS`] gives the column order. Rows without a name
/// yield `None`.
pub fn map_row(headers: Option<&[String]>, values: &[String]) -> Option<Value> {
    let mut cells: HashMap<RowField, String> = HashMap::new();
    let mut put = |field: RowField, value: &str| {
        let value = value.trim();
        let slot = cells.entry(field).or_default();
        if slot.is_empty() {
            *slot = value.to_string();
        }
    };
    match headers {
        Some(headers) => {
            for (header, value) in headers.iter().zip(values) {
                if let Some(field) = field_for_header(header) {
                    put(field, value.as_str());
                }
            }
        }
        None => {
            for (field, value) in POSITIONAL_FIELDS.iter().zip(values) {
                put(*field, value.as_str());
            }
        }
    }

    let cell = |field: RowField| cells.get(&field).map(String::as_str).unwrap_or("");
    let name = cell(RowField::Name);
    if name.is_empty() {
        return None;
    }

    let card_type = cell(RowField::Type);
    let mut extra = Map::new();
    if card_type == TYPE_MOD {
        extra.insert("modBasePart".into(), json!(cell(RowField::ModBasePart)));
        let levels = [
            RowField::ModLevel1,
            RowField::ModLevel2,
            RowField::ModLevel3,
            RowField::ModLevel4,
        ];
        for (index, field) in levels.into_iter().enumerate() {
            extra.insert(format!("modLevel{}", index + 1), json!(cell(field)));
        }
    } else if is_vehicle_type(card_type) {
        let (hp, con) = if cells.contains_key(&RowField::HpCon) {
            let pair = parse_hp_con(cell(RowField::HpCon));
            (pair.hp, pair.con)
        } else {
            (parse_number(cell(RowField::Hp)), parse_number(cell(RowField::Con)))
        };
        extra.insert("hp".into(), number_to_value(hp));
        extra.insert("con".into(), number_to_value(con));
        extra.insert(
            "pitCost".into(),
            number_to_value(parse_number(cell(RowField::PitCost))),
        );
    }

    let set_name = cell(RowField::SetName);
    let card_number = cell(RowField::CardNumber);
    let prints = if set_name.is_empty() && card_number.is_empty() {
        Vec::new()
    } else {
        vec![json!({"setName": set_name, "cardNumber": card_number, "isPrimary": true})]
    };

    let mut raw = json!({
        "name": name,
        "type": card_type,
        "rarity": cell(RowField::Rarity),
        "setName": set_name,
        "cardNumber": card_number,
        "vehicleTypes": parse_delimited_list(cell(RowField::VehicleTypes)),
        "tags": parse_delimited_list(cell(RowField::Tags)),
        "imageUrl": cell(RowField::ImageUrl),
        "notes": cell(RowField::Notes),
        "extra": extra,
        "prints": prints,
    });
    let id = cell(RowField::Id);
    if !id.is_empty() {
        raw["id"] = json!(id);
    }
    Some(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn header_spellings_collapse() {
        assert_eq!(normalize_header("Card Number"), "cardnumber");
        assert_eq!(normalize_header("card_number"), "cardnumber");
        assert_eq!(normalize_header("CardNumber"), "cardnumber");
        assert_eq!(field_for_header("#"), Some(RowField::CardNumber));
        assert_eq!(field_for_header(" No. "), Some(RowField::CardNumber));
        assert_eq!(field_for_header("HP/CON"), Some(RowField::HpCon));
        assert_eq!(field_for_header("Flavour"), None);
    }

    #[test]
    fn maps_headed_row() {
        let headers = strings(&["Name", "Type", "Set", "CardNumber"]);
        let raw = map_row(Some(&headers[..]), &strings(&["Taxi", "Vehicle", "Core", "007"]))
            .expect("row has a name");

        assert_eq!(raw["type"], "Vehicle");
        assert_eq!(raw["setName"], "Core");
        assert_eq!(raw["cardNumber"], "007");
        assert_eq!(
            raw["prints"],
            json!([{"setName": "Core", "cardNumber": "007", "isPrimary": true}])
        );
    }

    #[test]
    fn maps_positional_row() {
        let values = strings(&[
            "Wrench", "Mod", "Rare", "", "", "", "tool, shop", "", "", "", "", "Engine", "+1",
        ]);
        let raw = map_row(None, &values).expect("row has a name");

        assert_eq!(raw["name"], "Wrench");
        assert_eq!(raw["tags"], json!(["tool", "shop"]));
        assert_eq!(raw["extra"]["modBasePart"], "Engine");
        assert_eq!(raw["extra"]["modLevel1"], "+1");
        assert_eq!(raw["extra"]["modLevel4"], "");
        assert_eq!(raw["prints"], json!([]));
    }

    #[test]
    fn vehicle_extras_only_for_vehicle_types() {
        let headers = strings(&["name", "type", "hp/con", "pit cost"]);
        let raw = map_row(Some(&headers[..]), &strings(&["Bus", "Vehicle", "20/5", "3"])).unwrap();
        assert_eq!(raw["extra"], json!({"hp": 20.0, "con": 5.0, "pitCost": 3.0}));

        let raw = map_row(Some(&headers[..]), &strings(&["Driver", "Crew", "20/5", "3"])).unwrap();
        assert_eq!(raw["extra"], json!({}));
    }

    #[test]
    fn separate_hp_and_con_columns() {
        let headers = strings(&["Name", "Type", "HP", "CON"]);
        let raw =
            map_row(Some(&headers[..]), &strings(&["Limo", "Named Vehicle", "9", "x"])).unwrap();
        assert_eq!(raw["extra"]["hp"], 9.0);
        assert_eq!(raw["extra"]["con"], "NaN");
    }

    #[test]
    fn blank_set_columns_do_not_create_prints() {
        let headers = strings(&["Name", "Set", "No"]);
        let raw = map_row(Some(&headers[..]), &strings(&["Taxi", "  ", ""])).unwrap();
        assert_eq!(raw["prints"], json!([]));
    }

    #[test]
    fn rows_without_names_are_skipped() {
        let headers = strings(&["Name", "Type"]);
        assert!(map_row(Some(&headers[..]), &strings(&["  ", "Vehicle"])).is_none());
        assert!(map_row(None, &[]).is_none());
    }

    #[test]
    fn detects_header_rows() {
        assert!(is_header_row(&strings(&["Card Name", "Type"])));
        assert!(!is_header_row(&strings(&["Taxi", "Vehicle"])));
    }
}
