//! Order records: the positional wire payload and the typed order decoded from it

use crate::error::PayloadError;
use crate::geo::Coordinate;
use serde::Deserialize;
use serde_json::Value;

/// One `[label, value]` pair as sent by the spreadsheet script
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RawField(pub String, pub Value);

impl RawField {
    pub fn label(&self) -> &str {
        &self.0
    }

    /// Value as display text; null becomes empty
    pub fn text(&self) -> String {
        match &self.1 {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// The payload exactly as received: a positional list of pairs
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRecord {
    pub fields: Vec<RawField>,
}

impl RawRecord {
    pub fn from_json(body: &str) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| PayloadError::Shape(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let fields: Vec<RawField> =
            serde_json::from_value(value).map_err(|e| PayloadError::Shape(e.to_string()))?;
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Resolve a field: a configured label wins, the fixed index is the fallback
    fn resolve(&self, name: &'static str, key: &FieldKey) -> Result<&RawField, PayloadError> {
        if let Some(label) = key.label.as_deref() {
            let wanted = label.trim();
            if let Some(field) = self
                .fields
                .iter()
                .find(|f| f.label().trim().eq_ignore_ascii_case(wanted))
            {
                return Ok(field);
            }
        }
        self.fields.get(key.index).ok_or(PayloadError::MissingField {
            field: name,
            index: key.index,
            len: self.fields.len(),
        })
    }
}

/// Where to find one order field in the payload
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FieldKey {
    pub index: usize,
    #[serde(default)]
    pub label: Option<String>,
}

impl FieldKey {
    pub const fn at(index: usize) -> Self {
        Self { index, label: None }
    }
}

/// Field positions agreed with the spreadsheet script
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecordLayout {
    pub location: FieldKey,
    pub amount: FieldKey,
    pub shop: FieldKey,
    pub customer_type: FieldKey,
    pub city: FieldKey,
    pub channel: FieldKey,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            location: FieldKey::at(31),
            amount: FieldKey::at(32),
            shop: FieldKey::at(33),
            customer_type: FieldKey::at(34),
            city: FieldKey::at(35),
            channel: FieldKey::at(36),
        }
    }
}

/// A validated order, ready for display
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub location: Coordinate,
    pub amount: String,
    pub shop: String,
    pub customer_type: String,
    pub city: String,
    pub channel: String,
}

impl Order {
    pub fn decode(raw: &RawRecord, layout: &RecordLayout) -> Result<Self, PayloadError> {
        let location = parse_location(&raw.resolve("location", &layout.location)?.text())?;
        Ok(Self {
            location,
            amount: raw.resolve("amount", &layout.amount)?.text(),
            shop: raw.resolve("shop", &layout.shop)?.text(),
            customer_type: raw.resolve("customer_type", &layout.customer_type)?.text(),
            city: raw.resolve("city", &layout.city)?.text(),
            channel: raw.resolve("channel", &layout.channel)?.text(),
        })
    }

    /// Text of the destination marker's popup
    pub fn popup_text(&self) -> String {
        format!(
            "Hey! I'm a customer of shop {}! I ordered {} euros from {}.",
            self.shop, self.amount, self.city
        )
    }
}

/// Parse a `"lat,lng"` string
pub fn parse_location(s: &str) -> Result<Coordinate, PayloadError> {
    let bad = || PayloadError::BadCoordinate(s.to_string());
    let (lat, lng) = s.split_once(',').ok_or_else(bad)?;
    let lat: f64 = lat.trim().parse().map_err(|_| bad())?;
    let lng: f64 = lng.trim().parse().map_err(|_| bad())?;

    if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(PayloadError::OutOfRange { lat, lng });
    }
    Ok(Coordinate::new(lat, lng))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A payload shaped like the script's output, with the order at 31..=36
    pub(crate) fn sample_payload(location: &str) -> Value {
        let mut pairs: Vec<Value> = (0..31).map(|i| json!([format!("col{i}"), "x"])).collect();
        pairs.push(json!(["Coordinates", location]));
        pairs.push(json!(["Amount", "42.50"]));
        pairs.push(json!(["Shop", "Maison Lumière"]));
        pairs.push(json!(["Customer type", "returning"]));
        pairs.push(json!(["City", "Lyon"]));
        pairs.push(json!(["Channel", "web"]));
        Value::Array(pairs)
    }

    #[test]
    fn decodes_fixed_positions() {
        let raw = RawRecord::from_value(sample_payload("48.85,2.35")).unwrap();
        let order = Order::decode(&raw, &RecordLayout::default()).unwrap();
        assert_eq!(order.location, Coordinate::new(48.85, 2.35));
        assert_eq!(order.amount, "42.50");
        assert_eq!(order.shop, "Maison Lumière");
        assert_eq!(order.customer_type, "returning");
        assert_eq!(order.city, "Lyon");
        assert_eq!(order.channel, "web");
    }

    #[test]
    fn popup_mentions_shop_amount_city() {
        let raw = RawRecord::from_value(sample_payload("48.85,2.35")).unwrap();
        let order = Order::decode(&raw, &RecordLayout::default()).unwrap();
        let text = order.popup_text();
        assert!(text.contains("Maison Lumière"));
        assert!(text.contains("42.50"));
        assert!(text.contains("Lyon"));
    }

    #[test]
    fn label_lookup_beats_index() {
        let raw = RawRecord::from_value(json!([
            ["City", "Nantes"],
            ["Coordinates", "47.21, -1.55"],
        ]))
        .unwrap();
        let layout = RecordLayout {
            location: FieldKey { index: 99, label: Some("coordinates".into()) },
            amount: FieldKey::at(0),
            shop: FieldKey::at(0),
            customer_type: FieldKey::at(0),
            city: FieldKey { index: 1, label: Some(" CITY ".into()) },
            channel: FieldKey::at(1),
        };
        let order = Order::decode(&raw, &layout).unwrap();
        assert_eq!(order.location, Coordinate::new(47.21, -1.55));
        assert_eq!(order.city, "Nantes");
    }

    #[test]
    fn short_payload_is_missing_field() {
        let raw = RawRecord::from_value(json!([["a", "1"], ["b", "2"]])).unwrap();
        let err = Order::decode(&raw, &RecordLayout::default()).unwrap_err();
        assert_eq!(
            err,
            PayloadError::MissingField { field: "location", index: 31, len: 2 }
        );
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(matches!(
            RawRecord::from_json(r#"{"lat": 1}"#),
            Err(PayloadError::Shape(_))
        ));
        assert!(matches!(RawRecord::from_json("not json"), Err(PayloadError::Shape(_))));
    }

    #[test]
    fn non_string_values_are_stringified() {
        let raw = RawRecord::from_value(json!([["n", 12.5], ["z", null], ["b", true]])).unwrap();
        assert_eq!(raw.fields[0].text(), "12.5");
        assert_eq!(raw.fields[1].text(), "");
        assert_eq!(raw.fields[2].text(), "true");
    }

    #[test]
    fn location_parsing() {
        assert_eq!(parse_location(" 35.68 , 139.69 ").unwrap(), Coordinate::new(35.68, 139.69));
        assert!(matches!(parse_location("35.68"), Err(PayloadError::BadCoordinate(_))));
        assert!(matches!(parse_location("abc,1"), Err(PayloadError::BadCoordinate(_))));
        assert!(matches!(parse_location(""), Err(PayloadError::BadCoordinate(_))));
        assert!(matches!(parse_location("91,0"), Err(PayloadError::OutOfRange { .. })));
        assert!(matches!(parse_location("0,-180.5"), Err(PayloadError::OutOfRange { .. })));
        assert!(matches!(parse_location("NaN,0"), Err(PayloadError::OutOfRange { .. })));
    }
}
