use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

fn default_language() -> String {
    "Vietnamese".to_string()
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Output of the ingredient-list extraction call.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct IngredientsInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amounts: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
}

impl IngredientsInfo {
    /// Ingredients and amounts are parallel arrays and must line up.
    pub fn validate(&self) -> Result<(), String> {
        if self.ingredients.len() != self.amounts.len() {
            return Err(format!(
                "ingredient list has {} names but {} amounts",
                self.ingredients.len(),
                self.amounts.len()
            ));
        }
        Ok(())
    }

    pub fn response_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "ingredients": { "type": "ARRAY", "items": { "type": "STRING" } },
                "amounts": { "type": "ARRAY", "items": { "type": "STRING" } },
                "language": { "type": "STRING" }
            },
            "required": ["ingredients", "amounts", "language"]
        })
    }
}

const NUTRITION_FIELDS: [&str; 9] = [
    "energy",
    "fat",
    "saturated_fat",
    "carbohydrate",
    "sugars",
    "fiber",
    "protein",
    "salt",
    "sodium",
];

const OTHER_INFO_FIELDS: [&str; 9] = [
    "product_name",
    "brand",
    "net_content",
    "manufacturing_date",
    "expiry_date",
    "country_of_origin",
    "manufacturer",
    "usage_instructions",
    "storage_instructions",
];

/// Output of the packaging metadata extraction call. Missing or null fields become empty strings.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OtherInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub product_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub brand: String,
    #[serde(deserialize_with = "null_as_default")]
    pub net_content: String,
    #[serde(deserialize_with = "null_as_default")]
    pub manufacturing_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub expiry_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub country_of_origin: String,
    #[serde(deserialize_with = "null_as_default")]
    pub manufacturer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub usage_instructions: String,
    #[serde(deserialize_with = "null_as_default")]
    pub storage_instructions: String,
    #[serde(deserialize_with = "null_as_default")]
    pub nutritional_info: Map<String, Value>,
}

impl OtherInfo {
    pub fn response_schema() -> Value {
        let mut properties = Map::new();
        for field in OTHER_INFO_FIELDS {
            properties.insert(field.to_string(), json!({ "type": "STRING" }));
        }

        let mut nutrition = Map::new();
        for field in NUTRITION_FIELDS {
            nutrition.insert(field.to_string(), json!({ "type": "STRING" }));
        }
        properties.insert(
            "nutritional_info".to_string(),
            json!({ "type": "OBJECT", "properties": nutrition }),
        );

        let mut required: Vec<&str> = OTHER_INFO_FIELDS.to_vec();
        required.push("nutritional_info");

        json!({ "type": "OBJECT", "properties": properties, "required": required })
    }
}

/// Both extraction results merged under human-readable labels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExtractionRecord {
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Net Content")]
    pub net_content: String,
    #[serde(rename = "Manufacturing Date")]
    pub manufacturing_date: String,
    #[serde(rename = "Expiry Date")]
    pub expiry_date: String,
    #[serde(rename = "Country Of Origin")]
    pub country_of_origin: String,
    #[serde(rename = "Manufacturer")]
    pub manufacturer: String,
    #[serde(rename = "Usage Instructions")]
    pub usage_instructions: String,
    #[serde(rename = "Storage Instructions")]
    pub storage_instructions: String,
    #[serde(rename = "Nutritional Info")]
    pub nutritional_info: Map<String, Value>,
    #[serde(rename = "Ingredients")]
    pub ingredients: Vec<String>,
    #[serde(rename = "Amounts")]
    pub amounts: Vec<String>,
    #[serde(rename = "Language")]
    pub language: String,
}

impl ExtractionRecord {
    pub fn merge(ingredients: IngredientsInfo, other: OtherInfo) -> Self {
        Self {
            product_name: other.product_name,
            brand: other.brand,
            net_content: other.net_content,
            manufacturing_date: other.manufacturing_date,
            expiry_date: other.expiry_date,
            country_of_origin: other.country_of_origin,
            manufacturer: other.manufacturer,
            usage_instructions: other.usage_instructions,
            storage_instructions: other.storage_instructions,
            nutritional_info: other.nutritional_info,
            ingredients: ingredients.ingredients,
            amounts: ingredients.amounts,
            language: ingredients.language,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub info: Map<String, Value>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_info_tolerates_missing_fields() {
        let info: OtherInfo = serde_json::from_value(json!({ "brand": "Acme" })).unwrap();
        assert_eq!(info.brand, "Acme");
        assert_eq!(info.expiry_date, "");
        assert!(info.nutritional_info.is_empty());
    }

    #[test]
    fn null_fields_read_as_empty() {
        let info: OtherInfo = serde_json::from_value(json!({
            "product_name": null,
            "brand": "Acme",
            "expiry_date": null,
            "nutritional_info": null
        })).unwrap();
        assert_eq!(info.product_name, "");
        assert_eq!(info.brand, "Acme");
        assert_eq!(info.expiry_date, "");
        assert!(info.nutritional_info.is_empty());

        let ingredients: IngredientsInfo = serde_json::from_value(json!({
            "ingredients": ["Eau"],
            "amounts": [""],
            "language": null
        })).unwrap();
        assert_eq!(ingredients.language, "");
        assert!(ingredients.validate().is_ok());
    }

    #[test]
    fn mismatched_ingredient_arrays_fail_validation() {
        let info = IngredientsInfo {
            ingredients: vec!["Eau".into(), "Parfum".into()],
            amounts: vec!["85%".into()],
            language: "French".into(),
        };
        assert!(info.validate().is_err());
    }

    #[test]
    fn merged_record_uses_labels() {
        let ingredients = IngredientsInfo {
            ingredients: vec!["Eau".into(), "Glycérine".into(), "Parfum".into()],
            amounts: vec!["85%".into(), "10%".into(), "".into()],
            language: "French".into(),
        };
        let other = OtherInfo {
            brand: "Acme".into(),
            expiry_date: "2026-01-31".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(ExtractionRecord::merge(ingredients, other)).unwrap();
        assert_eq!(value["Brand"], "Acme");
        assert_eq!(value["Expiry Date"], "2026-01-31");
        assert_eq!(value["Ingredients"][1], "Glycérine");
        assert_eq!(value["Amounts"][2], "");
        assert_eq!(value["Language"], "French");
        assert_eq!(value["Product Name"], "");
    }

    #[test]
    fn other_info_schema_requires_every_field() {
        let schema = OtherInfo::response_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 10);
        assert_eq!(schema["properties"]["nutritional_info"]["type"], "OBJECT");
    }

    #[test]
    fn translate_request_defaults_language() {
        let req: TranslateRequest = serde_json::from_value(json!({ "info": { "a": "b" } })).unwrap();
        assert_eq!(req.language, "Vietnamese");
    }
}
