//! Response schemas for structured generation.
//!
//! Two shapes live here:
//!
//! - [`StructuralSchema`]: the loosely-typed description users write, parsed
//!   straight from JSON text. `type` is free text and every field is optional.
//! - [`Schema`]: the strongly-typed schema the Vertex AI API accepts as
//!   `generationConfig.responseSchema`.
//!
//! [`translate`] maps the first onto the second.
//!
//! # Type fallback
//!
//! The `type` field is matched case-insensitively against `string`, `number`,
//! `integer`, `bool`/`boolean`, `array` and `object`. Anything else, including
//! an empty or missing `type`, becomes [`Type::String`], so a partially
//! specified schema still produces a request.
//!
//! ```
//! use vertexkit::schema::{StructuralSchema, Type, translate};
//!
//! let raw = StructuralSchema::parse(r#"{
//!     "type": "object",
//!     "properties": {
//!         "day": { "type": "string" },
//!         "temperature": { "type": "Integer" },
//!         "wind": { "type": "knots" }
//!     },
//!     "required": ["day"]
//! }"#).unwrap();
//!
//! let schema = translate(Some(&raw)).unwrap();
//! assert_eq!(schema.kind, Type::Object);
//! assert_eq!(schema.properties["temperature"].kind, Type::Integer);
//! assert_eq!(schema.properties["wind"].kind, Type::String);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Raw schema
// =============================================================================

/// A user-supplied schema description.
///
/// Keys mirror the API's schema object (`type`, `minItems`, `enum`, ...).
/// Unknown keys are ignored; missing or `null` keys take their zero value.
/// No field is validated against `kind`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralSchema {
    /// Free-text data type, e.g. `"object"` or `"INTEGER"`.
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    /// Format hint (`"float"`, `"int64"`, `"email"`, `"enum"`, ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub format: String,
    /// Title of the schema.
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Description of the data.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Whether the value may be null.
    #[serde(default, deserialize_with = "null_as_default")]
    pub nullable: bool,
    /// Element schema for arrays.
    #[serde(default)]
    pub items: Option<Box<StructuralSchema>>,
    /// Minimum number of array elements.
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_items: i64,
    /// Maximum number of array elements.
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_items: i64,
    /// Allowed values for enum-formatted strings.
    #[serde(rename = "enum", default, deserialize_with = "null_as_default")]
    pub enum_values: Vec<String>,
    /// Object properties by name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: BTreeMap<String, StructuralSchema>,
    /// Names of required properties.
    #[serde(default, deserialize_with = "null_as_default")]
    pub required: Vec<String>,
    /// Minimum number of object properties.
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_properties: i64,
    /// Maximum number of object properties.
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_properties: i64,
    /// Lower bound for numbers and integers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub minimum: f64,
    /// Upper bound for numbers and integers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub maximum: f64,
    /// Minimum string length.
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_length: i64,
    /// Maximum string length.
    #[serde(default, deserialize_with = "null_as_default")]
    pub max_length: i64,
    /// Regular expression a string must match.
    #[serde(default, deserialize_with = "null_as_default")]
    pub pattern: String,
}

impl StructuralSchema {
    /// Parse a schema from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaParse`] if the text is not well-formed JSON or
    /// a field has the wrong JSON type.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::SchemaParse)
    }
}

/// Deserialize `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Typed schema
// =============================================================================

/// Data types understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Type {
    /// Text. Also the fallback for unrecognized types.
    #[default]
    String,
    /// Floating point number.
    Number,
    /// Integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Ordered list; see [`Schema::items`].
    Array,
    /// Key/value object; see [`Schema::properties`].
    Object,
}

impl Type {
    /// Map a free-text type name onto a [`Type`].
    ///
    /// Matching ignores case. Unknown names fall back to [`Type::String`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "bool" | "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::String,
        }
    }

    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Integer => "INTEGER",
            Self::Boolean => "BOOLEAN",
            Self::Array => "ARRAY",
            Self::Object => "OBJECT",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed response schema.
///
/// Serializes to the API's schema object. Zero values are left off the wire,
/// the same way protobuf JSON omits unset scalar fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Data type.
    #[serde(rename = "type")]
    pub kind: Type,
    /// Format hint.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Title.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Description.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Whether the value may be null.
    #[serde(skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// Element schema for arrays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Minimum number of array elements.
    #[serde(skip_serializing_if = "is_zero")]
    pub min_items: i64,
    /// Maximum number of array elements.
    #[serde(skip_serializing_if = "is_zero")]
    pub max_items: i64,
    /// Allowed values.
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
    /// Object properties by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    /// Names of required properties.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Minimum number of object properties.
    #[serde(skip_serializing_if = "is_zero")]
    pub min_properties: i64,
    /// Maximum number of object properties.
    #[serde(skip_serializing_if = "is_zero")]
    pub max_properties: i64,
    /// Lower numeric bound.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub minimum: f64,
    /// Upper numeric bound.
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub maximum: f64,
    /// Minimum string length.
    #[serde(skip_serializing_if = "is_zero")]
    pub min_length: i64,
    /// Maximum string length.
    #[serde(skip_serializing_if = "is_zero")]
    pub max_length: i64,
    /// Regular expression a string must match.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pattern: String,
}

impl Schema {
    /// Encode the schema as it is sent on the wire.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        // A tree of strings, numbers and maps with string keys always encodes.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<&StructuralSchema> for Schema {
    fn from(raw: &StructuralSchema) -> Self {
        let mut schema = Self {
            kind: Type::from_name(&raw.kind),
            format: raw.format.clone(),
            title: raw.title.clone(),
            description: raw.description.clone(),
            nullable: raw.nullable,
            items: None,
            min_items: raw.min_items,
            max_items: raw.max_items,
            enum_values: raw.enum_values.clone(),
            properties: BTreeMap::new(),
            required: raw.required.clone(),
            min_properties: raw.min_properties,
            max_properties: raw.max_properties,
            minimum: raw.minimum,
            maximum: raw.maximum,
            min_length: raw.min_length,
            max_length: raw.max_length,
            pattern: raw.pattern.clone(),
        };

        if !raw.properties.is_empty() {
            schema.properties = raw
                .properties
                .iter()
                .map(|(name, property)| (name.clone(), Self::from(property)))
                .collect();
        }

        schema.items = translate(raw.items.as_deref()).map(Box::new);
        schema
    }
}

/// Translate a raw schema into the typed schema the API expects.
///
/// `None` in, `None` out. Translation never fails: constraints are copied
/// as-is and unrecognized types become [`Type::String`].
#[must_use]
pub fn translate(raw: Option<&StructuralSchema>) -> Option<Schema> {
    raw.map(Schema::from)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &i64) -> bool {
    *value == 0
}

#[allow(clippy::trivially_copy_pass_by_ref, clippy::float_cmp)]
fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FORECAST: &str = r#"{
        "type": "object",
        "properties": {
            "forecast": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "Day": { "type": "string" },
                        "Day of week": { "type": "integer" },
                        "Temperature": { "type": "integer" }
                    },
                    "required": ["Day", "Temperature"]
                }
            }
        },
        "required": ["forecast"]
    }"#;

    fn kind_of(name: &str) -> Type {
        let raw = StructuralSchema {
            kind: name.to_string(),
            ..Default::default()
        };
        translate(Some(&raw)).unwrap().kind
    }

    #[test]
    fn test_translate_none_is_none() {
        assert_eq!(translate(None), None);
    }

    #[test]
    fn test_recognized_types() {
        assert_eq!(kind_of("string"), Type::String);
        assert_eq!(kind_of("number"), Type::Number);
        assert_eq!(kind_of("integer"), Type::Integer);
        assert_eq!(kind_of("bool"), Type::Boolean);
        assert_eq!(kind_of("boolean"), Type::Boolean);
        assert_eq!(kind_of("array"), Type::Array);
        assert_eq!(kind_of("object"), Type::Object);
    }

    #[test]
    fn test_type_matching_ignores_case() {
        assert_eq!(kind_of("OBJECT"), Type::Object);
        assert_eq!(kind_of("Integer"), Type::Integer);
        assert_eq!(kind_of("BOOL"), Type::Boolean);
        assert_eq!(kind_of("aRrAy"), Type::Array);
    }

    #[test]
    fn test_unknown_type_falls_back_to_string() {
        assert_eq!(kind_of(""), Type::String);
        assert_eq!(kind_of("float"), Type::String);
        assert_eq!(kind_of("date-time"), Type::String);
        assert_eq!(kind_of(" object"), Type::String);
        assert_eq!(kind_of("null"), Type::String);
    }

    #[test]
    fn test_missing_type_falls_back_to_string() {
        let raw = StructuralSchema::parse(r#"{"description": "untyped"}"#).unwrap();
        let schema = translate(Some(&raw)).unwrap();
        assert_eq!(schema.kind, Type::String);
        assert_eq!(schema.description, "untyped");
    }

    #[test]
    fn test_recursive_fidelity() {
        let raw = StructuralSchema::parse(
            r#"{"properties": {"a": {"type": "integer"}, "b": {"type": "array", "items": {"type": "string"}}}, "type": "object"}"#,
        )
        .unwrap();

        let schema = translate(Some(&raw)).unwrap();
        assert_eq!(schema.kind, Type::Object);
        assert_eq!(schema.properties["a"].kind, Type::Integer);
        assert_eq!(schema.properties["b"].kind, Type::Array);
        assert_eq!(
            schema.properties["b"].items.as_ref().unwrap().kind,
            Type::String
        );
    }

    #[test]
    fn test_nested_forecast_schema() {
        let raw = StructuralSchema::parse(FORECAST).unwrap();
        let schema = translate(Some(&raw)).unwrap();

        let forecast = &schema.properties["forecast"];
        assert_eq!(forecast.kind, Type::Array);
        let day = forecast.items.as_ref().unwrap();
        assert_eq!(day.kind, Type::Object);
        assert_eq!(day.properties["Day of week"].kind, Type::Integer);
        assert_eq!(day.required, vec!["Day", "Temperature"]);
        assert_eq!(schema.required, vec!["forecast"]);
    }

    #[test]
    fn test_translate_is_idempotent() {
        let raw = StructuralSchema::parse(FORECAST).unwrap();
        let first = translate(Some(&raw));
        let second = translate(Some(&raw));
        assert_eq!(first, second);
        assert_eq!(raw, StructuralSchema::parse(FORECAST).unwrap());
    }

    #[test]
    fn test_constraints_copied_without_kind_validation() {
        let raw = StructuralSchema::parse(
            r#"{
                "type": "object",
                "format": "custom",
                "title": "T",
                "nullable": true,
                "minItems": 1,
                "maxItems": 9,
                "enum": ["EAST", "NORTH"],
                "minProperties": 2,
                "maxProperties": 5,
                "minimum": -1.5,
                "maximum": 99.25,
                "minLength": 3,
                "maxLength": 12,
                "pattern": "^[a-z]+$"
            }"#,
        )
        .unwrap();

        let schema = translate(Some(&raw)).unwrap();
        assert_eq!(schema.kind, Type::Object);
        assert_eq!(schema.format, "custom");
        assert_eq!(schema.title, "T");
        assert!(schema.nullable);
        assert_eq!(schema.min_items, 1);
        assert_eq!(schema.max_items, 9);
        assert_eq!(schema.enum_values, vec!["EAST", "NORTH"]);
        assert_eq!(schema.min_properties, 2);
        assert_eq!(schema.max_properties, 5);
        assert!((schema.minimum - -1.5).abs() < f64::EPSILON);
        assert!((schema.maximum - 99.25).abs() < f64::EPSILON);
        assert_eq!(schema.min_length, 3);
        assert_eq!(schema.max_length, 12);
        assert_eq!(schema.pattern, "^[a-z]+$");
    }

    #[test]
    fn test_required_naming_missing_property_is_kept() {
        let raw = StructuralSchema::parse(
            r#"{"type": "object", "properties": {"a": {}}, "required": ["a", "ghost"]}"#,
        )
        .unwrap();
        let schema = translate(Some(&raw)).unwrap();
        assert_eq!(schema.required, vec!["a", "ghost"]);
        assert!(!schema.properties.contains_key("ghost"));
    }

    #[test]
    fn test_items_ignored_kind_still_translated() {
        let raw = StructuralSchema::parse(r#"{"type": "string", "items": {"type": "number"}}"#)
            .unwrap();
        let schema = translate(Some(&raw)).unwrap();
        assert_eq!(schema.kind, Type::String);
        assert_eq!(schema.items.unwrap().kind, Type::Number);
    }

    #[test]
    fn test_parse_ignores_unknown_fields_and_nulls() {
        let raw = StructuralSchema::parse(
            r#"{"type": null, "$schema": "draft-07", "additionalProperties": false, "enum": null, "items": null}"#,
        )
        .unwrap();
        assert_eq!(raw, StructuralSchema::default());
    }

    #[test]
    fn test_parse_rejects_truncated_json() {
        let err = StructuralSchema::parse(r#"{"type": "object", "properties": {"#).unwrap_err();
        assert!(matches!(err, Error::SchemaParse(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_field_type() {
        let err = StructuralSchema::parse(r#"{"minItems": "three"}"#).unwrap_err();
        assert!(matches!(err, Error::SchemaParse(_)));
    }

    #[test]
    fn test_wire_encoding() {
        let raw = StructuralSchema::parse(
            r#"{"type": "object", "properties": {"dir": {"type": "string", "format": "enum", "enum": ["E", "W"]}, "n": {"type": "integer", "minimum": 1}}, "required": ["dir"]}"#,
        )
        .unwrap();
        let schema = translate(Some(&raw)).unwrap();

        assert_eq!(
            schema.to_json(),
            json!({
                "type": "OBJECT",
                "properties": {
                    "dir": { "type": "STRING", "format": "enum", "enum": ["E", "W"] },
                    "n": { "type": "INTEGER", "minimum": 1.0 }
                },
                "required": ["dir"]
            })
        );
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Boolean.to_string(), "BOOLEAN");
        assert_eq!(Type::default(), Type::String);
    }
}
