use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::null_as_default;

/// Value type of an extracted feature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
    Array,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::String => "string",
            FeatureType::Integer => "integer",
            FeatureType::Number => "number",
            FeatureType::Boolean => "boolean",
            FeatureType::Array => "array",
        }
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(FeatureType::String),
            "integer" => Ok(FeatureType::Integer),
            "number" => Ok(FeatureType::Number),
            "boolean" => Ok(FeatureType::Boolean),
            "array" => Ok(FeatureType::Array),
            other => Err(format!("unknown feature type: {}", other)),
        }
    }
}

/// A feature as stored on the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub feature_name: String,
    pub feature_description: String,
    pub feature_identifier: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub feature_type: FeatureType,
    #[serde(default)]
    pub feature_prompt: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub feature_enum_options: Vec<String>,
    #[serde(default)]
    pub is_shared: bool,
    pub created_by: String,
}

/// Request body for creating a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCreate {
    pub feature_name: String,
    pub feature_description: String,
    pub feature_identifier: String,
    pub feature_parent: Option<String>,
    pub feature_type: FeatureType,
    pub feature_enum_options: Vec<String>,
    pub is_shared: bool,
}

impl FeatureCreate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            feature_name: name.into(),
            feature_description: description.into(),
            feature_identifier: identifier.into(),
            feature_parent: None,
            feature_type: FeatureType::default(),
            feature_enum_options: Vec::new(),
            is_shared: false,
        }
    }

    pub fn with_type(mut self, feature_type: FeatureType) -> Self {
        self.feature_type = feature_type;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.feature_parent = Some(parent.into());
        self
    }

    pub fn with_enum_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_enum_options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn shared(mut self, is_shared: bool) -> Self {
        self.is_shared = is_shared;
        self
    }

    /// Check the fields the server requires to be non-empty.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_name.trim().is_empty() {
            return Err("feature_name must not be empty".to_string());
        }
        if self.feature_identifier.trim().is_empty() {
            return Err("feature_identifier must not be empty".to_string());
        }
        Ok(())
    }

    /// Render the JSON-schema fragment used by the extraction prompt.
    pub fn to_gpt_interface(&self) -> Value {
        let mut interface = json!({
            "type": self.feature_type.as_str(),
            "description": self.feature_description,
        });
        if !self.feature_enum_options.is_empty() {
            interface["enum"] = json!(self.feature_enum_options);
        }
        interface
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_decodes_with_defaults() {
        let feature: Feature = serde_json::from_value(json!({
            "id": "f1",
            "feature_name": "Sample Size",
            "feature_description": "Number of participants",
            "feature_identifier": "sample_size",
            "feature_enum_options": null,
            "created_by": "user@example.com"
        }))
        .unwrap();

        assert_eq!(feature.feature_type, FeatureType::String);
        assert!(feature.feature_enum_options.is_empty());
        assert!(!feature.is_shared);
        assert!(feature.feature_prompt.is_none());
    }

    #[test]
    fn test_feature_missing_required_field_fails() {
        let result = serde_json::from_value::<Feature>(json!({
            "id": "f1",
            "feature_name": "Sample Size",
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_feature_unknown_type_fails() {
        let result = serde_json::from_value::<Feature>(json!({
            "id": "f1",
            "feature_name": "n",
            "feature_description": "d",
            "feature_identifier": "i",
            "feature_type": "blob",
            "created_by": "u"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_gpt_interface_without_enum() {
        let create = FeatureCreate::new("Sample Size", "Participants", "sample_size")
            .with_type(FeatureType::Integer);
        assert_eq!(
            create.to_gpt_interface(),
            json!({"type": "integer", "description": "Participants"})
        );
    }

    #[test]
    fn test_gpt_interface_with_enum() {
        let create = FeatureCreate::new("Design", "Study design", "design")
            .with_enum_options(["rct", "observational"]);
        let interface = create.to_gpt_interface();
        assert_eq!(interface["enum"], json!(["rct", "observational"]));
        assert_eq!(interface["type"], "string");
    }

    #[test]
    fn test_validate_rejects_blank_identifier() {
        let create = FeatureCreate::new("Name", "desc", "  ");
        assert!(create.validate().is_err());
        assert!(FeatureCreate::new("Name", "desc", "id").validate().is_ok());
    }

    #[test]
    fn test_feature_type_from_str() {
        assert_eq!("Boolean".parse::<FeatureType>(), Ok(FeatureType::Boolean));
        assert!("blob".parse::<FeatureType>().is_err());
    }
}
