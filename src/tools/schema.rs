//! Declarative tool-parameter schemas.
//!
//! Schemas are built once at tool registration, not introspected per call.

use serde::{Deserialize, Serialize};

use crate::types::CTX_VARS_NAME;

/// JSON Schema parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameters {
    /// JSON Schema object describing the parameters.
    pub schema: serde_json::Value,
}

impl ToolParameters {
    /// Create from a raw JSON Schema value.
    pub fn from_schema(schema: serde_json::Value) -> Self {
        Self { schema }
    }

    /// Create an empty parameter schema (no parameters).
    pub fn empty() -> Self {
        Self {
            schema: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
        }
    }

    /// Builder: create an object schema with properties.
    pub fn object() -> ParameterBuilder {
        ParameterBuilder {
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// Whether the schema declares the reserved context-variable parameter.
    pub fn declares_context_variables(&self) -> bool {
        self.schema
            .get("properties")
            .and_then(|p| p.get(CTX_VARS_NAME))
            .is_some()
    }

    /// The schema as advertised to the model: the reserved
    /// context-variable parameter is stripped from `properties` and
    /// `required`.
    pub fn advertised_schema(&self) -> serde_json::Value {
        let mut schema = self.schema.clone();
        if let Some(properties) = schema.get_mut("properties").and_then(|p| p.as_object_mut()) {
            properties.remove(CTX_VARS_NAME);
        }
        if let Some(required) = schema.get_mut("required").and_then(|r| r.as_array_mut()) {
            required.retain(|name| name.as_str() != Some(CTX_VARS_NAME));
        }
        schema
    }
}

/// Builder for constructing tool parameter schemas.
pub struct ParameterBuilder {
    properties: serde_json::Map<String, serde_json::Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(
        mut self,
        name: String,
        type_name: &str,
        description: String,
        required: bool,
    ) -> Self {
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": type_name,
                "description": description,
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    /// Add a string property.
    pub fn string(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.property(name.into(), "string", description.into(), required)
    }

    /// Add a number property.
    pub fn number(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.property(name.into(), "number", description.into(), required)
    }

    /// Add a boolean property.
    pub fn boolean(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.property(name.into(), "boolean", description.into(), required)
    }

    /// Add an enum (string) property.
    pub fn string_enum(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        let name = name.into();
        self.properties.insert(
            name.clone(),
            serde_json::json!({
                "type": "string",
                "description": description.into(),
                "enum": values,
            }),
        );
        if required {
            self.required.push(name);
        }
        self
    }

    /// Declare that the tool receives the context-variable map.
    ///
    /// The parameter is injected by the loop and never advertised.
    pub fn context_variables(mut self) -> Self {
        self.properties.insert(
            CTX_VARS_NAME.to_string(),
            serde_json::json!({ "type": "object" }),
        );
        self
    }

    /// Build into ToolParameters.
    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: serde_json::json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
