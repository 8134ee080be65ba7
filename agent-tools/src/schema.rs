//! Declarative parameter schemas published by tools.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::call::Arguments;
use crate::error::{ToolError, ToolResult, ValidationError};

/// JSON type accepted by a tool parameter.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// UTF-8 string.
    String,
    /// Whole number; floats are rejected.
    Integer,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
}

impl ParameterType {
    /// Returns `true` if the supplied JSON value satisfies this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    /// Returns the JSON schema keyword for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declaration of a single named parameter.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ParameterSchema {
    name: String,
    #[serde(rename = "type")]
    kind: ParameterType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    required: bool,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
}

impl ParameterSchema {
    /// Declares a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: ParameterType) -> Self {
        Self::new(name, kind, true)
    }

    /// Declares an optional parameter.
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: ParameterType) -> Self {
        Self::new(name, kind, false)
    }

    fn new(name: impl Into<String>, kind: ParameterType, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            required,
            allowed: None,
            default: None,
        }
    }

    /// Sets the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restricts the parameter to an explicit set of values.
    #[must_use]
    pub fn with_allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Records the value a tool assumes when the parameter is omitted.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[must_use]
    pub const fn kind(&self) -> ParameterType {
        self.kind
    }

    /// Returns the description, empty when none was given.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns `true` if callers must supply this parameter.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// Returns the allowed values, if restricted.
    #[must_use]
    pub fn allowed(&self) -> Option<&[Value]> {
        self.allowed.as_deref()
    }

    /// Returns the documented default value.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn check(&self, arguments: &Arguments) -> Result<(), ValidationError> {
        let value = match arguments.get(&self.name) {
            None | Some(Value::Null) if self.required => {
                return Err(ValidationError::MissingParameter {
                    name: self.name.clone(),
                });
            }
            None | Some(Value::Null) => return Ok(()),
            Some(value) => value,
        };

        if !self.kind.accepts(value) {
            return Err(ValidationError::TypeMismatch {
                name: self.name.clone(),
                expected: self.kind.to_string(),
                found: json_type_name(value).to_owned(),
            });
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                return Err(ValidationError::NotAllowed {
                    name: self.name.clone(),
                    value: value.to_string(),
                    allowed: Value::from(allowed.clone()).to_string(),
                });
            }
        }

        Ok(())
    }

    fn to_json_property(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".into(), Value::from(self.kind.as_str()));
        if !self.description.is_empty() {
            property.insert("description".into(), Value::from(self.description.clone()));
        }
        if let Some(allowed) = &self.allowed {
            property.insert("enum".into(), Value::from(allowed.clone()));
        }
        if let Some(default) = &self.default {
            property.insert("default".into(), default.clone());
        }
        Value::Object(property)
    }
}

/// Immutable description of a callable capability.
///
/// Decoding goes through [`ToolSchema::new`] and
/// [`ToolSchema::with_parameter`], so a deserialized schema upholds the same
/// invariants as one built in code.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(try_from = "RawToolSchema")]
pub struct ToolSchema {
    name: String,
    description: String,
    #[serde(default)]
    parameters: Vec<ParameterSchema>,
}

#[derive(Deserialize)]
struct RawToolSchema {
    name: String,
    description: String,
    #[serde(default)]
    parameters: Vec<ParameterSchema>,
}

impl TryFrom<RawToolSchema> for ToolSchema {
    type Error = ToolError;

    fn try_from(raw: RawToolSchema) -> ToolResult<Self> {
        raw.parameters
            .into_iter()
            .try_fold(Self::new(raw.name, raw.description)?, Self::with_parameter)
    }
}

impl ToolSchema {
    /// Creates a schema without parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSchema`] if the name or description is blank.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> ToolResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ToolError::invalid_schema("tool name cannot be empty"));
        }

        let description = description.into();
        if description.trim().is_empty() {
            return Err(ToolError::invalid_schema(format!(
                "tool `{name}` requires a description"
            )));
        }

        Ok(Self {
            name,
            description,
            parameters: Vec::new(),
        })
    }

    /// Appends a parameter declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidSchema`] if the parameter name is blank or
    /// already declared.
    pub fn with_parameter(mut self, parameter: ParameterSchema) -> ToolResult<Self> {
        if parameter.name.trim().is_empty() {
            return Err(ToolError::invalid_schema(format!(
                "tool `{}` declares a parameter without a name",
                self.name
            )));
        }
        if self.parameter(&parameter.name).is_some() {
            return Err(ToolError::invalid_schema(format!(
                "tool `{}` declares parameter `{}` twice",
                self.name, parameter.name
            )));
        }
        self.parameters.push(parameter);
        Ok(self)
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model-facing description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSchema] {
        &self.parameters
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSchema> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Checks arguments against the declared parameters.
    ///
    /// Undeclared extra arguments are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered in declaration order.
    pub fn validate(&self, arguments: &Arguments) -> Result<(), ValidationError> {
        self.parameters
            .iter()
            .try_for_each(|parameter| parameter.check(arguments))
    }

    /// Renders the JSON-schema object form presented to reasoning providers.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.to_json_property()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
