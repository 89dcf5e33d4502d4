use crate::tool::{ParamType, Tool, ToolDefinition};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A registered tool together with the definition captured at registration.
#[derive(Clone)]
pub struct RegisteredTool {
    definition: ToolDefinition,
    tool: Arc<dyn Tool>,
}

impl RegisteredTool {
    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    pub fn tool(&self) -> Arc<dyn Tool> {
        self.tool.clone()
    }
}

/// Manages available tools, their schemas, and lookup.
/// Registration order is preserved so the model always sees the same tool list.
pub struct ToolRegistry {
    tools: IndexMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: IndexMap::new(),
        }
    }

    /// Register a tool. Returns error if name already registered.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let definition = tool.definition();
        if self.tools.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateName(definition.name));
        }
        self.tools.insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                tool: Arc::new(tool),
            },
        );
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// List all registered tool definitions (for sending to the model).
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition.clone()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Check `arguments` against the tool's declared parameters.
    ///
    /// `null` is treated as an empty object and optional parameters given as
    /// `null` are dropped. Undeclared parameters are rejected.
    pub fn validate(
        definition: &ToolDefinition,
        arguments: &Value,
    ) -> Result<ValidatedArguments, ValidationError> {
        let mut values = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => return Err(ValidationError::NotAnObject(json_type(other))),
        };

        if let Some(unknown) = values
            .keys()
            .find(|key| definition.parameter(key).is_none())
        {
            return Err(ValidationError::UnknownParameter(unknown.clone()));
        }

        values.retain(|_, v| !v.is_null());

        for param in &definition.parameters {
            match values.get(&param.name) {
                None if param.required => {
                    return Err(ValidationError::MissingParameter(param.name.clone()));
                }
                None => {}
                Some(value) if !param.kind.matches(value) => {
                    return Err(ValidationError::TypeMismatch {
                        name: param.name.clone(),
                        expected: param.kind,
                        actual: json_type(value),
                    });
                }
                Some(_) => {}
            }
        }

        Ok(ValidatedArguments { values })
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments that passed [`ToolRegistry::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArguments {
    values: Map<String, Value>,
}

impl ValidatedArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserialize into the tool's typed argument struct.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| ValidationError::Shape(e.to_string()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool with name '{0}' is already registered")]
    DuplicateName(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("missing required parameter \"{0}\"")]
    MissingParameter(String),
    #[error("unknown parameter \"{0}\"")]
    UnknownParameter(String),
    #[error("parameter \"{name}\" must be a {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ParamType,
        actual: &'static str,
    },
    #[error("{0}")]
    Shape(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Parameter, ToolError};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;

    struct ShortyStub;

    #[async_trait]
    impl Tool for ShortyStub {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "createShorty".to_string(),
                description: "Creates a new short link".to_string(),
                parameters: vec![
                    Parameter::required("slug", ParamType::String, "slug"),
                    Parameter::required("url", ParamType::String, "url"),
                    Parameter::optional("override", ParamType::Boolean, "override"),
                    Parameter::optional("ttl", ParamType::Number, "ttl"),
                ],
            }
        }

        async fn execute(&self, _args: ValidatedArguments) -> Result<String, ToolError> {
            Ok("{}".to_string())
        }
    }

    fn definition() -> ToolDefinition {
        ShortyStub.definition()
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(ShortyStub).unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("createShorty").is_some());
        assert!(registry.resolve("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ToolRegistry::new();
        registry.register(ShortyStub).unwrap();
        assert!(matches!(
            registry.register(ShortyStub),
            Err(RegistryError::DuplicateName(name)) if name == "createShorty"
        ));
    }

    #[test]
    fn test_list_definitions() {
        let mut registry = ToolRegistry::new();
        registry.register(ShortyStub).unwrap();

        let defs = registry.list();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "createShorty");
    }

    #[test]
    fn test_validate_accepts_required_and_optional() {
        let args = ToolRegistry::validate(
            &definition(),
            &json!({"slug": "ex", "url": "https://example.com", "override": true, "ttl": 60}),
        )
        .unwrap();
        assert_eq!(args.get("override"), Some(&json!(true)));
    }

    #[test]
    fn test_validate_missing_required() {
        let err = ToolRegistry::validate(&definition(), &json!({"slug": "ex"})).unwrap_err();
        assert_eq!(err, ValidationError::MissingParameter("url".into()));
        assert_eq!(err.to_string(), "missing required parameter \"url\"");
    }

    #[test]
    fn test_validate_null_required_is_missing() {
        let err = ToolRegistry::validate(&definition(), &json!({"slug": "ex", "url": null}))
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingParameter("url".into()));
    }

    #[test]
    fn test_validate_boolean_is_not_string() {
        let err = ToolRegistry::validate(
            &definition(),
            &json!({"slug": "ex", "url": "https://example.com", "override": "true"}),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                name: "override".into(),
                expected: ParamType::Boolean,
                actual: "string",
            }
        );
    }

    #[test]
    fn test_validate_rejects_unknown_and_non_object() {
        assert_eq!(
            ToolRegistry::validate(
                &definition(),
                &json!({"slug": "ex", "url": "https://example.com", "extra": 1})
            )
            .unwrap_err(),
            ValidationError::UnknownParameter("extra".into())
        );
        assert_eq!(
            ToolRegistry::validate(&definition(), &json!(["ex"])).unwrap_err(),
            ValidationError::NotAnObject("array")
        );
    }

    #[test]
    fn test_validate_null_arguments_with_no_required() {
        let def = ToolDefinition {
            name: "noop".into(),
            description: "no params".into(),
            parameters: vec![],
        };
        let args = ToolRegistry::validate(&def, &Value::Null).unwrap();
        assert_eq!(args.into_value(), json!({}));
    }

    #[test]
    fn test_parse_typed_arguments() {
        #[derive(Deserialize)]
        struct Args {
            slug: String,
            #[serde(default, rename = "override")]
            override_existing: bool,
        }

        let args = ToolRegistry::validate(
            &definition(),
            &json!({"slug": "ex", "url": "https://example.com", "override": null}),
        )
        .unwrap();
        let parsed: Args = args.parse().unwrap();
        assert_eq!(parsed.slug, "ex");
        assert!(!parsed.override_existing);
    }
}
