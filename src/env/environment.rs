#![allow(clippy::used_underscore_binding)]

use crate::InjectError;
use derive_more::Display;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::error::Error;
use tracing::{debug, trace};

/// An error raised while reading configuration.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum EnvironmentError {
    /// A configuration source could not be parsed.
    #[display(fmt = "invalid {} configuration: {}", format, message)]
    Parse {
        /// The format of the source.
        format: &'static str,
        /// What the parser reported.
        message: String,
    },

    /// A `${...}` placeholder names an unset property and has no default.
    #[display(fmt = "could not resolve placeholder ${{{}}}", placeholder)]
    UnresolvedPlaceholder {
        /// The contents of the placeholder.
        placeholder: String,
    },

    /// Resolving a placeholder led back to a property being resolved.
    #[display(fmt = "circular placeholder reference: {}", "chain.join(\" -> \")")]
    CircularPlaceholder {
        /// The property names on the cycle, starting and ending with the same
        /// name.
        chain: Vec<String>,
    },

    /// A property could not be deserialized into the requested type.
    #[display(fmt = "cannot bind property [{}]: {}", name, source)]
    Binding {
        /// The property key or prefix.
        name: String,
        /// The deserialization error.
        source: serde_json::Error,
    },
}

impl Error for EnvironmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EnvironmentError::Binding { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<EnvironmentError> for InjectError {
    fn from(error: EnvironmentError) -> Self {
        match error {
            EnvironmentError::UnresolvedPlaceholder { placeholder } => {
                InjectError::MissingProperty {
                    name: placeholder
                        .split_once(':')
                        .map_or(placeholder.as_str(), |(name, _)| name)
                        .to_owned(),
                }
            }
            EnvironmentError::Binding { .. }
            | EnvironmentError::Parse { .. }
            | EnvironmentError::CircularPlaceholder { .. } => {
                let name = match &error {
                    EnvironmentError::Binding { name, .. } => name.clone(),
                    EnvironmentError::CircularPlaceholder { chain } => {
                        chain.first().cloned().unwrap_or_default()
                    }
                    _ => String::new(),
                };
                InjectError::PropertyBinding {
                    name,
                    source: Box::new(error),
                }
            }
        }
    }
}

/// Read access to configuration properties.
pub trait PropertyResolver: Send + Sync {
    /// Whether the property `name` is set.
    fn contains_property(&self, name: &str) -> bool;

    /// The raw value of the property `name`.
    fn get_property(&self, name: &str) -> Option<Value>;

    /// The property `name` as text, with placeholders resolved.
    fn property_string(&self, name: &str) -> Result<Option<String>, EnvironmentError>;
}

/// The configuration of a context.
///
/// Properties form one tree addressed by dot-separated keys, so
/// `server.port` is the `port` entry of the `server` table. Sources are merged
/// into the tree in the order they are added, later values replacing earlier
/// ones. String values may refer to other properties with `${name}` or
/// `${name:default}`.
///
/// ```
/// use bean_context::Environment;
///
/// let environment = Environment::from_toml_str(
///     r#"
///     [server]
///     host = "localhost"
///     url = "http://${server.host}:${server.port:8080}"
///     "#,
/// )
/// .unwrap();
///
/// assert!(environment.contains_property("server.host"));
/// assert_eq!(
///     Some("http://localhost:8080".to_owned()),
///     environment.get_as::<String>("server.url").unwrap()
/// );
/// ```
#[derive(Default, Debug)]
pub struct Environment {
    names: Vec<String>,
    properties: RwLock<Value>,
}

impl Environment {
    /// Creates an environment without properties or active names.
    #[must_use]
    pub fn new() -> Self {
        Environment::default()
    }

    /// Creates an environment from a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, EnvironmentError> {
        let environment = Environment::new();
        environment.add_json_str(source)?;
        Ok(environment)
    }

    /// Creates an environment from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, EnvironmentError> {
        let environment = Environment::new();
        environment.add_toml_str(source)?;
        Ok(environment)
    }

    /// Activates the environment `name`.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
        self
    }

    /// Merges every process environment variable starting with `prefix_`.
    /// `APP_SERVER_PORT=80` with prefix `APP` sets `server.port` to `"80"`.
    #[must_use]
    pub fn with_env_vars(self, prefix: &str) -> Self {
        self.add_variables(prefix, std::env::vars());
        self
    }

    fn add_variables(&self, prefix: &str, variables: impl IntoIterator<Item = (String, String)>) {
        let prefix = format!("{}_", prefix.to_ascii_uppercase());
        for (key, value) in variables {
            if let Some(key) = key.strip_prefix(&prefix) {
                let name = key.to_ascii_lowercase().replace('_', ".");
                trace!(%name, "property set from environment variable");
                self.set_property(&name, Value::String(value));
            }
        }
    }

    /// Merges a JSON document into the properties.
    pub fn add_json_str(&self, source: &str) -> Result<(), EnvironmentError> {
        let value: Value = serde_json::from_str(source).map_err(|error| {
            EnvironmentError::Parse {
                format: "JSON",
                message: error.to_string(),
            }
        })?;
        self.merge(value);
        Ok(())
    }

    /// Merges a TOML document into the properties.
    pub fn add_toml_str(&self, source: &str) -> Result<(), EnvironmentError> {
        let table: toml::Table =
            source.parse().map_err(|error: toml::de::Error| EnvironmentError::Parse {
                format: "TOML",
                message: error.to_string(),
            })?;
        let value = serde_json::to_value(table).map_err(|error| {
            EnvironmentError::Parse {
                format: "TOML",
                message: error.to_string(),
            }
        })?;
        self.merge(value);
        Ok(())
    }

    /// Merges a property tree into the properties.
    pub fn merge(&self, value: Value) {
        let mut properties = self.properties.write();
        merge_into(&mut properties, value);
        debug!("merged configuration source");
    }

    /// The active environment names.
    #[must_use]
    pub fn active_names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is an active environment name.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.names.iter().any(|active| active == name)
    }

    /// Sets the property `name`, creating the tables on its path.
    pub fn set_property(&self, name: &str, value: impl Into<Value>) {
        let mut properties = self.properties.write();
        let mut current = &mut *properties;
        for part in name.split('.') {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = match current {
                Value::Object(table) => {
                    table.entry(part.to_owned()).or_insert(Value::Null)
                }
                _ => return,
            };
        }
        *current = value.into();
    }

    /// Whether the property `name` is set.
    #[must_use]
    pub fn contains_property(&self, name: &str) -> bool {
        lookup(&self.properties.read(), name).map_or(false, |value| !value.is_null())
    }

    /// The raw value of the property `name`.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<Value> {
        lookup(&self.properties.read(), name)
            .filter(|value| !value.is_null())
            .cloned()
    }

    /// The property `name` converted to `T`. Placeholders in strings are
    /// resolved first, and strings are parsed when `T` is not a string.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, EnvironmentError> {
        let Some(value) = self.get_property(name) else {
            return Ok(None);
        };
        let value = self.resolve_value(value)?;
        convert_value(name, value).map(Some)
    }

    /// The property `name` as text. Tables and arrays are rendered as JSON.
    pub fn property_string(&self, name: &str) -> Result<Option<String>, EnvironmentError> {
        match self.get_property(name) {
            None => Ok(None),
            Some(Value::String(text)) => self.resolve_placeholders(&text).map(Some),
            Some(value) => Ok(Some(value.to_string())),
        }
    }

    /// The keys of the table at `prefix`, in sorted order.
    #[must_use]
    pub fn child_keys(&self, prefix: &str) -> Vec<String> {
        match lookup(&self.properties.read(), prefix) {
            Some(Value::Object(table)) => table.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Binds the table at `prefix` to `T`. A missing table binds as an empty
    /// one, so types whose fields all have defaults still bind.
    pub fn bind<T: DeserializeOwned>(&self, prefix: &str) -> Result<T, EnvironmentError> {
        let value = self
            .get_property(prefix)
            .unwrap_or_else(|| Value::Object(Map::new()));
        let value = self.resolve_value(value)?;
        convert_value(prefix, value)
    }

    /// Replaces every `${name}` and `${name:default}` in `text`. Properties
    /// whose values contain placeholders are resolved in turn.
    pub fn resolve_placeholders(&self, text: &str) -> Result<String, EnvironmentError> {
        self.resolve_nested(text, &mut Vec::new())
    }

    /// `resolving` holds the names whose values are being resolved.
    fn resolve_nested(
        &self,
        text: &str,
        resolving: &mut Vec<String>,
    ) -> Result<String, EnvironmentError> {
        let mut resolved = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            resolved.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                return Err(EnvironmentError::UnresolvedPlaceholder {
                    placeholder: after.to_owned(),
                });
            };

            let placeholder = &after[..end];
            let (name, default) = match placeholder.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (placeholder, None),
            };
            match (self.get_property(name), default) {
                (Some(Value::String(value)), _) => {
                    if resolving.iter().any(|known| known == name) {
                        let mut chain = resolving.clone();
                        chain.push(name.to_owned());
                        return Err(EnvironmentError::CircularPlaceholder { chain });
                    }
                    resolving.push(name.to_owned());
                    let value = self.resolve_nested(&value, resolving);
                    resolving.pop();
                    resolved.push_str(&value?);
                }
                (Some(value), _) => resolved.push_str(&value.to_string()),
                (None, Some(default)) => resolved.push_str(default),
                (None, None) => {
                    return Err(EnvironmentError::UnresolvedPlaceholder {
                        placeholder: placeholder.to_owned(),
                    });
                }
            }
            rest = &after[end + 1..];
        }
        resolved.push_str(rest);
        Ok(resolved)
    }

    fn resolve_value(&self, value: Value) -> Result<Value, EnvironmentError> {
        Ok(match value {
            Value::String(text) if text.contains("${") => {
                Value::String(self.resolve_placeholders(&text)?)
            }
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.resolve_value(item))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(table) => Value::Object(
                table
                    .into_iter()
                    .map(|(key, item)| Ok((key, self.resolve_value(item)?)))
                    .collect::<Result<_, EnvironmentError>>()?,
            ),
            value => value,
        })
    }
}

impl PropertyResolver for Environment {
    fn contains_property(&self, name: &str) -> bool {
        Environment::contains_property(self, name)
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        Environment::get_property(self, name)
    }

    fn property_string(&self, name: &str) -> Result<Option<String>, EnvironmentError> {
        Environment::property_string(self, name)
    }
}

fn lookup<'a>(root: &'a Value, name: &str) -> Option<&'a Value> {
    if name.is_empty() {
        return Some(root);
    }
    name.split('.').try_fold(root, |value, part| value.get(part))
}

fn merge_into(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Strings that do not deserialize as `T` are parsed as JSON scalars, so
/// `"8080"` binds to a number.
fn convert_value<T: DeserializeOwned>(name: &str, value: Value) -> Result<T, EnvironmentError> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(converted) => Ok(converted),
        Err(source) => match &value {
            Value::String(text) => serde_json::from_str::<T>(text).map_err(|_| {
                EnvironmentError::Binding {
                    name: name.to_owned(),
                    source,
                }
            }),
            _ => Err(EnvironmentError::Binding {
                name: name.to_owned(),
                source,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn sources_merge_in_order() {
        let environment =
            Environment::from_json_str(r#"{"db": {"url": "a", "pool": 4}}"#).unwrap();
        environment.add_toml_str("[db]\nurl = \"b\"").unwrap();

        assert_eq!(Some("b".to_owned()), environment.get_as("db.url").unwrap());
        assert_eq!(Some(4_u32), environment.get_as("db.pool").unwrap());
    }

    #[test]
    fn set_property_creates_tables() {
        let environment = Environment::new();
        environment.set_property("things.foo.x", 1);
        environment.set_property("things.bar.x", 2);

        assert_eq!(vec!["bar", "foo"], environment.child_keys("things"));
        assert!(environment.contains_property("things.foo"));
        assert!(!environment.contains_property("things.baz"));
        assert!(environment.child_keys("things.foo.x").is_empty());
    }

    #[test]
    fn placeholders_resolve_with_defaults() {
        let environment = Environment::new();
        environment.set_property("host", "example.org");

        assert_eq!(
            "https://example.org:443/",
            environment
                .resolve_placeholders("https://${host}:${port:443}/")
                .unwrap()
        );
        match environment.resolve_placeholders("${missing}") {
            Err(EnvironmentError::UnresolvedPlaceholder { placeholder }) => {
                assert_eq!("missing", placeholder);
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn circular_placeholders_are_reported() {
        let environment = Environment::from_toml_str("a = \"${b}\"\nb = \"x-${a}\"").unwrap();

        match environment.resolve_placeholders("${a}") {
            Err(EnvironmentError::CircularPlaceholder { chain }) => {
                assert_eq!(vec!["a", "b", "a"], chain);
            }
            result => panic!("unexpected result: {result:?}"),
        }

        // The same property may appear twice without a cycle.
        environment.set_property("c", "${d}-${d}");
        environment.set_property("d", "z");
        assert_eq!("z-z", environment.resolve_placeholders("${c}").unwrap());
    }

    #[test]
    fn strings_bind_to_numbers() {
        let environment = Environment::new();
        environment.add_variables(
            "app",
            vec![
                ("APP_SERVER_PORT".to_owned(), "8080".to_owned()),
                ("OTHER_VALUE".to_owned(), "1".to_owned()),
            ],
        );

        assert_eq!(Some(8080_u16), environment.get_as("server.port").unwrap());
        assert!(!environment.contains_property("other.value"));
        assert_eq!(
            Some("8080".to_owned()),
            environment.property_string("server.port").unwrap()
        );
    }

    #[test]
    fn tables_bind_to_structs() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Pool {
            size: u32,
            #[serde(default)]
            name: String,
        }

        let environment = Environment::from_toml_str("[pool]\nsize = 3").unwrap();
        assert_eq!(
            Pool {
                size: 3,
                name: String::new(),
            },
            environment.bind::<Pool>("pool").unwrap()
        );

        match environment.bind::<Pool>("missing") {
            Err(EnvironmentError::Binding { name, .. }) => assert_eq!("missing", name),
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn active_names_are_unique() {
        let environment = Environment::new().with_name("test").with_name("test");
        assert_eq!(&["test".to_owned()], environment.active_names());
        assert!(environment.is_active("test"));
        assert!(!environment.is_active("prod"));
    }
}
