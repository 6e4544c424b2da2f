//! Toolchain Environment
//!
//! Symbolic references in a descriptor are resolved against an environment of
//! bindings supplied by the external toolchain. A Flutter toolchain, for
//! instance, provides `flutter.compileSdkVersion` or `flutter.versionCode`,
//! usually via `local.properties`.
//!
//! The environment is plain data. It can be assembled from TOML files,
//! Java-style properties files, and `KEY=VALUE` definitions, with later
//! sources overriding earlier ones. Looking up references never touches the
//! process environment or the file-system.

use serde;
use toml;

use crate::descriptor::Reference;
use crate::error::Error;

/// Environment Binding
///
/// The concrete value bound to a reference key. Properties files carry no
/// type information, hence integer fields also accept strings that parse as
/// integers.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Binding {
    Integer(i64),
    String(String),
}

/// Environment Abstraction
///
/// A set of bindings, keyed by their full dotted key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Environment {
    bindings: std::collections::BTreeMap<String, Binding>,
}

impl Binding {
    /// Return as SDK/version integer
    ///
    /// Return the binding as unsigned 32-bit integer, or `None` if it is out
    /// of range or not an integer.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Integer(v) => u32::try_from(*v).ok(),
            Self::String(v) => v.trim().parse::<u32>().ok(),
        }
    }

    /// Return as string
    ///
    /// Return the binding as string. Integers are rendered in decimal.
    pub fn as_string(&self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::String(v) => v.clone(),
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Default::default()
    }

    /// Bind a key, replacing any previous binding.
    pub fn bind(&mut self, key: &str, binding: Binding) {
        self.bindings.insert(key.to_string(), binding);
    }

    /// Builder-style variant of `bind()`.
    pub fn with(mut self, key: &str, binding: Binding) -> Self {
        self.bind(key, binding);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Binding> {
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Merge another environment into this one
    ///
    /// Bindings of `other` take precedence over existing bindings.
    pub fn extend(&mut self, other: Environment) {
        self.bindings.extend(other.bindings);
    }

    /// Look up a reference
    ///
    /// Look up the binding of the given reference. The full key is tried
    /// first, then the unscoped name. Hence, `flutter.versionCode` is bound
    /// by either `flutter.versionCode` or `versionCode`.
    pub fn lookup(&self, reference: &Reference) -> Option<&Binding> {
        self.bindings.get(reference.key.as_str())
            .or_else(|| self.bindings.get(reference.name()))
    }

    // Flatten a TOML table into dotted bindings
    //
    // Nested tables contribute their keys prefixed with the table path.
    // Booleans and floats are bound in their TOML string representation;
    // arrays and datetimes are refused.
    fn flatten_toml(
        &mut self,
        prefix: &str,
        table: &toml::Table,
    ) -> Result<(), Error> {
        for (key, value) in table.iter() {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };

            match value {
                toml::Value::Table(v) => self.flatten_toml(&path, v)?,
                toml::Value::Integer(v) => self.bind(&path, Binding::Integer(*v)),
                toml::Value::String(v) => self.bind(&path, Binding::String(v.clone())),
                toml::Value::Boolean(v) => self.bind(&path, Binding::String(v.to_string())),
                toml::Value::Float(v) => self.bind(&path, Binding::String(v.to_string())),
                toml::Value::Array(_) | toml::Value::Datetime(_) => {
                    return Err(Error::Define(path));
                },
            }
        }

        Ok(())
    }

    /// Parse environment from TOML
    ///
    /// Parse the given string as TOML table. Nested tables are flattened
    /// into dotted keys, so `[flutter] versionCode = 1` binds
    /// `flutter.versionCode`.
    pub fn parse_toml_str(content: &str) -> Result<Self, Error> {
        let table = content.parse::<toml::Table>().map_err(Error::Parse)?;
        let mut env = Self::new();

        env.flatten_toml("", &table)?;
        Ok(env)
    }

    /// Parse environment from properties
    ///
    /// Parse the given string as Java-style properties file, as written by
    /// the Flutter toolchain into `local.properties`. Every non-empty line
    /// not starting with `#` or `!` must be of the form `key=value` or
    /// `key: value`. Whitespace around keys and values is stripped, values
    /// are bound as strings. Escape sequences and line continuations are not
    /// supported.
    pub fn parse_properties_str(content: &str) -> Result<Self, Error> {
        let mut env = Self::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let (key, value) = line.split_once(|c: char| c == '=' || c == ':')
                .ok_or_else(|| Error::Define(line.to_string()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::Define(line.to_string()));
            }

            env.bind(key, Binding::String(value.trim().to_string()));
        }

        Ok(env)
    }

    /// Parse environment from file-system
    ///
    /// Open the specified file and parse it as environment. Files with the
    /// `.properties` extension are parsed as properties, anything else as
    /// TOML.
    pub fn parse_path(path: &std::path::Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|v| Error::Io(path.to_path_buf(), v))?;

        if path.extension().map_or(false, |v| v == "properties") {
            Self::parse_properties_str(&content)
        } else {
            Self::parse_toml_str(&content)
        }
    }

    /// Apply a definition
    ///
    /// Bind a single `KEY=VALUE` definition, as given on the command-line.
    /// The value is bound verbatim as string. Integer fields convert it on
    /// lookup.
    pub fn define(&mut self, definition: &str) -> Result<(), Error> {
        match definition.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                self.bind(key.trim(), Binding::String(value.to_string()));
                Ok(())
            },
            _ => Err(Error::Define(definition.to_string())),
        }
    }
}
