//! Build Descriptor
//!
//! This is a rust implementation of the Osiris Build Descriptor Format. A
//! descriptor is the declarative, human-authored build configuration of an
//! Android application target. It is a TOML-formatted file with the following
//! blocks:
//!
//! ```toml
//! plugins = ["com.android.application", "dev.flutter.flutter-gradle-plugin"]
//!
//! [android]
//! namespace = "com.example.foody"
//! compile-sdk = { ref = "flutter.compileSdkVersion" }
//!
//! [android.default-config]
//! application-id = "com.example.foody"
//! min-sdk = 23
//! target-sdk = { ref = "flutter.targetSdkVersion" }
//! version-code = { ref = "flutter.versionCode" }
//! version-name = { ref = "flutter.versionName" }
//! multi-dex-enabled = true
//!
//! [android.build-types.release]
//! signing-config = "debug"
//!
//! [[dependencies]]
//! coordinate = "com.google.firebase:firebase-bom:32.7.2"
//! platform = true
//!
//! [toolchain.flutter]
//! source = "../.."
//! ```
//!
//! Values of the form `{ ref = "..." }` are symbolic references. They are not
//! interpreted by the descriptor parser, but resolved against a toolchain
//! environment by the resolver.
//!
//! The `plugins`, `android`, and `dependencies` blocks are required, as is at
//! least one `toolchain.<name>` trailer block, which carries settings for the
//! toolchain that owns the platform integration.
//!
//! Unknown top-level keys are ignored, so future versions can add blocks
//! without breaking older parsers. Unknown keys inside a recognized block are
//! refused, including keys next to `ref` in a reference. The content of
//! toolchain blocks is opaque to the parser.

use serde;
use toml;

use crate::error::{ConfigError, ConfigErrorKind, Error};

const KEYS_REQUIRED: &[&str] = &["plugins", "android", "dependencies", "toolchain"];

const KEYS_ANDROID: &[&str] = &[
    "namespace",
    "compile-sdk",
    "ndk-version",
    "default-config",
    "signing-configs",
    "build-types",
    "lint",
    "compile-options",
    "kotlin-options",
];

const KEYS_DEFAULT_CONFIG: &[&str] = &[
    "application-id",
    "min-sdk",
    "target-sdk",
    "version-code",
    "version-name",
    "multi-dex-enabled",
];

const KEYS_SIGNING_CONFIG: &[&str] = &[
    "store-file",
    "store-password",
    "key-alias",
    "key-password",
];

const KEYS_BUILD_TYPE: &[&str] = &[
    "signing-config",
    "minify-enabled",
    "shrink-resources",
    "debuggable",
];

const KEYS_LINT: &[&str] = &["disable", "check-release-builds", "abort-on-error"];
const KEYS_COMPILE_OPTIONS: &[&str] = &["source-compatibility", "target-compatibility"];
const KEYS_KOTLIN_OPTIONS: &[&str] = &["jvm-target"];
const KEYS_DEPENDENCY: &[&str] = &["configuration", "coordinate", "platform"];
const KEYS_REFERENCE: &[&str] = &["ref"];

fn default_configuration() -> String {
    "implementation".to_string()
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Symbolic Reference
///
/// A named placeholder whose concrete value is supplied by the toolchain
/// environment at resolve time. The key is usually scoped by the toolchain
/// that provides it, as in `flutter.versionCode`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    #[serde(rename = "ref")]
    pub key: String,
}

/// Deferred Value
///
/// A descriptor value that is either given literally, or deferred to the
/// environment via a symbolic reference. In descriptor syntax, literals are
/// plain TOML values, references are inline tables `{ ref = "<key>" }`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Value<T> {
    Literal(T),
    Reference(Reference),
}

/// Raw Default-Config Table
///
/// Sub-type of `RawAndroid` with the configuration shared by all build
/// types.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawDefaultConfig {
    /// Application ID in reverse-domain notation. Used to identify the
    /// application on devices and in stores.
    pub application_id: String,
    pub min_sdk: u32,
    pub target_sdk: Value<u32>,
    pub version_code: Value<u32>,
    pub version_name: Value<String>,
    #[serde(default)]
    pub multi_dex_enabled: bool,
}

/// Raw Signing-Config Table
///
/// A signing identity used to sign packaged artifacts. The `debug` identity
/// is always implicitly declared and refers to the debug keystore of the
/// Android SDK.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawSigningConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_password: Option<String>,
}

/// Raw Build-Type Table
///
/// Per-variant overrides. Unset options are left to the defaults of the
/// build executor.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawBuildType {
    /// Name of the signing identity to sign this variant with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shrink_resources: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debuggable: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawLint {
    /// Lint checks to suppress.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disable: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_release_builds: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_on_error: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawCompileOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_compatibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_compatibility: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawKotlinOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jvm_target: Option<String>,
}

/// Raw Android Table
///
/// The `android` block of a descriptor. The options in this table are
/// one-to-one mappings of their equivalents in the Android Gradle Plugin.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawAndroid {
    pub namespace: String,
    pub compile_sdk: Value<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,

    pub default_config: RawDefaultConfig,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub signing_configs: std::collections::BTreeMap<String, RawSigningConfig>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub build_types: std::collections::BTreeMap<String, RawBuildType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<RawLint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_options: Option<RawCompileOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kotlin_options: Option<RawKotlinOptions>,
}

/// Raw Dependency Entry
///
/// A dependency declaration. The coordinate is of the form
/// `group:artifact[:version]`. Platform entries are bill-of-materials
/// imports, which constrain the versions of sibling dependencies rather
/// than contributing code.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawDependency {
    /// Gradle configuration to add the dependency to.
    #[serde(default = "default_configuration")]
    pub configuration: String,
    pub coordinate: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub platform: bool,
}

/// Raw Descriptor Content
///
/// This type contains the raw descriptor content as parsed by `toml` and
/// converted into rust types via `serde`.
///
/// Note that content of the type is only verified for syntactic correctness
/// and unknown keys. Semantic correctness is verified by the resolver.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Raw {
    /// Plugins to activate, in activation order.
    pub plugins: Vec<String>,
    pub android: RawAndroid,
    /// Dependency declarations, in declaration order.
    pub dependencies: Vec<RawDependency>,
    /// Toolchain-specific trailer blocks, keyed by toolchain name. At least
    /// one is required.
    pub toolchain: std::collections::BTreeMap<String, toml::Table>,
}

impl Reference {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }

    /// Return unscoped reference name
    ///
    /// Return the part of the key following the toolchain scope, or the full
    /// key if it is unscoped. For `flutter.versionCode` this is
    /// `versionCode`.
    pub fn name(&self) -> &str {
        match self.key.split_once('.') {
            Some((_, v)) => v,
            None => self.key.as_str(),
        }
    }
}

impl<T> Value<T> {
    /// Return the literal, or `None` if this is a reference.
    pub fn literal(&self) -> Option<&T> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Reference(_) => None,
        }
    }

    /// Return the reference, or `None` if this is a literal.
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Literal(_) => None,
            Self::Reference(v) => Some(v),
        }
    }
}

// Verify a block contains only known keys
//
// Fail with `UnknownKey` on the first key (in lexicographic order) of `table`
// that is not listed in `known`. The error carries the full dotted path.
fn check_keys(
    table: &toml::Table,
    path: &str,
    known: &[&str],
) -> Result<(), ConfigError> {
    match table.keys().find(|v| !known.contains(&v.as_str())) {
        Some(v) => Err(ConfigError::new(
            ConfigErrorKind::UnknownKey,
            format!("{}.{}", path, v),
        )),
        None => Ok(()),
    }
}

// Verify a map of named blocks
//
// Run `check_keys()` on every table-valued entry of the map at `key`. Entries
// of the wrong type are left to the deserializer to report.
fn check_named_blocks(
    table: &toml::Table,
    path: &str,
    key: &str,
    known: &[&str],
) -> Result<(), ConfigError> {
    if let Some(map) = table.get(key).and_then(|v| v.as_table()) {
        for (name, block) in map.iter() {
            if let Some(block) = block.as_table() {
                check_keys(block, &format!("{}.{}.{}", path, key, name), known)?;
            }
        }
    }

    Ok(())
}

// Verify a reference table
//
// If the value at `key` is given as reference, make sure it carries nothing
// but the `ref` key. Literals are left to the deserializer.
fn check_reference(
    table: &toml::Table,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    match table.get(key).and_then(|v| v.as_table()) {
        Some(v) => check_keys(v, &format!("{}.{}", path, key), KEYS_REFERENCE),
        None => Ok(()),
    }
}

impl Raw {
    // Verify the block structure of a descriptor table
    //
    // This checks for required top-level blocks and unknown keys inside of
    // recognized blocks. Type mismatches are ignored here, since they are
    // reported by the deserializer with better context.
    fn check_table(table: &toml::Table) -> Result<(), ConfigError> {
        for key in KEYS_REQUIRED {
            if !table.contains_key(*key) {
                return Err(ConfigError::new(ConfigErrorKind::MissingKey, *key));
            }
        }

        // An empty trailer is as good as none.
        if table.get("toolchain").and_then(|v| v.as_table()).map_or(false, |v| v.is_empty()) {
            return Err(ConfigError::new(ConfigErrorKind::MissingKey, "toolchain"));
        }

        if let Some(android) = table.get("android").and_then(|v| v.as_table()) {
            check_keys(android, "android", KEYS_ANDROID)?;

            let blocks: [(&str, &[&str]); 4] = [
                ("default-config", KEYS_DEFAULT_CONFIG),
                ("lint", KEYS_LINT),
                ("compile-options", KEYS_COMPILE_OPTIONS),
                ("kotlin-options", KEYS_KOTLIN_OPTIONS),
            ];
            for (key, known) in blocks {
                if let Some(v) = android.get(key).and_then(|v| v.as_table()) {
                    check_keys(v, &format!("android.{}", key), known)?;
                }
            }

            check_named_blocks(android, "android", "signing-configs", KEYS_SIGNING_CONFIG)?;
            check_named_blocks(android, "android", "build-types", KEYS_BUILD_TYPE)?;

            check_reference(android, "android", "compile-sdk")?;
            if let Some(v) = android.get("default-config").and_then(|v| v.as_table()) {
                for key in ["target-sdk", "version-code", "version-name"] {
                    check_reference(v, "android.default-config", key)?;
                }
            }
        }

        if let Some(dependencies) = table.get("dependencies").and_then(|v| v.as_array()) {
            for (i, v) in dependencies.iter().enumerate() {
                if let Some(v) = v.as_table() {
                    check_keys(v, &format!("dependencies[{}]", i), KEYS_DEPENDENCY)?;
                }
            }
        }

        Ok(())
    }

    fn parse_toml(table: toml::Table) -> Result<Self, Error> {
        Self::check_table(&table)?;
        <Self as serde::Deserialize>::deserialize(table)
            .map_err(Error::Parse)
    }

    /// Parse descriptor from string
    ///
    /// Parse the given string as a literal descriptor in TOML representation.
    /// Syntax, types, and the block structure are verified. Symbolic
    /// references are left untouched.
    pub fn parse_str(content: &str) -> Result<Self, Error> {
        content.parse::<toml::Table>()
            .map_err(Error::Parse)
            .and_then(Self::parse_toml)
    }

    /// Parse descriptor from file-system
    ///
    /// Open the specified file and parse it as a descriptor. The file is
    /// completely read into memory and then closed again before parsing.
    pub fn parse_path(path: &std::path::Path) -> Result<Self, Error> {
        std::fs::read_to_string(path)
            .map_err(|v| Error::Io(path.to_path_buf(), v))
            .and_then(|v| Self::parse_str(&v))
    }

    /// Emit descriptor as string
    ///
    /// Serialize the descriptor back into its TOML representation. Parsing
    /// the result yields an equivalent descriptor.
    pub fn to_toml_string(&self) -> Result<String, Error> {
        toml::to_string(self).map_err(Error::Emit)
    }

    /// Find toolchain trailer
    ///
    /// Return the trailer block of the given toolchain, if declared.
    pub fn toolchain_by_name(&self, name: &str) -> Option<&toml::Table> {
        self.toolchain.get(name)
    }
}
