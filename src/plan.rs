//! Build Plan
//!
//! The build plan is the fully resolved, immutable output of the resolver. It
//! contains no symbolic references and is ready to be handed to an external
//! build executor, either serialized (e.g., as JSON) or rendered as native
//! build script via `crate::gradle`.
//!
//! A plan can be emitted back to descriptor form. Resolving the emitted
//! descriptor again yields an identical plan.

use serde;

use crate::descriptor;
use crate::error::Error;

/// Plugin Identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct PluginId(pub String);

/// Dependency Coordinate
///
/// A Maven-style coordinate `group:artifact[:version]`. Versionless
/// coordinates rely on a platform import to pick their version.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Coordinate {
    pub group: String,
    pub artifact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Resolved Dependency
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Dependency {
    pub configuration: String,
    pub coordinate: Coordinate,
    /// Whether this is a platform (bill-of-materials) import.
    pub platform: bool,
    /// The platform import constraining the version of a versionless
    /// dependency, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constrained_by: Option<Coordinate>,
}

/// Resolved Build Type
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildType {
    pub signing_config: Option<String>,
    pub minify_enabled: Option<bool>,
    pub shrink_resources: Option<bool>,
    pub debuggable: Option<bool>,
}

/// Resolved Signing Identity
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SigningConfig {
    pub store_file: Option<String>,
    pub store_password: Option<String>,
    pub key_alias: Option<String>,
    pub key_password: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Lint {
    pub disable: Vec<String>,
    pub check_release_builds: Option<bool>,
    pub abort_on_error: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompileOptions {
    pub source_compatibility: Option<String>,
    pub target_compatibility: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct KotlinOptions {
    pub jvm_target: Option<String>,
}

/// Configuration Warnings
///
/// Questionable, but valid configuration. Warnings never fail resolution,
/// they are recorded in the plan for the caller to surface.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ConfigWarning {
    /// A build type other than `debug` is signed with the debug identity.
    DebugSigning {
        #[serde(rename = "build-type")]
        build_type: String,
    },
    /// A versionless dependency is not constrained by any platform import.
    UnconstrainedVersion { coordinate: String },
}

/// Build Plan
///
/// The fully resolved build configuration. All fields are concrete.
///
/// Toolchain trailers may carry floats, hence the plan is `PartialEq` only.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildPlan {
    pub application_id: String,
    pub namespace: String,
    pub min_sdk: u32,
    pub target_sdk: u32,
    pub compile_sdk: u32,
    pub version_code: u32,
    pub version_name: String,
    pub multi_dex_enabled: bool,
    pub ndk_version: Option<String>,
    /// Plugins in activation order.
    pub plugins: Vec<PluginId>,
    /// Declared signing identities, including the implicit `debug` identity.
    pub signing_configs: std::collections::BTreeMap<String, SigningConfig>,
    pub build_types: std::collections::BTreeMap<String, BuildType>,
    pub lint: Lint,
    pub compile_options: CompileOptions,
    pub kotlin_options: KotlinOptions,
    /// Dependencies in declaration order.
    pub dependencies: Vec<Dependency>,
    /// Toolchain trailer blocks, passed through verbatim.
    pub toolchain: std::collections::BTreeMap<String, toml::Table>,
    pub warnings: Vec<ConfigWarning>,
}

impl PluginId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

// Check whether a string is a valid coordinate component
//
// Group and artifact IDs consist of ASCII alphanumerics plus `.`, `-`, `_`.
fn is_coordinate_component(s: &str) -> bool {
    !s.is_empty() && s.chars().all(
        |v| v.is_ascii_alphanumeric() || v == '.' || v == '-' || v == '_'
    )
}

impl Coordinate {
    /// Parse coordinate from string
    ///
    /// Parse a coordinate of the form `group:artifact` or
    /// `group:artifact:version`. Versions may contain any non-whitespace
    /// characters except `:`, which allows ranges like `[1.0,2.0)` or
    /// dynamic versions like `1.+`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(':');
        let group = parts.next()?;
        let artifact = parts.next()?;
        let version = parts.next();

        if parts.next().is_some()
            || !is_coordinate_component(group)
            || !is_coordinate_component(artifact)
        {
            return None;
        }

        if let Some(v) = version {
            if v.is_empty() || v.chars().any(|c| c.is_whitespace()) {
                return None;
            }
        }

        Some(Self {
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.map(|v| v.to_string()),
        })
    }

    /// Return whether `other` has the same group and artifact.
    pub fn same_module(&self, other: &Coordinate) -> bool {
        self.group == other.group && self.artifact == other.artifact
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}:{}:{}", self.group, self.artifact, v),
            None => write!(f, "{}:{}", self.group, self.artifact),
        }
    }
}

impl BuildPlan {
    /// Return debug-signed release variants
    ///
    /// Return the names of all build types, other than `debug`, that are
    /// signed with the debug identity.
    pub fn debug_signed_build_types(&self) -> impl Iterator<Item = &str> {
        self.build_types.iter()
            .filter(|(name, v)| {
                name.as_str() != "debug"
                    && v.signing_config.as_deref() == Some("debug")
            })
            .map(|(name, _)| name.as_str())
    }

    /// Convert to raw descriptor
    ///
    /// Produce a raw descriptor with every value given literally. The
    /// implicit `debug` signing identity is emitted only if it carries
    /// custom settings.
    pub fn to_raw(&self) -> descriptor::Raw {
        let signing_configs = self.signing_configs.iter()
            .filter(|(name, v)| name.as_str() != "debug" || **v != SigningConfig::default())
            .map(|(name, v)| {
                (
                    name.clone(),
                    descriptor::RawSigningConfig {
                        store_file: v.store_file.clone(),
                        store_password: v.store_password.clone(),
                        key_alias: v.key_alias.clone(),
                        key_password: v.key_password.clone(),
                    },
                )
            })
            .collect();

        let build_types = self.build_types.iter()
            .map(|(name, v)| {
                (
                    name.clone(),
                    descriptor::RawBuildType {
                        signing_config: v.signing_config.clone(),
                        minify_enabled: v.minify_enabled,
                        shrink_resources: v.shrink_resources,
                        debuggable: v.debuggable,
                    },
                )
            })
            .collect();

        let lint = descriptor::RawLint {
            disable: self.lint.disable.clone(),
            check_release_builds: self.lint.check_release_builds,
            abort_on_error: self.lint.abort_on_error,
        };

        let compile_options = descriptor::RawCompileOptions {
            source_compatibility: self.compile_options.source_compatibility.clone(),
            target_compatibility: self.compile_options.target_compatibility.clone(),
        };

        let kotlin_options = descriptor::RawKotlinOptions {
            jvm_target: self.kotlin_options.jvm_target.clone(),
        };

        descriptor::Raw {
            plugins: self.plugins.iter().map(|v| v.0.clone()).collect(),
            android: descriptor::RawAndroid {
                namespace: self.namespace.clone(),
                compile_sdk: descriptor::Value::Literal(self.compile_sdk),
                ndk_version: self.ndk_version.clone(),
                default_config: descriptor::RawDefaultConfig {
                    application_id: self.application_id.clone(),
                    min_sdk: self.min_sdk,
                    target_sdk: descriptor::Value::Literal(self.target_sdk),
                    version_code: descriptor::Value::Literal(self.version_code),
                    version_name: descriptor::Value::Literal(self.version_name.clone()),
                    multi_dex_enabled: self.multi_dex_enabled,
                },
                signing_configs: signing_configs,
                build_types: build_types,
                lint: (lint != Default::default()).then_some(lint),
                compile_options: (compile_options != Default::default()).then_some(compile_options),
                kotlin_options: (kotlin_options != Default::default()).then_some(kotlin_options),
            },
            dependencies: self.dependencies.iter()
                .map(|v| descriptor::RawDependency {
                    configuration: v.configuration.clone(),
                    coordinate: v.coordinate.to_string(),
                    platform: v.platform,
                })
                .collect(),
            toolchain: self.toolchain.clone(),
        }
    }

    /// Emit plan as descriptor
    ///
    /// Serialize the plan back into descriptor form. The emitted descriptor
    /// contains no symbolic references.
    pub fn to_descriptor(&self) -> Result<String, Error> {
        self.to_raw().to_toml_string()
    }

    /// Emit plan as JSON
    ///
    /// Serialize the plan as pretty-printed JSON for external build
    /// executors.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(Error::Json)
    }
}
