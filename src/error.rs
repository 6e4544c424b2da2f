//! Resolution Errors
//!
//! This module defines the errors raised while parsing, validating, and
//! resolving build descriptors. Resolution is fail-fast: every operation
//! reports exactly one error, the first violation it encounters.

use thiserror;
use toml;

/// Configuration Error Kinds
///
/// This is the exhaustive list of semantic violations a descriptor can
/// exhibit. Each kind is reported together with the dotted key of the
/// offending descriptor entry, see `ConfigError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// A symbolic reference has no binding in the environment.
    UnresolvedReference,
    /// A symbolic reference is bound to a value of the wrong type.
    MismatchedReference,
    /// The application ID is not a reverse-domain identifier.
    InvalidApplicationId,
    /// The `minSdk <= targetSdk <= compileSdk` ordering is violated.
    SdkVersionOrderViolation,
    /// A build type refers to an undeclared signing identity.
    UnknownSigningConfig,
    /// A dependency coordinate is not of the form `group:artifact[:version]`.
    InvalidCoordinate,
    /// Two dependencies share group and artifact but not their version.
    DuplicateDependency,
    /// A plugin is activated more than once.
    DuplicatePlugin,
    /// A recognized block contains an unknown key.
    UnknownKey,
    /// A required top-level block is missing.
    MissingKey,
    /// A string cannot be interpolated into generated build scripts.
    Unquotable,
}

impl ConfigErrorKind {
    /// Get string representation
    ///
    /// Return a short, human-readable description of the error kind. This is
    /// used as prefix when displaying a `ConfigError`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvedReference => "unresolved reference",
            Self::MismatchedReference => "mismatched reference",
            Self::InvalidApplicationId => "invalid application ID",
            Self::SdkVersionOrderViolation => "SDK version order violation",
            Self::UnknownSigningConfig => "unknown signing config",
            Self::InvalidCoordinate => "invalid dependency coordinate",
            Self::DuplicateDependency => "duplicate dependency",
            Self::DuplicatePlugin => "duplicate plugin",
            Self::UnknownKey => "unknown key",
            Self::MissingKey => "missing key",
            Self::Unquotable => "unquotable string",
        }
    }
}

/// Configuration Error
///
/// A semantic violation found in an otherwise well-formed descriptor. The
/// `key` names the offending entry, usually as a dotted descriptor path
/// (e.g., `android.default-config.application-id`). For unresolved
/// references, it is the reference key itself.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{}: {}", .kind.as_str(), .key)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub key: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, key: impl Into<String>) -> Self {
        Self {
            kind: kind,
            key: key.into(),
        }
    }
}

/// Resolution Errors
///
/// This is the exhaustive list of errors raised by the descriptor and
/// environment parsers, the resolver, and plan emission.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the file at the specified path failed with the given error.
    #[error("cannot read {0:?}: {1}")]
    Io(std::path::PathBuf, #[source] std::io::Error),
    /// Malformed descriptor or environment syntax.
    #[error("malformed input: {0}")]
    Parse(#[from] toml::de::Error),
    /// Malformed environment definition (not of the form `KEY=VALUE`).
    #[error("malformed definition: {0:?}")]
    Define(String),
    /// Semantic descriptor violation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Serializing a plan back into descriptor form failed.
    #[error("cannot emit descriptor: {0}")]
    Emit(#[from] toml::ser::Error),
    /// Serializing a plan as JSON failed.
    #[error("cannot emit JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Return Configuration Error Kind
    ///
    /// Return the kind of the embedded configuration error, or `None` if
    /// this is not a configuration error.
    pub fn config_kind(&self) -> Option<ConfigErrorKind> {
        match self {
            Self::Config(v) => Some(v.kind),
            _ => None,
        }
    }
}
