//! Osiris Build Descriptor
//!
//! The osiris descriptor module resolves declarative build descriptors of
//! Android application targets into concrete build plans. Descriptors are
//! what cross-platform toolchains (e.g., Flutter) keep next to their Android
//! platform integration: the list of Gradle plugins to activate, namespace
//! and SDK bounds, signing identities, build types, lint and compile
//! options, and dependency coordinates.
//!
//! Model
//! -----
//!
//! Some descriptor values are not known when the descriptor is written. SDK
//! levels and version numbers are usually supplied by the toolchain at build
//! time. Descriptors refer to those via symbolic references, which are
//! resolved against an explicit [environment](environment::Environment)
//! rather than looked up globally.
//!
//! Resolution is a pure, single-pass transform:
//!
//!  * [Parse](descriptor::Raw::parse_str) the TOML descriptor into raw types,
//!    refusing unknown keys in recognized blocks.
//!  * [Validate and resolve](resolve::resolve) the descriptor, failing on the
//!    first violation.
//!  * Emit the immutable [build plan](plan::BuildPlan), which can be
//!    serialized as JSON, emitted back as descriptor, or
//!    [rendered](gradle::render) as Gradle build script.
//!
//! The `osiris-descriptor` command-line tool wraps these steps and can
//! [emerge](op::emerge) the rendered build script into a platform
//! integration.

pub mod descriptor;
pub mod environment;
pub mod error;
pub mod gradle;
pub mod plan;
pub mod resolve;

/// Descriptor Operations
///
/// The `op` module is a collection of all operations with side-effects that
/// can be performed via the command-line interface. Each operation is
/// implemented in a submodule and can be used independently.
pub mod op {
    pub mod emerge;
}

pub use error::{ConfigError, ConfigErrorKind, Error};
pub use resolve::resolve;
