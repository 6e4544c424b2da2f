//! Descriptor Resolution
//!
//! The resolver turns descriptor text plus a toolchain environment into a
//! `BuildPlan`. It is a pure function: no I/O is performed, and resolving the
//! same inputs always yields the same result.
//!
//! Validation is ordered and fail-fast. The first violation is reported and
//! later checks are not evaluated:
//!
//!  1. The application ID must be a reverse-domain identifier.
//!  2. `minSdk <= targetSdk <= compileSdk` must hold for all values that can
//!     be determined. Unresolvable references are left to step 5.
//!  3. Every build type must refer to a declared signing identity.
//!  4. Plugins must be unique. Dependency coordinates must be well-formed and
//!     unique per group and artifact, unless their versions are identical.
//!  5. Every symbolic reference must resolve to a binding of suitable type.
//!  6. Strings interpolated into generated build scripts must be quotable.
//!     Names that become Kotlin identifiers (toolchain blocks and their keys,
//!     dependency configurations) must be identifiers.

use tracing;

use crate::descriptor::{self, Raw, Reference, Value};
use crate::environment::{Binding, Environment};
use crate::error::{ConfigError, ConfigErrorKind, Error};
use crate::plan::{
    BuildPlan, BuildType, CompileOptions, ConfigWarning, Coordinate, Dependency,
    KotlinOptions, Lint, PluginId, SigningConfig,
};

/// Name of the implicitly declared debug signing identity.
pub const DEBUG_SIGNING_CONFIG: &str = "debug";

// Conversion of environment bindings into field values
//
// Implemented for every type a `Value<T>` can carry.
trait FromBinding: Sized {
    fn from_binding(binding: &Binding) -> Option<Self>;
}

impl FromBinding for u32 {
    fn from_binding(binding: &Binding) -> Option<Self> {
        binding.as_u32()
    }
}

impl FromBinding for String {
    fn from_binding(binding: &Binding) -> Option<Self> {
        Some(binding.as_string())
    }
}

// Resolve a deferred value
//
// Return the literal, or the converted binding of the reference. Fails with
// `UnresolvedReference` if there is no binding, or `MismatchedReference` if
// the binding cannot be converted.
fn resolve_value<T: FromBinding + Clone>(
    value: &Value<T>,
    env: &Environment,
) -> Result<T, ConfigError> {
    match value {
        Value::Literal(v) => Ok(v.clone()),
        Value::Reference(r) => {
            let binding = env.lookup(r).ok_or_else(
                || ConfigError::new(ConfigErrorKind::UnresolvedReference, r.key.as_str())
            )?;
            T::from_binding(binding).ok_or_else(
                || ConfigError::new(ConfigErrorKind::MismatchedReference, r.key.as_str())
            )
        },
    }
}

// Resolve a deferred value if possible
//
// Like `resolve_value()`, but yields `None` rather than an error. Used by
// validation steps that precede reference resolution.
fn try_resolve<T: FromBinding + Clone>(
    value: &Value<T>,
    env: &Environment,
) -> Option<T> {
    resolve_value(value, env).ok()
}

/// Check whether a string is a valid application ID
///
/// Application IDs are reverse-domain identifiers: at least two segments
/// separated by `.`, each starting with an ASCII letter and consisting of
/// ASCII alphanumerics and `_` only.
pub fn is_application_id(s: &str) -> bool {
    let mut n = 0;

    for segment in s.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {},
            _ => return false,
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return false;
        }
        n += 1;
    }

    n >= 2
}

// Check whether a string contains no quotes or escapes
//
// This verifies that a string does not contain quotes or backslashes, nor
// any control characters. `$` is refused as well, since it starts string
// templates in Kotlin.
//
// We use this as a simple way to guarantee that the strings can be
// interpolated into generated build scripts without escaping.
fn is_quotable(s: &str) -> bool {
    s.chars().all(
        |v| !v.is_control()
            && v != '\\'
            && v != '\''
            && v != '"'
            && v != '$'
    )
}

fn check_quotable(s: &str, key: &str) -> Result<(), ConfigError> {
    if is_quotable(s) {
        Ok(())
    } else {
        Err(ConfigError::new(ConfigErrorKind::Unquotable, key))
    }
}

/// Check whether a string is a plain identifier
///
/// Identifiers start with an ASCII letter or `_`, followed by ASCII
/// alphanumerics or `_`. Such names can be emitted unquoted as Kotlin
/// identifiers.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();

    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(s: &str, key: &str) -> Result<(), ConfigError> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(ConfigError::new(ConfigErrorKind::Unquotable, key))
    }
}

fn check_application_id(raw: &Raw) -> Result<(), ConfigError> {
    if is_application_id(&raw.android.default_config.application_id) {
        Ok(())
    } else {
        Err(ConfigError::new(
            ConfigErrorKind::InvalidApplicationId,
            "android.default-config.application-id",
        ))
    }
}

fn check_sdk_order(raw: &Raw, env: &Environment) -> Result<(), ConfigError> {
    let min = raw.android.default_config.min_sdk;
    let target = try_resolve(&raw.android.default_config.target_sdk, env);
    let compile = try_resolve(&raw.android.compile_sdk, env);

    let violation = |key: &str| -> Result<(), ConfigError> {
        Err(ConfigError::new(ConfigErrorKind::SdkVersionOrderViolation, key))
    };

    if let Some(target) = target {
        if min > target {
            return violation("android.default-config.min-sdk");
        }
        if let Some(compile) = compile {
            if target > compile {
                return violation("android.default-config.target-sdk");
            }
        }
    } else if let Some(compile) = compile {
        if min > compile {
            return violation("android.default-config.min-sdk");
        }
    }

    Ok(())
}

fn check_signing_configs(raw: &Raw) -> Result<(), ConfigError> {
    for (name, build_type) in raw.android.build_types.iter() {
        if let Some(signing) = &build_type.signing_config {
            if signing != DEBUG_SIGNING_CONFIG
                && !raw.android.signing_configs.contains_key(signing)
            {
                return Err(ConfigError::new(
                    ConfigErrorKind::UnknownSigningConfig,
                    format!("android.build-types.{}.signing-config", name),
                ));
            }
        }
    }

    Ok(())
}

fn check_plugins(raw: &Raw) -> Result<(), ConfigError> {
    let mut seen = std::collections::BTreeSet::new();

    for plugin in raw.plugins.iter() {
        if !seen.insert(plugin.as_str()) {
            return Err(ConfigError::new(ConfigErrorKind::DuplicatePlugin, plugin.as_str()));
        }
    }

    Ok(())
}

// Parse and verify dependency coordinates
//
// Return the parsed coordinates in declaration order. Platform imports must
// carry a version, since they are what versions are taken from.
fn check_dependencies(raw: &Raw) -> Result<Vec<Coordinate>, ConfigError> {
    let mut coordinates: Vec<Coordinate> = Vec::with_capacity(raw.dependencies.len());

    for (i, dependency) in raw.dependencies.iter().enumerate() {
        let coordinate = match Coordinate::parse(&dependency.coordinate) {
            Some(v) if !dependency.platform || v.version.is_some() => v,
            _ => {
                return Err(ConfigError::new(
                    ConfigErrorKind::InvalidCoordinate,
                    format!("dependencies[{}].coordinate", i),
                ));
            },
        };

        let duplicate = coordinates.iter().any(
            |v| v.same_module(&coordinate) && v.version != coordinate.version
        );
        if duplicate {
            return Err(ConfigError::new(
                ConfigErrorKind::DuplicateDependency,
                format!("{}:{}", coordinate.group, coordinate.artifact),
            ));
        }

        coordinates.push(coordinate);
    }

    Ok(coordinates)
}

// Verify all interpolated strings are quotable
//
// Every string that ends up verbatim in generated build scripts is checked,
// in descriptor order. This includes the names of signing identities and
// build types, which are quoted, and the names of toolchain blocks and keys
// as well as dependency configurations, which are not.
fn check_strings(raw: &Raw, version_name: &str) -> Result<(), ConfigError> {
    let android = &raw.android;

    check_quotable(&android.namespace, "android.namespace")?;
    if let Some(v) = &android.ndk_version {
        check_quotable(v, "android.ndk-version")?;
    }
    check_quotable(version_name, "android.default-config.version-name")?;

    for (i, v) in raw.plugins.iter().enumerate() {
        check_quotable(v, &format!("plugins[{}]", i))?;
    }

    for (name, v) in android.signing_configs.iter() {
        check_quotable(name, &format!("android.signing-configs.{}", name))?;

        let fields = [
            ("store-file", &v.store_file),
            ("store-password", &v.store_password),
            ("key-alias", &v.key_alias),
            ("key-password", &v.key_password),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                check_quotable(value, &format!("android.signing-configs.{}.{}", name, key))?;
            }
        }
    }

    for name in android.build_types.keys() {
        check_quotable(name, &format!("android.build-types.{}", name))?;
    }

    if let Some(lint) = &android.lint {
        for (i, v) in lint.disable.iter().enumerate() {
            check_quotable(v, &format!("android.lint.disable[{}]", i))?;
        }
    }

    if let Some(v) = &android.compile_options {
        for (key, value) in [
            ("source-compatibility", &v.source_compatibility),
            ("target-compatibility", &v.target_compatibility),
        ] {
            if let Some(value) = value {
                check_quotable(value, &format!("android.compile-options.{}", key))?;
            }
        }
    }

    if let Some(Some(v)) = android.kotlin_options.as_ref().map(|v| &v.jvm_target) {
        check_quotable(v, "android.kotlin-options.jvm-target")?;
    }

    for (i, v) in raw.dependencies.iter().enumerate() {
        check_identifier(&v.configuration, &format!("dependencies[{}].configuration", i))?;
        check_quotable(&v.coordinate, &format!("dependencies[{}].coordinate", i))?;
    }

    for (name, table) in raw.toolchain.iter() {
        check_identifier(name, &format!("toolchain.{}", name))?;

        for (key, value) in table.iter() {
            check_identifier(key, &format!("toolchain.{}.{}", name, key))?;
            if let Some(v) = value.as_str() {
                check_quotable(v, &format!("toolchain.{}.{}", name, key))?;
            }
        }
    }

    Ok(())
}

// Find the platform import constraining a versionless dependency
//
// Prefer a platform import of the same group, otherwise fall back to the
// first platform import.
fn constraining_platform(
    coordinate: &Coordinate,
    dependencies: &[Dependency],
) -> Option<Coordinate> {
    let mut platforms = dependencies.iter().filter(|v| v.platform);

    platforms.clone()
        .find(|v| v.coordinate.group == coordinate.group)
        .or_else(|| platforms.next())
        .map(|v| v.coordinate.clone())
}

fn resolve_dependencies(
    raw: &Raw,
    coordinates: Vec<Coordinate>,
) -> Vec<Dependency> {
    let mut dependencies: Vec<Dependency> = raw.dependencies.iter()
        .zip(coordinates)
        .map(|(v, coordinate)| Dependency {
            configuration: v.configuration.clone(),
            coordinate: coordinate,
            platform: v.platform,
            constrained_by: None,
        })
        .collect();

    // Platform imports apply to all siblings, regardless of declaration
    // order, so constraints are assigned once all entries are known.
    for i in 0..dependencies.len() {
        if dependencies[i].coordinate.version.is_none() {
            let platform = constraining_platform(&dependencies[i].coordinate, &dependencies);
            dependencies[i].constrained_by = platform;
        }
    }

    dependencies
}

fn collect_warnings(plan: &BuildPlan) -> Vec<ConfigWarning> {
    let mut warnings: Vec<ConfigWarning> = plan.debug_signed_build_types()
        .map(|v| ConfigWarning::DebugSigning { build_type: v.to_string() })
        .collect();

    warnings.extend(
        plan.dependencies.iter()
            .filter(|v| v.coordinate.version.is_none() && v.constrained_by.is_none())
            .map(|v| ConfigWarning::UnconstrainedVersion {
                coordinate: v.coordinate.to_string(),
            }),
    );

    warnings
}

fn convert_signing_config(v: &descriptor::RawSigningConfig) -> SigningConfig {
    SigningConfig {
        store_file: v.store_file.clone(),
        store_password: v.store_password.clone(),
        key_alias: v.key_alias.clone(),
        key_password: v.key_password.clone(),
    }
}

fn convert_build_type(v: &descriptor::RawBuildType) -> BuildType {
    BuildType {
        signing_config: v.signing_config.clone(),
        minify_enabled: v.minify_enabled,
        shrink_resources: v.shrink_resources,
        debuggable: v.debuggable,
    }
}

/// Resolve a parsed descriptor
///
/// Validate the raw descriptor and resolve all of its symbolic references
/// against `env`. See the module documentation for the validation order.
pub fn resolve_raw(raw: &Raw, env: &Environment) -> Result<BuildPlan, ConfigError> {
    let android = &raw.android;
    let default_config = &android.default_config;

    tracing::debug!(
        application_id = %default_config.application_id,
        bindings = env.len(),
        "resolving descriptor"
    );

    check_application_id(raw)?;
    check_sdk_order(raw, env)?;
    check_signing_configs(raw)?;
    check_plugins(raw)?;
    let coordinates = check_dependencies(raw)?;

    let compile_sdk = resolve_value(&android.compile_sdk, env)?;
    let target_sdk = resolve_value(&default_config.target_sdk, env)?;
    let version_code = resolve_value(&default_config.version_code, env)?;
    let version_name = resolve_value(&default_config.version_name, env)?;

    check_strings(raw, &version_name)?;

    let mut signing_configs: std::collections::BTreeMap<String, SigningConfig> =
        android.signing_configs.iter()
            .map(|(name, v)| (name.clone(), convert_signing_config(v)))
            .collect();
    signing_configs.entry(DEBUG_SIGNING_CONFIG.to_string()).or_default();

    let lint = android.lint.as_ref().map_or_else(Lint::default, |v| Lint {
        disable: v.disable.clone(),
        check_release_builds: v.check_release_builds,
        abort_on_error: v.abort_on_error,
    });

    let compile_options = android.compile_options.as_ref().map_or_else(CompileOptions::default, |v| {
        CompileOptions {
            source_compatibility: v.source_compatibility.clone(),
            target_compatibility: v.target_compatibility.clone(),
        }
    });

    let kotlin_options = android.kotlin_options.as_ref().map_or_else(KotlinOptions::default, |v| {
        KotlinOptions {
            jvm_target: v.jvm_target.clone(),
        }
    });

    let mut plan = BuildPlan {
        application_id: default_config.application_id.clone(),
        namespace: android.namespace.clone(),
        min_sdk: default_config.min_sdk,
        target_sdk: target_sdk,
        compile_sdk: compile_sdk,
        version_code: version_code,
        version_name: version_name,
        multi_dex_enabled: default_config.multi_dex_enabled,
        ndk_version: android.ndk_version.clone(),
        plugins: raw.plugins.iter().map(|v| PluginId(v.clone())).collect(),
        signing_configs: signing_configs,
        build_types: android.build_types.iter()
            .map(|(name, v)| (name.clone(), convert_build_type(v)))
            .collect(),
        lint: lint,
        compile_options: compile_options,
        kotlin_options: kotlin_options,
        dependencies: resolve_dependencies(raw, coordinates),
        toolchain: raw.toolchain.clone(),
        warnings: Vec::new(),
    };

    plan.warnings = collect_warnings(&plan);

    tracing::debug!(
        dependencies = plan.dependencies.len(),
        warnings = plan.warnings.len(),
        "descriptor resolved"
    );

    Ok(plan)
}

/// Resolve descriptor text
///
/// Parse `content` as descriptor, validate it, and resolve all symbolic
/// references against `env`. Either a fully concrete `BuildPlan` is
/// returned, or exactly one error describing the first violation.
pub fn resolve(content: &str, env: &Environment) -> Result<BuildPlan, Error> {
    let raw = Raw::parse_str(content)?;

    resolve_raw(&raw, env).map_err(Error::Config)
}

/// Collect symbolic references
///
/// Return all symbolic references used by a descriptor, in descriptor order.
/// Useful to report which bindings a toolchain has to provide.
pub fn references(raw: &Raw) -> Vec<&Reference> {
    let android = &raw.android;
    let default_config = &android.default_config;

    [
        android.compile_sdk.reference(),
        default_config.target_sdk.reference(),
        default_config.version_code.reference(),
        default_config.version_name.reference(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOODY: &str = "
        plugins = [
            \"com.android.application\",
            \"kotlin-android\",
            \"com.google.gms.google-services\",
            \"dev.flutter.flutter-gradle-plugin\",
        ]

        [android]
        namespace = \"com.example.foody\"
        compile-sdk = { ref = \"flutter.compileSdkVersion\" }
        ndk-version = \"27.0.12077973\"

        [android.default-config]
        application-id = \"com.example.foody\"
        min-sdk = 23
        target-sdk = { ref = \"flutter.targetSdkVersion\" }
        version-code = { ref = \"flutter.versionCode\" }
        version-name = { ref = \"flutter.versionName\" }
        multi-dex-enabled = true

        [android.build-types.release]
        signing-config = \"debug\"

        [android.build-types.debug]
        minify-enabled = false

        [android.lint]
        disable = [\"InvalidPackage\"]
        check-release-builds = false

        [android.compile-options]
        source-compatibility = \"11\"
        target-compatibility = \"11\"

        [android.kotlin-options]
        jvm-target = \"11\"

        [[dependencies]]
        coordinate = \"com.google.firebase:firebase-bom:32.7.2\"
        platform = true

        [[dependencies]]
        coordinate = \"com.google.firebase:firebase-analytics\"

        [[dependencies]]
        coordinate = \"com.android.support:multidex:1.0.3\"

        [toolchain.flutter]
        source = \"../..\"
    ";

    fn env() -> Environment {
        Environment::new()
            .with("compileSdkVersion", Binding::Integer(34))
            .with("targetSdkVersion", Binding::Integer(34))
            .with("versionCode", Binding::Integer(1))
            .with("versionName", Binding::String("1.0".into()))
    }

    fn kind(content: &str, env: &Environment) -> ConfigErrorKind {
        resolve(content, env).unwrap_err().config_kind().unwrap()
    }

    // Verify resolution of a complete descriptor
    //
    // Resolve a full Flutter-style descriptor and verify the plan carries
    // all declared entries with references substituted.
    #[test]
    fn resolve_foody() {
        let plan = resolve(FOODY, &env()).unwrap();

        assert_eq!(plan.application_id, "com.example.foody");
        assert_eq!(plan.namespace, "com.example.foody");
        assert_eq!(plan.min_sdk, 23);
        assert_eq!(plan.target_sdk, 34);
        assert_eq!(plan.compile_sdk, 34);
        assert_eq!(plan.version_code, 1);
        assert_eq!(plan.version_name, "1.0");
        assert!(plan.multi_dex_enabled);
        assert_eq!(plan.ndk_version.as_deref(), Some("27.0.12077973"));

        assert_eq!(plan.plugins.len(), 4);
        assert_eq!(plan.plugins[0].as_str(), "com.android.application");
        assert_eq!(plan.plugins[3].as_str(), "dev.flutter.flutter-gradle-plugin");

        assert_eq!(plan.dependencies.len(), 3);
        assert!(plan.dependencies[0].platform);
        assert_eq!(
            plan.dependencies[1].constrained_by.as_ref().unwrap().to_string(),
            "com.google.firebase:firebase-bom:32.7.2",
        );
        assert!(plan.dependencies[2].constrained_by.is_none());

        assert_eq!(plan.build_types["release"].signing_config.as_deref(), Some("debug"));
        assert_eq!(plan.build_types["debug"].minify_enabled, Some(false));
        assert!(plan.signing_configs.contains_key("debug"));
        assert_eq!(plan.lint.disable, vec!["InvalidPackage"]);
        assert_eq!(plan.lint.check_release_builds, Some(false));
        assert_eq!(plan.compile_options.source_compatibility.as_deref(), Some("11"));
        assert_eq!(plan.kotlin_options.jvm_target.as_deref(), Some("11"));
        assert_eq!(
            plan.toolchain["flutter"].get("source").unwrap().as_str(),
            Some("../.."),
        );

        assert_eq!(
            plan.warnings,
            vec![ConfigWarning::DebugSigning { build_type: "release".into() }],
        );
    }

    // Verify all four toolchain references are substituted
    //
    // The emitted descriptor of the plan must not contain any references.
    #[test]
    fn resolve_substitutes_references() {
        let raw = Raw::parse_str(FOODY).unwrap();
        assert_eq!(references(&raw).len(), 4);

        let plan = resolve_raw(&raw, &env()).unwrap();
        let emitted = Raw::parse_str(&plan.to_descriptor().unwrap()).unwrap();

        assert!(references(&emitted).is_empty());
        assert_eq!(emitted.android.compile_sdk, Value::Literal(34));
        assert_eq!(
            emitted.android.default_config.version_name,
            Value::Literal("1.0".to_string()),
        );
    }

    // Verify idempotence of resolution
    //
    // Emitting a plan back to descriptor form and resolving it again, even
    // with an empty environment, yields the identical plan.
    #[test]
    fn resolve_roundtrip() {
        let plan = resolve(FOODY, &env()).unwrap();
        let text = plan.to_descriptor().unwrap();
        let again = resolve(&text, &Environment::new()).unwrap();

        assert_eq!(plan, again);

        // Trailers may carry floats, which compare by value.
        let s = FOODY.to_string() + "[toolchain.gradle]\njvm_heap_ratio = 0.5\n";
        let plan = resolve(&s, &env()).unwrap();
        let again = resolve(&plan.to_descriptor().unwrap(), &Environment::new()).unwrap();

        assert_eq!(plan, again);
        assert_eq!(again.toolchain["gradle"]["jvm_heap_ratio"].as_float(), Some(0.5));
    }

    // Verify application ID validation
    #[test]
    fn resolve_application_id() {
        assert!(is_application_id("com.example.foody"));
        assert!(is_application_id("a.b_1.C2"));
        assert!(!is_application_id("foody"));
        assert!(!is_application_id("com..foody"));
        assert!(!is_application_id("com.1example"));
        assert!(!is_application_id("com.example-foody"));
        assert!(!is_application_id(""));

        let s = FOODY.replace(
            "application-id = \"com.example.foody\"",
            "application-id = \"foody\"",
        );
        assert_eq!(kind(&s, &env()), ConfigErrorKind::InvalidApplicationId);
    }

    // Verify SDK ordering
    //
    // Violations are detected on both literal and resolved values.
    #[test]
    fn resolve_sdk_order() {
        let s = FOODY.replace("min-sdk = 23", "min-sdk = 35");
        assert_eq!(kind(&s, &env()), ConfigErrorKind::SdkVersionOrderViolation);

        let env_low = env().with("flutter.compileSdkVersion", Binding::Integer(33));
        let e = resolve(FOODY, &env_low).unwrap_err();
        match e {
            Error::Config(e) => {
                assert_eq!(e.kind, ConfigErrorKind::SdkVersionOrderViolation);
                assert_eq!(e.key, "android.default-config.target-sdk");
            },
            _ => panic!("unexpected error"),
        }

        // Ordering is checked against the compile SDK, even if the target
        // SDK cannot be resolved.
        let mut env_partial = Environment::new();
        env_partial.define("compileSdkVersion=22").unwrap();
        assert_eq!(kind(FOODY, &env_partial), ConfigErrorKind::SdkVersionOrderViolation);
    }

    // Verify validation order
    //
    // An SDK violation is reported before unresolved references, and an
    // invalid application ID before anything else.
    #[test]
    fn resolve_fail_fast_order() {
        let s = FOODY.replace("min-sdk = 23", "min-sdk = 35");
        let env_partial = Environment::new().with("targetSdkVersion", Binding::Integer(34));
        assert_eq!(kind(&s, &env_partial), ConfigErrorKind::SdkVersionOrderViolation);

        let s = s.replace(
            "application-id = \"com.example.foody\"",
            "application-id = \"foody\"",
        );
        assert_eq!(kind(&s, &env_partial), ConfigErrorKind::InvalidApplicationId);
    }

    // Verify signing identity resolution
    #[test]
    fn resolve_signing_configs() {
        let s = FOODY.replace("signing-config = \"debug\"", "signing-config = \"upload\"");
        let e = resolve(&s, &env()).unwrap_err();
        match e {
            Error::Config(e) => {
                assert_eq!(e.kind, ConfigErrorKind::UnknownSigningConfig);
                assert_eq!(e.key, "android.build-types.release.signing-config");
            },
            _ => panic!("unexpected error"),
        }

        let s = s + "
            [android.signing-configs.upload]
            store-file = \"upload.jks\"
            key-alias = \"upload\"
        ";
        let plan = resolve(&s, &env()).unwrap();
        assert_eq!(plan.signing_configs.len(), 2);
        assert_eq!(plan.signing_configs["upload"].store_file.as_deref(), Some("upload.jks"));
        assert!(plan.warnings.is_empty());
    }

    // Verify dependency uniqueness
    //
    // Identical coordinates are accepted, differing versions of the same
    // module are refused.
    #[test]
    fn resolve_duplicate_dependencies() {
        let same = FOODY.to_string() + "
            [[dependencies]]
            coordinate = \"com.android.support:multidex:1.0.3\"
        ";
        let plan = resolve(&same, &env()).unwrap();
        assert_eq!(plan.dependencies.len(), 4);

        let other = FOODY.to_string() + "
            [[dependencies]]
            configuration = \"testImplementation\"
            coordinate = \"com.android.support:multidex:2.0.1\"
        ";
        let e = resolve(&other, &env()).unwrap_err();
        match e {
            Error::Config(e) => {
                assert_eq!(e.kind, ConfigErrorKind::DuplicateDependency);
                assert_eq!(e.key, "com.android.support:multidex");
            },
            _ => panic!("unexpected error"),
        }
    }

    // Verify coordinate validation
    //
    // Malformed coordinates and versionless platform imports are refused.
    #[test]
    fn resolve_invalid_coordinates() {
        let s = FOODY.replace("com.android.support:multidex:1.0.3", "multidex");
        assert_eq!(kind(&s, &env()), ConfigErrorKind::InvalidCoordinate);

        let s = FOODY.replace(
            "com.google.firebase:firebase-bom:32.7.2",
            "com.google.firebase:firebase-bom",
        );
        assert_eq!(kind(&s, &env()), ConfigErrorKind::InvalidCoordinate);
    }

    // Verify plugin uniqueness
    #[test]
    fn resolve_duplicate_plugins() {
        let s = FOODY.replace("\"kotlin-android\",", "\"kotlin-android\", \"kotlin-android\",");
        assert_eq!(kind(&s, &env()), ConfigErrorKind::DuplicatePlugin);
    }

    // Verify unresolved and mismatched references
    #[test]
    fn resolve_references() {
        let partial = Environment::new()
            .with("compileSdkVersion", Binding::Integer(34))
            .with("targetSdkVersion", Binding::Integer(34))
            .with("versionName", Binding::String("1.0".into()));

        let e = resolve(FOODY, &partial).unwrap_err();
        match e {
            Error::Config(e) => {
                assert_eq!(e.kind, ConfigErrorKind::UnresolvedReference);
                assert_eq!(e.key, "flutter.versionCode");
            },
            _ => panic!("unexpected error"),
        }

        let mismatched = env().with("versionCode", Binding::String("one".into()));
        assert_eq!(kind(FOODY, &mismatched), ConfigErrorKind::MismatchedReference);

        // Properties-style bindings are strings, but convert if numeric.
        let props = Environment::parse_properties_str(
            "flutter.compileSdkVersion=34\n\
             flutter.targetSdkVersion=34\n\
             flutter.versionCode=7\n\
             flutter.versionName=2.1.0\n",
        ).unwrap();
        let plan = resolve(FOODY, &props).unwrap();
        assert_eq!(plan.version_code, 7);
        assert_eq!(plan.version_name, "2.1.0");
    }

    // Verify quoting restrictions
    //
    // Strings that end up in generated build scripts must not contain
    // quotes, including strings bound via the environment.
    #[test]
    fn resolve_unquotable() {
        let quoted = env().with("versionName", Binding::String("1.0\"".into()));
        let e = resolve(FOODY, &quoted).unwrap_err();
        match e {
            Error::Config(e) => {
                assert_eq!(e.kind, ConfigErrorKind::Unquotable);
                assert_eq!(e.key, "android.default-config.version-name");
            },
            _ => panic!("unexpected error"),
        }

        let s = FOODY.replace("source = \"../..\"", "source = \"${HOME}\"");
        assert_eq!(kind(&s, &env()), ConfigErrorKind::Unquotable);
    }

    // Verify names in generated build scripts
    //
    // Names of signing identities and build types are quoted in generated
    // scripts. Toolchain blocks, their keys, and dependency configurations
    // are emitted unquoted and must be identifiers.
    #[test]
    fn resolve_unquotable_names() {
        assert!(is_identifier("flutter"));
        assert!(is_identifier("_source1"));
        assert!(is_identifier("testImplementation"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1source"));
        assert!(!is_identifier("kotlin-android"));
        assert!(!is_identifier("flutter { } evil"));

        let cases = [
            (
                FOODY.to_string() + "[android.build-types.'st\"aging']\nminify-enabled = true\n",
                "android.build-types.st\"aging",
            ),
            (
                FOODY.to_string() + "[android.signing-configs.'up$load']\nkey-alias = \"upload\"\n",
                "android.signing-configs.up$load",
            ),
            (
                FOODY.to_string() + "[toolchain.'flutter { } evil']\nsource = \"../..\"\n",
                "toolchain.flutter { } evil",
            ),
            (
                FOODY.replace("source = \"../..\"", "'source dir' = \"../..\""),
                "toolchain.flutter.source dir",
            ),
            (
                FOODY.replace(
                    "coordinate = \"com.android.support:multidex:1.0.3\"",
                    "configuration = \"implementation(x)\"\ncoordinate = \"com.android.support:multidex:1.0.3\"",
                ),
                "dependencies[2].configuration",
            ),
            (
                FOODY.replace(
                    "\"com.android.support:multidex:1.0.3\"",
                    "'com.android.support:multidex:1.0.3\")'",
                ),
                "dependencies[2].coordinate",
            ),
        ];

        for (s, key) in cases {
            match resolve(&s, &env()) {
                Err(Error::Config(e)) => {
                    assert_eq!(e.kind, ConfigErrorKind::Unquotable);
                    assert_eq!(e.key, key);
                },
                _ => panic!("{} accepted", key),
            }
        }
    }

    // Verify environment strings are taken verbatim
    //
    // Properties and definitions carry no type information. Numeric looking
    // text must reach string fields unchanged.
    #[test]
    fn resolve_verbatim_strings() {
        let props = Environment::parse_properties_str(
            "flutter.compileSdkVersion=34\n\
             flutter.targetSdkVersion=34\n\
             flutter.versionCode=007\n\
             flutter.versionName=007\n",
        ).unwrap();
        let plan = resolve(FOODY, &props).unwrap();
        assert_eq!(plan.version_code, 7);
        assert_eq!(plan.version_name, "007");

        let mut defined = env();
        defined.define("versionName=+1").unwrap();
        let plan = resolve(FOODY, &defined).unwrap();
        assert_eq!(plan.version_name, "+1");
    }

    // Verify debug signing of the debug build type
    //
    // Signing the `debug` build type with the debug identity is the default
    // and raises no warning.
    #[test]
    fn resolve_debug_signing() {
        let s = FOODY
            .replace("signing-config = \"debug\"", "minify-enabled = true")
            .replace("minify-enabled = false", "signing-config = \"debug\"");
        let plan = resolve(&s, &env()).unwrap();

        assert_eq!(plan.build_types["debug"].signing_config.as_deref(), Some("debug"));
        assert!(plan.debug_signed_build_types().next().is_none());
        assert!(plan.warnings.is_empty());
    }

    // Verify JSON emission
    //
    // The plan serializes with kebab-case keys, tagged warnings, and the
    // toolchain trailer passed through.
    #[test]
    fn resolve_json() {
        let plan = resolve(FOODY, &env()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();

        assert_eq!(v["application-id"], "com.example.foody");
        assert_eq!(v["compile-sdk"], 34);
        assert_eq!(v["warnings"][0]["kind"], "debug-signing");
        assert_eq!(v["warnings"][0]["build-type"], "release");
        assert_eq!(v["toolchain"]["flutter"]["source"], "../..");
    }

    // Verify unconstrained versionless dependencies
    //
    // Without any platform import, a versionless dependency resolves but
    // raises a warning.
    #[test]
    fn resolve_unconstrained_version() {
        let s = FOODY.replace("platform = true", "");
        let plan = resolve(&s, &env()).unwrap();

        assert!(plan.warnings.contains(&ConfigWarning::UnconstrainedVersion {
            coordinate: "com.google.firebase:firebase-analytics".into(),
        }));
    }
}
