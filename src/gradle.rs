//! Gradle Rendering
//!
//! Render a resolved `BuildPlan` as Android application build script in the
//! Gradle Kotlin DSL (`build.gradle.kts`). The resolver guarantees that all
//! interpolated strings are quotable, so no escaping is performed here.
//!
//! Build types named `debug` or `release` are predefined by the Android
//! Gradle Plugin and are configured via `getByName()`, any other build type
//! or signing identity is created via `create()`.

use crate::plan::{BuildPlan, BuildType, SigningConfig};

const PREDEFINED_BUILD_TYPES: &[&str] = &["debug", "release"];

// Map a Java version string to its `JavaVersion` constant
//
// `"11"` maps to `JavaVersion.VERSION_11`, legacy versions like `"1.8"` to
// `JavaVersion.VERSION_1_8`.
fn java_version(v: &str) -> String {
    format!("JavaVersion.VERSION_{}", v.replace('.', "_"))
}

fn push_line(out: &mut String, indent: usize, line: &str) {
    for _ in 0..indent {
        out.push_str("    ");
    }
    out.push_str(line);
    out.push('\n');
}

fn render_signing_config(out: &mut String, name: &str, v: &SigningConfig) {
    let accessor = if name == "debug" { "getByName" } else { "create" };

    push_line(out, 2, &format!("{}(\"{}\") {{", accessor, name));
    if let Some(v) = &v.store_file {
        push_line(out, 3, &format!("storeFile = file(\"{}\")", v));
    }
    if let Some(v) = &v.store_password {
        push_line(out, 3, &format!("storePassword = \"{}\"", v));
    }
    if let Some(v) = &v.key_alias {
        push_line(out, 3, &format!("keyAlias = \"{}\"", v));
    }
    if let Some(v) = &v.key_password {
        push_line(out, 3, &format!("keyPassword = \"{}\"", v));
    }
    push_line(out, 2, "}");
}

fn render_build_type(out: &mut String, name: &str, v: &BuildType) {
    let accessor = if PREDEFINED_BUILD_TYPES.contains(&name) { "getByName" } else { "create" };

    push_line(out, 2, &format!("{}(\"{}\") {{", accessor, name));
    if let Some(v) = &v.signing_config {
        push_line(out, 3, &format!("signingConfig = signingConfigs.getByName(\"{}\")", v));
    }
    if let Some(v) = v.minify_enabled {
        push_line(out, 3, &format!("isMinifyEnabled = {}", v));
    }
    if let Some(v) = v.shrink_resources {
        push_line(out, 3, &format!("isShrinkResources = {}", v));
    }
    if let Some(v) = v.debuggable {
        push_line(out, 3, &format!("isDebuggable = {}", v));
    }
    push_line(out, 2, "}");
}

fn render_toolchain(out: &mut String, name: &str, table: &toml::Table) {
    push_line(out, 0, &format!("{} {{", name));
    for (key, value) in table.iter() {
        match value {
            toml::Value::String(v) => push_line(out, 1, &format!("{} = \"{}\"", key, v)),
            toml::Value::Integer(v) => push_line(out, 1, &format!("{} = {}", key, v)),
            toml::Value::Boolean(v) => push_line(out, 1, &format!("{} = {}", key, v)),
            toml::Value::Float(v) => push_line(out, 1, &format!("{} = {:?}", key, v)),
            // Dates and compound values have no portable Gradle representation.
            _ => tracing::warn!(toolchain = name, key = key.as_str(), "skipping toolchain value"),
        }
    }
    push_line(out, 0, "}");
}

/// Render build script
///
/// Render the plan as `build.gradle.kts` of the Android application module.
/// Plugins and dependencies keep their order, build types and signing
/// identities are sorted by name.
pub fn render(plan: &BuildPlan) -> String {
    let mut out = String::new();

    push_line(&mut out, 0, "// Generated by osiris-descriptor");
    push_line(&mut out, 0, "plugins {");
    for v in plan.plugins.iter() {
        push_line(&mut out, 1, &format!("id(\"{}\")", v.as_str()));
    }
    push_line(&mut out, 0, "}");
    push_line(&mut out, 0, "");

    push_line(&mut out, 0, "android {");
    push_line(&mut out, 1, &format!("namespace = \"{}\"", plan.namespace));
    push_line(&mut out, 1, &format!("compileSdk = {}", plan.compile_sdk));
    if let Some(v) = &plan.ndk_version {
        push_line(&mut out, 1, &format!("ndkVersion = \"{}\"", v));
    }
    push_line(&mut out, 0, "");

    push_line(&mut out, 1, "defaultConfig {");
    push_line(&mut out, 2, &format!("applicationId = \"{}\"", plan.application_id));
    push_line(&mut out, 2, &format!("minSdk = {}", plan.min_sdk));
    push_line(&mut out, 2, &format!("targetSdk = {}", plan.target_sdk));
    push_line(&mut out, 2, &format!("versionCode = {}", plan.version_code));
    push_line(&mut out, 2, &format!("versionName = \"{}\"", plan.version_name));
    if plan.multi_dex_enabled {
        push_line(&mut out, 2, "multiDexEnabled = true");
    }
    push_line(&mut out, 1, "}");

    // The implicit debug identity needs no configuration.
    let signing_configs: Vec<_> = plan.signing_configs.iter()
        .filter(|(name, v)| name.as_str() != "debug" || **v != SigningConfig::default())
        .collect();
    if !signing_configs.is_empty() {
        push_line(&mut out, 0, "");
        push_line(&mut out, 1, "signingConfigs {");
        for (name, v) in signing_configs {
            render_signing_config(&mut out, name, v);
        }
        push_line(&mut out, 1, "}");
    }

    if !plan.build_types.is_empty() {
        push_line(&mut out, 0, "");
        push_line(&mut out, 1, "buildTypes {");
        for (name, v) in plan.build_types.iter() {
            render_build_type(&mut out, name, v);
        }
        push_line(&mut out, 1, "}");
    }

    if plan.lint != Default::default() {
        push_line(&mut out, 0, "");
        push_line(&mut out, 1, "lint {");
        for v in plan.lint.disable.iter() {
            push_line(&mut out, 2, &format!("disable += \"{}\"", v));
        }
        if let Some(v) = plan.lint.check_release_builds {
            push_line(&mut out, 2, &format!("checkReleaseBuilds = {}", v));
        }
        if let Some(v) = plan.lint.abort_on_error {
            push_line(&mut out, 2, &format!("abortOnError = {}", v));
        }
        push_line(&mut out, 1, "}");
    }

    if plan.compile_options != Default::default() {
        push_line(&mut out, 0, "");
        push_line(&mut out, 1, "compileOptions {");
        if let Some(v) = &plan.compile_options.source_compatibility {
            push_line(&mut out, 2, &format!("sourceCompatibility = {}", java_version(v)));
        }
        if let Some(v) = &plan.compile_options.target_compatibility {
            push_line(&mut out, 2, &format!("targetCompatibility = {}", java_version(v)));
        }
        push_line(&mut out, 1, "}");
    }

    if let Some(v) = &plan.kotlin_options.jvm_target {
        push_line(&mut out, 0, "");
        push_line(&mut out, 1, "kotlinOptions {");
        push_line(&mut out, 2, &format!("jvmTarget = \"{}\"", v));
        push_line(&mut out, 1, "}");
    }
    push_line(&mut out, 0, "}");

    push_line(&mut out, 0, "");
    push_line(&mut out, 0, "dependencies {");
    for v in plan.dependencies.iter() {
        if v.platform {
            push_line(
                &mut out,
                1,
                &format!("{}(platform(\"{}\"))", v.configuration, v.coordinate),
            );
        } else {
            push_line(
                &mut out,
                1,
                &format!("{}(\"{}\")", v.configuration, v.coordinate),
            );
        }
    }
    push_line(&mut out, 0, "}");

    for (name, table) in plan.toolchain.iter() {
        push_line(&mut out, 0, "");
        render_toolchain(&mut out, name, table);
    }

    out
}
