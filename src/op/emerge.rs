//! Persistent Build Script
//!
//! The `emerge` operation renders a resolved build plan as Gradle build
//! script and stores it persistently in the application module directory of
//! the Android platform integration.

use crate::gradle;
use crate::plan::BuildPlan;

/// Emerge Errors
///
/// This is the exhaustive list of possible errors raised by the emerge
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Module directory is already present and updating was not allowed by
    /// the caller.
    #[error("module directory already present")]
    Already,
    /// Cannot access the specified module directory.
    #[error("cannot access module directory {0:?}")]
    ModuleDirectory(std::ffi::OsString),
    /// Creation of the directory at the specified path failed.
    #[error("failed to create directory {0:?}")]
    DirectoryCreation(std::ffi::OsString),
    /// Updating the file at the specified path failed with the given error.
    #[error("failed to update {0:?} ({1})")]
    FileUpdate(std::ffi::OsString, std::io::Error),
    /// Removing the file at the specified path failed with the given error.
    #[error("failed to remove {0:?} ({1})")]
    FileRemoval(std::ffi::OsString, std::io::Error),
}

// Ensure directory exists
//
// Make sure the directory at the given path exists. Create the directory and
// its parent directories if necessary.
fn ensure_dir(
    path: &std::path::Path,
) -> Result<(), Error> {
    std::fs::create_dir_all(path)
        .map_err(
            |_| Error::DirectoryCreation(path.as_os_str().to_os_string())
        )
}

// Update a file if required
//
// This writes the given content to the specified file, but only if the file
// content does not already match the new content. Thus, the file timestamp is
// only modified if the content really changed, and Gradle does not consider
// the module configuration stale.
//
// Returns whether the file was modified.
fn update_file(
    path: &std::path::Path,
    content: &str,
) -> Result<bool, Error> {
    let error = |v| Error::FileUpdate(path.as_os_str().to_os_string(), v);

    // Open the file read+write and create it if it does not exist, yet.
    let mut f = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(error)?;

    let mut old = String::new();
    <std::fs::File as std::io::Read>::read_to_string(&mut f, &mut old)
        .map_err(error)?;

    if old == content {
        return Ok(false);
    }

    // Rewind, truncate, and write the new contents.
    <std::fs::File as std::io::Seek>::rewind(&mut f).map_err(error)?;
    f.set_len(0).map_err(error)?;
    <std::fs::File as std::io::Write>::write_all(&mut f, content.as_bytes())
        .map_err(error)?;

    // Sync the file now to ensure errors are caught properly.
    f.sync_all().map_err(error)?;

    Ok(true)
}

// Unlink file if it exists
//
// Unlink the file at the specified path, but only if it exists. This is
// effectively like `std::fs::remove_file()`, but ignores errors about missing
// files.
fn unlink_file(path: &std::path::Path) -> Result<(), Error> {
    match std::fs::remove_file(path) {
        Err(v) if v.kind() != std::io::ErrorKind::NotFound => {
            Err(Error::FileRemoval(path.as_os_str().to_os_string(), v))
        },
        _ => {
            Ok(())
        }
    }
}

/// Emerge persistent build script
///
/// Render the plan as `build.gradle.kts` and write it into the module
/// directory at `path`. A Groovy `build.gradle` left over in the module
/// directory is removed, since Gradle refuses modules with both.
///
/// This function fails if the module directory already exists, unless
/// `update` is `true`. In this case the build script is updated to match the
/// plan. Returns whether the build script was modified.
pub fn emerge(
    plan: &BuildPlan,
    path: &std::path::Path,
    update: bool,
) -> Result<bool, Error> {
    let mut path = path.to_path_buf();

    // Check for the module path to exist and being accessible. If the path
    // points to something other than a directory, we fail with an error. If
    // the path points to an existing directory and updates are not allowed,
    // we fail. Otherwise, we create the path and continue.
    match std::fs::metadata(&path) {
        Ok(v) => {
            if !v.is_dir() {
                return Err(Error::ModuleDirectory(path.as_os_str().to_os_string()));
            } else if !update {
                return Err(Error::Already);
            }
        },
        Err(v) => {
            if v.kind() != std::io::ErrorKind::NotFound {
                return Err(Error::ModuleDirectory(path.as_os_str().to_os_string()));
            }
            ensure_dir(path.as_path())?;
        },
    };

    path.push("build.gradle");
    unlink_file(path.as_path())?;
    path.pop();

    path.push("build.gradle.kts");
    let modified = update_file(path.as_path(), &gradle::render(plan))?;

    tracing::info!(
        path = %path.display(),
        modified = modified,
        "emerged build script"
    );

    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    const DESCRIPTOR: &str = "
        plugins = [\"com.android.application\"]
        dependencies = []
        [android]
        namespace = \"com.example.app\"
        compile-sdk = 34
        [android.default-config]
        application-id = \"com.example.app\"
        min-sdk = 21
        target-sdk = 34
        version-code = 1
        version-name = \"1.0\"
        [toolchain.flutter]
        source = \"../..\"
    ";

    fn plan() -> BuildPlan {
        crate::resolve::resolve(DESCRIPTOR, &Environment::new()).unwrap()
    }

    // Verify emerging into a fresh directory
    //
    // The module directory is created, and a second emerge without update is
    // refused.
    #[test]
    fn emerge_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("android").join("app");

        assert!(emerge(&plan(), &module, false).unwrap());

        let content = std::fs::read_to_string(module.join("build.gradle.kts")).unwrap();
        assert_eq!(content, gradle::render(&plan()));

        assert!(matches!(emerge(&plan(), &module, false), Err(Error::Already)));
    }

    // Verify updating existing build scripts
    //
    // Unchanged content is not rewritten, stale Groovy scripts are removed.
    #[test]
    fn emerge_update() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().to_path_buf();

        std::fs::write(module.join("build.gradle"), "// stale\n").unwrap();
        std::fs::write(module.join("build.gradle.kts"), "// stale\n").unwrap();

        assert!(emerge(&plan(), &module, true).unwrap());
        assert!(!module.join("build.gradle").exists());
        assert!(!emerge(&plan(), &module, true).unwrap());
    }

    // Verify emerging onto a file is refused
    #[test]
    fn emerge_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();

        assert!(matches!(emerge(&plan(), &file, true), Err(Error::ModuleDirectory(_))));
    }
}
