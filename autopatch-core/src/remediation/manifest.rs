// autopatch-core/src/remediation/manifest.rs
//! Ecosystem-specific dependency bumps.
//!
//! Each dependency ecosystem rewrites its own manifest files in place;
//! rule-based findings and ecosystems nobody has automated yet fail with a
//! typed error at the patch step. Rewrites are intentionally conservative:
//! they touch only lines or entries that name the vulnerable package and
//! leave everything else byte-identical, so the pipeline's subsequent
//! no-change check stays meaningful.

use crate::finding::Ecosystem;
use super::PatchError;
use log::debug;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Requirement manifests probed for Python projects, relative to the
/// repository root.
pub const PYTHON_REQUIREMENT_FILES: &[&str] = &[
    "requirements.txt",
    "requirements-dev.txt",
    "requirements/prod.txt",
    "requirements/dev.txt",
];

/// npm manifest sections that can pin the vulnerable package.
const NPM_DEPENDENCY_SECTIONS: &[&str] = &["dependencies", "devDependencies"];

/// Applies the fix for one candidate to the working copy.
///
/// Fails with a typed error when no fixed version was supplied, when the
/// package cannot be located in any manifest for its ecosystem, or when the
/// ecosystem has no automated bump.
pub fn apply_dependency_fix(
    workdir: &Path,
    ecosystem: &Ecosystem,
    package: &str,
    fixed_version: &str,
) -> Result<(), PatchError> {
    if fixed_version.trim().is_empty() {
        return Err(PatchError::MissingFixedVersion {
            package: package.to_string(),
        });
    }

    match ecosystem {
        Ecosystem::Python => fix_python_dependency(workdir, package, fixed_version),
        Ecosystem::Npm => fix_npm_dependency(workdir, package, fixed_version),
        Ecosystem::Jvm | Ecosystem::Rule(_) => Err(PatchError::UnsupportedEcosystem {
            ecosystem: ecosystem.tag().to_string(),
        }),
    }
}

/// True when a requirements line pins `package` (and not a package that
/// merely shares the prefix, e.g. `requests-toolbelt` for `requests`).
fn requirement_names_package(line: &str, package: &str) -> bool {
    let line = line.trim_start();
    if !line.starts_with(package) {
        return false;
    }
    match line[package.len()..].chars().next() {
        None => true,
        Some(c) => !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')),
    }
}

fn fix_python_dependency(
    workdir: &Path,
    package: &str,
    fixed_version: &str,
) -> Result<(), PatchError> {
    let mut updated = false;

    for rel in PYTHON_REQUIREMENT_FILES {
        let path = workdir.join(rel);
        if !path.exists() {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        let mut rewritten = String::with_capacity(content.len());
        let mut touched = false;
        for line in content.lines() {
            if requirement_names_package(line, package) {
                rewritten.push_str(&format!("{package}>={fixed_version}"));
                touched = true;
            } else {
                rewritten.push_str(line);
            }
            rewritten.push('\n');
        }
        if touched {
            debug!("rewriting {} for {package}", path.display());
            fs::write(&path, rewritten)?;
            updated = true;
        }
    }

    let pyproject = workdir.join("pyproject.toml");
    if pyproject.exists() {
        let content = fs::read_to_string(&pyproject)?;
        let escaped = regex::escape(package);
        let pattern = format!(r#""{escaped}[^"]*"|'{escaped}[^']*'"#);
        let requirement =
            Regex::new(&pattern).map_err(|_| PatchError::InvalidPackageName {
                package: package.to_string(),
            })?;
        let replacement = format!(r#""{package}>={fixed_version}""#);
        let rewritten = requirement.replace_all(&content, replacement.as_str());
        if rewritten != content {
            debug!("rewriting {} for {package}", pyproject.display());
            fs::write(&pyproject, rewritten.as_bytes())?;
            updated = true;
        }
    }

    if !updated {
        return Err(PatchError::PackageNotFound {
            package: package.to_string(),
        });
    }
    Ok(())
}

fn fix_npm_dependency(
    workdir: &Path,
    package: &str,
    fixed_version: &str,
) -> Result<(), PatchError> {
    let path = workdir.join("package.json");
    if !path.exists() {
        return Err(PatchError::PackageNotFound {
            package: package.to_string(),
        });
    }

    let content = fs::read_to_string(&path)?;
    let mut manifest: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| PatchError::ManifestParse {
            path: path.display().to_string(),
            source,
        })?;

    let mut updated = false;
    for section in NPM_DEPENDENCY_SECTIONS {
        if let Some(deps) = manifest
            .get_mut(section)
            .and_then(serde_json::Value::as_object_mut)
        {
            if let Some(entry) = deps.get_mut(package) {
                *entry = serde_json::Value::String(fixed_version.to_string());
                updated = true;
            }
        }
    }

    if !updated {
        return Err(PatchError::PackageNotFound {
            package: package.to_string(),
        });
    }

    debug!("rewriting {} for {package}", path.display());
    let mut serialized = serde_json::to_string_pretty(&manifest)
        .map_err(|source| PatchError::ManifestParse {
            path: path.display().to_string(),
            source,
        })?;
    serialized.push('\n');
    fs::write(&path, serialized)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn python_requirements_lines_are_rewritten() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "flask==2.0.0\nrequests==2.28.0\nrequests-toolbelt==0.9.1\n",
        )
        .unwrap();

        apply_dependency_fix(dir.path(), &Ecosystem::Python, "requests", "2.28.2").unwrap();

        let rewritten = fs::read_to_string(dir.path().join("requirements.txt")).unwrap();
        assert!(rewritten.contains("requests>=2.28.2\n"));
        assert!(rewritten.contains("flask==2.0.0\n"));
        // The prefix-sharing package must survive untouched.
        assert!(rewritten.contains("requests-toolbelt==0.9.1\n"));
    }

    #[test]
    fn python_pyproject_requirement_strings_are_rewritten() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\ndependencies = [\n  \"requests==2.28.0\",\n  \"flask>=2.0\",\n]\n",
        )
        .unwrap();

        apply_dependency_fix(dir.path(), &Ecosystem::Python, "requests", "2.28.2").unwrap();

        let rewritten = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(rewritten.contains("\"requests>=2.28.2\""));
        assert!(rewritten.contains("\"flask>=2.0\""));
    }

    #[test]
    fn python_secondary_requirement_files_are_probed() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("requirements")).unwrap();
        fs::write(dir.path().join("requirements/prod.txt"), "requests==2.28.0\n").unwrap();

        apply_dependency_fix(dir.path(), &Ecosystem::Python, "requests", "2.28.2").unwrap();

        let rewritten = fs::read_to_string(dir.path().join("requirements/prod.txt")).unwrap();
        assert_eq!(rewritten, "requests>=2.28.2\n");
    }

    #[test]
    fn python_missing_package_is_a_typed_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "flask==2.0.0\n").unwrap();

        let err =
            apply_dependency_fix(dir.path(), &Ecosystem::Python, "requests", "2.28.2").unwrap_err();
        assert!(matches!(err, PatchError::PackageNotFound { .. }));
    }

    #[test]
    fn npm_dependency_entries_are_rewritten() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"app","dependencies":{"lodash":"4.17.20"},"devDependencies":{"jest":"29.0.0"}}"#,
        )
        .unwrap();

        apply_dependency_fix(dir.path(), &Ecosystem::Npm, "lodash", "4.17.21").unwrap();

        let rewritten = fs::read_to_string(dir.path().join("package.json")).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&rewritten).unwrap();
        assert_eq!(manifest["dependencies"]["lodash"], "4.17.21");
        assert_eq!(manifest["devDependencies"]["jest"], "29.0.0");
        assert!(rewritten.ends_with('\n'));
    }

    #[test]
    fn npm_dev_dependencies_are_probed() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"devDependencies":{"jest":"29.0.0"}}"#,
        )
        .unwrap();

        apply_dependency_fix(dir.path(), &Ecosystem::Npm, "jest", "29.7.0").unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["devDependencies"]["jest"], "29.7.0");
    }

    #[test]
    fn jvm_bumps_are_unsupported() {
        let dir = tempdir().unwrap();
        let err = apply_dependency_fix(dir.path(), &Ecosystem::Jvm, "log4j-core", "2.17.1")
            .unwrap_err();
        assert!(matches!(err, PatchError::UnsupportedEcosystem { .. }));
    }

    #[test]
    fn empty_fixed_version_is_rejected_before_any_io() {
        let dir = tempdir().unwrap();
        let err = apply_dependency_fix(dir.path(), &Ecosystem::Python, "requests", " ").unwrap_err();
        assert!(matches!(err, PatchError::MissingFixedVersion { .. }));
    }
}
