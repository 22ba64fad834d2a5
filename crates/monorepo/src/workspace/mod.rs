//! Workspace model: discovered packages, their dependency graph, selection
//! and validation.

mod graph;
mod resolver;

pub use graph::{render_cycle, DependencyGraph};
pub use resolver::{WorkspaceKind, WorkspaceResolver};

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use regex::Regex;
use semver::Version;
use shipit_pkg_tools::{Package, WorkspaceSpec};

use crate::error::{Result, WorkspaceError};

/// A discovered workspace.
///
/// Constructed once per invocation by the [`WorkspaceResolver`] and shared
/// read-only afterwards; only the version-bump step mutates packages, and it
/// runs before any parallel phase.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Workspace root directory
    pub root: PathBuf,
    /// Declared workspace glob patterns
    pub patterns: Vec<String>,
    /// Detected protocol family
    pub kind: WorkspaceKind,
    /// All discovered packages, by name
    pub packages: BTreeMap<String, Package>,
    /// The dependency graph
    pub graph: DependencyGraph,
    /// Non-fatal findings from discovery
    pub warnings: Vec<String>,
}

/// Outcome of [`Workspace::validate`].
#[derive(Debug, Clone)]
pub struct WorkspaceValidation {
    /// Whether no cycles were found
    pub valid: bool,
    /// Rendered cycles
    pub cycles: Vec<String>,
    /// Version-mismatch and discovery warnings
    pub warnings: Vec<String>,
}

impl Workspace {
    /// Selects packages by filter, optionally excluding private ones.
    ///
    /// Filter entries are literal names or shell-style globs (`*` matches
    /// any run of characters). An empty filter selects everything.
    pub fn get_packages(&self, filter: &[String], ignore_private: bool) -> Result<Vec<&Package>> {
        let matchers = compile_filters(filter)?;

        Ok(self
            .packages
            .values()
            .filter(|pkg| !(ignore_private && pkg.private))
            .filter(|pkg| {
                matchers.is_empty() || matchers.iter().any(|m| m.is_match(&pkg.name))
            })
            .collect())
    }

    /// Topological order over the filtered selection, dependency-leaves
    /// first.
    ///
    /// # Errors
    ///
    /// Fails when a dependency cycle touches the selection.
    pub fn topological_order(&self, filter: Option<&[String]>) -> Result<Vec<String>> {
        let subset: Option<BTreeSet<String>> = match filter {
            Some(filter) if !filter.is_empty() => Some(
                self.get_packages(filter, false)?
                    .into_iter()
                    .map(|pkg| pkg.name.clone())
                    .collect(),
            ),
            _ => None,
        };

        Ok(self.graph.topological_order(subset.as_ref())?)
    }

    /// The transitive dependents of `name`, including `name`.
    pub fn affected_packages(&self, name: &str) -> Result<BTreeSet<String>> {
        if !self.packages.contains_key(name) {
            return Err(WorkspaceError::UnknownPackage { name: name.to_string() }.into());
        }
        Ok(self.graph.affected(name))
    }

    /// Checks the workspace for cycles and version mismatches.
    ///
    /// A workspace dependency pinned to a literal version that differs from
    /// the member's declared version is reported as a warning; `workspace:`
    /// protocol specifiers are exempt.
    #[must_use]
    pub fn validate(&self) -> WorkspaceValidation {
        let cycles: Vec<String> =
            self.graph.cycles.iter().map(|cycle| render_cycle(cycle)).collect();

        let mut warnings = self.warnings.clone();

        for pkg in self.packages.values() {
            for (dep_name, spec) in pkg.declared_dependencies() {
                let Some(member) = self.packages.get(&dep_name) else { continue };
                if WorkspaceSpec::parse(&spec).is_some() {
                    continue;
                }
                if let Ok(pinned) = Version::parse(&spec) {
                    if pinned != member.version {
                        warnings.push(format!(
                            "{} pins {} to {} but the workspace version is {}",
                            pkg.name, dep_name, pinned, member.version
                        ));
                    }
                }
            }
        }

        WorkspaceValidation { valid: cycles.is_empty(), cycles, warnings }
    }
}

/// Compiles filter entries into anchored regexes; `*` becomes `.*`.
fn compile_filters(filter: &[String]) -> Result<Vec<Regex>> {
    filter
        .iter()
        .map(|pattern| {
            let escaped = regex::escape(pattern).replace(r"\*", ".*");
            Regex::new(&format!("^{escaped}$")).map_err(|e| {
                WorkspaceError::InvalidFilter {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipit_standard_tools::manifest::PackageManifest;
    use std::path::Path;

    fn package(name: &str, version: &str, private: bool, deps: &[(&str, &str)]) -> Package {
        let deps_json: Vec<String> =
            deps.iter().map(|(d, spec)| format!("\"{d}\": \"{spec}\"")).collect();
        let json = format!(
            r#"{{"name": "{name}", "version": "{version}", "private": {private},
                 "dependencies": {{{}}}}}"#,
            deps_json.join(", ")
        );
        let manifest =
            PackageManifest::parse(Path::new(&format!("/ws/{name}/package.json")), &json)
                .expect("manifest");
        Package::from_manifest(manifest).expect("package")
    }

    fn workspace(packages: Vec<Package>) -> Workspace {
        let packages: BTreeMap<String, Package> =
            packages.into_iter().map(|pkg| (pkg.name.clone(), pkg)).collect();
        let graph = DependencyGraph::build(&packages);
        Workspace {
            root: PathBuf::from("/ws"),
            patterns: vec!["packages/*".to_string()],
            kind: WorkspaceKind::Npm,
            packages,
            graph,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_filters_literal_and_glob() {
        let ws = workspace(vec![
            package("@acme/core", "1.0.0", false, &[]),
            package("@acme/utils", "1.0.0", false, &[]),
            package("standalone", "1.0.0", false, &[]),
        ]);

        let all = ws.get_packages(&[], true).expect("all");
        assert_eq!(all.len(), 3);

        let literal = ws.get_packages(&["standalone".to_string()], true).expect("literal");
        assert_eq!(literal.len(), 1);

        let glob = ws.get_packages(&["@acme/*".to_string()], true).expect("glob");
        assert_eq!(glob.len(), 2);

        let none = ws.get_packages(&["missing-*".to_string()], true).expect("none");
        assert!(none.is_empty());
    }

    #[test]
    fn test_private_packages_are_excluded_when_flagged() {
        let ws = workspace(vec![
            package("public-pkg", "1.0.0", false, &[]),
            package("private-pkg", "1.0.0", true, &[]),
        ]);

        assert_eq!(ws.get_packages(&[], true).expect("public only").len(), 1);
        assert_eq!(ws.get_packages(&[], false).expect("all").len(), 2);
    }

    #[test]
    fn test_validate_flags_literal_version_mismatch() {
        let ws = workspace(vec![
            package("core", "2.0.0", false, &[]),
            package("pinned", "1.0.0", false, &[("core", "1.0.0")]),
            package("ranged", "1.0.0", false, &[("core", "^1.0.0")]),
            package("linked", "1.0.0", false, &[("core", "workspace:*")]),
        ]);

        let validation = ws.validate();
        assert!(validation.valid);
        assert_eq!(validation.warnings.len(), 1);
        assert!(validation.warnings[0].contains("pinned"));
        assert!(validation.warnings[0].contains("2.0.0"));
    }

    #[test]
    fn test_validate_reports_cycles() {
        let ws = workspace(vec![
            package("a", "1.0.0", false, &[("b", "workspace:*")]),
            package("b", "1.0.0", false, &[("a", "workspace:*")]),
        ]);

        let validation = ws.validate();
        assert!(!validation.valid);
        assert_eq!(validation.cycles, vec!["a → b → a".to_string()]);
    }

    #[test]
    fn test_affected_packages_requires_known_name() {
        let ws = workspace(vec![package("a", "1.0.0", false, &[])]);
        assert!(ws.affected_packages("missing").is_err());
    }
}
