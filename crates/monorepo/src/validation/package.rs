use std::path::Path;

use regex::Regex;
use shipit_pkg_tools::npm::{cleanup_tarball, NpmClient};
use shipit_pkg_tools::Package;

use crate::config::ValidationConfig;
use crate::validation::ValidationReport;

/// File extensions scanned for sensitive content.
const SCANNED_EXTENSIONS: [&str; 9] =
    ["js", "mjs", "cjs", "ts", "tsx", "jsx", "json", "yaml", "yml"];

/// Files larger than this are skipped by the content scan.
const MAX_SCANNED_BYTES: u64 = 256 * 1024;

/// Checks a package's manifest and contents before publishing.
#[derive(Debug)]
pub struct PackageValidator<'a> {
    config: &'a ValidationConfig,
    patterns: Vec<Regex>,
}

impl<'a> PackageValidator<'a> {
    /// Creates a validator, compiling the configured sensitive-content
    /// patterns. Uncompilable patterns are dropped with a log warning.
    #[must_use]
    pub fn new(config: &'a ValidationConfig) -> Self {
        let patterns = config
            .sensitive_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    log::warn!("Ignoring uncompilable sensitive pattern '{pattern}': {e}");
                    None
                }
            })
            .collect();

        Self { config, patterns }
    }

    /// Validates one package.
    ///
    /// Manifest problems and missing required files are errors; size and
    /// sensitive-data findings are warnings. When an npm client is supplied
    /// the package is packed to measure the real tarball size.
    pub async fn validate(
        &self,
        pkg: &Package,
        npm: Option<&dyn NpmClient>,
    ) -> ValidationReport {
        let mut report = ValidationReport::default();

        check_manifest(pkg, &mut report);
        self.check_required_files(pkg, &mut report);
        if let Some(npm) = npm {
            self.check_tarball_size(pkg, npm, &mut report).await;
        }
        self.check_sensitive_files(pkg, &mut report);
        self.check_sensitive_content(pkg, &mut report).await;

        report
    }

    fn check_required_files(&self, pkg: &Package, report: &mut ValidationReport) {
        for file in &self.config.required_files {
            let path = pkg.dir.join(file);
            if !path.exists() {
                report.error(
                    "MISSING_REQUIRED_FILE",
                    format!("{} is missing required file {file}", pkg.name),
                );
            }
        }
    }

    async fn check_tarball_size(
        &self,
        pkg: &Package,
        npm: &dyn NpmClient,
        report: &mut ValidationReport,
    ) {
        match npm.pack(&pkg.dir).await {
            Ok(info) => {
                if info.size > self.config.max_package_size {
                    report.warning(
                        "PACKAGE_TOO_LARGE",
                        format!(
                            "{} tarball is {} bytes (limit {})",
                            pkg.name, info.size, self.config.max_package_size
                        ),
                    );
                }
                if let Err(e) = cleanup_tarball(&pkg.dir, &info.filename).await {
                    log::debug!("Could not remove pack tarball {}: {e}", info.filename);
                }
            }
            Err(e) => {
                report.warning(
                    "PACK_FAILED",
                    format!("could not measure {} tarball: {e}", pkg.name),
                );
            }
        }
    }

    fn check_sensitive_files(&self, pkg: &Package, report: &mut ValidationReport) {
        for pattern in &self.config.sensitive_files {
            let glob_pattern = pkg.dir.join(pattern).to_string_lossy().to_string();
            let Ok(entries) = glob::glob(&glob_pattern) else { continue };

            for entry in entries.flatten() {
                if in_node_modules(&entry) {
                    continue;
                }
                report.warning(
                    "SENSITIVE_FILE",
                    format!(
                        "{} contains a sensitive file: {}",
                        pkg.name,
                        entry.strip_prefix(&pkg.dir).unwrap_or(&entry).display()
                    ),
                );
            }
        }
    }

    async fn check_sensitive_content(&self, pkg: &Package, report: &mut ValidationReport) {
        if self.patterns.is_empty() {
            return;
        }

        let mut stack = vec![pkg.dir.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else { continue };

            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let Ok(file_type) = entry.file_type().await else { continue };

                if file_type.is_dir() {
                    if !in_node_modules(&path) && !path.ends_with(".git") {
                        stack.push(path);
                    }
                    continue;
                }

                let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if !SCANNED_EXTENSIONS.contains(&extension) {
                    continue;
                }

                if let Ok(metadata) = entry.metadata().await {
                    if metadata.len() > MAX_SCANNED_BYTES {
                        continue;
                    }
                }

                let Ok(content) = tokio::fs::read_to_string(&path).await else { continue };
                self.scan_file(pkg, &path, &content, report);
            }
        }
    }

    fn scan_file(&self, pkg: &Package, path: &Path, content: &str, report: &mut ValidationReport) {
        for (line_no, line) in content.lines().enumerate() {
            if is_excluded_line(line) {
                continue;
            }

            for pattern in &self.patterns {
                if pattern.is_match(line) {
                    report.warning(
                        "SENSITIVE_CONTENT",
                        format!(
                            "{}: possible secret at {}:{}",
                            pkg.name,
                            path.strip_prefix(&pkg.dir).unwrap_or(path).display(),
                            line_no + 1
                        ),
                    );
                    break;
                }
            }
        }
    }
}

fn check_manifest(pkg: &Package, report: &mut ValidationReport) {
    if pkg.manifest.name().is_none_or(str::is_empty) {
        report.error("MISSING_NAME", "manifest has no name");
    }
    if pkg.manifest.version().is_none_or(str::is_empty) {
        report.error("MISSING_VERSION", format!("{} has no version", pkg.name));
    }

    for (field, code) in [("description", "MISSING_DESCRIPTION"), ("license", "MISSING_LICENSE")] {
        if pkg.manifest.fields.get(field).and_then(serde_json::Value::as_str).is_none() {
            report.warning(code, format!("{} has no {field}", pkg.name));
        }
    }
}

fn in_node_modules(path: &Path) -> bool {
    path.components().any(|c| c.as_os_str() == "node_modules")
}

/// Heuristics that keep comments, placeholders and environment references
/// out of the sensitive-content findings.
fn is_excluded_line(line: &str) -> bool {
    let trimmed = line.trim_start();

    // Comments
    if trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with('*')
        || trimmed.starts_with("/*")
    {
        return true;
    }

    // Environment-variable references are configuration, not secrets.
    if line.contains("process.env") || line.contains("import.meta.env") || line.contains("${") {
        return true;
    }

    // Placeholder values
    let lowered = line.to_lowercase();
    for marker in ["xxx", "changeme", "your-", "example", "placeholder", "<token>", "''", "\"\""] {
        if lowered.contains(marker) {
            return true;
        }
    }

    false
}
