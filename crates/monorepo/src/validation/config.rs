use crate::config::{PublishOrder, ShipitConfig};
use crate::validation::ValidationReport;

const MAX_SANE_CONCURRENCY: usize = 10;
const MIN_SANE_PACKAGE_SIZE: u64 = 1024;

/// Schema and cross-field checks over the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration.
    ///
    /// Structural problems (unknown default registry, malformed URLs, zero
    /// concurrency) are errors; questionable-but-workable combinations are
    /// warnings.
    #[must_use]
    pub fn validate(config: &ShipitConfig) -> ValidationReport {
        let mut report = ValidationReport::default();

        if let Some(default) = &config.default_registry {
            if !config.registries.contains_key(default) && default != "npm" {
                report.error(
                    "UNKNOWN_DEFAULT_REGISTRY",
                    format!("defaultRegistry '{default}' does not name a configured registry"),
                );
            }
        }

        for (name, registry) in &config.registries {
            if !registry.url.starts_with("https://") && !registry.url.starts_with("http://") {
                report.error(
                    "INVALID_REGISTRY_URL",
                    format!("registry '{name}' URL '{}' is not an http(s) URL", registry.url),
                );
            }
        }

        if config.publish.concurrency == 0 {
            report.error("INVALID_CONCURRENCY", "publish.concurrency must be at least 1");
        } else if config.publish.concurrency > MAX_SANE_CONCURRENCY {
            report.warning(
                "HIGH_CONCURRENCY",
                format!(
                    "publish.concurrency {} exceeds {MAX_SANE_CONCURRENCY}; registries may throttle",
                    config.publish.concurrency
                ),
            );
        }

        if config.git.push_tag && !config.git.create_tag {
            report.warning(
                "INCONSISTENT_GIT_CONFIG",
                "git.pushTag is set but git.createTag is not; nothing will be pushed",
            );
        }
        if config.git.push_commit && !config.git.create_commit {
            report.warning(
                "INCONSISTENT_GIT_CONFIG",
                "git.pushCommit is set but git.createCommit is not; nothing will be pushed",
            );
        }

        if config.publish.parallel && config.monorepo.publish_order == PublishOrder::Serial {
            report.warning(
                "CONFLICTING_PUBLISH_CONFIG",
                "publish.parallel has no effect while monorepo.publishOrder is 'serial'",
            );
        }

        if config.validation.max_package_size < MIN_SANE_PACKAGE_SIZE {
            report.warning(
                "SMALL_PACKAGE_SIZE_LIMIT",
                format!(
                    "validation.maxPackageSize {} bytes is below {MIN_SANE_PACKAGE_SIZE}; \
                     almost every tarball will warn",
                    config.validation.max_package_size
                ),
            );
        }

        if config.retry.attempts == 0 {
            report.error("INVALID_RETRY", "retry.attempts must be at least 1");
        }

        report
    }
}
