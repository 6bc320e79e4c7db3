//! Unit-test package discovery.

use tracing::debug;

use crate::config::ConfigKey;
use crate::context::PassContext;
use crate::error::Result;

/// Packages to unit test: `TEST_PKGS` when set, otherwise the lister's
/// output minus excluded packages.
pub async fn discover(ctx: &PassContext<'_>) -> Result<Vec<String>> {
    let explicit = ctx.config.list(ConfigKey::TestPackages);
    if !explicit.is_empty() {
        debug!(count = explicit.len(), "Using packages from TEST_PKGS");
        return Ok(explicit);
    }

    let discovery = &ctx.toolchain.packages;
    let result = ctx
        .run_required(ctx.spec(&discovery.lister, "list packages"))
        .await?;
    let packages = filter_packages(&result.stdout, &discovery.exclude);
    debug!(count = packages.len(), "Discovered packages");
    Ok(packages)
}

/// One package per non-empty line, dropping any containing an exclusion.
pub fn filter_packages(listing: &str, exclude: &[String]) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !exclude.iter().any(|e| line.contains(e.as_str())))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_excluded_packages() {
        let listing = "github.com/coreos/etcd-operator/pkg/util\n\
                       github.com/coreos/etcd-operator/test/e2e\n\
                       github.com/coreos/etcd-operator/test/e2e/e2eslow\n\
                       \n\
                       github.com/coreos/etcd-operator/pkg/cluster\n";
        let exclude = vec!["/test/e2e".to_string()];
        assert_eq!(
            filter_packages(listing, &exclude),
            vec![
                "github.com/coreos/etcd-operator/pkg/util",
                "github.com/coreos/etcd-operator/pkg/cluster"
            ]
        );
    }
}
