//! Version and compatibility helpers.
//!
//! `dmc-core` re-exports the `dmc-types` schema for older callers. From 0.3.0
//! on those re-exports are deprecated and they go away in 1.0.0. Nothing is
//! emitted at load time; callers ask explicitly through
//! [`schema_deprecation_notice`] or [`warn_if_schema_deprecated`].

use semver::Version;
use serde::Serialize;
use tracing::warn;

/// Crate version, from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version at which the schema re-exports become deprecated.
pub const SCHEMA_DEPRECATED_SINCE: Version = Version::new(0, 3, 0);

/// Version at which the schema re-exports are removed.
pub const SCHEMA_REMOVED_IN: Version = Version::new(1, 0, 0);

/// Older names for the schema types.
pub type ProposalLike = dmc_types::Proposal;
pub type DecisionLike = dmc_types::FinalDecision;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeprecationNotice {
    pub since: String,
    pub removed_in: String,
    pub message: String,
}

/// Deprecation notice for the schema re-exports at `version`, if any.
pub fn schema_deprecation_notice(version: &str) -> Result<Option<DeprecationNotice>, semver::Error> {
    let version = Version::parse(version)?;
    if version < SCHEMA_DEPRECATED_SINCE {
        return Ok(None);
    }
    Ok(Some(DeprecationNotice {
        since: SCHEMA_DEPRECATED_SINCE.to_string(),
        removed_in: SCHEMA_REMOVED_IN.to_string(),
        message: format!(
            "Using the schema re-exports from dmc_core is deprecated; depend on dmc_types \
             directly. Re-exports will be removed in {SCHEMA_REMOVED_IN}."
        ),
    }))
}

/// Log the notice for this build's [`VERSION`]. Returns whether one was logged.
pub fn warn_if_schema_deprecated() -> bool {
    match schema_deprecation_notice(VERSION) {
        Ok(Some(notice)) => {
            warn!(since = %notice.since, removed_in = %notice.removed_in, "{}", notice.message);
            true
        }
        Ok(None) => false,
        Err(e) => {
            warn!(version = VERSION, error = %e, "Unparseable crate version");
            false
        }
    }
}

/// Whether `version` has the expected major version.
pub fn is_compatible(version: &str, expected_major: u64) -> bool {
    Version::parse(version).is_ok_and(|v| v.major == expected_major)
}
