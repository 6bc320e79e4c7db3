//! Static mapping from pass name to operation and required inputs.

use crate::config::ConfigKey;
use crate::context::PassContext;
use crate::error::Result;
use crate::pass::PassName;
use crate::passes;
use crate::validate;

const OBJECT_STORAGE: &[ConfigKey] = &[ConfigKey::TestS3Bucket, ConfigKey::TestAwsSecret];

/// What the registry knows about one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDescriptor {
    pub name: PassName,

    /// Keys that must be set before the pass spawns anything.
    pub required: &'static [ConfigKey],

    pub summary: &'static str,
}

/// Every pass, in [`PassName::ALL`] order.
pub const REGISTRY: [PassDescriptor; 7] = [
    PassDescriptor {
        name: PassName::Fmt,
        required: &[],
        summary: "generated code, formatting, vet, analyzers, license headers",
    },
    PassDescriptor {
        name: PassName::Build,
        required: &[ConfigKey::OperatorImage],
        summary: "operator binaries and container image",
    },
    PassDescriptor {
        name: PassName::E2e,
        required: OBJECT_STORAGE,
        summary: "end-to-end tests",
    },
    PassDescriptor {
        name: PassName::E2eSlow,
        required: OBJECT_STORAGE,
        summary: "slow end-to-end tests",
    },
    PassDescriptor {
        name: PassName::E2eSh,
        required: OBJECT_STORAGE,
        summary: "self-hosted end-to-end tests",
    },
    PassDescriptor {
        name: PassName::Upgrade,
        required: &[ConfigKey::UpgradeFrom, ConfigKey::UpgradeTo],
        summary: "operator upgrade test",
    },
    PassDescriptor {
        name: PassName::Unit,
        required: &[],
        summary: "unit tests with coverage",
    },
];

/// Resolves pass names to their descriptors and operations.
pub struct PassRegistry;

impl PassRegistry {
    pub fn descriptor(name: PassName) -> &'static PassDescriptor {
        let index = match name {
            PassName::Fmt => 0,
            PassName::Build => 1,
            PassName::E2e => 2,
            PassName::E2eSlow => 3,
            PassName::E2eSh => 4,
            PassName::Upgrade => 5,
            PassName::Unit => 6,
        };
        &REGISTRY[index]
    }

    /// Validate the pass's required inputs, then run its operation.
    pub async fn run(name: PassName, ctx: &PassContext<'_>) -> Result<()> {
        validate::require(ctx.config, name, Self::descriptor(name).required)?;
        match name {
            PassName::Fmt => passes::fmt::run(ctx).await,
            PassName::Build => passes::build::run(ctx).await,
            PassName::E2e | PassName::E2eSlow | PassName::E2eSh => {
                passes::e2e::run_tier(ctx, name).await
            }
            PassName::Upgrade => passes::e2e::run_upgrade(ctx).await,
            PassName::Unit => passes::unit::run(ctx).await,
        }
    }
}
