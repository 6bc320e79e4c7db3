//! `build`: operator binaries, then the container image.

use crate::config::ConfigKey;
use crate::context::PassContext;
use crate::error::Result;

/// Environment variable the build scripts read the image reference from.
const IMAGE_ENV: &str = "IMAGE";

pub async fn run(ctx: &PassContext<'_>) -> Result<()> {
    let steps = &ctx.toolchain.build;
    let image = ctx.config.get_or(ConfigKey::OperatorImage, "");

    let ordered = std::iter::once(&steps.primary)
        .chain(steps.auxiliary.iter())
        .chain(std::iter::once(&steps.image_push));

    for template in ordered {
        let label = format!("build {}", template.program);
        ctx.reporter.step(&format!("Running {}...", template.program));
        ctx.run_required(ctx.spec(template, label).env(IMAGE_ENV, image))
            .await?;
    }
    Ok(())
}
