//! Metaball viewer: one window, one animated scene.

use anyhow::{Context, Result};

use blobfield_engine::device::GpuInit;
use blobfield_engine::logging::{LoggingConfig, init_logging};
use blobfield_engine::orchestrator::{FrameOrchestrator, SceneConfig};
use blobfield_engine::window::{Runtime, RuntimeConfig};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut config = SceneConfig::default();
    // The kernel ships as a file next to the binary's working directory;
    // allow pointing elsewhere without a rebuild.
    if let Ok(path) = std::env::var("BLOBFIELD_KERNEL") {
        config.kernel_path = path.into();
    }

    let app =
        FrameOrchestrator::new(config).context("failed to set up the extraction pipeline")?;

    let runtime_config = RuntimeConfig {
        title: "blobfield".to_string(),
        ..RuntimeConfig::default()
    };

    let app = Runtime::run(runtime_config, GpuInit::default(), app)?;

    if let Some(err) = app.fatal() {
        anyhow::bail!("frame loop stopped on a fatal error: {err}");
    }

    log::info!("exited cleanly");
    Ok(())
}
