use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use appkit::app::App;
use appkit::logs::{self, Factory, Field, Options};

fn serve(basename: &str, config: &Arc<Mutex<logs::Config>>) -> Result<()> {
    let config = config
        .lock()
        .map_err(|_| anyhow::anyhow!("logging config lock poisoned"))?
        .clone();

    let factory = Factory::try_new(&config, Options::default().with_namespace(basename))
        .context("Failed to build logger")?;
    logs::set_factory(factory);
    logs::init_tracing_bridge(logs::factory().logger().clone(), "info")
        .context("Failed to install tracing bridge")?;

    logs::info!("{} started", basename; Field::string("output", config.output.as_str()));
    logs::debug!("effective level {}", config.level);
    tracing::info!(pid = std::process::id(), "tracing events share the same sink");

    if let Err(e) = logs::factory().logger().rotate() {
        logs::warn!("rotation failed: {}", e);
    }

    logs::sync().context("Failed to flush logs")?;
    Ok(())
}

fn main() {
    let config = Arc::new(Mutex::new(logs::Config::default()));
    let shared = Arc::clone(&config);

    App::new("appkit", "appkit demo")
        .description("Writes a few records through the configured logging sink")
        .version(env!("CARGO_PKG_VERSION"))
        .options(config)
        .default_args()
        .run_func(move |basename| serve(basename, &shared))
        .run();
}
