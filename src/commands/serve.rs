use std::{error::Error, net::SocketAddr, path::PathBuf};

use clap::Args;
use ncdc::reload::{ReloadController, ServeOptions, DEFAULT_PORT};
use tracing::info;

/// Serve the resources of a config file (with optional file-watcher).
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Config file to serve
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Port to listen on
    #[arg(value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Restart the server when the config, its fixtures or schemas change
    #[arg(short, long)]
    pub watch: bool,

    /// Directory of <Type>.json schemas used to validate typed bodies
    #[arg(long, value_name = "DIR")]
    pub schema_path: Option<PathBuf>,
}

pub async fn run(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    info!(
        config = %args.config.display(),
        port = args.port,
        watch_enabled = args.watch,
        "serving configuration"
    );

    let options = ServeOptions {
        config_path: args.config,
        address: SocketAddr::from(([0, 0, 0, 0], args.port)),
        schema_dir: args.schema_path,
        watch: args.watch,
    };
    let (controller, handle) = ReloadController::start(options).await?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            handle.shutdown();
        }
    });

    controller.run().await?;
    Ok(())
}
