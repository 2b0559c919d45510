use std::{error::Error, fs, path::PathBuf, sync::Arc};

use clap::Args;
use ncdc::config::{self, fixture::absolute_path, LoadOptions};
use ncdc::schema::{FsSchemaProvider, JsonSchemaValidator, TypeValidator};
use tracing::info;

/// Resolve a config file into the resources the server would serve.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Input config file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Output filename for the resolved JSON
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Directory of <Type>.json schemas; typed bodies are checked when set
    #[arg(long, value_name = "DIR")]
    pub schema_path: Option<PathBuf>,
}

pub async fn run(args: BuildArgs) -> Result<(), Box<dyn Error>> {
    let cfg = absolute_path(&args.config)?;
    let out = absolute_path(&args.output)?;
    info!(config = %cfg.display(), output = %out.display(), "starting build");

    let validator = args.schema_path.map(|dir| {
        Arc::new(JsonSchemaValidator::new(FsSchemaProvider::new(Some(dir))))
            as Arc<dyn TypeValidator>
    });
    let options = LoadOptions {
        validator,
        force_request_validation: false,
    };
    let loaded = config::load(&cfg, &options)?;

    let json = serde_json::to_string_pretty(&loaded.resources)?;
    fs::write(&out, json)?;

    info!(resources = loaded.resources.len(), "build succeeded");
    Ok(())
}
