use anyhow::Result;
use clap::Parser;
use log::{error, info, LevelFilter};
use ssd_gt::{config::Config, pipeline};
use std::{env, process};

fn main() -> Result<()> {
    // default to INFO level unless RUST_LOG is set
    {
        let mut builder = pretty_env_logger::formatted_builder();
        match env::var("RUST_LOG") {
            Ok(filters) => builder.parse_filters(&filters),
            Err(_) => builder.filter_level(LevelFilter::Info),
        };
        builder.init();
    }

    let config = Config::parse();
    info!("configuration:\n{}", serde_json::to_string_pretty(&config)?);

    let source = match pipeline::load_source(&config) {
        Ok(source) => source,
        Err(err) => {
            error!("unable to load data source: {:#}", err);
            process::exit(1);
        }
    };

    if let Err(err) = pipeline::process(&config, &source) {
        error!("{:#}", err);
        process::exit(1);
    }

    Ok(())
}
