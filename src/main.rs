use owl_bridge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let options = Options::new();

    let config = Config::from_options(&options)?;
    owl_bridge::init_logging(&config.loglevel);
    config.log_summary();

    owl_bridge::run(config, options.runtime).await
}
