use clap::Parser;
use fabricator::adapters::catalog::FactoryCatalog;
use fabricator::cli::{Cli, DEFAULT_CONNECTION_SIZE};
use fabricator::config::Settings;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = Settings::new_with_cli(&cli)?;
    let catalog = FactoryCatalog::from_settings(&settings)?;

    let mut factory = catalog.get(&cli.factory)?;
    for trait_name in &cli.traits {
        factory = factory.use_trait(trait_name)?;
    }
    let inputs = cli.inputs();

    info!("Building with factory '{}'", cli.factory);

    let output = match (cli.connection_args(), cli.count) {
        (Some(args), count) => {
            let count = count.unwrap_or(DEFAULT_CONNECTION_SIZE);
            serde_json::to_value(factory.build_connection_with(count, &args, inputs).await?)?
        }
        (None, Some(count)) => serde_json::to_value(factory.build_list_with(count, inputs).await?)?,
        (None, None) => factory.build_with(inputs).await?.to_json(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
