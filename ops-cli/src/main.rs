use clap::Parser;
use ops_cli::{commands, Cli};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    commands::run(cli).await
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("ops_cli={default_level},document_storage={default_level},crypto={default_level},error_common=info").into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr).json())
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(verbose).with_writer(std::io::stderr))
            .init();
    }
}
