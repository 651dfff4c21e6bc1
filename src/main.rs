use clap::Parser;
use watchcopy::Settings;
use watchcopy::cli::commands::{config, init, watch};
use watchcopy::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // --config wins over the upward search
    let settings_path = cli.config.clone().or_else(Settings::find_workspace_config);
    let loaded = match &settings_path {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let settings = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    watchcopy::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => config::run_config(&settings, settings_path.as_deref()),
        Commands::Watch(args) => {
            if let Err(e) = watch::run_watch(args, &settings).await {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}
