use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use translation_poller::cli::{Cli, Commands};
use translation_poller::commands;
use translation_poller::config::ConfigFile;
use translation_poller::error::{Error, ErrorKind};
use translation_poller::term;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    term::init(cli.quiet, cli.color);
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        term::error_with_details(&e);
        match e.kind() {
            ErrorKind::Timeout => term::hint("Increase --timeout to wait longer."),
            ErrorKind::Configuration => {
                term::hint("Check tpoll.toml, TPOLL_* variables, and flags.")
            }
            _ => {}
        }
        return e.exit_code().into();
    }

    std::process::ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<(), Error> {
    let (config_path, explicit) = cli.config_path();

    match cli.command {
        Commands::Status(args) => {
            let file = ConfigFile::load_optional(&config_path, explicit)?;
            debug!(path = %config_path.display(), explicit, "Loaded configuration");
            let config = commands::status::resolve_config(&args, &file)?;

            let cancel = CancellationToken::new();
            let _ctrl_c = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
            commands::status::execute(args, config, &cancel).await
        }
        Commands::Serve(args) => commands::serve::execute(args, shutdown_signal()).await,
        Commands::Completions(args) => {
            args.generate();
            Ok(())
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    shutdown_signal().await;
    cancel.cancel();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "translation_poller=warn",
        1 => "translation_poller=info",
        2 => "translation_poller=debug",
        _ => "translation_poller=trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}
