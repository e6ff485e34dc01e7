use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::{debug, error, info, warn};

use crate::args::{Cli, Command, LoadArgs, ServerArgs};
use crate::config::{apply_config, load_config};
use crate::error::{AppError, AppResult};
use crate::grpc::{PingServer, PingServerOptions, run_grpc_test};
use crate::shutdown::{request_shutdown, shutdown_channel, wait_for_shutdown};
use crate::shutdown_handlers::setup_signal_shutdown_handler;
use crate::system::{selection_lines, summary_json, summary_lines, write_summary_json};

/// Parses the command line and runs the selected subcommand on a
/// multi-threaded runtime.
///
/// # Errors
///
/// Returns the first error of argument parsing, configuration, the run or
/// the server.
pub fn run() -> AppResult<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    crate::logger::init_logging(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(cli, &matches))
}

async fn run_async(cli: Cli, matches: &ArgMatches) -> AppResult<()> {
    match cli.command {
        Command::Load(args) => {
            let load_matches = matches.subcommand_matches("load").unwrap_or(matches);
            run_load(args, load_matches).await
        }
        Command::Server(args) => run_server(&args).await,
    }
}

async fn run_load(mut args: LoadArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(&mut args, matches, &config)?;
    }

    let options = args.runner_options().map_err(|err| {
        error!("Missing destination (pass it as argument or set it in the config).");
        AppError::validation(err)
    })?;
    for line in selection_lines(&options) {
        debug!("{}", line);
    }

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);

    let outcome = run_grpc_test(&options, shutdown_rx).await;

    request_shutdown(&shutdown_tx);
    if let Err(err) = signal_handle.await {
        warn!("Signal handler task failed: {}", err);
    }

    let result = outcome.inspect_err(|err| {
        if err.is_connection() {
            error!("Bring-up failed; pass --allow-initial-errors to record failures instead.");
        }
    })?;
    if args.json {
        println!("{}", summary_json(&result)?);
    } else {
        for line in summary_lines(&result) {
            println!("{}", line);
        }
    }

    if let Some(path) = args.output.as_deref() {
        write_summary_json(path, &result).await?;
        info!(path = %path.display(), "Wrote run summary");
    }
    Ok(())
}

async fn run_server(args: &ServerArgs) -> AppResult<()> {
    let handle = PingServer::start(PingServerOptions::from(args)).await?;
    info!(addr = %handle.local_addr(), "Serving, press Ctrl+C to stop");

    let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    wait_for_shutdown(&mut shutdown_rx).await;
    if let Err(err) = signal_handle.await {
        warn!("Signal handler task failed: {}", err);
    }

    handle.shutdown().await
}
