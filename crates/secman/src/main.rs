//! secman CLI entry point

// CLI binary needs to output to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use secman::cli::{self, Cli, CliError, EXIT_OK, exit_code_for, render_error, render_output};
use secman::commands;
use secman::tracing::init_tracing;
use secman_aws::AwsSecretStore;
use secman_secrets::SecretsClient;
use tracing::instrument;

fn main() {
    // Tracing may be unusable during a panic, so report directly
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    // Completions need neither a runtime nor a connection
    if let Some(cli::Commands::Completions { shell }) = &cli.command {
        cli::generate_completions(*shell);
        std::process::exit(EXIT_OK);
    }

    // One operation at a time; a single-threaded runtime is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let exit_code = rt.block_on(run(cli));
    std::process::exit(exit_code);
}

/// Run the parsed command and map the outcome to an exit code
async fn run(cli: Cli) -> i32 {
    // Must precede the `secman` span. Ignore error if already initialized
    let _ = init_tracing(cli.tracing_config());

    let json_mode = cli.json;
    match real_main(cli).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            render_error(&err, json_mode);
            exit_code_for(&err)
        }
    }
}

#[instrument(name = "secman", skip_all)]
async fn real_main(cli: Cli) -> Result<(), CliError> {
    let aws_config = cli.aws_config();
    let client_config = cli.client_config();
    let json_mode = cli.json;

    let Some(command) = cli.command.and_then(cli::Commands::into_command) else {
        return Err(CliError::config_with_help(
            "No subcommand provided",
            "Run 'secman --help' for usage information",
        ));
    };
    tracing::debug!(command = command.name(), "Dispatching command");

    let store = AwsSecretStore::connect(&aws_config).await?;
    let client = SecretsClient::new(store, client_config);

    // Ctrl-C cancels the in-flight operation, which then reports Cancelled
    let token = client.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            token.cancel();
        }
    });

    let result = commands::execute(&client, command).await;
    interrupt.abort();

    render_output(&result?, json_mode);
    Ok(())
}
