use crate::commands::{Command, CommandOutput};
use crate::tracing::{LogLevel, TracingConfig, TracingFormat};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use miette::{Diagnostic, Report};
use secman_aws::AwsConfig;
use secman_secrets::{
    ClientConfig, DeletePolicy, ErrorKind, RetryConfig, SecretError, Tag, TagFilter, tags_from,
};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Usage or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Failed secret operation exit code
pub const EXIT_OPERATION: i32 = 3;
/// Exit code for SIGINT (128 + signal number 2)
pub const EXIT_SIGINT: i32 = 130;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Usage or configuration error (exit code 2)
    #[error("Configuration error: {message}")]
    #[diagnostic(code(secman::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A secret operation failed (exit code 3)
    #[error("[{kind}] {message}")]
    #[diagnostic(code(secman::cli::operation))]
    Operation {
        /// Failure classification
        kind: ErrorKind,
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Interrupted by the user (exit code 130)
    #[error("Interrupted: {message}")]
    #[diagnostic(code(secman::cli::interrupted))]
    Interrupted {
        /// The error message
        message: String,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Stable code reported in the JSON error envelope
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config { .. } => "configuration",
            Self::Operation { kind, .. } => kind.as_str(),
            Self::Interrupted { .. } => "cancelled",
        }
    }
}

/// Suggested next step for a failed operation
fn help_for(err: &SecretError) -> Option<&'static str> {
    match err.kind() {
        ErrorKind::NotFound => Some("Run 'secman list' to see available secrets"),
        ErrorKind::DuplicateName => Some("Choose another name, or use 'secman update-value'"),
        ErrorKind::Deserialization => Some("The stored value is not valid JSON"),
        ErrorKind::Timeout => Some("Increase --timeout or check connectivity to the service"),
        ErrorKind::Service if err.is_retryable() => {
            Some("The service is unavailable or throttling; try again later")
        }
        ErrorKind::Service => Some("Check that your credentials allow this operation"),
        _ => None,
    }
}

/// Map library errors onto CLI categories.
///
/// Configuration problems exit with code 2, cancellation with 130 and every
/// other failure with 3.
impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        const CONFIG_HELP: &str = "Pass --region/--profile or set AWS_REGION; credentials come from the standard AWS provider chain";

        match (err.kind(), err) {
            // Keep just the message to avoid "Configuration error: Configuration error:"
            (_, SecretError::Configuration { message }) => {
                Self::config_with_help(message, CONFIG_HELP)
            }
            (ErrorKind::Configuration, err) => Self::config_with_help(err.to_string(), CONFIG_HELP),
            (ErrorKind::Cancelled, err) => Self::Interrupted {
                message: err.to_string(),
            },
            (kind, err) => Self::Operation {
                kind,
                help: help_for(&err).map(str::to_string),
                message: err.to_string(),
            },
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Operation { .. } => EXIT_OPERATION,
        CliError::Interrupted { .. } => EXIT_SIGINT,
    }
}

/// Render error to stderr, as a JSON envelope or a miette report
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": err.code(),
            "message": err.to_string(),
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
    }
    let _ = io::stderr().flush();
}

/// Render a successful result to stdout
pub fn render_output(output: &CommandOutput, json_mode: bool) {
    if json_mode {
        match serde_json::to_string(&OkEnvelope::new(output)) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing response: {e}"),
        }
    } else {
        let text = output.to_text();
        if !text.is_empty() {
            println!("{text}");
        }
    }
    let _ = io::stdout().flush();
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Parse a `--data` argument as JSON
fn parse_json(raw: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))
}

/// Parse `--max-attempts`, which must be at least one
fn parse_attempts(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Manage secrets in AWS Secrets Manager.
#[derive(Parser, Debug)]
#[command(name = "secman")]
#[command(about = "Create, list, read, update and delete secrets in AWS Secrets Manager")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output layout.
    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "pretty",
        value_enum
    )]
    pub log_format: TracingFormat,

    /// Emit JSON envelope instead of text.
    #[arg(long, global = true, help = "Emit JSON envelope instead of text")]
    pub json: bool,

    /// AWS region.
    #[arg(long, global = true, env = "AWS_REGION", help = "AWS region")]
    pub region: Option<String>,

    /// Shared-config profile.
    #[arg(long, global = true, env = "AWS_PROFILE", help = "AWS shared-config profile")]
    pub profile: Option<String>,

    /// Custom service endpoint.
    #[arg(
        long,
        global = true,
        env = "SECMAN_ENDPOINT_URL",
        help = "Custom Secrets Manager endpoint (e.g. a local emulator)"
    )]
    pub endpoint_url: Option<String>,

    /// Per-operation deadline in seconds.
    #[arg(
        long,
        global = true,
        env = "SECMAN_TIMEOUT",
        value_name = "SECS",
        help = "Per-operation deadline in seconds, retries included"
    )]
    pub timeout: Option<u64>,

    /// Attempts per operation, including the first.
    #[arg(
        long,
        global = true,
        env = "SECMAN_MAX_ATTEMPTS",
        default_value = "3",
        value_parser = parse_attempts,
        help = "Attempts per operation for transient failures"
    )]
    pub max_attempts: usize,
}

impl Cli {
    /// Logging settings from `--level` and `--log-format`
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            format: self.log_format,
            level: self.level.into(),
            ..TracingConfig::default()
        }
    }

    /// Connection settings for the AWS store
    #[must_use]
    pub fn aws_config(&self) -> AwsConfig {
        AwsConfig {
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
        }
    }

    /// Retry and deadline settings for the client
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: self.timeout.map(Duration::from_secs),
            retry: RetryConfig {
                max_attempts: self.max_attempts,
                ..RetryConfig::default()
            },
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a secret from a JSON payload.
    #[command(about = "Create a secret from a JSON payload")]
    Create {
        /// Secret name.
        #[arg(long, short = 'n')]
        name: String,
        /// Payload as JSON.
        #[arg(long, short = 'd', value_name = "JSON", value_parser = parse_json)]
        data: serde_json::Value,
        /// Tag to attach (repeatable).
        #[arg(long = "tag", short = 't', value_name = "KEY=VALUE", action = clap::ArgAction::Append)]
        tags: Vec<Tag>,
        /// Human-readable description.
        #[arg(long)]
        description: Option<String>,
    },
    /// List secrets carrying every given tag.
    #[command(about = "List secrets carrying every given tag")]
    List {
        /// Required tag (repeatable).
        #[arg(long = "tag", short = 't', value_name = "KEY=VALUE", action = clap::ArgAction::Append)]
        tags: Vec<Tag>,
    },
    /// Print a secret's decoded value.
    #[command(about = "Print a secret's decoded value")]
    Get {
        /// Secret name or ARN.
        #[arg(long, short = 'n')]
        name: String,
    },
    /// Replace a secret's value.
    #[command(about = "Replace a secret's value")]
    UpdateValue {
        /// Secret name or ARN.
        #[arg(long, short = 'n')]
        name: String,
        /// New payload as JSON.
        #[arg(long, short = 'd', value_name = "JSON", value_parser = parse_json)]
        data: serde_json::Value,
    },
    /// Merge tags into a secret.
    #[command(about = "Merge tags into a secret; existing keys are overwritten, others kept")]
    UpdateTags {
        /// Secret name or ARN.
        #[arg(long, short = 'n')]
        name: String,
        /// Tag to add or overwrite (repeatable).
        #[arg(
            long = "tag",
            short = 't',
            value_name = "KEY=VALUE",
            action = clap::ArgAction::Append,
            required = true
        )]
        tags: Vec<Tag>,
    },
    /// Delete a secret.
    #[command(about = "Delete a secret (scheduled with a recovery window unless --force)")]
    Delete {
        /// Secret name or ARN.
        #[arg(long, short = 'n')]
        name: String,
        /// Delete immediately without a recovery window.
        #[arg(long, conflicts_with = "recovery_window_days")]
        force: bool,
        /// Days before permanent deletion (7-30).
        #[arg(long, value_parser = clap::value_parser!(u8).range(7..=30))]
        recovery_window_days: Option<u8>,
    },
    /// Generate shell completions.
    #[command(about = "Generate shell completions")]
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Convert to an executable command; `None` for commands handled locally
    #[must_use]
    pub fn into_command(self) -> Option<Command> {
        let command = match self {
            Self::Create {
                name,
                data,
                tags,
                description,
            } => Command::Create {
                name,
                data,
                tags: tags_from(tags),
                description,
            },
            Self::List { tags } => Command::List {
                filter: TagFilter::from_tags(tags),
            },
            Self::Get { name } => Command::Get { name },
            Self::UpdateValue { name, data } => Command::UpdateValue { name, data },
            Self::UpdateTags { name, tags } => Command::UpdateTags {
                name,
                tags: tags_from(tags),
            },
            Self::Delete {
                name,
                force,
                recovery_window_days,
            } => {
                let policy = if force {
                    DeletePolicy::Immediate
                } else {
                    recovery_window_days.map_or_else(DeletePolicy::default, |days| {
                        DeletePolicy::Scheduled {
                            recovery_window_days: days,
                        }
                    })
                };
                Command::Delete { name, policy }
            }
            Self::Completions { .. } => return None,
        };
        Some(command)
    }
}

/// Write a completion script for `shell` to stdout
pub fn generate_completions(shell: Shell) {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "secman", &mut io::stdout());
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secman_secrets::Tags;
    use serde_json::json;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["secman", "get", "--name", "x"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert_eq!(cli.log_format, TracingFormat::Pretty);
        assert!(!cli.json);
        assert_eq!(cli.max_attempts, 3);
    }

    #[test]
    fn test_cli_tracing_config() {
        let cli = Cli::try_parse_from([
            "secman",
            "--level",
            "debug",
            "--log-format",
            "json",
            "list",
        ])
        .unwrap();
        let config = cli.tracing_config();
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.level, crate::tracing::Level::DEBUG);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_cli_log_level_parsing() {
        let cli = Cli::try_parse_from(["secman", "--level", "debug", "list"]).unwrap();
        assert_eq!(cli.level, LogLevel::Debug);

        let cli = Cli::try_parse_from(["secman", "-L", "error", "list"]).unwrap();
        assert_eq!(cli.level, LogLevel::Error);

        assert!(Cli::try_parse_from(["secman", "--level", "loud", "list"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "secman",
            "list",
            "--json",
            "--region",
            "eu-west-1",
            "--timeout",
            "5",
            "--max-attempts",
            "1",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.aws_config().region.as_deref(), Some("eu-west-1"));
        let config = cli.client_config();
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(Cli::try_parse_from(["secman", "--max-attempts", "0", "list"]).is_err());
    }

    #[test]
    fn test_create_command() {
        let cli = Cli::try_parse_from([
            "secman",
            "create",
            "--name",
            "db-creds",
            "--data",
            r#"{"user":"app","pass":"x"}"#,
            "--tag",
            "service=billing",
            "-t",
            "component=db",
            "--description",
            "database login",
        ])
        .unwrap();

        let command = cli.command.unwrap().into_command().unwrap();
        let Command::Create {
            name,
            data,
            tags,
            description,
        } = command
        else {
            panic!("Expected Create command");
        };
        assert_eq!(name, "db-creds");
        assert_eq!(data, json!({"user": "app", "pass": "x"}));
        assert_eq!(tags.get("service").map(String::as_str), Some("billing"));
        assert_eq!(tags.len(), 2);
        assert_eq!(description.as_deref(), Some("database login"));
    }

    #[test]
    fn test_create_rejects_invalid_json() {
        let err = Cli::try_parse_from(["secman", "create", "--name", "x", "--data", "{bad"])
            .unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn test_malformed_tag_rejected() {
        assert!(Cli::try_parse_from(["secman", "list", "--tag", "novalue"]).is_err());
        assert!(Cli::try_parse_from(["secman", "list", "--tag", "=x"]).is_err());
    }

    #[test]
    fn test_list_command_builds_filter() {
        let cli =
            Cli::try_parse_from(["secman", "list", "--tag", "service=billing"]).unwrap();
        let command = cli.command.unwrap().into_command().unwrap();
        assert_eq!(
            command,
            Command::List {
                filter: TagFilter::new().with("service", "billing")
            }
        );

        let cli = Cli::try_parse_from(["secman", "list"]).unwrap();
        let command = cli.command.unwrap().into_command().unwrap();
        assert_eq!(
            command,
            Command::List {
                filter: TagFilter::new()
            }
        );
    }

    #[test]
    fn test_get_and_update_value_commands() {
        let cli = Cli::try_parse_from(["secman", "get", "-n", "db-creds"]).unwrap();
        assert_eq!(
            cli.command.unwrap().into_command(),
            Some(Command::Get {
                name: "db-creds".to_string()
            })
        );

        let cli = Cli::try_parse_from([
            "secman",
            "update-value",
            "--name",
            "db-creds",
            "--data",
            "[1,2]",
        ])
        .unwrap();
        assert_eq!(
            cli.command.unwrap().into_command(),
            Some(Command::UpdateValue {
                name: "db-creds".to_string(),
                data: json!([1, 2]),
            })
        );
    }

    #[test]
    fn test_update_tags_requires_a_tag() {
        assert!(Cli::try_parse_from(["secman", "update-tags", "--name", "x"]).is_err());

        let cli = Cli::try_parse_from([
            "secman",
            "update-tags",
            "--name",
            "x",
            "--tag",
            "env=prod",
        ])
        .unwrap();
        let mut expected = Tags::new();
        expected.insert("env".to_string(), "prod".to_string());
        assert_eq!(
            cli.command.unwrap().into_command(),
            Some(Command::UpdateTags {
                name: "x".to_string(),
                tags: expected,
            })
        );
    }

    #[test]
    fn test_delete_policies() {
        let parse = |args: &[&str]| {
            let mut argv = vec!["secman", "delete", "--name", "x"];
            argv.extend_from_slice(args);
            match Cli::try_parse_from(argv).unwrap().command.unwrap().into_command() {
                Some(Command::Delete { policy, .. }) => policy,
                other => panic!("Expected Delete command, got {other:?}"),
            }
        };

        assert_eq!(parse(&[]), DeletePolicy::default());
        assert_eq!(parse(&["--force"]), DeletePolicy::Immediate);
        assert_eq!(
            parse(&["--recovery-window-days", "7"]),
            DeletePolicy::Scheduled {
                recovery_window_days: 7
            }
        );
    }

    #[test]
    fn test_delete_rejects_bad_window() {
        for days in ["6", "31", "abc"] {
            assert!(
                Cli::try_parse_from([
                    "secman",
                    "delete",
                    "--name",
                    "x",
                    "--recovery-window-days",
                    days
                ])
                .is_err(),
                "window {days} should be rejected"
            );
        }
        assert!(
            Cli::try_parse_from([
                "secman",
                "delete",
                "--name",
                "x",
                "--force",
                "--recovery-window-days",
                "7"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_completions_is_local() {
        let cli = Cli::try_parse_from(["secman", "completions", "bash"]).unwrap();
        assert!(cli.command.unwrap().into_command().is_none());
    }

    #[test]
    fn test_missing_subcommand() {
        let cli = Cli::try_parse_from(["secman"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&CliError::config("x")), EXIT_CLI);
        assert_eq!(
            exit_code_for(&SecretError::not_found("x").into()),
            EXIT_OPERATION
        );
        assert_eq!(
            exit_code_for(&SecretError::configuration("no region").into()),
            EXIT_CLI
        );
        assert_eq!(
            exit_code_for(&SecretError::Cancelled { operation: "GetSecretValue" }.into()),
            EXIT_SIGINT
        );
    }

    #[test]
    fn test_error_codes_follow_kind() {
        let err: CliError = SecretError::DuplicateName {
            name: "x".to_string(),
        }
        .into();
        assert_eq!(err.code(), "duplicate_name");
        assert!(matches!(err, CliError::Operation { help: Some(_), .. }));

        let err: CliError = SecretError::configuration("no region").into();
        assert_eq!(err.code(), "configuration");
        assert_eq!(err.to_string(), "Configuration error: no region");
    }

    #[test]
    fn test_text_report_names_failure_kind() {
        let err: CliError = SecretError::Deserialization {
            id: "db-creds".to_string(),
            message: "expected value at line 1 column 1".to_string(),
        }
        .into();
        assert_eq!(err.code(), "deserialization");

        let rendered = format!("{:?}", Report::new(err));
        assert!(rendered.contains("[deserialization]"));
        assert!(rendered.contains("db-creds"));

        let rendered = format!("{:?}", Report::new(CliError::from(SecretError::not_found("x"))));
        assert!(rendered.contains("[not_found]"));
    }

    #[test]
    fn test_envelopes() {
        let ok = serde_json::to_string(&OkEnvelope::new("data")).unwrap();
        assert_eq!(ok, r#"{"status":"ok","data":"data"}"#);

        let error = serde_json::to_value(ErrorEnvelope::new(json!({"code": "not_found"}))).unwrap();
        assert_eq!(error, json!({"status": "error", "error": {"code": "not_found"}}));
    }
}
