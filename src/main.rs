use clap::{Args, Parser, Subcommand};
use env_guard::apply::ApplyMode;
use env_guard::env::ProcessEnv;
use env_guard::guard::{ConfigureOptions, EnvGuard, VerifyOptions};
use env_guard::reconcile::ReconciliationPolicy;
use env_guard::resolve::{DEFAULT_MAIN_FILENAME, FileLayout};
use std::path::PathBuf;
use std::process::{Command as Process, ExitCode};

#[derive(Parser)]
#[command(
  name = "env-guard",
  about = "Load a .env file into the environment, validated against a template",
  version,
  author
)]
struct Cli {
  #[command(subcommand)]
  command: Command,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,
}

#[derive(Subcommand)]
enum Command {
  /// Load the main file into the environment, then run COMMAND with it
  Configure {
    #[command(flatten)]
    files: FileArgs,

    /// Name of the main file
    #[arg(short, long, default_value = DEFAULT_MAIN_FILENAME)]
    main: String,

    /// Load the main file without checking it against a template
    #[arg(long)]
    no_template: bool,

    /// Accept keys that the template does not declare
    #[arg(long)]
    allow_extra: bool,

    /// Reject declared keys with an empty value
    #[arg(long)]
    disallow_empty: bool,

    /// Stop at the first variable the environment rejects
    #[arg(long)]
    fail_fast: bool,

    /// Command to run with the configured environment
    #[arg(last = true)]
    command: Vec<String>,
  },
  /// Check that the environment provides every key the template declares
  Verify {
    #[command(flatten)]
    files: FileArgs,

    /// Accept declared keys that are set to an empty string
    #[arg(long)]
    allow_empty: bool,
  },
}

#[derive(Args)]
struct FileArgs {
  /// Directory holding the env files
  #[arg(short, long)]
  dir: Option<PathBuf>,

  /// Template file name, repeat to give fallbacks in priority order
  #[arg(short, long = "template")]
  templates: Vec<String>,
}

impl FileArgs {
  fn layout(&self, main: Option<String>) -> FileLayout {
    let mut layout = FileLayout::default();
    if let Some(main) = main {
      layout.main = main;
    }
    if !self.templates.is_empty() {
      layout.templates = self.templates.clone();
    }
    layout
  }
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    1 => "debug",
    2 => "trace",
    _ => "info",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  match cli.command {
    Command::Configure {
      files,
      main,
      no_template,
      allow_extra,
      disallow_empty,
      fail_fast,
      command,
    } => {
      let options = ConfigureOptions {
        layout: files.layout(Some(main)),
        dir: files.dir,
        use_template: !no_template,
        policy: ReconciliationPolicy {
          require_exact_key_match: !allow_extra,
          allow_empty_values: !disallow_empty,
        },
        apply_mode: if fail_fast {
          ApplyMode::FailFast
        } else {
          ApplyMode::Continue
        },
      };

      let applied = EnvGuard::configure_with_options(&options, &mut ProcessEnv)?;

      let Some((program, args)) = command.split_first() else {
        println!("Configured {} environment variable(s)", applied.len());
        return Ok(ExitCode::SUCCESS);
      };

      let status = Process::new(program).args(args).status()?;
      let code = status.code().unwrap_or(1);
      Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
    }
    Command::Verify { files, allow_empty } => {
      let options = VerifyOptions {
        layout: files.layout(None),
        dir: files.dir,
        allow_empty_values: allow_empty,
      };

      EnvGuard::verify_with_options(&options, &ProcessEnv)?;
      Ok(ExitCode::SUCCESS)
    }
  }
}
