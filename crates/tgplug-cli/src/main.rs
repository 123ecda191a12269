//! tgplug — entry point.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use tgplug::{FilePreferenceStore, PlugManifest, PreferenceStore, MODE_STORAGE_KEY};
use tgplug_cli::render::classification_report;
use tgplug_cli::{load_classifier_config, resolve_prefs_path, run_classify, ClassifyArgs};

#[derive(Parser)]
#[command(
    name = "tgplug",
    about = "Device capability detection and ritual management for TGBrowser plugs",
    version
)]
struct Cli {
    /// Path to the preference file.
    #[arg(long, global = true)]
    prefs: Option<String>,

    /// Path to a classifier config (JSON).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a device (default).
    Classify(ClassifyArgs),

    /// Read or change the stored ritual.
    Preference {
        #[command(subcommand)]
        action: PreferenceAction,
    },

    /// Print the effective classifier heuristics and plug manifests as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   tgplug completions bash > ~/.local/share/bash-completion/completions/tgplug
    ///   tgplug completions zsh > ~/.zfunc/_tgplug
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[derive(Subcommand)]
enum PreferenceAction {
    /// Print the stored ritual.
    Get,
    /// Store a ritual (defaults to the configured performance sentinel).
    Set { value: Option<String> },
    /// Remove the stored ritual.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let prefs_path = resolve_prefs_path(cli.prefs.as_deref());

    match cli
        .command
        .unwrap_or_else(|| Commands::Classify(ClassifyArgs::default()))
    {
        Commands::Classify(args) => {
            let config = load_classifier_config(cli.config.as_deref())?;
            let sentinel = config.performance_sentinel.clone();
            let outcome = run_classify(&args, config, &prefs_path)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print!(
                    "{}",
                    classification_report(&outcome.signals, &outcome.classification)
                );
                if outcome.persisted {
                    println!(
                        "  Saved {MODE_STORAGE_KEY}={sentinel} to {prefs_path}"
                    );
                }
            }
            if outcome.classification.is_constrained {
                tracing::info!("Performance mode recommended");
            }
        }

        Commands::Preference { action } => {
            let mut store = FilePreferenceStore::new(&prefs_path);
            match action {
                PreferenceAction::Get => match store.get(MODE_STORAGE_KEY)? {
                    Some(value) => println!("{value}"),
                    None => println!("(none)"),
                },
                PreferenceAction::Set { value } => {
                    let value = match value {
                        Some(value) => value,
                        None => load_classifier_config(cli.config.as_deref())?.performance_sentinel,
                    };
                    store.set(MODE_STORAGE_KEY, &value)?;
                    println!("Stored {MODE_STORAGE_KEY}={value} in {prefs_path}");
                }
                PreferenceAction::Clear => {
                    store.remove(MODE_STORAGE_KEY)?;
                    println!("Cleared {MODE_STORAGE_KEY} in {prefs_path}");
                }
            }
        }

        Commands::Info => {
            let config = load_classifier_config(cli.config.as_deref())?;
            let info = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "classifier": config,
                "storage_key": MODE_STORAGE_KEY,
                "preferences": prefs_path,
                "plugs": [PlugManifest::devkit(), PlugManifest::performance()],
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "tgplug", &mut std::io::stdout());
        }

        Commands::Repl => {
            let config = load_classifier_config(cli.config.as_deref())?;
            tgplug_cli::repl::run(config, prefs_path)?;
        }
    }

    Ok(())
}
