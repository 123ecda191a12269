//! Interactive REPL for trying classifier inputs.
//!
//! Launch with `tgplug repl`. Type `/help` for available commands, Tab for
//! completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};

use tgplug::classifier::DEFAULT_WEAK_GPU_FAMILIES;
use tgplug::{
    CapabilityClassifier, ClassifierConfig, EnvironmentSignals, FilePreferenceStore, GraphicsProbe,
    PreferenceStore, MODE_STORAGE_KEY,
};

use crate::render::{classification_report, describe_graphics, describe_memory};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/ua", "Set the user-agent string"),
    ("/memory", "Set device memory in GiB, or 'none'"),
    ("/gpu", "Set the renderer name, 'none', or 'hidden'"),
    ("/pref", "Set the stored ritual, or 'none'"),
    ("/stored", "Load the stored ritual from the preference file"),
    ("/classify", "Classify the current signals"),
    ("/show", "Show the current signals"),
    ("/config", "Show classifier heuristics"),
    ("/reset", "Forget all signals"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
#[derive(Default)]
struct PlugHelper;

impl Completer for PlugHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // Renderer keyword completion
        let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
        if cmd == "/gpu" {
            let prefix = args.trim_start().to_lowercase();
            let prefix_start = input.len() - args.trim_start().len();
            let matches: Vec<Pair> = ["none", "hidden"]
                .iter()
                .chain(DEFAULT_WEAK_GPU_FAMILIES)
                .filter(|k| k.starts_with(&prefix))
                .map(|k| Pair {
                    display: k.to_string(),
                    replacement: k.to_string(),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for PlugHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for PlugHelper {}
impl Validator for PlugHelper {}
impl Helper for PlugHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Session state.
struct ReplState {
    signals: EnvironmentSignals,
    config: ClassifierConfig,
    classifier: CapabilityClassifier,
    prefs_path: String,
}

/// Parse a `/memory` argument. `none` clears the hint.
pub fn parse_memory(args: &str) -> Result<Option<f64>, String> {
    match args.trim() {
        "" => Err("Usage: /memory <GiB|none>".to_string()),
        "none" => Ok(None),
        value => match value.parse::<f64>() {
            Ok(gib) if gib.is_finite() && gib >= 0.0 => Ok(Some(gib)),
            _ => Err(format!("Not a memory size: {value}")),
        },
    }
}

/// Parse a `/gpu` argument.
pub fn parse_graphics(args: &str) -> GraphicsProbe {
    match args.trim() {
        "none" => GraphicsProbe::Unavailable,
        "" | "hidden" => GraphicsProbe::RendererHidden,
        name => GraphicsProbe::Renderer(name.to_string()),
    }
}

/// Run the interactive REPL.
pub fn run(config: ClassifierConfig, prefs_path: String) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1mtgplug v{}\x1b[0m \x1b[90m\u{2014} Device capability lab\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<PlugHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(rl_config)?;
    rl.set_helper(Some(PlugHelper));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".tgplug_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let mut state = ReplState {
        signals: EnvironmentSignals::new(""),
        classifier: CapabilityClassifier::new(config.clone()),
        config,
        prefs_path,
    };
    let prompt = " \x1b[36mtgplug>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
                let args = args.trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "ua" => {
                        state.signals.user_agent = args.to_string();
                        eprintln!("  User agent set.");
                    }
                    "memory" => match parse_memory(args) {
                        Ok(gib) => {
                            state.signals.device_memory_gib = gib;
                            eprintln!("  Memory: {}", describe_memory(gib));
                        }
                        Err(e) => eprintln!("  {e}"),
                    },
                    "gpu" => {
                        state.signals.graphics = parse_graphics(args);
                        eprintln!("  Graphics: {}", describe_graphics(&state.signals.graphics));
                    }
                    "pref" => {
                        state.signals.stored_preference = match args {
                            "" | "none" => None,
                            value => Some(value.to_string()),
                        };
                        eprintln!(
                            "  Stored ritual: {}",
                            state.signals.stored_preference.as_deref().unwrap_or("none")
                        );
                    }
                    "stored" => cmd_stored(&mut state),
                    "classify" => cmd_classify(&state),
                    "show" => cmd_show(&state),
                    "config" => cmd_config(&state),
                    "reset" => {
                        state.signals = EnvironmentSignals::new("");
                        eprintln!("  Signals cleared.");
                    }
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(std::path::Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completes commands and GPU family names after /gpu.");
    eprintln!();
}

fn cmd_stored(state: &mut ReplState) {
    let store = FilePreferenceStore::new(&state.prefs_path);
    match store.get(MODE_STORAGE_KEY) {
        Ok(value) => {
            eprintln!(
                "  Stored ritual from {}: {}",
                state.prefs_path,
                value.as_deref().unwrap_or("none")
            );
            state.signals.stored_preference = value;
        }
        Err(e) => eprintln!("  Cannot read {}: {e}", state.prefs_path),
    }
}

fn cmd_classify(state: &ReplState) {
    let result = state.classifier.classify(&state.signals);
    eprintln!();
    eprint!("{}", classification_report(&state.signals, &result));
    eprintln!();
}

fn cmd_show(state: &ReplState) {
    eprintln!();
    eprintln!("  User agent:  {}", state.signals.user_agent);
    eprintln!("  Memory:      {}", describe_memory(state.signals.device_memory_gib));
    eprintln!("  Graphics:    {}", describe_graphics(&state.signals.graphics));
    eprintln!(
        "  Stored:      {}",
        state.signals.stored_preference.as_deref().unwrap_or("none")
    );
    eprintln!();
}

fn cmd_config(state: &ReplState) {
    let config = &state.config;
    eprintln!();
    eprintln!("  Low memory below: {} GiB", config.low_memory_threshold_gib);
    eprintln!("  TV keywords:      {}", config.tv_keywords.join(", "));
    eprintln!("  Weak GPUs:        {}", config.weak_gpu_families.join(", "));
    eprintln!("  Override ritual:  {}", config.performance_sentinel);
    eprintln!();
}
