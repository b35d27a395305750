// Keyhook CLI
// Validates configs and replays key event traces through the decision engine
//
// Trace lines are tab-separated: `transition key modifiers [app [window]]`
// where transition is down/up/flags, key is a key name or a 0x code and
// modifiers is "shift+ctrl" style or "-". Blank lines and '#' comments are
// skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Parser;

use keyhook_core::input::{RawKeyEvent, Transition};
use keyhook_core::transform::{Decision, Engine};
use keyhook_core::{EngineSettings, Key, Modifier, ModifierState};

/// Keyboard remapping decision engine
#[derive(Parser, Debug)]
#[command(name = "keyhook")]
#[command(version)]
#[command(about = "Keyboard remapping decision engine", long_about = None)]
struct Args {
    /// TOML configuration file (default: ~/.config/keyhook/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// Print the loaded rules in declaration order and exit
    #[arg(long)]
    print_rules: bool,

    /// Trace file to replay (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    trace: Option<PathBuf>,

    /// Feed emitted events back in, as the OS would after injection
    #[arg(long)]
    loopback: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// One parsed trace line
#[derive(Debug, Clone, PartialEq)]
struct TraceEvent {
    raw: RawKeyEvent,
    app: String,
    window: String,
}

fn parse_key(field: &str) -> Result<u16> {
    if let Some(hex) = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        return u16::from_str_radix(hex, 16).with_context(|| format!("bad key code '{}'", field));
    }
    Key::from_name(field)
        .map(|key| key.code())
        .ok_or_else(|| anyhow!("unknown key '{}'", field))
}

fn parse_modifiers(field: &str) -> Result<ModifierState> {
    let mut state = ModifierState::empty();
    if field == "-" || field.is_empty() {
        return Ok(state);
    }
    for name in field.split('+') {
        let modifier = Modifier::from_alias(name.trim())?;
        state |= modifier.flag();
    }
    Ok(state)
}

/// Parse one trace line; `Ok(None)` for blank and comment lines
fn parse_trace_line(line: &str) -> Result<Option<TraceEvent>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.trim_start().starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        bail!("expected at least 3 tab-separated fields, got {}", fields.len());
    }

    let transition = match fields[0].trim() {
        "down" => Transition::Down,
        "up" => Transition::Up,
        "flags" => Transition::FlagsChanged,
        other => bail!("unknown transition '{}'", other),
    };
    let code = parse_key(fields[1].trim())?;
    let mods = parse_modifiers(fields[2].trim())?;

    Ok(Some(TraceEvent {
        raw: RawKeyEvent::new(code, transition, mods),
        app: fields.get(3).map(|s| s.to_string()).unwrap_or_default(),
        window: fields.get(4).map(|s| s.to_string()).unwrap_or_default(),
    }))
}

fn format_decision(decision: &Decision) -> String {
    let events: Vec<String> = decision.key_events().map(|e| e.to_string()).collect();
    format!("suppress={} events=[{}]", decision.suppress, events.join(", "))
}

struct Application {
    engine: Engine,
    config_path: PathBuf,
    args: Args,
    reload_requested: Arc<AtomicBool>,
}

impl Application {
    fn new(config_path: PathBuf, args: Args) -> Result<Self> {
        let engine = Engine::new(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()))?;
        for warning in engine.warnings() {
            eprintln!("warning: {}", warning);
        }

        let reload_requested = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGHUP, Arc::clone(&reload_requested))
            .context("failed to register SIGHUP handler")?;

        Ok(Self {
            engine,
            config_path,
            args,
            reload_requested,
        })
    }

    fn validate(&self) {
        let warnings = self.engine.warnings().len();
        println!(
            "Configuration is valid: {} rules, {} skipped",
            self.engine.ruleset().len(),
            warnings
        );
    }

    fn print_rules(&self) {
        let ruleset = self.engine.ruleset();
        for (position, rule) in ruleset.rules().iter().enumerate() {
            match &rule.name {
                Some(name) => println!("{:>3}  {}  [{}]", position, rule, name),
                None => println!("{:>3}  {}", position, rule),
            }
        }
    }

    fn reload_if_requested(&self) {
        if !self.reload_requested.swap(false, Ordering::SeqCst) {
            return;
        }
        match self.engine.reload(&self.config_path) {
            Ok(warnings) => {
                for warning in &warnings {
                    eprintln!("warning: {}", warning);
                }
                log::info!("Reloaded {}", self.config_path.display());
            }
            Err(e) => log::error!("Reload failed, keeping current rules: {}", e),
        }
    }

    fn replay<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        for (index, line) in input.lines().enumerate() {
            self.reload_if_requested();
            let line = line.context("failed to read trace")?;
            let Some(event) = parse_trace_line(&line).with_context(|| format!("trace line {}", index + 1))? else {
                continue;
            };

            let decision = self.engine.handle_key_event(&event.raw, &event.app, &event.window);
            writeln!(out, "{}", format_decision(&decision))?;

            if self.args.loopback {
                self.feed_back(&decision, &event)?;
            }
        }
        Ok(())
    }

    /// Re-deliver injected events; each must pass through untouched
    fn feed_back(&mut self, decision: &Decision, source: &TraceEvent) -> Result<()> {
        for synthetic in &decision.events {
            let raw = RawKeyEvent::new(
                synthetic.code,
                synthetic.event.state.into(),
                synthetic.event.modifiers(),
            )
            .with_tag(synthetic.tag);
            let echoed = self.engine.handle_key_event(&raw, &source.app, &source.window);
            if !echoed.is_pass_through() {
                bail!("loopback event {} was not passed through", synthetic.event);
            }
        }
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        match self.args.trace.clone() {
            Some(path) => {
                let file = File::open(&path).with_context(|| format!("cannot open trace {}", path.display()))?;
                self.replay(BufReader::new(file), &mut out)
            }
            None => self.replay(io::stdin().lock(), &mut out),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = args
        .config
        .clone()
        .or_else(EngineSettings::default_config_path)
        .ok_or_else(|| anyhow!("no --config given and no config directory found"))?;

    let mut app = Application::new(config_path, args)?;

    if app.args.check_config {
        app.validate();
        return Ok(());
    }
    if app.args.print_rules {
        app.print_rules();
        return Ok(());
    }

    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["keyhook", "--config", "/tmp/test.toml", "--loopback"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(args.loopback);
        assert!(!args.check_config);
        assert!(args.trace.is_none());
    }

    #[test]
    fn test_parse_trace_line() {
        let event = parse_trace_line("down\tcapsLock\t-\tTerminal\tzsh").unwrap().unwrap();
        assert_eq!(event.raw.code, 0x39);
        assert_eq!(event.raw.transition, Transition::Down);
        assert_eq!(event.raw.flags(), ModifierState::empty());
        assert_eq!(event.app, "Terminal");
        assert_eq!(event.window, "zsh");
    }

    #[test]
    fn test_parse_trace_modifiers_and_code() {
        let event = parse_trace_line("flags\t0x38\tshift+cmd").unwrap().unwrap();
        assert_eq!(event.raw.code, 0x38);
        assert_eq!(event.raw.transition, Transition::FlagsChanged);
        assert_eq!(event.raw.flags(), ModifierState::SHIFT | ModifierState::META);
        assert_eq!(event.app, "");
    }

    #[test]
    fn test_parse_trace_skips_comments() {
        assert!(parse_trace_line("").unwrap().is_none());
        assert!(parse_trace_line("# comment").unwrap().is_none());
    }

    #[test]
    fn test_parse_trace_errors() {
        assert!(parse_trace_line("down\tcapsLock").is_err());
        assert!(parse_trace_line("sideways\tcapsLock\t-").is_err());
        assert!(parse_trace_line("down\tnope\t-").is_err());
        assert!(parse_trace_line("down\ta\thyper").is_err());
    }
}
