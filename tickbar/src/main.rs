//! Entry point for the tickbar TUI. Parses args, sets up logging and runs the App.

mod app;
mod ui;

use std::env;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app::App;
use tickbar::config::{config_dir, load_settings, save_settings, settings_path, Settings};
use tickbar::ws::DEFAULT_HOST;

const DEFAULT_COUNTER_PATH: &str = "tickbar";
const DEMO_PORT: u16 = 24051;

#[derive(Debug, Default)]
struct ParsedArgs {
    host: Option<String>,
    settings: Option<PathBuf>,
    counter_path: Option<String>,
    log: Option<PathBuf>,
    worker: bool,
    save: bool,
    dry_run: bool,
    demo: bool,
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--settings FILE|-s FILE] [--counter-path NAME|-c NAME] [--log FILE] [--worker] [--save] [--dry-run] [--demo] [HOST:PORT|ws://HOST:PORT]"
    )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "tickbar".into());
    let mut parsed = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--settings" | "-s" => parsed.settings = it.next().map(PathBuf::from),
            "--counter-path" | "-c" => parsed.counter_path = it.next(),
            "--log" => parsed.log = it.next().map(PathBuf::from),
            "--worker" => parsed.worker = true,
            "--save" => parsed.save = true,
            "--dry-run" => parsed.dry_run = true,
            "--demo" => parsed.demo = true,
            _ if arg.starts_with("--settings=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.settings = Some(PathBuf::from(v));
                    }
                }
            }
            _ if arg.starts_with("--counter-path=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.counter_path = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with('-') => {
                return Err(format!("Unknown option '{arg}'. {}", usage(&prog)));
            }
            _ => {
                if parsed.host.is_none() {
                    parsed.host = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let settings_file = parsed.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings(&settings_file);
    if parsed.worker {
        settings.offload_pool = true;
    }

    let host = if parsed.demo {
        format!("127.0.0.1:{DEMO_PORT}")
    } else {
        parsed.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string())
    };
    let counter_path = parsed
        .counter_path
        .clone()
        .unwrap_or_else(|| DEFAULT_COUNTER_PATH.to_string());

    if parsed.save {
        save_settings(&settings_file, &settings)
            .with_context(|| format!("writing {}", settings_file.display()))?;
    }

    if parsed.dry_run {
        print_resolved(&host, &counter_path, &settings_file, &settings)?;
        return Ok(());
    }

    let log_file = parsed
        .log
        .clone()
        .unwrap_or_else(|| config_dir().join("tickbar.log"));
    init_logging(&log_file)?;
    info!(%host, counter_path = counter_path.as_str(), "starting tickbar");

    let _demo = if parsed.demo {
        Some(spawn_demo_feed(DEMO_PORT).await?)
    } else {
        None
    };

    let mut app = App::new(settings);
    tokio::select! {
        res = app.run(&host, &counter_path) => res,
        _ = tokio::signal::ctrl_c() => Ok(()),
    }
}

fn print_resolved(host: &str, counter_path: &str, file: &Path, settings: &Settings) -> Result<()> {
    println!("host: {host}");
    println!("counter path: {counter_path}");
    println!("settings file: {}", file.display());
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

/// Log to a file so the terminal stays clean.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Ignore a second init (tests, embedding)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

// --- Demo Mode ---

/// Kills the synthetic feed when dropped.
struct DemoGuard(Child);

impl Drop for DemoGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

async fn spawn_demo_feed(port: u16) -> Result<DemoGuard> {
    let exe = find_feed_executable();
    let child = Command::new(&exe)
        .arg("--port")
        .arg(port.to_string())
        .spawn()
        .with_context(|| format!("starting {}", exe.display()))?;
    // Give the feed a brief moment to bind
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(DemoGuard(child))
}

fn find_feed_executable() -> PathBuf {
    if let Ok(exe) = env::current_exe() {
        if let Some(parent) = exe.parent() {
            #[cfg(windows)]
            let name = "tickbar_feed.exe";
            #[cfg(not(windows))]
            let name = "tickbar_feed";
            let candidate = parent.join(name);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    // Fallback to relying on PATH
    PathBuf::from("tickbar_feed")
}
