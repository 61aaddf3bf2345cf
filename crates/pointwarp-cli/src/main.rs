//! pointwarp CLI: drive the platform layer from the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pointwarp_platform::config::{default_config_path, Config};
use pointwarp_platform::screen::bounding_box;
use pointwarp_platform::{BackendKind, Platform, PlatformError};
use pointwarp_types::{Color, Modifiers, ScreenId, ScrollDirection};
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Swaps the log filter when the configured level changes.
type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Parser)]
#[command(
    name = "pointwarp",
    about = "Keyboard-driven pointer control for X11 and Wayland",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Display server backend, overriding the configuration.
    #[arg(short, long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List screens and the layout's bounding box.
    Screens,

    /// Resolve a key name to its keycode.
    Lookup {
        /// Key name, e.g. `a`, `esc`, `BackSpace`.
        name: String,
    },

    /// Resolve a keycode to its key name.
    Name {
        code: u8,
        #[arg(short, long)]
        shifted: bool,
    },

    /// Move the pointer to a screen-relative position.
    Move { screen: u32, x: i32, y: i32 },

    /// Click a mouse button (1 left, 2 middle, 3 right).
    Click { button: u8 },

    /// Press a mouse button.
    Down { button: u8 },

    /// Release a mouse button.
    Up { button: u8 },

    /// Hold a mouse button until interrupted.
    Hold { button: u8 },

    /// Scroll one or more wheel steps.
    Scroll {
        direction: ScrollDirection,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Print the pointer position.
    Position,

    /// Hide the cursor until interrupted.
    Hide,

    /// Show the cursor.
    Show,

    /// Watch the configuration and extra files for changes.
    Watch {
        /// Additional files to watch.
        paths: Vec<PathBuf>,
    },

    /// Grab the keyboard and print key presses.
    Grab {
        #[arg(short = 'n', long, default_value_t = 10)]
        count: u32,

        /// Give up after this many seconds without a key.
        #[arg(short, long, default_value_t = 10)]
        timeout: u64,
    },

    /// Draw a box until interrupted.
    Box {
        screen: u32,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        /// Override the configured box color.
        #[arg(long)]
        color: Option<String>,
    },

    /// Show an error message the way the daemon reports failures.
    Error { title: String, message: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let loaded = Config::load(&config_path);
    let level = loaded
        .as_ref()
        .map_or("info", |c| c.platform.log_level.as_str());
    let filter = init_tracing(level);

    let result = match loaded {
        Ok(mut config) => {
            if let Some(backend) = cli.backend {
                config.platform.backend = backend;
            }
            run(cli.command, &config, &config_path, filter.as_ref()).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal");
            eprintln!("pointwarp: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Install the subscriber. The handle is `None` when `RUST_LOG` decides the
/// filter, so the configured level never overrides it.
fn init_tracing(level: &str) -> Option<FilterHandle> {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(level), false),
    };
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    (!from_env).then_some(handle)
}

async fn run(
    command: Commands,
    config: &Config,
    config_path: &Path,
    filter: Option<&FilterHandle>,
) -> anyhow::Result<()> {
    let mut platform = pointwarp_platform::connect(config)?;
    info!(backend = platform.backend_name(), "connected");

    match command {
        Commands::Screens => {
            for screen in platform.screen_list() {
                println!("{screen}");
            }
            if let Some(b) = bounding_box(platform.screen_list()) {
                println!(
                    "bounds: {}x{} from ({}, {})",
                    b.width(),
                    b.height(),
                    b.min_x,
                    b.min_y
                );
            }
        }
        Commands::Lookup { name } => match platform.input_lookup_code(&name) {
            Some((code, shifted)) => println!("{code}{}", if shifted { " (shifted)" } else { "" }),
            None => bail!("no key named {name:?}"),
        },
        Commands::Name { code, shifted } => match platform.input_lookup_name(code, shifted) {
            Some(name) => println!("{name}"),
            None => bail!("keycode {code} has no name"),
        },
        Commands::Move { screen, x, y } => platform.mouse_move(ScreenId(screen), x, y)?,
        Commands::Click { button } => platform.mouse_click(button)?,
        Commands::Down { button } => platform.mouse_down(button)?,
        Commands::Up { button } => platform.mouse_up(button)?,
        Commands::Hold { button } => {
            platform.mouse_down(button)?;
            println!("holding button {button}, press ctrl-c to release");
            wait_for_interrupt().await?;
            // Dropping the platform releases the button.
        }
        Commands::Scroll { direction, count } => {
            for _ in 0..count {
                match platform.scroll(direction) {
                    Ok(()) => {}
                    Err(e @ PlatformError::NotSupported(_)) => {
                        warn!(error = %e, %direction, "scroll ignored");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Commands::Position => match platform.mouse_get_position() {
            Some(pos) => println!("screen {} at ({}, {})", pos.screen, pos.x, pos.y),
            None => println!("unknown"),
        },
        Commands::Hide => {
            platform.mouse_hide()?;
            println!("cursor hidden, press ctrl-c to restore");
            wait_for_interrupt().await?;
            platform.mouse_show()?;
        }
        Commands::Show => platform.mouse_show()?,
        Commands::Watch { paths } => {
            watch(platform.as_mut(), config, config_path, &paths, filter).await?;
        }
        Commands::Grab { count, timeout } => {
            grab(platform.as_mut(), count, Duration::from_secs(timeout))?;
        }
        Commands::Box {
            screen,
            x,
            y,
            width,
            height,
            color,
        } => {
            let color = match color {
                Some(c) => Color::parse(&c).with_context(|| format!("invalid --color {c:?}"))?,
                None => config.style.box_color()?,
            };
            let screen = ScreenId(screen);
            platform.screen_draw_box(screen, x, y, width, height, color)?;
            platform.commit()?;
            wait_for_interrupt().await?;
            platform.screen_clear(screen)?;
        }
        Commands::Error { title, message } => platform.show_error_modal(&title, &message),
    }

    platform.commit()?;
    Ok(())
}

async fn wait_for_interrupt() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")
}

async fn watch(
    platform: &mut dyn Platform,
    config: &Config,
    config_path: &Path,
    paths: &[PathBuf],
    filter: Option<&FilterHandle>,
) -> anyhow::Result<()> {
    platform.monitor_file(config_path)?;
    for path in paths {
        platform.monitor_file(path)?;
    }
    info!(
        files = paths.len() + 1,
        interval_ms = config.monitor.poll_interval_ms,
        "watching files"
    );

    let mut current = config.clone();
    let mut ticker = tokio::time::interval(poll_interval(&current));
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for ctrl-c")?;
                info!("stopping watch");
                return Ok(());
            }
        }

        for path in platform.poll_monitored_files() {
            println!("changed: {}", path.display());
            if path != config_path {
                continue;
            }
            match Config::load(config_path) {
                Ok(new) => {
                    let changes = diff_config(&current, &new);
                    if let Some(interval) = changes.poll_interval {
                        info!(interval_ms = new.monitor.poll_interval_ms, "poll interval changed");
                        ticker = tokio::time::interval(interval);
                        ticker.reset();
                    }
                    if let Some(level) = &changes.log_level {
                        apply_log_level(filter, level);
                    }
                    current = new;
                    info!(path = %path.display(), "configuration reloaded");
                }
                Err(e) => {
                    warn!(error = %e, "configuration reload failed");
                    platform.show_error_modal("pointwarp", &e.to_string());
                }
            }
        }
    }
}

/// Settings of a reloaded configuration that the watch loop must apply.
#[derive(Debug, Default, PartialEq, Eq)]
struct ConfigChanges {
    poll_interval: Option<Duration>,
    log_level: Option<String>,
}

fn diff_config(current: &Config, new: &Config) -> ConfigChanges {
    ConfigChanges {
        poll_interval: (new.monitor.poll_interval_ms != current.monitor.poll_interval_ms)
            .then(|| poll_interval(new)),
        log_level: (new.platform.log_level != current.platform.log_level)
            .then(|| new.platform.log_level.clone()),
    }
}

fn poll_interval(config: &Config) -> Duration {
    Duration::from_millis(config.monitor.poll_interval_ms.max(1))
}

fn apply_log_level(filter: Option<&FilterHandle>, level: &str) {
    let Some(handle) = filter else {
        debug!(level, "RUST_LOG is set, keeping its filter");
        return;
    };
    match EnvFilter::try_new(level) {
        Ok(new) => match handle.reload(new) {
            Ok(()) => info!(level, "log level changed"),
            Err(e) => warn!(error = %e, "failed to apply log level"),
        },
        Err(e) => warn!(level, error = %e, "invalid log_level"),
    }
}

fn grab(platform: &mut dyn Platform, count: u32, timeout: Duration) -> anyhow::Result<()> {
    platform.input_grab_keyboard()?;
    let result = print_keys(platform, count, timeout);
    platform.input_ungrab_keyboard()?;
    result
}

fn print_keys(platform: &mut dyn Platform, count: u32, timeout: Duration) -> anyhow::Result<()> {
    let mut seen = 0;
    while seen < count {
        let Some(event) = platform.input_next_event(Some(timeout))? else {
            info!("no key within timeout");
            break;
        };
        if !event.pressed {
            continue;
        }
        seen += 1;
        let shifted = event.mods.contains(Modifiers::SHIFT);
        let name = platform
            .input_lookup_name(event.code, shifted)
            .or_else(|| platform.input_lookup_name(event.code, false))
            .unwrap_or("?");
        println!("{:>3} {name} {:?}", event.code, event.mods);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_config_needs_nothing() {
        let config = Config::default();
        assert_eq!(diff_config(&config, &config.clone()), ConfigChanges::default());
    }

    #[test]
    fn reload_picks_up_interval_and_log_level() {
        let current = Config::default();
        let mut new = current.clone();
        new.monitor.poll_interval_ms = 250;
        new.platform.log_level = "debug".into();
        assert_eq!(
            diff_config(&current, &new),
            ConfigChanges {
                poll_interval: Some(Duration::from_millis(250)),
                log_level: Some("debug".into()),
            }
        );
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut config = Config::default();
        config.monitor.poll_interval_ms = 0;
        assert_eq!(poll_interval(&config), Duration::from_millis(1));
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli =
            Cli::try_parse_from(["pointwarp", "watch", "--backend", "x11", "a.toml"]).unwrap();
        assert_eq!(cli.backend, Some(BackendKind::X11));
        assert!(matches!(cli.command, Commands::Watch { ref paths } if paths.len() == 1));
    }
}
