use std::env;
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use log::{LevelFilter, debug, info, warn};
use tokio::net::TcpListener;

use userd::api::{self, AppState};
use userd::settings::{self, APP_NAME, AppConfig};
use userd::user::{UserService, UserStore};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_main(ctx: RuntimeContext, cmd: ServeCommand) -> Result<()> {
    handle_serve(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone(), cli.command.creates_missing_config())?;
    ctx.init_logging()?;
    debug!("resolved paths: {}", ctx.paths);
    ctx.report_config_file();

    match cli.command {
        Command::Serve(cmd) => async_main(ctx, cmd),
        Command::Init(cmd) => handle_init(&ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "userd - in-memory user records service.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -vv)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Output machine readable JSON
    #[arg(long, global = true, conflicts_with = "yaml")]
    json: bool,
    /// Output machine readable YAML
    #[arg(long, global = true)]
    yaml: bool,
    /// Disable ANSI colors in output
    #[arg(long = "no-color", global = true, conflicts_with = "color")]
    no_color: bool,
    /// Control color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Do not change anything on disk
    #[arg(long = "dry-run", global = true)]
    dry_run: bool,
    /// Assume "yes" for interactive prompts
    #[arg(short = 'y', long = "yes", global = true)]
    assume_yes: bool,
    /// Emit additional diagnostics for troubleshooting
    #[arg(long = "diagnostics", global = true)]
    diagnostics: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Create the config file with default values
    Init(InitCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Command {
    /// `init` and `config reset` write the file themselves; everything else
    /// creates a default one on first run.
    fn creates_missing_config(&self) -> bool {
        !matches!(
            self,
            Command::Init(_)
                | Command::Config {
                    command: ConfigCommand::Reset
                }
        )
    }
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,
    /// Directory of static files served for unmatched paths
    #[arg(long, value_name = "PATH", conflicts_with = "no_static")]
    static_dir: Option<PathBuf>,
    /// Do not serve static files
    #[arg(long = "no-static")]
    no_static: bool,
}

#[derive(Debug, Clone, Args)]
struct InitCommand {
    /// Recreate configuration even if it already exists
    #[arg(long = "force")]
    force: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Output the effective configuration
    Show,
    /// Print the resolved config file path
    Path,
    /// Regenerate the default configuration file
    Reset,
}

/// What happened to the config file while building the runtime context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFileState {
    Existing,
    Created,
    WouldCreate,
    Missing,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    paths: AppPaths,
    config: AppConfig,
    config_file: ConfigFileState,
}

impl RuntimeContext {
    fn new(common: CommonOpts, create_missing: bool) -> Result<Self> {
        let paths = AppPaths::discover(common.config.clone())?;
        let config_file = ensure_config_file(&paths.config_file, create_missing, common.dry_run)?;
        let config = AppConfig::load(&paths.config_file)?;
        Ok(Self {
            common,
            paths,
            config,
            config_file,
        })
    }

    /// Runs after logging is up so the messages are not lost.
    fn report_config_file(&self) {
        let path = self.paths.config_file.display();
        match self.config_file {
            ConfigFileState::Existing => {}
            ConfigFileState::Created => info!("created default config at {path}"),
            ConfigFileState::WouldCreate => {
                info!("dry-run: would create default config at {path}")
            }
            ConfigFileState::Missing => debug!("no config file at {path}, using defaults"),
        }
    }

    fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        if self.common.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let level = self.effective_log_level();
        let directive = level.as_str().to_lowercase();

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{APP_NAME}={directive},tower_http={directive}"))
        });

        // Use JSON output if --json flag is set, otherwise pretty format
        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = self.common.no_color
                || matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(!disable_color)
                        .with_target(self.common.diagnostics)
                        .with_file(self.common.diagnostics)
                        .with_line_number(self.common.diagnostics),
                )
                .try_init()
                .ok();
        }
        // `log` records from this binary reach the subscriber through tracing-log.

        Ok(())
    }

    /// CLI flags win; otherwise `logging.level` from the config file.
    fn effective_log_level(&self) -> LevelFilter {
        if self.common.trace {
            LevelFilter::Trace
        } else if self.common.debug {
            LevelFilter::Debug
        } else {
            match self.common.verbose {
                0 => self
                    .config
                    .logging
                    .level
                    .parse()
                    .unwrap_or(LevelFilter::Info),
                1 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

#[derive(Debug, Clone)]
struct AppPaths {
    config_file: PathBuf,
}

impl AppPaths {
    fn discover(override_path: Option<PathBuf>) -> Result<Self> {
        let config_file = match override_path {
            Some(path) => {
                let expanded = expand_path(path)?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };

        if config_file.parent().is_none() {
            return Err(anyhow!("invalid config file path: {config_file:?}"));
        }

        Ok(Self { config_file })
    }
}

impl fmt::Display for AppPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config: {}", self.config_file.display())
    }
}

fn handle_init(ctx: &RuntimeContext, cmd: InitCommand) -> Result<()> {
    let path = &ctx.paths.config_file;
    let overwrite = cmd.force || ctx.common.assume_yes;
    if init_config(path, overwrite, ctx.common.dry_run)? {
        info!("wrote default config to {}", path.display());
    } else {
        info!("dry-run: would write default config to {}", path.display());
    }
    Ok(())
}

/// Write the default config to `path`. Returns `false` when `dry_run` skipped
/// the write.
fn init_config(path: &Path, overwrite: bool, dry_run: bool) -> Result<bool> {
    if path.exists() && !overwrite {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }

    if dry_run {
        return Ok(false);
    }

    settings::write_default_config(path)?;
    Ok(true)
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            if ctx.common.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&ctx.config)
                        .context("serializing config to JSON")?
                );
            } else if ctx.common.yaml {
                println!(
                    "{}",
                    serde_yaml::to_string(&ctx.config).context("serializing config to YAML")?
                );
            } else {
                println!("{:#?}", ctx.config);
            }
            Ok(())
        }
        ConfigCommand::Path => {
            println!("{}", ctx.paths.config_file.display());
            Ok(())
        }
        ConfigCommand::Reset => {
            if ctx.common.dry_run {
                info!(
                    "dry-run: would reset config at {}",
                    ctx.paths.config_file.display()
                );
                return Ok(());
            }
            settings::write_default_config(&ctx.paths.config_file)
        }
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

async fn handle_serve(ctx: &RuntimeContext, cmd: ServeCommand) -> Result<()> {
    info!("Starting {APP_NAME} server...");

    let store = UserStore::seeded(ctx.config.seed_users.clone())
        .context("loading seed users from config")?;
    info!("Loaded {} seed user(s)", store.stats().total);

    let mut state = AppState::new(UserService::new(store));

    // Static files: CLI overrides config
    let static_dir = if cmd.no_static {
        None
    } else if let Some(dir) = cmd.static_dir {
        Some(expand_path(dir)?)
    } else if ctx.config.static_files.enabled {
        Some(expand_str_path(&ctx.config.static_files.dir)?)
    } else {
        None
    };
    if let Some(dir) = static_dir {
        if dir.is_dir() {
            info!("Serving static files from {}", dir.display());
        } else {
            warn!(
                "Static directory {} does not exist; unmatched paths will return 404",
                dir.display()
            );
        }
        state = state.with_static_dir(dir);
    }

    let app = api::create_router(state);

    let host = cmd.host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = cmd.port.unwrap_or(ctx.config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .context("invalid address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

fn ensure_config_file(
    path: &Path,
    create_missing: bool,
    dry_run: bool,
) -> Result<ConfigFileState> {
    if path.exists() {
        Ok(ConfigFileState::Existing)
    } else if !create_missing {
        Ok(ConfigFileState::Missing)
    } else if dry_run {
        Ok(ConfigFileState::WouldCreate)
    } else {
        settings::write_default_config(path)?;
        Ok(ConfigFileState::Created)
    }
}

fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_init_force_and_yes_parse() {
        let cli = Cli::try_parse_from(["userd", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, Command::Init(InitCommand { force: true })));

        let cli = Cli::try_parse_from(["userd", "-y", "--dry-run", "init"]).unwrap();
        assert!(cli.common.assume_yes);
        assert!(cli.common.dry_run);
        assert!(!cli.command.creates_missing_config());
    }

    #[test]
    fn test_only_init_and_reset_skip_config_creation() {
        let serve = Cli::try_parse_from(["userd", "serve"]).unwrap();
        assert!(serve.command.creates_missing_config());

        let show = Cli::try_parse_from(["userd", "config", "show"]).unwrap();
        assert!(show.command.creates_missing_config());

        let reset = Cli::try_parse_from(["userd", "config", "reset"]).unwrap();
        assert!(!reset.command.creates_missing_config());
    }

    #[test]
    fn test_config_override_directory_resolves_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::discover(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(paths.config_file, dir.path().join("config.toml"));

        let file = dir.path().join("custom.toml");
        let paths = AppPaths::discover(Some(file.clone())).unwrap();
        assert_eq!(paths.config_file, file);
    }

    #[test]
    fn test_init_on_empty_config_dir_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userd").join("config.toml");

        // Building the context for `init` must not create the file first.
        let state = ensure_config_file(&path, false, false).unwrap();
        assert_eq!(state, ConfigFileState::Missing);
        assert!(!path.exists());

        assert!(init_config(&path, false, false).unwrap());
        assert!(path.exists());
        let config = AppConfig::load_with_prefix(&path, "USERD_MAIN_TEST_UNSET").unwrap();
        assert_eq!(config.seed_users.len(), 2);

        let err = init_config(&path, false, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(init_config(&path, true, false).unwrap());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert_eq!(
            ensure_config_file(&path, true, true).unwrap(),
            ConfigFileState::WouldCreate
        );
        assert!(!init_config(&path, false, true).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_first_run_creates_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert_eq!(
            ensure_config_file(&path, true, false).unwrap(),
            ConfigFileState::Created
        );
        assert!(path.exists());
        assert_eq!(
            ensure_config_file(&path, true, false).unwrap(),
            ConfigFileState::Existing
        );
    }
}
