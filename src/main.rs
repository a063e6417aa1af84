//! # host-test CLI Entry Point
//!
//! This is the main entry point for the host-test TUI.
//!
//! ## Overview
//!
//! host-test stands in for a browser extension talking to a native messaging
//! host. It looks the host up by name, launches it, and lets you fire
//! hand-written messages at it while every response lands in the output log.
//!
//! ## Usage
//!
//! ```bash
//! # Open the panel with the default host pre-filled
//! host-test
//!
//! # Pre-fill another host and use a custom manifest directory via config
//! host-test --host io.example.echo --config ./host-test.json
//!
//! # Register a binary as a native messaging host, and remove it again
//! host-test --install io.example.echo /usr/local/bin/host-test \
//!     --allow-origin chrome-extension://host-test/
//! host-test --uninstall io.example.echo
//!
//! # List registered hosts
//! host-test --list-hosts
//!
//! # Set a Discord activity directly over Discord's IPC socket
//! host-test --set-activity wanikani "Reviewing" -d "Level 12"
//!
//! # Act as an echo host (also what happens when a browser launches this
//! # binary with an origin argument)
//! host-test --echo-host
//! ```
//!
//! ## Key Bindings
//!
//! - `Tab` / `Shift+Tab` - Move focus between enabled controls
//! - `Enter` - Press the focused control
//! - `c` / `h` / `a` / `p` / `d` - Connect, Handshake, Set activity, Ping, Disconnect
//! - `j` / `k` - Scroll the output log
//! - `G` - Jump back to the newest output
//! - `t` - Cycle theme
//! - `q` / `Esc` - Quit (disconnects first)

use host_test::discord;
use host_test::logging;
use host_test::messages::{nonce_now, CommandRequest, Handshake};
use host_test::native::manifest::{self, Scope};
use host_test::native::{echo, ProcessConnector};
use host_test::panel::{BufferedView, ConnectionPanel};
use host_test::ui::{self, theme::Theme, App, Config};

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trait for reading terminal events (allows dependency injection for testing)
trait EventReader {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<Event>>;
}

/// Production event reader that uses crossterm's event polling + read
struct CrosstermEventReader;

impl EventReader for CrosstermEventReader {
    fn read_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if event::poll(timeout).context("Failed to poll for events")? {
            Ok(Some(
                event::read().context("Failed to read keyboard event")?,
            ))
        } else {
            Ok(None)
        }
    }
}

/// host-test - poke native messaging hosts by hand
#[derive(Parser, Debug)]
#[command(name = "host-test")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A terminal test harness for browser native messaging hosts", long_about = None)]
struct Args {
    /// Extension origin, as passed by a browser launching this binary as a host.
    /// Implies --echo-host.
    #[arg(value_name = "ORIGIN")]
    launch_origin: Option<String>,

    /// Run as an echo host on stdin/stdout
    #[arg(long, conflicts_with_all = ["install", "uninstall", "list_hosts", "set_activity"])]
    echo_host: bool,

    /// Host id to pre-fill in the panel
    #[arg(long, value_name = "ID")]
    host: Option<String>,

    /// Origin presented to spawned hosts
    #[arg(long, value_name = "URL")]
    origin: Option<String>,

    /// Path to the config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file (or directory) for diagnostics
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Theme name, overriding the config file
    #[arg(long, value_name = "NAME")]
    theme: Option<String>,

    /// Register BINARY as the native messaging host NAME and exit
    #[arg(
        long,
        num_args = 2,
        value_names = ["NAME", "BINARY"],
        conflicts_with_all = ["uninstall", "list_hosts", "set_activity"]
    )]
    install: Option<Vec<String>>,

    /// Origin allowed to use the installed host (repeatable)
    #[arg(long = "allow-origin", value_name = "URL", value_parser = parse_origin, requires = "install")]
    allow_origins: Vec<String>,

    /// Description written to the installed manifest
    #[arg(long, value_name = "TEXT", requires = "install")]
    description: Option<String>,

    /// Remove the manifest of the native messaging host NAME and exit
    #[arg(long, value_name = "NAME", conflicts_with_all = ["list_hosts", "set_activity"])]
    uninstall: Option<String>,

    /// Install or uninstall system-wide instead of for the current user
    #[arg(long)]
    system: bool,

    /// List registered native messaging hosts and exit
    #[arg(long, conflicts_with = "set_activity")]
    list_hosts: bool,

    /// Set a Discord activity over Discord's IPC socket, then hold it until Ctrl+C.
    /// CLIENT_ID may also be a known application name.
    #[arg(long, num_args = 2, value_names = ["CLIENT_ID", "STATE"])]
    set_activity: Option<Vec<String>>,

    /// Activity details for --set-activity
    #[arg(short = 'd', long, value_name = "TEXT", requires = "set_activity")]
    details: Option<String>,

    /// Process id reported with --set-activity (defaults to this process)
    #[arg(short = 'p', long, value_name = "PID", requires = "set_activity")]
    pid: Option<u32>,
}

/// Accept only absolute URLs as allowed origins.
fn parse_origin(value: &str) -> Result<String, String> {
    url::Url::parse(value)
        .map(|_| value.to_string())
        .map_err(|e| format!("invalid URL: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.echo_host || args.launch_origin.is_some() {
        return run_echo_host(args.log_file);
    }

    if args.install.is_some()
        || args.uninstall.is_some()
        || args.list_hosts
        || args.set_activity.is_some()
    {
        return run_command(&args).await;
    }

    // Set up panic hook to ensure terminal is restored on panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_application(args).await;

    // Restore panic hook
    let _ = panic::take_hook();

    result
}

/// Serve the echo host protocol on stdio until the client hangs up.
fn run_echo_host(log_file: Option<PathBuf>) -> Result<()> {
    // Logging is opt-in here: browsers may spawn many short-lived hosts.
    let _log_guard = if log_file.is_some() || logging::requested_by_env() {
        Some(logging::init(log_file)?)
    } else {
        None
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    echo::run(&mut stdin.lock(), &mut stdout.lock()).context("Echo host failed")?;
    Ok(())
}

async fn run_application(args: Args) -> Result<()> {
    let _log_guard = match logging::init(args.log_file.clone()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Could not initialize logging: {e:#}");
            None
        }
    };

    let config = load_config(&args)?;
    let dirs = manifest::search_dirs(&config.manifest_dirs);

    let theme = match Theme::by_name(&config.theme) {
        Some(theme) => theme.clone(),
        None => {
            tracing::warn!(theme = %config.theme, "unknown theme, using default");
            Theme::default_theme().clone()
        }
    };

    let connector = ProcessConnector::new(dirs, config.origin.clone());
    let panel = ConnectionPanel::new(
        Box::new(connector),
        BufferedView::default(),
        config.panel_settings(),
    );
    let host = args.host.unwrap_or_else(|| config.host.clone());
    let mut app = App::new(panel, host, theme);

    tracing::info!(origin = %config.origin, "starting panel");

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode for terminal")?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    // Run the app and ensure cleanup happens even on error
    let mut event_reader = CrosstermEventReader;
    let run_result = run_app(&mut terminal, &mut app, &mut event_reader).await;

    // Close the port before leaving, even if the loop failed
    app.panel.disconnect();

    // Restore terminal (always runs, even if run_app failed)
    let cleanup_result = cleanup_terminal(&mut terminal);

    run_result?;
    cleanup_result?;

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(origin) = args.origin.clone() {
        config.origin = origin;
    }
    if let Some(theme) = args.theme.clone() {
        config.theme = theme;
    }
    Ok(config)
}

/// One-shot commands. Diagnostics go to stderr since there is no TUI.
async fn run_command(args: &Args) -> Result<()> {
    if let Err(e) = logging::init_stderr() {
        eprintln!("Warning: Could not initialize logging: {e:#}");
    }

    if let Some(parts) = &args.set_activity {
        return run_set_activity(args, parts).await;
    }

    let config = load_config(args)?;
    if let Some(install) = &args.install {
        return run_install(args, install, &config);
    }
    if let Some(name) = &args.uninstall {
        manifest::unregister(name, scope(args))
            .with_context(|| format!("Failed to remove manifest for {name}"))?;
        println!("Removed manifest for {name}");
        return Ok(());
    }
    list_hosts(&manifest::search_dirs(&config.manifest_dirs))
}

fn scope(args: &Args) -> Scope {
    if args.system {
        Scope::System
    } else {
        Scope::User
    }
}

/// Register `parts = [NAME, BINARY]` as a native messaging host.
fn run_install(args: &Args, parts: &[String], config: &Config) -> Result<()> {
    let [name, binary] = parts else {
        bail!("--install expects NAME and BINARY");
    };

    manifest::validate_host_name(name)?;

    let binary = PathBuf::from(binary);
    warn_if_not_executable(&binary);
    let path = if binary.is_absolute() {
        binary
    } else {
        std::env::current_dir()
            .context("Failed to get current working directory")?
            .join(binary)
    };

    let origins = if args.allow_origins.is_empty() {
        vec![config.origin.clone()]
    } else {
        args.allow_origins.clone()
    };
    let description = args.description.clone().unwrap_or_default();

    let manifest = manifest::Manifest::new(name, &description, path, origins);
    manifest::register(&manifest, scope(args))
        .with_context(|| format!("Failed to install manifest for {name}"))?;

    println!("Wrote manifest for {name}");
    Ok(())
}

fn warn_if_not_executable(binary: &Path) {
    match std::fs::metadata(binary) {
        Err(e) => tracing::warn!(binary = %binary.display(), error = %e, "cannot access binary"),
        Ok(meta) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if meta.permissions().mode() & 0o111 == 0 {
                    tracing::warn!(binary = %binary.display(), "binary is not executable");
                }
            }
            #[cfg(not(unix))]
            let _ = meta;
        }
    }
}

/// Handshake with Discord, set the activity, and keep the session open.
#[cfg(unix)]
async fn run_set_activity(args: &Args, parts: &[String]) -> Result<()> {
    use std::net::Shutdown;

    let [client, state] = parts else {
        bail!("--set-activity expects CLIENT_ID and STATE");
    };
    let client_id = discord::resolve_client_id(client)?;
    let pid = args.pid.unwrap_or_else(std::process::id);

    let dir = discord::socket_dir();
    let mut client = discord::dial(&dir).context("Error connecting to Discord socket")?;

    let reply = client
        .send(&Handshake::new(&client_id, nonce_now()))
        .context("Error sending HANDSHAKE")?;
    println!("{reply}");

    let request = CommandRequest::set_activity(pid, state, args.details.as_deref(), nonce_now());
    let reply = client
        .send(&request)
        .context("Error sending SET_ACTIVITY")?;
    println!("{reply}");

    eprintln!("Activity set. Press Ctrl+C to clear it and exit.");

    let socket = client
        .try_clone_stream()
        .context("Failed to clone Discord socket")?;
    let mut session = tokio::task::spawn_blocking(move || client.serve());

    let interrupted = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to wait for Ctrl+C")?;
            true
        }
        served = &mut session => {
            served.context("Discord session task failed")??;
            false
        }
    };

    if interrupted {
        // Unblocks the session thread, which then sees end of stream.
        let _ = socket.shutdown(Shutdown::Both);
        let _ = session.await;
    }

    Ok(())
}

#[cfg(not(unix))]
async fn run_set_activity(_args: &Args, _parts: &[String]) -> Result<()> {
    Err(discord::IpcError::Unsupported.into())
}

fn list_hosts(dirs: &[PathBuf]) -> Result<()> {
    let hosts = manifest::list(dirs);
    if hosts.is_empty() {
        println!("No native messaging hosts registered");
        println!("Searched:");
        for dir in dirs {
            println!("  {}", dir.display());
        }
        return Ok(());
    }

    for host in hosts {
        println!(
            "{}\n    path: {}\n    manifest: {}\n    origins: {}\n",
            host.manifest.name,
            host.executable().display(),
            host.file.display(),
            host.manifest.allowed_origins.join(", ")
        );
    }
    Ok(())
}

/// Clean up terminal state
fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("Failed to restore terminal")?;

    terminal.show_cursor().context("Failed to show cursor")?;

    Ok(())
}

async fn run_app<B>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_reader: &mut dyn EventReader,
) -> Result<()>
where
    B: Backend,
    B::Error: Send + Sync + 'static,
{
    loop {
        // Deliver whatever the host sent since the last frame
        app.tick();

        terminal
            .draw(|f| ui::render(f, app))
            .context("Failed to draw terminal UI")?;

        // Poll faster while a host may be talking to us
        let poll_timeout = if app.panel.is_connected() {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(100)
        };

        if let Some(Event::Key(key)) = event_reader.read_event(poll_timeout)? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use host_test::native::{ConnectError, Connector, Port};
    use host_test::panel::PanelSettings;
    use ratatui::backend::TestBackend;
    use std::collections::VecDeque;

    /// Mock event reader for testing that returns a predetermined sequence of events
    struct MockEventReader {
        events: VecDeque<Event>,
    }

    impl MockEventReader {
        fn new(events: Vec<Event>) -> Self {
            Self {
                events: VecDeque::from(events),
            }
        }
    }

    impl EventReader for MockEventReader {
        fn read_event(&mut self, _timeout: Duration) -> Result<Option<Event>> {
            Ok(self.events.pop_front())
        }
    }

    struct NoHosts;

    impl Connector for NoHosts {
        fn connect(&mut self, host_id: &str) -> Result<Box<dyn Port>, ConnectError> {
            Err(ConnectError::Manifest(manifest::ManifestError::NotFound(
                host_id.to_string(),
            )))
        }
    }

    fn key_event(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::empty()))
    }

    fn test_app() -> App {
        let panel = ConnectionPanel::new(
            Box::new(NoHosts),
            BufferedView::default(),
            PanelSettings::default(),
        );
        App::new(
            panel,
            "io.example.host".to_string(),
            Theme::default_theme().clone(),
        )
    }

    #[test]
    fn test_mock_event_reader() {
        let mut reader = MockEventReader::new(vec![key_event(KeyCode::Char('a'))]);

        assert!(matches!(
            reader.read_event(Duration::from_millis(10)).unwrap(),
            Some(Event::Key(KeyEvent {
                code: KeyCode::Char('a'),
                ..
            }))
        ));
        assert!(reader
            .read_event(Duration::from_millis(10))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_crossterm_event_reader_type() {
        let _reader: Box<dyn EventReader> = Box::new(CrosstermEventReader);
    }

    #[tokio::test]
    async fn test_run_app_connect_then_quit() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let mut app = test_app();
        let mut reader = MockEventReader::new(vec![
            key_event(KeyCode::Char('c')),
            key_event(KeyCode::Char('q')),
        ]);

        run_app(&mut terminal, &mut app, &mut reader).await.unwrap();

        assert!(app.should_quit);
        assert!(app
            .log_lines()
            .iter()
            .any(|l| l.starts_with("Failed to connect to io.example.host")));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["host-test"]).unwrap();
        assert!(args.launch_origin.is_none());
        assert!(!args.echo_host);
        assert!(args.install.is_none());
    }

    #[test]
    fn test_args_browser_launch_origin() {
        let args = Args::try_parse_from(["host-test", "chrome-extension://abc/"]).unwrap();
        assert_eq!(args.launch_origin.as_deref(), Some("chrome-extension://abc/"));
    }

    #[test]
    fn test_args_install() {
        let args = Args::try_parse_from([
            "host-test",
            "--install",
            "io.example.echo",
            "./host-test",
            "--allow-origin",
            "chrome-extension://a/",
            "--allow-origin",
            "chrome-extension://b/",
        ])
        .unwrap();

        assert_eq!(
            args.install,
            Some(vec!["io.example.echo".to_string(), "./host-test".to_string()])
        );
        assert_eq!(args.allow_origins.len(), 2);
    }

    #[test]
    fn test_args_allow_origin_requires_install() {
        let result = Args::try_parse_from(["host-test", "--allow-origin", "chrome-extension://a/"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_echo_conflicts_with_list() {
        let result = Args::try_parse_from(["host-test", "--echo-host", "--list-hosts"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_install_rejects_bad_name() {
        let args = Args::try_parse_from(["host-test", "--install", "Bad-Name", "/bin/true"]).unwrap();
        let parts = args.install.clone().unwrap();
        let result = run_install(&args, &parts, &Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_args_allow_origin_must_be_url() {
        let result = Args::try_parse_from([
            "host-test",
            "--install",
            "io.example.echo",
            "./host-test",
            "--allow-origin",
            "not a url",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_args_uninstall_system() {
        let args =
            Args::try_parse_from(["host-test", "--uninstall", "io.example.echo", "--system"]).unwrap();
        assert_eq!(args.uninstall.as_deref(), Some("io.example.echo"));
        assert!(matches!(scope(&args), Scope::System));
    }

    #[test]
    fn test_args_set_activity() {
        let args = Args::try_parse_from([
            "host-test",
            "--set-activity",
            "wanikani",
            "Reviewing",
            "-d",
            "Level 12",
            "-p",
            "4242",
        ])
        .unwrap();

        assert_eq!(
            args.set_activity,
            Some(vec!["wanikani".to_string(), "Reviewing".to_string()])
        );
        assert_eq!(args.details.as_deref(), Some("Level 12"));
        assert_eq!(args.pid, Some(4242));
    }

    #[test]
    fn test_args_details_requires_set_activity() {
        let result = Args::try_parse_from(["host-test", "-d", "Level 12"]);
        assert!(result.is_err());
    }
}
