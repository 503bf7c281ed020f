use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture, Event,
        KeyEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{io, path::PathBuf, sync::Arc, time::Duration};
use tracing::info;

use mealprep::app_state::AppState;
use mealprep::constants::{self, API_URL_ENV, DEFAULT_LOG_FILE, DEFAULT_WEB_PORT};
use mealprep::events::{handle_key_event, handle_mouse_event};
use mealprep::orchestrator::{deliver, Intent, Orchestrator, Session};
use mealprep::preferences::{BudgetLevel, Country, Diet, Preferences, PrepTime, Store};
use mealprep::transport::HttpChatClient;
use mealprep::ui::draw_ui;
use mealprep::{chat, logging, web_server};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Base URL of the meal-planning backend.
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Open the interactive terminal chat.
    Tui {
        #[arg(long, default_value = DEFAULT_LOG_FILE, help = "File that receives log output.")]
        log_file: PathBuf,
        #[command(flatten)]
        prefs: PreferenceArgs,
    },
    /// Chat line by line on stdin/stdout.
    Chat {
        #[command(flatten)]
        prefs: PreferenceArgs,
    },
    /// Send a single message and print the reply.
    Ask {
        message: String,
        #[command(flatten)]
        prefs: PreferenceArgs,
    },
    /// Check that the backend is up.
    Health,
    /// Serve the chat as a web page.
    Serve {
        #[arg(long, default_value_t = DEFAULT_WEB_PORT, help = "Port for the web server.")]
        port: u16,
    },
}

/// Starting preferences for a session.
#[derive(clap::Args, Debug, Default)]
struct PreferenceArgs {
    #[arg(long, help = "Canada, UK or US")]
    country: Option<Country>,
    #[arg(long, help = "Veg, Egg, Chicken or Vegan")]
    diet: Option<Diet>,
    #[arg(long, help = "Low, Medium or High")]
    budget: Option<BudgetLevel>,
    #[arg(long, help = "Minutes of prep time, 15 to 120")]
    prep_time: Option<PrepTime>,
    #[arg(long, help = "Walmart, Target, Freshco or NoFrills")]
    store: Option<Store>,
}

impl PreferenceArgs {
    fn into_preferences(self) -> Preferences {
        let defaults = Preferences::session_default();
        Preferences {
            country: self.country,
            diet: self.diet,
            budget_level: self.budget,
            prep_time: self.prep_time.or(defaults.prep_time),
            preferred_store: self.store,
        }
    }
}

fn http_client(api_url: &str) -> Result<HttpChatClient> {
    HttpChatClient::new(api_url).with_context(|| format!("Invalid backend URL '{}'", api_url))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for MEALPREP_API_URL)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let api_url = cli
        .api_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| constants::API_URL.clone());

    match cli.command {
        Commands::Tui { log_file, prefs } => {
            // The terminal belongs to the UI, so logs go to a file.
            let _guard = logging::init_file(&log_file)?;
            info!(api_url = %api_url, "Starting terminal UI");
            let client = http_client(&api_url)?;
            let session = Session::with_preferences(prefs.into_preferences());
            run_tui(AppState::with_session(session, Arc::new(client), api_url)).await?;
            info!("Terminal UI closed");
        }
        Commands::Chat { prefs } => {
            logging::init_stderr();
            let client = http_client(&api_url)?;
            let mut orchestrator =
                Orchestrator::with_session(Session::with_preferences(prefs.into_preferences()), client);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat::run_line_chat(&mut orchestrator, stdin, io::stdout())
                .await
                .context("Chat session failed")?;
        }
        Commands::Ask { message, prefs } => {
            logging::init_stderr();
            let client = http_client(&api_url)?;
            let mut session = Session::with_preferences(prefs.into_preferences());
            let exchange = session
                .handle(Intent::Submit(message))
                .context("Message must not be empty")?;
            let outcome = deliver(&client, exchange).await;
            let failed = outcome.result.is_err();
            session.complete(outcome);

            let reply = session
                .conversation()
                .last()
                .map(|m| m.content().to_string())
                .unwrap_or_default();
            if failed {
                anyhow::bail!(reply);
            }
            println!("{}", reply);
        }
        Commands::Health => {
            logging::init_stderr();
            let client = http_client(&api_url)?;
            let health = client
                .health()
                .await
                .with_context(|| format!("Backend at {} is not healthy", client.endpoints().health))?;
            println!("{}: {}", client.endpoints().health, health.status);
        }
        Commands::Serve { port } => {
            logging::init_stderr();
            info!(api_url = %api_url, "Starting web UI on port {}", port);
            let client = http_client(&api_url)?;
            tokio::select! {
                res = web_server::start_web_server(port, Arc::new(client)) => res?,
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
            }
        }
    }

    Ok(())
}

async fn run_tui(mut app: AppState) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut AppState) -> Result<()> {
    loop {
        // Pick up any replies that arrived since the last frame
        app.process_outcomes();

        terminal.draw(|f| draw_ui(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(app, key.code, key.modifiers) {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => handle_mouse_event(app, mouse.kind),
                Event::Paste(data) => app.paste(&data),
                _ => {}
            }
        }
    }
}
