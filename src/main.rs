use anyhow::Context;
use clap::Parser;
use crossterm::event::{self, Event as CEvent, KeyCode};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pokedex_tui::app::{App, AppEvent, Command};
use pokedex_tui::client::PokeClient;
use pokedex_tui::config::Config;
use pokedex_tui::favorites::FavoritesStore;
use pokedex_tui::models::{SpeciesInfo, NO_DESCRIPTION};
use pokedex_tui::storage::{FileStore, KeyValueStore};
use pokedex_tui::ui::draw_ui;
use pokedex_tui::utils::format_name;

#[derive(Parser, Debug)]
#[command(name = "pokedex_tui", version, about = "Browse Pokémon from PokeAPI in the terminal")]
struct Args {
    /// PokeAPI base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Items per page
    #[arg(long)]
    page_size: Option<u32>,

    /// JSON file holding favorites
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Log file (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the first page (or search results) and exit
    #[arg(long)]
    fetch_only: bool,

    /// Query used with --fetch-only
    #[arg(long, requires = "fetch_only")]
    search: Option<String>,
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(url) = args.base_url {
        config = config.with_base_url(url);
    }
    if let Some(n) = args.page_size.filter(|n| *n > 0) {
        config.page_size = n;
    }
    if let Some(path) = args.storage {
        config.storage_path = path;
    }
    if let Some(path) = args.log_file {
        config.log_path = path;
    }

    init_logging(&config.log_path)?;
    info!(base_url = %config.base_url, page_size = config.page_size, "starting");

    let client = PokeClient::new(&config).context("building http client")?;

    if args.fetch_only {
        return fetch_only(&client, &config, args.search.as_deref()).await;
    }

    let favorites = FavoritesStore::new(FileStore::new(&config.storage_path));
    let mut app = App::new(favorites, &config);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, &mut app, &client).await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    if let Err(e) = &res {
        error!(error = %e, "ui loop failed");
    }
    res
}

async fn fetch_only(client: &PokeClient, config: &Config, query: Option<&str>) -> anyhow::Result<()> {
    let mut favorites = FavoritesStore::new(FileStore::new(&config.storage_path));
    favorites.load();
    let page = match query {
        Some(q) => client.search_page(q, config.page_size, favorites.favorites()).await?,
        None => client.fetch_page(0, config.page_size, favorites.favorites()).await?,
    };
    for p in &page.pokemon {
        let star = if p.is_favorite { "*" } else { " " };
        println!("{} #{:<5} {}", star, p.id, format_name(&p.name));
    }
    eprintln!("{} shown, {} total", page.pokemon.len(), page.total_count);
    Ok(())
}

async fn run<S: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<S>,
    client: &PokeClient,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut favorites_rx = app.favorites.subscribe();
    for cmd in app.start() {
        spawn_command(client, cmd, app.favorites.favorites().clone(), tx.clone());
    }

    let tick_rate = Duration::from_millis(100);
    let gc_every = Duration::from_secs(60);
    let mut last_gc = Instant::now();
    let mut dirty = true;
    loop {
        // Pick up any finished fetches.
        while let Ok(ev) = rx.try_recv() {
            app.handle(ev);
            dirty = true;
        }

        // Favorites changed since the last frame (toggle, load, failed write).
        if favorites_rx.has_changed().unwrap_or(false) {
            let snapshot = favorites_rx.borrow_and_update();
            if let Some(err) = &snapshot.error {
                warn!(count = snapshot.ids.len(), %err, "favorites write failed");
            }
            dirty = true;
        }

        if dirty {
            draw_ui(terminal, app)?;
            dirty = false;
        }

        let mut commands = app.tick(Instant::now());
        if !commands.is_empty() {
            dirty = true;
        }

        if last_gc.elapsed() >= gc_every {
            client.cache().collect_garbage();
            last_gc = Instant::now();
        }

        if event::poll(tick_rate)? {
            let ev = event::read()?;
            dirty = true;
            if let CEvent::Key(key) = ev {
                let now = Instant::now();
                if app.search_mode {
                    match key.code {
                        KeyCode::Enter => commands.extend(app.finish_search()),
                        KeyCode::Esc => {
                            app.clear_search(now);
                            commands.extend(app.finish_search());
                        }
                        KeyCode::Backspace => app.pop_char(now),
                        KeyCode::Char(c) => app.push_char(c, now),
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('q') => break,
                        KeyCode::F(1) | KeyCode::Char('h') => {
                            app.show_help = !app.show_help;
                        }
                        KeyCode::Char('/') => app.enter_search(),
                        KeyCode::Down => app.next(),
                        KeyCode::Up => app.previous(),
                        KeyCode::Enter => commands.extend(app.open_selected()),
                        KeyCode::Esc => app.close_detail(),
                        KeyCode::Char('f') => app.toggle_favorite_selected(),
                        KeyCode::Char('v') => commands.extend(app.toggle_view()),
                        KeyCode::Char('n') => commands.extend(app.load_more()),
                        KeyCode::Char('r') => commands.extend(app.refresh()),
                        _ => {}
                    }
                }
            }
        }

        for cmd in commands {
            spawn_command(client, cmd, app.favorites.favorites().clone(), tx.clone());
        }
    }
    Ok(())
}

fn spawn_command(
    client: &PokeClient,
    cmd: Command,
    favorites: BTreeSet<u32>,
    tx: mpsc::UnboundedSender<AppEvent>,
) {
    let client = client.clone();
    tokio::spawn(async move {
        let events = execute(&client, cmd, &favorites).await;
        for ev in events {
            // The receiver only goes away on shutdown.
            let _ = tx.send(ev);
        }
    });
}

async fn execute(client: &PokeClient, cmd: Command, favorites: &BTreeSet<u32>) -> Vec<AppEvent> {
    match cmd {
        Command::FetchPage {
            offset,
            limit,
            refresh,
        } => {
            if refresh {
                client.cache().invalidate_lists();
                client.cache().invalidate_search();
            }
            match client.fetch_page(offset, limit, favorites).await {
                Ok(page) => vec![AppEvent::PageLoaded {
                    page,
                    offset,
                    refresh,
                }],
                Err(error) => vec![AppEvent::PageFailed {
                    error,
                    offset,
                    refresh,
                }],
            }
        }
        Command::Search {
            query,
            limit,
            generation,
        } => match client.search_page(&query, limit, favorites).await {
            Ok(page) => vec![AppEvent::SearchLoaded { generation, page }],
            Err(error) => vec![AppEvent::SearchFailed { generation, error }],
        },
        Command::FetchDetail { id } => {
            let key = id.to_string();
            let (detail, species) =
                tokio::join!(client.fetch_detail(&key, favorites), client.fetch_species(&key));
            let mut events = Vec::with_capacity(2);
            match detail {
                Ok(d) => events.push(AppEvent::DetailLoaded(Box::new(d))),
                Err(error) => events.push(AppEvent::DetailFailed { id, error }),
            }
            match species {
                Ok(species) => events.push(AppEvent::SpeciesLoaded { id, species }),
                Err(e) => {
                    info!(id, kind = %e.kind, "species unavailable");
                    let species = SpeciesInfo {
                        id,
                        description: NO_DESCRIPTION.to_string(),
                        ..Default::default()
                    };
                    events.push(AppEvent::SpeciesLoaded { id, species });
                }
            }
            events
        }
        Command::FetchFavorites { ids } => {
            let set: BTreeSet<u32> = ids.into_iter().collect();
            match client.fetch_favorites(&set).await {
                Ok(details) => vec![AppEvent::FavoritesLoaded(details)],
                Err(error) => vec![AppEvent::FavoritesFailed(error)],
            }
        }
    }
}
