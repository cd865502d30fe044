//! Application state, independent of any rendering library.
//!
//! All changes go through `App` methods. User actions and completed
//! fetches (`AppEvent`) mutate state and may return `Command`s; the caller
//! runs those (usually as spawned tasks) and feeds the outcome back as
//! another `AppEvent`. Results of superseded requests are dropped.

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::error::ApiError;
use crate::favorites::FavoritesStore;
use crate::models::{apply_favorites, Pokemon, PokemonDetail, SpeciesInfo};
use crate::pagination::{PageList, PokemonPage};
use crate::search::should_search;
use crate::storage::KeyValueStore;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    All,
    Favorites,
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `refresh` replaces the accumulated pages and bypasses the cache.
    FetchPage { offset: u32, limit: u32, refresh: bool },
    Search { query: String, limit: u32, generation: u64 },
    /// Detail plus species for one Pokémon.
    FetchDetail { id: u32 },
    FetchFavorites { ids: Vec<u32> },
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// `offset` is the one the page was requested at.
    PageLoaded { page: PokemonPage, offset: u32, refresh: bool },
    PageFailed { error: ApiError, offset: u32, refresh: bool },
    SearchLoaded { generation: u64, page: PokemonPage },
    SearchFailed { generation: u64, error: ApiError },
    DetailLoaded(Box<PokemonDetail>),
    SpeciesLoaded { id: u32, species: SpeciesInfo },
    DetailFailed { id: u32, error: ApiError },
    FavoritesLoaded(Vec<PokemonDetail>),
    FavoritesFailed(ApiError),
}

pub struct App<S> {
    pub favorites: FavoritesStore<S>,
    page_size: u32,

    pages: PageList,
    pub loading_list: bool,
    pub loading_more: bool,

    pub search_mode: bool,
    pub search_input: String,
    debouncer: Debouncer<String>,
    active_query: String,
    search_generation: u64,
    search_results: Vec<Pokemon>,
    pub searching: bool,

    pub view: ViewMode,
    favorite_details: Vec<PokemonDetail>,
    pub loading_favorites: bool,

    pub selected: usize,
    pub detail: Option<PokemonDetail>,
    pub species: Option<SpeciesInfo>,
    detail_target: Option<u32>,
    pub loading_detail: bool,

    pub last_error: Option<String>,
    last_failed: Option<Command>,
    pub show_help: bool,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(favorites: FavoritesStore<S>, config: &Config) -> Self {
        Self::with_settings(favorites, config.page_size, config.debounce)
    }

    pub fn with_settings(favorites: FavoritesStore<S>, page_size: u32, debounce: Duration) -> Self {
        Self {
            favorites,
            page_size,
            pages: PageList::new(),
            loading_list: false,
            loading_more: false,
            search_mode: false,
            search_input: String::new(),
            debouncer: Debouncer::new(String::new(), debounce),
            active_query: String::new(),
            search_generation: 0,
            search_results: Vec::new(),
            searching: false,
            view: ViewMode::All,
            favorite_details: Vec::new(),
            loading_favorites: false,
            selected: 0,
            detail: None,
            species: None,
            detail_target: None,
            loading_detail: false,
            last_error: None,
            last_failed: None,
            show_help: false,
        }
    }

    /// Mount: favorites are loaded before the first page is requested so
    /// the flags are right on first render.
    pub fn start(&mut self) -> Vec<Command> {
        self.favorites.load();
        self.loading_list = true;
        vec![Command::FetchPage {
            offset: 0,
            limit: self.page_size,
            refresh: true,
        }]
    }

    pub fn is_searching(&self) -> bool {
        self.view == ViewMode::All && should_search(&self.active_query)
    }

    pub fn active_query(&self) -> &str {
        &self.active_query
    }

    pub fn has_next_page(&self) -> bool {
        self.pages.has_next_page()
    }

    pub fn total_count(&self) -> u32 {
        self.pages.total_count()
    }

    /// What the list pane shows, with favorite flags merged in.
    pub fn visible(&self) -> Vec<Pokemon> {
        let favs = self.favorites.favorites();
        let mut items = match self.view {
            ViewMode::Favorites => self
                .favorite_details
                .iter()
                .filter(|d| favs.contains(&d.id))
                .map(PokemonDetail::summary)
                .collect(),
            ViewMode::All if self.is_searching() => self.search_results.clone(),
            ViewMode::All => self.pages.pokemon(),
        };
        apply_favorites(&mut items, favs);
        items
    }

    pub fn selected_pokemon(&self) -> Option<Pokemon> {
        self.visible().into_iter().nth(self.selected)
    }

    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn next(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    pub fn previous(&mut self) {
        let len = self.visible().len();
        if len > 0 {
            self.selected = if self.selected == 0 { len - 1 } else { self.selected - 1 };
        }
    }

    // ---- search input ----

    pub fn enter_search(&mut self) {
        self.search_mode = true;
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        self.search_input.push(c);
        self.debouncer.update(self.search_input.clone(), now);
    }

    pub fn pop_char(&mut self, now: Instant) {
        self.search_input.pop();
        self.debouncer.update(self.search_input.clone(), now);
    }

    pub fn clear_search(&mut self, now: Instant) {
        self.search_input.clear();
        self.debouncer.update(String::new(), now);
    }

    /// Leave input mode and apply the query without waiting.
    pub fn finish_search(&mut self) -> Vec<Command> {
        self.search_mode = false;
        match self.debouncer.flush() {
            Some(q) => self.apply_query(q),
            None => Vec::new(),
        }
    }

    /// Called from the UI tick; applies the debounced query once it settles.
    pub fn tick(&mut self, now: Instant) -> Vec<Command> {
        match self.debouncer.poll(now) {
            Some(q) => self.apply_query(q),
            None => Vec::new(),
        }
    }

    fn apply_query(&mut self, raw: String) -> Vec<Command> {
        self.active_query = raw.trim().to_string();
        self.search_generation += 1;
        self.selected = 0;
        self.search_results.clear();
        if !should_search(&self.active_query) {
            self.searching = false;
            return Vec::new();
        }
        self.searching = true;
        self.last_error = None;
        vec![self.search_command()]
    }

    fn search_command(&self) -> Command {
        Command::Search {
            query: self.active_query.clone(),
            limit: self.page_size,
            generation: self.search_generation,
        }
    }

    // ---- list actions ----

    pub fn load_more(&mut self) -> Vec<Command> {
        if self.view != ViewMode::All || self.is_searching() || self.loading_more || self.loading_list {
            return Vec::new();
        }
        match self.pages.next_offset() {
            Some(offset) => {
                self.loading_more = true;
                vec![Command::FetchPage {
                    offset,
                    limit: self.page_size,
                    refresh: false,
                }]
            }
            None => Vec::new(),
        }
    }

    /// Manual retry of the last failed request, or a full refresh when
    /// there is none (or it no longer matches what is on screen).
    pub fn refresh(&mut self) -> Vec<Command> {
        self.last_error = None;
        if let Some(cmd) = self.last_failed.take() {
            if self.still_wanted(&cmd) {
                match &cmd {
                    Command::FetchPage { refresh: true, .. } => self.loading_list = true,
                    Command::FetchPage { .. } => self.loading_more = true,
                    Command::Search { .. } => {
                        self.searching = true;
                        return vec![self.search_command()];
                    }
                    Command::FetchDetail { .. } => self.loading_detail = true,
                    Command::FetchFavorites { .. } => self.loading_favorites = true,
                }
                return vec![cmd];
            }
            debug!(?cmd, "dropping outdated retry");
        }
        match self.view {
            ViewMode::Favorites => self.load_favorite_details(),
            ViewMode::All if self.is_searching() => {
                self.searching = true;
                vec![self.search_command()]
            }
            ViewMode::All => {
                self.loading_list = true;
                vec![Command::FetchPage {
                    offset: 0,
                    limit: self.page_size,
                    refresh: true,
                }]
            }
        }
    }

    fn still_wanted(&self, cmd: &Command) -> bool {
        match cmd {
            Command::FetchPage { refresh: true, .. } => self.view == ViewMode::All,
            Command::FetchPage { offset, .. } => {
                self.view == ViewMode::All && self.pages.next_offset() == Some(*offset)
            }
            Command::Search { .. } => self.is_searching(),
            Command::FetchDetail { id } => self.detail_target == Some(*id) && self.detail.is_none(),
            Command::FetchFavorites { .. } => self.view == ViewMode::Favorites,
        }
    }

    /// Forget a pending retry once a request of the same kind succeeds.
    fn clear_failed(&mut self, same_kind: impl Fn(&Command) -> bool) {
        if self.last_failed.as_ref().map_or(false, |c| same_kind(c)) {
            self.last_failed = None;
            self.last_error = None;
        }
    }

    pub fn toggle_view(&mut self) -> Vec<Command> {
        self.selected = 0;
        match self.view {
            ViewMode::All => {
                self.view = ViewMode::Favorites;
                self.load_favorite_details()
            }
            ViewMode::Favorites => {
                self.view = ViewMode::All;
                Vec::new()
            }
        }
    }

    fn load_favorite_details(&mut self) -> Vec<Command> {
        let ids = self.favorites.ids();
        if ids.is_empty() {
            self.favorite_details.clear();
            return Vec::new();
        }
        self.loading_favorites = true;
        vec![Command::FetchFavorites { ids }]
    }

    pub fn open_selected(&mut self) -> Vec<Command> {
        let Some(p) = self.selected_pokemon() else {
            return Vec::new();
        };
        if self.detail.as_ref().map(|d| d.id) == Some(p.id) {
            return Vec::new();
        }
        self.detail_target = Some(p.id);
        self.detail = None;
        self.species = None;
        self.loading_detail = true;
        vec![Command::FetchDetail { id: p.id }]
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
        self.species = None;
        self.detail_target = None;
        self.loading_detail = false;
    }

    pub fn toggle_favorite_selected(&mut self) {
        let target = match (&self.detail, self.selected_pokemon()) {
            (Some(d), _) => Some((d.id, d.name.clone())),
            (None, Some(p)) => Some((p.id, p.name)),
            (None, None) => None,
        };
        let Some((id, name)) = target else {
            return;
        };
        let result = self.favorites.toggle(id, &name);
        if result.is_err() {
            self.last_error = self.favorites.error().map(str::to_string);
        }
        let is_fav = self.favorites.is_favorite(id);
        if let Some(d) = self.detail.as_mut().filter(|d| d.id == id) {
            d.is_favorite = is_fav;
        }
        self.pages.apply_favorites(self.favorites.favorites());
        self.clamp_selection();
    }

    // ---- fetch results ----

    pub fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::PageLoaded {
                page,
                offset,
                refresh,
            } => {
                if refresh {
                    self.pages.reset_with(page);
                    self.loading_list = false;
                    self.selected = 0;
                } else {
                    self.loading_more = false;
                    // Appends must continue exactly where the list ends.
                    if self.pages.next_offset() != Some(offset) {
                        debug!(offset, expected = ?self.pages.next_offset(), "dropping out-of-order page");
                        return;
                    }
                    self.pages.push_page(page);
                }
                self.clear_failed(|c| matches!(c, Command::FetchPage { .. }));
            }
            AppEvent::PageFailed {
                error,
                offset,
                refresh,
            } => {
                if refresh {
                    self.loading_list = false;
                } else {
                    self.loading_more = false;
                }
                self.fail(
                    error,
                    Command::FetchPage {
                        offset,
                        limit: self.page_size,
                        refresh,
                    },
                );
            }
            AppEvent::SearchLoaded { generation, page } => {
                if generation != self.search_generation {
                    debug!(generation, current = self.search_generation, "dropping stale search result");
                    return;
                }
                self.search_results = page.pokemon;
                self.searching = false;
                self.clamp_selection();
                self.clear_failed(|c| matches!(c, Command::Search { .. }));
            }
            AppEvent::SearchFailed { generation, error } => {
                if generation != self.search_generation {
                    return;
                }
                self.searching = false;
                let cmd = self.search_command();
                self.fail(error, cmd);
            }
            AppEvent::DetailLoaded(detail) => {
                if self.detail_target != Some(detail.id) {
                    return;
                }
                let mut detail = *detail;
                detail.is_favorite = self.favorites.is_favorite(detail.id);
                self.detail = Some(detail);
                self.loading_detail = false;
                self.clear_failed(|c| matches!(c, Command::FetchDetail { .. }));
            }
            AppEvent::SpeciesLoaded { id, species } => {
                if self.detail_target == Some(id) {
                    self.species = Some(species);
                }
            }
            AppEvent::DetailFailed { id, error } => {
                if self.detail_target != Some(id) {
                    return;
                }
                self.loading_detail = false;
                self.fail(error, Command::FetchDetail { id });
            }
            AppEvent::FavoritesLoaded(details) => {
                self.favorite_details = details;
                self.loading_favorites = false;
                self.clamp_selection();
                self.clear_failed(|c| matches!(c, Command::FetchFavorites { .. }));
            }
            AppEvent::FavoritesFailed(error) => {
                self.loading_favorites = false;
                let ids = self.favorites.ids();
                self.fail(error, Command::FetchFavorites { ids });
            }
        }
    }

    fn fail(&mut self, error: ApiError, retry: Command) {
        debug!(kind = %error.kind, ?retry, "request failed, retry available");
        self.last_error = Some(error.message);
        self.last_failed = Some(retry);
    }
}
