//! Page windows over the list endpoint and their accumulation.

use crate::models::{apply_favorites, ApiPokemonList, Pokemon};
use reqwest::Url;
use std::collections::BTreeSet;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PokemonPage {
    pub pokemon: Vec<Pokemon>,
    pub total_count: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub next_offset: Option<u32>,
    pub previous_offset: Option<u32>,
}

impl PokemonPage {
    pub fn from_api(list: &ApiPokemonList, favorites: &BTreeSet<u32>) -> Self {
        Self {
            pokemon: list
                .results
                .iter()
                .map(|item| Pokemon::from_list_item(item, favorites))
                .collect(),
            total_count: list.count,
            has_next_page: list.next.is_some(),
            has_previous_page: list.previous.is_some(),
            next_offset: list.next.as_deref().and_then(offset_from_url),
            previous_offset: list.previous.as_deref().and_then(offset_from_url),
        }
    }
}

/// `offset` query parameter of a continuation URL. A URL without the
/// parameter means offset 0; a URL that does not parse yields `None`.
pub fn offset_from_url(url: &str) -> Option<u32> {
    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            warn!(%url, error = %e, "unparsable continuation url");
            return None;
        }
    };
    let offset = parsed
        .query_pairs()
        .find(|(k, _)| k == "offset")
        .and_then(|(_, v)| v.parse::<u32>().ok())
        .unwrap_or(0);
    Some(offset)
}

/// Pages loaded so far, in request order.
#[derive(Debug, Clone, Default)]
pub struct PageList {
    pages: Vec<PokemonPage>,
}

impl PageList {
    pub fn new() -> Self {
        Self::default()
    }

    /// "Load more": append after the pages already held.
    pub fn push_page(&mut self, page: PokemonPage) {
        self.pages.push(page);
    }

    /// "Refresh": drop everything and start from `first`.
    pub fn reset_with(&mut self, first: PokemonPage) {
        self.pages.clear();
        self.pages.push(first);
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn has_next_page(&self) -> bool {
        self.pages.last().map_or(false, |p| p.has_next_page)
    }

    /// Offset for the next "load more"; `None` when no more pages exist.
    pub fn next_offset(&self) -> Option<u32> {
        let last = self.pages.last()?;
        if last.has_next_page {
            last.next_offset
        } else {
            None
        }
    }

    pub fn total_count(&self) -> u32 {
        self.pages.last().map_or(0, |p| p.total_count)
    }

    /// Flattened items across all pages.
    pub fn pokemon(&self) -> Vec<Pokemon> {
        self.pages
            .iter()
            .flat_map(|p| p.pokemon.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pages.iter().map(|p| p.pokemon.len()).sum()
    }

    pub fn apply_favorites(&mut self, favorites: &BTreeSet<u32>) {
        for page in self.pages.iter_mut() {
            apply_favorites(&mut page.pokemon, favorites);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NamedResource;

    fn api_page(offset: u32, limit: u32, count: u32) -> ApiPokemonList {
        let base = "https://pokeapi.co/api/v2/pokemon";
        let end = (offset + limit).min(count);
        ApiPokemonList {
            count,
            next: (end < count).then(|| format!("{base}?offset={end}&limit={limit}")),
            previous: (offset > 0)
                .then(|| format!("{base}?offset={}&limit={limit}", offset.saturating_sub(limit))),
            results: (offset..end)
                .map(|i| NamedResource {
                    name: format!("mon{}", i + 1),
                    url: format!("{base}/{}/", i + 1),
                })
                .collect(),
        }
    }

    #[test]
    fn continuation_offsets() {
        assert_eq!(
            offset_from_url("https://pokeapi.co/api/v2/pokemon?offset=40&limit=20"),
            Some(40)
        );
        assert_eq!(offset_from_url("https://pokeapi.co/api/v2/pokemon?limit=20"), Some(0));
        assert_eq!(offset_from_url("not a url"), None);
    }

    #[test]
    fn page_flags_follow_urls() {
        let first = PokemonPage::from_api(&api_page(0, 2, 5), &BTreeSet::new());
        assert!(first.has_next_page);
        assert!(!first.has_previous_page);
        assert_eq!(first.next_offset, Some(2));
        assert_eq!(first.pokemon[1].id, 2);

        let last = PokemonPage::from_api(&api_page(4, 2, 5), &BTreeSet::new());
        assert!(!last.has_next_page);
        assert_eq!(last.previous_offset, Some(2));
        assert_eq!(last.pokemon.len(), 1);
    }

    #[test]
    fn accumulate_then_refresh() {
        let favs: BTreeSet<u32> = [3].into_iter().collect();
        let mut pages = PageList::new();
        assert_eq!(pages.next_offset(), None);

        pages.push_page(PokemonPage::from_api(&api_page(0, 2, 5), &favs));
        assert_eq!(pages.next_offset(), Some(2));
        pages.push_page(PokemonPage::from_api(&api_page(2, 2, 5), &favs));
        pages.push_page(PokemonPage::from_api(&api_page(4, 2, 5), &favs));

        let names: Vec<String> = pages.pokemon().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["mon1", "mon2", "mon3", "mon4", "mon5"]);
        assert!(!pages.has_next_page());
        assert_eq!(pages.next_offset(), None);
        assert!(pages.pokemon()[2].is_favorite);

        pages.reset_with(PokemonPage::from_api(&api_page(0, 2, 5), &favs));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages.page_count(), 1);
        assert_eq!(pages.total_count(), 5);

        pages.apply_favorites(&[1].into_iter().collect());
        assert!(pages.pokemon()[0].is_favorite);
    }
}
