//! Name search on top of an API that has no search endpoint.
//!
//! The client first tries the query as an exact name; when that misses it
//! scans one large unfiltered page with a case-insensitive substring match.
//! This is a linear scan over up to `SEARCH_SCAN_LIMIT` names per miss, not
//! an index.

use crate::config::MIN_SEARCH_LEN;
use crate::models::{ApiPokemonList, NamedResource};
use crate::utils::{is_resource_key, is_valid_pokemon_id};

/// Trimmed, lowercased query.
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Whether a (debounced) query is long enough to trigger a search instead
/// of showing the normal list.
pub fn should_search(query: &str) -> bool {
    query.trim().chars().count() >= MIN_SEARCH_LEN
}

/// Key for the exact-name lookup, or `None` when the query cannot name a
/// resource (odd characters, or a number outside the known id range) and
/// should go straight to the list scan.
pub fn lookup_key(query: &str) -> Option<String> {
    let key = normalize_query(query);
    if !is_resource_key(&key) {
        return None;
    }
    if key.bytes().all(|b| b.is_ascii_digit()) {
        let id = key.parse::<u32>().ok()?;
        if !is_valid_pokemon_id(id) {
            return None;
        }
    }
    Some(key)
}

/// Result for an exact name hit: one item, no continuation.
pub fn exact_match(base_url: &str, id: u32, name: &str) -> ApiPokemonList {
    ApiPokemonList {
        count: 1,
        next: None,
        previous: None,
        results: vec![NamedResource {
            name: name.to_string(),
            url: format!("{}/pokemon/{}/", base_url.trim_end_matches('/'), id),
        }],
    }
}

/// Case-insensitive substring filter. `count` is the number of matches
/// before truncation to `limit`.
pub fn filter_by_name(items: &[NamedResource], query: &str, limit: usize) -> ApiPokemonList {
    let needle = normalize_query(query);
    let matches: Vec<&NamedResource> = items
        .iter()
        .filter(|item| item.name.to_lowercase().contains(&needle))
        .collect();
    ApiPokemonList {
        count: matches.len() as u32,
        next: None,
        previous: None,
        results: matches.into_iter().take(limit).cloned().collect(),
    }
}
