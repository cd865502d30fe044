//! PokeAPI client.
//!
//! Wire-level calls (`get_*`) go through the query cache first, then
//! through the read retry policy. The domain helpers (`fetch_*`) add the
//! query layer on top: a second, outer retry policy and, once that is
//! exhausted, whatever stale payload the cache still holds. Transport
//! failures come back as classified [`ApiError`]s.

use crate::cache::{QueryCache, QueryKey};
use crate::config::Config;
use crate::error::{ApiError, ErrorKind};
use crate::models::{
    ApiPokemonDetail, ApiPokemonList, ApiPokemonSpecies, PokemonDetail, SpeciesInfo,
};
use crate::pagination::PokemonPage;
use crate::retry::RetryPolicy;
use crate::search::{exact_match, filter_by_name, lookup_key, normalize_query};
use crate::utils::is_resource_key;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

const NO_QUERY: &[(&str, String)] = &[];

#[derive(Clone)]
pub struct PokeClient {
    http: reqwest::Client,
    base: Url,
    base_url: String,
    retry: RetryPolicy,
    query_retry: RetryPolicy,
    search_scan_limit: u32,
    cache: Arc<QueryCache>,
}

impl PokeClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| ApiError::new(ErrorKind::Unknown).with_detail(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(ErrorKind::Unknown)
                .with_detail(format!("base url {} cannot carry a path", base_url)));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base,
            base_url,
            retry: config.read_retry,
            query_retry: config.query_retry,
            search_scan_limit: config.search_scan_limit,
            cache: Arc::new(QueryCache::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Base URL with `segments` appended, each percent-encoded as one
    /// path segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// One GET, no retry.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(%url, ?query, "GET");
        let resp = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .await
            .map_err(|e| log_failure(url.as_str(), e.into()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(log_failure(url.as_str(), ApiError::from_status(status)));
        }
        debug!(%url, status = status.as_u16(), "response");
        resp.json::<T>()
            .await
            .map_err(|e| log_failure(url.as_str(), e.into()))
    }

    pub async fn get_pokemon_list(&self, offset: u32, limit: u32) -> Result<ApiPokemonList, ApiError> {
        let key = QueryKey::List { offset, limit };
        if let Some(hit) = self.cache.get_fresh::<ApiPokemonList>(&key) {
            return Ok(hit);
        }
        let url = self.endpoint(&["pokemon"]);
        let url = &url;
        let query = [("offset", offset.to_string()), ("limit", limit.to_string())];
        let query = &query;
        let list: ApiPokemonList = self
            .retry
            .run("pokemon list", move || self.get_json(url, query))
            .await?;
        self.cache.insert(key, &list);
        Ok(list)
    }

    /// Detail by numeric id or name. Keys outside `[a-z0-9-]` are
    /// answered as not found without a request.
    pub async fn get_pokemon_detail(&self, id_or_name: &str) -> Result<ApiPokemonDetail, ApiError> {
        let key = QueryKey::detail(id_or_name);
        if let Some(hit) = self.cache.get_fresh::<ApiPokemonDetail>(&key) {
            return Ok(hit);
        }
        let url = self.endpoint(&["pokemon", checked_key(id_or_name)?.as_str()]);
        let url = &url;
        let detail: ApiPokemonDetail = self
            .retry
            .run("pokemon detail", move || self.get_json(url, NO_QUERY))
            .await?;
        // Reachable later by either id or name.
        self.cache.insert(QueryKey::detail(&detail.id.to_string()), &detail);
        self.cache.insert(QueryKey::detail(&detail.name), &detail);
        Ok(detail)
    }

    pub async fn get_pokemon_species(&self, id_or_name: &str) -> Result<ApiPokemonSpecies, ApiError> {
        let key = QueryKey::species(id_or_name);
        if let Some(hit) = self.cache.get_fresh::<ApiPokemonSpecies>(&key) {
            return Ok(hit);
        }
        let url = self.endpoint(&["pokemon-species", checked_key(id_or_name)?.as_str()]);
        let url = &url;
        let species: ApiPokemonSpecies = self
            .retry
            .run("pokemon species", move || self.get_json(url, NO_QUERY))
            .await?;
        self.cache.insert(key, &species);
        Ok(species)
    }

    /// Details for several ids, fetched concurrently. Fails if any fails.
    pub async fn get_pokemon_by_ids(&self, ids: &[u32]) -> Result<Vec<ApiPokemonDetail>, ApiError> {
        let keys: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        futures::future::try_join_all(keys.iter().map(|k| self.get_pokemon_detail(k))).await
    }

    /// Name search. Blank queries return the first normal page.
    pub async fn search_pokemon(&self, query: &str, limit: u32) -> Result<ApiPokemonList, ApiError> {
        let q = normalize_query(query);
        if q.is_empty() {
            return self.get_pokemon_list(0, limit).await;
        }
        let key = QueryKey::search(&q, limit);
        if let Some(hit) = self.cache.get_fresh::<ApiPokemonList>(&key) {
            return Ok(hit);
        }
        let q = q.as_str();
        let res = self
            .retry
            .run("pokemon search", move || self.search_uncached(q, limit))
            .await?;
        self.cache.insert(key, &res);
        Ok(res)
    }

    async fn search_uncached(&self, q: &str, limit: u32) -> Result<ApiPokemonList, ApiError> {
        match lookup_key(q) {
            Some(name) => match self.get_pokemon_detail(&name).await {
                Ok(detail) => {
                    info!(query = %q, id = detail.id, "exact match");
                    return Ok(exact_match(&self.base_url, detail.id, &detail.name));
                }
                Err(e) if e.is_not_found() => debug!(query = %q, "no exact match, scanning list"),
                Err(e) => warn!(query = %q, kind = %e.kind, "exact lookup failed, scanning list"),
            },
            None => debug!(query = %q, "not a resource name, scanning list"),
        }
        let all = self.get_pokemon_list(0, self.search_scan_limit).await?;
        let res = filter_by_name(&all.results, q, limit as usize);
        info!(query = %q, matches = res.count, "substring search");
        Ok(res)
    }

    // ---- query layer: outer retry, then stale data if every attempt failed ----

    fn or_stale<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
        res: Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        match res {
            Ok(value) => Ok(value),
            Err(e) => match self.cache.get_stale::<T>(key) {
                Some(stale) => {
                    warn!(?key, kind = %e.kind, "refetch failed, serving stale data");
                    Ok(stale)
                }
                None => Err(e),
            },
        }
    }

    pub async fn fetch_page(
        &self,
        offset: u32,
        limit: u32,
        favorites: &BTreeSet<u32>,
    ) -> Result<PokemonPage, ApiError> {
        let res = self
            .query_retry
            .run("list query", move || self.get_pokemon_list(offset, limit))
            .await;
        let list = self.or_stale(&QueryKey::List { offset, limit }, res)?;
        Ok(PokemonPage::from_api(&list, favorites))
    }

    /// Searches are not retried at the query layer; the request layer
    /// already retries the whole lookup-then-scan.
    pub async fn search_page(
        &self,
        query: &str,
        limit: u32,
        favorites: &BTreeSet<u32>,
    ) -> Result<PokemonPage, ApiError> {
        let res = RetryPolicy::once()
            .run("search query", move || self.search_pokemon(query, limit))
            .await;
        let list = self.or_stale(&QueryKey::search(query, limit), res)?;
        Ok(PokemonPage::from_api(&list, favorites))
    }

    pub async fn fetch_detail(
        &self,
        id_or_name: &str,
        favorites: &BTreeSet<u32>,
    ) -> Result<PokemonDetail, ApiError> {
        let res = self
            .query_retry
            .run("detail query", move || self.get_pokemon_detail(id_or_name))
            .await;
        let api = self.or_stale(&QueryKey::detail(id_or_name), res)?;
        Ok(PokemonDetail::from_api(&api, favorites.contains(&api.id)))
    }

    pub async fn fetch_species(&self, id_or_name: &str) -> Result<SpeciesInfo, ApiError> {
        let res = self
            .query_retry
            .run("species query", move || self.get_pokemon_species(id_or_name))
            .await;
        let api = self.or_stale(&QueryKey::species(id_or_name), res)?;
        Ok(SpeciesInfo::from_api(&api))
    }

    pub async fn fetch_favorites(&self, favorites: &BTreeSet<u32>) -> Result<Vec<PokemonDetail>, ApiError> {
        let ids: Vec<u32> = favorites.iter().copied().collect();
        let ids = ids.as_slice();
        let details = self
            .query_retry
            .run("favorites query", move || self.get_pokemon_by_ids(ids))
            .await?;
        Ok(details
            .iter()
            .map(|d| PokemonDetail::from_api(d, true))
            .collect())
    }
}

fn checked_key(id_or_name: &str) -> Result<String, ApiError> {
    let key = id_or_name.trim().to_lowercase();
    if is_resource_key(&key) {
        Ok(key)
    } else {
        debug!(key = %key, "not a resource key, skipping request");
        Err(ApiError::new(ErrorKind::NotFound).with_detail(format!("invalid id or name {:?}", key)))
    }
}

fn log_failure(url: &str, err: ApiError) -> ApiError {
    warn!(
        %url,
        kind = %err.kind,
        retryable = err.is_retryable(),
        detail = err.detail.as_deref().unwrap_or(""),
        "request failed"
    );
    err
}
