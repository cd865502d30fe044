use crate::utils::{
    extract_pokemon_id, format_words, pokemon_image_url, stat_display_name, stat_max_value,
    type_color, ImageVariant,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ---- wire types (PokeAPI responses) ----

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ApiPokemonList {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<NamedResource>,
}

/// `{ name, url }` pair PokeAPI uses for every reference.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct NamedResource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiPokemonDetail {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub sprites: ApiSprites,
    #[serde(default)]
    pub types: Vec<ApiTypeSlot>,
    #[serde(default)]
    pub stats: Vec<ApiStatSlot>,
    #[serde(default)]
    pub abilities: Vec<ApiAbilitySlot>,
    #[serde(default)]
    pub species: NamedResource,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiSprites {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub front_shiny: Option<String>,
    #[serde(default)]
    pub back_default: Option<String>,
    #[serde(default)]
    pub back_shiny: Option<String>,
    #[serde(default)]
    pub other: ApiOtherSprites,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiOtherSprites {
    #[serde(default, rename = "official-artwork")]
    pub official_artwork: ApiArtwork,
    #[serde(default)]
    pub home: ApiArtwork,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiArtwork {
    #[serde(default)]
    pub front_default: Option<String>,
    #[serde(default)]
    pub front_shiny: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiTypeSlot {
    #[serde(default)]
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiStatSlot {
    pub base_stat: u32,
    #[serde(default)]
    pub effort: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiAbilitySlot {
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: u32,
    pub ability: NamedResource,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiPokemonSpecies {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub color: Option<NamedResource>,
    #[serde(default)]
    pub flavor_text_entries: Vec<ApiFlavorText>,
    #[serde(default)]
    pub genera: Vec<ApiGenus>,
    #[serde(default)]
    pub habitat: Option<NamedResource>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiFlavorText {
    pub flavor_text: String,
    pub language: NamedResource,
    #[serde(default)]
    pub version: Option<NamedResource>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiGenus {
    pub genus: String,
    pub language: NamedResource,
}

// ---- domain types ----

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    pub image_url: String,
    /// Empty for list items; filled in from detail responses.
    pub types: Vec<PokemonType>,
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PokemonType {
    pub name: String,
    pub color: (u8, u8, u8),
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PokemonStat {
    pub name: String,
    pub display_name: String,
    pub value: u32,
    pub max_value: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PokemonAbility {
    pub name: String,
    pub display_name: String,
    pub is_hidden: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PokemonSprites {
    pub front_default: Option<String>,
    pub front_shiny: Option<String>,
    pub back_default: Option<String>,
    pub back_shiny: Option<String>,
    pub official_artwork: Option<String>,
    pub home_artwork: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PokemonDetail {
    pub id: u32,
    pub name: String,
    pub image_url: String,
    pub types: Vec<PokemonType>,
    pub is_favorite: bool,
    /// Decimetres.
    pub height: u32,
    /// Hectograms.
    pub weight: u32,
    pub base_experience: u32,
    pub stats: Vec<PokemonStat>,
    pub abilities: Vec<PokemonAbility>,
    pub sprites: PokemonSprites,
    pub species: NamedResource,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct SpeciesInfo {
    pub id: u32,
    pub name: String,
    pub color: Option<String>,
    pub genus: Option<String>,
    pub habitat: Option<String>,
    pub description: String,
}

pub const NO_DESCRIPTION: &str = "No description available.";

impl Pokemon {
    pub fn from_list_item(item: &NamedResource, favorites: &BTreeSet<u32>) -> Self {
        let id = extract_pokemon_id(&item.url);
        Self {
            id,
            name: item.name.clone(),
            image_url: pokemon_image_url(id, ImageVariant::Default),
            types: Vec::new(),
            is_favorite: favorites.contains(&id),
        }
    }
}

impl PokemonType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: type_color(name),
        }
    }
}

impl PokemonDetail {
    pub fn from_api(api: &ApiPokemonDetail, is_favorite: bool) -> Self {
        let sprites = PokemonSprites {
            front_default: api.sprites.front_default.clone(),
            front_shiny: api.sprites.front_shiny.clone(),
            back_default: api.sprites.back_default.clone(),
            back_shiny: api.sprites.back_shiny.clone(),
            official_artwork: api.sprites.other.official_artwork.front_default.clone(),
            home_artwork: api.sprites.other.home.front_default.clone(),
        };
        let image_url = sprites
            .official_artwork
            .clone()
            .or_else(|| sprites.front_default.clone())
            .unwrap_or_default();

        let mut type_slots: Vec<&ApiTypeSlot> = api.types.iter().collect();
        type_slots.sort_by_key(|t| t.slot);

        Self {
            id: api.id,
            name: api.name.clone(),
            image_url,
            types: type_slots
                .into_iter()
                .map(|t| PokemonType::new(&t.kind.name))
                .collect(),
            is_favorite,
            height: api.height,
            weight: api.weight,
            base_experience: api.base_experience.unwrap_or(0),
            stats: api
                .stats
                .iter()
                .map(|s| PokemonStat {
                    name: s.stat.name.clone(),
                    display_name: stat_display_name(&s.stat.name),
                    value: s.base_stat,
                    max_value: stat_max_value(&s.stat.name),
                })
                .collect(),
            abilities: api
                .abilities
                .iter()
                .map(|a| PokemonAbility {
                    name: a.ability.name.clone(),
                    display_name: format_words(&a.ability.name),
                    is_hidden: a.is_hidden,
                })
                .collect(),
            sprites,
            species: api.species.clone(),
        }
    }

    /// The list-item view of this detail.
    pub fn summary(&self) -> Pokemon {
        Pokemon {
            id: self.id,
            name: self.name.clone(),
            image_url: pokemon_image_url(self.id, ImageVariant::Default),
            types: self.types.clone(),
            is_favorite: self.is_favorite,
        }
    }
}

impl SpeciesInfo {
    pub fn from_api(api: &ApiPokemonSpecies) -> Self {
        let description = api
            .flavor_text_entries
            .iter()
            .find(|e| e.language.name == "en")
            .map(|e| e.flavor_text.replace(['\n', '\u{c}'], " "))
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        let genus = api
            .genera
            .iter()
            .find(|g| g.language.name == "en")
            .map(|g| g.genus.clone());
        Self {
            id: api.id,
            name: api.name.clone(),
            color: api.color.as_ref().map(|c| c.name.clone()),
            genus,
            habitat: api.habitat.as_ref().map(|h| h.name.clone()),
            description,
        }
    }
}

/// Set `is_favorite` on every item from the current favorites set.
pub fn apply_favorites(pokemon: &mut [Pokemon], favorites: &BTreeSet<u32>) {
    for p in pokemon.iter_mut() {
        p.is_favorite = favorites.contains(&p.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIKACHU: &str = r#"{
        "id": 25,
        "name": "pikachu",
        "height": 4,
        "weight": 60,
        "base_experience": 112,
        "sprites": {
            "front_default": "https://img/25.png",
            "front_shiny": null,
            "back_default": null,
            "back_shiny": null,
            "other": {
                "official-artwork": { "front_default": "https://img/art/25.png", "front_shiny": null },
                "home": { "front_default": null, "front_shiny": null }
            }
        },
        "types": [ { "slot": 1, "type": { "name": "electric", "url": "https://pokeapi.co/api/v2/type/13/" } } ],
        "stats": [
            { "base_stat": 35, "effort": 0, "stat": { "name": "hp", "url": "" } },
            { "base_stat": 90, "effort": 2, "stat": { "name": "speed", "url": "" } }
        ],
        "abilities": [
            { "is_hidden": false, "slot": 1, "ability": { "name": "static", "url": "" } },
            { "is_hidden": true, "slot": 3, "ability": { "name": "lightning-rod", "url": "" } }
        ],
        "species": { "name": "pikachu", "url": "https://pokeapi.co/api/v2/pokemon-species/25/" }
    }"#;

    #[test]
    fn detail_transform() {
        let api: ApiPokemonDetail = serde_json::from_str(PIKACHU).unwrap();
        let d = PokemonDetail::from_api(&api, true);
        assert_eq!(d.id, 25);
        assert_eq!(d.image_url, "https://img/art/25.png");
        assert_eq!(d.types, vec![PokemonType::new("electric")]);
        assert_eq!(d.stats[0].display_name, "HP");
        assert_eq!(d.stats[0].max_value, 255);
        assert_eq!(d.stats[1].max_value, 180);
        assert_eq!(d.abilities[1].display_name, "Lightning Rod");
        assert!(d.abilities[1].is_hidden);
        assert!(d.is_favorite);
        assert_eq!(d.summary().image_url, pokemon_image_url(25, ImageVariant::Default));
    }

    #[test]
    fn image_falls_back_to_front_default() {
        let mut api: ApiPokemonDetail = serde_json::from_str(PIKACHU).unwrap();
        api.sprites.other.official_artwork.front_default = None;
        assert_eq!(PokemonDetail::from_api(&api, false).image_url, "https://img/25.png");
        api.sprites.front_default = None;
        assert_eq!(PokemonDetail::from_api(&api, false).image_url, "");
    }

    #[test]
    fn list_item_transform_and_favorite_merge() {
        let favs: BTreeSet<u32> = [4].into_iter().collect();
        let item = NamedResource {
            name: "charmander".into(),
            url: "https://pokeapi.co/api/v2/pokemon/4/".into(),
        };
        let p = Pokemon::from_list_item(&item, &favs);
        assert_eq!(p.id, 4);
        assert!(p.is_favorite);
        assert!(p.types.is_empty());

        let mut list = vec![p];
        apply_favorites(&mut list, &BTreeSet::new());
        assert!(!list[0].is_favorite);
    }

    #[test]
    fn species_description_picks_english() {
        let api: ApiPokemonSpecies = serde_json::from_str(
            r#"{
                "id": 1, "name": "bulbasaur",
                "color": { "name": "green", "url": "" },
                "flavor_text_entries": [
                    { "flavor_text": "Une graine", "language": { "name": "fr", "url": "" } },
                    { "flavor_text": "A strange seed\nwas planted\u000con its back.", "language": { "name": "en", "url": "" } }
                ],
                "genera": [ { "genus": "Seed Pokémon", "language": { "name": "en", "url": "" } } ],
                "habitat": null
            }"#,
        )
        .unwrap();
        let s = SpeciesInfo::from_api(&api);
        assert_eq!(s.description, "A strange seed was planted on its back.");
        assert_eq!(s.genus.as_deref(), Some("Seed Pokémon"));
        assert_eq!(s.color.as_deref(), Some("green"));
        assert!(s.habitat.is_none());

        let empty = SpeciesInfo::from_api(&ApiPokemonSpecies::default());
        assert_eq!(empty.description, NO_DESCRIPTION);
    }
}
