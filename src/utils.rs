//! Utility helpers used across the application (formatting, ids, image URLs).
//! Keep helpers small and well-documented for readability.

const SPRITES_BASE: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Highest national dex number the app treats as valid.
pub const MAX_POKEMON_ID: u32 = 1010;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageVariant {
    #[default]
    Default,
    Artwork,
}

/// Format a Pokémon `name` for display: only the first character is
/// upper-cased, the rest is left untouched.
///
/// Examples: `pikachu` -> `Pikachu`, `mr-mime` -> `Mr-mime`.
pub fn format_name(name: &str) -> String {
    let mut chs = name.chars();
    match chs.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chs.as_str(),
    }
}

/// Turn a dashed API identifier into words, each capitalised.
///
/// Examples: `solar-power` -> `Solar Power`, `overgrow` -> `Overgrow`.
pub fn format_words(name: &str) -> String {
    name.split('-')
        .map(format_name)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Height comes in decimetres.
pub fn format_height(decimetres: u32) -> String {
    format!("{:.1} m", decimetres as f64 / 10.0)
}

/// Weight comes in hectograms.
pub fn format_weight(hectograms: u32) -> String {
    format!("{:.1} kg", hectograms as f64 / 10.0)
}

/// Pull the numeric id out of a resource URL such as
/// `https://pokeapi.co/api/v2/pokemon/25/`. Malformed URLs yield 0.
/// Every `/pokemon/` occurrence is tried, so the first one followed by
/// `{digits}/` wins.
pub fn extract_pokemon_id(url: &str) -> u32 {
    const MARKER: &str = "/pokemon/";
    url.match_indices(MARKER)
        .find_map(|(pos, _)| {
            let rest = &url[pos + MARKER.len()..];
            let digits = &rest[..rest.find('/')?];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse().ok()
        })
        .unwrap_or(0)
}

/// Whether `key` can name a PokeAPI resource: lowercase letters, digits
/// and dashes only.
pub fn is_resource_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

pub fn pokemon_image_url(id: u32, variant: ImageVariant) -> String {
    match variant {
        ImageVariant::Default => format!("{}/{}.png", SPRITES_BASE, id),
        ImageVariant::Artwork => format!("{}/other/official-artwork/{}.png", SPRITES_BASE, id),
    }
}

pub fn is_valid_pokemon_id(id: u32) -> bool {
    id > 0 && id <= MAX_POKEMON_ID
}

pub fn stat_display_name(stat: &str) -> String {
    match stat.to_lowercase().as_str() {
        "hp" => "HP".to_string(),
        "attack" => "Attack".to_string(),
        "defense" => "Defense".to_string(),
        "special-attack" => "Sp. Atk".to_string(),
        "special-defense" => "Sp. Def".to_string(),
        "speed" => "Speed".to_string(),
        _ => stat.to_string(),
    }
}

/// Upper bound used to scale stat bars.
pub fn stat_max_value(stat: &str) -> u32 {
    match stat.to_lowercase().as_str() {
        "hp" => 255,
        "attack" => 190,
        "defense" => 230,
        "special-attack" => 194,
        "special-defense" => 230,
        "speed" => 180,
        _ => 255,
    }
}

/// Badge colour for a type name.
pub fn type_color(type_name: &str) -> (u8, u8, u8) {
    match type_name.to_lowercase().as_str() {
        "normal" => (168, 168, 120),
        "fire" => (240, 128, 48),
        "water" => (104, 144, 240),
        "grass" => (120, 200, 80),
        "electric" => (248, 208, 48),
        "ice" => (152, 216, 216),
        "fighting" => (192, 48, 40),
        "poison" => (160, 64, 160),
        "ground" => (224, 192, 104),
        "flying" => (168, 144, 240),
        "psychic" => (248, 88, 136),
        "bug" => (168, 184, 32),
        "rock" => (184, 160, 56),
        "ghost" => (112, 88, 152),
        "dragon" => (112, 56, 248),
        "dark" => (112, 88, 72),
        "steel" => (184, 184, 208),
        "fairy" => (238, 153, 172),
        _ => (104, 160, 144),
    }
}

pub fn text_to_lines(s: &str, width: usize) -> Vec<String> {
    // Wrap text into lines no longer than `width` (simple greedy algorithm).
    let mut lines = vec![];
    let mut current = String::new();
    for word in s.split_whitespace() {
        if current.len() + word.len() + 1 > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
