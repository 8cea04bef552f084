use std::collections::HashMap;
use std::sync::LazyLock;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Explicit char-to-ASCII mappings for the Western/Northern European letters
/// that either do not decompose (ø, æ, ł) or decompose to something other
/// than the letter people type in searches.
static ASCII_MAPPINGS: LazyLock<HashMap<char, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ('ø', "o"),
        ('Ø', "O"),
        ('æ', "ae"),
        ('Æ', "AE"),
        ('œ', "oe"),
        ('Œ', "OE"),
        ('å', "a"),
        ('Å', "A"),
        ('ü', "u"),
        ('Ü', "U"),
        ('ö', "o"),
        ('Ö', "O"),
        ('ä', "a"),
        ('Ä', "A"),
        ('ñ', "n"),
        ('Ñ', "N"),
        ('ç', "c"),
        ('Ç', "C"),
        ('ł', "l"),
        ('Ł', "L"),
        ('ß', "ss"),
        ('é', "e"),
        ('É', "E"),
        ('è', "e"),
        ('È', "E"),
        ('ê', "e"),
        ('Ê', "E"),
        ('ë', "e"),
        ('Ë', "E"),
        ('á', "a"),
        ('Á', "A"),
        ('à', "a"),
        ('À', "A"),
        ('â', "a"),
        ('Â', "A"),
        ('ã', "a"),
        ('Ã', "A"),
        ('í', "i"),
        ('Í', "I"),
        ('ì', "i"),
        ('Ì', "I"),
        ('î', "i"),
        ('Î', "I"),
        ('ï', "i"),
        ('Ï', "I"),
        ('ó', "o"),
        ('Ó', "O"),
        ('ò', "o"),
        ('Ò', "O"),
        ('ô', "o"),
        ('Ô', "O"),
        ('õ', "o"),
        ('Õ', "O"),
        ('ú', "u"),
        ('Ú', "U"),
        ('ù', "u"),
        ('Ù', "U"),
        ('û', "u"),
        ('Û', "U"),
        ('ý', "y"),
        ('Ý', "Y"),
        ('ÿ', "y"),
        ('Ÿ', "Y"),
    ])
});

/// Convert Unicode text to its closest ASCII rendition.
///
/// Mapped characters come first; plain ASCII passes through; everything else
/// is NFD-decomposed and the first non-combining ASCII component is kept.
/// Characters with no ASCII rendition are dropped. Case and whitespace are
/// left alone, that is [`normalize`]'s job.
pub fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if let Some(mapped) = ASCII_MAPPINGS.get(&c) {
            out.push_str(mapped);
        } else if c.is_ascii() {
            out.push(c);
        } else if let Some(base) = c.nfd().find(|&d| !is_combining_mark(d) && d.is_ascii()) {
            out.push(base);
        }
    }
    out
}

/// Canonical comparison form: transliterated, lowercased, alphanumeric words
/// separated by single spaces. Idempotent, so queries and filenames can be
/// normalized independently and still compare symmetrically.
pub fn normalize(input: &str) -> String {
    let ascii = transliterate(input).to_lowercase();
    let spaced: String = ascii
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build the soulseek search query for a track: all artist names in playlist
/// order, then the title, normalized as one string.
pub fn build_search_query<'a, I>(title: &str, artists: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parts: Vec<&str> = artists.into_iter().collect();
    parts.push(title);
    normalize(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterate_maps_diacritics_preserving_case() {
        assert_eq!(transliterate("Rødhåd"), "Rodhad");
        assert_eq!(transliterate("Ølstykke ÆØÅ"), "Olstykke AEOA");
        assert_eq!(transliterate("Motörhead"), "Motorhead");
    }

    #[test]
    fn transliterate_decomposes_unmapped_characters() {
        // ż is not in the explicit table but decomposes to z + combining dot
        assert_eq!(transliterate("ż"), "z");
        assert_eq!(transliterate("Señorita café"), "Senorita cafe");
    }

    #[test]
    fn transliterate_drops_characters_with_no_ascii_rendition() {
        assert_eq!(transliterate("日本語"), "");
        assert_eq!(transliterate("a→b"), "ab");
    }

    #[test]
    fn normalize_folds_case_and_diacritics() {
        assert_eq!(normalize("Rødhåd"), "rodhad");
        assert_eq!(
            normalize("Błażej Malinowski"),
            normalize("Blazej Malinowski")
        );
    }

    #[test]
    fn normalize_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(
            normalize("Alastor, Jerome Isma-Ae - Timelapse (Extended Remix)"),
            "alastor jerome isma ae timelapse extended remix"
        );
        assert_eq!(normalize("  spaced \t out  "), "spaced out");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "",
            "  spaced   out  ",
            "Błażej Malinowski",
            "MiXeD CaSe 123",
            "日本語タイトル",
            "Rødhåd - Kinder der Ringwelt (Original Mix).mp3",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn search_query_joins_artists_then_title() {
        let query = build_search_query("Timelapse", ["Alastor", "Jerome Isma-Ae"]);
        assert_eq!(query, "alastor jerome isma ae timelapse");
    }

    #[test]
    fn search_query_without_artists_degrades_to_title() {
        assert_eq!(build_search_query("Devine", std::iter::empty()), "devine");
    }
}
