//! URL identifiers derived from titles.
//!
//! Titles written in Russian are transliterated to ASCII. Anything else keeps its
//! characters and only has whitespace runs turned into hyphens and lowercased.

use serde::{Deserialize, Serialize};
use std::fmt;
use whatlang::{Detector, Lang};

/// URL-safe identifier, unique within its collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Column width. A 100-character title transliterates to at most three letters per character.
    pub const MAX_LEN: usize = 300;

    pub fn from_title(title: &str) -> Result<Self, SlugError> { slugify(title) }

    /// Wraps a slug read back from storage or a request path without re-deriving it.
    pub fn from_stored(value: impl Into<String>) -> Self { Self(value.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SlugError { Empty, TooLong(usize) }
impl std::error::Error for SlugError {}
impl fmt::Display for SlugError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "title produces an empty slug"),
            Self::TooLong(len) => write!(f, "title produces a slug of {} characters, at most {} allowed", len, Slug::MAX_LEN),
        }
    }
}

pub fn slugify(title: &str) -> Result<Slug, SlugError> {
    let slug = if is_local_language(title) { transliterated(title) } else { hyphenated(title) };
    if slug.is_empty() { return Err(SlugError::Empty); }
    let len = slug.chars().count();
    if len > Slug::MAX_LEN { return Err(SlugError::TooLong(len)); }
    Ok(Slug(slug))
}

/// Only the script decides between the two candidates, so short Cyrillic titles
/// are never mistaken for a neighbouring language.
fn is_local_language(text: &str) -> bool {
    Detector::with_allowlist(vec![Lang::Rus, Lang::Eng]).detect_lang(text) == Some(Lang::Rus)
}

fn hyphenated(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("-").to_lowercase()
}

fn transliterated(title: &str) -> String {
    let mut ascii = String::with_capacity(title.len());
    for c in title.chars().flat_map(char::to_lowercase) {
        match cyrillic_to_latin(c) {
            Some(latin) => ascii.push_str(latin),
            None if c.is_ascii_alphanumeric() || c == '_' || c == '-' => ascii.push(c),
            None if c.is_whitespace() => ascii.push(' '),
            None => {}
        }
    }

    let mut slug = String::with_capacity(ascii.len());
    let mut pending_separator = false;
    for c in ascii.trim().chars() {
        if c == ' ' || c == '-' {
            pending_separator = true;
            continue;
        }
        if pending_separator && !slug.is_empty() { slug.push('-'); }
        pending_separator = false;
        slug.push(c);
    }
    slug
}

fn cyrillic_to_latin(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d",
        'е' => "e", 'ё' => "e", 'ж' => "zh", 'з' => "z", 'и' => "i",
        'й' => "j", 'к' => "k", 'л' => "l", 'м' => "m", 'н' => "n",
        'о' => "o", 'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t",
        'у' => "u", 'ф' => "f", 'х' => "h", 'ц' => "ts", 'ч' => "ch",
        'ш' => "sh", 'щ' => "sch", 'ъ' => "", 'ы' => "y", 'ь' => "",
        'э' => "e", 'ю' => "ju", 'я' => "ja",
        _ => return None,
    };
    Some(latin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latin_title_is_hyphenated() {
        assert_eq!(slugify("new Category").unwrap().as_str(), "new-category");
        assert_eq!(slugify("  Big   Red\tBox ").unwrap().as_str(), "big-red-box");
    }

    #[test]
    fn test_latin_title_keeps_punctuation() {
        assert_eq!(slugify("C++ Books").unwrap().as_str(), "c++-books");
    }

    #[test]
    fn test_russian_title_is_transliterated() {
        assert_eq!(slugify("Сматрфон").unwrap().as_str(), "smatrfon");
        assert_eq!(slugify("Мобильные телефоны").unwrap().as_str(), "mobilnye-telefony");
        assert_eq!(slugify("Щётки, «ящики» и всё!").unwrap().as_str(), "schetki-jaschiki-i-vse");
    }

    #[test]
    fn test_empty_title_is_rejected() {
        assert_eq!(slugify("   "), Err(SlugError::Empty));
    }

    #[test]
    fn test_longest_title_fits_the_slug_column() {
        assert_eq!(slugify(&"щ".repeat(100)).unwrap().as_str().len(), Slug::MAX_LEN);
        assert_eq!(slugify(&"щ".repeat(101)), Err(SlugError::TooLong(303)));
    }
}
