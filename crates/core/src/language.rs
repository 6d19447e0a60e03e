//! Language tags understood by the model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Language codes accepted by the model's language embedding.
///
/// Order matters: the index of a tag is the language id fed to the
/// conditioner graph.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "am", "an", "ar", "as", "az", "ba", "bg", "bn", "bpy", "bs", "ca", "cmn", "cs", "cy",
    "da", "de", "el", "en-029", "en-gb", "en-gb-scotland", "en-gb-x-gbclan", "en-gb-x-gbcwmd",
    "en-gb-x-rp", "en-us", "eo", "es", "es-419", "et", "eu", "fa", "fa-latn", "fi", "fr-be",
    "fr-ch", "fr-fr", "ga", "gd", "gn", "grc", "gu", "hak", "hi", "hr", "ht", "hu", "hy", "hyw",
    "ia", "id", "is", "it", "ja", "jbo", "ka", "kk", "kl", "kn", "ko", "kok", "ku", "ky", "la",
    "lfn", "lt", "lv", "mi", "mk", "ml", "mr", "ms", "mt", "my", "nb", "nci", "ne", "nl", "om",
    "or", "pa", "pap", "pl", "pt", "pt-br", "py", "quc", "ro", "ru", "ru-lv", "sd", "shn", "si",
    "sk", "sl", "sq", "sr", "sv", "sw", "ta", "te", "tn", "tr", "tt", "ur", "uz", "vi",
    "vi-vn-x-central", "vi-vn-x-south", "yue",
];

/// Lowercase language tag, e.g. `en-us`, `ru`, `ja`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    /// Parse and normalize a tag. Accepts `_` as a separator and any case.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");

        if normalized.is_empty() {
            return Err(Error::Validation("language tag is empty".to_string()));
        }

        let valid = normalized
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !normalized.starts_with('-')
            && !normalized.ends_with('-');

        if !valid {
            return Err(Error::Validation(format!("invalid language tag: '{}'", raw)));
        }

        Ok(Self(normalized))
    }

    /// The fallback tag used when nothing better is known
    pub fn english() -> Self {
        Self("en-us".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index of this tag in [`SUPPORTED_LANGUAGES`]
    pub fn model_id(&self) -> Option<usize> {
        SUPPORTED_LANGUAGES.iter().position(|l| *l == self.0)
    }

    pub fn is_supported(&self) -> bool {
        self.model_id().is_some()
    }

    /// Primary subtag (`en` for `en-us`)
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }
}

impl Default for LanguageTag {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LanguageTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LanguageTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(LanguageTag::parse(" EN_US ").unwrap().as_str(), "en-us");
        assert_eq!(LanguageTag::parse("ru").unwrap().as_str(), "ru");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(LanguageTag::parse("").is_err());
        assert!(LanguageTag::parse("   ").is_err());
        assert!(LanguageTag::parse("en us").is_err());
        assert!(LanguageTag::parse("-en").is_err());
        assert!(LanguageTag::parse("ру").is_err());
    }

    #[test]
    fn test_model_id() {
        assert_eq!(LanguageTag::english().model_id(), Some(24));
        assert!(LanguageTag::parse("ru").unwrap().is_supported());
        assert!(!LanguageTag::parse("xx-yy").unwrap().is_supported());
    }

    #[test]
    fn test_table_ends_at_cantonese() {
        assert_eq!(SUPPORTED_LANGUAGES.len(), 109);
        assert_eq!(LanguageTag::parse("yue").unwrap().model_id(), Some(108));
        assert!(!LanguageTag::parse("he").unwrap().is_supported());
        assert!(!LanguageTag::parse("th").unwrap().is_supported());
    }

    #[test]
    fn test_primary_subtag() {
        assert_eq!(LanguageTag::english().primary(), "en");
        assert_eq!(LanguageTag::parse("cmn").unwrap().primary(), "cmn");
    }
}
