//! Title tag parsing.
//!
//! A tag is a marker character followed by an alphanumeric code, optionally
//! followed by the subcategory separator and a subcategory code:
//! `@ADV Client Call`, `Review @MKT/social`.
//!
//! Matching rules:
//! - the marker must open the title or follow a non-alphanumeric character,
//!   so addresses like `bob@acme.com` are not tags;
//! - matching is case-insensitive and codes are upper-cased, so `@adv` and
//!   `@ADV` share a category; subcategories keep their spelling;
//! - when a title holds several tags, the leftmost one wins.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, TagPattern};

/// Category parsed from an event title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category {
    /// Upper-cased category code, e.g. `ADV`.
    pub code: String,
    /// Subcategory code as written, e.g. `social`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subcategory {
            Some(sub) => write!(f, "{}/{sub}", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Compiled tag matcher.
#[derive(Debug, Clone)]
pub struct Categorizer {
    tag: TagPattern,
    re: Regex,
}

impl Categorizer {
    /// Compiles the matcher for a tag pattern.
    pub fn new(tag: TagPattern) -> Result<Self, ConfigError> {
        let pattern = format!(
            r"(?:^|[^A-Za-z0-9])({marker}([A-Za-z0-9]+)(?:{separator}([A-Za-z0-9_-]+))?)",
            marker = regex::escape(&tag.marker.to_string()),
            separator = regex::escape(&tag.separator.to_string()),
        );
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|_| ConfigError::InvalidTagCharacter(tag.marker))?;
        Ok(Self { tag, re })
    }

    /// The tag pattern this matcher was built from.
    pub const fn tag(&self) -> TagPattern {
        self.tag
    }

    /// Returns the category of the leftmost tag in `title`, if any.
    pub fn categorize(&self, title: &str) -> Option<Category> {
        let caps = self.re.captures(title)?;
        let code = caps.get(2)?.as_str().to_ascii_uppercase();
        let subcategory = caps.get(3).map(|m| m.as_str().to_string());
        Some(Category { code, subcategory })
    }

    /// Returns the title with its leftmost tag removed.
    ///
    /// `"@ADV Client Call"` becomes `"Client Call"`. Titles without a tag are
    /// returned trimmed.
    pub fn strip_tag(&self, title: &str) -> String {
        let Some(tag) = self.re.captures(title).and_then(|caps| caps.get(1)) else {
            return title.trim().to_string();
        };
        let before = title[..tag.start()].trim_end();
        let after = title[tag.end()..].trim_start_matches(|c: char| {
            c.is_whitespace() || matches!(c, '_' | '-' | ':')
        });
        match (before.is_empty(), after.is_empty()) {
            (true, _) => after.trim_end().to_string(),
            (false, true) => before.to_string(),
            (false, false) => format!("{before} {}", after.trim_end()),
        }
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        // Default marker and separator are plain punctuation, so compilation cannot fail.
        Self::new(TagPattern::default()).expect("default tag pattern compiles")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(code: &str, sub: Option<&str>) -> Option<Category> {
        Some(Category {
            code: code.to_string(),
            subcategory: sub.map(str::to_string),
        })
    }

    #[test]
    fn tag_without_subcategory() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.categorize("@ADV Client Call"), cat("ADV", None));
    }

    #[test]
    fn tag_with_subcategory() {
        let categorizer = Categorizer::default();
        assert_eq!(
            categorizer.categorize("@MKT/social Review"),
            cat("MKT", Some("social"))
        );
    }

    #[test]
    fn first_tag_wins() {
        let categorizer = Categorizer::default();
        assert_eq!(
            categorizer.categorize("Sync @OPS/infra then @ADV/client"),
            cat("OPS", Some("infra"))
        );
        assert_eq!(
            categorizer.categorize("@ADV @MKT double tagged"),
            cat("ADV", None)
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.categorize("@adv lunch"), cat("ADV", None));
        assert_eq!(categorizer.categorize("@Mkt/Social"), cat("MKT", Some("Social")));
    }

    #[test]
    fn untagged_titles() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.categorize("Dentist"), None);
        assert_eq!(categorizer.categorize(""), None);
        assert_eq!(categorizer.categorize("mail bob@acme.com"), None);
        assert_eq!(categorizer.categorize("@ alone"), None);
    }

    #[test]
    fn tag_after_punctuation_counts() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.categorize("(@OPS) rollout"), cat("OPS", None));
        assert_eq!(categorizer.categorize("@@ADV weird"), cat("ADV", None));
    }

    #[test]
    fn custom_marker_and_separator() {
        let categorizer = Categorizer::new(TagPattern::new('#', ':').unwrap()).unwrap();
        assert_eq!(categorizer.categorize("#dev:api pairing"), cat("DEV", Some("api")));
        assert_eq!(categorizer.categorize("@DEV pairing"), None);
    }

    #[test]
    fn strip_tag_leaves_remaining_title() {
        let categorizer = Categorizer::default();
        assert_eq!(categorizer.strip_tag("@ADV Client Call"), "Client Call");
        assert_eq!(categorizer.strip_tag("@ADV_Client Call"), "Client Call");
        assert_eq!(categorizer.strip_tag("Weekly @OPS/infra sync"), "Weekly sync");
        assert_eq!(categorizer.strip_tag("Review @MKT"), "Review");
        assert_eq!(categorizer.strip_tag("  Dentist "), "Dentist");
        assert_eq!(categorizer.strip_tag("@ADV"), "");
    }

    #[test]
    fn category_display() {
        assert_eq!(cat("MKT", Some("social")).unwrap().to_string(), "MKT/social");
        assert_eq!(cat("ADV", None).unwrap().to_string(), "ADV");
    }
}
