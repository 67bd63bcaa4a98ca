//! Persisted entities produced by the synchronization runs.
//!
//! Every record carries `created_at` / `modified_at` unix timestamps. They
//! are maintained by [`reconcile`](crate::reconcile::reconcile) and are not
//! part of the field descriptors, so they never make a record look modified.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Knowledge-graph item marking a human.
pub const HUMAN: &str = "Q5";

/// Knowledge-graph item marking a tomb.
pub const TOMB: &str = "Q173387";

/// Precision of a knowledge-graph date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateAccuracy {
    Year,
    Month,
    Day,
}

impl DateAccuracy {
    /// Maps a Wikibase time precision code. Codes other than 9, 10 and 11
    /// have no counterpart.
    pub fn from_precision(code: i64) -> Option<Self> {
        match code {
            9 => Some(DateAccuracy::Year),
            10 => Some(DateAccuracy::Month),
            11 => Some(DateAccuracy::Day),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateAccuracy::Year => "year",
            DateAccuracy::Month => "month",
            DateAccuracy::Day => "day",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "year" => Some(DateAccuracy::Year),
            "month" => Some(DateAccuracy::Month),
            "day" => Some(DateAccuracy::Day),
            _ => None,
        }
    }
}

/// An element of the crowd-sourced map that links to the other sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenStreetMapElement {
    pub id: i64,
    #[serde(rename = "type")]
    pub element_type: String,
    pub name: String,
    #[serde(default)]
    pub sorting_name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub wikipedia: String,
    /// `;`-separated codes, each optionally prefixed (`name:Q123`).
    #[serde(default)]
    pub wikidata: String,
    #[serde(default)]
    pub wikimedia_commons: String,
    #[serde(default)]
    pub historic: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub modified_at: i64,
}

impl OpenStreetMapElement {
    /// Knowledge-graph codes referenced by the `wikidata` tag.
    pub fn wikidata_codes(&self) -> Vec<String> {
        self.wikidata
            .split(';')
            .filter_map(|link| link.rsplit(':').next())
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A normalized knowledge-graph item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WikidataEntry {
    pub wikidata_id: String,
    pub instance_of: Vec<String>,
    pub wikimedia_commons_category: String,
    pub wikimedia_commons_grave_category: String,
    pub burial_plot_reference: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_birth_accuracy: Option<DateAccuracy>,
    pub date_of_death: Option<NaiveDate>,
    pub date_of_death_accuracy: Option<DateAccuracy>,
    pub sex_or_gender: Option<String>,
    pub occupations: Vec<String>,
    pub grave_of_wikidata: Vec<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

impl WikidataEntry {
    pub fn new(wikidata_id: impl Into<String>) -> Self {
        Self {
            wikidata_id: wikidata_id.into(),
            ..Default::default()
        }
    }

    pub fn is_human(&self) -> bool {
        self.instance_of.iter().any(|q| q == HUMAN)
    }

    pub fn is_tomb(&self) -> bool {
        self.instance_of.iter().any(|q| q == TOMB)
    }
}

/// Per-language labels of a [`WikidataEntry`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WikidataLocalizedEntry {
    pub wikidata_id: String,
    pub language: String,
    pub name: String,
    /// Title of the encyclopedia page on `<language>.wikipedia.org`.
    pub wikipedia: String,
    pub description: String,
    pub created_at: i64,
    pub modified_at: i64,
}

impl WikidataLocalizedEntry {
    pub fn new(wikidata_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            wikidata_id: wikidata_id.into(),
            language: language.into(),
            ..Default::default()
        }
    }
}

/// A media-repository category (`Category:…`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommonsCategory {
    pub title: String,
    /// `File:…` title of the main image, empty when none is declared.
    pub main_image: String,
    pub category_members: Vec<String>,
    pub created_at: i64,
    pub modified_at: i64,
}

impl CommonsCategory {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// A media-repository file (`File:…`) with resolved URLs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommonsFile {
    pub title: String,
    pub original_url: String,
    pub thumbnail_url: String,
    pub created_at: i64,
    pub modified_at: i64,
}

impl CommonsFile {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Encyclopedia page of a localized entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WikipediaPage {
    pub wikidata_id: String,
    pub language: String,
    pub title: String,
    /// Lead-section HTML.
    pub intro: String,
    pub default_sort: String,
    pub created_at: i64,
    pub modified_at: i64,
}

impl WikipediaPage {
    pub fn new(wikidata_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            wikidata_id: wikidata_id.into(),
            language: language.into(),
            ..Default::default()
        }
    }
}

/// An occupation referenced by human entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WikidataOccupation {
    pub wikidata_id: String,
    /// Composite label, e.g. `(fr,en)Peintre; (de)Maler`.
    pub name: String,
    pub created_at: i64,
    pub modified_at: i64,
}

impl WikidataOccupation {
    pub fn new(wikidata_id: impl Into<String>) -> Self {
        Self {
            wikidata_id: wikidata_id.into(),
            ..Default::default()
        }
    }
}

/// Bookkeeping row for one kind of synchronization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Synchronization {
    pub name: String,
    pub last_executed: Option<i64>,
    pub created_objects: u64,
    pub modified_objects: u64,
    pub deleted_objects: u64,
    /// Joined warnings on success, error text on failure.
    pub errors: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_codes() {
        assert_eq!(DateAccuracy::from_precision(9), Some(DateAccuracy::Year));
        assert_eq!(DateAccuracy::from_precision(10), Some(DateAccuracy::Month));
        assert_eq!(DateAccuracy::from_precision(11), Some(DateAccuracy::Day));
        assert_eq!(DateAccuracy::from_precision(7), None);
        assert_eq!(DateAccuracy::from_precision(12), None);
    }

    #[test]
    fn test_osm_wikidata_codes_strip_prefixes() {
        let element = OpenStreetMapElement {
            id: 1,
            element_type: "node".into(),
            name: "Tombe".into(),
            sorting_name: String::new(),
            latitude: 48.86,
            longitude: 2.39,
            wikipedia: String::new(),
            wikidata: "Q1;buried:Q2; ;Q3".into(),
            wikimedia_commons: String::new(),
            historic: String::new(),
            created_at: 0,
            modified_at: 0,
        };
        assert_eq!(element.wikidata_codes(), vec!["Q1", "Q2", "Q3"]);
    }
}
