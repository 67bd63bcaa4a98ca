//! Projection of raw API documents into flat records.
//!
//! The submodules hold one function per field, each returning a
//! [`FieldResult`]. The `extract_*` functions here compose them into
//! records, degrading every failed field to its default and logging the
//! cause at debug level.

pub mod claims;
pub mod commons;
pub mod json;
pub mod labels;
pub mod wikitext;

use serde_json::Value;
use tracing::debug;

use crate::error::FieldResult;
use crate::models::{CommonsFile, WikidataEntry, WikidataLocalizedEntry};

/// Unwrap a field result, falling back to the default on error.
pub fn or_default<T: Default>(key: &str, field: &str, result: FieldResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!(key, field, error = %e, "field degraded to default");
            T::default()
        }
    }
}

/// Build a [`WikidataEntry`] from a `wbgetentities` entity document.
///
/// Person fields (grave category, dates, sex or gender, occupations) are
/// only read for humans; everything else only gets a burial plot from its
/// own claims. `grave_of_wikidata` is only read for tombs.
pub fn extract_entry(code: &str, entity: &Value, accepted_burials: &[String]) -> WikidataEntry {
    let mut entry = WikidataEntry::new(code);
    entry.instance_of = or_default(code, "instance_of", claims::instance_of(entity));
    entry.wikimedia_commons_category = or_default(
        code,
        "wikimedia_commons_category",
        claims::commons_category(entity),
    );

    if entry.is_human() {
        entry.wikimedia_commons_grave_category = or_default(
            code,
            "wikimedia_commons_grave_category",
            claims::grave_category(entity, accepted_burials),
        );
        entry.burial_plot_reference = or_default(
            code,
            "burial_plot_reference",
            claims::person_burial_plot(entity, accepted_burials),
        );
        if let Some((date, accuracy)) = or_default(
            code,
            "date_of_birth",
            claims::date(entity, claims::DATE_OF_BIRTH).map(Some),
        ) {
            entry.date_of_birth = Some(date);
            entry.date_of_birth_accuracy = Some(accuracy);
        }
        if let Some((date, accuracy)) = or_default(
            code,
            "date_of_death",
            claims::date(entity, claims::DATE_OF_DEATH).map(Some),
        ) {
            entry.date_of_death = Some(date);
            entry.date_of_death_accuracy = Some(accuracy);
        }
        entry.sex_or_gender = or_default(code, "sex_or_gender", claims::sex_or_gender(entity));
        entry.occupations = or_default(code, "occupations", claims::occupations(entity));
    } else {
        entry.burial_plot_reference =
            or_default(code, "burial_plot_reference", claims::burial_plot(entity));
    }

    if entry.is_tomb() {
        entry.grave_of_wikidata = or_default(code, "grave_of_wikidata", claims::grave_of(entity));
    }
    entry
}

/// Build the per-language labels of an entity.
pub fn extract_localized(code: &str, entity: &Value, language: &str) -> WikidataLocalizedEntry {
    let mut localized = WikidataLocalizedEntry::new(code, language);
    localized.name = or_default(code, "name", claims::label(entity, language));
    localized.wikipedia = or_default(code, "wikipedia", claims::sitelink(entity, language));
    localized.description = or_default(code, "description", claims::description(entity, language));
    localized
}

/// Build a [`CommonsFile`] from a `prop=imageinfo` page.
pub fn extract_file(title: &str, page: &Value) -> CommonsFile {
    let mut file = CommonsFile::new(title);
    file.original_url = or_default(title, "original_url", commons::original_url(page));
    file.thumbnail_url = or_default(title, "thumbnail_url", commons::thumbnail_url(page));
    file
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateAccuracy;
    use chrono::NaiveDate;
    use serde_json::json;

    fn item(id: i64) -> Value {
        json!({"snaktype": "value", "datavalue": {"value": {"numeric-id": id}}})
    }

    fn string(s: &str) -> Value {
        json!({"snaktype": "value", "datavalue": {"value": s}})
    }

    fn person() -> Value {
        json!({
            "labels": {"fr": {"value": "Jim Morrison"}},
            "sitelinks": {"enwiki": {"title": "Jim Morrison"}},
            "claims": {
                "P31": [{"mainsnak": item(5)}],
                "P21": [{"mainsnak": item(6581097)}],
                "P106": [{"mainsnak": item(177220)}, {"mainsnak": item(49757)}],
                "P373": [{"mainsnak": string("Jim Morrison")}],
                "P965": [{"mainsnak": string("ignored for people")}],
                "P119": [{"mainsnak": item(311), "qualifiers": {
                    "P965": [string("6")],
                    "P373": [string("Grave of Jim Morrison")],
                }}],
                "P569": [{"mainsnak": {"snaktype": "value", "datavalue": {"value":
                    {"time": "+1943-12-08T00:00:00Z", "precision": 11}}}}],
                "P570": [{"mainsnak": {"snaktype": "value", "datavalue": {"value":
                    {"time": "+1971-00-00T00:00:00Z", "precision": 7}}}}],
            }
        })
    }

    #[test]
    fn test_person_entry() {
        let entry = extract_entry("Q44301", &person(), &["Q311".to_string()]);
        assert_eq!(entry.instance_of, vec!["Q5"]);
        assert_eq!(entry.burial_plot_reference, "6");
        assert_eq!(entry.wikimedia_commons_grave_category, "Grave of Jim Morrison");
        assert_eq!(entry.date_of_birth, NaiveDate::from_ymd_opt(1943, 12, 8));
        assert_eq!(entry.date_of_birth_accuracy, Some(DateAccuracy::Day));
        assert_eq!(entry.date_of_death, None);
        assert_eq!(entry.date_of_death_accuracy, None);
        assert_eq!(entry.sex_or_gender.as_deref(), Some("Q6581097"));
        assert_eq!(entry.occupations, vec!["Q177220", "Q49757"]);
        assert!(entry.grave_of_wikidata.is_empty());
    }

    #[test]
    fn test_tomb_entry_has_no_person_fields() {
        let tomb = json!({"claims": {
            "P31": [{"mainsnak": item(173387), "qualifiers": {"P642": [item(44301)]}}],
            "P965": [{"mainsnak": string("89")}],
            "P106": [{"mainsnak": item(177220)}],
        }});
        let entry = extract_entry("Q1", &tomb, &["Q311".to_string()]);
        assert_eq!(entry.burial_plot_reference, "89");
        assert_eq!(entry.grave_of_wikidata, vec!["Q44301"]);
        assert!(entry.occupations.is_empty());
        assert_eq!(entry.sex_or_gender, None);
        assert_eq!(entry.date_of_birth, None);
    }

    #[test]
    fn test_empty_entity_degrades_to_defaults() {
        let entry = extract_entry("Q1", &json!({}), &[]);
        assert_eq!(entry, WikidataEntry::new("Q1"));
    }

    #[test]
    fn test_localized_entry() {
        let localized = extract_localized("Q44301", &person(), "en");
        assert_eq!(localized.name, "");
        assert_eq!(localized.wikipedia, "Jim Morrison");
        assert_eq!(localized.language, "en");
    }

    #[test]
    fn test_file_without_image_info() {
        let file = extract_file("File:A.jpg", &json!({"missing": ""}));
        assert_eq!(file.original_url, "");
        assert_eq!(file.thumbnail_url, "");
    }
}
