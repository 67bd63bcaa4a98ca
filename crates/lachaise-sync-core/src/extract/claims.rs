//! Field rules over knowledge-graph entity documents.
//!
//! An entity document, as returned by `wbgetentities`, looks like:
//!
//! ```json
//! {
//!   "labels": {"fr": {"value": "Jim Morrison"}},
//!   "descriptions": {"fr": {"value": "chanteur américain"}},
//!   "sitelinks": {"frwiki": {"title": "Jim Morrison"}},
//!   "claims": {
//!     "P31": [{"mainsnak": {"snaktype": "value",
//!              "datavalue": {"value": {"numeric-id": 5}}}}],
//!     "P119": [{"mainsnak": {...}, "qualifiers": {"P965": [{...}]}}]
//!   }
//! }
//! ```

use chrono::NaiveDate;
use serde_json::Value;

use crate::error::{FieldError, FieldResult};
use crate::models::{DateAccuracy, TOMB};
use crate::path;

use super::json::{array_at, at, i64_at, str_at};

pub const INSTANCE_OF: &str = "P31";
pub const SEX_OR_GENDER: &str = "P21";
pub const OCCUPATION: &str = "P106";
pub const COMMONS_CATEGORY: &str = "P373";
pub const PLACE_OF_BURIAL: &str = "P119";
pub const BURIAL_PLOT_REFERENCE: &str = "P965";
pub const DATE_OF_BIRTH: &str = "P569";
pub const DATE_OF_DEATH: &str = "P570";
pub const OF: &str = "P642";

const LEFT_TO_RIGHT_MARK: char = '\u{200E}';

fn claims<'v>(entity: &'v Value, property: &str) -> FieldResult<&'v Vec<Value>> {
    array_at(entity, path!["claims", property])
}

fn is_value_snak(snak: &Value) -> bool {
    snak.get("snaktype")
        .and_then(Value::as_str)
        .map_or(true, |t| t == "value")
}

/// `Q{numeric-id}` of an item-valued snak.
fn snak_item_id(snak: &Value) -> FieldResult<String> {
    i64_at(snak, path!["datavalue", "value", "numeric-id"]).map(|n| format!("Q{n}"))
}

fn snak_string(snak: &Value) -> FieldResult<String> {
    str_at(snak, path!["datavalue", "value"]).map(str::to_string)
}

/// Item ids of every value snak of `property`, in claim order.
pub fn item_ids(entity: &Value, property: &str) -> FieldResult<Vec<String>> {
    let mut ids = Vec::new();
    for claim in claims(entity, property)? {
        let snak = at(claim, path!["mainsnak"])?;
        if is_value_snak(snak) {
            ids.push(snak_item_id(snak)?);
        }
    }
    Ok(ids)
}

pub fn instance_of(entity: &Value) -> FieldResult<Vec<String>> {
    item_ids(entity, INSTANCE_OF)
}

pub fn occupations(entity: &Value) -> FieldResult<Vec<String>> {
    item_ids(entity, OCCUPATION)
}

/// The single `P21` value; several claims are ambiguous and yield `None`.
pub fn sex_or_gender(entity: &Value) -> FieldResult<Option<String>> {
    let claims = claims(entity, SEX_OR_GENDER)?;
    if claims.len() != 1 {
        return Ok(None);
    }
    snak_item_id(at(&claims[0], path!["mainsnak"])?).map(Some)
}

pub fn commons_category(entity: &Value) -> FieldResult<String> {
    let value = str_at(
        entity,
        path!["claims", COMMONS_CATEGORY, 0, "mainsnak", "datavalue", "value"],
    )?;
    Ok(value.replace(LEFT_TO_RIGHT_MARK, ""))
}

/// First `P119` claim whose location is one of `accepted`.
fn accepted_burial<'v>(entity: &'v Value, accepted: &[String]) -> FieldResult<&'v Value> {
    for claim in claims(entity, PLACE_OF_BURIAL)? {
        let snak = at(claim, path!["mainsnak"])?;
        if !is_value_snak(snak) {
            continue;
        }
        let location = snak_item_id(snak)?;
        if accepted.iter().any(|a| *a == location) {
            return Ok(claim);
        }
    }
    Err(FieldError::NoMatch(format!("claims.{PLACE_OF_BURIAL}")))
}

/// Grave category of a person, from the accepted burial claim's `P373`.
pub fn grave_category(entity: &Value, accepted: &[String]) -> FieldResult<String> {
    let claim = accepted_burial(entity, accepted)?;
    let qualifier = at(claim, path!["qualifiers", COMMONS_CATEGORY, 0])?;
    Ok(snak_string(qualifier)?.replace(LEFT_TO_RIGHT_MARK, ""))
}

/// Burial plot of a person, from the accepted burial claim's `P965`.
pub fn person_burial_plot(entity: &Value, accepted: &[String]) -> FieldResult<String> {
    let claim = accepted_burial(entity, accepted)?;
    snak_string(at(claim, path!["qualifiers", BURIAL_PLOT_REFERENCE, 0])?)
}

/// Burial plot of anything else, from its own `P965`.
pub fn burial_plot(entity: &Value) -> FieldResult<String> {
    snak_string(at(
        entity,
        path!["claims", BURIAL_PLOT_REFERENCE, 0, "mainsnak"],
    )?)
}

/// First value of a time property with its precision.
pub fn date(entity: &Value, property: &str) -> FieldResult<(NaiveDate, DateAccuracy)> {
    let value = at(
        entity,
        path!["claims", property, 0, "mainsnak", "datavalue", "value"],
    )?;
    let precision = i64_at(value, path!["precision"])?;
    let accuracy =
        DateAccuracy::from_precision(precision).ok_or(FieldError::UnsupportedPrecision(precision))?;
    let time = str_at(value, path!["time"])?;
    Ok((parse_time(time, accuracy)?, accuracy))
}

/// Parse a Wikibase time string such as `+1809-02-00T00:00:00Z`.
///
/// Month and day are `00` when the precision does not cover them; they are
/// read as 1.
pub fn parse_time(time: &str, accuracy: DateAccuracy) -> FieldResult<NaiveDate> {
    let invalid = || FieldError::InvalidDate(time.to_string());

    let (negative, rest) = match time.as_bytes().first() {
        Some(b'-') => (true, &time[1..]),
        Some(b'+') => (false, &time[1..]),
        _ => (false, time),
    };
    let date_part = rest.split('T').next().ok_or_else(invalid)?;
    let mut parts = date_part.splitn(3, '-');
    let year: i32 = parts.next().and_then(|y| y.parse().ok()).ok_or_else(invalid)?;
    let mut month: u32 = parts.next().and_then(|m| m.parse().ok()).ok_or_else(invalid)?;
    let mut day: u32 = parts.next().and_then(|d| d.parse().ok()).ok_or_else(invalid)?;

    if accuracy != DateAccuracy::Day {
        month = month.max(1);
        day = day.max(1);
    }
    let year = if negative { -year } else { year };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Entries a tomb is the grave of: the `P642` qualifiers of its tomb claim.
pub fn grave_of(entity: &Value) -> FieldResult<Vec<String>> {
    for claim in claims(entity, INSTANCE_OF)? {
        let snak = at(claim, path!["mainsnak"])?;
        if !is_value_snak(snak) || snak_item_id(snak)? != TOMB {
            continue;
        }
        let mut ids = Vec::new();
        for qualifier in array_at(claim, path!["qualifiers", OF])? {
            if is_value_snak(qualifier) {
                ids.push(snak_item_id(qualifier)?);
            }
        }
        return Ok(ids);
    }
    Ok(Vec::new())
}

pub fn label(entity: &Value, language: &str) -> FieldResult<String> {
    str_at(entity, path!["labels", language, "value"]).map(str::to_string)
}

pub fn description(entity: &Value, language: &str) -> FieldResult<String> {
    str_at(entity, path!["descriptions", language, "value"]).map(str::to_string)
}

/// Title of the `<language>wiki` sitelink.
pub fn sitelink(entity: &Value, language: &str) -> FieldResult<String> {
    let site = format!("{language}wiki");
    str_at(entity, path!["sitelinks", site.as_str(), "title"]).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: i64) -> Value {
        json!({"snaktype": "value", "datavalue": {"value": {"numeric-id": id}}})
    }

    fn string(s: &str) -> Value {
        json!({"snaktype": "value", "datavalue": {"value": s}})
    }

    fn time(t: &str, precision: i64) -> Value {
        json!({"snaktype": "value",
               "datavalue": {"value": {"time": t, "precision": precision}}})
    }

    #[test]
    fn test_instance_of_skips_non_value_snaks() {
        let entity = json!({"claims": {"P31": [
            {"mainsnak": item(5)},
            {"mainsnak": {"snaktype": "somevalue"}},
            {"mainsnak": item(173387)},
        ]}});
        assert_eq!(instance_of(&entity).unwrap(), vec!["Q5", "Q173387"]);
    }

    #[test]
    fn test_missing_property_is_an_error() {
        let entity = json!({"claims": {}});
        assert!(matches!(occupations(&entity), Err(FieldError::Missing(_))));
    }

    #[test]
    fn test_sex_or_gender_requires_exactly_one_claim() {
        let one = json!({"claims": {"P21": [{"mainsnak": item(6581072)}]}});
        assert_eq!(sex_or_gender(&one).unwrap(), Some("Q6581072".into()));

        let two = json!({"claims": {"P21": [{"mainsnak": item(1)}, {"mainsnak": item(2)}]}});
        assert_eq!(sex_or_gender(&two).unwrap(), None);
    }

    #[test]
    fn test_commons_category_strips_direction_mark() {
        let entity = json!({"claims": {"P373": [{"mainsnak": string("Jim Morrison\u{200E}")}]}});
        assert_eq!(commons_category(&entity).unwrap(), "Jim Morrison");
    }

    #[test]
    fn test_person_burial_fields_use_accepted_location() {
        let entity = json!({"claims": {"P119": [
            {"mainsnak": item(1), "qualifiers": {"P965": [string("wrong")]}},
            {"mainsnak": item(311), "qualifiers": {
                "P965": [string("6")],
                "P373": [string("Grave of Jim Morrison")],
            }},
        ]}});
        let accepted = vec!["Q311".to_string()];
        assert_eq!(person_burial_plot(&entity, &accepted).unwrap(), "6");
        assert_eq!(
            grave_category(&entity, &accepted).unwrap(),
            "Grave of Jim Morrison"
        );
        assert!(matches!(
            person_burial_plot(&entity, &["Q2".to_string()]),
            Err(FieldError::NoMatch(_))
        ));
    }

    #[test]
    fn test_burial_plot_of_non_person() {
        let entity = json!({"claims": {"P965": [{"mainsnak": string("89")}]}});
        assert_eq!(burial_plot(&entity).unwrap(), "89");
    }

    #[test]
    fn test_date_precisions() {
        let day = json!({"claims": {"P569": [{"mainsnak": time("+1943-12-08T00:00:00Z", 11)}]}});
        assert_eq!(
            date(&day, DATE_OF_BIRTH).unwrap(),
            (NaiveDate::from_ymd_opt(1943, 12, 8).unwrap(), DateAccuracy::Day)
        );

        let year = json!({"claims": {"P570": [{"mainsnak": time("+1871-00-00T00:00:00Z", 9)}]}});
        assert_eq!(
            date(&year, DATE_OF_DEATH).unwrap(),
            (NaiveDate::from_ymd_opt(1871, 1, 1).unwrap(), DateAccuracy::Year)
        );

        let month = json!({"claims": {"P570": [{"mainsnak": time("+1871-05-00T00:00:00Z", 10)}]}});
        assert_eq!(
            date(&month, DATE_OF_DEATH).unwrap(),
            (NaiveDate::from_ymd_opt(1871, 5, 1).unwrap(), DateAccuracy::Month)
        );
    }

    #[test]
    fn test_date_rejects_other_precisions() {
        let decade = json!({"claims": {"P569": [{"mainsnak": time("+1870-00-00T00:00:00Z", 8)}]}});
        assert_eq!(
            date(&decade, DATE_OF_BIRTH),
            Err(FieldError::UnsupportedPrecision(8))
        );
    }

    #[test]
    fn test_parse_negative_year() {
        let date = parse_time("-0044-03-15T00:00:00Z", DateAccuracy::Day).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(-44, 3, 15).unwrap());
    }

    #[test]
    fn test_day_precision_with_zero_day_is_invalid() {
        assert!(matches!(
            parse_time("+1900-01-00T00:00:00Z", DateAccuracy::Day),
            Err(FieldError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_grave_of_reads_tomb_qualifiers() {
        let entity = json!({"claims": {"P31": [
            {"mainsnak": item(5)},
            {"mainsnak": item(173387), "qualifiers": {"P642": [item(44), item(45)]}},
        ]}});
        assert_eq!(grave_of(&entity).unwrap(), vec!["Q44", "Q45"]);

        let not_a_tomb = json!({"claims": {"P31": [{"mainsnak": item(5)}]}});
        assert!(grave_of(&not_a_tomb).unwrap().is_empty());
    }

    #[test]
    fn test_localized_fields() {
        let entity = json!({
            "labels": {"fr": {"value": "Jim Morrison"}},
            "descriptions": {"fr": {"value": "chanteur"}},
            "sitelinks": {"frwiki": {"title": "Jim Morrison (chanteur)"}},
        });
        assert_eq!(label(&entity, "fr").unwrap(), "Jim Morrison");
        assert_eq!(description(&entity, "fr").unwrap(), "chanteur");
        assert_eq!(sitelink(&entity, "fr").unwrap(), "Jim Morrison (chanteur)");
        assert!(label(&entity, "en").is_err());
    }
}
