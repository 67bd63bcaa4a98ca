//! Composite multi-language labels.

use serde_json::Value;

use super::claims::label;

/// Display name grouping the languages that share a label.
///
/// Groups are ordered by the first language, in `languages` order, that
/// carries their label: `(fr,en)Peintre; (de)Maler`. Languages without a
/// label are skipped; no label at all yields an empty string.
pub fn composite_name(entity: &Value, languages: &[String]) -> String {
    let mut groups: Vec<(String, Vec<&str>)> = Vec::new();
    for language in languages {
        let Ok(name) = label(entity, language) else {
            continue;
        };
        match groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, langs)) => langs.push(language.as_str()),
            None => groups.push((name, vec![language.as_str()])),
        }
    }
    groups
        .iter()
        .map(|(name, langs)| format!("({}){}", langs.join(","), name))
        .collect::<Vec<_>>()
        .join("; ")
}
