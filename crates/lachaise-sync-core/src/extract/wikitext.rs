//! Line-oriented pattern extraction from page wikitext.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{FieldError, FieldResult};
use crate::path;

use super::json::{array_at, str_at};

static DEFAULT_SORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{DEFAULTSORT:(.*)\}\}$").expect("valid pattern"));
static CLE_DE_TRI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{CLEDETRI:(.*)\}\}$").expect("valid pattern"));
static MAIN_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*[iI]mage.*=\s*(.*)\s*$").expect("valid pattern"));
static CATEGORY_REDIRECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\{\{Category redirect\|(.*)\}\}\s*$").expect("valid pattern")
});

/// Content of the single revision of a `prop=revisions` page.
///
/// Accepts both the legacy `revisions[0]["*"]` layout and the slot layout
/// (`revisions[0].slots.main`).
pub fn revision_text(page: &Value) -> FieldResult<&str> {
    let revisions = array_at(page, path!["revisions"])?;
    if revisions.len() != 1 {
        return Err(FieldError::Ambiguous {
            path: "revisions".into(),
            count: revisions.len(),
        });
    }
    let revision = &revisions[0];
    str_at(revision, path!["*"])
        .or_else(|_| str_at(revision, path!["slots", "main", "*"]))
        .or_else(|_| str_at(revision, path!["slots", "main", "content"]))
}

fn first_capture<'t>(wikitext: &'t str, patterns: &[&Regex]) -> Option<&'t str> {
    wikitext.lines().find_map(|line| {
        patterns
            .iter()
            .find_map(|re| re.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
    })
}

/// Sort key from the first `{{DEFAULTSORT:…}}` or `{{CLEDETRI:…}}` line.
pub fn default_sort(wikitext: &str) -> String {
    first_capture(wikitext, &[&*DEFAULT_SORT, &*CLE_DE_TRI])
        .unwrap_or_default()
        .to_string()
}

/// `File:` title from the first `…image… = X` line, empty when absent.
pub fn main_image(wikitext: &str) -> String {
    match first_capture(wikitext, &[&*MAIN_IMAGE]) {
        Some(image) if !image.is_empty() => format!("File:{image}"),
        _ => String::new(),
    }
}

/// Target of a `{{Category redirect|X}}` line, as a `Category:` title.
pub fn category_redirect(wikitext: &str) -> Option<String> {
    let target = first_capture(wikitext, &[&*CATEGORY_REDIRECT])?;
    if target.is_empty() {
        return None;
    }
    if target.starts_with("Category:") {
        Some(target.to_string())
    } else {
        Some(format!("Category:{target}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_revision_text_layouts() {
        let legacy = json!({"revisions": [{"*": "text"}]});
        assert_eq!(revision_text(&legacy).unwrap(), "text");

        let slots = json!({"revisions": [{"slots": {"main": {"content": "slot text"}}}]});
        assert_eq!(revision_text(&slots).unwrap(), "slot text");
    }

    #[test]
    fn test_revision_text_requires_one_revision() {
        let page = json!({"revisions": [{"*": "a"}, {"*": "b"}]});
        assert_eq!(
            revision_text(&page),
            Err(FieldError::Ambiguous {
                path: "revisions".into(),
                count: 2
            })
        );
    }

    #[test]
    fn test_default_sort_variants() {
        assert_eq!(
            default_sort("intro\n{{DEFAULTSORT:Morrison, Jim}}\n[[Category:X]]"),
            "Morrison, Jim"
        );
        assert_eq!(default_sort("{{CLEDETRI:Piaf, Edith }}"), "Piaf, Edith");
        assert_eq!(default_sort("no sort key"), "");
    }

    #[test]
    fn test_main_image() {
        let wikitext = "{{Infobox\n| image = Jim Morrison grave.jpg \n| caption = x\n}}";
        assert_eq!(main_image(wikitext), "File:Jim Morrison grave.jpg");
        assert_eq!(main_image("| Image =   "), "");
        assert_eq!(main_image("nothing here"), "");
    }

    #[test]
    fn test_category_redirect() {
        assert_eq!(
            category_redirect("{{Category redirect|Grave of Jim Morrison}}"),
            Some("Category:Grave of Jim Morrison".into())
        );
        assert_eq!(
            category_redirect("  {{Category redirect|Category:Tomb}}  "),
            Some("Category:Tomb".into())
        );
        assert_eq!(category_redirect("[[Category:Père-Lachaise]]"), None);
    }
}
