//! Field descriptors for persisted records.
//!
//! Each record type declares a static table of `(name, getter, setter)`
//! triples. The reconciliation engine diffs a stored record against a
//! freshly extracted one by comparing getter output field by field, and
//! overwrites a stored record by feeding every getter of the incoming
//! record into the matching setter.
//!
//! Identity columns (the record key) and the `created_at` / `modified_at`
//! timestamps are deliberately absent from the tables.

use std::fmt::Debug;
use std::hash::Hash;

use chrono::NaiveDate;

use crate::error::ReconcileError;
use crate::models::{
    CommonsCategory, CommonsFile, DateAccuracy, OpenStreetMapElement, WikidataEntry,
    WikidataLocalizedEntry, WikidataOccupation, WikipediaPage,
};

/// A typed field value, as produced by a descriptor getter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    OptText(Option<String>),
    List(Vec<String>),
    Date(Option<NaiveDate>),
    Accuracy(Option<DateAccuracy>),
    Float(f64),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "Text",
            FieldValue::OptText(_) => "OptText",
            FieldValue::List(_) => "List",
            FieldValue::Date(_) => "Date",
            FieldValue::Accuracy(_) => "Accuracy",
            FieldValue::Float(_) => "Float",
        }
    }
}

/// One entry of a record's descriptor table.
pub struct Field<R> {
    pub name: &'static str,
    pub get: fn(&R) -> FieldValue,
    pub set: fn(&mut R, FieldValue) -> Result<(), ReconcileError>,
}

/// A persisted record that can be reconciled field by field.
pub trait Record: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static;

    /// Short label used in logs and warnings.
    const KIND: &'static str;

    fn key(&self) -> Self::Key;

    fn fields() -> &'static [Field<Self>];

    fn created_at(&self) -> i64;

    fn modified_at(&self) -> i64;

    fn stamp(&mut self, created_at: i64, modified_at: i64);
}

/// Names of the fields whose values differ between `stored` and `incoming`.
pub fn changed_fields<R: Record>(stored: &R, incoming: &R) -> Vec<&'static str> {
    R::fields()
        .iter()
        .filter(|f| (f.get)(stored) != (f.get)(incoming))
        .map(|f| f.name)
        .collect()
}

/// Copy every described field of `incoming` onto `stored`.
pub fn overwrite<R: Record>(stored: &mut R, incoming: &R) -> Result<(), ReconcileError> {
    for field in R::fields() {
        (field.set)(stored, (field.get)(incoming))?;
    }
    Ok(())
}

macro_rules! field {
    ($record:ty, $name:ident, $variant:ident) => {
        Field::<$record> {
            name: stringify!($name),
            get: |r| FieldValue::$variant(r.$name.clone()),
            set: |r, v| match v {
                FieldValue::$variant(value) => {
                    r.$name = value;
                    Ok(())
                }
                other => Err(ReconcileError::FieldType {
                    field: stringify!($name),
                    expected: stringify!($variant),
                    found: other.kind(),
                }),
            },
        }
    };
}

macro_rules! record {
    ($record:ty, $kind:literal, $key:ty, |$r:ident| $key_expr:expr, $table:ident) => {
        impl Record for $record {
            type Key = $key;

            const KIND: &'static str = $kind;

            fn key(&self) -> Self::Key {
                let $r = self;
                $key_expr
            }

            fn fields() -> &'static [Field<Self>] {
                $table
            }

            fn created_at(&self) -> i64 {
                self.created_at
            }

            fn modified_at(&self) -> i64 {
                self.modified_at
            }

            fn stamp(&mut self, created_at: i64, modified_at: i64) {
                self.created_at = created_at;
                self.modified_at = modified_at;
            }
        }
    };
}

static OPENSTREETMAP_ELEMENT_FIELDS: &[Field<OpenStreetMapElement>] = &[
    field!(OpenStreetMapElement, element_type, Text),
    field!(OpenStreetMapElement, name, Text),
    field!(OpenStreetMapElement, sorting_name, Text),
    field!(OpenStreetMapElement, latitude, Float),
    field!(OpenStreetMapElement, longitude, Float),
    field!(OpenStreetMapElement, wikipedia, Text),
    field!(OpenStreetMapElement, wikidata, Text),
    field!(OpenStreetMapElement, wikimedia_commons, Text),
    field!(OpenStreetMapElement, historic, Text),
];

static WIKIDATA_ENTRY_FIELDS: &[Field<WikidataEntry>] = &[
    field!(WikidataEntry, instance_of, List),
    field!(WikidataEntry, wikimedia_commons_category, Text),
    field!(WikidataEntry, wikimedia_commons_grave_category, Text),
    field!(WikidataEntry, burial_plot_reference, Text),
    field!(WikidataEntry, date_of_birth, Date),
    field!(WikidataEntry, date_of_birth_accuracy, Accuracy),
    field!(WikidataEntry, date_of_death, Date),
    field!(WikidataEntry, date_of_death_accuracy, Accuracy),
    field!(WikidataEntry, sex_or_gender, OptText),
    field!(WikidataEntry, occupations, List),
    field!(WikidataEntry, grave_of_wikidata, List),
];

static LOCALIZED_ENTRY_FIELDS: &[Field<WikidataLocalizedEntry>] = &[
    field!(WikidataLocalizedEntry, name, Text),
    field!(WikidataLocalizedEntry, wikipedia, Text),
    field!(WikidataLocalizedEntry, description, Text),
];

static COMMONS_CATEGORY_FIELDS: &[Field<CommonsCategory>] = &[
    field!(CommonsCategory, main_image, Text),
    field!(CommonsCategory, category_members, List),
];

static COMMONS_FILE_FIELDS: &[Field<CommonsFile>] = &[
    field!(CommonsFile, original_url, Text),
    field!(CommonsFile, thumbnail_url, Text),
];

static WIKIPEDIA_PAGE_FIELDS: &[Field<WikipediaPage>] = &[
    field!(WikipediaPage, title, Text),
    field!(WikipediaPage, intro, Text),
    field!(WikipediaPage, default_sort, Text),
];

static OCCUPATION_FIELDS: &[Field<WikidataOccupation>] = &[field!(WikidataOccupation, name, Text)];

record!(
    OpenStreetMapElement,
    "openstreetmap element",
    i64,
    |r| r.id,
    OPENSTREETMAP_ELEMENT_FIELDS
);
record!(
    WikidataEntry,
    "wikidata entry",
    String,
    |r| r.wikidata_id.clone(),
    WIKIDATA_ENTRY_FIELDS
);
record!(
    WikidataLocalizedEntry,
    "wikidata localized entry",
    (String, String),
    |r| (r.wikidata_id.clone(), r.language.clone()),
    LOCALIZED_ENTRY_FIELDS
);
record!(
    CommonsCategory,
    "commons category",
    String,
    |r| r.title.clone(),
    COMMONS_CATEGORY_FIELDS
);
record!(
    CommonsFile,
    "commons file",
    String,
    |r| r.title.clone(),
    COMMONS_FILE_FIELDS
);
record!(
    WikipediaPage,
    "wikipedia page",
    (String, String),
    |r| (r.wikidata_id.clone(), r.language.clone()),
    WIKIPEDIA_PAGE_FIELDS
);
record!(
    WikidataOccupation,
    "wikidata occupation",
    String,
    |r| r.wikidata_id.clone(),
    OCCUPATION_FIELDS
);
