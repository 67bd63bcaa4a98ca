//! SQLite-backed [`Store`] implementation.
//!
//! List fields are stored as joined text: codes with `;`, category members
//! with `|`. Dates are ISO 8601 text and accuracies their lowercase name.
//! Saves are `INSERT … ON CONFLICT DO UPDATE` so that a save never deletes
//! a row and never triggers the `ON DELETE CASCADE` of its children.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use lachaise_sync_core::chunk::split_semicolon;
use lachaise_sync_core::models::{
    CommonsCategory, CommonsFile, DateAccuracy, OpenStreetMapElement, Synchronization,
    WikidataEntry, WikidataLocalizedEntry, WikidataOccupation, WikipediaPage,
};
use lachaise_sync_core::store::{Store, Table};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn split_members(s: &str) -> Vec<String> {
    s.split('|')
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn date_to_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.to_string())
}

fn date_from_text(text: Option<String>) -> Result<Option<NaiveDate>> {
    text.map(|t| {
        t.parse::<NaiveDate>()
            .with_context(|| format!("invalid stored date '{t}'"))
    })
    .transpose()
}

fn accuracy_to_text(accuracy: Option<DateAccuracy>) -> Option<&'static str> {
    accuracy.map(|a| a.as_str())
}

fn accuracy_from_text(text: Option<String>) -> Option<DateAccuracy> {
    text.as_deref().and_then(DateAccuracy::parse)
}

fn osm_from_row(row: &SqliteRow) -> Result<OpenStreetMapElement> {
    Ok(OpenStreetMapElement {
        id: row.try_get("id")?,
        element_type: row.try_get("type")?,
        name: row.try_get("name")?,
        sorting_name: row.try_get("sorting_name")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        wikipedia: row.try_get("wikipedia")?,
        wikidata: row.try_get("wikidata")?,
        wikimedia_commons: row.try_get("wikimedia_commons")?,
        historic: row.try_get("historic")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<WikidataEntry> {
    Ok(WikidataEntry {
        wikidata_id: row.try_get("wikidata_id")?,
        instance_of: split_semicolon(row.try_get("instance_of")?),
        wikimedia_commons_category: row.try_get("wikimedia_commons_category")?,
        wikimedia_commons_grave_category: row.try_get("wikimedia_commons_grave_category")?,
        burial_plot_reference: row.try_get("burial_plot_reference")?,
        date_of_birth: date_from_text(row.try_get("date_of_birth")?)?,
        date_of_birth_accuracy: accuracy_from_text(row.try_get("date_of_birth_accuracy")?),
        date_of_death: date_from_text(row.try_get("date_of_death")?)?,
        date_of_death_accuracy: accuracy_from_text(row.try_get("date_of_death_accuracy")?),
        sex_or_gender: row.try_get("sex_or_gender")?,
        occupations: split_semicolon(row.try_get("occupations")?),
        grave_of_wikidata: split_semicolon(row.try_get("grave_of_wikidata")?),
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn localized_from_row(row: &SqliteRow) -> Result<WikidataLocalizedEntry> {
    Ok(WikidataLocalizedEntry {
        wikidata_id: row.try_get("wikidata_id")?,
        language: row.try_get("language")?,
        name: row.try_get("name")?,
        wikipedia: row.try_get("wikipedia")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn category_from_row(row: &SqliteRow) -> Result<CommonsCategory> {
    Ok(CommonsCategory {
        title: row.try_get("title")?,
        main_image: row.try_get("main_image")?,
        category_members: split_members(row.try_get("category_members")?),
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn file_from_row(row: &SqliteRow) -> Result<CommonsFile> {
    Ok(CommonsFile {
        title: row.try_get("title")?,
        original_url: row.try_get("original_url")?,
        thumbnail_url: row.try_get("thumbnail_url")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn page_from_row(row: &SqliteRow) -> Result<WikipediaPage> {
    Ok(WikipediaPage {
        wikidata_id: row.try_get("wikidata_id")?,
        language: row.try_get("language")?,
        title: row.try_get("title")?,
        intro: row.try_get("intro")?,
        default_sort: row.try_get("default_sort")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn occupation_from_row(row: &SqliteRow) -> Result<WikidataOccupation> {
    Ok(WikidataOccupation {
        wikidata_id: row.try_get("wikidata_id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        modified_at: row.try_get("modified_at")?,
    })
}

fn synchronization_from_row(row: &SqliteRow) -> Result<Synchronization> {
    Ok(Synchronization {
        name: row.try_get("name")?,
        last_executed: row.try_get("last_executed")?,
        created_objects: row.try_get::<i64, _>("created_objects")?.max(0) as u64,
        modified_objects: row.try_get::<i64, _>("modified_objects")?.max(0) as u64,
        deleted_objects: row.try_get::<i64, _>("deleted_objects")?.max(0) as u64,
        errors: row.try_get("errors")?,
    })
}

fn collect<R>(rows: Vec<SqliteRow>, map: fn(&SqliteRow) -> Result<R>) -> Result<Vec<R>> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl Table<OpenStreetMapElement> for SqliteStore {
    async fn get(&self, key: &i64) -> Result<Option<OpenStreetMapElement>> {
        sqlx::query("SELECT * FROM openstreetmap_elements WHERE id = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(osm_from_row)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<OpenStreetMapElement>> {
        let rows = sqlx::query("SELECT * FROM openstreetmap_elements ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, osm_from_row)
    }

    async fn save(&self, e: &OpenStreetMapElement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO openstreetmap_elements (id, type, name, sorting_name, latitude, longitude,
                                                wikipedia, wikidata, wikimedia_commons, historic,
                                                created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                type = excluded.type,
                name = excluded.name,
                sorting_name = excluded.sorting_name,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                wikipedia = excluded.wikipedia,
                wikidata = excluded.wikidata,
                wikimedia_commons = excluded.wikimedia_commons,
                historic = excluded.historic,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(e.id)
        .bind(&e.element_type)
        .bind(&e.name)
        .bind(&e.sorting_name)
        .bind(e.latitude)
        .bind(e.longitude)
        .bind(&e.wikipedia)
        .bind(&e.wikidata)
        .bind(&e.wikimedia_commons)
        .bind(&e.historic)
        .bind(e.created_at)
        .bind(e.modified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &i64) -> Result<()> {
        sqlx::query("DELETE FROM openstreetmap_elements WHERE id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Table<WikidataEntry> for SqliteStore {
    async fn get(&self, key: &String) -> Result<Option<WikidataEntry>> {
        sqlx::query("SELECT * FROM wikidata_entries WHERE wikidata_id = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(entry_from_row)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<WikidataEntry>> {
        let rows = sqlx::query("SELECT * FROM wikidata_entries ORDER BY wikidata_id")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, entry_from_row)
    }

    async fn save(&self, e: &WikidataEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wikidata_entries (wikidata_id, instance_of, wikimedia_commons_category,
                                          wikimedia_commons_grave_category, burial_plot_reference,
                                          date_of_birth, date_of_birth_accuracy,
                                          date_of_death, date_of_death_accuracy,
                                          sex_or_gender, occupations, grave_of_wikidata,
                                          created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(wikidata_id) DO UPDATE SET
                instance_of = excluded.instance_of,
                wikimedia_commons_category = excluded.wikimedia_commons_category,
                wikimedia_commons_grave_category = excluded.wikimedia_commons_grave_category,
                burial_plot_reference = excluded.burial_plot_reference,
                date_of_birth = excluded.date_of_birth,
                date_of_birth_accuracy = excluded.date_of_birth_accuracy,
                date_of_death = excluded.date_of_death,
                date_of_death_accuracy = excluded.date_of_death_accuracy,
                sex_or_gender = excluded.sex_or_gender,
                occupations = excluded.occupations,
                grave_of_wikidata = excluded.grave_of_wikidata,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(&e.wikidata_id)
        .bind(e.instance_of.join(";"))
        .bind(&e.wikimedia_commons_category)
        .bind(&e.wikimedia_commons_grave_category)
        .bind(&e.burial_plot_reference)
        .bind(date_to_text(e.date_of_birth))
        .bind(accuracy_to_text(e.date_of_birth_accuracy))
        .bind(date_to_text(e.date_of_death))
        .bind(accuracy_to_text(e.date_of_death_accuracy))
        .bind(&e.sex_or_gender)
        .bind(e.occupations.join(";"))
        .bind(e.grave_of_wikidata.join(";"))
        .bind(e.created_at)
        .bind(e.modified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &String) -> Result<()> {
        sqlx::query("DELETE FROM wikidata_entries WHERE wikidata_id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Table<WikidataLocalizedEntry> for SqliteStore {
    async fn get(&self, key: &(String, String)) -> Result<Option<WikidataLocalizedEntry>> {
        sqlx::query("SELECT * FROM wikidata_localized_entries WHERE wikidata_id = ? AND language = ?")
            .bind(&key.0)
            .bind(&key.1)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(localized_from_row)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<WikidataLocalizedEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM wikidata_localized_entries ORDER BY wikidata_id, language",
        )
        .fetch_all(&self.pool)
        .await?;
        collect(rows, localized_from_row)
    }

    async fn save(&self, e: &WikidataLocalizedEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wikidata_localized_entries (wikidata_id, language, name, wikipedia,
                                                    description, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(wikidata_id, language) DO UPDATE SET
                name = excluded.name,
                wikipedia = excluded.wikipedia,
                description = excluded.description,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(&e.wikidata_id)
        .bind(&e.language)
        .bind(&e.name)
        .bind(&e.wikipedia)
        .bind(&e.description)
        .bind(e.created_at)
        .bind(e.modified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &(String, String)) -> Result<()> {
        sqlx::query("DELETE FROM wikidata_localized_entries WHERE wikidata_id = ? AND language = ?")
            .bind(&key.0)
            .bind(&key.1)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Table<CommonsCategory> for SqliteStore {
    async fn get(&self, key: &String) -> Result<Option<CommonsCategory>> {
        sqlx::query("SELECT * FROM wikimedia_commons_categories WHERE title = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(category_from_row)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<CommonsCategory>> {
        let rows = sqlx::query("SELECT * FROM wikimedia_commons_categories ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, category_from_row)
    }

    async fn save(&self, c: &CommonsCategory) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wikimedia_commons_categories (title, main_image, category_members,
                                                      created_at, modified_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                main_image = excluded.main_image,
                category_members = excluded.category_members,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(&c.title)
        .bind(&c.main_image)
        .bind(c.category_members.join("|"))
        .bind(c.created_at)
        .bind(c.modified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &String) -> Result<()> {
        sqlx::query("DELETE FROM wikimedia_commons_categories WHERE title = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Table<CommonsFile> for SqliteStore {
    async fn get(&self, key: &String) -> Result<Option<CommonsFile>> {
        sqlx::query("SELECT * FROM wikimedia_commons_files WHERE title = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(file_from_row)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<CommonsFile>> {
        let rows = sqlx::query("SELECT * FROM wikimedia_commons_files ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, file_from_row)
    }

    async fn save(&self, f: &CommonsFile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wikimedia_commons_files (title, original_url, thumbnail_url,
                                                 created_at, modified_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(title) DO UPDATE SET
                original_url = excluded.original_url,
                thumbnail_url = excluded.thumbnail_url,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(&f.title)
        .bind(&f.original_url)
        .bind(&f.thumbnail_url)
        .bind(f.created_at)
        .bind(f.modified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &String) -> Result<()> {
        sqlx::query("DELETE FROM wikimedia_commons_files WHERE title = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Table<WikipediaPage> for SqliteStore {
    async fn get(&self, key: &(String, String)) -> Result<Option<WikipediaPage>> {
        sqlx::query("SELECT * FROM wikipedia_pages WHERE wikidata_id = ? AND language = ?")
            .bind(&key.0)
            .bind(&key.1)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(page_from_row)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<WikipediaPage>> {
        let rows = sqlx::query("SELECT * FROM wikipedia_pages ORDER BY wikidata_id, language")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, page_from_row)
    }

    async fn save(&self, p: &WikipediaPage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wikipedia_pages (wikidata_id, language, title, intro, default_sort,
                                         created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(wikidata_id, language) DO UPDATE SET
                title = excluded.title,
                intro = excluded.intro,
                default_sort = excluded.default_sort,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(&p.wikidata_id)
        .bind(&p.language)
        .bind(&p.title)
        .bind(&p.intro)
        .bind(&p.default_sort)
        .bind(p.created_at)
        .bind(p.modified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &(String, String)) -> Result<()> {
        sqlx::query("DELETE FROM wikipedia_pages WHERE wikidata_id = ? AND language = ?")
            .bind(&key.0)
            .bind(&key.1)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Table<WikidataOccupation> for SqliteStore {
    async fn get(&self, key: &String) -> Result<Option<WikidataOccupation>> {
        sqlx::query("SELECT * FROM wikidata_occupations WHERE wikidata_id = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(occupation_from_row)
            .transpose()
    }

    async fn all(&self) -> Result<Vec<WikidataOccupation>> {
        let rows = sqlx::query("SELECT * FROM wikidata_occupations ORDER BY wikidata_id")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, occupation_from_row)
    }

    async fn save(&self, o: &WikidataOccupation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wikidata_occupations (wikidata_id, name, created_at, modified_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(wikidata_id) DO UPDATE SET
                name = excluded.name,
                modified_at = excluded.modified_at
            "#,
        )
        .bind(&o.wikidata_id)
        .bind(&o.name)
        .bind(o.created_at)
        .bind(o.modified_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &String) -> Result<()> {
        sqlx::query("DELETE FROM wikidata_occupations WHERE wikidata_id = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn occupation_links(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query(
            "SELECT wikidata_id, occupation_id FROM wikidata_entry_occupations ORDER BY wikidata_id, occupation_id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| -> Result<(String, String)> {
                Ok((row.try_get("wikidata_id")?, row.try_get("occupation_id")?))
            })
            .collect()
    }

    async fn link_occupation(&self, wikidata_id: &str, occupation_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO wikidata_entry_occupations (wikidata_id, occupation_id) VALUES (?, ?)",
        )
        .bind(wikidata_id)
        .bind(occupation_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unlink_occupation(&self, wikidata_id: &str, occupation_id: &str) -> Result<()> {
        sqlx::query(
            "DELETE FROM wikidata_entry_occupations WHERE wikidata_id = ? AND occupation_id = ?",
        )
        .bind(wikidata_id)
        .bind(occupation_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn synchronization(&self, name: &str) -> Result<Option<Synchronization>> {
        sqlx::query("SELECT * FROM synchronizations WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(synchronization_from_row)
            .transpose()
    }

    async fn save_synchronization(&self, sync: &Synchronization) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO synchronizations (name, last_executed, created_objects,
                                          modified_objects, deleted_objects, errors)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                last_executed = excluded.last_executed,
                created_objects = excluded.created_objects,
                modified_objects = excluded.modified_objects,
                deleted_objects = excluded.deleted_objects,
                errors = excluded.errors
            "#,
        )
        .bind(&sync.name)
        .bind(sync.last_executed)
        .bind(sync.created_objects as i64)
        .bind(sync.modified_objects as i64)
        .bind(sync.deleted_objects as i64)
        .bind(&sync.errors)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn synchronizations(&self) -> Result<Vec<Synchronization>> {
        let rows = sqlx::query("SELECT * FROM synchronizations ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, synchronization_from_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> SqliteStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    #[tokio::test]
    async fn test_entry_round_trips_lists_and_dates() {
        let store = store().await;
        let mut entry = WikidataEntry::new("Q44301");
        entry.instance_of = vec!["Q5".into()];
        entry.occupations = vec!["Q177220".into(), "Q49757".into()];
        entry.date_of_birth = NaiveDate::from_ymd_opt(1943, 12, 8);
        entry.date_of_birth_accuracy = Some(DateAccuracy::Day);
        entry.sex_or_gender = Some("Q6581097".into());
        entry.created_at = 5;
        entry.modified_at = 6;
        Table::<WikidataEntry>::save(&store, &entry).await.unwrap();

        let loaded = Table::<WikidataEntry>::get(&store, &"Q44301".to_string())
            .await
            .unwrap();
        assert_eq!(loaded, Some(entry));
    }

    #[tokio::test]
    async fn test_save_updates_in_place_and_keeps_children() {
        let store = store().await;
        let mut entry = WikidataEntry::new("Q1");
        Table::<WikidataEntry>::save(&store, &entry).await.unwrap();
        Table::<WikidataLocalizedEntry>::save(&store, &WikidataLocalizedEntry::new("Q1", "fr"))
            .await
            .unwrap();

        entry.burial_plot_reference = "89".into();
        Table::<WikidataEntry>::save(&store, &entry).await.unwrap();

        assert_eq!(
            Table::<WikidataLocalizedEntry>::all(&store)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_entry_delete_cascades() {
        let store = store().await;
        Table::<WikidataEntry>::save(&store, &WikidataEntry::new("Q1"))
            .await
            .unwrap();
        Table::<WikidataLocalizedEntry>::save(&store, &WikidataLocalizedEntry::new("Q1", "fr"))
            .await
            .unwrap();
        Table::<WikipediaPage>::save(&store, &WikipediaPage::new("Q1", "fr"))
            .await
            .unwrap();
        Table::<WikidataOccupation>::save(&store, &WikidataOccupation::new("Q2"))
            .await
            .unwrap();
        store.link_occupation("Q1", "Q2").await.unwrap();

        Table::<WikidataEntry>::delete(&store, &"Q1".to_string())
            .await
            .unwrap();

        assert!(Table::<WikipediaPage>::all(&store).await.unwrap().is_empty());
        assert!(store.occupation_links().await.unwrap().is_empty());
        assert_eq!(
            Table::<WikidataOccupation>::all(&store).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_category_members_use_pipes() {
        let store = store().await;
        let mut category = CommonsCategory::new("Category:Grave of Jim Morrison");
        category.category_members = vec!["File:A;B.jpg".into(), "File:C.jpg".into()];
        Table::<CommonsCategory>::save(&store, &category).await.unwrap();

        let loaded = Table::<CommonsCategory>::all(&store).await.unwrap();
        assert_eq!(loaded[0].category_members, category.category_members);
    }

    #[tokio::test]
    async fn test_migrations_seed_synchronizations() {
        let store = store().await;
        let names: Vec<String> = store
            .synchronizations()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"wikidata".to_string()));

        let sync = Synchronization {
            name: "wikidata".into(),
            last_executed: Some(10),
            modified_objects: 2,
            errors: "warn".into(),
            ..Default::default()
        };
        store.save_synchronization(&sync).await.unwrap();
        assert_eq!(store.synchronization("wikidata").await.unwrap(), Some(sync));
    }
}
