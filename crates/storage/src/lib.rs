//! Sqlite-backed persistence: settings and the last fetched gallery snapshot.

use std::path::Path;

use anyhow::Context as _;
use memorybook_core::{Image, ImageId, Settings};
use rusqlite::{Connection, OptionalExtension as _};

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Images in delivery order (oldest first), exactly as the listing returned them.
    pub images: Vec<Image>,
    pub fetched_at: i64,
    pub source: String,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                api_url TEXT,
                book_limit INTEGER NOT NULL,
                images_per_page INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO settings (id, api_url, book_limit, images_per_page)
            VALUES (1, NULL, 40, 4);

            CREATE TABLE IF NOT EXISTS gallery_snapshot (
                position INTEGER PRIMARY KEY,
                image_id TEXT NOT NULL,
                image_url TEXT NOT NULL,
                title TEXT,
                description TEXT,
                created_at TEXT
            );

            CREATE TABLE IF NOT EXISTS snapshot_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                fetched_at INTEGER NOT NULL,
                source TEXT NOT NULL
            );
            "#,
        )?;

        self.add_column(
            "ALTER TABLE settings ADD COLUMN flip_delay_ms INTEGER NOT NULL DEFAULT 450",
            "add settings.flip_delay_ms column",
        )?;
        self.add_column(
            "ALTER TABLE settings ADD COLUMN collage_columns INTEGER NOT NULL DEFAULT 4",
            "add settings.collage_columns column",
        )?;

        Ok(())
    }

    fn add_column(&self, sql: &str, what: &'static str) -> anyhow::Result<()> {
        match self.conn.execute(sql, []) {
            Ok(_) => Ok(()),
            Err(err) => {
                let msg = err.to_string();
                if msg.contains("duplicate column name") {
                    Ok(())
                } else {
                    Err(err).context(what)
                }
            }
        }
    }

    pub fn load_settings(&self) -> anyhow::Result<Settings> {
        let row = self
            .conn
            .query_row(
                "SELECT api_url, book_limit, images_per_page, flip_delay_ms, collage_columns FROM settings WHERE id = 1",
                [],
                |row| {
                    let api_url: Option<String> = row.get(0)?;
                    let book_limit: i64 = row.get(1)?;
                    let images_per_page: i64 = row.get(2)?;
                    let flip_delay_ms: i64 = row.get(3)?;
                    let collage_columns: i64 = row.get(4)?;
                    Ok((api_url, book_limit, images_per_page, flip_delay_ms, collage_columns))
                },
            )
            .optional()?;

        let defaults = Settings::default();
        let Some((api_url, book_limit, images_per_page, flip_delay_ms, collage_columns)) = row
        else {
            return Ok(defaults);
        };

        let mut settings = Settings {
            api_url,
            book_limit: usize::try_from(book_limit).unwrap_or(defaults.book_limit),
            images_per_page: usize::try_from(images_per_page).unwrap_or(defaults.images_per_page),
            flip_delay_ms: u64::try_from(flip_delay_ms).unwrap_or(defaults.flip_delay_ms),
            collage_columns: u16::try_from(collage_columns).unwrap_or(defaults.collage_columns),
        };
        settings.normalize();
        Ok(settings)
    }

    pub fn save_settings(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut settings = settings.clone();
        settings.normalize();

        self.conn.execute(
            "UPDATE settings SET api_url = ?, book_limit = ?, images_per_page = ?, flip_delay_ms = ?, collage_columns = ? WHERE id = 1",
            (
                settings.api_url.as_deref(),
                settings.book_limit as i64,
                settings.images_per_page as i64,
                settings.flip_delay_ms as i64,
                i64::from(settings.collage_columns),
            ),
        )?;
        Ok(())
    }

    /// Replaces the stored snapshot with `images` in delivery order.
    pub fn save_snapshot(&mut self, images: &[Image], source: &str) -> anyhow::Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM gallery_snapshot", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO gallery_snapshot (position, image_id, image_url, title, description, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            for (position, image) in images.iter().enumerate() {
                stmt.execute((
                    position as i64,
                    image.id.as_str(),
                    &image.image_url,
                    image.title.as_deref(),
                    image.description.as_deref(),
                    image.created_at.as_deref(),
                ))?;
            }
        }
        tx.execute(
            r#"
            INSERT INTO snapshot_meta (id, fetched_at, source) VALUES (1, unixepoch(), ?)
            ON CONFLICT(id) DO UPDATE SET fetched_at = excluded.fetched_at, source = excluded.source
            "#,
            [source],
        )?;
        tx.commit().context("commit gallery snapshot")?;
        Ok(())
    }

    pub fn load_snapshot(&self) -> anyhow::Result<Option<Snapshot>> {
        let meta = self
            .conn
            .query_row(
                "SELECT fetched_at, source FROM snapshot_meta WHERE id = 1",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((fetched_at, source)) = meta else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT image_id, image_url, title, description, created_at FROM gallery_snapshot ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Image {
                id: ImageId(row.get(0)?),
                image_url: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        let images = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Snapshot {
            images,
            fetched_at,
            source,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(id: &str, title: Option<&str>) -> Image {
        Image {
            id: ImageId(id.to_string()),
            image_url: format!("https://cdn.example/{id}.jpg"),
            title: title.map(str::to_string),
            description: None,
            created_at: Some("2024-05-01T10:00:00Z".to_string()),
        }
    }

    #[test]
    fn settings_roundtrip() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let mut settings = storage.load_settings()?;
        assert_eq!(settings, Settings::default());

        settings.api_url = Some("https://script.example/exec".to_string());
        settings.book_limit = 24;
        settings.flip_delay_ms = 300;
        settings.collage_columns = 3;
        storage.save_settings(&settings)?;

        let settings2 = storage.load_settings()?;
        assert_eq!(settings2, settings);
        Ok(())
    }

    #[test]
    fn saved_settings_are_normalized() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        let settings = Settings {
            api_url: Some("  ".to_string()),
            images_per_page: 0,
            ..Settings::default()
        };
        storage.save_settings(&settings)?;
        let loaded = storage.load_settings()?;
        assert_eq!(loaded.api_url, None);
        assert_eq!(loaded.images_per_page, 1);
        Ok(())
    }

    #[test]
    fn migrate_is_idempotent() -> anyhow::Result<()> {
        let storage = Storage::open_in_memory()?;
        storage.migrate()?;
        storage.migrate()?;
        assert_eq!(storage.load_settings()?, Settings::default());
        Ok(())
    }

    #[test]
    fn snapshot_roundtrip_keeps_order() -> anyhow::Result<()> {
        let mut storage = Storage::open_in_memory()?;
        assert!(storage.load_snapshot()?.is_none());

        let images = vec![image("b", Some("Bride")), image("a", None), image("c", None)];
        storage.save_snapshot(&images, "https://script.example/exec")?;
        let snapshot = storage.load_snapshot()?.expect("snapshot");
        assert_eq!(snapshot.images, images);
        assert_eq!(snapshot.source, "https://script.example/exec");

        storage.save_snapshot(&images[..1], "file.json")?;
        let snapshot = storage.load_snapshot()?.expect("snapshot");
        assert_eq!(snapshot.images.len(), 1);
        assert_eq!(snapshot.source, "file.json");
        Ok(())
    }
}
