//! SQLite persistence for the festival plan.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::festival::{Film, Rating, Screening};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct DbManager {
    conn: Connection,
}

impl DbManager {
    pub fn new() -> Result<Self, rusqlite::Error> {
        let data_dir = dirs::data_dir()
            .expect("Could not find data directory")
            .join("festplan");

        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).expect("Could not create data directory");
        }

        let db_path = data_dir.join("plan.db");
        let conn = Connection::open(db_path)?;

        let db_manager = Self { conn };
        db_manager.initialize_schema()?;
        db_manager.migrate()?;
        Ok(db_manager)
    }

    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db_manager = Self { conn };
        db_manager.initialize_schema()?;
        db_manager.migrate()?;
        Ok(db_manager)
    }

    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS films (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                rating INTEGER,
                combined INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS screenings (
                id TEXT PRIMARY KEY,
                film_id TEXT NOT NULL,
                screen TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                attending INTEGER NOT NULL DEFAULT 0,
                combined_from TEXT,
                position INTEGER NOT NULL,
                FOREIGN KEY(film_id) REFERENCES films(id)
            )",
            [],
        )?;
        Ok(())
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        // Databases written before the combine feature lack combined_from.
        let mut stmt = self.conn.prepare("PRAGMA table_info(screenings)")?;
        let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut has_combined_from = false;
        for col in columns {
            if col? == "combined_from" {
                has_combined_from = true;
                break;
            }
        }

        if !has_combined_from {
            self.conn
                .execute("ALTER TABLE screenings ADD COLUMN combined_from TEXT", [])?;
        }

        Ok(())
    }

    /// Replace the stored plan with the given films and screenings.
    pub fn replace_plan(
        &mut self,
        films: &[Film],
        screenings: &[Screening],
    ) -> Result<(), rusqlite::Error> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM screenings", [])?;
        tx.execute("DELETE FROM films", [])?;

        for film in films {
            tx.execute(
                "INSERT INTO films (id, title, duration_minutes, rating, combined)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    film.id,
                    film.title,
                    film.duration_minutes,
                    film.rating.map(Rating::value),
                    film.combined
                ],
            )?;
        }
        for (position, screening) in screenings.iter().enumerate() {
            tx.execute(
                "INSERT INTO screenings
                 (id, film_id, screen, start_time, end_time, attending, combined_from, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    screening.id,
                    screening.film_id,
                    screening.screen,
                    screening.start.format(TIME_FORMAT).to_string(),
                    screening.end.format(TIME_FORMAT).to_string(),
                    screening.attending,
                    screening.combined_from,
                    position as i64
                ],
            )?;
        }
        tx.commit()
    }

    /// Restore the stored plan, screenings in position order.
    pub fn load_plan(&self) -> Result<(Vec<Film>, Vec<Screening>), rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, duration_minutes, rating, combined FROM films")?;
        let film_iter = stmt.query_map([], |row| {
            Ok(Film {
                id: row.get(0)?,
                title: row.get(1)?,
                duration_minutes: row.get(2)?,
                rating: row.get::<_, Option<u8>>(3)?.map(Rating::new),
                combined: row.get(4)?,
            })
        })?;
        let mut films = Vec::new();
        for film in film_iter {
            films.push(film?);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, film_id, screen, start_time, end_time, attending, combined_from
             FROM screenings ORDER BY position ASC",
        )?;
        let screening_iter = stmt.query_map([], |row| {
            let start: String = row.get(3)?;
            let end: String = row.get(4)?;
            Ok(Screening {
                id: row.get(0)?,
                film_id: row.get(1)?,
                screen: row.get(2)?,
                start: parse_stored_time(&start, 3)?,
                end: parse_stored_time(&end, 4)?,
                attending: row.get(5)?,
                combined_from: row.get(6)?,
            })
        })?;
        let mut screenings = Vec::new();
        for screening in screening_iter {
            screenings.push(screening?);
        }

        Ok((films, screenings))
    }

    pub fn update_attendance(&self, id: &str, attending: bool) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE screenings SET attending = ?1 WHERE id = ?2",
            params![attending, id],
        )?;
        Ok(())
    }

    pub fn update_rating(&self, film_id: &str, rating: Rating) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE films SET rating = ?1 WHERE id = ?2",
            params![rating.value(), film_id],
        )?;
        Ok(())
    }

    pub fn insert_film(&self, film: &Film) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO films (id, title, duration_minutes, rating, combined)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                film.id,
                film.title,
                film.duration_minutes,
                film.rating.map(Rating::value),
                film.combined
            ],
        )?;
        Ok(())
    }

    pub fn delete_film(&self, film_id: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM films WHERE id = ?1", params![film_id])?;
        Ok(())
    }

    /// Persist one screening's film pointer and combine bookkeeping.
    pub fn update_screening_film(&self, screening: &Screening) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "UPDATE screenings SET film_id = ?1, combined_from = ?2 WHERE id = ?3",
            params![screening.film_id, screening.combined_from, screening.id],
        )?;
        Ok(())
    }
}

fn parse_stored_time(text: &str, column: usize) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}
