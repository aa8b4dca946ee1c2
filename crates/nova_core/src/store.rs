//! Persistence: user profiles and append-only health logs.
//!
//! The core consumes the `HealthStore` trait only. `SqliteStore` is the
//! production adapter; `MemoryStore` backs tests. Log tables are
//! append-only - nothing here mutates or deletes a logged entry - and
//! history queries return newest first.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use crate::error::NovaError;
use crate::types::{DietaryPreference, FoodRecord, GlucoseRecord, MoodRecord, User};

/// Storage interface consumed by the orchestrator.
pub trait HealthStore: Send {
    fn get_user(&self, user_id: i64) -> Result<Option<User>, NovaError>;
    fn insert_user(&self, user: &User) -> Result<(), NovaError>;
    fn user_count(&self) -> Result<i64, NovaError>;

    fn insert_mood(&self, user_id: i64, label: &str, score: i64, timestamp: &str) -> Result<(), NovaError>;
    fn insert_glucose(
        &self,
        user_id: i64,
        reading: f64,
        alert_level: &str,
        timestamp: &str,
    ) -> Result<(), NovaError>;
    fn insert_food(
        &self,
        user_id: i64,
        description: &str,
        nutrition_json: &str,
        timestamp: &str,
    ) -> Result<(), NovaError>;

    /// Newest first.
    fn mood_history(&self, user_id: i64, limit: usize) -> Result<Vec<MoodRecord>, NovaError>;
    /// Newest first.
    fn glucose_history(&self, user_id: i64, limit: usize) -> Result<Vec<GlucoseRecord>, NovaError>;
    /// Newest first.
    fn food_history(&self, user_id: i64, limit: usize) -> Result<Vec<FoodRecord>, NovaError>;

    /// Most recent reading within the window, if any.
    fn latest_glucose(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError>;
    /// Most recent mood label within the window, if any.
    fn latest_mood(&self, user_id: i64, within_days: i64) -> Result<Option<String>, NovaError>;

    /// Rolling mean mood score over the window; None without data.
    fn mood_average(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError>;
    /// Rolling mean glucose over the window; None without data.
    fn glucose_average(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError>;
}

/// RFC3339 cutoff for an N-day window. Timestamps are stored RFC3339 UTC,
/// so lexicographic comparison in SQL matches chronological order.
fn window_cutoff(within_days: i64) -> String {
    (Utc::now() - Duration::days(within_days)).to_rfc3339()
}

// ============================================================================
// Sqlite adapter
// ============================================================================

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self, NovaError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// In-memory database, mainly for tests and demos.
    pub fn open_in_memory() -> Result<Self, NovaError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users(
                 id INTEGER PRIMARY KEY,
                 first_name TEXT NOT NULL,
                 last_name TEXT NOT NULL,
                 city TEXT NOT NULL,
                 dietary_preference TEXT NOT NULL,
                 medical_conditions TEXT NOT NULL DEFAULT '[]',
                 physical_limitations TEXT NOT NULL DEFAULT '[]'
             );
             CREATE TABLE IF NOT EXISTS mood_logs(
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_id INTEGER NOT NULL,
                 mood TEXT NOT NULL,
                 score INTEGER NOT NULL,
                 timestamp TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS cgm_logs(
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_id INTEGER NOT NULL,
                 glucose_level REAL NOT NULL,
                 alert_level TEXT NOT NULL,
                 timestamp TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS food_logs(
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_id INTEGER NOT NULL,
                 meal_description TEXT NOT NULL,
                 nutrition_analysis TEXT NOT NULL DEFAULT '{}',
                 timestamp TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, String, String, String, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }
}

impl HealthStore for SqliteStore {
    fn get_user(&self, user_id: i64) -> Result<Option<User>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, first_name, last_name, city, dietary_preference,
                    medical_conditions, physical_limitations
             FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![user_id], Self::row_to_user)?;
        match rows.next() {
            Some(row) => {
                let (id, first_name, last_name, city, diet, conditions, limitations) = row?;
                let dietary_preference = DietaryPreference::from_str(&diet).ok_or_else(|| {
                    NovaError::Persistence(format!("unknown dietary preference '{diet}'"))
                })?;
                Ok(Some(User {
                    id,
                    first_name,
                    last_name,
                    city,
                    dietary_preference,
                    medical_conditions: serde_json::from_str(&conditions)?,
                    physical_limitations: serde_json::from_str(&limitations)?,
                }))
            }
            None => Ok(None),
        }
    }

    fn insert_user(&self, user: &User) -> Result<(), NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO users
                 (id, first_name, last_name, city, dietary_preference,
                  medical_conditions, physical_limitations)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id,
                user.first_name,
                user.last_name,
                user.city,
                user.dietary_preference.as_str(),
                serde_json::to_string(&user.medical_conditions)?,
                serde_json::to_string(&user.physical_limitations)?,
            ],
        )?;
        Ok(())
    }

    fn user_count(&self) -> Result<i64, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn insert_mood(&self, user_id: i64, label: &str, score: i64, timestamp: &str) -> Result<(), NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO mood_logs (user_id, mood, score, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, label, score, timestamp],
        )?;
        Ok(())
    }

    fn insert_glucose(
        &self,
        user_id: i64,
        reading: f64,
        alert_level: &str,
        timestamp: &str,
    ) -> Result<(), NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO cgm_logs (user_id, glucose_level, alert_level, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, reading, alert_level, timestamp],
        )?;
        Ok(())
    }

    fn insert_food(
        &self,
        user_id: i64,
        description: &str,
        nutrition_json: &str,
        timestamp: &str,
    ) -> Result<(), NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO food_logs (user_id, meal_description, nutrition_analysis, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, description, nutrition_json, timestamp],
        )?;
        Ok(())
    }

    fn mood_history(&self, user_id: i64, limit: usize) -> Result<Vec<MoodRecord>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT timestamp, mood, score FROM mood_logs
             WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(MoodRecord {
                timestamp: row.get(0)?,
                mood: row.get(1)?,
                score: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn glucose_history(&self, user_id: i64, limit: usize) -> Result<Vec<GlucoseRecord>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT timestamp, glucose_level, alert_level FROM cgm_logs
             WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(GlucoseRecord {
                timestamp: row.get(0)?,
                reading: row.get(1)?,
                alert_level: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn food_history(&self, user_id: i64, limit: usize) -> Result<Vec<FoodRecord>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT timestamp, meal_description FROM food_logs
             WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit as i64], |row| {
            Ok(FoodRecord {
                timestamp: row.get(0)?,
                description: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn latest_glucose(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT glucose_level FROM cgm_logs
             WHERE user_id = ?1 AND timestamp >= ?2
             ORDER BY timestamp DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![user_id, window_cutoff(within_days)], |row| row.get(0))?;
        match rows.next() {
            Some(value) => Ok(Some(value?)),
            None => Ok(None),
        }
    }

    fn latest_mood(&self, user_id: i64, within_days: i64) -> Result<Option<String>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT mood FROM mood_logs
             WHERE user_id = ?1 AND timestamp >= ?2
             ORDER BY timestamp DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![user_id, window_cutoff(within_days)], |row| row.get(0))?;
        match rows.next() {
            Some(value) => Ok(Some(value?)),
            None => Ok(None),
        }
    }

    fn mood_average(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(score) FROM mood_logs WHERE user_id = ?1 AND timestamp >= ?2",
            params![user_id, window_cutoff(within_days)],
            |row| row.get(0),
        )?;
        Ok(avg)
    }

    fn glucose_average(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let avg: Option<f64> = conn.query_row(
            "SELECT AVG(glucose_level) FROM cgm_logs WHERE user_id = ?1 AND timestamp >= ?2",
            params![user_id, window_cutoff(within_days)],
            |row| row.get(0),
        )?;
        Ok(avg)
    }
}

// ============================================================================
// In-memory adapter
// ============================================================================

#[derive(Default)]
struct MemoryInner {
    users: HashMap<i64, User>,
    moods: Vec<(i64, MoodRecord)>,
    glucose: Vec<(i64, GlucoseRecord)>,
    foods: Vec<(i64, FoodRecord)>,
}

/// In-memory store for tests; same ordering guarantees as sqlite.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a store pre-loaded with the given users.
    pub fn with_users(users: Vec<User>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.lock().unwrap();
            for user in users {
                inner.users.insert(user.id, user);
            }
        }
        store
    }
}

fn within(timestamp: &str, cutoff: &str) -> bool {
    match (
        DateTime::parse_from_rfc3339(timestamp),
        DateTime::parse_from_rfc3339(cutoff),
    ) {
        (Ok(ts), Ok(cut)) => ts >= cut,
        _ => false,
    }
}

impl HealthStore for MemoryStore {
    fn get_user(&self, user_id: i64) -> Result<Option<User>, NovaError> {
        Ok(self.inner.lock().unwrap().users.get(&user_id).cloned())
    }

    fn insert_user(&self, user: &User) -> Result<(), NovaError> {
        self.inner
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
        Ok(())
    }

    fn user_count(&self) -> Result<i64, NovaError> {
        Ok(self.inner.lock().unwrap().users.len() as i64)
    }

    fn insert_mood(&self, user_id: i64, label: &str, score: i64, timestamp: &str) -> Result<(), NovaError> {
        self.inner.lock().unwrap().moods.push((
            user_id,
            MoodRecord {
                timestamp: timestamp.to_string(),
                mood: label.to_string(),
                score,
            },
        ));
        Ok(())
    }

    fn insert_glucose(
        &self,
        user_id: i64,
        reading: f64,
        alert_level: &str,
        timestamp: &str,
    ) -> Result<(), NovaError> {
        self.inner.lock().unwrap().glucose.push((
            user_id,
            GlucoseRecord {
                timestamp: timestamp.to_string(),
                reading,
                alert_level: alert_level.to_string(),
            },
        ));
        Ok(())
    }

    fn insert_food(
        &self,
        user_id: i64,
        description: &str,
        _nutrition_json: &str,
        timestamp: &str,
    ) -> Result<(), NovaError> {
        self.inner.lock().unwrap().foods.push((
            user_id,
            FoodRecord {
                timestamp: timestamp.to_string(),
                description: description.to_string(),
            },
        ));
        Ok(())
    }

    fn mood_history(&self, user_id: i64, limit: usize) -> Result<Vec<MoodRecord>, NovaError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<MoodRecord> = inner
            .moods
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, r)| r.clone())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    fn glucose_history(&self, user_id: i64, limit: usize) -> Result<Vec<GlucoseRecord>, NovaError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<GlucoseRecord> = inner
            .glucose
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, r)| r.clone())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    fn food_history(&self, user_id: i64, limit: usize) -> Result<Vec<FoodRecord>, NovaError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<FoodRecord> = inner
            .foods
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, r)| r.clone())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    fn latest_glucose(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError> {
        let cutoff = window_cutoff(within_days);
        Ok(self
            .glucose_history(user_id, usize::MAX)?
            .into_iter()
            .find(|r| within(&r.timestamp, &cutoff))
            .map(|r| r.reading))
    }

    fn latest_mood(&self, user_id: i64, within_days: i64) -> Result<Option<String>, NovaError> {
        let cutoff = window_cutoff(within_days);
        Ok(self
            .mood_history(user_id, usize::MAX)?
            .into_iter()
            .find(|r| within(&r.timestamp, &cutoff))
            .map(|r| r.mood))
    }

    fn mood_average(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError> {
        let cutoff = window_cutoff(within_days);
        let scores: Vec<i64> = self
            .mood_history(user_id, usize::MAX)?
            .into_iter()
            .filter(|r| within(&r.timestamp, &cutoff))
            .map(|r| r.score)
            .collect();
        if scores.is_empty() {
            return Ok(None);
        }
        Ok(Some(scores.iter().sum::<i64>() as f64 / scores.len() as f64))
    }

    fn glucose_average(&self, user_id: i64, within_days: i64) -> Result<Option<f64>, NovaError> {
        let cutoff = window_cutoff(within_days);
        let readings: Vec<f64> = self
            .glucose_history(user_id, usize::MAX)?
            .into_iter()
            .filter(|r| within(&r.timestamp, &cutoff))
            .map(|r| r.reading)
            .collect();
        if readings.is_empty() {
            return Ok(None);
        }
        Ok(Some(readings.iter().sum::<f64>() / readings.len() as f64))
    }
}
