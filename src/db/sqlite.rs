use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Database;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        register_functions(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// SQLite's built-in `lower()` only folds ASCII.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| v.to_lowercase()))
        },
    )
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Role::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown role '{s}'").into()))
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

/// Fixed-width so that stored timestamps sort chronologically as text.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

const USER_COLUMNS: &str =
    "id, name, email, address, password_hash, role, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        address: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const STORE_COLUMNS: &str = "s.id, s.name, s.email, s.address, s.owner_id, s.average_rating, \
     s.ratings_count, s.created_at, s.updated_at";

fn store_from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    Ok(Store {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        address: row.get(3)?,
        owner_id: row.get(4)?,
        average_rating: row.get(5)?,
        ratings_count: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO users (id, name, email, address, password_hash, role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.name,
            user.email,
            user.address,
            user.password_hash,
            user.role,
            format_datetime(&user.created_at),
            format_datetime(&user.updated_at),
        ],
    );

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(Error::AlreadyExists),
        Err(e) => Err(Error::from(e)),
    }
}

fn insert_store(conn: &Connection, store: &Store) -> Result<()> {
    conn.execute(
        "INSERT INTO stores (id, name, email, address, owner_id, average_rating, ratings_count,
                             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            store.id,
            store.name,
            store.email,
            store.address,
            store.owner_id,
            store.average_rating,
            store.ratings_count,
            format_datetime(&store.created_at),
            format_datetime(&store.updated_at),
        ],
    )?;
    Ok(())
}

/// Re-scans every rating of the store and writes the mean and count back onto it.
fn recompute_store_rating(conn: &Connection, store_id: &str) -> Result<RatingSummary> {
    let (average_rating, ratings_count): (f64, i64) = conn.query_row(
        "SELECT COALESCE(AVG(value), 0.0), COUNT(*) FROM ratings WHERE store_id = ?1",
        params![store_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    conn.execute(
        "UPDATE stores SET average_rating = ?1, ratings_count = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            average_rating,
            ratings_count,
            format_datetime(&Utc::now()),
            store_id
        ],
    )?;

    Ok(RatingSummary {
        average_rating,
        ratings_count,
    })
}

/// Appends a case-insensitive substring match on `column` when `needle` is set.
fn push_contains(
    clauses: &mut Vec<String>,
    values: &mut Vec<String>,
    column: &str,
    needle: Option<&str>,
) {
    if let Some(needle) = needle.filter(|n| !n.is_empty()) {
        values.push(needle.to_lowercase());
        clauses.push(format!(
            "instr(unicode_lower(coalesce({column}, '')), ?{}) > 0",
            values.len()
        ));
    }
}

fn where_clause(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    }
}

impl Database for SqliteDatabase {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        insert_user(&self.conn(), user)
    }

    fn create_owner_with_store(&self, owner: &User, store: &Store) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        insert_user(&tx, owner)?;
        insert_store(&tx, store)?;
        tx.commit()?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, filter: &UserFilter, sort: Sort<UserSortField>) -> Result<Vec<User>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        push_contains(&mut clauses, &mut values, "name", filter.name.as_deref());
        push_contains(&mut clauses, &mut values, "email", filter.email.as_deref());
        push_contains(&mut clauses, &mut values, "address", filter.address.as_deref());
        if let Some(role) = filter.role {
            values.push(role.as_str().to_string());
            clauses.push(format!("role = ?{}", values.len()));
        }

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users {} ORDER BY {} {}, id",
            where_clause(&clauses),
            sort.field.column(),
            sort.dir.as_sql(),
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let role: Option<Role> = tx
            .query_row("SELECT role FROM users WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(role) = role else {
            return Ok(false);
        };

        let rated_stores: Vec<String> = {
            let mut stmt = tx.prepare("SELECT DISTINCT store_id FROM ratings WHERE user_id = ?1")?;
            let ids = stmt
                .query_map(params![id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids
        };

        tx.execute("DELETE FROM ratings WHERE user_id = ?1", params![id])?;

        if role == Role::Owner {
            tx.execute(
                "DELETE FROM ratings WHERE store_id IN (SELECT id FROM stores WHERE owner_id = ?1)",
                params![id],
            )?;
            tx.execute("DELETE FROM stores WHERE owner_id = ?1", params![id])?;
        }

        tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;

        for store_id in &rated_stores {
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM stores WHERE id = ?1)",
                params![store_id],
                |row| row.get(0),
            )?;
            if exists {
                recompute_store_rating(&tx, store_id)?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    fn count_users(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    fn has_admin(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![Role::Admin],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Store operations

    fn create_store(&self, store: &Store) -> Result<()> {
        insert_store(&self.conn(), store)
    }

    fn get_store(&self, id: &str) -> Result<Option<Store>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {STORE_COLUMNS} FROM stores s WHERE s.id = ?1"),
            params![id],
            store_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_store_by_owner(&self, owner_id: &str) -> Result<Option<Store>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {STORE_COLUMNS} FROM stores s WHERE s.owner_id = ?1
                 ORDER BY s.created_at, s.id LIMIT 1"
            ),
            params![owner_id],
            store_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: Sort<StoreSortField>,
    ) -> Result<Vec<StoreWithOwner>> {
        let mut clauses = Vec::new();
        let mut values = Vec::new();
        push_contains(&mut clauses, &mut values, "s.name", filter.name.as_deref());
        push_contains(&mut clauses, &mut values, "s.email", filter.email.as_deref());
        push_contains(&mut clauses, &mut values, "s.address", filter.address.as_deref());

        let sql = format!(
            "SELECT {STORE_COLUMNS}, u.id, u.name, u.email
             FROM stores s LEFT JOIN users u ON u.id = s.owner_id
             {} ORDER BY {} {}, s.id",
            where_clause(&clauses),
            sort.field.column(),
            sort.dir.as_sql(),
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
            let store = store_from_row(row)?;
            let owner = match row.get::<_, Option<String>>(9)? {
                Some(id) => Some(UserRef {
                    id,
                    name: row.get(10)?,
                    email: row.get(11)?,
                }),
                None => None,
            };
            Ok(StoreWithOwner { store, owner })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_store(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM ratings WHERE store_id = ?1", params![id])?;
        let rows = tx.execute("DELETE FROM stores WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    fn count_stores(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM stores", [], |row| row.get(0))?;
        Ok(count)
    }

    // Rating operations

    fn submit_rating(&self, rating: &Rating) -> Result<RatingSummary> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO ratings (id, user_id, store_id, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, store_id)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![
                rating.id,
                rating.user_id,
                rating.store_id,
                rating.value,
                format_datetime(&rating.created_at),
                format_datetime(&rating.updated_at),
            ],
        )?;

        let summary = recompute_store_rating(&tx, &rating.store_id)?;
        tx.commit()?;
        Ok(summary)
    }

    fn list_store_ratings(&self, store_id: &str) -> Result<Vec<RatingWithUser>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT r.id, r.value, r.created_at, u.id, u.name, u.email
             FROM ratings r JOIN users u ON u.id = r.user_id
             WHERE r.store_id = ?1 ORDER BY r.created_at, r.id",
        )?;

        let rows = stmt.query_map(params![store_id], |row| {
            Ok(RatingWithUser {
                id: row.get(0)?,
                value: row.get(1)?,
                created_at: parse_datetime(&row.get::<_, String>(2)?),
                user: UserRef {
                    id: row.get(3)?,
                    name: row.get(4)?,
                    email: row.get(5)?,
                },
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_ratings(&self, user_id: &str) -> Result<Vec<Rating>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, store_id, value, created_at, updated_at
             FROM ratings WHERE user_id = ?1 ORDER BY created_at, id",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(Rating {
                id: row.get(0)?,
                user_id: row.get(1)?,
                store_id: row.get(2)?,
                value: row.get(3)?,
                created_at: parse_datetime(&row.get::<_, String>(4)?),
                updated_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_ratings(&self) -> Result<i64> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM ratings", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, SqliteDatabase) {
        let temp = TempDir::new().unwrap();
        let db = SqliteDatabase::new(temp.path().join("test.db")).unwrap();
        db.initialize().unwrap();
        (temp, db)
    }

    fn user(id: &str, email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            name: format!("Test account number {id:>8}"),
            email: email.to_string(),
            address: Some("1 Main Street".to_string()),
            password_hash: "hash".to_string(),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    fn store(id: &str, name: &str, owner_id: Option<&str>) -> Store {
        let now = Utc::now();
        Store {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            address: Some(format!("{name} street")),
            owner_id: owner_id.map(str::to_string),
            average_rating: 0.0,
            ratings_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn rate(db: &SqliteDatabase, user_id: &str, store_id: &str, value: u8) -> RatingSummary {
        let now = Utc::now();
        db.submit_rating(&Rating {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            store_id: store_id.to_string(),
            value,
            created_at: now,
            updated_at: now,
        })
        .unwrap()
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, db) = open();

        let conn = db.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(tables, vec!["ratings", "stores", "users"]);
    }

    #[test]
    fn test_user_crud() {
        let (_temp, db) = open();

        db.create_user(&user("u-1", "alice@example.com", Role::User))
            .unwrap();

        let fetched = db.get_user("u-1").unwrap().unwrap();
        assert_eq!(fetched.email, "alice@example.com");
        assert_eq!(fetched.role, Role::User);

        let by_email = db.get_user_by_email("alice@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, "u-1");

        db.update_user_password("u-1", "new-hash").unwrap();
        assert_eq!(db.get_user("u-1").unwrap().unwrap().password_hash, "new-hash");

        assert!(db.delete_user("u-1").unwrap());
        assert!(db.get_user("u-1").unwrap().is_none());
        assert!(!db.delete_user("u-1").unwrap());
    }

    #[test]
    fn test_duplicate_email_is_already_exists() {
        let (_temp, db) = open();

        db.create_user(&user("u-1", "dup@example.com", Role::User))
            .unwrap();
        let result = db.create_user(&user("u-2", "dup@example.com", Role::Owner));

        assert!(matches!(result, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_update_password_of_missing_user() {
        let (_temp, db) = open();
        assert!(matches!(
            db.update_user_password("ghost", "hash"),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_has_admin() {
        let (_temp, db) = open();
        assert!(!db.has_admin().unwrap());

        db.create_user(&user("u-1", "user@example.com", Role::User))
            .unwrap();
        assert!(!db.has_admin().unwrap());

        db.create_user(&user("a-1", "admin@example.com", Role::Admin))
            .unwrap();
        assert!(db.has_admin().unwrap());
    }

    #[test]
    fn test_rerating_updates_in_place() {
        let (_temp, db) = open();
        db.create_user(&user("u-1", "u1@example.com", Role::User))
            .unwrap();
        db.create_store(&store("s-1", "Corner Shop", None)).unwrap();

        let first = rate(&db, "u-1", "s-1", 4);
        assert_eq!(first.ratings_count, 1);
        assert_eq!(first.average_rating, 4.0);

        let second = rate(&db, "u-1", "s-1", 2);
        assert_eq!(second.ratings_count, 1);
        assert_eq!(second.average_rating, 2.0);

        let s = db.get_store("s-1").unwrap().unwrap();
        assert_eq!(s.ratings_count, 1);
        assert_eq!(s.average_rating, 2.0);
        assert_eq!(db.count_ratings().unwrap(), 1);
        assert_eq!(db.list_user_ratings("u-1").unwrap()[0].value, 2);
    }

    #[test]
    fn test_average_is_mean_of_all_ratings() {
        let (_temp, db) = open();
        db.create_store(&store("s-1", "Corner Shop", None)).unwrap();

        let values = [5u8, 4, 4, 1];
        for (i, value) in values.iter().enumerate() {
            let id = format!("u-{i}");
            db.create_user(&user(&id, &format!("{id}@example.com"), Role::User))
                .unwrap();
            rate(&db, &id, "s-1", *value);
        }

        let s = db.get_store("s-1").unwrap().unwrap();
        assert_eq!(s.ratings_count, 4);
        assert!((s.average_rating - 3.5).abs() < f64::EPSILON);

        let ratings = db.list_store_ratings("s-1").unwrap();
        assert_eq!(ratings.len(), 4);
        assert_eq!(ratings[0].user.email, "u-0@example.com");
    }

    #[test]
    fn test_rating_unknown_store_fails() {
        let (_temp, db) = open();
        db.create_user(&user("u-1", "u1@example.com", Role::User))
            .unwrap();

        let now = Utc::now();
        let result = db.submit_rating(&Rating {
            id: "r-1".to_string(),
            user_id: "u-1".to_string(),
            store_id: "missing".to_string(),
            value: 3,
            created_at: now,
            updated_at: now,
        });

        assert!(result.is_err());
        assert_eq!(db.count_ratings().unwrap(), 0);
    }

    #[test]
    fn test_owner_with_store_is_atomic() {
        let (_temp, db) = open();
        db.create_user(&user("u-1", "taken@example.com", Role::User))
            .unwrap();

        let owner = user("o-1", "taken@example.com", Role::Owner);
        let result = db.create_owner_with_store(&owner, &store("s-1", "Bakery", Some("o-1")));
        assert!(matches!(result, Err(Error::AlreadyExists)));
        assert!(db.get_store("s-1").unwrap().is_none());

        // The store insert fails after the owner row was written.
        let owner = user("o-2", "fresh@example.com", Role::Owner);
        let mut bad_store = store("s-2", "Bakery", Some("o-2"));
        bad_store.address = Some("x".repeat(401));
        assert!(db.create_owner_with_store(&owner, &bad_store).is_err());
        assert!(db.get_user_by_email("fresh@example.com").unwrap().is_none());
        assert_eq!(db.count_stores().unwrap(), 0);
    }

    #[test]
    fn test_delete_owner_cascades_to_store_and_ratings() {
        let (_temp, db) = open();
        let owner = user("o-1", "owner@example.com", Role::Owner);
        db.create_owner_with_store(&owner, &store("s-1", "Bakery", Some("o-1")))
            .unwrap();
        db.create_store(&store("s-2", "Florist", None)).unwrap();
        db.create_user(&user("u-1", "u1@example.com", Role::User))
            .unwrap();

        rate(&db, "u-1", "s-1", 5);
        rate(&db, "u-1", "s-2", 3);

        assert!(db.delete_user("o-1").unwrap());

        assert!(db.get_store("s-1").unwrap().is_none());
        assert!(db.list_store_ratings("s-1").unwrap().is_empty());
        assert_eq!(db.count_ratings().unwrap(), 1);
        assert!(db.get_user("u-1").unwrap().is_some());
    }

    #[test]
    fn test_delete_rater_recomputes_store() {
        let (_temp, db) = open();
        db.create_store(&store("s-1", "Bakery", None)).unwrap();
        db.create_user(&user("u-1", "u1@example.com", Role::User))
            .unwrap();
        db.create_user(&user("u-2", "u2@example.com", Role::User))
            .unwrap();

        rate(&db, "u-1", "s-1", 1);
        rate(&db, "u-2", "s-1", 5);
        assert_eq!(db.get_store("s-1").unwrap().unwrap().average_rating, 3.0);

        db.delete_user("u-2").unwrap();

        let s = db.get_store("s-1").unwrap().unwrap();
        assert_eq!(s.ratings_count, 1);
        assert_eq!(s.average_rating, 1.0);

        db.delete_user("u-1").unwrap();

        let s = db.get_store("s-1").unwrap().unwrap();
        assert_eq!(s.ratings_count, 0);
        assert_eq!(s.average_rating, 0.0);
    }

    #[test]
    fn test_delete_store_removes_its_ratings() {
        let (_temp, db) = open();
        db.create_store(&store("s-1", "Bakery", None)).unwrap();
        db.create_user(&user("u-1", "u1@example.com", Role::User))
            .unwrap();
        rate(&db, "u-1", "s-1", 4);

        assert!(db.delete_store("s-1").unwrap());
        assert!(!db.delete_store("s-1").unwrap());
        assert_eq!(db.count_ratings().unwrap(), 0);
        assert!(db.list_user_ratings("u-1").unwrap().is_empty());
    }

    #[test]
    fn test_store_by_owner_prefers_oldest() {
        let (_temp, db) = open();
        let owner = user("o-1", "owner@example.com", Role::Owner);
        db.create_owner_with_store(&owner, &store("s-1", "First", Some("o-1")))
            .unwrap();

        let mut later = store("s-0", "Second", Some("o-1"));
        later.created_at = Utc::now() + chrono::Duration::seconds(5);
        db.create_store(&later).unwrap();

        assert_eq!(db.get_store_by_owner("o-1").unwrap().unwrap().id, "s-1");
        assert!(db.get_store_by_owner("nobody").unwrap().is_none());
    }

    #[test]
    fn test_list_users_filters_and_sorts() {
        let (_temp, db) = open();
        let mut a = user("u-a", "zed@example.com", Role::User);
        a.name = "Aaron Applegate Andersson".to_string();
        let mut b = user("u-b", "amy@shop.example.com", Role::Owner);
        b.name = "Betty Bakersfield Brown".to_string();
        let mut c = user("u-c", "carl@example.com", Role::Admin);
        c.name = "Carl Christopherson Jr".to_string();
        c.address = None;
        for u in [&a, &b, &c] {
            db.create_user(u).unwrap();
        }

        let all = db
            .list_users(&UserFilter::default(), Sort::default())
            .unwrap();
        let names: Vec<_> = all.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(names, vec!["u-a", "u-b", "u-c"]);

        let by_email_desc = db
            .list_users(
                &UserFilter::default(),
                Sort::new(UserSortField::Email, SortDir::Desc),
            )
            .unwrap();
        assert_eq!(by_email_desc[0].id, "u-a");

        let filter = UserFilter {
            name: Some("BAKERS".to_string()),
            ..Default::default()
        };
        let found = db.list_users(&filter, Sort::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "u-b");

        let filter = UserFilter {
            address: Some("main".to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_users(&filter, Sort::default()).unwrap().len(), 2);

        let filter = UserFilter {
            role: Some(Role::Admin),
            ..Default::default()
        };
        let admins = db.list_users(&filter, Sort::default()).unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, "u-c");
    }

    #[test]
    fn test_filters_fold_non_ascii_case() {
        let (_temp, db) = open();
        let mut u = user("u-e", "elodie@example.com", Role::User);
        u.name = "Élodie Ærøskøbing Ångström".to_string();
        u.address = Some("Straße Über Den Fjord".to_string());
        db.create_user(&u).unwrap();
        db.create_user(&user("u-o", "other@example.com", Role::User))
            .unwrap();

        for needle in ["élodie", "ÉLODIE", "ærøskøbing", "ÅNGSTRÖM"] {
            let filter = UserFilter {
                name: Some(needle.to_string()),
                ..Default::default()
            };
            let found = db.list_users(&filter, Sort::default()).unwrap();
            assert_eq!(found.len(), 1, "needle {needle}");
            assert_eq!(found[0].id, "u-e");
        }

        let filter = UserFilter {
            address: Some("über".to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_users(&filter, Sort::default()).unwrap().len(), 1);

        let mut s = store("s-ø", "Øresund Bageri", None);
        s.address = Some("Østergade 1".to_string());
        db.create_store(&s).unwrap();
        let filter = StoreFilter {
            name: Some("øresund".to_string()),
            address: Some("ØSTERGADE".to_string()),
            ..Default::default()
        };
        assert_eq!(db.list_stores(&filter, Sort::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_list_stores_joins_owner() {
        let (_temp, db) = open();
        let owner = user("o-1", "owner@example.com", Role::Owner);
        db.create_owner_with_store(&owner, &store("s-1", "Bakery", Some("o-1")))
            .unwrap();
        db.create_store(&store("s-2", "Apothecary", None)).unwrap();
        db.create_user(&user("u-1", "u1@example.com", Role::User))
            .unwrap();
        rate(&db, "u-1", "s-1", 5);

        let listed = db
            .list_stores(&StoreFilter::default(), Sort::default())
            .unwrap();
        assert_eq!(listed[0].store.id, "s-2");
        assert!(listed[0].owner.is_none());
        assert_eq!(listed[1].owner.as_ref().unwrap().email, "owner@example.com");

        let by_rating = db
            .list_stores(
                &StoreFilter::default(),
                Sort::new(StoreSortField::AverageRating, SortDir::Desc),
            )
            .unwrap();
        assert_eq!(by_rating[0].store.id, "s-1");

        let filter = StoreFilter {
            name: Some("BAK".to_string()),
            ..Default::default()
        };
        let found = db.list_stores(&filter, Sort::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].store.name, "Bakery");
    }

    #[test]
    fn test_counts() {
        let (_temp, db) = open();
        db.create_user(&user("u-1", "u1@example.com", Role::User))
            .unwrap();
        db.create_store(&store("s-1", "Bakery", None)).unwrap();
        rate(&db, "u-1", "s-1", 2);

        assert_eq!(db.count_users().unwrap(), 1);
        assert_eq!(db.count_stores().unwrap(), 1);
        assert_eq!(db.count_ratings().unwrap(), 1);
    }
}
