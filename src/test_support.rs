use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tempfile::TempDir;

use crate::db::{self, TenantRecord};

/// A fresh in-memory database with migrations applied. One connection, since
/// every `:memory:` connection is its own database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    db::migrate(&pool).await.expect("migrations");
    pool
}

/// A migrated database in a temporary file, opened through [`db::connect`] so
/// it gets the production pool with several connections. Keep the directory
/// alive for as long as the pool is used.
pub async fn file_pool() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("pg_manager.db").display());
    let pool = db::connect(&url).await.expect("file sqlite");
    db::migrate(&pool).await.expect("migrations");
    (dir, pool)
}

pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .expect("valid test date")
}

/// Tenant with an unusable password hash; tests that log in use
/// [`seed_tenant_with_password`].
pub async fn seed_tenant(pool: &SqlitePool, name: &str, email: &str, room_id: i64) -> i64 {
    seed_tenant_hashed(pool, name, email, room_id, "!").await
}

pub async fn seed_tenant_with_password(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    room_id: i64,
    password: &str,
) -> i64 {
    let hash = crate::utils::hash_password(password).expect("hash");
    seed_tenant_hashed(pool, name, email, room_id, &hash).await
}

async fn seed_tenant_hashed(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    room_id: i64,
    pwd_hash: &str,
) -> i64 {
    let record = TenantRecord {
        name,
        email,
        pwd_hash,
        phone: None,
        room_id,
        deposit: 10000,
    };
    db::create_tenant(pool, &record, at(2025, 11, 1))
        .await
        .expect("seed tenant")
}

pub const OWNER_EMAIL: &str = "owner@pg.test";
pub const OWNER_PASSWORD: &str = "owner-secret";

pub fn test_config() -> crate::config::Config {
    crate::config::Config {
        database_url: "sqlite::memory:".to_owned(),
        bind_addr: "127.0.0.1".to_owned(),
        port: 0,
        session_key: actix_web::cookie::Key::generate(),
        cookie_secure: false,
        owner_email: OWNER_EMAIL.to_owned(),
        owner_password: OWNER_PASSWORD.to_owned(),
        due_cutoff_day: 5,
        default_rent: 5000,
        room_numbers: Vec::new(),
    }
}
