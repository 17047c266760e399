use std::{collections::BTreeSet, str::FromStr, time::Duration};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    SqlitePool,
};

use crate::{
    errors::AppError,
    structs::{
        Complaint, ComplaintEntry, ComplaintStatus, Due, DueSummary, MonthSummary, Room,
        RoomOverview, TenantCredentials, TenantDetail, TenantOverview, TenantSummary,
    },
    utils::{month_label, TIMESTAMP_FORMAT},
};

pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .read_only(false)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    Ok(SqlitePool::connect_with(opts).await?)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

fn timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

// ---------- rooms ----------

/// Inserts any room numbers not already present. Returns how many were added.
pub async fn seed_rooms(pool: &SqlitePool, room_numbers: &[String]) -> Result<u64, sqlx::Error> {
    let mut added = 0;
    for number in room_numbers {
        added += sqlx::query(
            "INSERT INTO rooms (room_number, status, current_occupancy) VALUES ($1, 'available', 0)
             ON CONFLICT (room_number) DO NOTHING",
        )
        .bind(number)
        .execute(pool)
        .await?
        .rows_affected();
    }
    if added > 0 {
        log::info!("Seeded {} room(s)", added);
    }
    Ok(added)
}

/// Runs on the pool or inside an open transaction.
pub async fn get_room<'e, E>(executor: E, id: i64) -> Result<Option<Room>, sqlx::Error>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Room>(
        "SELECT id, room_number, status, current_occupancy FROM rooms WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn list_rooms(pool: &SqlitePool) -> Result<Vec<RoomOverview>, sqlx::Error> {
    sqlx::query_as::<_, RoomOverview>(
        r#"
        SELECT
            r.id,
            r.room_number,
            r.status,
            r.current_occupancy,
            t.id AS tenant_id,
            t.name AS tenant_name,
            (SELECT COUNT(*) FROM dues d WHERE d.tenant_id = t.id AND d.status = 'pending') AS due_count,
            (SELECT COUNT(*) FROM complaints c WHERE c.tenant_id = t.id AND c.status = 'open') AS complaint_count
        FROM rooms r
        LEFT JOIN tenants t ON r.id = t.room_id
        ORDER BY r.id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

// ---------- tenants ----------

pub struct TenantRecord<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub pwd_hash: &'a str,
    pub phone: Option<&'a str>,
    pub room_id: i64,
    pub deposit: i64,
}

/// Claims the room and inserts the tenant in one transaction. The room must
/// exist and be available.
pub async fn create_tenant(
    pool: &SqlitePool,
    tenant: &TenantRecord<'_>,
    joined_at: NaiveDateTime,
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query(
        "UPDATE rooms SET status = 'occupied', current_occupancy = 1
         WHERE id = $1 AND status = 'available'",
    )
    .bind(tenant.room_id)
    .execute(&mut *tx)
    .await?;

    if claimed.rows_affected() == 0 {
        return Err(match get_room(&mut *tx, tenant.room_id).await? {
            Some(room) => {
                AppError::Conflict(format!("Room {} is already occupied", room.room_number))
            }
            None => AppError::NotFound("Room"),
        });
    }

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO tenants (name, email, pwd_hash, phone, room_id, deposit, joined_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(tenant.name)
    .bind(tenant.email)
    .bind(tenant.pwd_hash)
    .bind(tenant.phone)
    .bind(tenant.room_id)
    .bind(tenant.deposit)
    .bind(timestamp(joined_at))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| AppError::from_constraint(e, "A tenant with this email already exists", "Room"))?;

    tx.commit().await?;
    log::info!("Tenant {} created in room {}", id, tenant.room_id);
    Ok(id)
}

pub async fn get_tenant_detail(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<TenantDetail>, sqlx::Error> {
    sqlx::query_as::<_, TenantDetail>(
        r#"
        SELECT t.id, t.name, t.email, t.phone, t.deposit, t.joined_at, t.room_id, r.room_number
        FROM tenants t
        LEFT JOIN rooms r ON t.room_id = r.id
        WHERE t.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn find_tenant_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<TenantCredentials>, sqlx::Error> {
    sqlx::query_as::<_, TenantCredentials>(
        "SELECT id, name, email, room_id, pwd_hash FROM tenants WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueOrdering {
    NewestFirst,
    PendingFirst,
}

/// Tenant profile with full due and complaint history.
pub async fn get_tenant_overview(
    pool: &SqlitePool,
    id: i64,
    ordering: DueOrdering,
) -> Result<Option<TenantOverview>, sqlx::Error> {
    let Some(tenant) = get_tenant_detail(pool, id).await? else {
        return Ok(None);
    };

    let dues_sql = match ordering {
        DueOrdering::NewestFirst => {
            "SELECT * FROM dues WHERE tenant_id = $1 ORDER BY generated_at DESC, id DESC"
        }
        DueOrdering::PendingFirst => {
            "SELECT * FROM dues WHERE tenant_id = $1
             ORDER BY CASE WHEN status = 'pending' THEN 0 ELSE 1 END, generated_at DESC, id DESC"
        }
    };
    let dues = sqlx::query_as::<_, Due>(dues_sql)
        .bind(id)
        .fetch_all(pool)
        .await?;

    let complaints = sqlx::query_as::<_, Complaint>(
        "SELECT * FROM complaints WHERE tenant_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(TenantOverview {
        tenant,
        dues,
        complaints,
    }))
}

/// Deletes the tenant (dues and complaints cascade) and frees the room in the
/// same transaction.
pub async fn delete_tenant(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let room_id =
        sqlx::query_scalar::<_, i64>("DELETE FROM tenants WHERE id = $1 RETURNING room_id")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Tenant"))?;

    sqlx::query("UPDATE rooms SET status = 'available', current_occupancy = 0 WHERE id = $1")
        .bind(room_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    log::info!("Tenant with id {} deleted, room {} freed", id, room_id);
    Ok(())
}

// ---------- dues ----------

pub async fn create_due(
    pool: &SqlitePool,
    tenant_id: i64,
    amount: i64,
    month: &str,
    due_date: NaiveDate,
    generated_at: NaiveDateTime,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO dues (tenant_id, amount, month, due_date, status, generated_at)
         VALUES ($1, $2, $3, $4, 'pending', $5) RETURNING id",
    )
    .bind(tenant_id)
    .bind(amount)
    .bind(month)
    .bind(due_date.to_string())
    .bind(timestamp(generated_at))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        AppError::from_constraint(e, "A due for this tenant and month already exists", "Tenant")
    })?;

    log::info!("Due {} ({}, {}) added for tenant {}", id, month, amount, tenant_id);
    Ok(id)
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDues {
    pub month: String,
    pub generated: u64,
}

/// Monthly rent run. Only allowed up to `cutoff_day` of the month; every
/// tenant without a due for the current month label gets one pending due of
/// `amount`. The existence check and the insert are a single statement, and
/// the `(tenant_id, month)` unique constraint absorbs any concurrent run.
pub async fn generate_monthly_dues(
    pool: &SqlitePool,
    now: NaiveDateTime,
    cutoff_day: u32,
    amount: i64,
) -> Result<GeneratedDues, AppError> {
    let today = now.date();
    if today.day() > cutoff_day {
        return Err(AppError::GenerationWindowClosed { cutoff_day });
    }

    let month = month_label(today);
    let generated = sqlx::query(
        r#"
        INSERT INTO dues (tenant_id, amount, month, due_date, status, generated_at)
        SELECT t.id, $1, $2, $3, 'pending', $4
        FROM tenants t
        WHERE NOT EXISTS (
            SELECT 1 FROM dues d WHERE d.tenant_id = t.id AND d.month = $2
        )
        ON CONFLICT (tenant_id, month) DO NOTHING
        "#,
    )
    .bind(amount)
    .bind(&month)
    .bind(today.to_string())
    .bind(timestamp(now))
    .execute(pool)
    .await?
    .rows_affected();

    log::info!("Generated {} due(s) for {}", generated, month);
    Ok(GeneratedDues { month, generated })
}

/// Marks one due paid. Returns whether the status changed; an already-paid due
/// is left alone.
pub async fn mark_due_paid(pool: &SqlitePool, id: i64) -> Result<bool, AppError> {
    let changed = sqlx::query("UPDATE dues SET status = 'paid' WHERE id = $1 AND status = 'pending'")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if changed == 0 {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM dues WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Due"));
        }
        return Ok(false);
    }

    log::info!("Due {} marked paid", id);
    Ok(true)
}

/// All-or-nothing bulk payment. If any id is unknown nothing is changed.
pub async fn mark_dues_paid(pool: &SqlitePool, ids: &[i64]) -> Result<u64, AppError> {
    if ids.is_empty() {
        return Err(AppError::Validation("At least one due ID is required".to_owned()));
    }

    let ids: BTreeSet<i64> = ids.iter().copied().collect();
    let mut tx = pool.begin().await?;
    let mut missing = Vec::new();
    let mut updated = 0;

    for &id in &ids {
        let changed =
            sqlx::query("UPDATE dues SET status = 'paid' WHERE id = $1 AND status = 'pending'")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if changed == 0 {
            let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM dues WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                missing.push(id);
            }
        }
        updated += changed;
    }

    if !missing.is_empty() {
        tx.rollback().await?;
        return Err(AppError::MissingDues(missing));
    }

    tx.commit().await?;
    log::info!("{} due(s) marked paid in bulk", updated);
    Ok(updated)
}

pub async fn pending_by_month(pool: &SqlitePool) -> Result<Vec<MonthSummary>, sqlx::Error> {
    sqlx::query_as::<_, MonthSummary>(
        r#"
        SELECT month, COUNT(id) AS count, SUM(amount) AS total
        FROM dues
        WHERE status = 'pending'
        GROUP BY month
        ORDER BY MAX(generated_at) DESC, month ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn pending_by_tenant(pool: &SqlitePool) -> Result<Vec<TenantSummary>, sqlx::Error> {
    sqlx::query_as::<_, TenantSummary>(
        r#"
        SELECT
            t.id AS tenant_id,
            t.name,
            t.room_id,
            r.room_number,
            SUM(d.amount) AS total_due,
            group_concat(d.month, ', ') AS months
        FROM dues d
        JOIN tenants t ON d.tenant_id = t.id
        JOIN rooms r ON t.room_id = r.id
        WHERE d.status = 'pending'
        GROUP BY t.id, t.name, t.room_id, r.room_number
        ORDER BY total_due DESC, t.id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn due_summary(pool: &SqlitePool) -> Result<DueSummary, sqlx::Error> {
    Ok(DueSummary {
        by_month: pending_by_month(pool).await?,
        by_tenant: pending_by_tenant(pool).await?,
    })
}

// ---------- complaints ----------

pub async fn list_complaints(pool: &SqlitePool) -> Result<Vec<ComplaintEntry>, sqlx::Error> {
    sqlx::query_as::<_, ComplaintEntry>(
        r#"
        SELECT c.id, c.title, c.description, c.status, c.created_at,
               t.name AS tenant_name, r.room_number
        FROM complaints c
        JOIN tenants t ON c.tenant_id = t.id
        JOIN rooms r ON t.room_id = r.id
        ORDER BY
            CASE WHEN c.status = 'open' THEN 1 ELSE 2 END,
            c.created_at DESC,
            c.id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn create_complaint(
    pool: &SqlitePool,
    tenant_id: i64,
    title: &str,
    description: &str,
    created_at: NaiveDateTime,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO complaints (tenant_id, title, description, status, created_at)
         VALUES ($1, $2, $3, 'open', $4) RETURNING id",
    )
    .bind(tenant_id)
    .bind(title)
    .bind(description)
    .bind(timestamp(created_at))
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_constraint(e, "Complaint already exists", "Tenant"))?;

    log::info!("Complaint {} raised by tenant {}", id, tenant_id);
    Ok(id)
}

pub async fn update_complaint_status(
    pool: &SqlitePool,
    id: i64,
    status: ComplaintStatus,
) -> Result<(), AppError> {
    let changed = sqlx::query("UPDATE complaints SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if changed == 0 {
        return Err(AppError::NotFound("Complaint"));
    }
    log::info!("Complaint {} set to {:?}", id, status);
    Ok(())
}
