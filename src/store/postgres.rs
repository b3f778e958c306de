use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::{EventStore, SeriesChange, UserStore};
use crate::error::{AppError, AppResult};
use crate::models::{Event, EventSeries, User};

const EVENT_COLUMNS: &str = "id, title, location, short_description, long_description, \
     start_date, start_time, end_date, end_time, is_all_day, repeat, series_id, \
     published, date_published, creator_id, created_at, updated_at";

const USER_COLUMNS: &str = "id, external_id, name, email, image_url, edit, publish, admin, created_at";

pub async fn connect(database_url: &str, pool_size: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations...");
    sqlx::migrate!("./src/migrations").run(pool).await?;
    info!("Migrations completed");
    Ok(())
}

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert_event(tx: &mut Transaction<'_, Postgres>, event: &Event) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, title, location, short_description, long_description,
                                start_date, start_time, end_date, end_time, is_all_day,
                                repeat, series_id, published, date_published, creator_id,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                location = EXCLUDED.location,
                short_description = EXCLUDED.short_description,
                long_description = EXCLUDED.long_description,
                start_date = EXCLUDED.start_date,
                start_time = EXCLUDED.start_time,
                end_date = EXCLUDED.end_date,
                end_time = EXCLUDED.end_time,
                is_all_day = EXCLUDED.is_all_day,
                repeat = EXCLUDED.repeat,
                series_id = EXCLUDED.series_id,
                published = EXCLUDED.published,
                date_published = EXCLUDED.date_published,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.location)
        .bind(&event.short_description)
        .bind(&event.long_description)
        .bind(event.start_date)
        .bind(event.start_time)
        .bind(event.end_date)
        .bind(event.end_time)
        .bind(event.is_all_day)
        .bind(event.repeat)
        .bind(event.series_id)
        .bind(event.published)
        .bind(event.date_published)
        .bind(event.creator_id)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn upsert_series(
        tx: &mut Transaction<'_, Postgres>,
        series: &EventSeries,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO event_series (id, root_event_id, member_ids, rule)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                root_event_id = EXCLUDED.root_event_id,
                member_ids = EXCLUDED.member_ids,
                rule = EXCLUDED.rule
            "#,
        )
        .bind(series.id)
        .bind(series.root_event_id)
        .bind(&series.members)
        .bind(&series.rule)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    async fn count_by_id(&self, id: Uuid) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM events WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn save(&self, event: &Event) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::upsert_event(&mut tx, event).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all(&self) -> AppResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events ORDER BY seq",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    async fn get_series(&self, id: Uuid) -> AppResult<Option<EventSeries>> {
        let series = sqlx::query_as::<_, EventSeries>(
            "SELECT id, root_event_id, member_ids, rule FROM event_series WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(series)
    }

    async fn commit(&self, change: SeriesChange) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        for series in &change.save_series {
            Self::upsert_series(&mut tx, series).await?;
        }
        for event in &change.save_events {
            Self::upsert_event(&mut tx, event).await?;
        }
        if !change.delete_events.is_empty() {
            sqlx::query("DELETE FROM events WHERE id = ANY($1)")
                .bind(&change.delete_events)
                .execute(&mut *tx)
                .await?;
        }
        if !change.delete_series.is_empty() {
            sqlx::query("DELETE FROM event_series WHERE id = ANY($1)")
                .bind(&change.delete_series)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn series_members(&self, series: &EventSeries) -> AppResult<Vec<Event>> {
        // array_position keeps the series order in a single round trip
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = ANY($1) ORDER BY array_position($1, id)",
            EVENT_COLUMNS
        ))
        .bind(&series.members)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_external_id(&self, external_id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE external_id = $1",
            USER_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, external_id, name, email, image_url, edit, publish, admin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                external_id = EXCLUDED.external_id,
                name = EXCLUDED.name,
                email = EXCLUDED.email,
                image_url = EXCLUDED.image_url,
                edit = EXCLUDED.edit,
                publish = EXCLUDED.publish,
                admin = EXCLUDED.admin
            "#,
        )
        .bind(user.id)
        .bind(&user.external_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.image_url)
        .bind(user.privileges.edit)
        .bind(user.privileges.publish)
        .bind(user.privileges.admin)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Validation(format!(
                "email {} or its login is already linked to another account",
                user.email
            )),
            other => AppError::Database(other),
        })?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn all(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
