//! Vote Repository - votes and denormalized rating writes
//!
//! Votes for all three target kinds share one table keyed by
//! `(voter_id, target_kind, target_id)`. The primary key is what enforces
//! one vote per voter and target when requests race.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::database::store::{StoreError, StoreResult, SubRatings};
use crate::models::{TargetKind, UserId, Vote, VoteTarget, VoteValue, VoteableRef};

pub struct VoteRepository {
    pool: PgPool,
}

impl VoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.votes (
                voter_id BIGINT NOT NULL REFERENCES nestor.users(id) ON DELETE CASCADE,
                target_kind VARCHAR(16) NOT NULL,
                target_id BIGINT NOT NULL,
                value SMALLINT NOT NULL CHECK (value IN (-1, 1)),
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                PRIMARY KEY (voter_id, target_kind, target_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_votes_target ON nestor.votes(target_kind, target_id)",
        )
        .execute(&self.pool)
        .await?;

        info!("Votes table initialized");
        Ok(())
    }

    pub async fn for_target(&self, target: VoteTarget) -> StoreResult<Vec<Vote>> {
        let rows = sqlx::query(
            r#"
            SELECT voter_id, target_kind, target_id, value, created_at
            FROM nestor.votes
            WHERE target_kind = $1 AND target_id = $2
            ORDER BY created_at, voter_id
        "#,
        )
        .bind(target.kind().as_str())
        .bind(target.raw_id())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(vote_from_row).collect()
    }

    /// Insert unless the voter already voted on the target; the existing
    /// vote is returned untouched in that case.
    pub async fn create_if_absent(
        &self,
        voter: UserId,
        target: VoteTarget,
        value: VoteValue,
    ) -> StoreResult<(Vote, bool)> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO nestor.votes (voter_id, target_kind, target_id, value, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (voter_id, target_kind, target_id) DO NOTHING
            RETURNING voter_id, target_kind, target_id, value, created_at
        "#,
        )
        .bind(voter.get())
        .bind(target.kind().as_str())
        .bind(target.raw_id())
        .bind(value.signed() as i16)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((vote_from_row(&row)?, true));
        }

        let existing = sqlx::query(
            r#"
            SELECT voter_id, target_kind, target_id, value, created_at
            FROM nestor.votes
            WHERE voter_id = $1 AND target_kind = $2 AND target_id = $3
        "#,
        )
        .bind(voter.get())
        .bind(target.kind().as_str())
        .bind(target.raw_id())
        .fetch_one(&self.pool)
        .await?;

        debug!(voter = %voter, target = %target, "Vote already present");
        Ok((vote_from_row(&existing)?, false))
    }

    /// Write the rating of a recalculated entity in a single statement
    pub async fn save_rating(&self, entity: VoteableRef<'_>) -> StoreResult<()> {
        let (sql, id, rating) = match entity {
            VoteableRef::Publication(p) => (
                "UPDATE nestor.publications SET rating = $2, updated_at = NOW() WHERE id = $1",
                p.id.get(),
                p.rating,
            ),
            VoteableRef::Comment(c) => (
                "UPDATE nestor.comments SET rating = $2 WHERE id = $1",
                c.id.get(),
                c.rating,
            ),
            VoteableRef::User(u) => (
                "UPDATE nestor.users SET vote_rating = $2 WHERE id = $1",
                u.id.get(),
                u.vote_rating,
            ),
        };

        let result = sqlx::query(sql)
            .bind(id)
            .bind(rating)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            let target = entity.vote_target();
            return Err(StoreError::not_found(target.kind().as_str(), target.raw_id()));
        }
        Ok(())
    }

    /// Re-sum a target's votes into its cached rating in one transaction.
    /// The row lock comes first so the sum sees every vote committed by a
    /// recount that held the lock before it.
    pub async fn recount_rating(&self, target: VoteTarget) -> StoreResult<i64> {
        let (table, column, touch) = match target {
            VoteTarget::Publication(_) => ("publications", "rating", ", updated_at = NOW()"),
            VoteTarget::Comment(_) => ("comments", "rating", ""),
            VoteTarget::User(_) => ("users", "vote_rating", ""),
        };

        let mut tx = self.pool.begin().await?;

        let locked: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT id FROM nestor.{table} WHERE id = $1 FOR UPDATE"
        ))
        .bind(target.raw_id())
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Err(StoreError::not_found(target.kind().as_str(), target.raw_id()));
        }

        let rating: i64 = sqlx::query_scalar(&format!(
            r#"
            UPDATE nestor.{table}
            SET {column} = (
                SELECT COALESCE(SUM(value), 0) FROM nestor.votes
                WHERE target_kind = $2 AND target_id = $1
            ){touch}
            WHERE id = $1
            RETURNING {column}
        "#
        ))
        .bind(target.raw_id())
        .bind(target.kind().as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(target = %target, rating = rating, "Recounted rating");
        Ok(rating)
    }

    pub async fn sub_ratings(&self, user: UserId) -> StoreResult<SubRatings> {
        let publication_ratings: Vec<i64> =
            sqlx::query_scalar("SELECT rating FROM nestor.publications WHERE author_id = $1")
                .bind(user.get())
                .fetch_all(&self.pool)
                .await?;

        let comment_ratings: Vec<i64> =
            sqlx::query_scalar("SELECT rating FROM nestor.comments WHERE author_id = $1")
                .bind(user.get())
                .fetch_all(&self.pool)
                .await?;

        Ok(SubRatings {
            publication_ratings,
            comment_ratings,
        })
    }
}

fn vote_from_row(row: &PgRow) -> StoreResult<Vote> {
    let kind: String = row.try_get("target_kind")?;
    let kind = TargetKind::parse(&kind)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown vote target kind '{}'", kind)))?;
    let value: i16 = row.try_get("value")?;
    let value = VoteValue::from_signed(value as i64)
        .ok_or_else(|| StoreError::Corrupt(format!("vote value {} out of range", value)))?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Vote {
        voter: UserId(row.try_get("voter_id")?),
        target: VoteTarget::from_parts(kind, row.try_get("target_id")?),
        value,
        created_at,
    })
}
