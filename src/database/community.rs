//! Community Repository - organizations, projects and their user sets

use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::BTreeSet;
use tracing::info;

use crate::database::store::{StoreError, StoreResult};
use crate::models::{
    NewOrganization, NewProject, Organization, OrganizationId, Owner, Project, ProjectId,
    Subscribable, UserId,
};

pub struct CommunityRepository {
    pool: PgPool,
}

impl CommunityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.organizations (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                founder_id BIGINT NOT NULL REFERENCES nestor.users(id),
                parent_id BIGINT REFERENCES nestor.organizations(id) ON DELETE CASCADE,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                found_at DATE NOT NULL DEFAULT CURRENT_DATE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nestor.projects (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                slug VARCHAR(255) NOT NULL UNIQUE,
                short_description TEXT NOT NULL DEFAULT '',
                founder_kind VARCHAR(16) NOT NULL,
                founder_id BIGINT NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        for table in [
            "organization_employees",
            "organization_subscribers",
        ] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS nestor.{table} (
                    organization_id BIGINT NOT NULL REFERENCES nestor.organizations(id) ON DELETE CASCADE,
                    user_id BIGINT NOT NULL REFERENCES nestor.users(id) ON DELETE CASCADE,
                    PRIMARY KEY (organization_id, user_id)
                )
            "#
            ))
            .execute(&self.pool)
            .await?;
        }

        for table in ["project_members", "project_subscribers"] {
            sqlx::query(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS nestor.{table} (
                    project_id BIGINT NOT NULL REFERENCES nestor.projects(id) ON DELETE CASCADE,
                    user_id BIGINT NOT NULL REFERENCES nestor.users(id) ON DELETE CASCADE,
                    PRIMARY KEY (project_id, user_id)
                )
            "#
            ))
            .execute(&self.pool)
            .await?;
        }

        info!("Community tables initialized");
        Ok(())
    }

    pub async fn insert_organization(
        &self,
        founder: UserId,
        new: NewOrganization,
    ) -> StoreResult<Organization> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO nestor.organizations (title, slug, description, founder_id, parent_id, found_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
        "#,
        )
        .bind(&new.title)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(founder.get())
        .bind(new.parent.map(|p| p.get()))
        .bind(now.date_naive())
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO nestor.organization_subscribers (organization_id, user_id) VALUES ($1, $2)",
        )
        .bind(id)
        .bind(founder.get())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Organization {
            id: OrganizationId(id),
            title: new.title,
            slug: new.slug,
            description: new.description,
            founder,
            parent: new.parent,
            employees: BTreeSet::new(),
            subscribers: BTreeSet::from([founder]),
            is_active: true,
            found_at: now.date_naive(),
            created_at: now,
        })
    }

    pub async fn get_organization(&self, id: OrganizationId) -> StoreResult<Organization> {
        let row = sqlx::query(
            r#"
            SELECT id, title, slug, description, founder_id, parent_id, is_active, found_at, created_at
            FROM nestor.organizations
            WHERE id = $1
        "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("organization", id))?;

        let employees = self.user_set("organization_employees", "organization_id", id.get()).await?;
        let subscribers = self.user_set("organization_subscribers", "organization_id", id.get()).await?;
        let parent: Option<i64> = row.try_get("parent_id")?;

        Ok(Organization {
            id,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            description: row.try_get("description")?,
            founder: UserId(row.try_get("founder_id")?),
            parent: parent.map(OrganizationId),
            employees,
            subscribers,
            is_active: row.try_get("is_active")?,
            found_at: row.try_get("found_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub async fn insert_project(
        &self,
        founder: Owner,
        subscriber: UserId,
        new: NewProject,
    ) -> StoreResult<Project> {
        let now = Utc::now();
        let (kind, founder_id) = owner_parts(founder);
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO nestor.projects (title, slug, short_description, founder_kind, founder_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        "#,
        )
        .bind(&new.title)
        .bind(&new.slug)
        .bind(&new.short_description)
        .bind(kind)
        .bind(founder_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO nestor.project_subscribers (project_id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(subscriber.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Project {
            id: ProjectId(id),
            title: new.title,
            slug: new.slug,
            short_description: new.short_description,
            founder,
            members: BTreeSet::new(),
            subscribers: BTreeSet::from([subscriber]),
            is_active: true,
            created_at: now,
        })
    }

    pub async fn get_project(&self, id: ProjectId) -> StoreResult<Project> {
        let row = sqlx::query(
            r#"
            SELECT id, title, slug, short_description, founder_kind, founder_id, is_active, created_at
            FROM nestor.projects
            WHERE id = $1
        "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("project", id))?;

        let members = self.user_set("project_members", "project_id", id.get()).await?;
        let subscribers = self.user_set("project_subscribers", "project_id", id.get()).await?;

        Ok(Project {
            id,
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            short_description: row.try_get("short_description")?,
            founder: owner_from_row(&row)?,
            members,
            subscribers,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }

    pub async fn add_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool> {
        let (table, column, id) = subscriber_table(target);
        self.insert_link(table, column, id, user).await
    }

    pub async fn remove_subscriber(&self, target: Subscribable, user: UserId) -> StoreResult<bool> {
        let (table, column, id) = subscriber_table(target);
        let result = sqlx::query(&format!(
            "DELETE FROM nestor.{table} WHERE {column} = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user.get())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn add_project_member(&self, project: ProjectId, user: UserId) -> StoreResult<bool> {
        self.insert_link("project_members", "project_id", project.get(), user)
            .await
    }

    pub async fn add_employee(&self, organization: OrganizationId, user: UserId) -> StoreResult<bool> {
        self.insert_link("organization_employees", "organization_id", organization.get(), user)
            .await
    }

    async fn insert_link(
        &self,
        table: &str,
        column: &str,
        id: i64,
        user: UserId,
    ) -> StoreResult<bool> {
        let result = sqlx::query(&format!(
            "INSERT INTO nestor.{table} ({column}, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(id)
        .bind(user.get())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn user_set(&self, table: &str, column: &str, id: i64) -> StoreResult<BTreeSet<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar(&format!(
            "SELECT user_id FROM nestor.{table} WHERE {column} = $1"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(UserId).collect())
    }
}

fn subscriber_table(target: Subscribable) -> (&'static str, &'static str, i64) {
    match target {
        Subscribable::Organization(id) => ("organization_subscribers", "organization_id", id.get()),
        Subscribable::Project(id) => ("project_subscribers", "project_id", id.get()),
    }
}

fn owner_parts(owner: Owner) -> (&'static str, i64) {
    match owner {
        Owner::User(id) => ("user", id.get()),
        Owner::Organization(id) => ("organization", id.get()),
    }
}

fn owner_from_row(row: &PgRow) -> StoreResult<Owner> {
    let kind: String = row.try_get("founder_kind")?;
    let id: i64 = row.try_get("founder_id")?;
    match kind.as_str() {
        "user" => Ok(Owner::User(UserId(id))),
        "organization" => Ok(Owner::Organization(OrganizationId(id))),
        other => Err(StoreError::Corrupt(format!("unknown project founder kind '{}'", other))),
    }
}
