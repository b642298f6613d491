//! PostgreSQL implementation of the repositories.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgPoolOptions;

use super::*;

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "gpm";
pub const DEFAULT_POOL_SIZE: u32 = 10;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, matricola, is_staff, is_superuser, group_id, date_joined";
const GROUP_COLUMNS: &str = "id, name, topic_id, link_django, link_tui, link_gui";

/// PostgreSQL store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new [`PgStore`] on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Init database connections.
    pub async fn connect(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> std::result::Result<Self, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new().max_connections(pool);
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(Self::new(postgres))
    }

    /// Execute migrations scripts.
    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

fn unique_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        "users_username_key" => Some("username"),
        "users_email_key" => Some("email"),
        "users_matricola_key" => Some("matricola"),
        "user_groups_user_id_group_id_key" => Some("group"),
        _ => None,
    }
}

fn reference_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        "group_projects_topic_id_fkey" => Some("topic"),
        "users_group_id_fkey" => Some("group"),
        "group_goals_group_id_fkey" | "user_groups_group_id_fkey" => Some("group"),
        "group_goals_goal_id_fkey" => Some("goal"),
        "user_groups_user_id_fkey" => Some("user"),
        _ => None,
    }
}

/// Map constraint violations raised by an insert or an update.
fn write_error(err: sqlx::Error) -> StoreError {
    if let Some(db) = err.as_database_error() {
        let field = db.constraint().and_then(|constraint| match db.kind() {
            ErrorKind::UniqueViolation => {
                unique_field(constraint).map(|field| StoreError::Unique { field })
            },
            ErrorKind::ForeignKeyViolation => reference_field(constraint)
                .map(|field| StoreError::MissingReference { field }),
            _ => None,
        });
        if let Some(mapped) = field {
            return mapped;
        }
    }
    StoreError::Sql(err)
}

/// Map restrict-on-delete violations.
fn delete_error(entity: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        let kind = err.as_database_error().map(|db| db.kind());
        match kind {
            Some(ErrorKind::ForeignKeyViolation) => StoreError::Protected { entity },
            _ => StoreError::Sql(err),
        }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        Ok(sqlx::query_as::<_, User>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_user(&self, user: &User) -> Result<User> {
        let query = format!(
            r#"INSERT INTO users (username, email, first_name, last_name, matricola, is_staff, is_superuser, date_joined)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {USER_COLUMNS}"#
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.matricola)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .bind(user.date_joined)
            .fetch_one(&self.pool)
            .await
            .map_err(write_error)
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE users
                SET username = $2, email = $3, first_name = $4, last_name = $5,
                    matricola = $6, is_staff = $7, is_superuser = $8
                WHERE id = $1"#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.matricola)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(delete_error("user"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn claim_user_group(&self, id: UserId, group: GroupId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET group_id = $2 WHERE id = $1 AND group_id IS NULL",
        )
        .bind(id)
        .bind(group)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl TopicRepository for PgStore {
    async fn list_topics(&self) -> Result<Vec<Topic>> {
        Ok(sqlx::query_as::<_, Topic>("SELECT id, title FROM topics ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_topic(&self, id: TopicId) -> Result<Option<Topic>> {
        Ok(sqlx::query_as::<_, Topic>("SELECT id, title FROM topics WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<Topic> {
        sqlx::query_as::<_, Topic>(
            "INSERT INTO topics (title) VALUES ($1) RETURNING id, title",
        )
        .bind(&topic.title)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn update_topic(&self, topic: &Topic) -> Result<bool> {
        let result = sqlx::query("UPDATE topics SET title = $2 WHERE id = $1")
            .bind(topic.id)
            .bind(&topic.title)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_topic(&self, id: TopicId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(delete_error("topic"))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl GoalRepository for PgStore {
    async fn list_goals(&self) -> Result<Vec<Goal>> {
        Ok(sqlx::query_as::<_, Goal>(
            "SELECT id, title, description, points FROM goals ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        Ok(sqlx::query_as::<_, Goal>(
            "SELECT id, title, description, points FROM goals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_goal(&self, goal: &Goal) -> Result<Goal> {
        sqlx::query_as::<_, Goal>(
            r#"INSERT INTO goals (title, description, points) VALUES ($1, $2, $3)
                RETURNING id, title, description, points"#,
        )
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.points)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn update_goal(&self, goal: &Goal) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE goals SET title = $2, description = $3, points = $4 WHERE id = $1",
        )
        .bind(goal.id)
        .bind(&goal.title)
        .bind(&goal.description)
        .bind(goal.points)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_goal(&self, id: GoalId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM goals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(delete_error("goal"))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl GroupRepository for PgStore {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM group_projects ORDER BY id");
        Ok(sqlx::query_as::<_, Group>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM group_projects WHERE id = $1");
        Ok(sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_group(&self, group: &Group) -> Result<Group> {
        let query = format!(
            r#"INSERT INTO group_projects (name, topic_id, link_django, link_tui, link_gui)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {GROUP_COLUMNS}"#
        );
        sqlx::query_as::<_, Group>(&query)
            .bind(&group.name)
            .bind(group.topic)
            .bind(&group.link_django)
            .bind(&group.link_tui)
            .bind(&group.link_gui)
            .fetch_one(&self.pool)
            .await
            .map_err(write_error)
    }

    async fn update_group(&self, group: &Group) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE group_projects
                SET name = $2, topic_id = $3, link_django = $4, link_tui = $5, link_gui = $6
                WHERE id = $1"#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(group.topic)
        .bind(&group.link_django)
        .bind(&group.link_tui)
        .bind(&group.link_gui)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM group_projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(delete_error("group"))?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl GroupGoalRepository for PgStore {
    async fn list_group_goals(&self) -> Result<Vec<GroupGoal>> {
        Ok(sqlx::query_as::<_, GroupGoal>(
            "SELECT id, group_id, goal_id, complete FROM group_goals ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_group_goal(&self, id: i64) -> Result<Option<GroupGoal>> {
        Ok(sqlx::query_as::<_, GroupGoal>(
            "SELECT id, group_id, goal_id, complete FROM group_goals WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_group_goal(&self, record: &GroupGoal) -> Result<GroupGoal> {
        sqlx::query_as::<_, GroupGoal>(
            r#"INSERT INTO group_goals (group_id, goal_id, complete) VALUES ($1, $2, $3)
                RETURNING id, group_id, goal_id, complete"#,
        )
        .bind(record.group)
        .bind(record.goal)
        .bind(record.complete)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn update_group_goal(&self, record: &GroupGoal) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE group_goals SET group_id = $2, goal_id = $3, complete = $4 WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.group)
        .bind(record.goal)
        .bind(record.complete)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_group_goal(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM group_goals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl UserGroupRepository for PgStore {
    async fn list_user_groups(&self) -> Result<Vec<UserGroup>> {
        Ok(sqlx::query_as::<_, UserGroup>(
            "SELECT id, user_id, group_id FROM user_groups ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_user_group(&self, id: i64) -> Result<Option<UserGroup>> {
        Ok(sqlx::query_as::<_, UserGroup>(
            "SELECT id, user_id, group_id FROM user_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_user_group(&self, user: UserId, group: GroupId) -> Result<UserGroup> {
        sqlx::query_as::<_, UserGroup>(
            r#"INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)
                RETURNING id, user_id, group_id"#,
        )
        .bind(user)
        .bind(group)
        .fetch_one(&self.pool)
        .await
        .map_err(write_error)
    }

    async fn update_user_group(&self, record: &UserGroup) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE user_groups SET user_id = $2, group_id = $3 WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.user)
        .bind(record.group)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_user_group(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_groups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_membership(&self, user: UserId, group: GroupId) -> Result<Option<UserGroup>> {
        Ok(sqlx::query_as::<_, UserGroup>(
            "SELECT id, user_id, group_id FROM user_groups WHERE user_id = $1 AND group_id = $2",
        )
        .bind(user)
        .bind(group)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_membership(&self, user: UserId, group: GroupId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_id = $2")
            .bind(user)
            .bind(group)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn groups_of(&self, user: UserId) -> Result<Vec<GroupId>> {
        Ok(sqlx::query_scalar::<_, GroupId>(
            "SELECT group_id FROM user_groups WHERE user_id = $1 ORDER BY group_id",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }
}
