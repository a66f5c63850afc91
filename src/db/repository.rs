//! Persistence operations. Every task operation takes the owner's id and
//! scopes its SQL with `user_id = ?`; nothing here can touch another user's
//! rows.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, TaskStatus, User};
use crate::validation::{NewTask, SortField, TaskChanges, TaskFilter, ValidationErrors};

const TASK_COLUMNS: &str = "id, user_id, title, description, status, priority, due_date, \
                            tags, is_completed, completed_at, created_at, updated_at";

pub async fn insert_user(
    db: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await;

    match result {
        Ok(_) => Ok(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now.clone(),
            updated_at: now,
        }),
        // The UNIQUE index on email is the backstop for concurrent registrations.
        Err(e) if is_unique_violation(&e) => {
            Err(AppError::Conflict("Email is already registered".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn find_user_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash, created_at, updated_at \
         FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_user_by_id(db: &SqlitePool, id: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, name, email, password_hash, created_at, updated_at \
         FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn insert_task(
    db: &SqlitePool,
    owner_id: &str,
    new: NewTask,
) -> Result<Task, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    // isCompleted/completedAt are derived from status, never client-supplied.
    let is_completed = new.status == TaskStatus::Completed;
    let completed_at = is_completed.then(|| now.clone());

    let tags_json = serde_json::to_string(&new.tags).map_err(|_| AppError::InternalServerError)?;

    sqlx::query(
        "INSERT INTO tasks \
            (id, user_id, title, description, status, priority, due_date, \
             tags, is_completed, completed_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(owner_id)
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.status.as_str())
    .bind(new.priority.as_str())
    .bind(&new.due_date)
    .bind(&tags_json)
    .bind(is_completed)
    .bind(&completed_at)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Task {
        id,
        user_id: owner_id.to_string(),
        title: new.title,
        description: new.description,
        status: new.status,
        priority: new.priority,
        due_date: new.due_date,
        tags: new.tags,
        is_completed,
        completed_at,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn fetch_tasks(
    db: &SqlitePool,
    owner_id: &str,
    filter: &TaskFilter,
) -> Result<Vec<Task>, AppError> {
    // Bound filters use `(? IS NULL OR ...)` so one statement covers every
    // combination; only the ORDER BY clause varies, and it comes from the
    // validated sort whitelist.
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks \
         WHERE user_id = ?1 \
           AND (?2 IS NULL OR status = ?2) \
           AND (?3 IS NULL OR priority = ?3) \
           AND (?4 IS NULL OR (due_date IS NOT NULL AND due_date <= ?4)) \
           AND (?5 IS NULL OR (due_date IS NOT NULL AND due_date >= ?5)) \
         ORDER BY {}",
        order_clause(filter)
    );

    let tasks = sqlx::query_as::<_, Task>(&sql)
        .bind(owner_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(&filter.due_before)
        .bind(&filter.due_after)
        .fetch_all(db)
        .await?;
    Ok(tasks)
}

pub async fn find_task(
    db: &SqlitePool,
    owner_id: &str,
    id: &str,
) -> Result<Option<Task>, AppError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?");
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await?;
    Ok(task)
}

pub async fn update_task(
    db: &SqlitePool,
    owner_id: &str,
    id: &str,
    changes: TaskChanges,
) -> Result<Option<Task>, AppError> {
    let mut current = match find_task(db, owner_id, id).await? {
        Some(task) => task,
        None => return Ok(None),
    };

    if let Some(status) = changes.status {
        if current.status.is_terminal() && status != current.status {
            let mut errors = ValidationErrors::new();
            errors.add(
                "status",
                format!("Cannot change status of a {} task", current.status),
            );
            return Err(AppError::Validation(errors));
        }
        current.status = status;
    }

    if let Some(title) = changes.title {
        current.title = title;
    }
    if let Some(description) = changes.description {
        current.description = description;
    }
    if let Some(priority) = changes.priority {
        current.priority = priority;
    }
    if let Some(due_date) = changes.due_date {
        current.due_date = due_date;
    }
    if let Some(tags) = changes.tags {
        current.tags = tags;
    }

    let now = Utc::now().to_rfc3339();
    current.updated_at = now.clone();

    current.is_completed = current.status == TaskStatus::Completed;
    if current.is_completed {
        // Keep the original completion time on no-op re-assertions.
        current.completed_at.get_or_insert(now);
    } else {
        current.completed_at = None;
    }

    let tags_json =
        serde_json::to_string(&current.tags).map_err(|_| AppError::InternalServerError)?;

    sqlx::query(
        "UPDATE tasks \
         SET title = ?, description = ?, status = ?, priority = ?, due_date = ?, \
             tags = ?, is_completed = ?, completed_at = ?, updated_at = ? \
         WHERE id = ? AND user_id = ?",
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(current.status.as_str())
    .bind(current.priority.as_str())
    .bind(&current.due_date)
    .bind(&tags_json)
    .bind(current.is_completed)
    .bind(&current.completed_at)
    .bind(&current.updated_at)
    .bind(id)
    .bind(owner_id)
    .execute(db)
    .await?;

    Ok(Some(current))
}

pub async fn delete_task(db: &SqlitePool, owner_id: &str, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn order_clause(filter: &TaskFilter) -> String {
    let sort = match filter.sort {
        Some(sort) => sort,
        None => return "created_at DESC".to_string(),
    };

    let dir = if sort.descending { "DESC" } else { "ASC" };
    match sort.field {
        SortField::CreatedAt => format!("created_at {dir}"),
        SortField::UpdatedAt => format!("updated_at {dir}, created_at DESC"),
        SortField::Title => format!("title {dir}, created_at DESC"),
        // Undated tasks always sort after dated ones.
        SortField::DueDate => format!("due_date IS NULL, due_date {dir}, created_at DESC"),
        SortField::Priority => format!(
            "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 \
             WHEN 'high' THEN 2 WHEN 'urgent' THEN 3 END {dir}, created_at DESC"
        ),
        SortField::Status => format!(
            "CASE status WHEN 'pending' THEN 0 WHEN 'in-progress' THEN 1 \
             WHEN 'completed' THEN 2 WHEN 'cancelled' THEN 3 END {dir}, created_at DESC"
        ),
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
