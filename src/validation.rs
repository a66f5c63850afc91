//! Pure input validation for the API surface.
//!
//! Everything here is storage-free: validators take raw request DTOs and
//! produce either a validated value (trimmed, defaulted, normalized) or a
//! field → message map. The repository and handlers never re-implement these
//! rules.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{
    LoginRequest, NewTaskRequest, RegisterRequest, TaskListQuery, TaskPriority, TaskStatus,
    UpdateTaskRequest,
};

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const NAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 128;

/// Field-keyed validation failures. Keys are the wire names (`dueDate`, not
/// `due_date`) so clients can match errors to the fields they sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

/// A create payload that passed §4.1: trimmed text, parsed enums, defaults
/// applied. Ready for the repository to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
}

/// A validated partial update. `None` means "leave unchanged"; for
/// `due_date`, `Some(None)` means "clear".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// Validated list parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_before: Option<String>,
    pub due_after: Option<String>,
    pub sort: Option<TaskSort>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: SortField,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

/// Validated registration payload. Email is lowercased so lookups are
/// case-insensitive; the password is kept verbatim (whitespace significant).
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Validated login payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn validate_new_task(req: &NewTaskRequest) -> Result<NewTask, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = req.title.as_deref().unwrap_or_default().trim();
    if title.is_empty() {
        errors.add("title", "Task title is required");
    } else if title.chars().count() > TITLE_MAX {
        errors.add("title", "Title cannot exceed 100 characters");
    }

    let description = req.description.as_deref().unwrap_or_default().trim();
    if description.is_empty() {
        errors.add("description", "Task description is required");
    } else if description.chars().count() > DESCRIPTION_MAX {
        errors.add("description", "Description cannot exceed 500 characters");
    }

    let status = match req.status.as_deref() {
        None => TaskStatus::Pending,
        Some(raw) => TaskStatus::from_str(raw.trim()).unwrap_or_else(|| {
            errors.add(
                "status",
                "Status must be one of: pending, in-progress, completed, cancelled",
            );
            TaskStatus::Pending
        }),
    };

    let priority = match req.priority.as_deref() {
        None => TaskPriority::Medium,
        Some(raw) => TaskPriority::from_str(raw.trim()).unwrap_or_else(|| {
            errors.add("priority", "Priority must be one of: low, medium, high, urgent");
            TaskPriority::Medium
        }),
    };

    let due_date = match req.due_date.as_deref() {
        None => None,
        Some(raw) => {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.add(
                    "dueDate",
                    "Due date must be an RFC 3339 datetime or a YYYY-MM-DD date",
                );
            }
            parsed
        }
    };

    let tags = normalize_tags(req.tags.as_deref());

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewTask {
        title: title.to_string(),
        description: description.to_string(),
        status,
        priority,
        due_date,
        tags,
    })
}

pub fn validate_task_update(req: &UpdateTaskRequest) -> Result<TaskChanges, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut changes = TaskChanges::default();

    if let Some(raw) = req.title.as_deref() {
        let title = raw.trim();
        if title.is_empty() {
            errors.add("title", "Task title is required");
        } else if title.chars().count() > TITLE_MAX {
            errors.add("title", "Title cannot exceed 100 characters");
        } else {
            changes.title = Some(title.to_string());
        }
    }

    if let Some(raw) = req.description.as_deref() {
        let description = raw.trim();
        if description.is_empty() {
            errors.add("description", "Task description is required");
        } else if description.chars().count() > DESCRIPTION_MAX {
            errors.add("description", "Description cannot exceed 500 characters");
        } else {
            changes.description = Some(description.to_string());
        }
    }

    if let Some(raw) = req.status.as_deref() {
        match TaskStatus::from_str(raw.trim()) {
            Some(status) => changes.status = Some(status),
            None => errors.add(
                "status",
                "Status must be one of: pending, in-progress, completed, cancelled",
            ),
        }
    }

    if let Some(raw) = req.priority.as_deref() {
        match TaskPriority::from_str(raw.trim()) {
            Some(priority) => changes.priority = Some(priority),
            None => {
                errors.add("priority", "Priority must be one of: low, medium, high, urgent")
            }
        }
    }

    match &req.due_date {
        None => {}
        Some(None) => changes.due_date = Some(None),
        Some(Some(raw)) => match parse_date(raw) {
            Some(normalized) => changes.due_date = Some(Some(normalized)),
            None => errors.add(
                "dueDate",
                "Due date must be an RFC 3339 datetime or a YYYY-MM-DD date",
            ),
        },
    }

    if let Some(list) = req.tags.as_deref() {
        changes.tags = Some(normalize_tags(Some(list)));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(changes)
}

pub fn validate_list_query(query: &TaskListQuery) -> Result<TaskFilter, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut filter = TaskFilter::default();

    // Empty query values (e.g. `?status=`) are treated as absent.
    if let Some(raw) = non_empty(query.status.as_deref()) {
        match TaskStatus::from_str(raw) {
            Some(status) => filter.status = Some(status),
            None => errors.add(
                "status",
                "Status must be one of: pending, in-progress, completed, cancelled",
            ),
        }
    }

    if let Some(raw) = non_empty(query.priority.as_deref()) {
        match TaskPriority::from_str(raw) {
            Some(priority) => filter.priority = Some(priority),
            None => {
                errors.add("priority", "Priority must be one of: low, medium, high, urgent")
            }
        }
    }

    if let Some(raw) = non_empty(query.due_before.as_deref()) {
        match parse_date(raw) {
            Some(normalized) => filter.due_before = Some(normalized),
            None => errors.add(
                "dueBefore",
                "Due date bound must be an RFC 3339 datetime or a YYYY-MM-DD date",
            ),
        }
    }

    if let Some(raw) = non_empty(query.due_after.as_deref()) {
        match parse_date(raw) {
            Some(normalized) => filter.due_after = Some(normalized),
            None => errors.add(
                "dueAfter",
                "Due date bound must be an RFC 3339 datetime or a YYYY-MM-DD date",
            ),
        }
    }

    if let Some(raw) = non_empty(query.sort.as_deref()) {
        match parse_sort(raw) {
            Some(sort) => filter.sort = Some(sort),
            None => errors.add(
                "sort",
                "Sort field must be one of: createdAt, updatedAt, dueDate, priority, status, title \
                 (prefix with '-' for descending)",
            ),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(filter)
}

pub fn validate_registration(req: &RegisterRequest) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = req.name.as_deref().unwrap_or_default().trim();
    if name.is_empty() {
        errors.add("name", "Name is required");
    } else if name.chars().count() > NAME_MAX {
        errors.add("name", "Name cannot exceed 50 characters");
    }

    let email = req
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if email.is_empty() {
        errors.add("email", "Email is required");
    } else if email.chars().count() > EMAIL_MAX {
        errors.add("email", "Email cannot exceed 254 characters");
    } else if !is_valid_email(&email) {
        errors.add("email", "Email must be a valid email address");
    }

    let password = req.password.as_deref().unwrap_or_default();
    if password.chars().count() < PASSWORD_MIN {
        errors.add("password", "Password must be at least 6 characters");
    } else if password.chars().count() > PASSWORD_MAX {
        errors.add("password", "Password cannot exceed 128 characters");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Registration {
        name: name.to_string(),
        email,
        password: password.to_string(),
    })
}

pub fn validate_login(req: &LoginRequest) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let email = req
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if email.is_empty() {
        errors.add("email", "Email is required");
    }

    let password = req.password.as_deref().unwrap_or_default();
    if password.is_empty() {
        errors.add("password", "Password is required");
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(Credentials {
        email,
        password: password.to_string(),
    })
}

/// Parse a date as RFC 3339 or bare `YYYY-MM-DD` (midnight UTC) and
/// normalize to RFC 3339 UTC, so stored values compare chronologically as
/// strings.
fn parse_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().to_rfc3339());
    }
    None
}

fn normalize_tags(tags: Option<&[String]>) -> Vec<String> {
    tags.map(|list| {
        list.iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_sort(raw: &str) -> Option<TaskSort> {
    let (descending, name) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let field = match name {
        "createdAt" => SortField::CreatedAt,
        "updatedAt" => SortField::UpdatedAt,
        "dueDate" => SortField::DueDate,
        "priority" => SortField::Priority,
        "status" => SortField::Status,
        "title" => SortField::Title,
        _ => return None,
    };
    Some(TaskSort { field, descending })
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (local, domain) = match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => (local, domain),
        _ => return false,
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
