//! ClickUp API data types.

use serde::Deserialize;

/// ClickUp task - fields we need from the API response.
///
/// Timestamps arrive as Unix milliseconds encoded in strings.
///
/// API docs: https://clickup.com/api/clickupreference/operation/GetTasks/
#[derive(Debug, Clone, Deserialize)]
pub struct ClickUpTask {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ClickUpStatus,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub date_updated: Option<String>,
    /// Present only once the task is closed.
    #[serde(default)]
    pub date_closed: Option<String>,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    pub list: ListInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickUpStatus {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignee {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// The list a task belongs to, as embedded in the task payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ListInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// `GET /list/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListDetails {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub folder: Option<NamedRef>,
    #[serde(default)]
    pub space: Option<NamedRef>,
}

/// An `{id, name}` pair nested in list details.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One page of `GET /list/{id}/task`.
#[derive(Debug, Clone, Deserialize)]
pub struct TasksResponse {
    #[serde(default)]
    pub tasks: Vec<ClickUpTask>,
}

/// `GET /folder/{id}/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderListsResponse {
    #[serde(default)]
    pub lists: Vec<NamedRef>,
}

/// A list to fetch, with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRef {
    pub id: String,
    pub name: Option<String>,
}

impl ListRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

impl From<NamedRef> for ListRef {
    fn from(r: NamedRef) -> Self {
        Self {
            id: r.id,
            name: Some(r.name).filter(|n| !n.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_tolerates_null_and_missing_fields() {
        let task: ClickUpTask = serde_json::from_value(serde_json::json!({
            "id": "abc",
            "name": "Ship it",
            "description": null,
            "status": {"status": "in progress", "color": "#fff"},
            "date_created": "1735689600000",
            "date_closed": null,
            "assignees": [{"id": 7, "username": "alice", "email": "a@x"}],
            "list": {"id": "901", "name": "Backend", "access": true}
        }))
        .expect("task should deserialize");

        assert_eq!(task.description, None);
        assert_eq!(task.date_updated, None);
        assert_eq!(task.date_closed, None);
        assert_eq!(task.assignees[0].username.as_deref(), Some("alice"));
        assert_eq!(task.list.name, "Backend");
        assert_eq!(task.url, "");
    }

    #[test]
    fn list_ref_from_named_ref_drops_empty_name() {
        let r: ListRef = NamedRef {
            id: "1".to_string(),
            name: String::new(),
        }
        .into();
        assert_eq!(r, ListRef::new("1"));
    }
}
