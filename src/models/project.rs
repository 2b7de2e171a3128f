//! Research project model.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Format accepted for project deadlines.
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d";

/// Project priority, stored as text. The empty string means "not set".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Unset => "",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            "" => Ok(Priority::Unset),
            other => Err(format!("unknown priority {:?}", other)),
        }
    }
}

/// A research project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub field: String,
    pub stage: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub priority: Priority,
    pub deadline: String,
    pub created_at: String,
}

/// Request body for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub deadline: String,
}

/// Request body for updating an existing project. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub deadline: Option<String>,
}

/// Deadlines are either empty or a calendar date.
pub fn is_valid_deadline(deadline: &str) -> bool {
    deadline.is_empty() || NaiveDate::parse_from_str(deadline, DEADLINE_FORMAT).is_ok()
}
