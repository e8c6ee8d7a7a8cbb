use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of days in a standard onboarding cycle.
pub const CYCLE_DAYS: u32 = 14;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Text,
    Media,
}

// Derived per view, never persisted.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Overdue,
    Upcoming,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub time: String, // "H:MM AM/PM", interpreted against the device-local day
    pub message: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub media_name: String, // empty unless kind is Media
    pub is_done: bool,
}

/// Day number (1..=14 by convention) to ordered task list.
/// Out-of-range keys are tolerated; absence of a key is handled at each read site.
pub type Schedule = BTreeMap<u32, Vec<Task>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub schedule: Schedule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    pub name: String,
    pub whatsapp_link: String,
    pub start_date: DateTime<FixedOffset>, // anchor for day-number computation
    pub schedule: Schedule,                // private copy, never shared with a template
    pub is_recording: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>, // set only while recording
}

/// The whole persisted aggregate. Rewritten in full on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub batches: Vec<Batch>,
    pub templates: Vec<Template>,
    pub download_directory: Option<String>,
}

impl AppState {
    /// First-run aggregate: no batches, the standard onboarding template,
    /// no download directory yet.
    pub fn first_run() -> Self {
        AppState {
            batches: Vec::new(),
            templates: vec![Template {
                id: Uuid::new_v4(),
                name: "Standard 14-Day Onboarding".to_string(),
                schedule: default_schedule(),
            }],
            download_directory: None,
        }
    }
}

// Stock tasks for one day of the built-in onboarding schedule.
fn mock_tasks(day: u32) -> Vec<Task> {
    vec![
        Task {
            id: Uuid::new_v4(),
            time: "09:00 AM".to_string(),
            message: format!(
                "Good morning Interns! Welcome to Day {day} tasks. Please review your objectives."
            ),
            kind: TaskKind::Media,
            media_name: format!("Day_{day}_Intro_Image.png"),
            is_done: false,
        },
        Task {
            id: Uuid::new_v4(),
            time: "12:30 PM".to_string(),
            message: "Mid-day check-in. Don't forget to submit your progress reports for the morning session.".to_string(),
            kind: TaskKind::Media,
            media_name: format!("Checklist_D{day}.pdf"),
            is_done: false,
        },
        Task {
            id: Uuid::new_v4(),
            time: "05:00 PM".to_string(),
            message: "End of day recap. Please fill out your attendance logs.".to_string(),
            kind: TaskKind::Text,
            media_name: String::new(),
            is_done: false,
        },
    ]
}

/// Built-in 14-day schedule used when a batch is created without a template.
pub fn default_schedule() -> Schedule {
    (1..=CYCLE_DAYS).map(|day| (day, mock_tasks(day))).collect()
}

/// Schedule with an empty task list for every day 1..=14.
pub fn blank_schedule() -> Schedule {
    (1..=CYCLE_DAYS).map(|day| (day, Vec::new())).collect()
}
