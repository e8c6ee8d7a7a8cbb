// --------------------------------------------------
// HTTP handlers for batch CRUD, the per-day schedule
// view, batch task operations, reminders and media.
//
// Every mutating handler follows the same commit cycle:
// parse input -> load state -> mutate -> run sweeps -> save -> respond
// --------------------------------------------------

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic;
use crate::models::{Task, TaskStatus};
use crate::state::{self, BatchForm, TaskForm};
use crate::store;
use crate::time;

// -----------------------------
// GET /api/state
// Full aggregate for frontend hydration
// -----------------------------
pub async fn get_app_state() -> impl IntoResponse {
    let mut app = store::load_state();
    // viewing also triggers the auto-finalize check
    if state::run_sweeps(&mut app, time::now_fixed_offset()) > 0 {
        if store::save_state(&app).is_err() {
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
        }
    }
    Json(app).into_response()
}

// -----------------------------
// GET /api/batches
// -----------------------------
pub async fn get_batches() -> impl IntoResponse {
    let app = store::load_state();
    Json(app.batches).into_response()
}

// -----------------------------
// POST /api/batches
// Launches a new batch from the supplied form
// -----------------------------
pub async fn create_batch(Json(form): Json<BatchForm>) -> impl IntoResponse {
    let start_date = match DateTime::parse_from_rfc3339(&form.date) {
        Ok(dt) => dt,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid date").into_response(),
    };
    let now = time::now_fixed_offset();

    let mut app = store::load_state();
    let id = state::create_batch(&mut app, &form, start_date, now);
    state::run_sweeps(&mut app, now);

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    let batch = app.batches.iter().find(|b| b.id == id).cloned();
    Json(batch).into_response()
}

// -----------------------------
// PUT /api/batches/:id
// Updates batch metadata; the schedule is never touched here
// -----------------------------
pub async fn update_batch(
    Path(id): Path<String>,
    Json(form): Json<BatchForm>,
) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    let start_date = match DateTime::parse_from_rfc3339(&form.date) {
        Ok(dt) => dt,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid date").into_response(),
    };
    let now = time::now_fixed_offset();

    let mut app = store::load_state();
    if !state::update_batch(&mut app, id, &form, start_date, now) {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    }
    state::run_sweeps(&mut app, now);

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    let batch = app.batches.iter().find(|b| b.id == id).cloned();
    Json(batch).into_response()
}

// -----------------------------
// DELETE /api/batches/:id
// Removes the batch and, with it, its whole schedule
// -----------------------------
pub async fn delete_batch(Path(id): Path<String>) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };

    let mut app = store::load_state();
    if !state::delete_batch(&mut app, id) {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    }
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true })).into_response()
}

// -----------------------------
// POST /api/batches/:id/reset
// Moves the day anchor to now; completion marks stay
// -----------------------------
pub async fn reset_batch(Path(id): Path<String>) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    let now = time::now_fixed_offset();

    let mut app = store::load_state();
    if !state::reset_batch(&mut app, id, now) {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    }
    state::run_sweeps(&mut app, now);

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    let batch = app.batches.iter().find(|b| b.id == id).cloned();
    Json(batch).into_response()
}

// -----------------------------
// POST /api/batches/:id/finalize
// Manual counterpart of the day-14 auto-finalize
// -----------------------------
pub async fn finalize_batch(Path(id): Path<String>) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };

    let mut app = store::load_state();
    if !state::finalize_recording(&mut app, id) {
        return (StatusCode::CONFLICT, "nothing to finalize").into_response();
    }
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    let batch = app.batches.iter().find(|b| b.id == id).cloned();
    Json(batch).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub task: Task,
    pub status: TaskStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayViewResponse {
    pub batch_id: Uuid,
    pub day: u32,
    pub current_day: u32,
    pub tasks: Vec<TaskView>,
}

// -----------------------------
// GET /api/batches/:id/days/:day
// One day of the schedule with derived statuses
// -----------------------------
pub async fn get_batch_day(Path((id, day)): Path<(String, u32)>) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    let now = time::now_fixed_offset();

    let mut app = store::load_state();
    // viewing a schedule re-runs the sweeps, like any other view change
    if state::run_sweeps(&mut app, now) > 0 {
        if store::save_state(&app).is_err() {
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
        }
    }

    let Some(batch) = app.batches.iter().find(|b| b.id == id) else {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    };

    let current_day = time::current_day_number_at(batch.start_date, now);
    // a day with no entry is an empty list, not an error
    let tasks = batch
        .schedule
        .get(&day)
        .map(|tasks| {
            tasks
                .iter()
                .map(|t| TaskView {
                    status: logic::task_status(t, day, current_day, now),
                    task: t.clone(),
                })
                .collect()
        })
        .unwrap_or_default();

    Json(DayViewResponse {
        batch_id: id,
        day,
        current_day,
        tasks,
    })
    .into_response()
}

// -----------------------------
// POST /api/batches/:id/days/:day/tasks
// -----------------------------
pub async fn create_batch_task(
    Path((id, day)): Path<(String, u32)>,
    Json(form): Json<TaskForm>,
) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    if form.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "message required").into_response();
    }
    let now = time::now_fixed_offset();

    let mut app = store::load_state();
    let Some(batch) = app.batches.iter_mut().find(|b| b.id == id) else {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    };
    let task_id = state::append_task(&mut batch.schedule, day, &form);
    state::run_sweeps(&mut app, now);

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true, "taskId": task_id })).into_response()
}

// -----------------------------
// PUT /api/batches/:id/days/:day/tasks/:task_id
// -----------------------------
pub async fn update_batch_task(
    Path((id, day, task_id)): Path<(String, u32, String)>,
    Json(form): Json<TaskForm>,
) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    let task_id = match Uuid::parse_str(&task_id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid task id").into_response(),
    };
    if form.message.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "message required").into_response();
    }
    let now = time::now_fixed_offset();

    let mut app = store::load_state();
    let Some(batch) = app.batches.iter_mut().find(|b| b.id == id) else {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    };
    if !state::edit_task(&mut batch.schedule, day, &form, task_id) {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    state::run_sweeps(&mut app, now);

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true, "taskId": task_id })).into_response()
}

// -----------------------------
// DELETE /api/batches/:id/days/:day/tasks/:task_id
// Confirmation happens on the client before this is called
// -----------------------------
pub async fn delete_batch_task(
    Path((id, day, task_id)): Path<(String, u32, String)>,
) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    let task_id = match Uuid::parse_str(&task_id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid task id").into_response(),
    };

    let mut app = store::load_state();
    let Some(batch) = app.batches.iter_mut().find(|b| b.id == id) else {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    };
    if !state::delete_task(&mut batch.schedule, day, task_id) {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true })).into_response()
}

// -----------------------------
// POST /api/batches/:id/days/:day/tasks/:task_id/sent
// Marks a task as sent; idempotent, batches only
// -----------------------------
pub async fn mark_task_sent(
    Path((id, day, task_id)): Path<(String, u32, String)>,
) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    let task_id = match Uuid::parse_str(&task_id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid task id").into_response(),
    };
    let now = time::now_fixed_offset();

    let mut app = store::load_state();
    if !state::mark_task_sent(&mut app, id, day, task_id) {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    state::run_sweeps(&mut app, now);

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true })).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub day: u32,
    pub task_id: Uuid,
    pub time: String,
    pub message: String,
}

// -----------------------------
// GET /api/batches/:id/reminders
// The registrations handed to the notification collaborator
// -----------------------------
pub async fn get_reminders(Path(id): Path<String>) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };
    let now = time::now_fixed_offset();

    let app = store::load_state();
    let Some(batch) = app.batches.iter().find(|b| b.id == id) else {
        return (StatusCode::NOT_FOUND, "batch not found").into_response();
    };

    let reminders: Vec<ReminderResponse> = logic::pending_reminders(batch, now)
        .into_iter()
        .map(|r| ReminderResponse {
            day: r.day,
            task_id: r.task.id,
            time: r.task.time,
            message: r.task.message,
        })
        .collect();

    Json(reminders).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDownloadInput {
    pub file_name: String,
    pub directory: Option<String>,
}

// -----------------------------
// POST /api/media/download
// Records the download directory on first use and acknowledges.
// The actual file transfer belongs to the media collaborator.
// -----------------------------
pub async fn download_media(Json(input): Json<MediaDownloadInput>) -> impl IntoResponse {
    if input.file_name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "file name required").into_response();
    }

    let mut app = store::load_state();
    let directory = state::record_download_directory(&mut app, input.directory);
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({
        "ok": true,
        "fileName": input.file_name,
        "directory": directory,
    }))
    .into_response()
}
