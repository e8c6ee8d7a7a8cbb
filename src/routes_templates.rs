// --------------------------------------------------
// HTTP handlers for template management.
//
// Templates are time-independent blueprints: their tasks have no
// status and no "sent" concept, so the day view returns plain tasks.
// --------------------------------------------------

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::state::{self, TaskForm};
use crate::store;
use crate::time;

// -----------------------------
// GET /api/templates
// -----------------------------
pub async fn get_templates() -> impl IntoResponse {
    let app = store::load_state();
    Json(app.templates).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateInput {
    pub name: String,
}

// -----------------------------
// POST /api/templates
// Creates a blank template: empty task list for every day 1..=14
// -----------------------------
pub async fn create_template(Json(input): Json<CreateTemplateInput>) -> impl IntoResponse {
    let mut app = store::load_state();
    let Some(id) = state::create_blank_template(&mut app, &input.name) else {
        return (StatusCode::BAD_REQUEST, "name required").into_response();
    };
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    let template = app.templates.iter().find(|t| t.id == id).cloned();
    Json(template).into_response()
}

// -----------------------------
// DELETE /api/templates/:id
// Already-created batches keep their private schedule copies
// -----------------------------
pub async fn delete_template(Path(id): Path<String>) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };

    let mut app = store::load_state();
    if !state::delete_template(&mut app, id) {
        return (StatusCode::NOT_FOUND, "template not found").into_response();
    }
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true })).into_response()
}

// -----------------------------
// GET /api/templates/:id/days/:day
// -----------------------------
pub async fn get_template_day(Path((id, day)): Path<(String, u32)>) -> impl IntoResponse {
    let id = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid id").into_response(),
    };

    let app = store::load_state();
    let Some(template) = app.templates.iter().find(|t| t.id == id) else {
        return (StatusCode::NOT_FOUND, "template not found").into_response();
    };

    let tasks = template.schedule.get(&day).cloned().unwrap_or_default();
    Json(tasks).into_response()
}

// -----------------------------
// POST /api/templates/:id/days/:day/tasks
// -----------------------------
pub async fn create_template_task(
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
    let Some(template) = app.templates.iter_mut().find(|t| t.id == id) else {
        return (StatusCode::NOT_FOUND, "template not found").into_response();
    };
    let task_id = state::append_task(&mut template.schedule, day, &form);
    state::run_sweeps(&mut app, now);

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true, "taskId": task_id })).into_response()
}

// -----------------------------
// PUT /api/templates/:id/days/:day/tasks/:task_id
// -----------------------------
pub async fn update_template_task(
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

    let mut app = store::load_state();
    let Some(template) = app.templates.iter_mut().find(|t| t.id == id) else {
        return (StatusCode::NOT_FOUND, "template not found").into_response();
    };
    if !state::edit_task(&mut template.schedule, day, &form, task_id) {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true, "taskId": task_id })).into_response()
}

// -----------------------------
// DELETE /api/templates/:id/days/:day/tasks/:task_id
// -----------------------------
pub async fn delete_template_task(
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
    let Some(template) = app.templates.iter_mut().find(|t| t.id == id) else {
        return (StatusCode::NOT_FOUND, "template not found").into_response();
    };
    if !state::delete_task(&mut template.schedule, day, task_id) {
        return (StatusCode::NOT_FOUND, "task not found").into_response();
    }
    state::run_sweeps(&mut app, time::now_fixed_offset());

    if store::save_state(&app).is_err() {
        return (StatusCode::INTERNAL_SERVER_ERROR, "failed to save state").into_response();
    }

    Json(serde_json::json!({ "ok": true })).into_response()
}
