/*
Status derivation and reminder selection.
Module was independently written from HTTP / Axum for testing
*/

use chrono::{DateTime, FixedOffset};

use crate::models::{Batch, Task, TaskStatus};
use crate::time;

// Reminder registration handed to the notification collaborator.
// The core only decides WHICH tasks get registered, never delivery.
#[derive(Debug, Clone)]
pub struct Reminder {
    pub day: u32,
    pub task: Task,
}

// Resolve the user-facing status of one task.
//
// Decision table, evaluated in this order:
// 1) done                     -> Completed (terminal, overrides everything)
// 2) viewing a past day       -> Overdue
// 3) viewing a future day     -> Upcoming
// 4) viewing the current day  -> Overdue once its time-of-day has passed,
//                                Upcoming before that
pub fn task_status(
    task: &Task,
    viewing_day: u32,
    current_day: u32,
    now: DateTime<FixedOffset>,
) -> TaskStatus {
    if task.is_done {
        TaskStatus::Completed
    } else if viewing_day < current_day {
        TaskStatus::Overdue
    } else if viewing_day > current_day {
        TaskStatus::Upcoming
    } else if time::task_time_passed_at(task, now) {
        TaskStatus::Overdue
    } else {
        TaskStatus::Upcoming
    }
}

// Select the tasks a batch still needs reminders for.
//
// Rules:
// - Task must not be done
// - Task must sit on the batch's current day or a later one
// Order follows the schedule: ascending day, then list order.
pub fn pending_reminders(batch: &Batch, now: DateTime<FixedOffset>) -> Vec<Reminder> {
    let current_day = time::current_day_number_at(batch.start_date, now);
    batch
        .schedule
        .iter()
        .filter(|(day, _)| **day >= current_day)
        .flat_map(|(day, tasks)| {
            let day = *day;
            tasks
                .iter()
                .filter(|t| !t.is_done)
                .map(move |t| Reminder {
                    day,
                    task: t.clone(),
                })
        })
        .collect()
}
