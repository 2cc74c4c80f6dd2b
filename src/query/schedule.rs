//! Schedule analysis over task dependencies.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::EntityStore;
use crate::models::*;

/// The longest duration-weighted chain of dependent tasks in a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Tasks in execution order: each depends on the one before it.
    pub tasks: Vec<Task>,
    pub total_days: u64,
}

/// Compute the critical path of a project.
///
/// Relies on the store invariant that dependencies stay inside one project
/// and are acyclic. The path always ends at a task with no dependents. Ties
/// between equally long chains go to the lower task id.
pub fn critical_path(store: &EntityStore, project_id: ProjectId) -> CriticalPath {
    let tasks: BTreeMap<TaskId, &Task> = store
        .tasks_in_project(project_id)
        .map(|t| (t.id, t))
        .collect();

    // Kahn's algorithm, always releasing the lowest ready id first.
    let mut pending: BTreeMap<TaskId, usize> = tasks
        .values()
        .map(|t| (t.id, t.dependencies.len()))
        .collect();
    let mut dependents: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();
    for task in tasks.values() {
        for dep in &task.dependencies {
            dependents.entry(*dep).or_default().push(task.id);
        }
    }

    let mut ready: BTreeSet<TaskId> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut finish: BTreeMap<TaskId, u64> = BTreeMap::new();
    let mut via: BTreeMap<TaskId, TaskId> = BTreeMap::new();

    while let Some(id) = ready.pop_first() {
        let task = tasks[&id];
        let longest_dep = task
            .dependencies
            .iter()
            .map(|dep| (finish.get(dep).copied().unwrap_or(0), *dep))
            .max_by(|(a_finish, a_id), (b_finish, b_id)| {
                a_finish.cmp(b_finish).then_with(|| b_id.cmp(a_id))
            });
        let start = match longest_dep {
            Some((dep_finish, dep)) => {
                via.insert(id, dep);
                dep_finish
            }
            None => 0,
        };
        finish.insert(id, start + u64::from(task.duration_days));

        for next in dependents.get(&id).into_iter().flatten() {
            if let Some(count) = pending.get_mut(next) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(*next);
                }
            }
        }
    }

    // The chain ends at a task nothing depends on, so trailing milestones stay on it.
    let Some((&end, &total_days)) = finish
        .iter()
        .filter(|(id, _)| !dependents.contains_key(*id))
        .max_by(|(a_id, a), (b_id, b)| a.cmp(b).then_with(|| b_id.cmp(a_id)))
    else {
        return CriticalPath::default();
    };

    let mut chain = vec![end];
    let mut cursor = end;
    while let Some(prev) = via.get(&cursor) {
        chain.push(*prev);
        cursor = *prev;
    }
    chain.reverse();

    CriticalPath {
        tasks: chain.into_iter().map(|id| tasks[&id].clone()).collect(),
        total_days,
    }
}

/// Whether a task exists in the baseline, the live project, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceKind {
    Tracked,
    /// Created after the baseline was captured.
    Added,
    /// Deleted or moved out of the project since the baseline.
    Removed,
}

/// How one task's plan moved since a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskVariance {
    pub task_id: TaskId,
    pub title: String,
    pub kind: VarianceKind,
    pub baseline_start: Option<NaiveDate>,
    pub baseline_end: Option<NaiveDate>,
    pub current_start: Option<NaiveDate>,
    pub current_end: Option<NaiveDate>,
    /// Days the planned end moved, positive when later. `None` unless both ends are known.
    pub slip_days: Option<i64>,
}

/// Compare every task of a baseline with the live tasks of its project, by task id.
pub fn baseline_variance(store: &EntityStore, baseline: &Baseline) -> Vec<TaskVariance> {
    let live: BTreeMap<TaskId, &Task> = store
        .tasks_in_project(baseline.project_id)
        .map(|t| (t.id, t))
        .collect();
    let frozen: BTreeMap<TaskId, &Task> = baseline.tasks.iter().map(|t| (t.id, t)).collect();
    let ids: BTreeSet<TaskId> = live.keys().chain(frozen.keys()).copied().collect();

    ids.into_iter()
        .map(|id| {
            let before = frozen.get(&id).copied();
            let now = live.get(&id).copied();
            let kind = match (before, now) {
                (Some(_), Some(_)) => VarianceKind::Tracked,
                (None, _) => VarianceKind::Added,
                (_, None) => VarianceKind::Removed,
            };
            let baseline_end = before.and_then(Task::end_date);
            let current_end = now.and_then(Task::end_date);
            TaskVariance {
                task_id: id,
                title: now.or(before).map(|t| t.title.clone()).unwrap_or_default(),
                kind,
                baseline_start: before.and_then(|t| t.start_date),
                baseline_end,
                current_start: now.and_then(|t| t.start_date),
                current_end,
                slip_days: baseline_end
                    .zip(current_end)
                    .map(|(was, is)| (is - was).num_days()),
            }
        })
        .collect()
}
