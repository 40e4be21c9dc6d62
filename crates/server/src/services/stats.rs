//! In-memory aggregation behind every dashboard and analytics endpoint.
//!
//! Everything here is a pure function of already-fetched rows so the
//! arithmetic can be tested without a database.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::models::{
    Project, ProjectStatus, Role, Task, TaskPriority, TaskStatus, TaskWithRefs, User, UserStatus,
};

/// `round(count / total * 100)`, or 0 for an empty total.
pub fn percentage(count: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountShare {
    pub count: usize,
    pub percentage: i64,
}

impl CountShare {
    pub fn of(count: usize, total: usize) -> Self {
        Self {
            count,
            percentage: percentage(count, total),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Count {
    pub count: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStatusCounts {
    pub total: usize,
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
    pub completed: usize,
}

impl TaskStatusCounts {
    pub fn tally<I: IntoIterator<Item = TaskStatus>>(statuses: I) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.total += 1;
            match status {
                TaskStatus::Open => counts.open += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Resolved => counts.resolved += 1,
                TaskStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    pub fn of_tasks(tasks: &[Task]) -> Self {
        Self::tally(tasks.iter().map(|t| t.status))
    }

    pub fn of_refs(tasks: &[TaskWithRefs]) -> Self {
        Self::tally(tasks.iter().map(|t| t.task.status))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProjectStatusCounts {
    pub total: usize,
    pub pending: usize,
    pub active: usize,
    pub completed: usize,
    pub on_hold: usize,
}

impl ProjectStatusCounts {
    pub fn of(projects: &[Project]) -> Self {
        let mut counts = Self::default();
        for project in projects {
            counts.total += 1;
            match project.project_status {
                ProjectStatus::Pending => counts.pending += 1,
                ProjectStatus::Active => counts.active += 1,
                ProjectStatus::Completed => counts.completed += 1,
                ProjectStatus::OnHold => counts.on_hold += 1,
            }
        }
        counts
    }
}

/// Number of distinct users holding at least one of the tasks.
pub fn distinct_assignees(tasks: &[Task]) -> usize {
    tasks
        .iter()
        .filter_map(|t| t.assigned_to.as_deref())
        .collect::<HashSet<_>>()
        .len()
}

/// Summary statistics over a set of tasks, as shown on task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListStats {
    pub total_tasks: usize,
    pub open_tasks: usize,
    pub in_progress_tasks: usize,
    pub resolved_tasks: usize,
}

impl From<TaskStatusCounts> for TaskListStats {
    fn from(c: TaskStatusCounts) -> Self {
        Self {
            total_tasks: c.total,
            open_tasks: c.open,
            in_progress_tasks: c.in_progress,
            resolved_tasks: c.resolved,
        }
    }
}

/// Statistics for a regular user's own task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeStats {
    pub total_tasks: usize,
    pub open_tasks: usize,
    pub in_progress_tasks: usize,
    pub resolved_tasks: usize,
    pub active_tasks: usize,
    pub completed_tasks: usize,
}

impl From<TaskStatusCounts> for AssigneeStats {
    fn from(c: TaskStatusCounts) -> Self {
        Self {
            total_tasks: c.total,
            open_tasks: c.open,
            in_progress_tasks: c.in_progress,
            resolved_tasks: c.resolved,
            active_tasks: c.open + c.in_progress,
            completed_tasks: c.resolved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedProjectStats {
    pub total_projects: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
}

impl OwnedProjectStats {
    pub fn of(projects: &[Project]) -> Self {
        let c = ProjectStatusCounts::of(projects);
        Self {
            total_projects: c.total,
            active_projects: c.active,
            completed_projects: c.completed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerDashboardStats {
    pub my_projects: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
    pub team_members: usize,
    pub total_tasks: usize,
    pub open_tasks: usize,
    pub in_progress_tasks: usize,
    pub resolved_tasks: usize,
}

impl OwnerDashboardStats {
    pub fn of(projects: &[Project], tasks: &[Task]) -> Self {
        let p = ProjectStatusCounts::of(projects);
        let t = TaskStatusCounts::of_tasks(tasks);
        Self {
            my_projects: p.total,
            active_projects: p.active,
            completed_projects: p.completed,
            team_members: distinct_assignees(tasks),
            total_tasks: t.total,
            open_tasks: t.open,
            in_progress_tasks: t.in_progress,
            resolved_tasks: t.resolved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAnalyticsStats {
    pub total_projects: usize,
    pub active_projects: usize,
    pub total_tasks: usize,
    pub team_members: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDistribution {
    pub open: CountShare,
    pub in_progress: CountShare,
    pub resolved: CountShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCountsBrief {
    pub open: usize,
    pub in_progress: usize,
    pub resolved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAnalytics {
    pub statistics: OwnerAnalyticsStats,
    pub task_status_distribution: StatusDistribution,
    pub task_distribution: StatusCountsBrief,
}

impl OwnerAnalytics {
    pub fn of(projects: &[Project], tasks: &[Task]) -> Self {
        let p = ProjectStatusCounts::of(projects);
        let t = TaskStatusCounts::of_tasks(tasks);
        Self {
            statistics: OwnerAnalyticsStats {
                total_projects: p.total,
                active_projects: p.active,
                total_tasks: t.total,
                team_members: distinct_assignees(tasks),
            },
            task_status_distribution: StatusDistribution {
                open: CountShare::of(t.open, t.total),
                in_progress: CountShare::of(t.in_progress, t.total),
                resolved: CountShare::of(t.resolved, t.total),
            },
            task_distribution: StatusCountsBrief {
                open: t.open,
                in_progress: t.in_progress,
                resolved: t.resolved,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPerformance {
    pub user_id: String,
    pub full_name: String,
    pub email: String,
    pub tasks_assigned: usize,
    pub tasks_completed: usize,
    pub efficiency: i64,
}

/// Per-assignee throughput across the given tasks, best efficiency first.
///
/// Assignees whose account no longer exists are left out. Ties keep the order
/// in which the assignee was first seen.
pub fn team_performance(tasks: &[TaskWithRefs]) -> Vec<MemberPerformance> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut members: Vec<MemberPerformance> = Vec::new();

    for row in tasks {
        let (Some(user_id), Some(name), Some(email)) = (
            row.task.assigned_to.as_deref(),
            row.assignee_name.as_deref(),
            row.assignee_email.as_deref(),
        ) else {
            continue;
        };

        let slot = *index.entry(user_id).or_insert_with(|| {
            members.push(MemberPerformance {
                user_id: user_id.to_string(),
                full_name: name.to_string(),
                email: email.to_string(),
                tasks_assigned: 0,
                tasks_completed: 0,
                efficiency: 0,
            });
            members.len() - 1
        });

        let member = &mut members[slot];
        member.tasks_assigned += 1;
        if row.task.status == TaskStatus::Resolved {
            member.tasks_completed += 1;
        }
    }

    for member in &mut members {
        member.efficiency = percentage(member.tasks_completed, member.tasks_assigned);
    }
    members.sort_by(|a, b| b.efficiency.cmp(&a.efficiency));
    members
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub total_projects: usize,
    pub active_projects: usize,
    pub total_tasks: usize,
    pub open_tasks: usize,
    pub in_progress_tasks: usize,
    pub resolved_tasks: usize,
}

impl AdminDashboardStats {
    pub fn of(users: &[User], projects: &[Project], tasks: &[Task]) -> Self {
        let p = ProjectStatusCounts::of(projects);
        let t = TaskStatusCounts::of_tasks(tasks);
        Self {
            total_users: users.len(),
            active_users: users
                .iter()
                .filter(|u| u.status == UserStatus::Active)
                .count(),
            total_projects: p.total,
            active_projects: p.active,
            total_tasks: t.total,
            open_tasks: t.open,
            in_progress_tasks: t.in_progress,
            resolved_tasks: t.resolved,
        }
    }
}

/// Inclusive creation-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemTotals {
    pub total_users: usize,
    pub total_projects: usize,
    pub total_tasks: usize,
    pub completion_rate: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsersByRole {
    pub admin: CountShare,
    pub moderator: CountShare,
    pub user: CountShare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsByStatus {
    pub active: CountShare,
    pub completed: CountShare,
    pub pending: Count,
    pub on_hold: Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TasksByStatus {
    pub open: usize,
    #[serde(rename = "in-progress")]
    pub in_progress: usize,
    pub resolved: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TasksByPriority {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub urgent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemAnalytics {
    pub statistics: SystemTotals,
    pub users_by_role: UsersByRole,
    pub projects_by_status: ProjectsByStatus,
    pub tasks_by_status: TasksByStatus,
    pub tasks_by_priority: TasksByPriority,
}

impl SystemAnalytics {
    /// Aggregates the three collections, keeping only rows created inside
    /// `window` when one is given.
    pub fn of(
        users: &[User],
        projects: &[Project],
        tasks: &[Task],
        window: Option<DateWindow>,
    ) -> Self {
        let in_window = |at: DateTime<Utc>| window.map_or(true, |w| w.contains(at));

        let users: Vec<&User> = users.iter().filter(|u| in_window(u.created_at)).collect();
        let projects: Vec<Project> = projects
            .iter()
            .filter(|p| in_window(p.created_at))
            .cloned()
            .collect();
        let tasks: Vec<&Task> = tasks.iter().filter(|t| in_window(t.created_at)).collect();

        let role_count = |role: Role| users.iter().filter(|u| u.role == role).count();
        let priority_count =
            |priority: TaskPriority| tasks.iter().filter(|t| t.priority == priority).count();

        let p = ProjectStatusCounts::of(&projects);
        let t = TaskStatusCounts::tally(tasks.iter().map(|t| t.status));

        Self {
            statistics: SystemTotals {
                total_users: users.len(),
                total_projects: p.total,
                total_tasks: t.total,
                completion_rate: percentage(t.resolved + t.completed, t.total),
            },
            users_by_role: UsersByRole {
                admin: CountShare::of(role_count(Role::Admin), users.len()),
                moderator: CountShare::of(role_count(Role::Moderator), users.len()),
                user: CountShare::of(role_count(Role::User), users.len()),
            },
            projects_by_status: ProjectsByStatus {
                active: CountShare::of(p.active, p.total),
                completed: CountShare::of(p.completed, p.total),
                pending: Count { count: p.pending },
                on_hold: Count { count: p.on_hold },
            },
            tasks_by_status: TasksByStatus {
                open: t.open,
                in_progress: t.in_progress,
                resolved: t.resolved,
                completed: t.completed,
            },
            tasks_by_priority: TasksByPriority {
                high: priority_count(TaskPriority::High),
                medium: priority_count(TaskPriority::Medium),
                low: priority_count(TaskPriority::Low),
                urgent: priority_count(TaskPriority::Urgent),
            },
        }
    }
}
