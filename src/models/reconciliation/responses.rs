use crate::reconcile::{OrphanGrade, ReconciliationPlan};
use serde::Serialize;

// 实际执行的变更数量
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct AppliedChanges {
    pub courses_created: usize,
    pub enrollments_created: usize,
    pub enrollments_moved: usize,
    pub enrollments_removed: usize,
    pub duplicate_courses_deleted: usize,
}

// 对账报告
#[derive(Debug, Serialize)]
pub struct ReconciliationReport {
    pub teacher_id: Option<i64>,
    pub dry_run: bool,
    pub merge_duplicates: bool,
    pub plan: ReconciliationPlan,
    pub orphan_grades: Vec<OrphanGrade>,
    pub applied: AppliedChanges,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}
