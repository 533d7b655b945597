//! 选课对账核心
//!
//! 选课申请、课程与成绩三类记录之间没有数据库约束，容易失配。
//! 本模块只做纯计算：规范化匹配键、科目名解析、教师科目视图的物化、
//! 对账计划与孤立成绩检测。所有数据由调用方从存储层取出后传入。

pub mod keys;
pub mod orphans;
pub mod plan;
pub mod resolver;
pub mod scores;
pub mod view;

pub use keys::{CourseIndex, CourseKey, GradeLevelKey, SubjectKey};
pub use orphans::{OrphanGrade, OrphanReason, find_orphan_grades};
pub use plan::{
    DuplicateGroup, PlannedCourse, PlannedEnrollment, ReconciliationPlan, plan_reconciliation,
};
pub use resolver::{Resolution, SubjectResolver};
pub use scores::{ScoreAccumulator, ScoreSummary, percentage, round2};
pub use view::{
    GradeTypeAverage, StudentScore, SubjectSource, SyncIssue, TeacherSubject, TeacherSubjectView,
    TeacherViewInput, ViewTotals, build_teacher_view,
};

#[cfg(test)]
pub(crate) mod fixtures;
