use serde::{Deserialize, Serialize};

// 课程：某教师在某年级开设的某一科目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    // 科目名称（原样保存，匹配时使用规范化键）
    pub subject: String,
    // 年级
    pub grade_level: String,
    // 分科方向
    pub stream: Option<String>,
    // 任课教师ID
    pub teacher_id: i64,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// 选课记录：学生已确认加入某课程
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}
