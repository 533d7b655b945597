use serde::{Deserialize, Serialize};

// 成绩类型
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GradeType {
    Assignment,
    Quiz,
    Test,
    Exam,
    Project,
    Participation,
    Other,
}

impl GradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeType::Assignment => "assignment",
            GradeType::Quiz => "quiz",
            GradeType::Test => "test",
            GradeType::Exam => "exam",
            GradeType::Project => "project",
            GradeType::Participation => "participation",
            GradeType::Other => "other",
        }
    }
}

impl<'de> Deserialize<'de> for GradeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<GradeType>()
            .map_err(|_| serde::de::Error::custom(format!("无效的成绩类型: '{s}'")))
    }
}

impl std::fmt::Display for GradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GradeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment" => Ok(GradeType::Assignment),
            "quiz" => Ok(GradeType::Quiz),
            "test" => Ok(GradeType::Test),
            "exam" => Ok(GradeType::Exam),
            "project" => Ok(GradeType::Project),
            "participation" => Ok(GradeType::Participation),
            "other" => Ok(GradeType::Other),
            _ => Err(format!("Invalid grade type: {s}")),
        }
    }
}

// 学生成绩：科目为自由文本，与课程之间没有外键
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentGrade {
    pub id: i64,
    pub student_id: i64,
    pub subject: String,
    pub score: f64,
    pub max_score: f64,
    pub grade_type: GradeType,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub graded_by: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
