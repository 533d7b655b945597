use serde::{Deserialize, Serialize};

// 选课申请状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl EnrollmentRequestStatus {
    pub const PENDING: &'static str = "pending";
    pub const APPROVED: &'static str = "approved";
    pub const REJECTED: &'static str = "rejected";

    /// 只有待审核的申请可以被批准或拒绝
    pub fn can_transition_to(&self, next: EnrollmentRequestStatus) -> bool {
        matches!(
            (self, next),
            (
                EnrollmentRequestStatus::Pending,
                EnrollmentRequestStatus::Approved | EnrollmentRequestStatus::Rejected
            )
        )
    }
}

impl<'de> Deserialize<'de> for EnrollmentRequestStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<EnrollmentRequestStatus>().map_err(|_| {
            serde::de::Error::custom(format!(
                "无效的申请状态: '{s}'. 支持的状态: pending, approved, rejected"
            ))
        })
    }
}

impl std::fmt::Display for EnrollmentRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentRequestStatus::Pending => write!(f, "{}", Self::PENDING),
            EnrollmentRequestStatus::Approved => write!(f, "{}", Self::APPROVED),
            EnrollmentRequestStatus::Rejected => write!(f, "{}", Self::REJECTED),
        }
    }
}

impl std::str::FromStr for EnrollmentRequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            Self::PENDING => Ok(EnrollmentRequestStatus::Pending),
            Self::APPROVED => Ok(EnrollmentRequestStatus::Approved),
            Self::REJECTED => Ok(EnrollmentRequestStatus::Rejected),
            _ => Err(format!("Invalid enrollment request status: {s}")),
        }
    }
}

// 选课申请
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub id: i64,
    pub student_id: i64,
    pub teacher_id: i64,
    pub subject: String,
    pub grade_level: String,
    pub stream: Option<String>,
    pub family_id: Option<i64>,
    pub status: EnrollmentRequestStatus,
    pub note: Option<String>,
    pub review_comment: Option<String>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_transitions() {
        use EnrollmentRequestStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Approved));
    }
}
