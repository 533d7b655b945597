use serde::{Deserialize, Serialize};

// 业务错误码，写入统一响应的 code 字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    Conflict = 1009,
    RateLimitExceeded = 1029,
    InternalServerError = 1500,

    // 认证
    AuthFailed = 2000,

    // 用户
    UserNotFound = 3000,
    UserNameInvalid = 3001,
    UserEmailInvalid = 3002,
    UserPasswordInvalid = 3003,
    UserAlreadyExists = 3004,
    UserCreationFailed = 3005,
    CanNotDeleteCurrentUser = 3006,

    // 课程
    CourseNotFound = 4000,
    CoursePermissionDenied = 4001,
    CourseCreationFailed = 4002,
    CourseInvalid = 4003,

    // 选课申请
    EnrollmentRequestNotFound = 5000,
    EnrollmentRequestDuplicate = 5001,
    EnrollmentRequestNotPending = 5002,
    EnrollmentRequestInvalid = 5003,
    EnrollmentPermissionDenied = 5004,

    // 成绩
    GradeNotFound = 6000,
    GradeInvalid = 6001,
    GradePermissionDenied = 6002,

    // 对账
    ReconciliationFailed = 7000,
}
