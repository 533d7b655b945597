//! 预导入模块，方便使用

pub use super::courses::{ActiveModel as CourseActiveModel, Entity as Courses, Model as CourseModel};
pub use super::enrollment_requests::{
    ActiveModel as EnrollmentRequestActiveModel, Entity as EnrollmentRequests,
    Model as EnrollmentRequestModel,
};
pub use super::enrollments::{
    ActiveModel as EnrollmentActiveModel, Entity as Enrollments, Model as EnrollmentModel,
};
pub use super::student_grades::{
    ActiveModel as StudentGradeActiveModel, Entity as StudentGrades, Model as StudentGradeModel,
};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
