use super::entities::User;
use crate::models::common::PaginationInfo;
use serde::Serialize;

// 用户列表响应
#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub pagination: PaginationInfo,
    pub items: Vec<User>,
}

// 单个用户响应
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: User,
}
