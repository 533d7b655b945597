use serde::Deserialize;

fn default_dry_run() -> bool {
    true
}

// 对账执行请求
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunReconciliationRequest {
    // 为空时对全部教师执行
    pub teacher_id: Option<i64>,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default)]
    pub merge_duplicates: bool,
}

impl Default for RunReconciliationRequest {
    fn default() -> Self {
        Self {
            teacher_id: None,
            dry_run: true,
            merge_duplicates: false,
        }
    }
}
