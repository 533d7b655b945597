/*!
 * 速率限制中间件
 *
 * 固定窗口计数：键为 `前缀:用户或IP:窗口序号`，超过上限返回 429 并带 `Retry-After`。
 * 已认证请求按用户计数，否则按客户端 IP。
 *
 * ```rust,ignore
 * web::scope("/api/v1/auth")
 *     .service(web::resource("/login").wrap(RateLimit::login()).route(web::post().to(login)))
 * ```
 */

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    http::header::{CONTENT_TYPE, HeaderName, HeaderValue},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::rc::Rc;
use std::time::Duration;
use tracing::warn;

use crate::models::{ApiResponse, ErrorCode};

// 最长窗口，计数条目在此之后过期
const MAX_WINDOW_SECS: u64 = 3600;

/// 计数表，键: 前缀:标识:窗口序号
static RATE_LIMIT_CACHE: Lazy<Cache<String, u32>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(MAX_WINDOW_SECS))
        .max_capacity(100_000)
        .build()
});

/// 速率限制配置
#[derive(Clone)]
pub struct RateLimit {
    /// 时间窗口内允许的最大请求数
    max_requests: u32,
    /// 时间窗口（秒）
    window_secs: u64,
    /// 限制键前缀，区分不同端点
    key_prefix: String,
}

impl RateLimit {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs: window_secs.clamp(1, MAX_WINDOW_SECS),
            key_prefix: String::new(),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = prefix.to_string();
        self
    }

    /// 登录：5次/分钟/IP
    pub fn login() -> Self {
        Self::new(5, 60).with_prefix("login")
    }

    /// 刷新令牌：10次/分钟/IP
    pub fn refresh_token() -> Self {
        Self::new(10, 60).with_prefix("refresh")
    }

    /// 对账执行：6次/分钟/用户
    pub fn reconciliation() -> Self {
        Self::new(6, 60).with_prefix("reconcile")
    }

    fn cache_key(&self, identifier: &str, now_secs: u64) -> String {
        let window = now_secs / self.window_secs;
        if self.key_prefix.is_empty() {
            format!("{identifier}:{window}")
        } else {
            format!("{}:{identifier}:{window}", self.key_prefix)
        }
    }

    /// 记一次请求，返回剩余次数；超限返回 None
    async fn hit(&self, identifier: &str) -> Option<u32> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let key = self.cache_key(identifier, now);
        let count = RATE_LIMIT_CACHE
            .entry(key)
            .and_upsert_with(|existing| {
                let next = existing.map(|e| e.into_value()).unwrap_or(0).saturating_add(1);
                std::future::ready(next)
            })
            .await
            .into_value();

        if count > self.max_requests {
            None
        } else {
            Some(self.max_requests - count)
        }
    }

    fn retry_after(&self) -> u64 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.window_secs - now % self.window_secs
    }
}

/// 提取客户端 IP，优先连接信息，其次 X-Forwarded-For 和 X-Real-IP
fn extract_client_ip(req: &ServiceRequest) -> String {
    let connection_ip = req
        .connection_info()
        .realip_remote_addr()
        .map(|s| s.to_string());

    if let Some(ref ip) = connection_ip
        && is_valid_ip(ip)
    {
        return ip.clone();
    }

    // 只取最接近客户端的一个
    if let Some(forwarded) = req.headers().get("X-Forwarded-For")
        && let Ok(value) = forwarded.to_str()
        && let Some(ip) = value.split(',').next()
    {
        let ip = ip.trim();
        if is_valid_ip(ip) {
            return ip.to_string();
        }
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP")
        && let Ok(ip) = real_ip.to_str()
    {
        let ip = ip.trim();
        if is_valid_ip(ip) {
            return ip.to_string();
        }
    }

    connection_ip.unwrap_or_else(|| "unknown".to_string())
}

fn is_valid_ip(ip: &str) -> bool {
    use std::net::IpAddr;
    ip.parse::<IpAddr>().is_ok()
}

fn extract_user_id(req: &ServiceRequest) -> Option<i64> {
    use crate::models::users::entities::User;
    req.extensions().get::<User>().map(|user| user.id)
}

fn create_rate_limit_response(retry_after: u64) -> HttpResponse {
    HttpResponse::build(StatusCode::TOO_MANY_REQUESTS)
        .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
        .insert_header(("Retry-After", retry_after.to_string()))
        .insert_header(("X-RateLimit-Remaining", "0"))
        .json(ApiResponse::<()>::error_empty(
            ErrorCode::RateLimitExceeded,
            "请求过于频繁，请稍后再试",
        ))
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limit: self.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limit: RateLimit,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let limit = self.limit.clone();

        Box::pin(async move {
            let identifier = extract_user_id(&req)
                .map(|id| format!("user:{id}"))
                .unwrap_or_else(|| format!("ip:{}", extract_client_ip(&req)));

            match limit.hit(&identifier).await {
                Some(remaining) => {
                    let mut res = srv.call(req).await?.map_into_left_body();
                    res.headers_mut().insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from(remaining),
                    );
                    Ok(res)
                }
                None => {
                    warn!(
                        "Rate limit exceeded for {} on '{}' (limit {}/{}s)",
                        identifier, limit.key_prefix, limit.max_requests, limit.window_secs
                    );
                    Ok(req.into_response(
                        create_rate_limit_response(limit.retry_after()).map_into_right_body(),
                    ))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_presets() {
        let login = RateLimit::login();
        assert_eq!(login.max_requests, 5);
        assert_eq!(login.window_secs, 60);
        assert_eq!(login.key_prefix, "login");

        assert_eq!(RateLimit::refresh_token().max_requests, 10);
        assert_eq!(RateLimit::reconciliation().key_prefix, "reconcile");
        assert_eq!(RateLimit::new(1, 0).window_secs, 1);
    }

    #[test]
    fn test_cache_key_uses_fixed_window() {
        let limit = RateLimit::new(3, 60).with_prefix("p");
        assert_eq!(limit.cache_key("ip:1.2.3.4", 125), "p:ip:1.2.3.4:2");
        assert_eq!(limit.cache_key("ip:1.2.3.4", 179), "p:ip:1.2.3.4:2");
        assert_ne!(limit.cache_key("ip:1.2.3.4", 180), limit.cache_key("ip:1.2.3.4", 179));
    }

    #[tokio::test]
    async fn test_hit_counts_down_then_blocks() {
        let limit = RateLimit::new(2, 3600).with_prefix("test_hit_counts_down");
        assert_eq!(limit.hit("user:1").await, Some(1));
        assert_eq!(limit.hit("user:1").await, Some(0));
        assert_eq!(limit.hit("user:1").await, None);
        assert_eq!(limit.hit("user:2").await, Some(1));
    }

    #[test]
    fn test_valid_ip() {
        assert!(is_valid_ip("10.0.0.1"));
        assert!(is_valid_ip("::1"));
        assert!(!is_valid_ip("not-an-ip"));
    }
}
