use sea_orm::sea_query::LikeExpr;

/// 转义 LIKE 通配符，转义字符为反斜杠
pub fn escape_like_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 构造 "包含" 匹配的 LIKE 表达式
pub fn like_contains(raw: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like_pattern(raw))).escape('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("maths"), "maths");
        assert_eq!(escape_like_pattern("100%_a\\b"), "100\\%\\_a\\\\b");
    }
}
