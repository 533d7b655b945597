use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid username regex"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("Invalid email regex")
});

// 科目、年级、方向等名称：字母数字、空格及少量标点
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}][\p{L}\p{N} &'()+./_-]*$").expect("Invalid label regex"));

const WEAK_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "12345678",
    "123456789",
    "qwerty123",
    "admin123",
    "abcd1234",
    "school123",
    "teacher1",
    "student1",
];

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    // 3 <= 长度 <= 32
    if username.len() < 3 || username.len() > 32 {
        return Err("Username length must be between 3 and 32 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Username may only contain letters, digits, '.', '_' or '-'");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        return Err("Email format is invalid");
    }
    Ok(())
}

/// 密码策略：至少 8 位，包含大小写字母和数字，且不在常见弱密码表中
pub fn validate_password(password: &str) -> Result<(), String> {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain a digit");
    }
    if WEAK_PASSWORDS
        .iter()
        .any(|weak| password.eq_ignore_ascii_case(weak))
    {
        errors.push("Password is too common");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

/// 校验科目、年级等自由文本标签
pub fn validate_label(field: &'static str, value: &str, max_len: usize) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if trimmed.chars().count() > max_len {
        return Err(format!("{field} must be at most {max_len} characters"));
    }
    if !LABEL_RE.is_match(trimmed) {
        return Err(format!("{field} contains unsupported characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("j.doe").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("teacher@school.edu").is_ok());
        assert!(validate_email("teacher@school").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("Classroom42").is_ok());

        let err = validate_password("short1A").expect_err("too short");
        assert!(err.contains("at least 8"));

        let err = validate_password("alllowercase1").expect_err("no uppercase");
        assert!(err.contains("uppercase"));

        let err = validate_password("School123").expect_err("weak");
        assert!(err.contains("too common"));
    }

    #[test]
    fn test_label_rules() {
        assert!(validate_label("subject", "Further Mathematics", 64).is_ok());
        assert!(validate_label("grade_level", "Grade 10", 32).is_ok());
        assert!(validate_label("subject", "Design & Technology", 64).is_ok());
        assert!(validate_label("subject", "   ", 64).is_err());
        assert!(validate_label("subject", "<script>", 64).is_err());
        assert!(validate_label("grade_level", "x".repeat(40).as_str(), 32).is_err());
    }
}
