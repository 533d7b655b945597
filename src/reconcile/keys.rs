//! 匹配键
//!
//! 课程、申请和成绩里的科目名与年级都是自由文本，
//! 比较之前统一规范化成键。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::courses::entities::Course;

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 取出现次数最多的写法，次数相同取最早出现者
pub fn most_common<'a>(spellings: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for raw in spellings {
        let cleaned = collapse_whitespace(raw);
        if cleaned.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(s, _)| *s == cleaned) {
            Some((_, n)) => *n += 1,
            None => counts.push((cleaned, 1)),
        }
    }
    let best = counts.iter().map(|(_, n)| *n).max()?;
    counts.into_iter().find(|(_, n)| *n == best).map(|(s, _)| s)
}

/// 规范化的科目键：去首尾空白、合并内部空白、转小写
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectKey(String);

impl SubjectKey {
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = collapse_whitespace(raw).to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn words(&self) -> Vec<&str> {
        self.0.split(' ').collect()
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 规范化的年级键："Grade 10"、"grade-10"、"10" 视为同一年级
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeLevelKey(String);

impl GradeLevelKey {
    const PREFIXES: [&'static str; 3] = ["grade", "year", "form"];

    pub fn new(raw: &str) -> Option<Self> {
        let normalized = collapse_whitespace(raw).to_lowercase();
        if normalized.is_empty() {
            return None;
        }

        for prefix in Self::PREFIXES {
            if let Some(rest) = normalized.strip_prefix(prefix) {
                let rest = rest.trim_start_matches([' ', '-', '_']).trim();
                // 前缀后必须紧跟分隔符或数字，避免把 "grader" 之类截断
                let boundary_ok = rest.len() < normalized.len() - prefix.len()
                    || rest.starts_with(|c: char| c.is_ascii_digit());
                if !rest.is_empty() && boundary_ok {
                    return Some(Self(rest.to_string()));
                }
            }
        }

        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// 两边都是数字时按数值排序，"9" 排在 "10" 之前
impl Ord for GradeLevelKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<u64>(), other.0.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for GradeLevelKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GradeLevelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 查找或创建课程时使用的匹配键 (科目, 年级, 教师)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CourseKey {
    pub subject: SubjectKey,
    pub grade_level: GradeLevelKey,
    pub teacher_id: i64,
}

impl CourseKey {
    pub fn new(subject: &str, grade_level: &str, teacher_id: i64) -> Option<Self> {
        Some(Self {
            subject: SubjectKey::new(subject)?,
            grade_level: GradeLevelKey::new(grade_level)?,
            teacher_id,
        })
    }

    pub fn of_course(course: &Course) -> Option<Self> {
        Self::new(&course.subject, &course.grade_level, course.teacher_id)
    }
}

/// 按匹配键索引的课程，每组内按 ID 升序，第一个为规范课程
#[derive(Debug, Default)]
pub struct CourseIndex<'a> {
    groups: BTreeMap<CourseKey, Vec<&'a Course>>,
}

impl<'a> CourseIndex<'a> {
    pub fn build(courses: impl IntoIterator<Item = &'a Course>) -> Self {
        let mut groups: BTreeMap<CourseKey, Vec<&'a Course>> = BTreeMap::new();
        for course in courses {
            if let Some(key) = CourseKey::of_course(course) {
                groups.entry(key).or_default().push(course);
            }
        }
        for list in groups.values_mut() {
            list.sort_by_key(|c| c.id);
        }
        Self { groups }
    }

    pub fn matching(&self, key: &CourseKey) -> &[&'a Course] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn canonical(&self, key: &CourseKey) -> Option<&'a Course> {
        self.matching(key).first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CourseKey, &Vec<&'a Course>)> {
        self.groups.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::fixtures::course;

    #[test]
    fn test_grade_levels_sort_numerically() {
        let mut levels: Vec<GradeLevelKey> = ["Grade 10", "9", "year 12", "Kindergarten", "11"]
            .into_iter()
            .filter_map(GradeLevelKey::new)
            .collect();
        levels.sort();
        let order: Vec<&str> = levels.iter().map(GradeLevelKey::as_str).collect();
        assert_eq!(order, ["9", "10", "11", "12", "kindergarten"]);

        let padded = GradeLevelKey::new("09").expect("non-empty");
        let plain = GradeLevelKey::new("9").expect("non-empty");
        assert_ne!(padded.cmp(&plain), Ordering::Equal);
    }

    #[test]
    fn test_subject_key_normalization() {
        let a = SubjectKey::new("  Further   Mathematics ").expect("non-empty");
        let b = SubjectKey::new("further mathematics").expect("non-empty");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "further mathematics");
        assert!(SubjectKey::new("   ").is_none());
    }

    #[test]
    fn test_grade_level_prefixes() {
        let expected = GradeLevelKey::new("10").expect("non-empty");
        for raw in ["Grade 10", "grade-10", "GRADE_10", " grade10 ", "Year 10", "10"] {
            assert_eq!(GradeLevelKey::new(raw).as_ref(), Some(&expected), "{raw}");
        }
        assert_eq!(
            GradeLevelKey::new("Kindergarten").map(|k| k.as_str().to_string()),
            Some("kindergarten".to_string())
        );
        // 只有前缀本身时保留原词
        assert_eq!(
            GradeLevelKey::new("grade").map(|k| k.as_str().to_string()),
            Some("grade".to_string())
        );
        assert!(GradeLevelKey::new("").is_none());
    }

    #[test]
    fn test_most_common_spelling() {
        assert_eq!(
            most_common(["maths", "Maths", " Maths ", "maths"]),
            Some("maths".to_string())
        );
        assert_eq!(most_common(["Art", "Music"]), Some("Art".to_string()));
        assert_eq!(most_common(["  "]), None);
    }

    #[test]
    fn test_course_index_orders_by_id() {
        let courses = vec![
            course(7, "Biology", "Grade 9", 1),
            course(3, "biology ", "9", 1),
            course(5, "Biology", "9", 2),
        ];
        let index = CourseIndex::build(&courses);
        let key = CourseKey::new("BIOLOGY", "grade 9", 1).expect("valid key");
        let ids: Vec<i64> = index.matching(&key).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 7]);
        assert_eq!(index.canonical(&key).map(|c| c.id), Some(3));
    }
}
