//! 科目名解析
//!
//! 成绩里的科目是教师随手填写的文本（"Maths"、"Chem"、"Biology Lab"），
//! 需要解析到一组已知科目键中的某一个。解析顺序：精确匹配、别名匹配、
//! 整词包含匹配；后两步要求结果唯一，否则视为无法解析。

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::keys::SubjectKey;

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("math", "mathematics"),
    ("maths", "mathematics"),
    ("bio", "biology"),
    ("chem", "chemistry"),
    ("phys", "physics"),
    ("eng", "english"),
    ("ict", "information technology"),
    ("it", "information technology"),
    ("hist", "history"),
    ("geo", "geography"),
];

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "subject", rename_all = "snake_case")]
pub enum Resolution {
    Exact(SubjectKey),
    Alias(SubjectKey),
    Fuzzy(SubjectKey),
    Unresolved,
}

impl Resolution {
    pub fn key(&self) -> Option<&SubjectKey> {
        match self {
            Resolution::Exact(k) | Resolution::Alias(k) | Resolution::Fuzzy(k) => Some(k),
            Resolution::Unresolved => None,
        }
    }

    pub fn into_key(self) -> Option<SubjectKey> {
        match self {
            Resolution::Exact(k) | Resolution::Alias(k) | Resolution::Fuzzy(k) => Some(k),
            Resolution::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubjectResolver {
    known: BTreeSet<SubjectKey>,
    aliases: HashMap<SubjectKey, SubjectKey>,
}

impl SubjectResolver {
    pub fn new(known: impl IntoIterator<Item = SubjectKey>) -> Self {
        let aliases = BUILTIN_ALIASES
            .iter()
            .filter_map(|(alias, target)| Some((SubjectKey::new(alias)?, SubjectKey::new(target)?)))
            .collect();
        Self {
            known: known.into_iter().collect(),
            aliases,
        }
    }

    /// 追加配置中的别名，配置项覆盖内置别名
    pub fn with_aliases(mut self, extra: &HashMap<String, String>) -> Self {
        for (alias, target) in extra {
            if let (Some(alias), Some(target)) = (SubjectKey::new(alias), SubjectKey::new(target)) {
                self.aliases.insert(alias, target);
            }
        }
        self
    }

    pub fn known(&self) -> &BTreeSet<SubjectKey> {
        &self.known
    }

    fn canonical<'k>(&'k self, key: &'k SubjectKey) -> &'k SubjectKey {
        self.aliases.get(key).unwrap_or(key)
    }

    pub fn resolve(&self, raw: &str) -> Resolution {
        let Some(candidate) = SubjectKey::new(raw) else {
            return Resolution::Unresolved;
        };

        if self.known.contains(&candidate) {
            return Resolution::Exact(candidate);
        }

        // 别名：两边都换成标准名后比较，已知科目本身也可能是别名
        let target = self.canonical(&candidate);
        let alias_hits: Vec<&SubjectKey> = self
            .known
            .iter()
            .filter(|k| self.canonical(k) == target)
            .collect();
        if let [single] = alias_hits.as_slice() {
            return Resolution::Alias((*single).clone());
        }
        if alias_hits.len() > 1 {
            return Resolution::Unresolved;
        }

        let candidate_words = candidate.words();
        let fuzzy_hits: Vec<&SubjectKey> = self
            .known
            .iter()
            .filter(|k| {
                let known_words = k.words();
                contains_words(&known_words, &candidate_words)
                    || contains_words(&candidate_words, &known_words)
            })
            .collect();
        match fuzzy_hits.as_slice() {
            [single] => Resolution::Fuzzy((*single).clone()),
            _ => Resolution::Unresolved,
        }
    }
}

/// needle 是否作为连续整词出现在 haystack 中
fn contains_words(haystack: &[&str], needle: &[&str]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
