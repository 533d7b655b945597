use serde::{Deserialize, Serialize};

/// 换算为百分制，满分不为正数时忽略该成绩
pub fn percentage(score: f64, max_score: f64) -> Option<f64> {
    if max_score <= 0.0 || !score.is_finite() || !max_score.is_finite() {
        return None;
    }
    Some(score / max_score * 100.0)
}

/// 保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 分数统计（百分制）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub grade_count: usize,
    pub average_percentage: Option<f64>,
    pub highest_percentage: Option<f64>,
    pub lowest_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    sum: f64,
    count: usize,
    max: Option<f64>,
    min: Option<f64>,
}

impl ScoreAccumulator {
    pub fn push(&mut self, pct: f64) {
        self.sum += pct;
        self.count += 1;
        self.max = Some(self.max.map_or(pct, |m| m.max(pct)));
        self.min = Some(self.min.map_or(pct, |m| m.min(pct)));
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| round2(self.sum / self.count as f64))
    }

    pub fn summary(&self) -> ScoreSummary {
        ScoreSummary {
            grade_count: self.count,
            average_percentage: self.average(),
            highest_percentage: self.max.map(round2),
            lowest_percentage: self.min.map(round2),
        }
    }
}

impl FromIterator<f64> for ScoreAccumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = ScoreAccumulator::default();
        for pct in iter {
            acc.push(pct);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(45.0, 50.0), Some(90.0));
        assert_eq!(percentage(3.0, 0.0), None);
        assert_eq!(percentage(3.0, -10.0), None);
    }

    #[test]
    fn test_summary_rounds_to_two_decimals() {
        let acc: ScoreAccumulator = [100.0, 66.666_666, 50.0].into_iter().collect();
        let summary = acc.summary();
        assert_eq!(summary.grade_count, 3);
        assert_eq!(summary.average_percentage, Some(72.22));
        assert_eq!(summary.highest_percentage, Some(100.0));
        assert_eq!(summary.lowest_percentage, Some(50.0));
    }

    #[test]
    fn test_empty_summary() {
        let summary = ScoreAccumulator::default().summary();
        assert_eq!(summary, ScoreSummary::default());
        assert!(summary.average_percentage.is_none());
    }
}
