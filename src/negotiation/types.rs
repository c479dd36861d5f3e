//! 协商的值对象：约束、候选方案、冲突与备选方案（单轮使用，不持久化）

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 费用指标名；`max_cost` 约束超出容差时转为「提高预算」备选
pub const COST_METRIC: &str = "cost";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// 达成值不得低于要求值
    Min,
    /// 达成值不得高于要求值
    Max,
}

/// 一条约束：`min_f1 = 90` 解析为 metric=f1, bound=Min, required=90
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub metric: String,
    pub bound: Bound,
    pub required: f64,
}

impl Constraint {
    pub fn min(metric: &str, required: f64) -> Self {
        Self {
            name: format!("min_{metric}"),
            metric: metric.to_string(),
            bound: Bound::Min,
            required,
        }
    }

    pub fn max(metric: &str, required: f64) -> Self {
        Self {
            name: format!("max_{metric}"),
            metric: metric.to_string(),
            bound: Bound::Max,
            required,
        }
    }

    /// 由 `min_*` / `max_*` 命名解析；其他命名返回 None
    pub fn parse(name: &str, required: f64) -> Option<Self> {
        if let Some(metric) = name.strip_prefix("min_").filter(|m| !m.is_empty()) {
            Some(Self::min(metric, required))
        } else if let Some(metric) = name.strip_prefix("max_").filter(|m| !m.is_empty()) {
            Some(Self::max(metric, required))
        } else {
            None
        }
    }

    /// 未满足的差距（满足时为 0）
    pub fn gap(&self, achieved: f64) -> f64 {
        let miss = match self.bound {
            Bound::Min => self.required - achieved,
            Bound::Max => achieved - self.required,
        };
        miss.max(0.0)
    }

    /// 相对差距：gap / |required|
    pub fn relative_gap(&self, achieved: f64) -> f64 {
        let gap = self.gap(achieved);
        if gap == 0.0 {
            0.0
        } else if self.required == 0.0 {
            f64::INFINITY
        } else {
            gap / self.required.abs()
        }
    }

    pub fn is_cost_ceiling(&self) -> bool {
        self.bound == Bound::Max && self.metric == COST_METRIC
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.bound {
            Bound::Min => ">=",
            Bound::Max => "<=",
        };
        write!(f, "{} {} {}", self.metric, op, fmt_num(self.required))
    }
}

/// 候选方案：标签 + 各指标达成值
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateOption {
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl CandidateOption {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, metric: &str, value: f64) -> Self {
        self.values.insert(metric.to_string(), Value::from(value));
        self
    }

    pub fn metric(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).and_then(Value::as_f64)
    }

    pub fn cost(&self) -> Option<f64> {
        self.metric(COST_METRIC)
    }

    pub(crate) fn display_label(&self, index: usize) -> String {
        if self.label.is_empty() {
            format!("option {}", index + 1)
        } else {
            self.label.clone()
        }
    }
}

/// 某方案在某约束上的未达成项；容差外的也记录，供说明淘汰原因
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub option: usize,
    pub option_label: String,
    pub constraint: String,
    pub required: f64,
    pub achieved: f64,
    pub gap: f64,
}

/// 一种可行的放宽策略
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub option: usize,
    pub label: String,
    /// 人类可读的取舍说明
    pub tradeoff: String,
    pub cost: Option<f64>,
    pub cost_delta: Option<f64>,
    /// 需要放宽的约束名
    pub relaxed: Vec<String>,
    pub recommended: bool,
}

/// 单轮协商结果；alternatives 为空表示无法满足
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NegotiationOutcome {
    pub conflicts: Vec<Conflict>,
    pub alternatives: Vec<Alternative>,
}

impl NegotiationOutcome {
    pub fn is_exhausted(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub fn recommended(&self) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.recommended)
    }
}

/// `<negotiate>` 块的 JSON 形状
#[derive(Clone, Debug, Deserialize)]
pub struct NegotiationRequest {
    pub constraints: BTreeMap<String, f64>,
    #[serde(default)]
    pub options: Vec<CandidateOption>,
}

impl NegotiationRequest {
    /// 解析约束名；无法识别的名称返回错误说明
    pub fn constraints(&self) -> Result<Vec<Constraint>, String> {
        self.constraints
            .iter()
            .map(|(name, required)| {
                Constraint::parse(name, *required)
                    .ok_or_else(|| format!("unsupported constraint '{name}': expected min_<metric> or max_<metric>"))
            })
            .collect()
    }
}

pub(crate) fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        let s = format!("{v:.2}");
        s.trim_end_matches('0').to_string()
    }
}
