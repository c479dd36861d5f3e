//! 约束协商：检测冲突并给出按费用排序的备选方案
//!
//! 判定规则（容差为相对值 gap / |required|）：
//! - 容差内未达成：记为 Conflict，方案仍可行（放宽该约束即可）
//! - 费用上限超出容差：方案可行，取舍为「提高预算」
//! - 其他约束超出容差：同样记为 Conflict，但方案不可行
//! - 缺少该指标：方案不可行
//!
//! 可行方案各生成一个 Alternative，按费用升序、相对差距之和升序排列，第一个标记为推荐。

use std::cmp::Ordering;

use crate::negotiation::types::fmt_num;
use crate::negotiation::{Alternative, CandidateOption, Conflict, Constraint, NegotiationOutcome};

pub struct Negotiator {
    tolerance: f64,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new(10.0)
    }
}

struct Viable {
    option: usize,
    label: String,
    cost: Option<f64>,
    total_gap: f64,
    relaxed: Vec<String>,
    notes: Vec<String>,
    over_budget: Option<f64>,
}

impl Negotiator {
    pub fn new(tolerance_percent: f64) -> Self {
        Self {
            tolerance: tolerance_percent.max(0.0) / 100.0,
        }
    }

    pub fn tolerance_percent(&self) -> f64 {
        self.tolerance * 100.0
    }

    pub fn negotiate(&self, constraints: &[Constraint], options: &[CandidateOption]) -> NegotiationOutcome {
        let mut conflicts = Vec::new();
        let mut viable = Vec::new();

        for (index, option) in options.iter().enumerate() {
            let label = option.display_label(index);
            let mut ok = true;
            let mut candidate = Viable {
                option: index,
                label: label.clone(),
                cost: option.cost(),
                total_gap: 0.0,
                relaxed: Vec::new(),
                notes: Vec::new(),
                over_budget: None,
            };

            for constraint in constraints {
                let Some(achieved) = option.metric(&constraint.metric) else {
                    ok = false;
                    break;
                };
                let gap = constraint.gap(achieved);
                if gap == 0.0 {
                    continue;
                }
                let relative = constraint.relative_gap(achieved);
                let conflict = Conflict {
                    option: index,
                    option_label: label.clone(),
                    constraint: constraint.name.clone(),
                    required: constraint.required,
                    achieved,
                    gap,
                };
                if relative <= self.tolerance {
                    conflicts.push(conflict);
                    candidate.total_gap += relative;
                    candidate.relaxed.push(constraint.name.clone());
                    candidate.notes.push(format!(
                        "accept {} {} instead of {} ({:.1}% off target)",
                        constraint.metric,
                        fmt_num(achieved),
                        fmt_num(constraint.required),
                        relative * 100.0
                    ));
                } else if constraint.is_cost_ceiling() {
                    candidate.total_gap += relative;
                    candidate.relaxed.push(constraint.name.clone());
                    candidate.over_budget = Some(gap);
                } else {
                    // 超出容差且无法靠加预算弥补：记录冲突后淘汰该方案
                    conflicts.push(conflict);
                    ok = false;
                    break;
                }
            }

            if ok {
                viable.push(candidate);
            }
        }

        viable.sort_by(|a, b| {
            let ca = a.cost.unwrap_or(f64::INFINITY);
            let cb = b.cost.unwrap_or(f64::INFINITY);
            ca.partial_cmp(&cb)
                .unwrap_or(Ordering::Equal)
                .then(a.total_gap.partial_cmp(&b.total_gap).unwrap_or(Ordering::Equal))
                .then(a.option.cmp(&b.option))
        });

        let ceiling = constraints.iter().find(|c| c.is_cost_ceiling()).map(|c| c.required);
        let baseline = ceiling.or_else(|| viable.iter().filter_map(|v| v.cost).reduce(f64::min));

        let alternatives = viable
            .into_iter()
            .enumerate()
            .map(|(rank, v)| {
                let cost_delta = match (v.cost, baseline) {
                    (Some(c), Some(b)) => Some(c - b),
                    _ => None,
                };
                Alternative {
                    option: v.option,
                    tradeoff: describe(&v, cost_delta),
                    label: v.label,
                    cost: v.cost,
                    cost_delta,
                    relaxed: v.relaxed,
                    recommended: rank == 0,
                }
            })
            .collect();

        NegotiationOutcome { conflicts, alternatives }
    }
}

fn describe(v: &Viable, cost_delta: Option<f64>) -> String {
    let mut parts = Vec::new();
    if let Some(over) = v.over_budget {
        parts.push(format!("increase budget by ${:.2}", over));
    }
    parts.extend(v.notes.iter().cloned());
    let head = if parts.is_empty() {
        format!("{} meets all constraints", v.label)
    } else {
        format!("{}: {}", v.label, parts.join("; "))
    };
    match (v.cost, cost_delta) {
        (Some(cost), Some(delta)) => {
            let sign = if delta < 0.0 { "-" } else { "+" };
            format!("{head} (cost ${cost:.2}, {sign}${:.2})", delta.abs())
        }
        (Some(cost), None) => format!("{head} (cost ${cost:.2})"),
        _ => head,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> (Vec<Constraint>, Vec<CandidateOption>) {
        (
            vec![Constraint::min("f1", 90.0), Constraint::max("cost", 2.0)],
            vec![
                CandidateOption::new("").with("f1", 87.0).with("cost", 1.5),
                CandidateOption::new("").with("f1", 92.0).with("cost", 5.0),
            ],
        )
    }

    #[test]
    fn test_f1_cost_scenario() {
        let (constraints, options) = scenario();
        let out = Negotiator::default().negotiate(&constraints, &options);

        assert_eq!(out.conflicts.len(), 1);
        let c = &out.conflicts[0];
        assert_eq!(c.option, 0);
        assert_eq!(c.constraint, "min_f1");
        assert_eq!(c.required, 90.0);
        assert_eq!(c.achieved, 87.0);
        assert_eq!(c.gap, 3.0);

        assert_eq!(out.alternatives.len(), 2);
        let rec = out.recommended().unwrap();
        assert_eq!(rec.option, 0);
        assert_eq!(rec.cost_delta, Some(-0.5));
        assert!(rec.tradeoff.contains("accept f1 87 instead of 90"));

        let second = &out.alternatives[1];
        assert!(!second.recommended);
        assert_eq!(second.cost_delta, Some(3.0));
        assert!(second.tradeoff.contains("increase budget by $3.00"));
    }

    #[test]
    fn test_non_cost_miss_beyond_tolerance_is_not_viable() {
        let out = Negotiator::default().negotiate(
            &[Constraint::min("f1", 90.0)],
            &[CandidateOption::new("weak").with("f1", 70.0).with("cost", 1.0)],
        );
        assert!(out.is_exhausted());
        assert_eq!(out.conflicts.len(), 1);
        let c = &out.conflicts[0];
        assert_eq!(c.option_label, "weak");
        assert_eq!(c.constraint, "min_f1");
        assert_eq!(c.achieved, 70.0);
        assert_eq!(c.gap, 20.0);
    }

    #[test]
    fn test_missing_metric_is_not_viable() {
        let out = Negotiator::default().negotiate(
            &[Constraint::max("time_hours", 2.0)],
            &[CandidateOption::new("x").with("cost", 1.0)],
        );
        assert!(out.is_exhausted());
    }

    #[test]
    fn test_tolerance_is_configurable() {
        let (constraints, options) = scenario();
        // 3/90 ≈ 3.3%，容差 2% 时 option 1 不可行，只剩提高预算
        let out = Negotiator::new(2.0).negotiate(&constraints, &options);
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].option, 0);
        assert_eq!(out.alternatives.len(), 1);
        assert_eq!(out.alternatives[0].option, 1);
        assert!(out.alternatives[0].recommended);
    }

    #[test]
    fn test_ties_broken_by_gap() {
        let out = Negotiator::default().negotiate(
            &[Constraint::min("f1", 90.0)],
            &[
                CandidateOption::new("close").with("f1", 88.0).with("cost", 2.0),
                CandidateOption::new("exact").with("f1", 90.0).with("cost", 2.0),
            ],
        );
        assert_eq!(out.alternatives[0].label, "exact");
        assert_eq!(out.alternatives[0].cost_delta, Some(0.0));
        assert!(out.alternatives[0].tradeoff.contains("meets all constraints"));
    }
}
