//! Operator-defined remediation rules
//!
//! Conditions are one or two comparisons joined by a single `AND` or `OR`:
//!
//! ```text
//! cpu > 85
//! latency_p95 >= 400 AND nodeCount < maxNodes
//! errorRate > 2 OR disk >= 92
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::models::{ActionType, AlertLevel, ClusterRecord, MetricsBundle, RemediationAction};

use super::LATENCY_OPTIMIZATIONS;

/// Errors raised while parsing or evaluating a rule condition
#[derive(Debug, Error, PartialEq)]
pub enum ConditionError {
    #[error("malformed condition: {0}")]
    Syntax(String),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("metric {0} not present in snapshot")]
    MissingMetric(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Variable {
    Cpu,
    Memory,
    Disk,
    LatencyP95,
    QueryRate,
    ErrorRate,
    NodeCount,
    MinNodes,
    MaxNodes,
}

impl Variable {
    fn parse(token: &str) -> Option<Self> {
        let variable = match token {
            "cpu" => Variable::Cpu,
            "memory" => Variable::Memory,
            "disk" => Variable::Disk,
            "latency_p95" => Variable::LatencyP95,
            "queryRate" => Variable::QueryRate,
            "errorRate" => Variable::ErrorRate,
            "nodeCount" => Variable::NodeCount,
            "minNodes" => Variable::MinNodes,
            "maxNodes" => Variable::MaxNodes,
            _ => return None,
        };
        Some(variable)
    }

    fn resolve(self, ctx: &RuleContext<'_>) -> Result<f64, ConditionError> {
        let metric = |value: Option<f64>, name: &'static str| {
            value.ok_or(ConditionError::MissingMetric(name))
        };
        let metrics = ctx.metrics;
        match self {
            Variable::Cpu => metric(metrics.and_then(|m| m.cpu), "cpu"),
            Variable::Memory => metric(metrics.and_then(|m| m.memory), "memory"),
            Variable::Disk => metric(metrics.and_then(|m| m.disk), "disk"),
            Variable::LatencyP95 => metric(metrics.and_then(|m| m.latency_p95), "latency_p95"),
            Variable::QueryRate => metric(metrics.and_then(|m| m.query_rate), "queryRate"),
            Variable::ErrorRate => metric(metrics.and_then(|m| m.error_rate), "errorRate"),
            Variable::NodeCount => Ok(f64::from(ctx.node_count)),
            Variable::MinNodes => Ok(f64::from(ctx.min_nodes)),
            Variable::MaxNodes => Ok(f64::from(ctx.max_nodes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Operand {
    Number(f64),
    Variable(Variable),
}

impl Operand {
    fn parse(token: &str) -> Result<Self, ConditionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConditionError::Syntax("missing operand".to_string()));
        }
        if let Ok(number) = token.parse::<f64>() {
            return Ok(Operand::Number(number));
        }
        Variable::parse(token)
            .map(Operand::Variable)
            .ok_or_else(|| ConditionError::UnknownVariable(token.to_string()))
    }

    fn value(&self, ctx: &RuleContext<'_>) -> Result<f64, ConditionError> {
        match self {
            Operand::Number(n) => Ok(*n),
            Operand::Variable(v) => v.resolve(ctx),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparator {
    Ge,
    Le,
    Gt,
    Lt,
}

/// Longest operators first so `>=` is not read as `>`
const COMPARATORS: [(&str, Comparator); 4] = [
    (">=", Comparator::Ge),
    ("<=", Comparator::Le),
    (">", Comparator::Gt),
    ("<", Comparator::Lt),
];

#[derive(Debug, Clone, PartialEq)]
struct Comparison {
    left: Operand,
    comparator: Comparator,
    right: Operand,
}

impl Comparison {
    fn parse(text: &str) -> Result<Self, ConditionError> {
        let (symbol, comparator) = COMPARATORS
            .iter()
            .find(|(symbol, _)| text.contains(symbol))
            .ok_or_else(|| ConditionError::Syntax(format!("no comparison in '{}'", text.trim())))?;
        let (left, right) = text
            .split_once(symbol)
            .ok_or_else(|| ConditionError::Syntax(text.to_string()))?;
        Ok(Self {
            left: Operand::parse(left)?,
            comparator: *comparator,
            right: Operand::parse(right)?,
        })
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<bool, ConditionError> {
        let left = self.left.value(ctx)?;
        let right = self.right.value(ctx)?;
        Ok(match self.comparator {
            Comparator::Gt => left > right,
            Comparator::Lt => left < right,
            Comparator::Ge => left >= right,
            Comparator::Le => left <= right,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Joiner {
    And,
    Or,
}

/// Parsed rule condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    first: Comparison,
    rest: Option<(Joiner, Comparison)>,
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let joiners: Vec<(usize, Joiner)> = tokens
            .iter()
            .enumerate()
            .filter_map(|(i, token)| match token.to_ascii_uppercase().as_str() {
                "AND" => Some((i, Joiner::And)),
                "OR" => Some((i, Joiner::Or)),
                _ => None,
            })
            .collect();

        match joiners.as_slice() {
            [] => Ok(Self {
                first: Comparison::parse(&tokens.join(" "))?,
                rest: None,
            }),
            [(at, joiner)] => Ok(Self {
                first: Comparison::parse(&tokens[..*at].join(" "))?,
                rest: Some((*joiner, Comparison::parse(&tokens[at + 1..].join(" "))?)),
            }),
            _ => Err(ConditionError::Syntax(format!(
                "only one AND/OR is supported in '{}'",
                s
            ))),
        }
    }
}

impl Condition {
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Result<bool, ConditionError> {
        let first = self.first.evaluate(ctx)?;
        match &self.rest {
            None => Ok(first),
            Some((Joiner::And, second)) => Ok(first && second.evaluate(ctx)?),
            Some((Joiner::Or, second)) => Ok(first || second.evaluate(ctx)?),
        }
    }
}

/// Values a condition can refer to
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub metrics: Option<&'a MetricsBundle>,
    pub node_count: u32,
    pub min_nodes: u32,
    pub max_nodes: u32,
}

impl<'a> RuleContext<'a> {
    pub fn for_record(record: &ClusterRecord, metrics: Option<&'a MetricsBundle>) -> Self {
        Self {
            metrics,
            node_count: record.spec.node_count,
            min_nodes: record.min_nodes(),
            max_nodes: record.max_nodes(),
        }
    }
}

/// Actions for every custom rule on the cluster whose condition holds
pub fn evaluate_custom_rules(
    record: &ClusterRecord,
    metrics: Option<&MetricsBundle>,
) -> Vec<RemediationAction> {
    let ctx = RuleContext::for_record(record, metrics);
    let node_count = record.spec.node_count;

    record
        .spec
        .remediation_rules
        .iter()
        .filter_map(|rule| {
            let fired = rule
                .condition
                .parse::<Condition>()
                .and_then(|condition| condition.evaluate(&ctx));
            match fired {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    debug!(
                        cluster = %record.name(),
                        rule = %rule.name,
                        error = %e,
                        "Custom rule not evaluated"
                    );
                    return None;
                }
            }

            let priority = rule.priority.unwrap_or_default();
            let reason = format!("Custom rule {}: {}", rule.name, rule.condition);
            let action = RemediationAction::new(rule.action, priority, rule.name.clone(), reason);
            let action = match rule.action {
                ActionType::ScaleOut if record.can_scale() => {
                    action.with_target_nodes(node_count + 1)
                }
                ActionType::EmergencyScale if record.can_scale() => {
                    action.with_target_nodes(node_count.saturating_mul(2).min(record.max_nodes()))
                }
                ActionType::ScaleIn if record.can_scale_in() => {
                    action.with_target_nodes(node_count - 1)
                }
                ActionType::OptimizeCluster => action.with_optimizations(LATENCY_OPTIMIZATIONS),
                ActionType::Alert => action.with_alert_level(AlertLevel::Warning),
                ActionType::AlertCritical => action.with_alert_level(AlertLevel::Critical),
                ActionType::CreateNewCluster => action,
                _ => return None,
            };
            Some(action)
        })
        .collect()
}
