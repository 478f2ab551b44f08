//! Declarative policy rules evaluated against a decision metrics document.
//!
//! Rules are polymorphic over [`PolicyRule::evaluate`]. A rule never fails the
//! evaluation: missing metrics, type mismatches and predicate failures are
//! logged and reported as `triggered = false` in that rule's slot.
//!
//! # Ordering
//! Rules run in descending priority (`CRITICAL` first), stable with respect
//! to registration order. With `stop_on_critical`, once a CRITICAL rule
//! triggers every remaining lower-priority rule is reported as not evaluated.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::errors::{PolicyConfigError, RuleError};
use crate::domain::models::{
    AggregationConfig, PolicyAction, PolicyConfig, PolicyEvaluation, PolicyRuleResult,
    RuleDefinition, RulePriority,
};

/// Average confidence below which the built-in rule asks for review.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Critic error rate above which the built-in rule asks for review.
pub const MAX_CRITIC_ERROR_RATE: f64 = 0.5;

/// A single governance rule.
pub trait PolicyRule: Send + Sync {
    fn name(&self) -> &str;

    fn priority(&self) -> RulePriority;

    /// Action recommended when the rule triggers.
    fn action(&self) -> PolicyAction;

    /// Evaluate against the metrics document. Never panics or fails.
    fn evaluate(&self, metrics: &Value) -> PolicyRuleResult;
}

/// Comparison operator of a [`ThresholdRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    GreaterOrEqual,
    Greater,
    LessOrEqual,
    Less,
    Equal,
    NotEqual,
}

impl ComparisonOperator {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GreaterOrEqual => ">=",
            Self::Greater => ">",
            Self::LessOrEqual => "<=",
            Self::Less => "<",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        }
    }

    /// Whether the operator needs numeric operands.
    pub const fn is_ordering(&self) -> bool {
        !matches!(self, Self::Equal | Self::NotEqual)
    }

    fn compare_numbers(self, actual: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterOrEqual => actual >= threshold,
            Self::Greater => actual > threshold,
            Self::LessOrEqual => actual <= threshold,
            Self::Less => actual < threshold,
            Self::Equal => (actual - threshold).abs() < f64::EPSILON,
            Self::NotEqual => (actual - threshold).abs() >= f64::EPSILON,
        }
    }
}

impl FromStr for ComparisonOperator {
    type Err = PolicyConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">=" => Ok(Self::GreaterOrEqual),
            ">" => Ok(Self::Greater),
            "<=" => Ok(Self::LessOrEqual),
            "<" => Ok(Self::Less),
            "==" => Ok(Self::Equal),
            "!=" => Ok(Self::NotEqual),
            other => Err(PolicyConfigError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve a dot-separated path such as `conflicts.critical`.
pub fn lookup_metric<'a>(metrics: &'a Value, path: &str) -> Result<&'a Value, RuleError> {
    path.split('.')
        .try_fold(metrics, |node, segment| node.get(segment))
        .filter(|value| !value.is_null())
        .ok_or_else(|| RuleError::MissingMetric(path.to_string()))
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compares one metric against a fixed threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    name: String,
    metric: String,
    operator: ComparisonOperator,
    threshold: Value,
    action: PolicyAction,
    priority: RulePriority,
    description: String,
}

impl ThresholdRule {
    /// Build a rule, rejecting unknown operators and malformed definitions.
    pub fn new(
        name: impl Into<String>,
        metric: impl Into<String>,
        operator: &str,
        threshold: impl Into<Value>,
        action: PolicyAction,
        priority: RulePriority,
    ) -> Result<Self, PolicyConfigError> {
        let name = name.into();
        let metric = metric.into();
        let threshold = threshold.into();

        if name.trim().is_empty() {
            return Err(PolicyConfigError::EmptyRuleName);
        }
        if metric.trim().is_empty() {
            return Err(PolicyConfigError::EmptyMetricPath(name));
        }

        let operator: ComparisonOperator = operator.parse()?;
        if operator.is_ordering() && !threshold.is_number() {
            return Err(PolicyConfigError::NonNumericThreshold {
                rule: name,
                operator: operator.to_string(),
            });
        }

        Ok(Self {
            name,
            metric,
            operator,
            threshold,
            action,
            priority,
            description: String::new(),
        })
    }

    pub fn from_definition(definition: &RuleDefinition) -> Result<Self, PolicyConfigError> {
        Ok(Self::new(
            definition.name.clone(),
            definition.metric.clone(),
            &definition.operator,
            definition.threshold.clone(),
            definition.action,
            definition.priority,
        )?
        .with_description(definition.description.clone()))
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Rule with a known-good operator and threshold.
    fn builtin(
        name: &str,
        metric: &str,
        operator: ComparisonOperator,
        threshold: impl Into<Value>,
        action: PolicyAction,
        priority: RulePriority,
    ) -> Self {
        Self {
            name: name.to_string(),
            metric: metric.to_string(),
            operator,
            threshold: threshold.into(),
            action,
            priority,
            description: String::new(),
        }
    }

    /// Triggers when the average critic confidence falls below `threshold`.
    pub fn min_confidence_threshold(threshold: f64, action: PolicyAction) -> Self {
        Self {
            name: "min_confidence_threshold".to_string(),
            metric: "avg_confidence".to_string(),
            operator: ComparisonOperator::Less,
            threshold: Value::from(threshold),
            action,
            priority: RulePriority::High,
            description: format!("Average critic confidence below {threshold}"),
        }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub const fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub const fn threshold(&self) -> &Value {
        &self.threshold
    }

    fn check<'m>(&self, metrics: &'m Value) -> Result<(bool, &'m Value), RuleError> {
        let actual = lookup_metric(metrics, &self.metric)?;

        if let (Some(a), Some(t)) = (actual.as_f64(), self.threshold.as_f64()) {
            return Ok((self.operator.compare_numbers(a, t), actual));
        }

        if self.operator.is_ordering() {
            return Err(RuleError::TypeMismatch {
                path: self.metric.clone(),
                expected: "number",
                found: type_name(actual),
            });
        }

        if type_name(actual) != type_name(&self.threshold) {
            return Err(RuleError::TypeMismatch {
                path: self.metric.clone(),
                expected: type_name(&self.threshold),
                found: type_name(actual),
            });
        }

        let equal = actual == &self.threshold;
        let triggered = match self.operator {
            ComparisonOperator::Equal => equal,
            _ => !equal,
        };
        Ok((triggered, actual))
    }
}

impl PolicyRule for ThresholdRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> RulePriority {
        self.priority
    }

    fn action(&self) -> PolicyAction {
        self.action
    }

    fn evaluate(&self, metrics: &Value) -> PolicyRuleResult {
        match self.check(metrics) {
            Ok((triggered, actual)) => {
                let comparison = format!(
                    "{} = {} {} {}",
                    self.metric, actual, self.operator, self.threshold
                );
                let reason = match (triggered, self.description.is_empty()) {
                    (true, false) => format!("{}: {comparison}", self.description),
                    (true, true) => comparison,
                    (false, _) => format!("Not triggered: {comparison} is false"),
                };
                PolicyRuleResult {
                    rule_name: self.name.clone(),
                    triggered,
                    evaluated: true,
                    action: self.action,
                    priority: self.priority,
                    reason,
                    confidence: 1.0,
                }
            }
            Err(err) => failed_result(self, &err),
        }
    }
}

type Predicate = Box<dyn Fn(&Value) -> Result<bool, RuleError> + Send + Sync>;
type ReasonFn = Box<dyn Fn(&Value) -> String + Send + Sync>;

/// Rule driven by an arbitrary predicate and reason generator.
pub struct CustomRule {
    name: String,
    action: PolicyAction,
    priority: RulePriority,
    predicate: Predicate,
    reason: ReasonFn,
}

impl CustomRule {
    pub fn new<P, R>(
        name: impl Into<String>,
        action: PolicyAction,
        priority: RulePriority,
        predicate: P,
        reason: R,
    ) -> Self
    where
        P: Fn(&Value) -> Result<bool, RuleError> + Send + Sync + 'static,
        R: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            action,
            priority,
            predicate: Box::new(predicate),
            reason: Box::new(reason),
        }
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("name", &self.name)
            .field("action", &self.action)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl PolicyRule for CustomRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> RulePriority {
        self.priority
    }

    fn action(&self) -> PolicyAction {
        self.action
    }

    fn evaluate(&self, metrics: &Value) -> PolicyRuleResult {
        match (self.predicate)(metrics) {
            Ok(triggered) => PolicyRuleResult {
                rule_name: self.name.clone(),
                triggered,
                evaluated: true,
                action: self.action,
                priority: self.priority,
                reason: if triggered {
                    (self.reason)(metrics)
                } else {
                    "Condition not met".to_string()
                },
                confidence: 1.0,
            },
            Err(err) => failed_result(self, &err),
        }
    }
}

fn failed_result(rule: &dyn PolicyRule, err: &RuleError) -> PolicyRuleResult {
    warn!(rule = rule.name(), error = %err, "Policy rule could not be evaluated");
    PolicyRuleResult {
        rule_name: rule.name().to_string(),
        triggered: false,
        evaluated: true,
        action: rule.action(),
        priority: rule.priority(),
        reason: err.to_string(),
        confidence: 0.0,
    }
}

/// Ordered rule set with critical short-circuiting.
pub struct PolicyEngine {
    rules: Vec<Box<dyn PolicyRule>>,
    stop_on_critical: bool,
}

impl PolicyEngine {
    /// Empty engine.
    pub fn new(stop_on_critical: bool) -> Self {
        Self {
            rules: Vec::new(),
            stop_on_critical,
        }
    }

    /// Engine from configuration: built-in rules (if enabled) followed by the
    /// declared threshold rules.
    pub fn from_config(
        config: &PolicyConfig,
        aggregation: &AggregationConfig,
    ) -> Result<Self, PolicyConfigError> {
        let mut engine = Self::new(config.stop_on_critical);

        if config.use_default_rules {
            for rule in Self::default_rules(aggregation.ambiguity_threshold) {
                engine.add_rule(rule)?;
            }
        }

        for definition in &config.rules {
            engine.add_rule(Box::new(ThresholdRule::from_definition(definition)?))?;
        }

        debug!(rules = engine.rules.len(), "Policy engine configured");
        Ok(engine)
    }

    /// Register a rule. Names must be unique within the engine.
    pub fn add_rule(&mut self, rule: Box<dyn PolicyRule>) -> Result<(), PolicyConfigError> {
        if rule.name().trim().is_empty() {
            return Err(PolicyConfigError::EmptyRuleName);
        }
        if self.rules.iter().any(|r| r.name() == rule.name()) {
            return Err(PolicyConfigError::DuplicateRule(rule.name().to_string()));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Builder form of [`Self::add_rule`].
    pub fn with_rule(mut self, rule: impl PolicyRule + 'static) -> Result<Self, PolicyConfigError> {
        self.add_rule(Box::new(rule))?;
        Ok(self)
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn PolicyRule> {
        self.rules.iter().map(|rule| &**rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule in priority order.
    pub fn evaluate_all(&self, metrics: &Value) -> PolicyEvaluation {
        let mut ordered: Vec<&dyn PolicyRule> = self.rules().collect();
        ordered.sort_by(|a, b| b.priority().cmp(&a.priority()));

        let mut results = Vec::with_capacity(ordered.len());
        let mut stopped_early = false;

        for rule in ordered {
            if stopped_early && rule.priority() < RulePriority::Critical {
                results.push(PolicyRuleResult::not_evaluated(
                    rule.name(),
                    rule.action(),
                    rule.priority(),
                ));
                continue;
            }

            let result = rule.evaluate(metrics);
            if result.triggered {
                debug!(
                    rule = rule.name(),
                    action = %result.action,
                    priority = %result.priority,
                    "Policy rule triggered"
                );
                if self.stop_on_critical && result.priority == RulePriority::Critical {
                    stopped_early = true;
                }
            }
            results.push(result);
        }

        let recommended_action = Self::recommended_action(&results);
        let triggered_rules = results
            .iter()
            .filter(|r| r.triggered)
            .map(|r| r.rule_name.clone())
            .collect();

        PolicyEvaluation {
            results,
            recommended_action,
            triggered_rules,
            stopped_early,
        }
    }

    /// Most restrictive action among triggered rules; ALLOW when none fired.
    pub fn recommended_action(results: &[PolicyRuleResult]) -> PolicyAction {
        results
            .iter()
            .filter(|r| r.triggered)
            .map(|r| r.action)
            .fold(PolicyAction::Allow, PolicyAction::most_restrictive)
    }

    /// Built-in governance rules.
    ///
    /// The ambiguity warning fires at the same variance that makes the
    /// aggregator escalate to REVIEW.
    pub fn default_rules(ambiguity_threshold: f64) -> Vec<Box<dyn PolicyRule>> {
        use ComparisonOperator::{Equal, Greater};

        let rules = [
            ThresholdRule::min_confidence_threshold(DEFAULT_MIN_CONFIDENCE, PolicyAction::Review),
            ThresholdRule::builtin(
                "blocking_verdict",
                "overall_verdict",
                Equal,
                "BLOCK",
                PolicyAction::Deny,
                RulePriority::Critical,
            )
            .with_description("Panel verdict is BLOCK"),
            ThresholdRule::builtin(
                "critical_conflicts",
                "conflicts.critical",
                Greater,
                0,
                PolicyAction::Escalate,
                RulePriority::Critical,
            )
            .with_description("Critical conflict among critics"),
            ThresholdRule::builtin(
                "review_verdict",
                "overall_verdict",
                Equal,
                "REVIEW",
                PolicyAction::Review,
                RulePriority::High,
            )
            .with_description("Panel verdict is REVIEW"),
            ThresholdRule::builtin(
                "conflict_escalation",
                "conflicts.requires_escalation",
                Equal,
                true,
                PolicyAction::Escalate,
                RulePriority::High,
            )
            .with_description("Conflicts require escalation"),
            ThresholdRule::builtin(
                "critic_error_rate",
                "critics.error_rate",
                Greater,
                MAX_CRITIC_ERROR_RATE,
                PolicyAction::Review,
                RulePriority::Medium,
            )
            .with_description("Too many critics failed"),
            ThresholdRule::builtin(
                "ambiguity_warning",
                "ambiguity",
                Greater,
                ambiguity_threshold,
                PolicyAction::Warn,
                RulePriority::Low,
            )
            .with_description("Critic confidences are spread out"),
        ];

        rules
            .into_iter()
            .map(|r| Box::new(r) as Box<dyn PolicyRule>)
            .collect()
    }
}

impl fmt::Debug for PolicyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyEngine")
            .field("rules", &self.rules().map(|r| r.name()).collect::<Vec<_>>())
            .field("stop_on_critical", &self.stop_on_critical)
            .finish()
    }
}
