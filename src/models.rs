use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Highest score a single category can nominally receive
pub const CATEGORY_MAX: i32 = 10;

/// The ten fixed quality categories, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Clarity,
    Specificity,
    Completeness,
    Control,
    Stability,
    Safety,
    HallucinationResistance,
    FormattingStrength,
    Actionability,
    DomainFit,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Clarity,
        Category::Specificity,
        Category::Completeness,
        Category::Control,
        Category::Stability,
        Category::Safety,
        Category::HallucinationResistance,
        Category::FormattingStrength,
        Category::Actionability,
        Category::DomainFit,
    ];

    /// camelCase key used in JSON records
    pub fn key(self) -> &'static str {
        match self {
            Category::Clarity => "clarity",
            Category::Specificity => "specificity",
            Category::Completeness => "completeness",
            Category::Control => "control",
            Category::Stability => "stability",
            Category::Safety => "safety",
            Category::HallucinationResistance => "hallucinationResistance",
            Category::FormattingStrength => "formattingStrength",
            Category::Actionability => "actionability",
            Category::DomainFit => "domainFit",
        }
    }

    /// Full label shown on score cards and table rows
    pub fn label(self) -> &'static str {
        match self {
            Category::Clarity => "Clarity",
            Category::Specificity => "Specificity",
            Category::Completeness => "Completeness",
            Category::Control => "Control",
            Category::Stability => "Stability",
            Category::Safety => "Safety",
            Category::HallucinationResistance => "Hallucination Resistance",
            Category::FormattingStrength => "Formatting Strength",
            Category::Actionability => "Actionability",
            Category::DomainFit => "Domain Fit",
        }
    }

    /// Short axis label for radar charts
    pub fn subject(self) -> &'static str {
        match self {
            Category::HallucinationResistance => "Hallucination Resist.",
            Category::FormattingStrength => "Formatting",
            other => other.label(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the camelCase key, kebab-case or snake_case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Category::ALL
            .into_iter()
            .find(|category| category.key().to_ascii_lowercase() == normalized)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Scores for the ten categories, each conventionally in 0..=10
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationScore {
    pub clarity: i32,
    pub specificity: i32,
    pub completeness: i32,
    pub control: i32,
    pub stability: i32,
    pub safety: i32,
    pub hallucination_resistance: i32,
    pub formatting_strength: i32,
    pub actionability: i32,
    pub domain_fit: i32,
}

impl EvaluationScore {
    /// Build a score record from values listed in `Category::ALL` order
    pub fn from_array(values: [i32; 10]) -> Self {
        let [
            clarity,
            specificity,
            completeness,
            control,
            stability,
            safety,
            hallucination_resistance,
            formatting_strength,
            actionability,
            domain_fit,
        ] = values;

        Self {
            clarity,
            specificity,
            completeness,
            control,
            stability,
            safety,
            hallucination_resistance,
            formatting_strength,
            actionability,
            domain_fit,
        }
    }

    pub fn get(&self, category: Category) -> i32 {
        match category {
            Category::Clarity => self.clarity,
            Category::Specificity => self.specificity,
            Category::Completeness => self.completeness,
            Category::Control => self.control,
            Category::Stability => self.stability,
            Category::Safety => self.safety,
            Category::HallucinationResistance => self.hallucination_resistance,
            Category::FormattingStrength => self.formatting_strength,
            Category::Actionability => self.actionability,
            Category::DomainFit => self.domain_fit,
        }
    }

    /// (category, score) pairs in display order
    pub fn iter(&self) -> impl Iterator<Item = (Category, i32)> + '_ {
        Category::ALL.into_iter().map(|category| (category, self.get(category)))
    }
}

/// What a scorer produces for a single prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub scores: EvaluationScore,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: String,
    pub optimized_prompt: Option<String>,
}

/// Outcome of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub scores: EvaluationScore,
    /// Sum of the ten category scores
    pub total_score: i32,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: String,
    /// Only populated in single-prompt mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_prompt: Option<String>,
}

impl EvaluationResult {
    pub fn from_assessment(assessment: Assessment) -> Self {
        Self {
            total_score: crate::scoring::aggregate(&assessment.scores),
            scores: assessment.scores,
            issues: assessment.issues,
            recommendations: assessment.recommendations,
            summary: assessment.summary,
            optimized_prompt: assessment.optimized_prompt,
        }
    }
}

/// A comparison slot as edited by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    pub id: Uuid,
    pub name: String,
    pub value: String,
    pub color: String,
}

impl PromptEntry {
    /// Whether the entry carries prompt text worth scoring
    pub fn is_filled(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// Evaluation of one comparison entry, correlated back to its slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    #[serde(flatten)]
    pub evaluation: EvaluationResult,
}

impl ComparisonResult {
    pub fn new(entry: &PromptEntry, assessment: Assessment) -> Self {
        let mut evaluation = EvaluationResult::from_assessment(assessment);
        evaluation.optimized_prompt = None;

        Self {
            id: entry.id,
            name: entry.name.clone(),
            color: entry.color.clone(),
            evaluation,
        }
    }

    pub fn total_score(&self) -> i32 {
        self.evaluation.total_score
    }
}
