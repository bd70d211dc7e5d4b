use crate::error::ScoreError;
use crate::models::{Assessment, Category, EvaluationScore};
use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;

/// Sum the ten category scores into the overall score.
///
/// Equal weights, no clamping: out-of-range fields produce an out-of-range total.
pub fn aggregate(scores: &EvaluationScore) -> i32 {
    scores.iter().map(|(_, score)| score).sum()
}

/// Turns prompt text into an assessment.
///
/// Flows, aggregation and rendering only depend on this trait, so the mock
/// scorer can be swapped for a real evaluation backend.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn assess(&self, prompt: &str) -> Result<Assessment, ScoreError>;
}

/// Categories scoring below this get an issue and a recommendation
const WEAK_SCORE: i32 = 6;

const OPTIMIZED_PROMPT_TEMPLATE: &str = "[OPTIMIZED VERSION OF PROMPT]

You are a professional [ROLE]. Your task is to [SPECIFIC TASK].

Context:
- [Context point 1]
- [Context point 2]

Requirements:
1. [Specific requirement 1]
2. [Specific requirement 2]
3. [Specific requirement 3]

Format your response as:
- [Format specification]
- Keep it under [X] words
- Use [specific style]

Avoid:
- [Thing to avoid 1]
- [Thing to avoid 2]

Example output:
[Concrete example here]";

/// Stand-in scorer drawing every category from a fixed random range
#[derive(Debug, Default, Clone, Copy)]
pub struct MockScorer;

impl MockScorer {
    pub fn new() -> Self {
        Self
    }

    /// Range each category is drawn from
    pub fn range(category: Category) -> RangeInclusive<i32> {
        match category {
            Category::Clarity => 5..=8,
            Category::Specificity => 4..=8,
            Category::Completeness => 4..=7,
            Category::Control => 4..=7,
            Category::Stability => 5..=8,
            Category::Safety => 6..=8,
            Category::HallucinationResistance => 4..=7,
            Category::FormattingStrength => 3..=7,
            Category::Actionability => 5..=8,
            Category::DomainFit => 5..=9,
        }
    }

    fn draw_scores() -> EvaluationScore {
        let mut rng = rand::rng();
        let mut values = [0; 10];
        for (slot, category) in values.iter_mut().zip(Category::ALL) {
            *slot = rng.random_range(Self::range(category));
        }
        EvaluationScore::from_array(values)
    }

    /// Build the narrative parts of an assessment from the drawn scores
    pub fn describe(scores: EvaluationScore) -> Assessment {
        let weak: Vec<Category> = scores
            .iter()
            .filter(|(_, score)| *score < WEAK_SCORE)
            .map(|(category, _)| category)
            .collect();

        Assessment {
            scores,
            issues: weak.iter().map(|c| issue_for(*c).to_string()).collect(),
            recommendations: weak
                .iter()
                .map(|c| recommendation_for(*c).to_string())
                .collect(),
            summary: summary_for(aggregate(&scores)).to_string(),
            optimized_prompt: Some(OPTIMIZED_PROMPT_TEMPLATE.to_string()),
        }
    }
}

#[async_trait]
impl Scorer for MockScorer {
    async fn assess(&self, prompt: &str) -> Result<Assessment, ScoreError> {
        let scores = Self::draw_scores();
        tracing::debug!(
            prompt_chars = prompt.chars().count(),
            total = aggregate(&scores),
            "mock scores drawn"
        );
        Ok(Self::describe(scores))
    }
}

fn issue_for(category: Category) -> &'static str {
    match category {
        Category::Clarity => "Ambiguous language in several instructions",
        Category::Specificity => "Lacks specific output format requirements",
        Category::Completeness => "Insufficient context about the target audience",
        Category::Control => "No explicit constraints on response length or style",
        Category::Stability => "Instructions leave room for inconsistent outputs across runs",
        Category::Safety => "No guidance on handling sensitive or harmful requests",
        Category::HallucinationResistance => "Does not tell the model what to do when it lacks information",
        Category::FormattingStrength => "Missing concrete examples of expected responses",
        Category::Actionability => "Task goal is described but not broken into actionable steps",
        Category::DomainFit => "Terminology does not match the target domain",
    }
}

fn recommendation_for(category: Category) -> &'static str {
    match category {
        Category::Clarity => {
            "Replace vague terms like 'good' or 'appropriate' with measurable criteria"
        }
        Category::Specificity => {
            "Add explicit formatting requirements (e.g., 'Use numbered lists', 'Limit responses to 200 words')"
        }
        Category::Completeness => "Specify the expertise level expected in responses",
        Category::Control => {
            "Define clear boundaries for what the AI should and shouldn't include"
        }
        Category::Stability => "Pin down tone, structure and length so repeated runs agree",
        Category::Safety => "State how to refuse or redirect out-of-scope requests",
        Category::HallucinationResistance => {
            "Instruct the model to say when it does not know instead of guessing"
        }
        Category::FormattingStrength => "Include 2-3 concrete examples of ideal responses",
        Category::Actionability => "List the expected steps or deliverables explicitly",
        Category::DomainFit => "Use the vocabulary and conventions of the intended domain",
    }
}

fn summary_for(total: i32) -> &'static str {
    if total >= 80 {
        "The prompt is well structured with clear intent and explicit constraints. Only minor refinements are needed to make its output fully predictable."
    } else if total >= 60 {
        "The prompt shows good intent but lacks specific constraints and structure. It would benefit from more precise instructions, clearer formatting requirements, and explicit boundaries to reduce ambiguity and improve output consistency."
    } else {
        "The prompt is underspecified. Its goal, constraints and expected output are largely left to the model, which makes responses unpredictable."
    }
}
