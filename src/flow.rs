use crate::error::{FlowError, ScoreError, ValidationError};
use crate::models::{ComparisonResult, EvaluationResult};
use crate::notify::{Notifier, Toast};
use crate::scoring::Scorer;
use crate::slots::{MIN_SLOTS, PromptSlots};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Where a flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Evaluating,
    Complete,
}

/// Evaluates one prompt at a time and keeps the latest result
pub struct SingleFlow {
    scorer: Arc<dyn Scorer>,
    notifier: Arc<dyn Notifier>,
    latency: Duration,
    phase: Phase,
    result: Option<EvaluationResult>,
}

impl SingleFlow {
    pub fn new(scorer: Arc<dyn Scorer>, notifier: Arc<dyn Notifier>, latency: Duration) -> Self {
        Self {
            scorer,
            notifier,
            latency,
            phase: Phase::Idle,
            result: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> Option<&EvaluationResult> {
        self.result.as_ref()
    }

    /// Score `prompt` and replace the stored result.
    ///
    /// A blank prompt is rejected without touching the phase or the stored result.
    pub async fn submit(&mut self, prompt: &str) -> Result<&EvaluationResult, FlowError> {
        if prompt.trim().is_empty() {
            tracing::warn!("rejected blank prompt");
            self.notifier.notify(Toast::destructive(
                "Empty Prompt",
                "Please enter a prompt to evaluate.",
            ));
            return Err(ValidationError::EmptyPrompt.into());
        }

        self.phase = Phase::Evaluating;
        tracing::info!(prompt_chars = prompt.chars().count(), "evaluating prompt");
        sleep(self.latency).await;

        match self.scorer.assess(prompt).await {
            Ok(assessment) => {
                let result = EvaluationResult::from_assessment(assessment);
                tracing::info!(total_score = result.total_score, "evaluation complete");
                self.phase = Phase::Complete;
                self.notifier.notify(Toast::info(
                    "Evaluation Complete",
                    "Your prompt has been analyzed successfully.",
                ));
                let stored: &EvaluationResult = self.result.insert(result);
                Ok(stored)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, error: ScoreError) -> FlowError {
        tracing::warn!(error = %error, "evaluation failed");
        self.phase = settled_phase(self.result.is_some());
        self.notifier
            .notify(Toast::destructive("Evaluation Failed", error.to_string()));
        error.into()
    }
}

/// Scores every filled comparison slot and ranks them by total score
pub struct ComparisonFlow {
    scorer: Arc<dyn Scorer>,
    notifier: Arc<dyn Notifier>,
    latency: Duration,
    phase: Phase,
    results: Option<Vec<ComparisonResult>>,
}

impl ComparisonFlow {
    pub fn new(scorer: Arc<dyn Scorer>, notifier: Arc<dyn Notifier>, latency: Duration) -> Self {
        Self {
            scorer,
            notifier,
            latency,
            phase: Phase::Idle,
            results: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn results(&self) -> Option<&[ComparisonResult]> {
        self.results.as_deref()
    }

    pub fn winner(&self) -> Option<&ComparisonResult> {
        self.results.as_deref().and_then(winner)
    }

    /// Score the filled slots in input order and publish the whole batch at once
    pub async fn submit(&mut self, slots: &PromptSlots) -> Result<&[ComparisonResult], FlowError> {
        let filled: Vec<_> = slots.filled().collect();
        if filled.len() < MIN_SLOTS {
            tracing::warn!(filled = filled.len(), "rejected comparison");
            self.notifier.notify(Toast::destructive(
                "Not Enough Prompts",
                format!("Please enter at least {} prompts to compare.", MIN_SLOTS),
            ));
            return Err(ValidationError::NotEnoughPrompts {
                found: filled.len(),
            }
            .into());
        }

        self.phase = Phase::Evaluating;
        tracing::info!(prompts = filled.len(), "comparing prompts");
        sleep(self.latency).await;

        let mut batch = Vec::with_capacity(filled.len());
        for (index, entry) in filled.iter().enumerate() {
            tracing::debug!(
                "scoring prompt {}/{} ({})",
                index + 1,
                filled.len(),
                entry.name
            );
            match self.scorer.assess(&entry.value).await {
                Ok(assessment) => batch.push(ComparisonResult::new(entry, assessment)),
                Err(e) => return Err(self.fail(e)),
            }
        }

        if let Some(best) = winner(&batch) {
            tracing::info!(winner = %best.name, total_score = best.total_score(), "comparison complete");
        }
        self.phase = Phase::Complete;
        self.notifier.notify(Toast::info(
            "Comparison Complete",
            format!("Compared {} prompts successfully.", batch.len()),
        ));
        let stored: &[ComparisonResult] = self.results.insert(batch);
        Ok(stored)
    }

    fn fail(&mut self, error: ScoreError) -> FlowError {
        tracing::warn!(error = %error, "comparison failed");
        self.phase = settled_phase(self.results.is_some());
        self.notifier
            .notify(Toast::destructive("Comparison Failed", error.to_string()));
        error.into()
    }
}

/// Highest total score; the earliest entry wins a tie
pub fn winner(results: &[ComparisonResult]) -> Option<&ComparisonResult> {
    let mut best: Option<&ComparisonResult> = None;
    for result in results {
        match best {
            Some(current) if current.total_score() >= result.total_score() => {}
            _ => best = Some(result),
        }
    }
    best
}

fn settled_phase(has_result: bool) -> Phase {
    if has_result {
        Phase::Complete
    } else {
        Phase::Idle
    }
}
