use crate::config::LlmConfig;
use crate::error::ScoreError;
use crate::models::{Assessment, Category, CATEGORY_MAX, EvaluationScore};
use crate::scoring::Scorer;
use async_openai::{Client, config::OpenAIConfig, types::CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Scorer backed by an OpenAI-compatible chat completion endpoint, with rate limiting
pub struct LlmScorer {
    config: LlmConfig,
    /// Last request time, shared by every prompt scored through this instance
    last_request: Mutex<Option<Instant>>,
}

impl LlmScorer {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Enforce rate limiting for API requests
    async fn enforce_rate_limit(last_request: &mut Option<Instant>, rate_limit_rps: f64) {
        if rate_limit_rps <= 0.0 {
            return;
        }

        let min_interval = Duration::from_secs_f64(1.0 / rate_limit_rps);

        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < min_interval {
                sleep(min_interval - elapsed).await;
            }
        }

        *last_request = Some(Instant::now());
    }

    fn create_client(&self) -> Result<Client<OpenAIConfig>, ScoreError> {
        let api_key = std::env::var(&self.config.env_var_api_key)
            .map_err(|_| ScoreError::MissingApiKey(self.config.env_var_api_key.clone()))?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&self.config.api_endpoint);

        Ok(Client::with_config(openai_config))
    }

    /// Build the instruction wrapped around the prompt under evaluation
    fn build_eval_prompt(prompt: &str) -> String {
        let keys: Vec<&str> = Category::ALL.iter().map(|c| c.key()).collect();

        format!(
            "Evaluate the following prompt as a prompt engineer.\n\n\
             Prompt to Evaluate:\n{}\n\n\
             Score each of these categories with an integer from 0 to {}: {}.\n\
             Return JSON with the fields 'scores' (an object keyed by category), \
             'issues' (array of strings), 'recommendations' (array of strings), \
             'summary' (string) and 'optimizedPrompt' (string).",
            prompt,
            CATEGORY_MAX,
            keys.join(", ")
        )
    }

    fn build_request(
        &self,
        eval_prompt: &str,
    ) -> Result<async_openai::types::CreateChatCompletionRequest, ScoreError> {
        let system_message = async_openai::types::ChatCompletionRequestSystemMessageArgs::default()
            .content(self.config.system_prompt.clone())
            .build()
            .map_err(|e| ScoreError::Request(format!("failed to build system message: {}", e)))?
            .into();

        let user_message = async_openai::types::ChatCompletionRequestUserMessageArgs::default()
            .content(eval_prompt.to_string())
            .build()
            .map_err(|e| ScoreError::Request(format!("failed to build user message: {}", e)))?
            .into();

        CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages([system_message, user_message])
            .temperature(self.config.temperature as f32)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| ScoreError::Request(format!("failed to build completion request: {}", e)))
    }

    /// Extract the first choice's text from the completion
    fn extract_content(response: async_openai::types::CreateChatCompletionResponse) -> String {
        match response.choices.first() {
            Some(choice) => choice.message.content.clone().unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Parse the evaluator's reply into an assessment
    fn parse_assessment(response: &str) -> Result<Assessment, ScoreError> {
        let parsed = Self::parse_json_response(response)?;

        Ok(Assessment {
            scores: Self::extract_scores(&parsed),
            issues: Self::extract_string_list(&parsed, "issues"),
            recommendations: Self::extract_string_list(&parsed, "recommendations"),
            summary: match parsed.get("summary").and_then(|s| s.as_str()) {
                Some(summary) => summary.to_string(),
                None => "No summary provided".to_string(),
            },
            optimized_prompt: parsed
                .get("optimizedPrompt")
                .and_then(|p| p.as_str())
                .map(str::to_string),
        })
    }

    /// Parse JSON from the response, handling JSON embedded in prose
    fn parse_json_response(response: &str) -> Result<Value, ScoreError> {
        match serde_json::from_str(response) {
            Ok(parsed) => Ok(parsed),
            Err(_) => Self::try_extract_embedded_json(response),
        }
    }

    fn try_extract_embedded_json(response: &str) -> Result<Value, ScoreError> {
        let start = response
            .find('{')
            .ok_or_else(|| ScoreError::MalformedResponse("no JSON found in response".to_string()))?;
        let end = response.rfind('}').ok_or_else(|| {
            ScoreError::MalformedResponse(
                "found opening brace but no closing brace in response".to_string(),
            )
        })?;
        if end < start {
            return Err(ScoreError::MalformedResponse(
                "closing brace precedes opening brace".to_string(),
            ));
        }

        serde_json::from_str(&response[start..=end])
            .map_err(|e| ScoreError::MalformedResponse(format!("failed to parse extracted JSON: {}", e)))
    }

    /// Missing or non-numeric scores become 0; numbers are rounded and clamped to 0..=10
    fn extract_scores(parsed: &Value) -> EvaluationScore {
        let scores_obj = parsed.get("scores").and_then(|s| s.as_object());

        let mut values = [0; 10];
        for (slot, category) in values.iter_mut().zip(Category::ALL) {
            *slot = scores_obj
                .and_then(|scores| scores.get(category.key()))
                .and_then(|score| score.as_f64())
                .map(|score| (score.round() as i32).clamp(0, CATEGORY_MAX))
                .unwrap_or(0);
        }

        EvaluationScore::from_array(values)
    }

    fn extract_string_list(parsed: &Value, field: &str) -> Vec<String> {
        parsed
            .get(field)
            .and_then(|list| list.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Scorer for LlmScorer {
    async fn assess(&self, prompt: &str) -> Result<Assessment, ScoreError> {
        {
            let mut last_request = self.last_request.lock().await;
            Self::enforce_rate_limit(&mut *last_request, self.config.rate_limit_rps).await;
        }

        let client = self.create_client()?;
        let request = self.build_request(&Self::build_eval_prompt(prompt))?;

        tracing::debug!(model = %self.config.model, "requesting prompt evaluation");
        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| ScoreError::Request(e.to_string()))?;

        Self::parse_assessment(&Self::extract_content(response))
    }
}
