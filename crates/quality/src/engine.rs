//! Evaluation engine - LLM judges plus the programmatic citation check.

use async_trait::async_trait;
use genepool_core::{Dimension, GradedScore, ScoreModel, MAX_SCORE, MIN_SCORE};
use genepool_llm::{decode, Field, GenerationRequest, TextGenerator};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::citations::citation_fidelity;

/// Produces a score model for a (request, response, context) triple.
///
/// Evaluation never fails: unusable judgments degrade to the minimum grade.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Score one run.
    async fn evaluate(&self, request: &str, response: &str, context: &str) -> ScoreModel;
}

/// Rubric question for a judged dimension.
fn rubric(dimension: Dimension) -> Option<(&'static str, &'static str)> {
    match dimension {
        Dimension::Accuracy => Some((
            "Accuracy",
            "Does the response correctly address the user's scenario?",
        )),
        Dimension::Completeness => Some((
            "Completeness",
            "Did it miss any constraints from the context?",
        )),
        Dimension::RegulatoryTone => Some((
            "Regulatory Compliance",
            "Is the tone professional and appropriate?",
        )),
        Dimension::CitationFidelity => None,
    }
}

/// Build the grading prompt for one dimension.
pub fn judge_prompt(
    name: &str,
    requirement: &str,
    request: &str,
    response: &str,
    context: &str,
) -> String {
    format!(
        "You are an expert Corporate Compliance Auditor.\n\
         Evaluate the following response based on the provided context and original request.\n\
         \n\
         Dimension: {name}\n\
         Requirement: {requirement}\n\
         \n\
         Original Request: {request}\n\
         Context Provided: {context}\n\
         Assistant Response: {response}\n\
         \n\
         Respond ONLY with a JSON object: {{\"score\": <1-5>, \"reasoning\": \"...\"}}"
    )
}

/// Turn raw judge output into a grade, falling back to the minimum.
pub fn grade_from_output(raw: &str) -> GradedScore {
    let decoded = decode(raw);
    let score = match decoded.int_field("score") {
        Field::Present(n) if (i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)).contains(&n) => n as u8,
        Field::Present(n) => {
            return GradedScore::floor(format!("Judge returned out-of-range score {}", n));
        }
        Field::Missing => {
            return GradedScore::floor("Judge output had no usable 'score' field");
        }
        Field::Failed => {
            return GradedScore::floor("Judge failed to produce valid JSON");
        }
    };
    let reasoning = decoded
        .str_field("reasoning")
        .present()
        .unwrap_or("No reasoning given")
        .to_string();
    GradedScore::new(score, reasoning)
}

/// Evaluator backed by an external judging model.
pub struct LlmEvaluator {
    judge: Arc<dyn TextGenerator>,
}

impl LlmEvaluator {
    /// Create a new evaluator.
    pub fn new(judge: Arc<dyn TextGenerator>) -> Self {
        Self { judge }
    }

    async fn judge(
        &self,
        dimension: Dimension,
        request: &str,
        response: &str,
        context: &str,
    ) -> GradedScore {
        let Some((name, requirement)) = rubric(dimension) else {
            return citation_fidelity(response, context);
        };

        let prompt = judge_prompt(name, requirement, request, response, context);
        match self.judge.generate(&GenerationRequest::json(prompt)).await {
            Ok(raw) => {
                let grade = grade_from_output(&raw);
                debug!("Judge scored {} at {}/5", dimension, grade.score);
                grade
            }
            Err(e) => {
                warn!("Judge call for {} failed: {}", dimension, e);
                GradedScore::floor(format!("Judge unavailable: {}", e))
            }
        }
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(&self, request: &str, response: &str, context: &str) -> ScoreModel {
        info!("Evaluating response ({} chars) against {} chars of context", response.len(), context.len());

        let accuracy = self.judge(Dimension::Accuracy, request, response, context).await;
        let completeness = self.judge(Dimension::Completeness, request, response, context).await;
        let regulatory_tone = self.judge(Dimension::RegulatoryTone, request, response, context).await;
        let citation_fidelity = self.judge(Dimension::CitationFidelity, request, response, context).await;

        ScoreModel::new(accuracy, citation_fidelity, completeness, regulatory_tone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genepool_llm::LlmError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned outputs and records prompts.
    struct ScriptedJudge {
        outputs: Mutex<VecDeque<Result<String, String>>>,
        prompts: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedJudge {
        fn new(outputs: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(
                    outputs
                        .into_iter()
                        .map(|o| o.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedJudge {
        async fn generate(&self, request: &GenerationRequest) -> genepool_llm::Result<String> {
            self.prompts.lock().unwrap().push(request.clone());
            match self.outputs.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(LlmError::Other(e)),
                None => Err(LlmError::Other("script exhausted".to_string())),
            }
        }
    }

    #[test]
    fn test_grade_from_valid_output() {
        let grade = grade_from_output("```json\n{\"score\": 4, \"reasoning\": \"solid\"}\n```");
        assert_eq!(grade, GradedScore::new(4, "solid"));
    }

    #[test]
    fn test_grade_out_of_range_falls_back() {
        assert_eq!(grade_from_output(r#"{"score": 7, "reasoning": "x"}"#).score, 1);
        assert_eq!(grade_from_output(r#"{"score": 0, "reasoning": "x"}"#).score, 1);
    }

    #[test]
    fn test_grade_malformed_falls_back() {
        let grade = grade_from_output("I think it deserves a four");
        assert_eq!(grade.score, 1);
        assert!(grade.reasoning.contains("valid JSON"));
    }

    #[test]
    fn test_grade_missing_reasoning_keeps_score() {
        let grade = grade_from_output(r#"{"score": 5}"#);
        assert_eq!(grade.score, 5);
    }

    #[tokio::test]
    async fn test_evaluate_uses_three_judge_calls() {
        let judge = ScriptedJudge::new(vec![
            Ok(r#"{"score": 5, "reasoning": "accurate"}"#),
            Ok(r#"{"score": 3, "reasoning": "missed retention"}"#),
            Ok(r#"{"score": 4, "reasoning": "professional"}"#),
        ]);
        let evaluator = LlmEvaluator::new(judge.clone());

        let scores = evaluator
            .evaluate("Can I use ChatGPT?", "No citations here.", "POL-001 text")
            .await;

        assert_eq!(scores.accuracy, GradedScore::new(5, "accurate"));
        assert_eq!(scores.completeness.score, 3);
        assert_eq!(scores.regulatory_tone.score, 4);
        assert_eq!(scores.citation_fidelity.score, 5);
        assert_eq!(scores.performance, 1.0);

        let prompts = judge.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| p.format == genepool_llm::OutputFormat::Json));
        assert!(prompts[0].prompt.contains("Dimension: Accuracy"));
        assert!(prompts[1].prompt.contains("Dimension: Completeness"));
        assert!(prompts[2].prompt.contains("Dimension: Regulatory Compliance"));
        assert!(prompts[0].prompt.contains("Can I use ChatGPT?"));
        assert!(prompts[0].prompt.contains("POL-001 text"));
    }

    #[tokio::test]
    async fn test_evaluate_degrades_on_failures() {
        let judge = ScriptedJudge::new(vec![
            Err("connection refused"),
            Ok("not json at all"),
            Ok(r#"{"score": 9}"#),
        ]);
        let evaluator = LlmEvaluator::new(judge);

        let scores = evaluator
            .evaluate("q", "Invented [POL-1]", "context")
            .await;

        assert_eq!(scores.to_vector(), [1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(scores.accuracy.reasoning.contains("unavailable"));
    }
}
