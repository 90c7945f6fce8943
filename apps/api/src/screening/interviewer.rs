//! The interviewer seam: the AI engine that writes assistant turns.
//!
//! Default with an API key: `LlmInterviewer`. Without one: `ScriptedInterviewer`,
//! which walks through fixed follow-up questions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::session::{Message, MessageRole};
use crate::screening::prompts::{
    FALLBACK_QUESTIONS, INTERVIEWER_PROMPT, INTERVIEWER_SYSTEM, SUMMARY_PROMPT, SUMMARY_SYSTEM,
};

/// Number of trailing transcript messages sent with each interviewer call.
pub const HISTORY_WINDOW: usize = 6;

/// What the interviewer is told about the role and progress.
#[derive(Debug, Clone)]
pub struct InterviewContext {
    pub job_context: String,
    pub questions_asked: i32,
    pub max_questions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewerTurn {
    pub reply: String,
    #[serde(default)]
    pub screening_complete: bool,
}

#[async_trait]
pub trait Interviewer: Send + Sync {
    /// Produces the next assistant turn for `transcript`, which already ends with
    /// the message being answered.
    async fn next_turn(
        &self,
        context: &InterviewContext,
        transcript: &[Message],
    ) -> Result<InterviewerTurn, AppError>;

    async fn summarize(&self, transcript: &[Message]) -> Result<String, AppError>;
}

/// Renders messages as `role: content` lines for prompts.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn recent(transcript: &[Message]) -> &[Message] {
    &transcript[transcript.len().saturating_sub(HISTORY_WINDOW)..]
}

pub struct LlmInterviewer {
    llm: LlmClient,
}

impl LlmInterviewer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Interviewer for LlmInterviewer {
    async fn next_turn(
        &self,
        context: &InterviewContext,
        transcript: &[Message],
    ) -> Result<InterviewerTurn, AppError> {
        let prompt = INTERVIEWER_PROMPT
            .replace("{job_context}", &context.job_context)
            .replace("{questions_asked}", &context.questions_asked.to_string())
            .replace("{max_questions}", &context.max_questions.to_string())
            .replace("{transcript}", &render_transcript(recent(transcript)));

        let turn: InterviewerTurn = self
            .llm
            .call_json(&prompt, INTERVIEWER_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Failed to generate interviewer turn: {e}")))?;

        if turn.reply.trim().is_empty() {
            return Err(AppError::Llm("Interviewer returned an empty reply".to_string()));
        }
        Ok(turn)
    }

    async fn summarize(&self, transcript: &[Message]) -> Result<String, AppError> {
        let prompt = SUMMARY_PROMPT.replace("{transcript}", &render_transcript(transcript));
        self.llm
            .call_text(&prompt, SUMMARY_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Failed to summarize interview: {e}")))
    }
}

/// Deterministic interviewer used when no LLM is configured.
/// Never signals completion itself; the question cap ends the screening.
pub struct ScriptedInterviewer;

impl ScriptedInterviewer {
    pub fn question_for(questions_asked: i32) -> &'static str {
        let index = questions_asked.max(0) as usize % FALLBACK_QUESTIONS.len();
        FALLBACK_QUESTIONS[index]
    }
}

#[async_trait]
impl Interviewer for ScriptedInterviewer {
    async fn next_turn(
        &self,
        context: &InterviewContext,
        _transcript: &[Message],
    ) -> Result<InterviewerTurn, AppError> {
        Ok(InterviewerTurn {
            reply: Self::question_for(context.questions_asked).to_string(),
            screening_complete: false,
        })
    }

    async fn summarize(&self, transcript: &[Message]) -> Result<String, AppError> {
        let answers = transcript
            .iter()
            .filter(|m| m.role == MessageRole::Candidate)
            .count();
        Ok(format!(
            "Interview completed with {answers} candidate response(s). Manual review recommended."
        ))
    }
}
