// Screening interviewer prompt templates and fixed copy.
// All interviewer text that is not produced by the LLM lives here.

pub const INTERVIEWER_SYSTEM: &str = "\
You are an experienced HR recruiter conducting an initial screening interview by chat. \
Be professional, friendly and concise. Ask exactly one follow-up question per turn, \
based on the candidate's previous answers and the job requirements. \
You MUST respond with valid JSON only: no markdown fences, no explanations.";

pub const INTERVIEWER_PROMPT: &str = r#"Continue the screening conversation below.

JOB CONTEXT:
{job_context}

QUESTIONS ASKED SO FAR: {questions_asked} of at most {max_questions}

RECENT CONVERSATION:
{transcript}

Set "screening_complete" to true only when you have enough information about the
candidate's experience, skills and motivation for this role, and your reply is a
closing message rather than a question.

OUTPUT SCHEMA (return exactly this structure):
{
  "reply": "string",
  "screening_complete": boolean
}"#;

pub const SUMMARY_SYSTEM: &str = "\
You summarize recruiting screening interviews for hiring managers. \
Write plain text, no markdown. Be factual; do not invent details.";

pub const SUMMARY_PROMPT: &str = r#"Provide a concise 2-3 sentence summary of this screening interview.
Focus on the candidate's relevant experience, skills and overall fit for the role.

CONVERSATION:
{transcript}"#;

/// Appended to the interviewer's reply when a screening completes.
pub const COMPLETION_NOTICE: &str = "\n\nScreening complete! Thank you for taking the time to \
complete this screening. Our recruiting team will review your responses and be in touch with \
next steps soon.\n\nYou can now close this window.";

/// Stored as the summary when summarization fails.
pub const SUMMARY_FALLBACK: &str = "Interview completed. Manual review recommended.";

/// Follow-ups used when the interviewer engine is unavailable, rotated by question count.
pub const FALLBACK_QUESTIONS: &[&str] = &[
    "Thank you for your response. Could you tell me more about your experience with the key requirements for this role?",
    "That's helpful. How do you handle challenging situations in your work?",
    "Can you describe a project you're particularly proud of?",
    "What motivates you in your professional career?",
    "How do you stay up to date with industry trends and best practices?",
];

pub const PUBLIC_INSTRUCTIONS: &str = "Please answer the questions honestly and to the best of \
your ability. This conversation helps us understand your background and fit for the role.";

pub fn opening_message(candidate_name: &str, job_title: &str) -> String {
    let name = if candidate_name.trim().is_empty() {
        "there"
    } else {
        candidate_name.trim()
    };
    format!(
        "Hello {name}!\n\n\
         Thank you for your interest in the {job_title} position. I'm an AI recruiter here to \
         conduct an initial screening conversation with you.\n\n\
         This is a brief, informal chat to learn more about your background and experience. \
         Please feel free to answer naturally - there are no right or wrong answers.\n\n\
         Let's start: can you tell me a bit about yourself and what drew you to apply for this \
         {job_title} role?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_message_mentions_candidate_and_role() {
        let msg = opening_message("Ada", "Backend Engineer");
        assert!(msg.starts_with("Hello Ada!"));
        assert_eq!(msg.matches("Backend Engineer").count(), 2);
    }

    #[test]
    fn test_opening_message_blank_name() {
        assert!(opening_message("  ", "QA").starts_with("Hello there!"));
    }
}
