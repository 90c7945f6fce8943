use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Candidate record owned by the external candidate service. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub name: String,
    pub job_posting_id: Uuid,
}

/// Job posting owned by the external jobs service. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobPostingRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub department: String,
    pub location: Option<String>,
    pub description: String,
    pub requirements: Vec<String>,
}

impl JobPostingRow {
    /// Plain-text job context handed to the interviewer.
    pub fn context_text(&self, candidate_name: &str) -> String {
        format!(
            "Job Title: {}\nDepartment: {}\nLocation: {}\nDescription: {}\nRequirements: {}\n\nCandidate: {}",
            self.title,
            self.department,
            self.location.as_deref().unwrap_or("Not specified"),
            self.description,
            self.requirements.join(", "),
            candidate_name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_text_defaults_location() {
        let job = JobPostingRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            title: "Backend Engineer".into(),
            department: "Platform".into(),
            location: None,
            description: "Build APIs".into(),
            requirements: vec!["Rust".into(), "Postgres".into()],
        };
        let text = job.context_text("Ada");
        assert!(text.contains("Location: Not specified"));
        assert!(text.contains("Requirements: Rust, Postgres"));
        assert!(text.ends_with("Candidate: Ada"));
    }
}
