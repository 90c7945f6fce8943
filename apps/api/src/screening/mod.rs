// Screening conversation core.
// Lifecycle state machine, message exchange, interviewer seam and the HTTP
// handlers for both the recruiter and the public candidate path.

pub mod exchange;
pub mod handlers;
pub mod interviewer;
pub mod lifecycle;
pub mod prompts;
pub mod public;
pub mod service;
