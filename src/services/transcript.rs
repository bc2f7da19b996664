// src/services/transcript.rs
use crate::models::ai::AiExchange;

/// Serialize a session's history plus the new prompt into the flat
/// transcript the model receives on every turn:
///
/// `User: p1\nAI: r1\n...User: new\nAI:`
///
/// The trailing "AI:" cue is deliberate; the model continues from there.
pub fn build_transcript(exchanges: &[AiExchange], new_prompt: &str) -> String {
    let mut transcript = String::new();
    for exchange in exchanges {
        transcript.push_str("User: ");
        transcript.push_str(&exchange.prompt);
        transcript.push_str("\nAI: ");
        transcript.push_str(&exchange.response);
        transcript.push('\n');
    }
    transcript.push_str("User: ");
    transcript.push_str(new_prompt);
    transcript.push_str("\nAI:");
    transcript
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn exchange(prompt: &str, response: &str) -> AiExchange {
        AiExchange {
            id: 0,
            session_id: Uuid::nil(),
            prompt: prompt.to_string(),
            response: response.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_transcript_exact_format() {
        let history = vec![exchange("p1", "r1"), exchange("p2", "r2")];
        assert_eq!(
            build_transcript(&history, "p3"),
            "User: p1\nAI: r1\nUser: p2\nAI: r2\nUser: p3\nAI:"
        );
    }

    #[test]
    fn test_transcript_without_history() {
        assert_eq!(build_transcript(&[], "first message"), "User: first message\nAI:");
    }
}
