// src/intents.rs
//! Static intent table consulted before any call to the generative model.
//! A hit returns a canned reply immediately, so well-known phrases never
//! incur network cost.

use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Intent {
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IntentTable {
    intents: Vec<Intent>,
}

lazy_static! {
    static ref INTENTS: Vec<Intent> = {
        let table: IntentTable = serde_json::from_str(include_str!("intents.json"))
            .expect("intents.json is embedded at compile time and must parse");
        table.intents
    };
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Lowercase, strip the fixed punctuation set, collapse whitespace, trim.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '.' | ',' | '!' | '?' | ';' | ':' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\''
            )
        })
        .collect();
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Try to match the input against the configured intent table.
///
/// First intent/pattern (in table order) wins; no scoring or ranking. Each
/// pattern is tried two ways: as a whole-word phrase inside the input, then
/// as a bag of words where every pattern word must appear somewhere in the
/// input as a substring. A hit picks uniformly at random among the intent's
/// replies.
pub fn match_intent(input: &str) -> Option<String> {
    match_against(&INTENTS, input)
}

pub fn match_against(intents: &[Intent], input: &str) -> Option<String> {
    let normalized_input = normalize(input);
    if normalized_input.is_empty() {
        return None;
    }

    for intent in intents {
        if intent.responses.is_empty() {
            continue;
        }
        for pattern in &intent.patterns {
            let normalized_pattern = normalize(pattern);
            if normalized_pattern.is_empty() {
                continue;
            }

            // Whole-word phrase match first.
            let phrase = format!(r"\b{}\b", regex::escape(&normalized_pattern));
            match Regex::new(&phrase) {
                Ok(re) => {
                    if re.is_match(&normalized_input) {
                        return pick_response(intent);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping unusable intent pattern '{}': {}", pattern, e);
                }
            }

            // Otherwise require every pattern word as a substring of the input.
            if normalized_pattern
                .split(' ')
                .all(|word| normalized_input.contains(word))
            {
                return pick_response(intent);
            }
        }
    }
    None
}

fn pick_response(intent: &Intent) -> Option<String> {
    intent.responses.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Intent> {
        vec![
            Intent {
                tag: "greeting".to_string(),
                patterns: vec!["hello".to_string(), "good morning".to_string()],
                responses: vec!["Hi!".to_string(), "Hello there!".to_string()],
            },
            Intent {
                tag: "sleep".to_string(),
                patterns: vec!["trouble sleeping".to_string()],
                responses: vec!["Try winding down earlier.".to_string()],
            },
        ]
    }

    #[test]
    fn test_whole_word_phrase_match() {
        let intents = table();
        let reply = match_against(&intents, "Good MORNING, everyone!").unwrap();
        assert!(intents[0].responses.contains(&reply));
    }

    #[test]
    fn test_phrase_match_ignores_punctuation() {
        let intents = table();
        assert!(match_against(&intents, "hello?!").is_some());
    }

    #[test]
    fn test_all_words_as_substrings_match() {
        let intents = table();
        // "trouble" and "sleeping" both occur, but not as a contiguous phrase.
        let reply = match_against(&intents, "sleeping is trouble for me").unwrap();
        assert_eq!(reply, "Try winding down earlier.");
    }

    #[test]
    fn test_no_match_returns_none() {
        let intents = table();
        assert!(match_against(&intents, "tell me about appointments").is_none());
    }

    #[test]
    fn test_empty_input_returns_none() {
        let intents = table();
        assert!(match_against(&intents, "   ").is_none());
    }

    #[test]
    fn test_first_intent_in_table_order_wins() {
        let intents = table();
        // Matches both a greeting word and the sleep words; greeting is first.
        let reply = match_against(&intents, "hello i have trouble sleeping").unwrap();
        assert!(intents[0].responses.contains(&reply));
    }

    #[test]
    fn test_normalize_strips_and_collapses() {
        assert_eq!(normalize("  Hello,   WORLD!!  "), "hello world");
        assert_eq!(normalize("(a) [b] {c}: 'd'"), "a b c d");
    }

    #[test]
    fn test_embedded_table_parses_and_matches() {
        // The shipped intents.json must at least handle a plain greeting.
        assert!(match_intent("hello").is_some());
    }
}
