// src/services/home_content.rs
//! Daily wellness content: one prompt to the model, one tolerant-but-typed
//! parse of whatever comes back. The model is asked for pure JSON but
//! routinely wraps it in prose, and sometimes returns `focus` as a bare
//! string; both shapes are normalized here, once, at the boundary.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default focus duration when the model omits one: 5 minutes.
pub const DEFAULT_FOCUS_DURATION_SECS: u32 = 300;

#[derive(Error, Debug)]
pub enum HomeContentError {
    #[error("Model output contained no JSON object")]
    NoJsonFound,
    #[error("Model output could not be normalized: {0}")]
    Invalid(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleLink {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub links: Vec<ArticleLink>,
    #[serde(default)]
    pub related: Vec<String>,
}

/// Strict internal shape handed to the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Focus {
    pub tip: String,
    pub duration: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HomeContent {
    pub quote: String,
    pub focus: Focus,
    pub article: Article,
}

/// `focus` as the model actually sends it: either a full object or a bare
/// tip string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFocus {
    Block {
        tip: String,
        #[serde(default)]
        duration: Option<u32>,
    },
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawHomeContent {
    #[serde(default)]
    quote: String,
    focus: RawFocus,
    #[serde(default)]
    article: Article,
}

lazy_static! {
    // Greedy: first '{' through last '}', across newlines.
    static ref JSON_SPAN: Regex = Regex::new(r"(?s)\{.*\}").unwrap();
}

/// The fixed instruction sent to the model, embedding today's date and the
/// exact field shapes expected back.
pub fn build_prompt(today: chrono::DateTime<chrono::Utc>) -> String {
    let date = today.format("%A, %B %-d, %Y");
    format!(
        "You are a wellness and self-care assistant for a mobile app. For the date {date}, \
generate a JSON object with the following fields:\n\n\
- quote: A short, original, motivational quote for the day (max 120 chars).\n\
- focus: An object with:\n\
    - tip: A single actionable self-care tip for today (1-2 sentences).\n\
    - duration: The recommended time in seconds to spend on this focus \
(e.g. 300 for 5 minutes, 60 for 1 minute, etc.)\n\
- article: An object with:\n\
    - title: A catchy, positive article title (max 10 words)\n\
    - summary: A 1-2 sentence summary of the article\n\
    - icon: An appropriate Ionicons or MaterialCommunityIcons icon name \
(e.g. 'leaf-outline', 'book-outline', 'meditation', 'cloud-outline', etc.)\n\
    - body: A 3-5 paragraph article body with practical advice and encouragement\n\
    - links: An array of up to 3 relevant, reputable external links (with title and url)\n\
    - related: An array of up to 3 related article titles (strings only)\n\n\
Return ONLY the JSON object, no extra text or explanation."
    )
}

/// Parse the model's reply into [`HomeContent`].
///
/// Direct JSON parse first; failing that, the first `{...}` span is
/// extracted and parsed. A bare-string `focus` becomes
/// `{tip, duration: 300}`; a missing `duration` defaults the same way.
pub fn parse_home_content(text: &str) -> Result<HomeContent, HomeContentError> {
    let raw: RawHomeContent = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(_) => {
            let span = JSON_SPAN
                .find(text)
                .ok_or(HomeContentError::NoJsonFound)?;
            serde_json::from_str(span.as_str())?
        }
    };

    let focus = match raw.focus {
        RawFocus::Block { tip, duration } => Focus {
            tip,
            duration: duration.unwrap_or(DEFAULT_FOCUS_DURATION_SECS),
        },
        RawFocus::Text(tip) => Focus {
            tip,
            duration: DEFAULT_FOCUS_DURATION_SECS,
        },
    };

    Ok(HomeContent {
        quote: raw.quote,
        focus,
        article: raw.article,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "quote": "Small steps still move you forward.",
        "focus": {"tip": "Take a 5 minute walk outside.", "duration": 600},
        "article": {
            "title": "Walking Your Way to Calm",
            "summary": "Why short walks help.",
            "icon": "leaf-outline",
            "body": "Walking clears the mind.",
            "links": [{"title": "NHS on walking", "url": "https://example.org/walk"}],
            "related": ["Breathing basics"]
        }
    }"#;

    #[test]
    fn test_pure_json_parses_directly() {
        let content = parse_home_content(FULL).unwrap();
        assert_eq!(content.quote, "Small steps still move you forward.");
        assert_eq!(content.focus.duration, 600);
        assert_eq!(content.article.links.len(), 1);
    }

    #[test]
    fn test_json_embedded_in_prose_is_extracted() {
        let wrapped = format!("Sure! Here is your content:\n```json\n{}\n```\nEnjoy!", FULL);
        let content = parse_home_content(&wrapped).unwrap();
        assert_eq!(content.article.title, "Walking Your Way to Calm");
    }

    #[test]
    fn test_bare_string_focus_is_wrapped() {
        let text = r#"{"quote": "q", "focus": "Drink some water.", "article": {}}"#;
        let content = parse_home_content(text).unwrap();
        assert_eq!(
            content.focus,
            Focus {
                tip: "Drink some water.".to_string(),
                duration: DEFAULT_FOCUS_DURATION_SECS
            }
        );
    }

    #[test]
    fn test_missing_duration_defaults_to_300() {
        let text = r#"{"quote": "q", "focus": {"tip": "Stretch."}, "article": {}}"#;
        let content = parse_home_content(text).unwrap();
        assert_eq!(content.focus.duration, 300);
    }

    #[test]
    fn test_missing_article_fields_default() {
        let text = r#"{"focus": {"tip": "Rest."}}"#;
        let content = parse_home_content(text).unwrap();
        assert_eq!(content.quote, "");
        assert_eq!(content.article, Article::default());
    }

    #[test]
    fn test_no_json_at_all_is_an_error() {
        let err = parse_home_content("I cannot help with that.").unwrap_err();
        assert!(matches!(err, HomeContentError::NoJsonFound));
    }

    #[test]
    fn test_missing_focus_is_rejected() {
        let err = parse_home_content(r#"{"quote": "q"}"#).unwrap_err();
        assert!(matches!(err, HomeContentError::Invalid(_)));
    }

    #[test]
    fn test_prompt_embeds_the_date() {
        let date = chrono::DateTime::parse_from_rfc3339("2026-08-30T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let prompt = build_prompt(date);
        assert!(prompt.contains("Sunday, August 30, 2026"));
        assert!(prompt.contains("Return ONLY the JSON object"));
    }
}
