use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Returned when a configured pool has nothing usable in it.
pub const LAST_RESORT_RESPONSE: &str =
    "I'm here and listening! Could you tell me more about that?";

/// Keyword lists and response pools for the offline responder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub greeting_keywords: Vec<String>,
    pub question_keywords: Vec<String>,
    pub greeting_responses: Vec<String>,
    pub question_responses: Vec<String>,
    pub default_responses: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            greeting_keywords: owned(&["hi", "hello", "hey", "greetings", "howdy"]),
            question_keywords: owned(&[
                "how", "what", "why", "when", "where", "who", "can", "could", "would", "?",
            ]),
            greeting_responses: owned(&[
                "Hello there! How can I help you today?",
                "Hi! What can I assist you with?",
                "Hey! I'm here to help. What's up?",
                "Greetings! How can I be of service today?",
            ]),
            question_responses: owned(&[
                "That's a great question! I'd love to help, but I'm having some technical difficulties right now. Could you try asking again in a moment?",
                "I'm thinking about your question, but my systems are a bit slow right now. Could you try rephrasing or asking again later?",
                "I want to give you a good answer, but I'm experiencing some technical issues. Let me get back to you on that soon!",
                "Interesting question! I'm currently processing a lot of requests. Could you try again in a bit?",
            ]),
            default_responses: owned(&[
                LAST_RESORT_RESPONSE,
                "That's interesting! Could you elaborate a bit more?",
                "I'd love to continue this conversation, but I'm having some technical difficulties. Let's chat more in a moment!",
                "I appreciate your message! I'm currently processing a lot of information. What else would you like to discuss?",
                "Thanks for reaching out! I'm here to help with any questions about programming or design.",
            ]),
        }
    }
}

/// Coarse classification of the user's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Question,
    Other,
}

/// Offline keyword-driven responder. Never fails, never returns empty text.
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    greeting_keywords: Vec<String>,
    question_keywords: Vec<String>,
    greeting_responses: Vec<String>,
    question_responses: Vec<String>,
    default_responses: Vec<String>,
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self::new(FallbackConfig::default())
    }
}

impl FallbackResponder {
    pub fn new(config: FallbackConfig) -> Self {
        let keywords = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        let pool = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .filter(|r| !r.trim().is_empty())
                .collect()
        };

        Self {
            greeting_keywords: keywords(config.greeting_keywords),
            question_keywords: keywords(config.question_keywords),
            greeting_responses: pool(config.greeting_responses),
            question_responses: pool(config.question_responses),
            default_responses: pool(config.default_responses),
        }
    }

    /// Case-insensitive substring match; greetings win over questions.
    pub fn classify(&self, user_text: &str) -> Intent {
        let lowered = user_text.to_lowercase();
        let mentions = |keywords: &[String]| keywords.iter().any(|k| lowered.contains(k.as_str()));

        if mentions(&self.greeting_keywords) {
            Intent::Greeting
        } else if mentions(&self.question_keywords) {
            Intent::Question
        } else {
            Intent::Other
        }
    }

    pub fn respond(&self, user_text: &str) -> String {
        let pool = match self.classify(user_text) {
            Intent::Greeting => &self.greeting_responses,
            Intent::Question => &self.question_responses,
            Intent::Other => &self.default_responses,
        };

        let mut rng = rand::rng();
        pool.choose(&mut rng)
            .or_else(|| self.default_responses.choose(&mut rng))
            .cloned()
            .unwrap_or_else(|| LAST_RESORT_RESPONSE.to_string())
    }
}
