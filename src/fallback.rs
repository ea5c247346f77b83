//! Keyword responder used when no trained model is active.

use crate::intent::NOT_UNDERSTOOD;

pub const GREETING_REPLY: &str = "Hi! How can I help you?";
pub const FAREWELL_REPLY: &str = "Bye! Talk to you soon.";

pub const GREETING_KEYWORDS: [&str; 4] = ["hello", "hi", "hey", "hola"];
pub const FAREWELL_KEYWORDS: [&str; 4] = ["bye", "goodbye", "adios", "see you"];

/// Substring keyword matcher. Greetings are checked before farewells.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        FallbackResponder
    }

    pub fn respond(&self, text: &str) -> &'static str {
        let text = text.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        if contains_any(&GREETING_KEYWORDS) {
            GREETING_REPLY
        } else if contains_any(&FAREWELL_KEYWORDS) {
            FAREWELL_REPLY
        } else {
            NOT_UNDERSTOOD
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting() {
        let responder = FallbackResponder::new();
        assert_eq!(responder.respond("hello there"), GREETING_REPLY);
        assert_eq!(responder.respond("HOLA amigo"), GREETING_REPLY);
    }

    #[test]
    fn test_farewell() {
        let responder = FallbackResponder::new();
        assert_eq!(responder.respond("ok bye"), FAREWELL_REPLY);
        assert_eq!(responder.respond("See You tomorrow"), FAREWELL_REPLY);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(FallbackResponder::new().respond("zzzz"), NOT_UNDERSTOOD);
        assert_eq!(FallbackResponder::new().respond(""), NOT_UNDERSTOOD);
    }

    #[test]
    fn test_greeting_checked_first() {
        // "hi" is a substring of "this", and greetings win over farewells.
        assert_eq!(FallbackResponder::new().respond("this is goodbye"), GREETING_REPLY);
        assert_eq!(FallbackResponder::new().respond("hey, bye"), GREETING_REPLY);
    }
}
