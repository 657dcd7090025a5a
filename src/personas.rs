//! Persona selection.
//!
//! A leading trigger token in the raw message selects one of the fixed
//! personas; the trigger is stripped from the message. Declaration order in
//! `PERSONAS` is the tie-break when two triggers share a prefix relation —
//! the first match wins.

#[derive(Debug, Clone, Copy)]
pub struct Persona {
    pub key: &'static str,
    pub name: &'static str,
    pub trigger: Option<&'static str>,
    pub system_prompt: &'static str,
}

pub const PERSONAS: [Persona; 4] = [
    Persona {
        key: "summarizer",
        name: "Summarizer",
        trigger: Some("@summarizer"),
        system_prompt: "You are a summarization assistant for a chat application. Condense the \
            user's chat history into short, neutral summaries. Group related points, keep \
            participant names, and never invent content that is not present in the messages.",
    },
    Persona {
        key: "analyst",
        name: "Analyst",
        trigger: Some("@analyst"),
        system_prompt: "You are an analytical assistant for a chat application. Answer questions \
            about the user's chat history precisely, quote the messages you rely on, and state \
            explicitly when the history does not contain enough information.",
    },
    Persona {
        key: "casual",
        name: "Casual",
        trigger: Some("@casual"),
        system_prompt: "You are a friendly, informal assistant for a chat application. Answer \
            questions about the user's chat history in a relaxed tone while staying grounded in \
            the provided messages.",
    },
    Persona {
        key: "default",
        name: "Assistant",
        trigger: None,
        system_prompt: "You are a helpful assistant for a chat application. Answer the user's \
            question using the chat-history context provided with it. Ground every claim in \
            those messages; if they do not contain the answer, say so. You may use the web \
            search tool when the question needs current information from outside the chat.",
    },
];

/// Fallback persona (`default`, no trigger).
pub fn default_persona() -> &'static Persona {
    PERSONAS
        .iter()
        .find(|p| p.trigger.is_none())
        .expect("default persona is declared")
}

pub fn get(key: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|p| p.key == key)
}

/// Detect the persona addressed by `raw` and strip its trigger.
///
/// Triggers match case-insensitively as a literal prefix of the trimmed
/// message. No match returns the default persona with the message
/// unmodified.
pub fn detect(raw: &str) -> (&'static Persona, String) {
    let trimmed = raw.trim_start();
    for persona in PERSONAS.iter() {
        let Some(trigger) = persona.trigger else {
            continue;
        };
        if trimmed.len() >= trigger.len()
            && trimmed.is_char_boundary(trigger.len())
            && trimmed[..trigger.len()].eq_ignore_ascii_case(trigger)
        {
            let clean = trimmed[trigger.len()..].trim().to_string();
            return (persona, clean);
        }
    }
    (default_persona(), raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_trigger_and_strips_it() {
        let (persona, clean) = detect("@summarizer what did we discuss");
        assert_eq!(persona.key, "summarizer");
        assert_eq!(clean, "what did we discuss");
    }

    #[test]
    fn triggers_match_case_insensitively() {
        let (persona, clean) = detect("@Analyst who mentioned the deadline?");
        assert_eq!(persona.key, "analyst");
        assert_eq!(clean, "who mentioned the deadline?");
    }

    #[test]
    fn no_trigger_returns_default_unmodified() {
        let (persona, clean) = detect("  what did we discuss  ");
        assert_eq!(persona.key, "default");
        assert_eq!(clean, "  what did we discuss  ");
    }

    #[test]
    fn detection_is_idempotent_on_clean_message() {
        let (_, clean) = detect("@casual remind me about the party");
        let (persona, again) = detect(&clean);
        assert_eq!(persona.key, "default");
        assert_eq!(again, clean);
    }

    #[test]
    fn mid_sentence_trigger_does_not_match() {
        let (persona, _) = detect("tell @analyst about this");
        assert_eq!(persona.key, "default");
    }

    #[test]
    fn every_persona_key_resolves() {
        for persona in PERSONAS.iter() {
            assert!(get(persona.key).is_some());
        }
        assert_eq!(default_persona().key, "default");
    }
}
