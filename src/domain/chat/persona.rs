//! Persona - the system message shaping a conversation.

/// A persona is a base prompt plus optional behavioral qualifiers, rendered
/// into the system message that seeds every transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    /// Base system prompt.
    pub prompt: String,
    /// Behavioral qualifiers rendered as a "You will:" list.
    pub qualifiers: Vec<String>,
}

impl Persona {
    /// Creates a persona with no qualifiers.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            qualifiers: Vec::new(),
        }
    }

    /// Adds a single behavioral qualifier.
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    /// Replaces the qualifier list.
    pub fn with_qualifiers(mut self, qualifiers: Vec<String>) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// Renders the system message for this persona.
    pub fn system_message(&self) -> String {
        if self.qualifiers.is_empty() {
            return self.prompt.clone();
        }
        format!(
            "{}\n\nYou will:\n- {}",
            self.prompt.trim(),
            self.qualifiers.join("\n- ")
        )
    }
}
