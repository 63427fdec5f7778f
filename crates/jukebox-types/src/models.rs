use serde::{Deserialize, Serialize};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Validation failures collected during one operation, in the order they
/// were found. Scoped to the call that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Which side of the conversation to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageBox {
    /// Messages received by the user
    #[default]
    Inbox,
    /// Messages sent by the user
    Outbox,
}

/// User preferences the server knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// Send an email when a private message arrives
    NotifyEmail,
}

impl Preference {
    pub fn name(self) -> &'static str {
        match self {
            Self::NotifyEmail => "notify_email",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "notify_email" => Some(Self::NotifyEmail),
            _ => None,
        }
    }
}
