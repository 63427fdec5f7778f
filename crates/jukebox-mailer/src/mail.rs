use serde::Serialize;

/// Server-wide mail settings.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// Global switch; nothing is queued while this is off.
    pub enabled: bool,
    pub from: String,
    pub from_name: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            from: "info@localhost".into(),
            from_name: "Jukebox".into(),
        }
    }
}

/// A fully composed message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mail {
    pub sender: String,
    pub sender_name: String,
    pub recipient: String,
    pub recipient_name: String,
    pub subject: String,
    pub message: String,
}

impl Mail {
    /// Start a mail from the configured default sender.
    pub fn from_default_sender(settings: &MailSettings) -> Self {
        Self {
            sender: settings.from.clone(),
            sender_name: settings.from_name.clone(),
            recipient: String::new(),
            recipient_name: String::new(),
            subject: String::new(),
            message: String::new(),
        }
    }

    pub fn to(mut self, recipient: impl Into<String>, recipient_name: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self.recipient_name = recipient_name.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_uses_default_sender() {
        let settings = MailSettings {
            enabled: true,
            from: "noreply@jukebox.test".into(),
            from_name: "Jukebox Test".into(),
        };

        let mail = Mail::from_default_sender(&settings)
            .to("bob@example.com", "Bob")
            .subject("Hello")
            .message("Body");

        assert_eq!(mail.sender, "noreply@jukebox.test");
        assert_eq!(mail.sender_name, "Jukebox Test");
        assert_eq!(mail.recipient, "bob@example.com");
        assert_eq!(mail.recipient_name, "Bob");
        assert_eq!(mail.subject, "Hello");
        assert_eq!(mail.message, "Body");
    }

    #[test]
    fn serializes_for_relay() {
        let mail = Mail::from_default_sender(&MailSettings::default()).to("a@b.c", "A");
        let json = serde_json::to_value(&mail).unwrap();
        assert_eq!(json["sender"], "info@localhost");
        assert_eq!(json["recipient"], "a@b.c");
    }
}
