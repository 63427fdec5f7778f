//! Private messages between users.
//!
//! [`create`] is the only way a message comes into existence. It cleans and
//! validates the submitted fields, stores the row, and for messages the
//! caller wrote themself it may queue an email to the recipient. Validation
//! problems are returned to the caller as [`FieldErrors`]; mail problems are
//! never returned at all.

use thiserror::Error;
use tracing::{debug, info, warn};

use jukebox_db::models::{NewPrivateMessage, PrivateMessageRow, UserRow};
use jukebox_mailer::Mail;
use jukebox_types::api::{CreatePrivateMessageRequest, PrivateMessageResponse};
use jukebox_types::models::{FieldErrors, MessageBox, Preference};

use crate::auth::AppStateInner;
use crate::sanitize::{clean_text, escape_html};

const SEPARATOR: &str = "\n\n----------------------\n\n";

/// Hard cap on list sizes.
pub const MAX_LIST_LIMIT: u32 = 200;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Validate, store and (maybe) announce a new private message from
/// `session_user`. Returns the id of the stored message.
///
/// When `from_user` is set the message is written on someone else's behalf
/// and no email is ever sent for it.
pub fn create(
    state: &AppStateInner,
    session_user: i64,
    req: CreatePrivateMessageRequest,
) -> Result<i64, CreateError> {
    let subject = clean_text(&req.subject);
    let message = clean_text(&req.message);

    let mut errors = FieldErrors::new();
    if subject.is_empty() {
        errors.add("subject", "Subject is required");
    }

    let recipient = state.db.get_user_by_username(req.to_user.trim())?;
    if recipient.is_none() {
        errors.add("to_user", "Unknown user");
    }

    let recipient = match recipient {
        Some(user) if errors.is_empty() => user,
        _ => return Err(CreateError::Validation(errors)),
    };

    let impersonated = req.from_user.is_some();
    let from_user = req.from_user.unwrap_or(session_user);
    let creation_date = req
        .creation_date
        .filter(|d| *d != 0)
        .unwrap_or_else(|| chrono::Utc::now().timestamp());

    let id = state.db.insert_private_message(&NewPrivateMessage {
        subject: &subject,
        message: &message,
        from_user,
        to_user: recipient.id,
        creation_date,
        is_read: req.is_read.unwrap_or(false),
    })?;

    info!(id, from_user, to_user = recipient.id, "Private message created");

    // Never send email in case of user impersonation
    if !impersonated {
        notify_recipient(state, session_user, &recipient, id, &subject, &message);
    }

    Ok(id)
}

/// Queue the "you have a new message" mail if the recipient wants it.
/// Failures are logged and otherwise ignored.
fn notify_recipient(
    state: &AppStateInner,
    session_user: i64,
    recipient: &UserRow,
    id: i64,
    subject: &str,
    message: &str,
) {
    let wants_mail = match state.db.get_preference_bool(recipient.id, Preference::NotifyEmail.name()) {
        Ok(v) => v,
        Err(e) => {
            warn!(to_user = recipient.id, "Could not read notify_email preference: {:#}", e);
            return;
        }
    };

    if !wants_mail {
        return;
    }
    if recipient.email.trim().is_empty() || !state.mail_settings.enabled {
        debug!(to_user = recipient.id, "Recipient opted in but mail is not deliverable");
        return;
    }

    let sender_name = match state.db.get_user_by_id(session_user) {
        Ok(Some(user)) => user.display_name().to_string(),
        Ok(None) => String::new(),
        Err(e) => {
            warn!(session_user, "Could not look up sender for notification: {:#}", e);
            String::new()
        }
    };

    let mail = compose_notification(state, &sender_name, recipient, id, subject, message);
    state.mail.enqueue(mail);
}

fn compose_notification(
    state: &AppStateInner,
    sender_name: &str,
    recipient: &UserRow,
    id: i64,
    subject: &str,
    message: &str,
) -> Mail {
    let body = format!(
        "You received a new private message from {sender_name}.{SEPARATOR}{message}{SEPARATOR}{}",
        message_link(&state.web_path, id)
    );

    Mail::from_default_sender(&state.mail_settings)
        .to(recipient.email.trim(), recipient.fullname.as_str())
        .subject(format!("[Private Message] {subject}"))
        .message(body)
}

/// Fetch a message the session user sent or received.
pub fn get(state: &AppStateInner, session_user: i64, id: i64) -> anyhow::Result<Option<PrivateMessageRow>> {
    let row = state.db.get_private_message(id)?;
    Ok(row.filter(|m| m.from_user == session_user || m.to_user == session_user))
}

/// List one side of the session user's conversations, newest first.
pub fn list(
    state: &AppStateInner,
    session_user: i64,
    mailbox: MessageBox,
    limit: u32,
) -> anyhow::Result<Vec<PrivateMessageRow>> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);
    match mailbox {
        MessageBox::Inbox => state.db.get_received_messages(session_user, limit),
        MessageBox::Outbox => state.db.get_sent_messages(session_user, limit),
    }
}

pub fn message_link(web_path: &str, id: i64) -> String {
    format!("{}/pvmsg/{}", web_path.trim_end_matches('/'), id)
}

/// Display form of a stored message.
pub fn to_response(row: PrivateMessageRow, web_path: &str) -> PrivateMessageResponse {
    let subject_html = escape_html(&row.subject);
    let link = message_link(web_path, row.id);
    let link_html = format!("<a href=\"{}\">{}</a>", escape_html(&link), subject_html);
    let creation_date_formatted = chrono::DateTime::from_timestamp(row.creation_date, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();

    PrivateMessageResponse {
        id: row.id,
        subject: row.subject,
        subject_html,
        message: row.message,
        from_user: row.from_user,
        from_username: row.from_username,
        to_user: row.to_user,
        to_username: row.to_username,
        creation_date: row.creation_date,
        creation_date_formatted,
        is_read: row.is_read,
        link,
        link_html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jukebox_db::Database;
    use jukebox_mailer::{MailQueue, MailSettings};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        state: AppStateInner,
        outbox: UnboundedReceiver<Mail>,
        alice: i64,
        bob: i64,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "hash", "alice@example.com", "Alice Liddell").unwrap();
        let bob = db.create_user("bob", "hash", "bob@example.com", "Bob Builder").unwrap();
        db.set_preference(bob, "notify_email", "1").unwrap();

        let (mail, outbox) = MailQueue::new();
        let state = AppStateInner {
            db,
            jwt_secret: "test-secret".into(),
            mail,
            mail_settings: MailSettings {
                enabled: true,
                from: "jukebox@example.com".into(),
                from_name: "Jukebox".into(),
            },
            web_path: "https://music.example.com/".into(),
        };

        Fixture { state, outbox, alice, bob }
    }

    fn request(subject: &str, message: &str, to_user: &str) -> CreatePrivateMessageRequest {
        CreatePrivateMessageRequest {
            subject: subject.into(),
            message: message.into(),
            to_user: to_user.into(),
            ..Default::default()
        }
    }

    fn validation_errors(result: Result<i64, CreateError>) -> FieldErrors {
        match result {
            Err(CreateError::Validation(errors)) => errors,
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn creates_row_and_notifies_recipient() {
        let mut f = fixture();
        let id = create(&f.state, f.alice, request("Hi", "Hello there", "bob")).unwrap();

        let row = f.state.db.get_private_message(id).unwrap().unwrap();
        assert_eq!(row.subject, "Hi");
        assert_eq!(row.message, "Hello there");
        assert_eq!(row.from_user, f.alice);
        assert_eq!(row.to_user, f.bob);
        assert!(!row.is_read);
        assert!(row.creation_date > 0);

        let mail = f.outbox.try_recv().unwrap();
        assert_eq!(mail.sender, "jukebox@example.com");
        assert_eq!(mail.recipient, "bob@example.com");
        assert_eq!(mail.recipient_name, "Bob Builder");
        assert_eq!(mail.subject, "[Private Message] Hi");
        assert_eq!(
            mail.message,
            format!(
                "You received a new private message from Alice Liddell.\n\n----------------------\n\nHello there\n\n----------------------\n\nhttps://music.example.com/pvmsg/{id}"
            )
        );
        assert!(f.outbox.try_recv().is_err());
    }

    #[test]
    fn empty_subject_is_rejected_without_insert() {
        let mut f = fixture();
        for subject in ["", "   ", "<b></b>", " <br/> \n", "<3", "<"] {
            let errors = validation_errors(create(&f.state, f.alice, request(subject, "body", "bob")));
            assert!(errors.contains("subject"));
            assert_eq!(errors.len(), 1);
        }
        assert!(f.state.db.get_received_messages(f.bob, 10).unwrap().is_empty());
        assert!(f.outbox.try_recv().is_err());
    }

    #[test]
    fn unknown_recipient_is_rejected_without_insert() {
        let f = fixture();
        let errors = validation_errors(create(&f.state, f.alice, request("Hi", "body", "carol")));
        assert!(errors.contains("to_user"));
        assert_eq!(errors.iter().next().unwrap().message, "Unknown user");
        assert!(f.state.db.get_sent_messages(f.alice, 10).unwrap().is_empty());
    }

    #[test]
    fn all_field_errors_are_reported_together() {
        let f = fixture();
        let errors = validation_errors(create(&f.state, f.alice, request("", "body", "nobody")));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["subject", "to_user"]);
    }

    #[test]
    fn errors_do_not_leak_between_calls() {
        let f = fixture();
        assert!(create(&f.state, f.alice, request("", "body", "nobody")).is_err());
        assert!(create(&f.state, f.alice, request("Hi", "body", "bob")).is_ok());
    }

    #[test]
    fn markup_is_stripped_before_storage() {
        let mut f = fixture();
        let id = create(
            &f.state,
            f.alice,
            request("  <b>Hi</b> ", "<script>x</script>Hello <i>there</i>\n", "bob"),
        )
        .unwrap();

        let row = f.state.db.get_private_message(id).unwrap().unwrap();
        assert_eq!(row.subject, "Hi");
        assert_eq!(row.message, "xHello there");

        let mail = f.outbox.try_recv().unwrap();
        assert_eq!(mail.subject, "[Private Message] Hi");
        assert!(mail.message.contains("xHello there"));
    }

    #[test]
    fn impersonated_send_never_notifies() {
        let mut f = fixture();
        let id = create(
            &f.state,
            f.alice,
            CreatePrivateMessageRequest {
                from_user: Some(f.bob),
                ..request("On behalf", "body", "bob")
            },
        )
        .unwrap();

        let row = f.state.db.get_private_message(id).unwrap().unwrap();
        assert_eq!(row.from_user, f.bob);
        assert!(f.outbox.try_recv().is_err());
    }

    #[test]
    fn supplied_date_and_read_flag_are_kept() {
        let f = fixture();
        let id = create(
            &f.state,
            f.alice,
            CreatePrivateMessageRequest {
                creation_date: Some(1_600_000_000),
                is_read: Some(true),
                ..request("Old", "body", "bob")
            },
        )
        .unwrap();

        let row = f.state.db.get_private_message(id).unwrap().unwrap();
        assert_eq!(row.creation_date, 1_600_000_000);
        assert!(row.is_read);
    }

    #[test]
    fn zero_creation_date_means_now() {
        let f = fixture();
        let before = chrono::Utc::now().timestamp();
        let id = create(
            &f.state,
            f.alice,
            CreatePrivateMessageRequest {
                creation_date: Some(0),
                ..request("Now", "body", "bob")
            },
        )
        .unwrap();
        assert!(f.state.db.get_private_message(id).unwrap().unwrap().creation_date >= before);
    }

    #[test]
    fn negative_creation_date_is_kept() {
        let f = fixture();
        let id = create(
            &f.state,
            f.alice,
            CreatePrivateMessageRequest {
                creation_date: Some(-86_400),
                ..request("Before epoch", "body", "bob")
            },
        )
        .unwrap();
        assert_eq!(f.state.db.get_private_message(id).unwrap().unwrap().creation_date, -86_400);
    }

    #[test]
    fn no_mail_when_recipient_opted_out() {
        let mut f = fixture();
        f.state.db.set_preference(f.bob, "notify_email", "0").unwrap();
        create(&f.state, f.alice, request("Hi", "body", "bob")).unwrap();
        assert!(f.outbox.try_recv().is_err());
    }

    #[test]
    fn no_mail_when_mail_disabled() {
        let mut f = fixture();
        f.state.mail_settings.enabled = false;
        create(&f.state, f.alice, request("Hi", "body", "bob")).unwrap();
        assert!(f.outbox.try_recv().is_err());
    }

    #[test]
    fn no_mail_when_recipient_has_no_email() {
        let mut f = fixture();
        let carol = f.state.db.create_user("carol", "hash", "", "Carol").unwrap();
        f.state.db.set_preference(carol, "notify_email", "1").unwrap();
        create(&f.state, f.alice, request("Hi", "body", "carol")).unwrap();
        assert!(f.outbox.try_recv().is_err());
    }

    #[test]
    fn sender_without_fullname_is_named_by_username() {
        let mut f = fixture();
        let dave = f.state.db.create_user("dave", "hash", "", "").unwrap();
        create(&f.state, dave, request("Yo", "body", "bob")).unwrap();
        let mail = f.outbox.try_recv().unwrap();
        assert!(mail.message.starts_with("You received a new private message from dave."));
    }

    #[test]
    fn identical_requests_create_distinct_rows() {
        let f = fixture();
        let first = create(&f.state, f.alice, request("Hi", "same", "bob")).unwrap();
        let second = create(&f.state, f.alice, request("Hi", "same", "bob")).unwrap();
        assert_ne!(first, second);
        assert_eq!(f.state.db.get_received_messages(f.bob, 10).unwrap().len(), 2);
    }

    #[test]
    fn storage_failure_is_reported() {
        let mut f = fixture();
        let result = create(
            &f.state,
            f.alice,
            CreatePrivateMessageRequest {
                from_user: Some(9_999),
                ..request("Hi", "body", "bob")
            },
        );
        assert!(matches!(result, Err(CreateError::Storage(_))));
        assert!(f.outbox.try_recv().is_err());
    }

    #[test]
    fn mail_worker_gone_does_not_fail_create() {
        let f = fixture();
        drop(f.outbox);
        assert!(create(&f.state, f.alice, request("Hi", "body", "bob")).is_ok());
    }

    #[test]
    fn get_is_limited_to_participants() {
        let f = fixture();
        let carol = f.state.db.create_user("carol", "hash", "", "").unwrap();
        let id = create(&f.state, f.alice, request("Hi", "body", "bob")).unwrap();

        assert!(get(&f.state, f.alice, id).unwrap().is_some());
        assert!(get(&f.state, f.bob, id).unwrap().is_some());
        assert!(get(&f.state, carol, id).unwrap().is_none());
    }

    #[test]
    fn list_splits_inbox_and_outbox() {
        let f = fixture();
        create(&f.state, f.alice, request("To bob", "body", "bob")).unwrap();
        create(&f.state, f.bob, request("To alice", "body", "alice")).unwrap();

        let inbox = list(&f.state, f.bob, MessageBox::Inbox, 50).unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].subject, "To bob");

        let outbox = list(&f.state, f.bob, MessageBox::Outbox, 50).unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].subject, "To alice");
    }

    #[test]
    fn response_escapes_subject_and_builds_link() {
        let row = PrivateMessageRow {
            id: 7,
            subject: "Tom & Jerry".into(),
            message: "m".into(),
            from_user: 1,
            from_username: "alice".into(),
            to_user: 2,
            to_username: "bob".into(),
            creation_date: 0,
            is_read: false,
        };

        let resp = to_response(row, "https://music.example.com");
        assert_eq!(resp.subject_html, "Tom &amp; Jerry");
        assert_eq!(resp.link, "https://music.example.com/pvmsg/7");
        assert_eq!(
            resp.link_html,
            "<a href=\"https://music.example.com/pvmsg/7\">Tom &amp; Jerry</a>"
        );
        assert_eq!(resp.creation_date_formatted, "1970-01-01 00:00:00");
    }
}
