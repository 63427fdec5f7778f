//! Outbound email for the jukebox server.
//!
//! Request handlers never talk to a mail transport directly. They push a
//! [`Mail`] onto a [`MailQueue`]; a background worker owns the transport and
//! retries failed deliveries according to a [`RetryPolicy`].

pub mod mail;
pub mod queue;
pub mod transport;

pub use mail::{Mail, MailSettings};
pub use queue::{MailQueue, RetryPolicy, run_worker};
pub use transport::{LogTransport, MailError, MailTransport, RelayTransport};
