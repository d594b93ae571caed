//! Structured logging macros.
//!
//! Every overlay event carries a `component` field (`kdc`, `broker`,
//! `publisher`, `subscriber`, `router`) plus the simulated time, so JSON
//! output can be filtered per role and ordered without wall-clock stamps.

/// Log an event with a component and simulated time.
///
/// # Example
///
/// ```rust,ignore
/// log_event!(info, "kdc", now, "Topic registered", topic_id = 5);
/// ```
#[macro_export]
macro_rules! log_event {
    ($level:ident, $component:expr, $now:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            sim_time = %$now,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a control-message event with the message id and its endpoints.
#[macro_export]
macro_rules! log_message_event {
    ($level:ident, $component:expr, $now:expr, $msg:expr, $message:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            sim_time = %$now,
            message_id = %$message.id,
            source = %$message.source,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a contact-related event between two hosts.
#[macro_export]
macro_rules! log_contact_event {
    ($level:ident, $now:expr, $msg:expr, $a:expr, $b:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = "contact",
            sim_time = %$now,
            host_a = %$a,
            host_b = %$b,
            $($($field)*,)?
            $msg
        )
    };
}
