//! Test support for the layer editor crates.
//!
//! [`MockTransport`] stands in for the admin backend. Its responses are
//! scripted per operation and can be held back with a [`Gate`] so a test
//! decides which of two concurrent requests finishes first. [`fixtures`]
//! builds drafts, capability catalogs and admin metadata that pass or fail
//! validation in known ways, and the `assert_*_message!` macros check the
//! wizard's notification queue by key.
//!
//! Only integration tests (`tests/`) should depend on this crate: it links
//! `capabilities-client`, so unit tests inside that crate would see two
//! copies of its types.

pub mod fixtures;
pub mod mock;

// Re-export commonly used items at the crate root
pub use mock::{Call, Gate, MockTransport, FIRST_ASSIGNED_ID};

/// Macro asserting that a message list contains a key.
///
/// Works on anything iterable over `&Message`.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_has_message;
///
/// assert_has_message!(snapshot.wizard.messages, "messages.saveSuccess");
/// ```
#[macro_export]
macro_rules! assert_has_message {
    ($messages:expr, $key:expr) => {{
        let key: &str = $key;
        let found = $messages.iter().any(|m| m.key == key);
        if !found {
            let keys: Vec<&str> = $messages.iter().map(|m| m.key.as_str()).collect();
            panic!(
                "assertion failed: message `{}` not found\n  messages: `{:?}`",
                key, keys
            );
        }
    }};
}

/// Macro asserting that a message list does not contain a key.
#[macro_export]
macro_rules! assert_no_message {
    ($messages:expr, $key:expr) => {{
        let key: &str = $key;
        if $messages.iter().any(|m| m.key == key) {
            panic!("assertion failed: unexpected message `{}`", key);
        }
    }};
}
