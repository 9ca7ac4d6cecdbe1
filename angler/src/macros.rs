/// Creates a single conversation [`Message`](crate::Message) from a role shorthand.
///
/// ```rust
/// use angler::{Role, angler_msg};
///
/// let message = angler_msg!(assistant => "Try a slower retrieve.");
/// assert_eq!(message.role, Role::Assistant);
/// assert_eq!(message.content, "Try a slower retrieve.");
/// ```
#[macro_export]
macro_rules! angler_msg {
    (user => $content:expr $(,)?) => {
        $crate::Message::user($content)
    };
    (assistant => $content:expr $(,)?) => {
        $crate::Message::assistant($content)
    };
    (greeting => $content:expr $(,)?) => {
        $crate::Message::greeting($content)
    };
    (notice => $content:expr $(,)?) => {
        $crate::Message::notice($content)
    };
    ($role:ident => $content:expr $(,)?) => {
        compile_error!("unsupported role: use user, assistant, greeting, or notice");
    };
}

/// Creates a `Vec<Message>` from role/content pairs, e.g. to seed
/// [`SessionClient::replace_all`](crate::SessionClient::replace_all).
///
/// ```rust
/// use angler::{Role, angler_history};
///
/// let history = angler_history![
///     user => "Best bait for perch?",
///     assistant => "Small worms or minnows.",
/// ];
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history[0].role, Role::User);
/// assert_eq!(history[1].role, Role::Assistant);
/// ```
#[macro_export]
macro_rules! angler_history {
    () => {
        Vec::<$crate::Message>::new()
    };
    ($($role:ident => $content:expr),+ $(,)?) => {
        vec![$($crate::angler_msg!($role => $content)),+]
    };
}
