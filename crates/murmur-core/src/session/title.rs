//! Chat title derivation.
//!
//! Once a chat's first user+assistant exchange completes, its title is
//! derived by truncating the first user message. Truncation counts chars,
//! not bytes, so multibyte input never splits a boundary.

/// Maximum number of characters kept from the first user message.
pub const MAX_TITLE_CHARS: usize = 50;

/// Derive a chat title from the first user message.
///
/// Keeps the first [`MAX_TITLE_CHARS`] characters and appends an ellipsis
/// marker when anything was cut.
pub fn derive_title(first_user_message: &str) -> String {
    let mut chars = first_user_message.chars();
    let head: String = chars.by_ref().take(MAX_TITLE_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
