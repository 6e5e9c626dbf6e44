use std::sync::LazyLock;

use regex::Regex;

/// Longest nickname the `users` table accepts.
pub const MAX_NICKNAME_LEN: usize = 64;

/// Used when neither the provider's hint nor the email yields any usable character.
const FALLBACK_NICKNAME: &str = "user";

static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9_.]").expect("static regex"));

/// Removes every character that is not a letter, digit, '.' or '_'.
pub fn sanitize(raw: &str) -> String {
    INVALID_CHARS.replace_all(raw, "").into_owned()
}

/// Picks the base nickname for a new account.
///
/// Prefers the provider's hint, then the local part of the email, then a fixed
/// fallback. The result is always non-empty, valid, and short enough to leave
/// room for a numeric suffix.
pub fn base_nickname(hint: Option<&str>, email: &str) -> String {
    let from_hint = hint.map(sanitize).unwrap_or_default();
    let base = if from_hint.is_empty() {
        let local_part = email.split('@').next().unwrap_or_default();
        sanitize(local_part)
    } else {
        from_hint
    };

    let base = if base.is_empty() {
        FALLBACK_NICKNAME.to_string()
    } else {
        base
    };

    // Sanitized text is ASCII, so byte truncation is char-safe.
    let mut base = base;
    base.truncate(MAX_NICKNAME_LEN - 8);
    base
}

/// Candidate for the n-th attempt: `bob`, `bob2`, `bob3`, ...
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}{}", base, attempt)
    }
}

/// `validator` hook: the nickname must already be in sanitized form.
pub fn validate_nickname(nickname: &str) -> Result<(), validator::ValidationError> {
    if nickname.is_empty() || sanitize(nickname) != nickname {
        let mut err = validator::ValidationError::new("invalid_nickname");
        err.message = Some(
            "This nickname has invalid characters. Please use letters, numbers, dots and underscores only."
                .into(),
        );
        return Err(err);
    }
    Ok(())
}
