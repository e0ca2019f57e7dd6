//! Input validation for usernames and passwords.

/// Maximum accepted length of a username (an email address).
pub const MAX_USERNAME_LENGTH: usize = 254;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// bcrypt only looks at the first 72 bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Validate an email-shaped username: `local@domain.tld`, no whitespace or
/// control characters.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Email is required".into());
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err("Email is too long".into());
    }
    if username
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err("Email must not contain whitespace".into());
    }

    let Some((local, domain)) = username.split_once('@') else {
        return Err("Invalid email address".into());
    };
    if local.is_empty() || domain.contains('@') {
        return Err("Invalid email address".into());
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err("Invalid email address".into());
    }

    Ok(())
}

/// Password policy: at least 8 characters with an uppercase letter, a
/// lowercase letter, a digit and a special character.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        ));
    }

    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(
            "Password must contain an uppercase letter, a lowercase letter, a digit and a special character"
                .into(),
        );
    }

    Ok(())
}
