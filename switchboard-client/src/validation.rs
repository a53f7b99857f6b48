//! Form validation
//!
//! Checks run before a request is built. A failed check produces a
//! field-keyed [`FieldErrors`] list and nothing is sent.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use shared::models::UserForm;

// ── Text length limits ──────────────────────────────────────────────

/// First/last names
pub const MAX_NAME_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Extension, cellphone, telephone
pub const MAX_PHONE_LEN: usize = 32;

/// Passwords
pub const MAX_PASSWORD_LEN: usize = 128;

/// One failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Failed checks in form order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// First message for a field, for inline rendering next to it
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

// ── Field checks ────────────────────────────────────────────────────

fn check_required(errors: &mut FieldErrors, value: &str, field: &'static str, label: &str, max_len: usize) -> bool {
    if value.trim().is_empty() {
        errors.push(field, format!("{label} is required"));
        return false;
    }
    if value.len() > max_len {
        errors.push(field, format!("{label} is too long ({} chars, max {max_len})", value.len()));
        return false;
    }
    true
}

fn check_optional(errors: &mut FieldErrors, value: &Option<String>, field: &'static str, label: &str, max_len: usize) {
    if let Some(v) = value
        && v.len() > max_len
    {
        errors.push(field, format!("{label} is too long ({} chars, max {max_len})", v.len()));
    }
}

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email pattern compiles")
});

/// `local@domain.tld`: local part of letters, digits and `._%+-`; domain of
/// letters, digits, dots and hyphens; alphabetic TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Digits only, at least one
pub fn is_valid_extension(extension: &str) -> bool {
    !extension.is_empty() && extension.chars().all(|c| c.is_ascii_digit())
}

// ── Forms ───────────────────────────────────────────────────────────

/// Login form: a valid email and a non-empty password
pub fn validate_login(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if !is_valid_email(email.trim()) {
        errors.push("email", "Please enter a valid email address");
    }
    if password.is_empty() {
        errors.push("password", "Password is required");
    } else if password.len() > MAX_PASSWORD_LEN {
        errors.push("password", format!("Password is too long (max {MAX_PASSWORD_LEN})"));
    }
    errors.into_result()
}

/// Add/edit user form
///
/// `require_password` is set for creation; edits keep the current password
/// when it is left blank.
pub fn validate_user_form(form: &UserForm, require_password: bool) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    check_required(&mut errors, &form.first_name, "first_name", "First name", MAX_NAME_LEN);
    check_required(&mut errors, &form.last_name, "last_name", "Last name", MAX_NAME_LEN);

    if check_required(&mut errors, &form.email, "email", "Email", MAX_EMAIL_LEN)
        && !is_valid_email(form.email.trim())
    {
        errors.push("email", "Invalid email address");
    }

    if check_required(&mut errors, &form.extension, "extension", "Extension", MAX_PHONE_LEN)
        && !is_valid_extension(form.extension.trim())
    {
        errors.push("extension", "Extension must contain only numbers");
    }

    check_optional(&mut errors, &form.cellphone, "cellphone", "Cellphone", MAX_PHONE_LEN);
    check_optional(&mut errors, &form.telephone, "telephone", "Telephone", MAX_PHONE_LEN);

    match form.password.as_deref() {
        Some(p) if p.len() > MAX_PASSWORD_LEN => {
            errors.push("password", format!("Password is too long (max {MAX_PASSWORD_LEN})"));
        }
        Some(p) if require_password && p.is_empty() => errors.push("password", "Password is required"),
        None if require_password => errors.push("password", "Password is required"),
        _ => {}
    }

    if form.department_id.is_none() {
        errors.push("department_id", "Department is required");
    }
    if form.role_id.is_none() {
        errors.push("role_id", "Role is required");
    }

    errors.into_result()
}
