use regex::Regex;
use std::fmt;

const MAX_LOCAL_PART: usize = 64;
const MAX_DOMAIN_PART: usize = 255;

/// First rule an email failed, in the order the rules are checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmailError {
    Empty,
    ContainsSpace,
    MissingAt,
    MultipleAt,
    EmptyLocalPart,
    LocalPartTooLong,
    LocalPartConsecutiveDots,
    LocalPartDotEdge,
    EmptyDomain,
    DomainTooLong,
    DomainMissingDot,
    DomainConsecutiveDots,
    DomainEdge,
    MissingTld,
    LocalPartInvalidChars,
    DomainInvalidChars,
    Malformed,
}

impl fmt::Display for EmailError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            EmailError::Empty => "Please enter your email.",
            EmailError::ContainsSpace => "Email must not contain spaces.",
            EmailError::MissingAt => "Email must contain the @ symbol.",
            EmailError::MultipleAt => "Invalid email format.",
            EmailError::EmptyLocalPart => "The part before @ cannot be empty.",
            EmailError::LocalPartTooLong => {
                "The part before @ is too long (64 characters maximum)."
            }
            EmailError::LocalPartConsecutiveDots => {
                "The part before @ cannot contain two dots in a row."
            }
            EmailError::LocalPartDotEdge => {
                "The part before @ cannot start or end with a dot."
            }
            EmailError::EmptyDomain => "The part after @ cannot be empty.",
            EmailError::DomainTooLong => "The domain is too long (255 characters maximum).",
            EmailError::DomainMissingDot => "The domain must contain a dot (for example example.com).",
            EmailError::DomainConsecutiveDots => "The domain cannot contain two dots in a row.",
            EmailError::DomainEdge => "The domain has an invalid format.",
            EmailError::MissingTld => "The domain must end with a valid extension (for example .com).",
            EmailError::LocalPartInvalidChars => "The part before @ contains invalid characters.",
            EmailError::DomainInvalidChars => "The domain contains invalid characters.",
            EmailError::Malformed => "Please enter a valid email.",
        };
        formatter.write_str(message)
    }
}

impl std::error::Error for EmailError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmailValidation {
    pub is_valid: bool,
    pub error: Option<EmailError>,
}

impl EmailValidation {
    fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    fn invalid(error: EmailError) -> Self {
        Self {
            is_valid: false,
            error: Some(error),
        }
    }

    /// Converts into a `Result` for `?`-style callers.
    ///
    /// # Errors
    /// Returns the first failed rule.
    pub fn into_result(self) -> Result<(), EmailError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Validates an email address. A space anywhere in the input fails, even a
/// leading or trailing one; other rules run on the trimmed value.
#[must_use]
pub fn validate_email(email: &str) -> EmailValidation {
    match check(email) {
        Ok(()) => EmailValidation::valid(),
        Err(error) => EmailValidation::invalid(error),
    }
}

fn check(email: &str) -> Result<(), EmailError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(EmailError::Empty);
    }
    if email.contains(' ') {
        return Err(EmailError::ContainsSpace);
    }

    let (local, domain) = match trimmed.split('@').collect::<Vec<_>>().as_slice() {
        [_] => return Err(EmailError::MissingAt),
        [local, domain] => (*local, *domain),
        _ => return Err(EmailError::MultipleAt),
    };

    if local.is_empty() {
        return Err(EmailError::EmptyLocalPart);
    }
    if local.chars().count() > MAX_LOCAL_PART {
        return Err(EmailError::LocalPartTooLong);
    }
    if local.contains("..") {
        return Err(EmailError::LocalPartConsecutiveDots);
    }
    if local.starts_with('.') || local.ends_with('.') {
        return Err(EmailError::LocalPartDotEdge);
    }

    if domain.is_empty() {
        return Err(EmailError::EmptyDomain);
    }
    if domain.chars().count() > MAX_DOMAIN_PART {
        return Err(EmailError::DomainTooLong);
    }
    if !domain.contains('.') {
        return Err(EmailError::DomainMissingDot);
    }
    if domain.contains("..") {
        return Err(EmailError::DomainConsecutiveDots);
    }
    if domain.starts_with(['.', '-']) || domain.ends_with(['.', '-']) {
        return Err(EmailError::DomainEdge);
    }
    if domain.rsplit('.').next().map_or(true, str::is_empty) {
        return Err(EmailError::MissingTld);
    }

    if !matches_pattern(r"^[a-zA-Z0-9._+-]+$", local) {
        return Err(EmailError::LocalPartInvalidChars);
    }
    if !matches_pattern(r"^[a-zA-Z0-9.-]+$", domain) {
        return Err(EmailError::DomainInvalidChars);
    }
    if !matches_pattern(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
        trimmed,
    ) {
        return Err(EmailError::Malformed);
    }

    Ok(())
}

fn matches_pattern(pattern: &str, value: &str) -> bool {
    Regex::new(pattern).is_ok_and(|regex| regex.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_of(email: &str) -> Option<EmailError> {
        validate_email(email).error
    }

    #[test]
    fn accepts_plain_addresses() {
        assert!(validate_email("a@b.co").is_valid);
        assert!(validate_email("first.last+tag@mail.example.org").is_valid);
        assert_eq!(validate_email("a@b.co").error, None);
    }

    #[test]
    fn any_space_is_rejected() {
        for email in ["a b@c.com", " a@b.co", "a@b.co ", "a@b .co"] {
            let result = validate_email(email);
            assert!(!result.is_valid, "{email:?} should be invalid");
            assert_eq!(result.error, Some(EmailError::ContainsSpace));
        }
    }

    #[test]
    fn at_sign_count_must_be_one() {
        assert_eq!(error_of("plainaddress"), Some(EmailError::MissingAt));
        assert_eq!(error_of("a@b@c.com"), Some(EmailError::MultipleAt));
        assert!(!validate_email("@@").is_valid);
    }

    #[test]
    fn dots_are_checked_on_both_sides() {
        assert_eq!(error_of("a..b@x.com"), Some(EmailError::LocalPartConsecutiveDots));
        assert_eq!(error_of(".a@x.com"), Some(EmailError::LocalPartDotEdge));
        assert_eq!(error_of("a@b..com"), Some(EmailError::DomainConsecutiveDots));
        assert_eq!(error_of("a@b"), Some(EmailError::DomainMissingDot));
        assert_eq!(error_of("a@.b.com"), Some(EmailError::DomainEdge));
        assert_eq!(error_of("a@b.com-"), Some(EmailError::DomainEdge));
    }

    #[test]
    fn empty_parts_and_lengths() {
        assert_eq!(error_of("   "), Some(EmailError::Empty));
        assert_eq!(error_of("@b.co"), Some(EmailError::EmptyLocalPart));
        assert_eq!(error_of("a@"), Some(EmailError::EmptyDomain));

        let long_local = format!("{}@b.co", "a".repeat(65));
        assert_eq!(error_of(&long_local), Some(EmailError::LocalPartTooLong));
        let long_domain = format!("a@{}.com", "b".repeat(252));
        assert_eq!(error_of(&long_domain), Some(EmailError::DomainTooLong));
    }

    #[test]
    fn character_sets_are_restricted() {
        assert_eq!(error_of("ä@b.co"), Some(EmailError::LocalPartInvalidChars));
        assert_eq!(error_of("a@b_c.co"), Some(EmailError::DomainInvalidChars));
        let label = "c".repeat(64);
        assert_eq!(error_of(&format!("a@{label}.com")), Some(EmailError::Malformed));
    }

    #[test]
    fn into_result_exposes_the_first_failure() {
        assert_eq!(validate_email("a@b").into_result(), Err(EmailError::DomainMissingDot));
        assert_eq!(validate_email("a@b.co").into_result(), Ok(()));
    }
}
