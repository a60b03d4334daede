//! API bearer token value object.

use std::fmt;

/// Bearer token for the club API, masked in logs and debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken {
    value: String,
}

impl ApiToken {
    const MIN_TOKEN_LENGTH: usize = 16;

    /// Creates a token after trimming; rejects short or whitespace-containing values.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into().trim().to_string();

        if value.len() < Self::MIN_TOKEN_LENGTH {
            return None;
        }

        if value.chars().any(char::is_whitespace) {
            return None;
        }

        Some(Self { value })
    }

    /// Creates token without validation.
    #[must_use]
    pub fn new_unchecked(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Returns token as string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns masked token for display.
    #[must_use]
    pub fn masked(&self) -> String {
        if self.value.len() <= 10 {
            return "*".repeat(self.value.len());
        }

        let visible_prefix = &self.value[..4];
        let visible_suffix = &self.value[self.value.len() - 4..];
        format!("{visible_prefix}...{visible_suffix}")
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("value", &self.masked())
            .finish()
    }
}

impl fmt::Display for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "c2VjcmV0LXRva2VuLXZhbHVl";

    #[test]
    fn test_valid_token_creation() {
        assert!(ApiToken::new(format!("  {VALID}\n")).is_some());
    }

    #[test]
    fn test_invalid_tokens() {
        assert!(ApiToken::new("short").is_none());
        assert!(ApiToken::new("has some spaces inside it").is_none());
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let token = ApiToken::new_unchecked(VALID);
        let debug_output = format!("{token:?}");

        assert!(debug_output.contains("..."));
        assert!(!debug_output.contains(VALID));
    }
}
