use serde::{Deserialize, Serialize};

/// Which panel a token belongs to. Each is sent to the clinic backend under
/// its own header name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Patient,
    Admin,
    Doctor,
}

impl TokenKind {
    pub fn header_name(&self) -> &'static str {
        match self {
            TokenKind::Patient => "token",
            TokenKind::Admin => "atoken",
            TokenKind::Doctor => "dtoken",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AuthToken {
    pub kind: TokenKind,
    value: String,
}

impl AuthToken {
    pub fn patient(value: impl Into<String>) -> Self {
        Self { kind: TokenKind::Patient, value: value.into() }
    }

    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self { kind, value: value.into() }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

// Tokens end up in request extensions and spans; keep the value out of logs.
impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("kind", &self.kind)
            .field("value", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names() {
        assert_eq!(TokenKind::Patient.header_name(), "token");
        assert_eq!(TokenKind::Admin.header_name(), "atoken");
        assert_eq!(TokenKind::Doctor.header_name(), "dtoken");
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = AuthToken::patient("secret-value");
        let printed = format!("{:?}", token);
        assert!(!printed.contains("secret-value"));
        assert_eq!(token.value(), "secret-value");
    }
}
