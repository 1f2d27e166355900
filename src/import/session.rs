use std::fmt;

use uuid::Uuid;

/// Opaque token correlating an import request with its progress channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self(format!("session_{}", &id[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_have_prefix_and_differ() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert!(a.as_str().starts_with("session_"));
        assert_eq!(a.as_str().len(), "session_".len() + 8);
        assert_ne!(a, b);
    }
}
