//! Origin policy for WebSocket upgrade requests.

use std::fmt;

/// Which browser origins may open a session.
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    /// Allowed origins. Empty allows every origin.
    pub allowed_origins: Vec<String>,
    /// Whether requests without an `Origin` header are refused.
    pub require_origin: bool,
}

/// Result of validating an upgrade request.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum HandshakeResult {
    /// The upgrade may proceed.
    Accept {
        /// The client's origin, if provided.
        origin: Option<String>,
    },
    /// The upgrade must be refused.
    Reject {
        /// HTTP status code to return.
        status: u16,
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl fmt::Display for HandshakeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeResult::Accept { origin: Some(o) } => write!(f, "Accept (origin: {})", o),
            HandshakeResult::Accept { origin: None } => write!(f, "Accept"),
            HandshakeResult::Reject { status, reason } => {
                write!(f, "Reject {} - {}", status, reason)
            }
        }
    }
}

impl OriginPolicy {
    /// Build a policy from an allow-list. Origins are compared exactly,
    /// ignoring a trailing slash.
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins,
            require_origin: false,
        }
    }

    /// Validate the `Origin` header of an upgrade request.
    pub fn validate(&self, origin: Option<&str>) -> HandshakeResult {
        let Some(origin) = origin else {
            if self.require_origin {
                return HandshakeResult::Reject {
                    status: 403,
                    reason: "Origin header required".to_string(),
                };
            }
            return HandshakeResult::Accept { origin: None };
        };

        let normalized = origin.trim_end_matches('/');
        if !self.allowed_origins.is_empty()
            && !self
                .allowed_origins
                .iter()
                .any(|allowed| allowed.trim_end_matches('/') == normalized)
        {
            return HandshakeResult::Reject {
                status: 403,
                reason: format!("Origin '{}' not allowed", origin),
            };
        }

        HandshakeResult::Accept {
            origin: Some(origin.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_accepts_everything() {
        let policy = OriginPolicy::default();
        assert!(matches!(
            policy.validate(Some("https://evil.example")),
            HandshakeResult::Accept { .. }
        ));
        assert_eq!(policy.validate(None), HandshakeResult::Accept { origin: None });
    }

    #[test]
    fn allow_list_is_enforced() {
        let policy = OriginPolicy::new(vec!["https://poker.example/".into()]);
        assert!(matches!(
            policy.validate(Some("https://poker.example")),
            HandshakeResult::Accept { .. }
        ));
        assert!(matches!(
            policy.validate(Some("https://other.example")),
            HandshakeResult::Reject { status: 403, .. }
        ));
    }

    #[test]
    fn missing_origin_rejected_when_required() {
        let policy = OriginPolicy {
            allowed_origins: vec![],
            require_origin: true,
        };
        assert!(matches!(
            policy.validate(None),
            HandshakeResult::Reject { status: 403, .. }
        ));
    }
}
