//! Whitelist authorization.

/// Whitelist gate, run by the transport handler before any session state is
/// touched. Senders without a username never reach the registry.
pub fn is_authorized(username: Option<&str>, allowed_users: &[String]) -> bool {
    let Some(username) = username else {
        return false;
    };
    if allowed_users.is_empty() {
        return false;
    }
    allowed_users.iter().any(|u| u == username)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist() -> Vec<String> {
        vec!["alice".to_string(), "bob".to_string()]
    }

    #[test]
    fn listed_user_is_authorized() {
        assert!(is_authorized(Some("alice"), &whitelist()));
    }

    #[test]
    fn unlisted_user_is_rejected() {
        assert!(!is_authorized(Some("mallory"), &whitelist()));
    }

    #[test]
    fn missing_username_is_rejected() {
        assert!(!is_authorized(None, &whitelist()));
    }

    #[test]
    fn empty_whitelist_rejects_everyone() {
        assert!(!is_authorized(Some("alice"), &[]));
    }
}
