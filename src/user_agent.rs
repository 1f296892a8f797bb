//! User-Agent string sent with every feed API request.

/// Identifies the tool and its version to the feed service.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("feed-sdk/{version} (rust; item-feed-client)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_crate_version() {
        let ua = default_user_agent();
        let version = ua
            .strip_prefix("feed-sdk/")
            .and_then(|rest| rest.split(' ').next());
        assert_eq!(version, Some(env!("CARGO_PKG_VERSION")));
    }
}
