/// Default base URL for a locally served agent gateway.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Normalize a gateway base URL for endpoint construction.
///
/// Normalization rules:
/// 1) blank input falls back to the default local gateway
/// 2) surrounding whitespace and trailing slashes are removed
pub fn normalize_base_url(input: &str) -> String {
    let base = input.trim();
    if base.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }

    base.trim_end_matches('/').to_string()
}

/// Endpoint receiving streaming run requests.
pub fn run_sse_url(base_url: &str) -> String {
    format!("{}/run_sse", normalize_base_url(base_url))
}

/// Collection endpoint for one user's sessions.
pub fn sessions_url(base_url: &str, app_name: &str, user_id: &str) -> String {
    format!(
        "{}/apps/{app_name}/users/{user_id}/sessions",
        normalize_base_url(base_url)
    )
}

/// Endpoint for one session; used by create, get, and delete.
pub fn session_url(base_url: &str, app_name: &str, user_id: &str, session_id: &str) -> String {
    format!("{}/{session_id}", sessions_url(base_url, app_name, user_id))
}

#[cfg(test)]
mod tests {
    use super::{normalize_base_url, run_sse_url, session_url, sessions_url, DEFAULT_BASE_URL};

    #[test]
    fn blank_base_url_falls_back_to_default() {
        assert_eq!(normalize_base_url(""), DEFAULT_BASE_URL);
        assert_eq!(normalize_base_url("   "), DEFAULT_BASE_URL);
    }

    #[test]
    fn trailing_slashes_and_whitespace_are_trimmed() {
        assert_eq!(
            normalize_base_url("  http://gateway:9000// "),
            "http://gateway:9000"
        );
    }

    #[test]
    fn endpoints_compose_app_user_and_session_segments() {
        assert_eq!(
            run_sse_url("http://gateway:9000/"),
            "http://gateway:9000/run_sse"
        );
        assert_eq!(
            sessions_url("http://gateway:9000", "support", "u-1"),
            "http://gateway:9000/apps/support/users/u-1/sessions"
        );
        assert_eq!(
            session_url("http://gateway:9000", "support", "u-1", "s-9"),
            "http://gateway:9000/apps/support/users/u-1/sessions/s-9"
        );
    }
}
