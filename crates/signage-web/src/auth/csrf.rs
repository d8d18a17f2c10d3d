use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use signage_core::account::constant_time_eq;

/// Fresh anti-forgery token: 32 random bytes, URL-safe base64.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Checks a submitted token against the session's. An empty expected token
/// never matches.
pub fn verify(expected: &str, provided: &str) -> bool {
    !expected.is_empty() && constant_time_eq(expected.as_bytes(), provided.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_random_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn verify_matches_exact_token_only() {
        let token = generate_token();
        assert!(verify(&token, &token));
        assert!(!verify(&token, ""));
        assert!(!verify(&token, &generate_token()));
        assert!(!verify("", ""));
    }
}
