use uuid::Uuid;

/// Token a settlement sends with every submission so the service can drop replays.
pub fn new_request_token() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tokens_are_unique_uuids() {
        let a = new_request_token();
        let b = new_request_token();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
