pub fn env_var_non_empty(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => !v.is_empty(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::env_var_non_empty;

    #[test]
    fn test_env_var_non_empty() {
        assert!(!env_var_non_empty("ABGELTUNG_TEST_VAR_THAT_IS_NOT_SET"));
    }
}
