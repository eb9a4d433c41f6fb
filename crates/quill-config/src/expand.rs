//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a string.
///
/// Strings without `${` are returned unchanged, so bare `$` in URLs and user
/// agents survive as-is.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match std::env::var(var) {
            Ok(val) => Ok(Some(val)),
            Err(_) => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Expand every entry of a list field, reporting the failing index.
pub(crate) fn expand_env_list(values: &[String], field: &str) -> Result<Vec<String>, ConfigError> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| expand_env(value, &format!("{field}[{i}]")))
        .collect()
}

struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_embedded_var() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::set_var("QUILL_TEST_RESOLVER_HOST", "pds.example.com");
        }
        let result = expand_env(
            "https://${QUILL_TEST_RESOLVER_HOST}/xrpc",
            "embeds.handle_resolvers",
        )
        .unwrap();
        assert_eq!(result, "https://pds.example.com/xrpc");
        unsafe {
            std::env::remove_var("QUILL_TEST_RESOLVER_HOST");
        }
    }

    #[test]
    fn test_expand_with_default_uses_default() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::remove_var("QUILL_TEST_UNSET_AGENT");
        }
        let result = expand_env("${QUILL_TEST_UNSET_AGENT:-quill-bot}", "embeds.user_agent").unwrap();
        assert_eq!(result, "quill-bot");
    }

    #[test]
    fn test_expand_missing_var_error() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::remove_var("QUILL_TEST_MISSING_HOST");
        }
        let err = expand_env("${QUILL_TEST_MISSING_HOST}", "server.host").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("QUILL_TEST_MISSING_HOST"));
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_bare_dollar_not_expanded() {
        let result = expand_env("Mozilla/5.0 ($compat)", "embeds.user_agent").unwrap();
        assert_eq!(result, "Mozilla/5.0 ($compat)");
    }

    #[test]
    fn test_expand_list_reports_index() {
        // SAFETY: each test uses its own variable name
        unsafe {
            std::env::remove_var("QUILL_TEST_LIST_MISSING");
        }
        let values = vec![
            "https://public.api.bsky.app".to_owned(),
            "${QUILL_TEST_LIST_MISSING}".to_owned(),
        ];
        let err = expand_env_list(&values, "embeds.handle_resolvers").unwrap_err();
        assert!(err.to_string().contains("embeds.handle_resolvers[1]"));
    }
}
