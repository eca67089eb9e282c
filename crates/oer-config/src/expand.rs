//! Path expansion for `oer.toml` values.
//!
//! A leading `~` becomes the home directory. `${VAR}` must be set;
//! `${VAR:-default}` falls back when it is not. Values with neither `~` nor
//! `${` are returned as written.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `~` and `${...}` references in the value of `field`.
pub(crate) fn expand_path(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.starts_with('~') && !value.contains("${") {
        return Ok(value.to_owned());
    }

    let home = || std::env::var("HOME").ok();
    let lookup = |var: &str| std::env::var(var).map(Some).map_err(|_| ());

    shellexpand::full_with_context(value, home, lookup)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // SAFETY (all `set_var`/`remove_var` calls): each test owns a distinct
    // variable name, so no other thread reads it concurrently.

    #[test]
    fn test_expands_set_variable() {
        unsafe { std::env::set_var("OER_TEST_SITE_ROOT", "/srv/oer") };

        let result = expand_path("${OER_TEST_SITE_ROOT}/build", "site.build_dir").unwrap();
        assert_eq!(result, "/srv/oer/build");

        unsafe { std::env::remove_var("OER_TEST_SITE_ROOT") };
    }

    #[test]
    fn test_unset_variable_with_default() {
        unsafe { std::env::remove_var("OER_TEST_NO_CONTENT") };

        let result = expand_path("${OER_TEST_NO_CONTENT:-content}", "site.content_dir").unwrap();
        assert_eq!(result, "content");
    }

    #[test]
    fn test_unset_variable_names_field() {
        unsafe { std::env::remove_var("OER_TEST_NO_STORE") };

        let err = expand_path("${OER_TEST_NO_STORE}/db", "store.dir").unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(message.contains("OER_TEST_NO_STORE"));
        assert!(message.contains("store.dir"));
    }

    #[test]
    fn test_tilde_expands_to_home() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };

        let result = expand_path("~/oer/db", "store.dir").unwrap();
        assert_eq!(result, format!("{home}/oer/db"));
    }

    #[test]
    fn test_plain_values_untouched() {
        assert_eq!(expand_path("build", "site.build_dir").unwrap(), "build");
        assert_eq!(expand_path("cost$5", "site.manifest").unwrap(), "cost$5");
    }
}
