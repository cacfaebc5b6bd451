/// Canonical form of a project or extra name.
///
/// Lower-cases the name and collapses every run of `.`, `_` and `-` into a
/// single `-`.
///
/// See [PEP 503](https://peps.python.org/pep-0503/#normalized-names).
///
/// # Examples
///
/// ```
/// use pyproject_metadata::canonicalize_name;
///
/// assert_eq!(canonicalize_name("Full_Metadata"), "full-metadata");
/// assert_eq!(canonicalize_name("do.t"), "do-t");
/// assert_eq!(canonicalize_name("a-_.b"), "a-b");
/// ```
pub fn canonicalize_name(name: &str) -> String {
    let mut canonical = String::with_capacity(name.len());
    let mut in_separator_run = false;
    for c in name.chars() {
        if matches!(c, '.' | '_' | '-') {
            if !in_separator_run {
                canonical.push('-');
            }
            in_separator_run = true;
        } else {
            canonical.extend(c.to_lowercase());
            in_separator_run = false;
        }
    }
    canonical
}

/// Whether `name` is a valid project name.
///
/// A valid name consists only of ASCII letters, digits, `.`, `_` and `-`,
/// and starts and ends with a letter or digit.
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonicalize_examples() {
        assert_eq!(canonicalize_name("under_score"), "under-score");
        assert_eq!(canonicalize_name("da-sh"), "da-sh");
        assert_eq!(canonicalize_name("Django.REST__framework"), "django-rest-framework");
        assert_eq!(canonicalize_name(""), "");
    }

    #[test]
    fn valid_names() {
        for name in ["a", "test", "full_metadata", "A.b-C_9", "9lives"] {
            assert!(is_valid_name(name), "{name}");
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", ".test", "test.", "-a", "a_", "a b", "naïve", "a/b"] {
            assert!(!is_valid_name(name), "{name}");
        }
    }

    proptest! {
        #[test]
        fn canonicalize_is_idempotent(name in "[A-Za-z0-9._-]{0,24}") {
            let once = canonicalize_name(&name);
            prop_assert_eq!(canonicalize_name(&once), once);
        }

        #[test]
        fn canonical_form_has_no_separator_runs(name in "[A-Za-z0-9._-]{0,24}") {
            let canonical = canonicalize_name(&name);
            prop_assert!(!canonical.contains("--"));
            prop_assert!(!canonical.contains('_'));
            prop_assert!(!canonical.contains('.'));
            prop_assert!(!canonical.chars().any(|c| c.is_ascii_uppercase()));
        }

        #[test]
        fn canonicalize_ignores_case_and_separator_spelling(
            name in "[a-z0-9]{1,6}([._-]{1,3}[a-z0-9]{1,6}){0,3}"
        ) {
            let shouted = name.to_ascii_uppercase().replace(['.', '_'], "-");
            prop_assert_eq!(canonicalize_name(&shouted), canonicalize_name(&name));
        }
    }
}
