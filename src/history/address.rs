//! Helpers for the visible address string reported by the host.

use std::borrow::Cow;

/// An address split into its path, query and fragment components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressParts<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

pub fn split_address(address: &str) -> AddressParts<'_> {
    let (rest, fragment) = match address.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (address, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    AddressParts {
        path,
        query,
        fragment,
    }
}

/// Query and fragment are ignored; an empty path counts as root.
pub fn is_root_address(address: &str, root_path: &str) -> bool {
    let path = split_address(address).path;
    path.is_empty() || path == root_path
}

/// Percent-decoded value of the first `key` parameter in the query string.
pub fn query_param(address: &str, key: &str) -> Option<String> {
    let query = split_address(address).query?;
    query
        .split('&')
        .filter_map(|pair| match pair.split_once('=') {
            Some((name, value)) => Some((name, value)),
            None if !pair.is_empty() => Some((pair, "")),
            None => None,
        })
        .find(|(name, _)| *name == key)
        .map(|(_, value)| decode_component(value))
        .filter(|value| !value.is_empty())
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(Cow::Borrowed(value)) => value.to_string(),
        Ok(Cow::Owned(value)) => value,
        Err(_) => spaced,
    }
}

/// Rewrite rule for addresses that start with a bare identifier.
///
/// `/npub1abc` with rule (`/npub1`, `/users`) becomes `/users/npub1abc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyPrefix {
    pub identifier: String,
    pub mount: String,
}

impl LegacyPrefix {
    pub fn new(identifier: impl Into<String>, mount: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            mount: mount.into(),
        }
    }

    fn rewrite(&self, address: &str) -> Option<String> {
        address
            .starts_with(&self.identifier)
            .then(|| format!("{}{}", self.mount, address))
    }
}

pub fn default_legacy_prefixes() -> Vec<LegacyPrefix> {
    vec![
        LegacyPrefix::new("/npub1", "/users"),
        LegacyPrefix::new("/nprofile1", "/users"),
        LegacyPrefix::new("/note1", "/notes"),
        LegacyPrefix::new("/nevent1", "/notes"),
        LegacyPrefix::new("/naddr1", "/notes"),
    ]
}

/// Returns the rewritten address when one of `rules` applies.
pub fn normalize_legacy(address: &str, rules: &[LegacyPrefix]) -> Option<String> {
    rules.iter().find_map(|rule| rule.rewrite(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_query_and_fragment() {
        let parts = split_address("/notes/abc?r=wss%3A%2F%2Frelay#top");
        assert_eq!(parts.path, "/notes/abc");
        assert_eq!(parts.query, Some("r=wss%3A%2F%2Frelay"));
        assert_eq!(parts.fragment, Some("top"));
    }

    #[test]
    fn root_detection_ignores_query() {
        assert!(is_root_address("/", "/"));
        assert!(is_root_address("/?r=wss://x", "/"));
        assert!(is_root_address("", "/"));
        assert!(!is_root_address("/notes/a", "/"));
    }

    #[test]
    fn relay_param_is_percent_decoded() {
        assert_eq!(
            query_param("/?r=wss%3A%2F%2Fnos.lol%2F", "r").as_deref(),
            Some("wss://nos.lol/")
        );
        assert_eq!(query_param("/?x=1&r=wss://a", "r").as_deref(), Some("wss://a"));
        assert!(query_param("/?r=", "r").is_none());
        assert!(query_param("/notes/a", "r").is_none());
    }

    #[test]
    fn legacy_identifiers_gain_their_mount() {
        let rules = default_legacy_prefixes();
        assert_eq!(
            normalize_legacy("/npub1xyz", &rules).as_deref(),
            Some("/users/npub1xyz")
        );
        assert_eq!(
            normalize_legacy("/nevent1qq", &rules).as_deref(),
            Some("/notes/nevent1qq")
        );
        assert!(normalize_legacy("/users/npub1xyz", &rules).is_none());
        assert!(normalize_legacy("/", &rules).is_none());
    }
}
