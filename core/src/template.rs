//! `{name}` placeholder substitution for URL templates.
//!
//! Substitution is literal string replacement in field declaration order.
//! Values are inserted as-is, without percent-encoding, so path fields are
//! expected to hold URL-safe identifiers. Placeholders with no matching field
//! stay in the output untouched.

use serde::Serialize;

use crate::error::ParamError;
use crate::params;

/// Substitute every `{field}` in `template` with the first encoded value of
/// that field of `path`.
pub fn resolve<P: Serialize + ?Sized>(template: &str, path: &P) -> Result<String, ParamError> {
    let params = params::encode(path)?;
    Ok(params
        .iter()
        .fold(template.to_string(), |url, (key, values)| match values.first() {
            Some(value) => url.replace(&format!("{{{key}}}"), value),
            None => url,
        }))
}

/// Names of the `{name}` placeholders in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct UserPath {
        id: u64,
    }

    #[derive(Serialize)]
    struct Pair {
        id: u64,
        id2: u64,
    }

    #[test]
    fn resolves_single_placeholder() {
        assert_eq!(resolve("/user/{id}", &UserPath { id: 1 }).unwrap(), "/user/1");
    }

    #[test]
    fn leaves_unknown_placeholder_intact() {
        assert_eq!(
            resolve("/user/{id}/{id2}", &UserPath { id: 1 }).unwrap(),
            "/user/1/{id2}"
        );
    }

    #[test]
    fn resolves_every_occurrence() {
        assert_eq!(
            resolve("/a/{id}/b/{id2}/c/{id}", &Pair { id: 1, id2: 2 }).unwrap(),
            "/a/1/b/2/c/1"
        );
    }

    #[test]
    fn uses_first_value_of_list_fields() {
        #[derive(Serialize)]
        struct Many {
            id: Vec<u8>,
        }
        assert_eq!(
            resolve("/user/{id}", &Many { id: vec![4, 5] }).unwrap(),
            "/user/4"
        );
    }

    #[test]
    fn does_not_escape_values() {
        #[derive(Serialize)]
        struct Name {
            name: String,
        }
        let path = Name {
            name: "a b/c".to_string(),
        };
        assert_eq!(resolve("/user/{name}", &path).unwrap(), "/user/a b/c");
    }

    #[test]
    fn lists_placeholders_in_order() {
        assert_eq!(placeholders("/user/{id}/post/{post}"), vec!["id", "post"]);
        assert!(placeholders("/user").is_empty());
        assert_eq!(placeholders("/broken/{id"), Vec::<&str>::new());
    }
}
