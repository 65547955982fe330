//! Logical-name strategies.
//!
//! A strategy maps a declared Rust field name to the wire name used by
//! every contract a resolver produces. An explicit `#[json(rename)]`
//! always wins over the strategy.

/// Maps declared member names to wire names.
pub trait NamingStrategy: Send + Sync {
    fn apply(&self, declared: &str) -> String;
}

/// Splits an identifier into lowercase words on `_`, `-` and case
/// boundaries, so strategies behave the same for `user_name` and
/// `userName` inputs.
fn words(declared: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in declared.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.extend(c.to_lowercase());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wire names equal declared names.
#[derive(Debug, Default)]
pub struct IdentityNaming;

impl NamingStrategy for IdentityNaming {
    fn apply(&self, declared: &str) -> String {
        declared.to_owned()
    }
}

/// `user_name` becomes `userName`.
#[derive(Debug, Default)]
pub struct CamelCaseNaming;

impl NamingStrategy for CamelCaseNaming {
    fn apply(&self, declared: &str) -> String {
        let mut out = String::new();
        for (i, word) in words(declared).iter().enumerate() {
            if i == 0 {
                out.push_str(word);
            } else {
                out.push_str(&capitalize(word));
            }
        }
        out
    }
}

/// `userName` becomes `user_name`.
#[derive(Debug, Default)]
pub struct SnakeCaseNaming;

impl NamingStrategy for SnakeCaseNaming {
    fn apply(&self, declared: &str) -> String {
        words(declared).join("_")
    }
}

/// `userName` becomes `user-name`.
#[derive(Debug, Default)]
pub struct KebabCaseNaming;

impl NamingStrategy for KebabCaseNaming {
    fn apply(&self, declared: &str) -> String {
        words(declared).join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_from_snake() {
        assert_eq!(CamelCaseNaming.apply("first_name"), "firstName");
        assert_eq!(CamelCaseNaming.apply("id"), "id");
    }

    #[test]
    fn snake_from_camel() {
        assert_eq!(SnakeCaseNaming.apply("firstName"), "first_name");
    }

    #[test]
    fn kebab_joins_with_dashes() {
        assert_eq!(KebabCaseNaming.apply("first_name"), "first-name");
    }

    #[test]
    fn identity_is_untouched() {
        assert_eq!(IdentityNaming.apply("Weird_Name"), "Weird_Name");
    }
}
