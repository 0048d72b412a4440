//! Resource naming: model names to URL collection names
//!
//! `GenericRelation` is exposed as `generic-relations`, `Company` as
//! `companies`.

/// Derives plural, kebab-case resource names from model names
pub struct Pluralizer;

impl Pluralizer {
    /// Collection name for a model: kebab-case, last word pluralized
    ///
    /// ```
    /// use eureka::core::pluralize::Pluralizer;
    ///
    /// assert_eq!(Pluralizer::resource_name("Generic"), "generics");
    /// assert_eq!(Pluralizer::resource_name("GenericRelation"), "generic-relations");
    /// assert_eq!(Pluralizer::resource_name("Company"), "companies");
    /// ```
    pub fn resource_name(model: &str) -> String {
        Self::pluralize(&Self::to_kebab_case(model))
    }

    /// `GenericRelation` → `generic-relation`, `HTTPServer` → `http-server`
    pub fn to_kebab_case(name: &str) -> String {
        let chars: Vec<char> = name.chars().collect();
        let mut out = String::with_capacity(name.len() + 4);

        for (i, &c) in chars.iter().enumerate() {
            if c == '_' || c == ' ' {
                if !out.ends_with('-') && !out.is_empty() {
                    out.push('-');
                }
                continue;
            }
            if c.is_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                let boundary = prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_lower);
                if boundary && !out.ends_with('-') {
                    out.push('-');
                }
            }
            out.extend(c.to_lowercase());
        }

        out
    }

    /// Pluralize an English noun (only the trailing word is affected)
    pub fn pluralize(singular: &str) -> String {
        let Some(last) = singular.chars().last() else {
            return String::new();
        };
        let stem = &singular[..singular.len() - last.len_utf8()];
        let before_last = stem.chars().last();
        let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');

        match last {
            'y' if before_last.is_some_and(|c| c.is_alphabetic() && !is_vowel(c)) => {
                format!("{stem}ies")
            }
            's' | 'x' | 'z' => format!("{singular}es"),
            'h' if stem.ends_with('s') || stem.ends_with('c') => format!("{singular}es"),
            'f' if !stem.is_empty() => format!("{stem}ves"),
            'e' if stem.ends_with('f') && stem.len() > 1 => {
                format!("{}ves", &stem[..stem.len() - 1])
            }
            _ => format!("{singular}s"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kebab_case() {
        assert_eq!(Pluralizer::to_kebab_case("Generic"), "generic");
        assert_eq!(Pluralizer::to_kebab_case("GenericRelation"), "generic-relation");
        assert_eq!(Pluralizer::to_kebab_case("HTTPServer"), "http-server");
        assert_eq!(Pluralizer::to_kebab_case("user_profile"), "user-profile");
        assert_eq!(Pluralizer::to_kebab_case("already-kebab"), "already-kebab");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(Pluralizer::pluralize("user"), "users");
        assert_eq!(Pluralizer::pluralize("company"), "companies");
        assert_eq!(Pluralizer::pluralize("day"), "days");
        assert_eq!(Pluralizer::pluralize("address"), "addresses");
        assert_eq!(Pluralizer::pluralize("box"), "boxes");
        assert_eq!(Pluralizer::pluralize("church"), "churches");
        assert_eq!(Pluralizer::pluralize("wolf"), "wolves");
        assert_eq!(Pluralizer::pluralize("knife"), "knives");
        assert_eq!(Pluralizer::pluralize(""), "");
    }

    #[test]
    fn test_resource_name() {
        assert_eq!(Pluralizer::resource_name("User"), "users");
        assert_eq!(Pluralizer::resource_name("GenericRelation"), "generic-relations");
        assert_eq!(Pluralizer::resource_name("BlogCategory"), "blog-categories");
    }
}
