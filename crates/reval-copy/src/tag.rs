//! Struct-tag directive parsing.
//!
//! A field tag is a space-separated sequence of `name:"value"` pairs. The
//! engine reads the value under the configured tag name and decodes the
//! comma-separated directive: the first element overrides the matching key
//! (`-` ignores the field, empty inherits the field name), the rest are
//! boolean options. Unknown options are accepted without error.

/// Decoded copy directive of one struct field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct TagInfo {
    /// Key override; `None` inherits the field name.
    pub key: Option<String>,
    pub ignored: bool,
    pub required: bool,
    pub nil_on_zero: bool,
}

/// Looks up the value stored under `tag_name` in a raw tag string.
pub(crate) fn lookup_tag(raw: &str, tag_name: &str) -> Option<String> {
    let mut rest = raw.trim_start();
    while !rest.is_empty() {
        let colon = rest.find(':')?;
        let name = &rest[..colon];
        let after = &rest[colon + 1..];
        if !after.starts_with('"') {
            return None;
        }
        let close = after[1..].find('"')?;
        let value = &after[1..1 + close];
        if name == tag_name {
            return Some(value.to_string());
        }
        rest = after[close + 2..].trim_start();
    }
    None
}

/// Parses the directive value into a `TagInfo`.
pub(crate) fn parse_directive(value: &str) -> TagInfo {
    let mut info = TagInfo::default();
    let mut parts = value.split(',');
    match parts.next() {
        Some("-") => {
            info.ignored = true;
            return info;
        }
        Some("") | None => {}
        Some(key) => info.key = Some(key.to_string()),
    }
    for opt in parts {
        match opt {
            "required" => info.required = true,
            "nilonzero" => info.nil_on_zero = true,
            // Unknown options are reserved for future use.
            _ => {}
        }
    }
    info
}

/// Convenience over `lookup_tag` + `parse_directive` for an optional raw tag.
pub(crate) fn parse_field_tag(raw: Option<&str>, tag_name: &str) -> TagInfo {
    raw.and_then(|t| lookup_tag(t, tag_name))
        .map(|v| parse_directive(&v))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup_tag(r#"copy:"key""#, "copy"), Some("key".to_string()));
        assert_eq!(
            lookup_tag(r#"json:"j" copy:"k,required""#, "copy"),
            Some("k,required".to_string())
        );
        assert_eq!(lookup_tag(r#"json:"j""#, "copy"), None);
        assert_eq!(lookup_tag("", "copy"), None);
    }

    #[test]
    fn test_directive_key_forms() {
        assert_eq!(parse_directive("name").key.as_deref(), Some("name"));
        assert!(parse_directive("-").ignored);
        assert_eq!(parse_directive("").key, None);
        assert_eq!(parse_directive(",required").key, None);
    }

    #[test]
    fn test_directive_options() {
        let info = parse_directive("k,required,nilonzero");
        assert_eq!(info.key.as_deref(), Some("k"));
        assert!(info.required);
        assert!(info.nil_on_zero);

        // Unknown options are silently accepted.
        let info = parse_directive("k,frobnicate");
        assert_eq!(info.key.as_deref(), Some("k"));
        assert!(!info.required);
    }

    #[test]
    fn test_ignored_short_circuits_options() {
        let info = parse_directive("-");
        assert!(info.ignored);
        assert!(!info.required);
    }
}
