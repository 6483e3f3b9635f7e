//! Search filter construction
//!
//! Templates carry two placeholders: `%s` for the login name and `%d` for
//! the user's DN. Values are escaped per RFC 2254 before they are spliced
//! in, so they can never change the structure of the filter.

use ldap3::ldap_escape;
use std::borrow::Cow;

/// Placeholder for the login name
pub const SUBST_SUBJECT_NAME: &str = "%s";

/// Placeholder for the DN found by the user search
pub const SUBST_SUBJECT_DN: &str = "%d";

/// RFC 2254 escaping: `*`, `(`, `)`, `\` and NUL become `\2a`, `\28`,
/// `\29`, `\5c` and `\00`. Everything else is kept as is.
pub fn rfc2254_encode(value: &str) -> Cow<'_, str> {
    ldap_escape(value)
}

/// A filter with `%s`/`%d` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTemplate {
    template: String,
}

impl FilterTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn uses_dn(&self) -> bool {
        self.template.contains(SUBST_SUBJECT_DN)
    }

    /// Expand both placeholders in one pass.
    ///
    /// `name` must already be escaped; `dn` is escaped here. Replacement text
    /// is never rescanned, so a name containing `%d` stays literal.
    pub fn expand(&self, name: &str, dn: Option<&str>) -> String {
        let dn = dn.map(rfc2254_encode);
        let mut out = String::with_capacity(self.template.len() + name.len());
        let mut chars = self.template.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '%' {
                match chars.peek() {
                    Some('s') => {
                        chars.next();
                        out.push_str(name);
                        continue;
                    }
                    Some('d') => {
                        if let Some(dn) = &dn {
                            chars.next();
                            out.push_str(dn);
                            continue;
                        }
                    }
                    _ => {}
                }
            }
            out.push(c);
        }

        normalize_filter(out)
    }
}

/// Bare `attr=value` filters are wrapped in parentheses.
pub fn normalize_filter(filter: String) -> String {
    let trimmed = filter.trim();
    if trimmed.starts_with('(') {
        if trimmed.len() == filter.len() {
            filter
        } else {
            trimmed.to_string()
        }
    } else {
        format!("({})", trimmed)
    }
}
