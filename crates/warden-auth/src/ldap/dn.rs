//! Distinguished name parsing (RFC 4514 string form)

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnError {
    #[error("Invalid name: {0}")]
    InvalidName(String),
}

/// One `type=value` pair of an RDN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ava {
    pub attr_type: String,
    pub value: String,
}

/// A relative distinguished name; multi-valued RDNs (`a=1+b=2`) hold
/// several pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
    pub avas: Vec<Ava>,
}

impl Rdn {
    /// Value of the first pair whose type matches, ignoring case
    pub fn value_of(&self, attr_type: &str) -> Option<&str> {
        self.avas
            .iter()
            .find(|ava| ava.attr_type.eq_ignore_ascii_case(attr_type))
            .map(|ava| ava.value.as_str())
    }
}

/// Parse a DN into RDNs, leftmost first, with values unescaped.
pub fn parse_dn(dn: &str) -> Result<Vec<Rdn>, DnError> {
    let invalid = || DnError::InvalidName(dn.to_string());

    if dn.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut rdns = Vec::new();
    let mut avas = Vec::new();
    let mut chars = dn.chars().peekable();

    loop {
        // attribute type
        let mut attr_type = String::new();
        let mut has_equals = false;
        for c in chars.by_ref() {
            if c == '=' {
                has_equals = true;
                break;
            }
            if c == ',' || c == ';' || c == '+' {
                return Err(invalid());
            }
            attr_type.push(c);
        }
        let attr_type = attr_type.trim().to_string();
        if !has_equals || attr_type.is_empty() {
            return Err(invalid());
        }

        // attribute value
        let mut value: Vec<u8> = Vec::new();
        let mut quoted = false;
        let mut trailing_space = 0usize;
        while chars.peek() == Some(&' ') && value.is_empty() {
            chars.next();
        }
        if chars.peek() == Some(&'"') {
            chars.next();
            quoted = true;
        }

        let mut terminator = None;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let first = chars.next().ok_or_else(invalid)?;
                    if first.is_ascii_hexdigit() {
                        let second = chars.next().ok_or_else(invalid)?;
                        let hex: String = [first, second].iter().collect();
                        let byte = u8::from_str_radix(&hex, 16).map_err(|_| invalid())?;
                        value.push(byte);
                    } else {
                        let mut buf = [0u8; 4];
                        value.extend_from_slice(first.encode_utf8(&mut buf).as_bytes());
                    }
                    trailing_space = 0;
                }
                '"' if quoted => {
                    quoted = false;
                }
                ',' | ';' | '+' if !quoted => {
                    terminator = Some(c);
                    break;
                }
                _ => {
                    let mut buf = [0u8; 4];
                    value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    if c == ' ' {
                        trailing_space += 1;
                    } else {
                        trailing_space = 0;
                    }
                }
            }
        }
        if quoted {
            return Err(invalid());
        }
        value.truncate(value.len() - trailing_space);

        let value = String::from_utf8(value).map_err(|_| invalid())?;
        avas.push(Ava { attr_type, value });

        match terminator {
            Some('+') => continue,
            Some(_) => {
                rdns.push(Rdn {
                    avas: std::mem::take(&mut avas),
                });
            }
            None => {
                rdns.push(Rdn { avas });
                break;
            }
        }
    }

    Ok(rdns)
}

/// Value of the leftmost RDN component of type `attr_type`
///
/// For nested groups such as `cn=eng,cn=groups,dc=x` this is the most
/// specific name, `eng`.
pub fn first_rdn_value(dn: &str, attr_type: &str) -> Result<Option<String>, DnError> {
    Ok(parse_dn(dn)?
        .iter()
        .find_map(|rdn| rdn.value_of(attr_type).map(str::to_string)))
}

fn normalize(dn: &str) -> String {
    dn.split(',')
        .map(|part| part.trim().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether `dn` lies at or below `base`
pub fn is_descendant_of(dn: &str, base: &str) -> bool {
    let dn = normalize(dn);
    let base = normalize(base);
    if base.is_empty() {
        return true;
    }
    dn == base || dn.ends_with(&format!(",{}", base))
}

/// Fully qualified form of a DN returned by a search under `base`.
/// Names relative to the base get the base appended.
pub fn qualify(found: &str, base: &str) -> String {
    let found = found.trim();
    if found.is_empty() {
        return base.to_string();
    }
    if base.trim().is_empty() || is_descendant_of(found, base) {
        found.to_string()
    } else {
        format!("{},{}", found, base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_dn() {
        let rdns = parse_dn("cn=Engineering, ou=Groups,dc=example,dc=com").unwrap();

        assert_eq!(rdns.len(), 4);
        assert_eq!(rdns[0].value_of("CN"), Some("Engineering"));
        assert_eq!(rdns[1].value_of("ou"), Some("Groups"));
    }

    #[test]
    fn test_parse_escaped_values() {
        let rdns = parse_dn("cn=Doe\\, John,ou=people,dc=x").unwrap();
        assert_eq!(rdns[0].value_of("cn"), Some("Doe, John"));

        let rdns = parse_dn("cn=caf\\C3\\A9,dc=x").unwrap();
        assert_eq!(rdns[0].value_of("cn"), Some("café"));

        let rdns = parse_dn("cn=\"a,b\",dc=x").unwrap();
        assert_eq!(rdns[0].value_of("cn"), Some("a,b"));
    }

    #[test]
    fn test_parse_multi_valued_rdn() {
        let rdns = parse_dn("cn=ops+uid=42,dc=x").unwrap();

        assert_eq!(rdns.len(), 2);
        assert_eq!(rdns[0].avas.len(), 2);
        assert_eq!(rdns[0].value_of("uid"), Some("42"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_dn("not a dn").is_err());
        assert!(parse_dn("=x,dc=y").is_err());
        assert!(parse_dn("cn=\"open").is_err());
        assert!(parse_dn("cn=trailing\\").is_err());
        assert!(parse_dn("").unwrap().is_empty());
    }

    #[test]
    fn test_first_rdn_value() {
        assert_eq!(
            first_rdn_value("cn=admins,ou=groups,dc=x", "cn").unwrap(),
            Some("admins".to_string())
        );
        assert_eq!(first_rdn_value("uid=bob,dc=x", "cn").unwrap(), None);
    }

    #[test]
    fn test_first_rdn_value_prefers_leftmost() {
        assert_eq!(
            first_rdn_value("cn=eng,cn=groups,dc=example,dc=com", "cn").unwrap(),
            Some("eng".to_string())
        );
        assert_eq!(
            first_rdn_value("uid=sam,CN=Staff,cn=groups,dc=x", "cn").unwrap(),
            Some("Staff".to_string())
        );
    }

    #[test]
    fn test_qualify() {
        let base = "ou=people,dc=example,dc=com";

        assert_eq!(qualify("uid=a", base), "uid=a,ou=people,dc=example,dc=com");
        assert_eq!(
            qualify("uid=a,OU=People, dc=example,dc=com", base),
            "uid=a,OU=People, dc=example,dc=com"
        );
        assert_eq!(qualify("", base), base);
    }
}
