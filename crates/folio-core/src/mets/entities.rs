use std::borrow::Cow;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_predefined_entity, unescape_with, EscapeError};
use regex::{Captures, Regex};

/// `<!ENTITY name "value">` or with single quotes. Parameter and external
/// entities do not match.
static INTERNAL_ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<!ENTITY\s+([^\s%"'>]+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#)
        .expect("valid internal entity regex")
});

static ENTITY_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&([^&;\s<]+);").expect("valid entity reference regex"));

/// General entities a document may reference: the five predefined ones plus
/// whatever its internal DTD subset declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTable {
    declared: HashMap<String, String>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect internal entity declarations from a `DOCTYPE` body.
    /// The first declaration of a name is binding.
    pub fn from_doctype(doctype: &str) -> Self {
        let mut declared = HashMap::new();
        for caps in INTERNAL_ENTITY.captures_iter(doctype) {
            let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            declared
                .entry(caps[1].to_string())
                .or_insert_with(|| value.to_string());
        }
        Self { declared }
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        resolve_predefined_entity(name).or_else(|| self.declared.get(name).map(String::as_str))
    }

    /// Unescape `raw`, failing on any reference that is not known.
    pub fn try_unescape<'a>(&self, raw: &'a str) -> Result<Cow<'a, str>, EscapeError> {
        unescape_with(raw, |name| self.resolve(name))
    }

    /// Unescape `raw`. Unknown references stay in the output verbatim, and
    /// text that still cannot be unescaped is returned unchanged.
    pub fn unescape_lenient(&self, raw: &str) -> String {
        let guarded = ENTITY_REFERENCE.replace_all(raw, |caps: &Captures<'_>| {
            let name = &caps[1];
            if name.starts_with('#') || self.resolve(name).is_some() {
                caps[0].to_string()
            } else {
                format!("&amp;{name};")
            }
        });

        match self.try_unescape(&guarded) {
            Ok(text) => text.into_owned(),
            Err(_) => raw.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCTYPE: &str = r#"mets [
  <!ENTITY ed "Editor's note">
  <!ENTITY pub 'Hogarth "Press"'>
  <!ENTITY % param "ignored">
  <!ENTITY ext SYSTEM "ext.xml">
  <!ENTITY ed "redeclared">
]"#;

    #[test]
    fn test_internal_declarations_are_collected() {
        let table = EntityTable::from_doctype(DOCTYPE);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("ed"), Some("Editor's note"));
        assert_eq!(table.resolve("pub"), Some("Hogarth \"Press\""));
        assert_eq!(table.resolve("param"), None);
        assert_eq!(table.resolve("ext"), None);
        assert_eq!(table.resolve("amp"), Some("&"));
    }

    #[test]
    fn test_strict_unescape_rejects_unknown_entities() {
        let table = EntityTable::from_doctype(DOCTYPE);
        assert_eq!(table.try_unescape("&ed; &amp; &#65;").unwrap(), "Editor's note & A");
        assert!(table.try_unescape("a&nbsp;b").is_err());
    }

    #[test]
    fn test_lenient_unescape_keeps_unknown_entities() {
        let table = EntityTable::from_doctype(DOCTYPE);
        assert_eq!(table.unescape_lenient("&ed;&nbsp;&lt;p&gt;"), "Editor's note&nbsp;<p>");
        assert_eq!(EntityTable::new().unescape_lenient("&ed;"), "&ed;");
        assert_eq!(table.unescape_lenient("plain"), "plain");
    }
}
