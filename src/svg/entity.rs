//! General entities declared in a document's internal DTD subset.
//!
//! Illustrator exports declare namespace URIs this way
//! (`<!ENTITY ns_svg "http://www.w3.org/2000/svg">`) and reference them from
//! `xmlns` attributes. Parameter entities and external entities are ignored.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::{EscapeError, resolve_predefined_entity, unescape, unescape_with};
use regex::Regex;
use rustc_hash::FxHashMap;

static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<!ENTITY[\x20\t\r\n]+([A-Za-z_:][A-Za-z0-9._:-]*)[\x20\t\r\n]+(?:"([^"]*)"|'([^']*)')"#,
    )
    .expect("valid entity declaration pattern")
});

/// Entity name -> replacement text.
#[derive(Debug, Default)]
pub(crate) struct Entities {
    values: FxHashMap<String, String>,
}

impl Entities {
    /// Collect the internal entity declarations of a `<!DOCTYPE ...>` body.
    pub(crate) fn from_doctype(doctype: &str) -> Self {
        let mut values = FxHashMap::default();
        for caps in ENTITY_DECL.captures_iter(doctype) {
            let (Some(name), Some(value)) = (caps.get(1), caps.get(2).or_else(|| caps.get(3)))
            else {
                continue;
            };
            let value = unescape(value.as_str())
                .map_or_else(|_| value.as_str().to_owned(), Cow::into_owned);
            // The first declaration of a name is binding
            values.entry(name.as_str().to_owned()).or_insert(value);
        }
        Self { values }
    }

    /// Resolve predefined, character and declared entity references in `raw`.
    pub(crate) fn unescape<'a>(&self, raw: &'a str) -> Result<Cow<'a, str>, EscapeError> {
        unescape_with(raw, |name| {
            resolve_predefined_entity(name).or_else(|| self.values.get(name).map(String::as_str))
        })
    }
}
