//! Namespace-qualified SVG output.
//!
//! Each [`Serializer`] owns its namespace -> prefix table. Nothing is
//! registered process-wide, so two serializers with different prefix
//! preferences can coexist.

use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use super::{Document, NodeId, QName, SVG_NS, SvgError, XLINK_NS, XML_NS};

#[derive(Debug, Clone)]
pub struct Serializer {
    /// `(uri, prefix)` preferences, checked before the document's own.
    prefixes: Vec<(String, String)>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    /// SVG as the default namespace, XLink bound to `xlink`.
    pub fn new() -> Self {
        Self {
            prefixes: vec![(XLINK_NS.to_owned(), "xlink".to_owned())],
        }
    }

    /// Prefer `prefix` for `uri`. Later calls for the same uri win.
    pub fn with_prefix(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        self.prefixes.retain(|(existing, _)| *existing != uri);
        self.prefixes.insert(0, (uri, prefix.into()));
        self
    }

    /// `(uri, prefix)` preferences in lookup order.
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes
            .iter()
            .map(|(uri, prefix)| (uri.as_str(), prefix.as_str()))
    }

    /// Serialize `doc` without an XML declaration.
    ///
    /// Unqualified attributes are first rewritten into the SVG namespace (in
    /// the tree itself), then written bare because SVG is the default
    /// namespace.
    pub fn serialize(&self, doc: &mut Document) -> Result<String, SvgError> {
        qualify_attributes(doc, SVG_NS);
        let names = self.prefix_table(doc);

        let mut writer = Writer::new(Vec::with_capacity(4096));
        write_element(&mut writer, doc, doc.root(), &names, true)?;

        String::from_utf8(writer.into_inner()).map_err(|e| SvgError::Write(e.to_string()))
    }

    /// Assign a prefix to every non-SVG namespace the document uses.
    fn prefix_table(&self, doc: &Document) -> PrefixTable {
        let mut table = PrefixTable {
            bindings: self.prefixes.clone(),
        };

        let mut generated = 0;
        for node in doc.descendants() {
            let element = &doc[node];
            let names = std::iter::once(&element.name).chain(element.attrs.iter().map(|(n, _)| n));
            for uri in names.filter_map(|name| name.ns.as_deref()) {
                if uri == SVG_NS || uri == XML_NS || table.prefix(uri).is_some() {
                    continue;
                }
                let declared = doc
                    .declared_namespaces()
                    .iter()
                    .find(|(prefix, declared)| {
                        declared == uri && !prefix.is_empty() && !table.is_taken(prefix)
                    })
                    .map(|(prefix, _)| prefix.clone());
                let prefix = declared.unwrap_or_else(|| loop {
                    let candidate = format!("ns{generated}");
                    generated += 1;
                    if !table.is_taken(&candidate) {
                        break candidate;
                    }
                });
                table.bindings.push((uri.to_owned(), prefix));
            }
        }
        table
    }
}

/// Rewrite every unqualified attribute into `namespace`.
///
/// An unqualified attribute that is also spelled out in `namespace` on the
/// same element (`fill` next to `svg:fill`) is dropped; the qualified value
/// wins.
pub fn qualify_attributes(doc: &mut Document, namespace: &str) {
    for node in doc.descendants() {
        let attrs = &mut doc[node].attrs;
        let explicit: Vec<String> = attrs
            .iter()
            .filter(|(name, _)| name.ns.as_deref() == Some(namespace))
            .map(|(name, _)| name.local.clone())
            .collect();
        attrs.retain(|(name, _)| name.is_qualified() || !explicit.contains(&name.local));

        for (name, _) in attrs.iter_mut() {
            if !name.is_qualified() {
                name.ns = Some(namespace.to_owned());
            }
        }
    }
}

struct PrefixTable {
    bindings: Vec<(String, String)>,
}

impl PrefixTable {
    fn prefix(&self, uri: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == uri)
            .map(|(_, prefix)| prefix.as_str())
    }

    fn is_taken(&self, prefix: &str) -> bool {
        prefix == "xml" || prefix == "xmlns" || self.bindings.iter().any(|(_, p)| p == prefix)
    }

    /// `xmlns` declarations for the root element.
    fn declarations(&self) -> Vec<(String, &str)> {
        let mut decls = vec![("xmlns".to_owned(), SVG_NS)];
        decls.extend(
            self.bindings
                .iter()
                .map(|(uri, prefix)| (format!("xmlns:{prefix}"), uri.as_str())),
        );
        decls
    }

    fn name(&self, name: &QName) -> String {
        match name.ns.as_deref() {
            None | Some(SVG_NS) => name.local.clone(),
            Some(XML_NS) => format!("xml:{}", name.local),
            Some(uri) => match self.prefix(uri) {
                Some(prefix) => format!("{prefix}:{}", name.local),
                None => name.local.clone(),
            },
        }
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    doc: &Document,
    node: NodeId,
    names: &PrefixTable,
    is_root: bool,
) -> Result<(), SvgError> {
    let element = &doc[node];
    let tag = names.name(&element.name);

    let mut start = BytesStart::new(tag.as_str());
    if is_root {
        for (key, uri) in names.declarations() {
            start.push_attribute((key.as_str(), uri));
        }
    }
    for (name, value) in &element.attrs {
        let key = names.name(name);
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let text = element.text.as_deref().filter(|t| !t.is_empty());
    if text.is_none() && element.children.is_empty() {
        emit(writer, Event::Empty(start))?;
    } else {
        emit(writer, Event::Start(start))?;
        if let Some(text) = text {
            emit(writer, Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        }
        for &child in &element.children {
            write_element(writer, doc, child, names, false)?;
        }
        emit(writer, Event::End(BytesEnd::new(tag.as_str())))?;
    }

    if !is_root && let Some(tail) = element.tail.as_deref().filter(|t| !t.is_empty()) {
        emit(writer, Event::Text(BytesText::from_escaped(partial_escape(tail))))?;
    }
    Ok(())
}

#[inline]
fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), SvgError> {
    writer
        .write_event(event)
        .map_err(|e| SvgError::Write(e.to_string()))
}
