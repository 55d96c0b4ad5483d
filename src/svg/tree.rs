//! Arena-backed XML element tree.
//!
//! Elements live in a flat `Vec` and refer to each other through [`NodeId`]
//! handles. Children are stored parent -> child only; the reverse direction
//! is a separate [`ParentIndex`] built on demand, so the tree never holds
//! ownership cycles.
//!
//! Text follows the element-tree model: `text` is the character data before
//! the first child, `tail` is the character data after the element's end tag
//! and before its next sibling. Comments, processing instructions and the
//! doctype are dropped on load; entities declared in the doctype's internal
//! subset are resolved first.

use std::io::BufRead;
use std::ops::{Index, IndexMut};

use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};

use super::entity::Entities;
use super::{SVG_NS, SvgError, XML_NS};

// ============================================================================
// Names
// ============================================================================

/// Namespace-resolved name. `ns == None` means "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub ns: Option<String>,
    pub local: String,
}

impl QName {
    pub fn new(ns: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            ns: ns.map(str::to_owned),
            local: local.into(),
        }
    }

    /// Name without a namespace (the way unprefixed attributes parse).
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self::new(None, local)
    }

    pub fn svg(local: impl Into<String>) -> Self {
        Self::new(Some(SVG_NS), local)
    }

    #[inline]
    pub fn is_qualified(&self) -> bool {
        self.ns.is_some()
    }

    /// Matches `local` when unqualified or in the SVG namespace.
    #[inline]
    fn is_svg_local(&self, local: &str) -> bool {
        self.local == local && self.ns.as_deref().is_none_or(|ns| ns == SVG_NS)
    }
}

// ============================================================================
// Elements
// ============================================================================

/// Stable handle to an element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: QName,
    /// Attributes in source order.
    pub attrs: Vec<(QName, String)>,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<NodeId>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attrs: Vec::new(),
            text: None,
            tail: None,
            children: Vec::new(),
        }
    }

    /// Look up an attribute that is unqualified or SVG-qualified.
    ///
    /// Both spellings are accepted so lookups keep working after the
    /// serializer has qualified the tree. When an element carries both, the
    /// SVG-qualified one is the value.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attr_ns(SVG_NS, local).or_else(|| {
            self.attrs
                .iter()
                .find(|(name, _)| name.local == local && !name.is_qualified())
                .map(|(_, value)| value.as_str())
        })
    }

    /// Look up an attribute by exact namespace.
    pub fn attr_ns(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name.local == local && name.ns.as_deref() == Some(ns))
            .map(|(_, value)| value.as_str())
    }

    #[inline]
    pub fn has_attr(&self, local: &str) -> bool {
        self.attr(local).is_some()
    }

    /// Set an attribute, replacing an existing one with the same name in place.
    pub fn set_attr(&mut self, name: QName, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Remove both spellings of an attribute, returning the value [`attr`](Self::attr) saw.
    pub fn remove_attr(&mut self, local: &str) -> Option<String> {
        let value = self.attr(local)?.to_owned();
        self.attrs.retain(|(name, _)| !name.is_svg_local(local));
        Some(value)
    }

    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
    /// Prefix declarations seen in the source, `("", uri)` for defaults.
    namespaces: Vec<(String, String)>,
}

impl Document {
    /// Parse a complete document from bytes.
    pub fn parse(source: &[u8]) -> Result<Self, SvgError> {
        Self::from_reader(source)
    }

    /// Parse a complete document from a buffered reader.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self, SvgError> {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::with_capacity(1024);
        let mut builder = Builder::default();

        loop {
            let position = reader.buffer_position() as u64;
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| SvgError::parse(position, e))?;
            let decoder = reader.decoder();

            match event {
                Event::Start(start) => builder.open(&start, decoder, position)?,
                Event::Empty(start) => {
                    builder.open(&start, decoder, position)?;
                    builder.close(position)?;
                }
                Event::End(_) => builder.close(position)?,
                Event::Text(text) => {
                    let text = text.decode().map_err(|e| SvgError::parse(position, e))?;
                    builder.text(&text, position)?;
                }
                Event::CData(data) => {
                    let text = decoder
                        .decode(&data)
                        .map_err(|e| SvgError::parse(position, e))?;
                    builder.text(&text, position)?;
                }
                Event::GeneralRef(reference) => {
                    let name = reference
                        .decode()
                        .map_err(|e| SvgError::parse(position, e))?;
                    let entity = format!("&{name};");
                    let resolved = builder
                        .entities
                        .unescape(&entity)
                        .map_err(|e| SvgError::parse(position, e))?
                        .into_owned();
                    builder.text(&resolved, position)?;
                }
                Event::DocType(doctype) => {
                    let doctype = doctype.decode().map_err(|e| SvgError::parse(position, e))?;
                    builder.entities = Entities::from_doctype(&doctype);
                }
                Event::Eof => break,
                // Declaration, comments, processing instructions
                _ => {}
            }
            buf.clear();
        }

        builder.finish(reader.buffer_position() as u64)
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Namespace prefixes declared anywhere in the source document.
    pub fn declared_namespaces(&self) -> &[(String, String)] {
        &self.namespaces
    }

    /// Add a detached element to the arena.
    pub fn alloc(&mut self, element: Element) -> NodeId {
        self.nodes.push(element);
        NodeId(self.nodes.len() - 1)
    }

    /// Elements reachable from the root, in document (pre-)order.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self[node].children.iter().rev().copied());
        }
        order
    }

    /// Build a child -> parent index over the reachable tree.
    pub fn parent_index(&self) -> ParentIndex {
        let mut index = ParentIndex::with_capacity(self.nodes.len());
        for node in self.descendants() {
            for &child in &self[node].children {
                index.set(child, node);
            }
        }
        index
    }
}

impl Index<NodeId> for Document {
    type Output = Element;

    #[inline]
    fn index(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for Document {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id.0]
    }
}

// ============================================================================
// Parent index
// ============================================================================

/// Child -> parent lookup keyed by node handle.
#[derive(Debug, Clone, Default)]
pub struct ParentIndex {
    parents: Vec<Option<NodeId>>,
}

impl ParentIndex {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            parents: vec![None; capacity],
        }
    }

    #[inline]
    pub fn parent(&self, child: NodeId) -> Option<NodeId> {
        self.parents.get(child.0).copied().flatten()
    }

    /// Record `parent` as the parent of `child`, growing for new nodes.
    pub fn set(&mut self, child: NodeId, parent: NodeId) {
        if child.0 >= self.parents.len() {
            self.parents.resize(child.0 + 1, None);
        }
        self.parents[child.0] = Some(parent);
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Default)]
struct Builder {
    nodes: Vec<Element>,
    open: Vec<NodeId>,
    root: Option<NodeId>,
    /// One frame of `(prefix, uri)` declarations per open element.
    scopes: Vec<Vec<(String, String)>>,
    declared: Vec<(String, String)>,
    entities: Entities,
}

impl Builder {
    fn open(
        &mut self,
        start: &BytesStart<'_>,
        decoder: Decoder,
        position: u64,
    ) -> Result<(), SvgError> {
        if self.open.is_empty() && self.root.is_some() {
            return Err(SvgError::parse(position, "junk after document element"));
        }

        let raw_name = decoder
            .decode(start.name().as_ref())
            .map_err(|e| SvgError::parse(position, e))?
            .into_owned();

        let mut frame = Vec::new();
        let mut raw_attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| SvgError::parse(position, e))?;
            let key = decoder
                .decode(attr.key.as_ref())
                .map_err(|e| SvgError::parse(position, e))?
                .into_owned();
            let raw = decoder
                .decode(&attr.value)
                .map_err(|e| SvgError::parse(position, e))?;
            let value = self
                .entities
                .unescape(&raw)
                .map_err(|e| SvgError::parse(position, e))?
                .into_owned();

            if key == "xmlns" {
                frame.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                frame.push((prefix.to_owned(), value));
            } else {
                raw_attrs.push((key, value));
            }
        }

        for decl in &frame {
            if !self.declared.contains(decl) {
                self.declared.push(decl.clone());
            }
        }
        self.scopes.push(frame);

        let name = self.resolve(&raw_name, true, position)?;
        let attrs = raw_attrs
            .into_iter()
            .map(|(key, value)| Ok((self.resolve(&key, false, position)?, value)))
            .collect::<Result<Vec<_>, SvgError>>()?;
        // Two prefixes bound to one namespace still name the same attribute
        for (i, (name, _)) in attrs.iter().enumerate() {
            if attrs[..i].iter().any(|(seen, _)| seen == name) {
                return Err(SvgError::parse(
                    position,
                    format!("duplicated attribute `{}`", name.local),
                ));
            }
        }

        let mut element = Element::new(name);
        element.attrs = attrs;
        self.nodes.push(element);
        let node = NodeId(self.nodes.len() - 1);

        match self.open.last() {
            Some(&parent) => self.nodes[parent.0].children.push(node),
            None => self.root = Some(node),
        }
        self.open.push(node);
        Ok(())
    }

    fn close(&mut self, position: u64) -> Result<(), SvgError> {
        self.scopes.pop();
        self.open
            .pop()
            .map(|_| ())
            .ok_or_else(|| SvgError::parse(position, "unexpected end tag"))
    }

    fn text(&mut self, text: &str, position: u64) -> Result<(), SvgError> {
        let Some(&current) = self.open.last() else {
            if text.trim_start_matches('\u{feff}').trim().is_empty() {
                return Ok(());
            }
            return Err(SvgError::parse(position, "text outside the root element"));
        };

        let slot = match self.nodes[current.0].children.last().copied() {
            Some(child) => &mut self.nodes[child.0].tail,
            None => &mut self.nodes[current.0].text,
        };
        slot.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }

    fn finish(self, position: u64) -> Result<Document, SvgError> {
        if let Some(&unclosed) = self.open.last() {
            let name = &self.nodes[unclosed.0].name.local;
            return Err(SvgError::parse(position, format!("unclosed element `{name}`")));
        }
        let root = self
            .root
            .ok_or_else(|| SvgError::parse(position, "no root element"))?;

        Ok(Document {
            nodes: self.nodes,
            root,
            namespaces: self.declared,
        })
    }

    fn resolve(&self, raw: &str, is_element: bool, position: u64) -> Result<QName, SvgError> {
        match raw.split_once(':') {
            Some((prefix, local)) => {
                let uri = self
                    .lookup(prefix)
                    .ok_or_else(|| SvgError::parse(position, format!("unbound prefix `{prefix}`")))?;
                Ok(QName::new(Some(uri), local))
            }
            // Unprefixed elements take the default namespace, attributes never do
            None if is_element => Ok(QName::new(self.lookup(""), raw)),
            None => Ok(QName::unqualified(raw)),
        }
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(declared, _)| declared == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}
