//! Streaming element-id scanner.
//!
//! Reads the document event by event without building a tree. Only a stack
//! of the currently open elements' candidate ids is kept; an id is yielded
//! when its element closes, so children come before their parents.

use std::io::BufRead;

use quick_xml::Reader;
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};

use super::entity::Entities;
use super::{SvgError, Vocabulary};

/// Iterator over element ids, see [`scan_ids`].
pub struct IdScanner<'v, R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    vocabulary: &'v Vocabulary,
    entities: Entities,
    /// Candidate id per open element (`None` when it won't be yielded).
    open: Vec<Option<String>>,
    seen_root: bool,
    done: bool,
}

/// Scan `source` for ids of elements whose local name is in `vocabulary`.
///
/// Ids are not deduplicated; uniqueness is the document author's contract.
/// A malformed document yields a single `Err` and then ends.
pub fn scan_ids<R: BufRead>(source: R, vocabulary: &Vocabulary) -> IdScanner<'_, R> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(false);
    IdScanner {
        reader,
        buf: Vec::with_capacity(1024),
        vocabulary,
        entities: Entities::default(),
        open: Vec::new(),
        seen_root: false,
        done: false,
    }
}

impl<R: BufRead> IdScanner<'_, R> {
    fn next_id(&mut self) -> Result<Option<String>, SvgError> {
        loop {
            self.buf.clear();
            let position = self.reader.buffer_position() as u64;
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| SvgError::parse(position, e))?;
            let decoder = self.reader.decoder();

            match event {
                Event::Start(start) => {
                    check_single_root(&self.open, &mut self.seen_root, position)?;
                    let id = candidate(&start, self.vocabulary, &self.entities, decoder, position)?;
                    self.open.push(id);
                }
                Event::Empty(start) => {
                    check_single_root(&self.open, &mut self.seen_root, position)?;
                    if let Some(id) =
                        candidate(&start, self.vocabulary, &self.entities, decoder, position)?
                    {
                        return Ok(Some(id));
                    }
                }
                Event::End(_) => {
                    let closed = self
                        .open
                        .pop()
                        .ok_or_else(|| SvgError::parse(position, "unexpected end tag"))?;
                    if let Some(id) = closed {
                        return Ok(Some(id));
                    }
                }
                Event::Text(text) if self.open.is_empty() => {
                    let text = text.decode().map_err(|e| SvgError::parse(position, e))?;
                    if !text.trim_start_matches('\u{feff}').trim().is_empty() {
                        return Err(SvgError::parse(position, "text outside the root element"));
                    }
                }
                Event::CData(_) | Event::GeneralRef(_) if self.open.is_empty() => {
                    return Err(SvgError::parse(position, "text outside the root element"));
                }
                Event::DocType(doctype) => {
                    let doctype = doctype.decode().map_err(|e| SvgError::parse(position, e))?;
                    self.entities = Entities::from_doctype(&doctype);
                }
                Event::Eof => {
                    if !self.open.is_empty() {
                        return Err(SvgError::parse(position, "unexpected end of document"));
                    }
                    if !self.seen_root {
                        return Err(SvgError::parse(position, "no root element"));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

/// The element's id if it should be yielded when the element closes.
fn candidate(
    start: &BytesStart<'_>,
    vocabulary: &Vocabulary,
    entities: &Entities,
    decoder: Decoder,
    position: u64,
) -> Result<Option<String>, SvgError> {
    let name = start.name();
    let local = decoder
        .decode(name.local_name().into_inner())
        .map_err(|e| SvgError::parse(position, e))?;
    if !vocabulary.contains(&local) {
        return Ok(None);
    }

    let Some(attr) = start
        .try_get_attribute("id")
        .map_err(|e| SvgError::parse(position, e))?
    else {
        return Ok(None);
    };
    let raw = decoder
        .decode(&attr.value)
        .map_err(|e| SvgError::parse(position, e))?;
    let id = entities.unescape(&raw).map_err(|e| SvgError::parse(position, e))?;
    Ok((!id.is_empty()).then(|| id.into_owned()))
}

fn check_single_root(
    open: &[Option<String>],
    seen_root: &mut bool,
    position: u64,
) -> Result<(), SvgError> {
    if open.is_empty() {
        if *seen_root {
            return Err(SvgError::parse(position, "junk after document element"));
        }
        *seen_root = true;
    }
    Ok(())
}

impl<R: BufRead> Iterator for IdScanner<'_, R> {
    type Item = Result<String, SvgError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_id() {
            Ok(Some(id)) => Some(Ok(id)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{EXAMPLE_SVG, IDS_IN_EXAMPLE_SVG, IDS_IN_ILLUSTRATOR_SVG, ILLUSTRATOR_SVG};
    use crate::svg::Document;
    use std::collections::BTreeSet;

    fn collect(src: &str, vocabulary: &Vocabulary) -> Result<Vec<String>, SvgError> {
        scan_ids(src.as_bytes(), vocabulary).collect()
    }

    #[test]
    fn test_scan_example_ids() {
        let ids: BTreeSet<String> = collect(EXAMPLE_SVG, &Vocabulary::visible())
            .unwrap()
            .into_iter()
            .collect();
        let expected: BTreeSet<String> = IDS_IN_EXAMPLE_SVG.iter().map(|s| s.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_scan_skips_non_visible_tags() {
        let ids = collect(EXAMPLE_SVG, &Vocabulary::visible()).unwrap();
        assert!(!ids.iter().any(|id| id == "title" || id == "shade" || id == "defs"));

        let all = collect(EXAMPLE_SVG, &Vocabulary::Any).unwrap();
        assert!(all.iter().any(|id| id == "shade"));
    }

    #[test]
    fn test_scan_yields_on_close_without_dedup() {
        let src = r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="outer"><rect id="a"/><svg:rect xmlns:svg="http://www.w3.org/2000/svg" id="a"/></g></svg>"#;
        let ids = collect(src, &Vocabulary::visible()).unwrap();
        assert_eq!(ids, ["a", "a", "outer"]);
    }

    #[test]
    fn test_scan_ignores_empty_id() {
        let ids = collect(r#"<svg><rect id=""/><path id="p"/></svg>"#, &Vocabulary::visible())
            .unwrap();
        assert_eq!(ids, ["p"]);
    }

    #[test]
    fn test_scan_malformed_fails() {
        let vocabulary = Vocabulary::visible();
        let mut scanner = scan_ids(r#"<svg><rect id="a"/><g></svg>"#.as_bytes(), &vocabulary);
        assert_eq!(scanner.next().unwrap().unwrap(), "a");
        assert!(matches!(scanner.next(), Some(Err(SvgError::Parse { .. }))));
        assert!(scanner.next().is_none());

        assert!(collect(r#"<svg><rect id="a">"#, &Vocabulary::visible()).is_err());
        assert!(collect("", &Vocabulary::visible()).is_err());
    }

    #[test]
    fn test_scan_rejects_text_outside_root() {
        let vocabulary = Vocabulary::visible();
        for src in [
            r#"<svg><rect id="a"/></svg>junk"#,
            r#"junk<svg><rect id="a"/></svg>"#,
            r#"<svg><rect id="a"/></svg>&amp;"#,
            r#"<svg><rect id="a"/></svg><![CDATA[x]]>"#,
        ] {
            assert!(collect(src, &vocabulary).is_err(), "expected error for {src:?}");
            assert!(Document::parse(src.as_bytes()).is_err());
        }

        let ids = collect("\u{feff}\n<svg><rect id=\"a\"/></svg>\n\n", &vocabulary).unwrap();
        assert_eq!(ids, ["a"]);
    }

    #[test]
    fn test_scan_resolves_internal_subset_entities() {
        let ids: BTreeSet<String> = collect(ILLUSTRATOR_SVG, &Vocabulary::visible())
            .unwrap()
            .into_iter()
            .collect();
        let expected: BTreeSet<String> =
            IDS_IN_ILLUSTRATOR_SVG.iter().map(|s| s.to_string()).collect();
        assert_eq!(ids, expected);

        let src = r#"<!DOCTYPE svg [<!ENTITY p "room_">]><svg><rect id="&p;a"/></svg>"#;
        assert_eq!(collect(src, &Vocabulary::visible()).unwrap(), ["room_a"]);
        assert!(collect(r#"<svg><rect id="&p;a"/></svg>"#, &Vocabulary::visible()).is_err());
    }
}
