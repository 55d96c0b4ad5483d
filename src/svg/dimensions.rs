//! Root dimensions: `width`/`height` <-> `viewBox`.
//!
//! After [`normalize_dimensions`] the root carries only a `viewBox`, so the
//! embedding page can size the image from its intrinsic aspect ratio.

use std::sync::LazyLock;

use regex::Regex;

use super::{Document, QName, SvgError};

/// viewBox separator: commas and/or whitespace ("min-x, min-y, width, height").
static VIEWBOX_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\x20\t\r\n]+").expect("valid viewBox separator pattern"));

/// Fail unless the root element is `<svg>`.
pub fn ensure_svg_root(doc: &Document) -> Result<(), SvgError> {
    let root = &doc[doc.root()];
    if root.name.local == "svg" {
        Ok(())
    } else {
        Err(SvgError::NotSvg(root.name.local.clone()))
    }
}

/// Replace hard-coded `width`/`height` with a `viewBox`, in place.
///
/// An existing `viewBox` wins. Without one, `width` and `height` must both be
/// present and non-empty to synthesize `0 0 {width} {height}`; otherwise the
/// root is left untouched.
pub fn normalize_dimensions(doc: &mut Document) -> Result<(), SvgError> {
    ensure_svg_root(doc)?;
    let root_id = doc.root();
    let root = &mut doc[root_id];

    if !root.has_attr("viewBox") {
        let width = root.attr("width").filter(|w| !w.is_empty());
        let height = root.attr("height").filter(|h| !h.is_empty());
        let (Some(width), Some(height)) = (width, height) else {
            return Ok(());
        };
        let viewbox = format!("0 0 {width} {height}");
        root.set_attr(QName::unqualified("viewBox"), viewbox);
    }

    root.remove_attr("width");
    root.remove_attr("height");
    Ok(())
}

/// Read the declared `(width, height)` of the root.
///
/// Prefers the 3rd and 4th `viewBox` tokens, then `width`/`height`.
/// Returns `Ok(None)` when neither is declared and `Err` when a declared
/// value is not a number (e.g. `width="100%"`).
pub fn read_dimensions(doc: &Document) -> Result<Option<(f64, f64)>, SvgError> {
    ensure_svg_root(doc)?;
    let root = &doc[doc.root()];

    if let Some(viewbox) = root.attr("viewBox") {
        let tokens: Vec<&str> = VIEWBOX_SEPARATOR.split(viewbox.trim()).collect();
        let &[_, _, width, height] = tokens.as_slice() else {
            return Err(SvgError::Dimension(format!(
                "viewBox `{viewbox}` does not have four components"
            )));
        };
        return Ok(Some((parse_number(width)?, parse_number(height)?)));
    }

    let width = root.attr("width").filter(|w| !w.is_empty());
    let height = root.attr("height").filter(|h| !h.is_empty());
    match (width, height) {
        (Some(width), Some(height)) => Ok(Some((parse_number(width)?, parse_number(height)?))),
        _ => Ok(None),
    }
}

/// A finite number; `NaN` and `inf` parse as `f64` but are not sizes.
fn parse_number(token: &str) -> Result<f64, SvgError> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| SvgError::Dimension(format!("`{token}` is not a number")))
}
