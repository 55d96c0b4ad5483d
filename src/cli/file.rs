//! One-off commands on a single SVG file: `ids`, `render`, `dims`.
//!
//! Nothing is stored; these run the same pipeline as stored image maps.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use svgmap::config::SvgMapConfig;
use svgmap::map::render_svg;
use svgmap::svg::{Document, LinkMap, LinkTarget, read_dimensions, scan_ids};

/// Print every linkable id, sorted and deduplicated, one per line.
pub fn print_ids(file: &Path, config: &SvgMapConfig) -> Result<()> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("failed to open {}", file.display()))?,
    );
    let vocabulary = config.vocabulary();
    let ids = scan_ids(reader, &vocabulary)
        .collect::<Result<BTreeSet<_>, _>>()
        .with_context(|| format!("failed to scan {}", file.display()))?;

    for id in ids {
        println!("{id}");
    }
    Ok(())
}

/// Render with ad-hoc links to stdout or `output`.
pub fn render(
    file: &Path,
    links: &[(String, LinkTarget)],
    output: Option<&PathBuf>,
    config: &SvgMapConfig,
) -> Result<()> {
    let source = read_svg(file)?;
    let links: LinkMap = links.iter().cloned().collect();
    let artifact = render_svg(&source, &links, &config.render_settings())
        .with_context(|| format!("failed to render {}", file.display()))?;

    match output {
        Some(path) => {
            fs::write(path, &artifact.markup)
                .with_context(|| format!("failed to write {}", path.display()))?;
            svgmap::log!("render"; "wrote {} ({}x{})", path.display(), artifact.width, artifact.height);
        }
        None => println!("{}", artifact.markup),
    }
    Ok(())
}

/// Print `WIDTH HEIGHT`, or `0 0` when the file declares neither.
pub fn print_dimensions(file: &Path) -> Result<()> {
    let source = read_svg(file)?;
    let doc = Document::parse(&source).with_context(|| format!("failed to parse {}", file.display()))?;
    let (width, height) = read_dimensions(&doc)?.unwrap_or_default();
    println!("{width} {height}");
    Ok(())
}

fn read_svg(file: &Path) -> Result<Vec<u8>> {
    fs::read(file).with_context(|| format!("failed to read {}", file.display()))
}
