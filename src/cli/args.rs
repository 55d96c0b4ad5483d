//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use svgmap::map::{EntityRef, LinkSpec, MapId};
use svgmap::svg::LinkTarget;

/// Turn named SVG elements into links and keep rendered image maps fresh
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (searched upward from the current directory)
    #[arg(short = 'C', long, global = true, default_value = "svgmap.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List the linkable element ids of an SVG file
    #[command(visible_alias = "i")]
    Ids {
        /// SVG file to scan
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Render an SVG file with links, without storing anything
    #[command(visible_alias = "r")]
    Render {
        /// SVG file to render
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Link an element: `ID=URL` or `ID=URL@TARGET` (repeatable)
        #[arg(short, long = "link", value_name = "ID=URL[@TARGET]", value_parser = parse_inline_link)]
        links: Vec<(String, LinkTarget)>,

        /// Write output to file instead of stdout
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Print the intrinsic width and height of an SVG file
    #[command(visible_alias = "d")]
    Dims {
        /// SVG file to measure
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Manage stored image maps
    #[command(visible_alias = "m")]
    Map {
        #[command(subcommand)]
        command: MapCommand,
    },
}

/// `svgmap map` subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum MapCommand {
    /// Store a new image map from an SVG file
    New {
        /// Source SVG file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,

        /// Title (defaults to the file stem)
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Print the rendered markup of an image map
    Show {
        id: MapId,

        /// Print the original source instead
        #[arg(long)]
        original: bool,

        /// Print the id set and dimensions instead
        #[arg(short, long, conflicts_with = "original")]
        info: bool,
    },

    /// Link an element of an image map
    Link {
        id: MapId,

        /// Element id (need not exist in the current image)
        element: String,

        /// A URL, or `page:<key>` / `document:<key>` from the config
        #[arg(value_parser = parse_link_spec)]
        link: LinkSpec,

        /// Link target, e.g. `_blank`
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Remove the link from an element
    Unlink { id: MapId, element: String },

    /// Replace the source image of an image map
    Replace {
        id: MapId,

        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Re-render every image map linking to a changed page or document
    Notify {
        /// `page:<key>` or `document:<key>`
        entity: EntityRef,
    },

    /// List stored image maps
    #[command(visible_alias = "ls")]
    List,
}

/// `page:`/`document:` prefixes select an entity; anything else is a URL.
pub fn parse_link_spec(s: &str) -> Result<LinkSpec, String> {
    let is_entity = ["page:", "document:", "doc:"]
        .iter()
        .any(|prefix| s.starts_with(prefix));
    if is_entity {
        s.parse().map(LinkSpec::Entity)
    } else if s.is_empty() {
        Err("link must not be empty".to_owned())
    } else {
        Ok(LinkSpec::External(s.to_owned()))
    }
}

/// Parse `ID=URL[@TARGET]`.
pub fn parse_inline_link(s: &str) -> Result<(String, LinkTarget), String> {
    let (id, rest) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `ID=URL`, got `{s}`"))?;
    if id.is_empty() {
        return Err(format!("missing element id in `{s}`"));
    }
    let link = match rest.rsplit_once('@') {
        Some((url, target)) if !target.is_empty() && !target.contains('/') => {
            LinkTarget::new(url).with_target(target)
        }
        _ => LinkTarget::new(rest),
    };
    Ok((id.to_owned(), link))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_spec() {
        assert_eq!(
            parse_link_spec("page:about").unwrap(),
            LinkSpec::Entity(EntityRef::page("about"))
        );
        assert_eq!(
            parse_link_spec("https://example.com/a").unwrap(),
            LinkSpec::External("https://example.com/a".into())
        );
        assert_eq!(parse_link_spec("/local").unwrap(), LinkSpec::External("/local".into()));
        assert!(parse_link_spec("page:").is_err());
        assert!(parse_link_spec("").is_err());
    }

    #[test]
    fn test_parse_inline_link() {
        let (id, link) = parse_inline_link("green=/hello").unwrap();
        assert_eq!(id, "green");
        assert_eq!(link, LinkTarget::new("/hello"));

        let (_, link) = parse_inline_link("blue=/world@_blank").unwrap();
        assert_eq!(link, LinkTarget::new("/world").with_target("_blank"));

        // `@` inside a URL path is not a target separator
        let (_, link) = parse_inline_link("x=https://user@example.com/p").unwrap();
        assert_eq!(link.url, "https://user@example.com/p");
        assert_eq!(link.target, None);

        assert!(parse_inline_link("nourl").is_err());
        assert!(parse_inline_link("=/x").is_err());
    }

    #[test]
    fn test_cli_parses_map_link() {
        let cli = Cli::try_parse_from([
            "svgmap", "map", "link", "3", "blue", "page:world", "--target", "_blank",
        ])
        .unwrap();
        let Commands::Map {
            command: MapCommand::Link { id, element, link, target },
        } = cli.command
        else {
            panic!("expected map link");
        };
        assert_eq!(id, MapId(3));
        assert_eq!(element, "blue");
        assert_eq!(link, LinkSpec::Entity(EntityRef::page("world")));
        assert_eq!(target.as_deref(), Some("_blank"));
    }

    #[test]
    fn test_cli_parses_render_links() {
        let cli = Cli::try_parse_from([
            "svgmap", "-v", "render", "a.svg", "-l", "red=/r", "--link", "blue=/b@_top",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Render { links, output, .. } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].1.target.as_deref(), Some("_top"));
        assert!(output.is_none());
    }

    #[test]
    fn test_cli_rejects_bad_map_id() {
        assert!(Cli::try_parse_from(["svgmap", "map", "show", "abc"]).is_err());
    }
}
