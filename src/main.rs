//! svgmap - linkable SVG image maps from the command line.

mod cli;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use svgmap::config::SvgMapConfig;
use svgmap::logger;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config_path = SvgMapConfig::discover(&cli.config);
    let config = SvgMapConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    match &cli.command {
        Commands::Ids { file } => cli::file::print_ids(file, &config),
        Commands::Render {
            file,
            links,
            output,
        } => cli::file::render(file, links, output.as_ref(), &config),
        Commands::Dims { file } => cli::file::print_dimensions(file),
        Commands::Map { command } => cli::map::run(command, &config),
    }
}
