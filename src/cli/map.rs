//! `svgmap map ...`: image maps kept in the project store.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

use svgmap::config::SvgMapConfig;
use svgmap::engine::Engine;
use svgmap::map::StaticResolver;
use svgmap::store::{JsonStore, MapStore};
use svgmap::log;

use super::MapCommand;

type ProjectEngine = Engine<JsonStore, StaticResolver>;

pub fn run(command: &MapCommand, config: &SvgMapConfig) -> Result<()> {
    let dir = config.store_dir();
    let store =
        JsonStore::open(&dir).with_context(|| format!("failed to open store {}", dir.display()))?;
    let mut engine = Engine::with_settings(store, config.resolver(), config.render_settings());

    match command {
        MapCommand::New { file, title } => {
            let source = read_svg(file)?;
            let title = title.clone().unwrap_or_else(|| {
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });
            let id = engine.create_map(&title, source)?;
            println!("{id}");
        }
        MapCommand::Show { id, original, info } => {
            if *original {
                io::stdout().write_all(&engine.original_markup(*id)?)?;
            } else if *info {
                print_info(&mut engine, *id)?;
            } else {
                println!("{}", engine.rendered_markup(*id)?);
            }
        }
        MapCommand::Link {
            id,
            element,
            link,
            target,
        } => {
            let changed = engine.upsert_region(*id, element, link.clone(), target.clone())?;
            report(*id, changed);
        }
        MapCommand::Unlink { id, element } => {
            let changed = engine.delete_region(*id, element)?;
            report(*id, changed);
        }
        MapCommand::Replace { id, file } => {
            let changed = engine.replace_source_image(*id, read_svg(file)?)?;
            report(*id, changed);
        }
        MapCommand::Notify { entity } => {
            let changed = engine.notify_dependency_changed(entity)?;
            if changed.is_empty() {
                log!("notify"; "no image map changed");
            }
        }
        MapCommand::List => {
            for id in engine.store().list() {
                let map = engine.store().get(id)?;
                println!("{id}\t{}\t{} region(s)", map.title, map.regions.len());
            }
        }
    }
    Ok(())
}

fn print_info(engine: &mut ProjectEngine, id: svgmap::map::MapId) -> Result<()> {
    let (width, height) = engine.dimensions(id)?;
    let ids = engine.ids(id)?;
    let map = engine.store().get(id)?;

    println!("title: {}", map.title);
    println!("size: {width}x{height}");
    println!("ids: {}", ids.into_iter().collect::<Vec<_>>().join(" "));
    for region in map.regions.iter() {
        match &region.target {
            Some(target) => println!("#{} -> {} ({target})", region.element_id, region.link),
            None => println!("#{} -> {}", region.element_id, region.link),
        }
    }
    Ok(())
}

fn report(id: svgmap::map::MapId, changed: bool) {
    if changed {
        log!("render"; "image map {id} re-rendered");
    } else {
        log!("render"; "image map {id} unchanged");
    }
}

fn read_svg(file: &Path) -> Result<Vec<u8>> {
    fs::read(file).with_context(|| format!("failed to read {}", file.display()))
}
