use modstore_core::{ModuleRecord, ModuleStore, StoreError};
use serde::Serialize;
use std::time::{Duration, UNIX_EPOCH};
use tabled::{Table, Tabled};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Tabled, Serialize)]
struct ModuleRow {
    #[tabled(rename = "Id")]
    id: u64,
    #[tabled(rename = "Symbolic Name")]
    symbolic_name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Gen")]
    generation: u32,
    #[tabled(rename = "Mode")]
    mode: &'static str,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&ModuleRecord> for ModuleRow {
    fn from(record: &ModuleRecord) -> Self {
        Self {
            id: record.id(),
            symbolic_name: record.symbolic_name().unwrap_or("-").to_string(),
            version: record
                .version()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".to_string()),
            generation: record.generation(),
            mode: if record.is_reference() {
                "reference"
            } else {
                "copy"
            },
            location: record.location().to_string(),
        }
    }
}

#[derive(Tabled, Serialize)]
struct GenerationRow {
    #[tabled(rename = "Generation")]
    generation: u32,
    #[tabled(rename = "Current")]
    current: bool,
    #[tabled(rename = "Path")]
    path: String,
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn require(store: &ModuleStore, id: u64) -> Result<std::sync::Arc<ModuleRecord>, StoreError> {
    store.get(id).ok_or(StoreError::ModuleNotFound(id))
}

fn format_age(millis: u64) -> String {
    if millis == 0 {
        return "never".to_string();
    }
    let then = UNIX_EPOCH + Duration::from_millis(millis);
    let age = then.elapsed().map(|d| d.as_secs()).unwrap_or(0);
    if age < 60 {
        format!("{}s ago", age)
    } else if age < 3600 {
        format!("{}m ago", age / 60)
    } else if age < 86400 {
        format!("{}h ago", age / 3600)
    } else {
        format!("{}d ago", age / 86400)
    }
}

pub fn list(store: &ModuleStore, json: bool) -> CliResult {
    let rows: Vec<ModuleRow> = store
        .records()
        .iter()
        .map(|r| ModuleRow::from(r.as_ref()))
        .collect();

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No modules installed.");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

pub fn show(store: &ModuleStore, id: u64, json: bool) -> CliResult {
    let record = require(store, id)?;
    let descriptor = record.descriptor().ok();

    if json {
        #[derive(Serialize)]
        struct Details<'a> {
            #[serde(flatten)]
            record: modstore_core::RecordSnapshot,
            base_file: String,
            fragment: bool,
            headers: Option<&'a modstore_api::Descriptor>,
        }
        return print_json(&Details {
            record: record.snapshot(),
            base_file: record.base_file().display().to_string(),
            fragment: record.is_fragment(),
            headers: descriptor.as_deref(),
        });
    }

    let row = ModuleRow::from(record.as_ref());
    println!("Module {}:", row.id);
    println!("  Symbolic Name: {}", row.symbolic_name);
    println!("  Version:       {}", row.version);
    println!("  Location:      {}", row.location);
    println!("  Content:       {} ({})", record.base_file().display(), row.mode);
    println!("  Generation:    {}", row.generation);
    println!("  Start Level:   {}", record.start_level());
    println!("  Status:        {}", record.status());
    println!("  Modified:      {}", format_age(record.last_modified()));
    if record.is_fragment() {
        println!("  Fragment:      yes");
    }
    if let Some(paths) = record.native_paths_string() {
        println!("  Native Code:   {}", paths);
    }

    match descriptor {
        Some(descriptor) => {
            println!("\nHeaders:");
            for (name, value) in descriptor.iter() {
                println!("  {}: {}", name, value);
            }
        }
        None => println!("\nDescriptor unavailable."),
    }
    Ok(())
}

pub fn generations(store: &ModuleStore, id: u64, json: bool) -> CliResult {
    let record = require(store, id)?;
    let layout = store.layout();
    let rows: Vec<GenerationRow> = layout
        .generations(id)
        .into_iter()
        .map(|generation| GenerationRow {
            generation,
            current: generation == record.generation(),
            path: layout.generation_dir(id, generation).display().to_string(),
        })
        .collect();

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No generation directories for module {}.", id);
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

pub fn find_library(store: &ModuleStore, id: u64, name: &str, json: bool) -> CliResult {
    let record = require(store, id)?;
    let found = record.find_library(name);

    if json {
        return print_json(&serde_json::json!({
            "id": id,
            "name": name,
            "mapped": store.services().libraries.map_library_name(name),
            "path": found.as_ref().map(|p| p.display().to_string()),
        }));
    }
    match found {
        Some(path) => println!("{}", path.display()),
        None => println!("Library {} not found in module {}.", name, id),
    }
    Ok(())
}
