use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use statblock_core::challenge_rating::Rating;
use statblock_core::characteristic::CharacteristicKind;
use statblock_core::core_api::{CoreError, Engine, Session};
use statblock_core::dice::RollMode;
use statblock_core::hit_dice::select_hit_dice;
use statblock_core::reference::{Aggregate, Column, FilterValue, Filters, ReferenceTable};
use statblock_core::templates::TemplateCatalog;
use statblock_core::vocab::{CreatureType, Size};
use statblock_render::{JsonStyle, MarkdownOptions, render_json_full, render_markdown};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a blank statblock document.
    New {
        name: String,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "1", value_parser = parse_rating)]
        cr: Rating,
        #[arg(long, value_parser = parse_size)]
        size: Option<Size>,
        #[arg(long)]
        lair: bool,
    },
    /// Render a statblock document as Homebrewery markdown or JSON.
    Render {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        wide: bool,
        #[arg(long = "roll-mode", default_value = "average", value_parser = parse_roll_mode)]
        roll_mode: RollMode,
    },
    /// Resolve directives in TEXT against a statblock's stats.
    Resolve {
        #[arg(value_name = "FILE")]
        path: PathBuf,
        text: String,
        #[arg(long = "roll-mode", default_value = "average", value_parser = parse_roll_mode)]
        roll_mode: RollMode,
    },
    /// Pick the hit dice closest to a hit-point target.
    HitDice {
        #[arg(long)]
        hp: i32,
        #[arg(long, value_parser = parse_size)]
        size: Size,
        #[arg(long = "con-mod", default_value_t = 0, allow_hyphen_values = true)]
        con_mod: i32,
    },
    /// Aggregate a column of a reference table.
    Query {
        #[arg(long)]
        table: PathBuf,
        #[arg(long, value_parser = parse_rating)]
        cr: Option<Rating>,
        #[arg(long, value_parser = parse_size)]
        size: Option<Size>,
        #[arg(long = "creature-type", value_parser = parse_creature_type)]
        creature_type: Option<CreatureType>,
        #[arg(long, value_name = "BOOL")]
        legendary: Option<bool>,
        #[arg(long, value_name = "BOOL")]
        swarm: Option<bool>,
        #[arg(long, value_parser = parse_column)]
        column: Column,
        #[arg(long, default_value = "mean", value_parser = parse_aggregate)]
        op: Aggregate,
        #[arg(long = "group-by", value_parser = parse_column)]
        group_by: Option<Column>,
    },
    /// List built-in characteristic templates.
    Templates {
        #[arg(long, value_parser = parse_kind)]
        kind: Option<CharacteristicKind>,
    },
    /// Print one built-in template as JSON.
    Template { label: String },
}

fn parse_rating(s: &str) -> Result<Rating, String> {
    s.parse::<Rating>().map_err(|e| e.message)
}

fn parse_size(s: &str) -> Result<Size, String> {
    Size::from_display_name(s).ok_or_else(|| format!("unknown size {s:?}"))
}

fn parse_creature_type(s: &str) -> Result<CreatureType, String> {
    CreatureType::from_display_name(s).ok_or_else(|| format!("unknown creature type {s:?}"))
}

fn parse_kind(s: &str) -> Result<CharacteristicKind, String> {
    CharacteristicKind::from_display_name(s)
        .or_else(|| {
            CharacteristicKind::ALL.iter().copied().find(|k| {
                k.section_title().eq_ignore_ascii_case(s.trim())
                    || k.display_name().replace(' ', "-").eq_ignore_ascii_case(s.trim())
            })
        })
        .ok_or_else(|| format!("unknown characteristic kind {s:?}"))
}

fn parse_column(s: &str) -> Result<Column, String> {
    s.parse::<Column>().map_err(|e| e.message)
}

fn parse_aggregate(s: &str) -> Result<Aggregate, String> {
    s.parse::<Aggregate>().map_err(|e| e.message)
}

fn parse_roll_mode(s: &str) -> Result<RollMode, String> {
    RollMode::from_name(s).ok_or_else(|| format!("unknown roll mode {s:?}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_text(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {e}", path.display());
        process::exit(1);
    })
}

fn open_session(path: &Path, roll_mode: RollMode) -> Session {
    let text = read_text(path);
    Engine::new()
        .with_roll_mode(roll_mode)
        .open_str(&text)
        .unwrap_or_else(|e| {
            eprintln!("Error loading statblock: {}", path.display());
            eprintln!("  {}", e);
            process::exit(1);
        })
}

fn or_exit<T>(result: Result<T, CoreError>, context: &str) -> T {
    result.unwrap_or_else(|e| {
        eprintln!("Error {context}: {e}");
        process::exit(1);
    })
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    debug!(command = ?cli.command, "starting");

    match cli.command {
        Command::New {
            name,
            output,
            cr,
            size,
            lair,
        } => {
            let session = or_exit(
                Engine::new().create(&name, cr, lair),
                "creating statblock",
            );
            let mut statblock = session.into_statblock();
            if let Some(size) = size {
                statblock.sizes = vec![size];
            }
            let json = or_exit(statblock.to_json(), "serializing statblock");
            if let Err(e) = fs::write(&output, json + "\n") {
                eprintln!("Error writing {}: {e}", output.display());
                process::exit(1);
            }
            println!("{}", output.display());
        }
        Command::Render {
            path,
            json,
            wide,
            roll_mode,
        } => {
            let session = open_session(&path, roll_mode);
            if json {
                let value = or_exit(
                    render_json_full(&session, JsonStyle::CanonicalV1),
                    "rendering JSON",
                );
                match serde_json::to_string_pretty(&value) {
                    Ok(text) => println!("{text}"),
                    Err(e) => {
                        eprintln!("Error serializing JSON output: {e}");
                        process::exit(1);
                    }
                }
            } else {
                let markdown = or_exit(
                    render_markdown(&session, MarkdownOptions { wide }),
                    "rendering markdown",
                );
                print!("{markdown}");
            }
        }
        Command::Resolve {
            path,
            text,
            roll_mode,
        } => {
            let session = open_session(&path, roll_mode);
            println!("{}", or_exit(session.format_text(&text), "resolving text"));
        }
        Command::HitDice { hp, size, con_mod } => {
            println!("{}", select_hit_dice(hp, size, con_mod));
        }
        Command::Query {
            table,
            cr,
            size,
            creature_type,
            legendary,
            swarm,
            column,
            op,
            group_by,
        } => {
            let table = or_exit(
                ReferenceTable::from_json(&read_text(&table)),
                "loading reference table",
            );
            let mut filters = Filters::new();
            if let Some(cr) = cr {
                filters.insert(Column::Cr, FilterValue::Rating(cr));
            }
            if let Some(size) = size {
                filters.insert(Column::Size, FilterValue::Size(size));
            }
            if let Some(creature_type) = creature_type {
                filters.insert(Column::CreatureType, FilterValue::CreatureType(creature_type));
            }
            if let Some(legendary) = legendary {
                filters.insert(Column::Legendary, FilterValue::Flag(legendary));
            }
            if let Some(swarm) = swarm {
                filters.insert(Column::Swarm, FilterValue::Flag(swarm));
            }

            match group_by {
                Some(group_column) => {
                    let groups = or_exit(
                        table.group_by(&filters, group_column, column, op),
                        "querying reference table",
                    );
                    for group in groups {
                        println!(
                            "{}: value={} sample_size={}",
                            group.key, group.result.value, group.result.sample_size
                        );
                    }
                }
                None => {
                    let result = or_exit(
                        table.query(&filters, column, op),
                        "querying reference table",
                    );
                    println!("value={}", result.value);
                    println!("sample_size={}", result.sample_size);
                }
            }
        }
        Command::Templates { kind } => {
            let catalog = TemplateCatalog::builtin();
            let templates: Vec<_> = match kind {
                Some(kind) => catalog.list_by_kind(kind),
                None => catalog.all().iter().collect(),
            };
            for template in templates {
                println!("{}: {}", template.kind, template.label);
            }
        }
        Command::Template { label } => {
            let catalog = TemplateCatalog::builtin();
            let template = or_exit(catalog.get(&label), "looking up template");
            match serde_json::to_string_pretty(template) {
                Ok(text) => println!("{text}"),
                Err(e) => {
                    eprintln!("Error serializing template: {e}");
                    process::exit(1);
                }
            }
        }
    }
}
