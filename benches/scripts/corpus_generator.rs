//! Corpus generator for benchmark tests.
//!
//! Generates a synthetic campaign installation on-demand. Generated files are
//! NOT committed to git.
//! Run: cargo run --bin corpus-generator -- --squadrons 200

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use serde_json::{Map, Value, json};
use wingmate_core::CampaignLayout;

const CORPUS_DIR: &str = "benches/corpus";

/// Name templates for generating realistic rosters.
const FIRST_NAMES: &[&str] = &[
    "Manfred", "Werner", "Ernst", "Georges", "René", "Albert", "Edward", "Willy", "Charles",
    "Frank",
];

const LAST_NAMES: &[&str] = &[
    "Richthofen", "Voss", "Udet", "Guynemer", "Fonck", "Ball", "Mannock", "Coppens", "Nungesser",
    "Luke",
];

const COUNTRIES: &[&str] = &["GER", "Deutschland", "FRA", "UK", "Belgium", "USA", "GB"];

/// Medal ids; each table holds a slice of these.
const MEDALS: &[(&str, &str)] = &[
    ("iron_cross", "Iron Cross"),
    ("pour_le_merite", "Pour le Mérite"),
    ("house_order", "House Order of Hohenzollern"),
    ("croix_de_guerre", "Croix de Guerre"),
    ("legion_honneur", "Légion d'honneur"),
    ("military_cross", "Military Cross"),
    ("victoria_cross", "Victoria Cross"),
    ("distinguished_service_cross", "Distinguished Service Cross"),
];

/// Generate a synthetic campaign corpus
#[derive(Parser)]
#[command(name = "corpus-generator")]
#[command(version, about, long_about = None)]
struct Args {
    /// Installation root to generate
    #[arg(short, long, default_value = CORPUS_DIR)]
    output: PathBuf,

    /// Campaign name
    #[arg(short, long, default_value = "Bench")]
    campaign: String,

    /// Number of squadron personnel files
    #[arg(long, default_value_t = 100)]
    squadrons: usize,

    /// Members per squadron
    #[arg(long, default_value_t = 20)]
    members: usize,

    /// Number of medal tables
    #[arg(long, default_value_t = 4)]
    medal_tables: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    println!("Generating benchmark corpus...");

    let layout = CampaignLayout::new(&args.output);
    let personnel_dir = layout.personnel_dir(&args.campaign);
    let medals_dir = medals_dir(&layout, &args.campaign);
    fs::create_dir_all(&personnel_dir).into_diagnostic()?;
    fs::create_dir_all(&medals_dir).into_diagnostic()?;

    generate_medal_tables(&medals_dir, args.medal_tables)?;
    generate_personnel(&personnel_dir, args.squadrons, args.members)?;

    println!("Corpus generation complete!");
    println!(
        "  - Personnel: {} ({} files x {} members)",
        personnel_dir.display(),
        args.squadrons,
        args.members
    );
    println!(
        "  - Medals: {} ({} tables)",
        medals_dir.display(),
        args.medal_tables
    );

    Ok(())
}

/// `<campaign>/Medals`, where the benchmark looks for medal tables.
fn medals_dir(layout: &CampaignLayout, campaign: &str) -> PathBuf {
    layout.campaigns_dir().join(campaign).join("Medals")
}

/// Writes medal tables, alternating between the list and keyed shapes.
fn generate_medal_tables(dir: &Path, count: usize) -> Result<()> {
    for table in 0..count {
        let entries: Vec<(&str, &str)> = MEDALS
            .iter()
            .enumerate()
            .filter(|(i, _)| i % count == table)
            .map(|(_, medal)| *medal)
            .collect();

        let value = if table % 2 == 0 {
            json!({"medals": entries
                .iter()
                .map(|(id, name)| json!({"id": id, "name": name, "image": format!("{id}.png")}))
                .collect::<Vec<_>>()})
        } else {
            Value::Object(
                entries
                    .iter()
                    .map(|(id, name)| (id.to_string(), json!({"name": name})))
                    .collect::<Map<_, _>>(),
            )
        };

        let path = dir.join(format!("table_{:02}.json", table));
        fs::write(&path, serde_json::to_vec_pretty(&value).into_diagnostic()?).into_diagnostic()?;
    }
    Ok(())
}

/// Writes one roster per squadron.
fn generate_personnel(dir: &Path, squadrons: usize, members: usize) -> Result<()> {
    for squadron in 1..=squadrons {
        let squadron_id = 10000 + squadron;
        let mut collection = Map::new();

        for member in 0..members {
            let seed = squadron * members + member;
            let serial = format!("{}{:03}", squadron_id, member);
            let name = format!(
                "{} {}",
                FIRST_NAMES[seed % FIRST_NAMES.len()],
                LAST_NAMES[(seed / FIRST_NAMES.len()) % LAST_NAMES.len()]
            );
            let medals: Vec<Value> = (0..seed % 4)
                .map(|k| {
                    let (id, name) = MEDALS[(seed + k) % MEDALS.len()];
                    if k % 2 == 0 {
                        json!({"medalImage": format!("{id}.png")})
                    } else {
                        json!({"medalName": name})
                    }
                })
                .collect();

            collection.insert(
                serial,
                json!({
                    "name": name,
                    "country": COUNTRIES[squadron % COUNTRIES.len()],
                    "medals": medals
                }),
            );
        }

        let value = json!({
            "squadronName": format!("Squadron {}", squadron_id),
            "squadronMemberCollection": collection
        });
        let path = dir.join(format!("{}.json", squadron_id));
        fs::write(&path, serde_json::to_vec(&value).into_diagnostic()?).into_diagnostic()?;

        // Progress indicator
        if squadron % 100 == 0 {
            print!("\r  Generated: {}/{} files", squadron, squadrons);
            std::io::stdout().flush().into_diagnostic()?;
        }
    }

    println!("\r  Generated: {}/{} files ✓", squadrons, squadrons);

    Ok(())
}
