//! # Seed Data Generator
//!
//! Populates a development database with a tool catalog.
//!
//! ## Usage
//! ```bash
//! # Seed ./toolcrib_dev.db (default)
//! cargo run -p toolcrib-ledger --bin seed
//!
//! # Specify database path
//! cargo run -p toolcrib-ledger --bin seed -- --db ./data/toolcrib.db
//!
//! # Start from an empty database
//! cargo run -p toolcrib-ledger --bin seed -- --reset
//! ```
//!
//! Items go through `InventoryLedger::create_item`, so every seeded item also
//! gets a `created` history entry and a generated SKU.

use std::env;
use std::path::Path;
use std::sync::Arc;

use toolcrib_db::{Database, DbConfig, LedgerStore};
use toolcrib_ledger::{BroadcastNotifier, CreateItem, InventoryLedger};

/// (name, brand, type, units)
const CATALOG: &[(&str, &str, &str, i64)] = &[
    ("Taladro percutor", "Bosch", "Eléctrica", 4),
    ("Amoladora angular", "DeWalt", "Eléctrica", 3),
    ("Sierra circular", "Makita", "Eléctrica", 2),
    ("Atornillador inalámbrico", "Bosch", "Eléctrica", 6),
    ("Lijadora orbital", "Black+Decker", "Eléctrica", 2),
    ("Martillo de carpintero", "Stanley", "Manual", 10),
    ("Juego de llaves combinadas", "Bahco", "Manual", 5),
    ("Destornillador plano", "Truper", "Manual", 12),
    ("Alicate universal", "Knipex", "Manual", 8),
    ("Nivel de burbuja 60cm", "Stanley", "Medición", 4),
    ("Cinta métrica 5m", "Truper", "Medición", 15),
    ("Medidor láser", "Bosch", "Medición", 1),
    ("Escalera tijera 6 peldaños", "Cantol", "Acceso", 3),
    ("Casco de seguridad", "3M", "Protección", 20),
    ("Gafas de protección", "3M", "Protección", 25),
    ("Extensión eléctrica 25m", "Genérica", "Accesorio", 6),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./toolcrib_dev.db");
    let mut reset = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--reset" => reset = true,
            "--help" | "-h" => {
                println!("Toolcrib Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./toolcrib_dev.db)");
                println!("      --reset        Delete the database file before seeding");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Toolcrib Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!();

    if reset {
        for suffix in ["", "-wal", "-shm"] {
            let file = format!("{}{}", db_path, suffix);
            if Path::new(&file).exists() {
                std::fs::remove_file(&file)?;
            }
        }
        println!("✓ Removed existing database");
    }

    let db = Arc::new(Database::new(DbConfig::new(&db_path)).await?);
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.count_items().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Run with --reset to regenerate.");
        return Ok(());
    }

    println!();
    println!("Creating items...");

    let inventory = InventoryLedger::new(db.clone(), Arc::new(BroadcastNotifier::new(16)));
    let start = std::time::Instant::now();
    let mut created = 0;

    for (name, brand, kind, units) in CATALOG {
        let request = CreateItem {
            name: name.to_string(),
            brand: brand.to_string(),
            sku: None,
            kind: kind.to_string(),
            stock: *units,
        };
        match inventory.create_item(request).await {
            Ok(item) => {
                println!("  {:<28} {:>8}  x{}", item.name, item.sku, item.total);
                created += 1;
            }
            Err(e) => eprintln!("Failed to create {}: {}", name, e),
        }
    }

    println!();
    println!("✓ Created {} items in {:?}", created, start.elapsed());

    db.close().await;
    println!("✓ Seed complete!");

    Ok(())
}
