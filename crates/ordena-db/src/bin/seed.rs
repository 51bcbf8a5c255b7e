//! # Seed Data Generator
//!
//! Populates the database with development data: users, clients, and a
//! product catalog.
//!
//! ## Usage
//! ```bash
//! # Seed the base catalog plus 50 filler products (default)
//! cargo run -p ordena-db --bin seed
//!
//! # Generate more filler products
//! cargo run -p ordena-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p ordena-db --bin seed -- --db ./data/ordena.db
//! ```
//!
//! ## Generated Data
//! - Two users: an admin and a seller
//! - Three clients
//! - The base catalog (P001-P003) with fixed prices and stock
//! - Filler products `SP-{INDEX}` with pseudo-random price and stock
//!
//! Seeding is idempotent at the run level: if products already exist the
//! generator exits without writing anything.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use ordena_core::{Client, Product};
use ordena_db::{Database, DbConfig};

/// The fixed base catalog: (code, name, price_cents, stock).
const BASE_CATALOG: &[(&str, &str, i64, i64)] = &[
    ("P001", "Balón de fútbol", 2550, 100),
    ("P002", "Raqueta de tenis", 8999, 50),
    ("P003", "Guantes de boxeo", 4500, 30),
];

/// Name parts for filler products.
const ITEMS: &[&str] = &[
    "Balón de baloncesto",
    "Balón de voleibol",
    "Red de bádminton",
    "Casco de ciclismo",
    "Pesas ajustables",
    "Cuerda para saltar",
    "Esterilla de yoga",
    "Botella deportiva",
    "Camiseta técnica",
    "Zapatillas de correr",
    "Espinilleras",
    "Gafas de natación",
];

const VARIANTS: &[&str] = &["Junior", "Adulto", "Pro", "Entrenamiento", "Competición"];

/// Seed clients: (name, email, phone).
const CLIENTS: &[(&str, &str, Option<&str>)] = &[
    ("Ana Gómez", "ana.gomez@example.com", Some("555-0101")),
    ("Luis Fernández", "luis.fernandez@example.com", Some("555-0102")),
    ("Marta Ruiz", "marta.ruiz@example.com", None),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./ordena_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Ordena Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of filler products (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./ordena_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Ordena Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Filler products: {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();

    // Users
    for (name, email, role) in [
        ("Admin", "admin@sportsline.local", "admin"),
        ("Vendedor Uno", "vendedor@sportsline.local", "seller"),
    ] {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(now)
        .execute(db.pool())
        .await?;
    }
    println!("✓ Seeded 2 users");

    // Clients
    for (name, email, phone) in CLIENTS {
        let client = Client {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        db.clients().insert(&client).await?;
    }
    println!("✓ Seeded {} clients", CLIENTS.len());

    // Base catalog
    for (code, name, price_cents, stock) in BASE_CATALOG {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: name.to_string(),
            price_cents: *price_cents,
            stock: *stock,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
    }
    println!("✓ Seeded base catalog ({} products)", BASE_CATALOG.len());

    // Filler products
    println!();
    println!("Generating filler products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    for seed in 0..count {
        let product = generate_product(seed);

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.code, e);
            continue;
        }

        generated += 1;

        if generated % 25 == 0 {
            println!("  Generated {} products...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} filler products in {:?}", generated, elapsed);

    let total = db.products().count().await?;
    println!();
    println!("✓ Seed complete! {} products total", total);

    Ok(())
}

/// Generates a single filler product with pseudo-random price and stock.
///
/// Derives the name by cycling item/variant combinations and appending a
/// series number once they wrap, so any requested count yields unique
/// codes without exhausting the name tables.
fn generate_product(seed: usize) -> Product {
    let now = Utc::now();

    let item = ITEMS[seed % ITEMS.len()];
    let variant = VARIANTS[(seed / ITEMS.len()) % VARIANTS.len()];
    let series = seed / (ITEMS.len() * VARIANTS.len());

    let name = if series == 0 {
        format!("{} {}", item, variant)
    } else {
        format!("{} {} Serie {}", item, variant, series + 1)
    };

    // $4.99 - $129.99, stepped by the seed so runs are reproducible
    let price_cents = 499 + ((seed * 731) % 12500) as i64;
    let stock = ((seed * 13) % 80) as i64;

    Product {
        id: Uuid::new_v4().to_string(),
        code: format!("SP-{:03}", seed + 100),
        name,
        price_cents,
        stock,
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_filler_codes_unique_beyond_name_tables() {
        // 500 exceeds ITEMS × VARIANTS; every product must still get a
        // distinct code and a usable name.
        let codes: HashSet<String> = (0..500).map(|s| generate_product(s).code).collect();
        assert_eq!(codes.len(), 500);
    }

    #[test]
    fn test_filler_names_wrap_into_series() {
        let first = generate_product(0);
        let wrapped = generate_product(ITEMS.len() * VARIANTS.len());

        assert_eq!(first.name, format!("{} {}", ITEMS[0], VARIANTS[0]));
        assert_eq!(wrapped.name, format!("{} {} Serie 2", ITEMS[0], VARIANTS[0]));
    }

    #[test]
    fn test_filler_price_and_stock_in_range() {
        for seed in 0..200 {
            let product = generate_product(seed);
            assert!(product.price_cents >= 499 && product.price_cents < 13000);
            assert!((0..80).contains(&product.stock));
        }
    }
}
