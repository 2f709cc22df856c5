//! # Seed Data Generator
//!
//! Populates the database with demo quotes for development.
//!
//! ## Usage
//! ```bash
//! # Generate 10 quotes (default)
//! cargo run -p lathe-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p lathe-db --bin seed -- --count 50
//!
//! # Specify database path
//! cargo run -p lathe-db --bin seed -- --db ./data/lathe.db
//! ```
//!
//! ## Generated Quotes
//! Each quote gets:
//! - A customer from a fixed list
//! - 1-4 parts with drawing tolerances ("±0.010" .. "0.002")
//! - One line item per part (quantity 1-25)
//! - A saved calculation for every part except the last on odd quotes,
//!   so the calculator has something left to price
//! - Every fifth quote is sent, which locks it

use std::env;

use lathe_core::pricing::{suggest_tolerance_multiplier, PricingConfiguration, RateTable};
use lathe_core::{LeadTimeOption, Money, NewCalculation, QuoteAction, QuoteStatus};
use lathe_db::{Database, DbConfig, NewLineItem};
use rust_decimal::Decimal;

/// Customers for realistic test data
const CUSTOMERS: &[&str] = &[
    "Acme Fixtures",
    "Northwind Aerospace",
    "Bluewater Marine",
    "Cascade Robotics",
    "Ironclad Medical",
    "Summit Tooling",
];

/// Parts with the tolerance printed on their drawings
const PARTS: &[(&str, &str)] = &[
    ("Mounting Bracket", "±0.010"),
    ("Pump Housing", "±0.005"),
    ("Valve Body", ".003 in"),
    ("Bearing Cap", "+/- 0.002"),
    ("Spindle Adapter", "±0.005"),
    ("Sensor Mount", "0.015"),
];

const LEAD_TIMES: &[LeadTimeOption] = &[
    LeadTimeOption::Standard,
    LeadTimeOption::Fast,
    LeadTimeOption::Economy,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 10;
    let mut db_path = String::from("./lathe_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(10);
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
                println!("Lathe Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of quotes to generate (default: 10)");
                println!("  -d, --db <PATH>    Database file path (default: ./lathe_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Lathe Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Quotes:   {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.quotes().list(1).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has quotes");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating quotes...");

    let rates = RateTable::default();
    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut priced = 0;

    for seed in 0..count {
        match seed_quote(&db, &rates, seed).await {
            Ok(calculations) => {
                generated += 1;
                priced += calculations;
            }
            Err(e) => eprintln!("Failed to seed quote {}: {}", seed + 1, e),
        }
    }

    println!();
    println!(
        "✓ Generated {} quotes ({} priced parts) in {:?}",
        generated,
        priced,
        start.elapsed()
    );
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Creates one quote with parts, line items and calculations.
///
/// Returns the number of calculations saved.
async fn seed_quote(
    db: &Database,
    rates: &RateTable,
    seed: usize,
) -> Result<usize, Box<dyn std::error::Error>> {
    let quote_number = format!("Q-{:05}", 1001 + seed);
    let customer = CUSTOMERS[seed % CUSTOMERS.len()];
    let status = if seed % 3 == 0 {
        QuoteStatus::Rfq
    } else {
        QuoteStatus::Draft
    };

    let quote = db.quotes().create(&quote_number, customer, status).await?;
    if quote.status == QuoteStatus::Rfq {
        db.quotes().apply_action(quote.id, QuoteAction::Convert).await?;
    }

    let part_count = 1 + seed % 4;
    let mut saved = 0;

    for index in 0..part_count {
        let (name, tolerance) = PARTS[(seed + index) % PARTS.len()];
        let part = db.parts().create(quote.id, name, Some(tolerance)).await?;

        let quantity = 1 + ((seed * 7 + index * 3) % 25) as i64;
        let line = db
            .line_items()
            .create(&NewLineItem {
                quote_id: quote.id,
                quote_part_id: Some(part.id.clone()),
                description: name.to_string(),
                quantity,
                unit_price: Money::zero(),
            })
            .await?;

        // Leave the last part unpriced on odd quotes
        if seed % 2 == 1 && index + 1 == part_count {
            continue;
        }

        let config = demo_configuration(rates, seed + index, Some(tolerance));
        let new = NewCalculation::price(quote.id, Some(part.id), Some(line.line_item.id), config)?;
        db.calculations().save_and_apply(&new, None).await?;
        saved += 1;
    }

    if seed % 5 == 4 {
        db.quotes().apply_action(quote.id, QuoteAction::Send).await?;
    }

    Ok(saved)
}

/// Builds a plausible configuration from the rate table defaults.
fn demo_configuration(
    rates: &RateTable,
    seed: usize,
    tolerance: Option<&str>,
) -> PricingConfiguration {
    let mut config = PricingConfiguration::defaults(rates);

    // Toolpath cost: $40.00 - $439.00
    config.toolpath_grand_total = Money::from_cents(4_000 + ((seed * 1_733) % 40_000) as i64);

    config.lead_time_option = LEAD_TIMES[seed % LEAD_TIMES.len()];
    config.lead_time_multiplier = rates.lead_time.for_option(config.lead_time_option);

    config.thread_counts.small = (seed % 5) as i64;
    config.thread_counts.medium = (seed % 3) as i64;
    config.thread_counts.large = (seed % 2) as i64;

    if let Some(suggested) = suggest_tolerance_multiplier(tolerance) {
        config.tolerance_multiplier = rates.tolerance.clamp(suggested);
    }

    if seed % 4 == 0 {
        config.tooling_enabled = true;
        config.tooling_cost = Money::new(Decimal::from(25 + (seed % 6) as i64 * 25));
    }

    config
}
