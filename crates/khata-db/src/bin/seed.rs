//! # Seed Data Generator
//!
//! Populates a store with sample customers, bills, cash-book entries and
//! receipts for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default SQLite file
//! cargo run -p khata-db --bin seed
//!
//! # Specify database path
//! cargo run -p khata-db --bin seed -- --db ./data/khata.db
//!
//! # Seed a MongoDB database instead
//! cargo run -p khata-db --bin seed -- --mongo mongodb://localhost:27017 --database billing_system
//! ```
//!
//! Every bill is written together with its credit entry through
//! `record_bill_with_entry`, and every other bill gets a ponch receipt.

use std::env;

use khata_core::{BillDraft, CustomerDraft, Document, EntryType, LineItem, ReceiptDraft, RoznamchaDraft};
use khata_db::{Database, DbConfig};
use serde_json::json;

/// Sample customers: (name, phone, address)
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Haji Abdul Rehman", "0300-1112233", "Sabzi Mandi, Quetta"),
    ("Muhammad Ashraf", "0321-4455667", "Kuchlak Road"),
    ("Gul Khan", "0333-7788990", "Pishin Stop"),
    ("Test Customer", "", ""),
];

/// Sample produce: (item, display name, rate per man, mazduri per bag)
const ITEMS: &[(&str, &str, f64, f64)] = &[
    ("خجور", "خجور (Khajoor)", 1000.0, 70.0),
    ("انار", "انار (Anaar)", 2400.0, 50.0),
    ("سیب", "سیب (Saib)", 1800.0, 60.0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./khata_dev.db");
    let mut mongo_uri: Option<String> = None;
    let mut mongo_database = String::from("billing_system");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--mongo" | "-m" => {
                if i + 1 < args.len() {
                    mongo_uri = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--database" => {
                if i + 1 < args.len() {
                    mongo_database = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Khata Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        SQLite file path (default: ./khata_dev.db)");
                println!("  -m, --mongo <URI>      Seed a MongoDB server instead");
                println!("      --database <NAME>  MongoDB database (default: billing_system)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Khata Seed Data Generator");
    println!("============================");

    let config = match &mongo_uri {
        Some(uri) => {
            println!("Store: MongoDB {} / {}", uri, mongo_database);
            DbConfig::mongo(uri.clone(), mongo_database.clone())
        }
        None => {
            println!("Store: {}", db_path);
            DbConfig::sqlite(&db_path)
        }
    };
    let db = Database::new(config).await?;

    if !db.health_check().await {
        return Err("store is not reachable".into());
    }
    println!("✓ Connected to store");

    let existing = db.bills().list().await?.len();
    if existing > 0 {
        println!("⚠ Store already has {} bills", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    println!();
    println!("Seeding...");
    let start = std::time::Instant::now();
    let mut bills = 0;
    let mut receipts = 0;

    for (idx, (name, phone, address)) in CUSTOMERS.iter().enumerate() {
        let customer = db
            .customers()
            .upsert(CustomerDraft {
                name: name.to_string(),
                phone: non_empty(phone),
                address: non_empty(address),
            })
            .await?;

        for (item_idx, item) in ITEMS.iter().enumerate() {
            let bags = (idx + item_idx) % 4 + 1;
            let draft = sample_bill(&customer.id, &customer.name, item, bags);
            let net = draft
                .calculations
                .as_ref()
                .and_then(|c| c.get("netAmount"))
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);

            let mut entry = RoznamchaDraft::new(EntryType::Credit, net);
            entry.name = Some(customer.name.clone());
            entry.description = Some(format!("{} x{}", item.1, bags));
            entry.credit = Some(format!("{net:.1}"));

            let recorded = db.record_bill_with_entry(draft, entry).await?;
            bills += 1;

            if bills % 2 == 0 {
                db.receipts()
                    .create(ReceiptDraft {
                        ponch_number: format!("P-{:03}", bills),
                        bill_number: Some(recorded.bill.bill_number.clone()),
                        customer_name: Some(customer.name.clone()),
                        amount: net,
                        date: None,
                    })
                    .await?;
                receipts += 1;
            }
        }
    }

    // A few cash expenses so the book has both columns
    for (description, amount) in [("Mandi rent", 5000.0), ("Labour advance", 1500.0)] {
        let mut entry = RoznamchaDraft::new(EntryType::Debit, amount);
        entry.description = Some(description.to_string());
        entry.debit = Some(format!("{amount:.0}"));
        db.roznamcha().create(entry).await?;
    }

    let summary = db.roznamcha().summary().await?;

    println!();
    println!(
        "✓ Seeded {} customers, {} bills, {} receipts in {:?}",
        CUSTOMERS.len(),
        bills,
        receipts,
        start.elapsed()
    );
    println!(
        "  Cash book: credit {:.1}, debit {:.1}, balance {:.1}",
        summary.total_credit, summary.total_debit, summary.balance
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Builds a bill with the same arithmetic the billing screen applies:
/// 10% commission, then bt, mazduri, dalali and market fee deducted.
fn sample_bill(
    customer_id: &str,
    customer_name: &str,
    (item, display, rate, mazduri): &(&str, &str, f64, f64),
    bags: usize,
) -> BillDraft {
    let bags_f = bags as f64;
    let subtotal = rate * bags_f;
    let commission = subtotal * 0.10;
    let after_commission = subtotal - commission;
    let bt = after_commission * 0.006;
    let total_mazduri = mazduri * bags_f;
    let dalali = after_commission * 0.01;
    let market_fee = bags_f;
    let total_charges = bt + total_mazduri + dalali + market_fee;
    let net_amount = after_commission - total_charges;

    let line = json!({
        "item": item,
        "quantity": bags.to_string(),
        "weightKg": (40 * bags).to_string(),
        "weightMan": "0",
        "rate": rate.to_string(),
        "totalWeightKg": 40 * bags,
        "totalWeightMan": bags,
        "baseAmount": subtotal,
        "bardanaTotal": 0,
        "subtotal": subtotal,
        "itemConfig": { "name": display, "bardana": 0, "mazduri": mazduri }
    });

    BillDraft {
        bill_type: Some("Bazar Bill".to_string()),
        customer_id: customer_id.to_string(),
        customer_name: customer_name.to_string(),
        date: None,
        items: vec![LineItem(to_object(line))],
        totals: None,
        calculations: Some(to_object(json!({
            "totalSubtotal": subtotal,
            "commission": commission,
            "afterCommission": after_commission,
            "bt": round1(bt),
            "totalMazduri": total_mazduri,
            "dalali": round1(dalali),
            "marketFee": market_fee,
            "totalCharges": round1(total_charges),
            "netAmount": round1(net_amount)
        }))),
        manual_mazduri: None,
        item_config: None,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn to_object(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}
