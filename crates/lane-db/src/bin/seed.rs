//! # Seed Data Generator
//!
//! Populates a Local Store with a demo catalog, a few operators and one
//! pending sale, so a terminal can be exercised without a central service.
//!
//! ## Usage
//! ```bash
//! cargo run -p lane-db --bin seed
//! cargo run -p lane-db --bin seed -- --db ./data/lane.db
//! ```
//!
//! Catalog tables are replaced wholesale, exactly as a catalog pull would.
//! The demo sale is only added when no transaction is pending yet.

use std::env;

use lane_core::{LineItem, NewTransaction, Operator, Product, TaxRate};
use lane_db::{Database, DbConfig};

/// (department, [(name, price_cents)])
const DEPARTMENTS: &[(&str, &[(&str, i64)])] = &[
    (
        "Beverages",
        &[
            ("Cola 330ml", 199),
            ("Cola Zero 330ml", 199),
            ("Sparkling Water 500ml", 149),
            ("Orange Juice 1L", 389),
            ("Iced Tea 500ml", 229),
        ],
    ),
    (
        "Snacks",
        &[
            ("Sea Salt Chips", 349),
            ("Pretzel Sticks", 279),
            ("Chocolate Bar", 159),
            ("Trail Mix", 499),
        ],
    ),
    (
        "Dairy",
        &[
            ("Whole Milk 1L", 219),
            ("Greek Yogurt", 129),
            ("Cheddar Block", 599),
        ],
    ),
    (
        "Grocery",
        &[
            ("Spaghetti 500g", 189),
            ("Tomato Sauce", 259),
            ("Basmati Rice 1kg", 449),
        ],
    ),
];

/// Scaled tax rates: exempt, 5%, 8.25%.
const TAX_RATES: &[i64] = &[0, 50_000, 82_500];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./lane_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Lane POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./lane_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Lane POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let products = demo_products();
    let inserted = db.products().replace_all(&products).await?;
    println!("✓ Catalog replaced: {} products", inserted);

    let operators = demo_operators();
    let inserted = db.operators().replace_all(&operators).await?;
    println!("✓ Operators replaced: {} operators", inserted);

    if db.transactions().count_pending().await? == 0 {
        let sale = demo_sale(&products[0], &products[5]);
        let txn = db.transactions().create(&sale).await?;
        println!("✓ Pending sale recorded: {}", txn.id);
    } else {
        println!("⚠ Pending sales already present, none added");
    }

    let hits = db.products().search("cola", 10).await?;
    println!();
    println!("Search 'cola': {} results", hits.len());
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

fn demo_products() -> Vec<Product> {
    let mut products = Vec::new();
    for (dept_idx, (department, items)) in DEPARTMENTS.iter().enumerate() {
        for (item_idx, (name, price_cents)) in items.iter().enumerate() {
            let seed = dept_idx * 100 + item_idx;
            products.push(Product {
                upc: format!("0{:011}", 40_000_000_000u64 + seed as u64),
                sku: format!("{}-{:03}", &department[..3].to_uppercase(), item_idx + 1),
                name: (*name).to_string(),
                price_cents: *price_cents,
                department: (*department).to_string(),
                tax_rate: TAX_RATES[seed % TAX_RATES.len()],
            });
        }
    }
    products
}

fn demo_operators() -> Vec<Operator> {
    vec![
        Operator {
            pin: "1234".into(),
            name: "Store Manager".into(),
            employee_id: "E-001".into(),
            is_manager: true,
        },
        Operator {
            pin: "2468".into(),
            name: "Cashier One".into(),
            employee_id: "E-002".into(),
            is_manager: false,
        },
    ]
}

fn demo_sale(first: &Product, second: &Product) -> NewTransaction {
    let items = vec![
        LineItem {
            upc: first.upc.clone(),
            name: first.name.clone(),
            price_cents: first.price_cents,
            quantity: 2,
            is_manual: false,
        },
        LineItem {
            upc: second.upc.clone(),
            name: second.name.clone(),
            price_cents: second.price_cents,
            quantity: 1,
            is_manual: false,
        },
    ];

    let subtotal_cents: i64 = items.iter().map(LineItem::line_total_cents).sum();
    let tax_cents: i64 = items
        .iter()
        .zip([first.tax_rate(), second.tax_rate()])
        .map(|(item, rate)| line_tax(item.line_total_cents(), rate))
        .sum();

    NewTransaction {
        operator_pin: "2468".into(),
        items,
        subtotal_cents,
        tax_cents,
        total_cents: subtotal_cents + tax_cents,
        payment_method: "cash".into(),
        payment_ref: String::new(),
        customer_email: None,
        customer_phone: None,
    }
}

/// Rounded tax on a line total: cents × rate / (100 × SCALE).
fn line_tax(line_total_cents: i64, rate: TaxRate) -> i64 {
    let divisor = 100 * TaxRate::SCALE;
    (line_total_cents * rate.scaled() + divisor / 2) / divisor
}
