//! # Seed Data Generator
//!
//! Populates the database with customers, sale orders and payments for
//! development.
//!
//! ## Usage
//! ```bash
//! # 20 customers (default)
//! cargo run -p tally-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p tally-db --bin seed -- --customers 200 --db ./data/tally.db
//! ```
//!
//! The generated data is deterministic: customer `n` gets `3 + n % 5` sale
//! orders spread over January 2024 and pays roughly half of what it was
//! invoiced. Statement rows are not written here; trigger
//! `GET /api/statements/sync` on a running server to build them.

use chrono::NaiveDate;
use std::env;
use tally_core::{CustomerInput, Money, PaymentInput, SaleOrderInput};
use tally_db::{Database, DbConfig};

/// Company names combined with the customer index.
const COMPANIES: &[&str] = &[
    "Northwind Trading",
    "Blue Harbor Foods",
    "Red Pine Hardware",
    "Sunrise Textiles",
    "Granite Office Supply",
    "Silver Lake Pharmacy",
    "Maple Street Bakery",
    "Orchid Electronics",
];

const CITIES: &[&str] = &["Hangzhou", "Ningbo", "Wenzhou", "Shaoxing"];

const PAYMENT_METHODS: &[&str] = &["transfer", "cash", "cheque"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut customers: usize = 20;
    let mut db_path = String::from("./tally_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--customers" | "-c" => {
                if i + 1 < args.len() {
                    customers = args[i + 1].parse().unwrap_or(20);
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
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --customers <N>  Number of customers to generate (default: 20)");
                println!("  -d, --db <PATH>      Database file path (default: ./tally_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database:  {}", db_path);
    println!("Customers: {}", customers);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.customers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} customers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut orders_created = 0;
    let mut payments_created = 0;

    for n in 0..customers {
        let customer = db.customers().insert(&generate_customer(n)).await?;

        let mut invoiced = Money::zero();
        for k in 0..(3 + n % 5) {
            let order = generate_sale_order(customer.id, n, k);
            invoiced += order.order_amount;
            db.sale_orders().insert(&order).await?;
            orders_created += 1;
        }

        // Two instalments covering about half of the invoiced total
        let instalment = Money::from_cents(invoiced.cents() / 4);
        let payments: Vec<PaymentInput> = (0..2)
            .map(|k| generate_payment(customer.id, n, k, instalment))
            .collect();
        payments_created += db.payments().insert_batch(&payments).await?.len();

        if (n + 1) % 50 == 0 {
            println!("  Generated {} customers...", n + 1);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} customers, {} sale orders, {} payments in {:?}",
        customers, orders_created, payments_created, elapsed
    );
    println!();
    println!("Run GET /api/statements/sync to build statements.");

    Ok(())
}

fn generate_customer(n: usize) -> CustomerInput {
    CustomerInput {
        code: format!("C{:04}", n + 1),
        name: format!("{} #{}", COMPANIES[n % COMPANIES.len()], n + 1),
        phone: Some(format!("0571-{:08}", 10_000_000 + n * 7919)),
        province: Some("Zhejiang".to_string()),
        city: Some(CITIES[n % CITIES.len()].to_string()),
        company: Some(COMPANIES[n % COMPANIES.len()].to_string()),
        is_active: n % 11 != 10,
        ..Default::default()
    }
}

fn generate_sale_order(customer_id: i64, n: usize, k: usize) -> SaleOrderInput {
    let day = 1 + ((n * 7 + k * 5) % 28) as u32;
    let create_time = NaiveDate::from_ymd_opt(2024, 1, day)
        .and_then(|d| d.and_hms_opt(9 + (k % 8) as u32, 15, 0));

    SaleOrderInput {
        code: None,
        customer_id,
        create_time,
        // 50.00 to 2049.00
        order_amount: Money::from_cents(5_000 + ((n * 131 + k * 977) % 2_000) as i64 * 100),
        remark: (k == 0).then(|| "Opening order".to_string()),
    }
}

fn generate_payment(customer_id: i64, n: usize, k: usize, amount: Money) -> PaymentInput {
    let day = 10 + ((n + k * 9) % 19) as u32;

    PaymentInput {
        code: None,
        payment_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap_or_default(),
        customer_id,
        amount,
        payment_method: Some(PAYMENT_METHODS[(n + k) % PAYMENT_METHODS.len()].to_string()),
        account: None,
        payer_company: Some(COMPANIES[n % COMPANIES.len()].to_string()),
        sale_order_ids: Vec::new(),
        remark: None,
    }
}
