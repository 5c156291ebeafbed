//! # MossDB Demo Entry Point
//!
//! Opens a database, inserts a handful of pairs, walks the full contents,
//! looks up a few keys, deletes one, and re-reads it.
//!
//! ```bash
//! mossdb            # uses data/moss.db
//! mossdb ./my.db    # explicit path
//! ```
//!
//! Set `RUST_LOG=mossdb=debug` to see the store's lifecycle events.

use std::env;

use eyre::Result;
use mossdb::Database;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = env::args().nth(1).unwrap_or_else(|| "data/moss.db".into());
    let db = Database::open(&path)?;

    let pairs: &[(&str, &str)] = &[
        ("apple", "red"),
        ("banana", "yellow"),
        ("grape", "purple"),
        ("orange", "orange"),
        ("cherry", "red"),
    ];

    println!("Inserting {} pairs into {}", pairs.len(), path);
    for (key, value) in pairs {
        db.put(key.as_bytes(), value.as_bytes())?;
    }

    println!("\nContents:");
    db.traverse(|key, value| {
        println!(
            "  {} -> {}",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value)
        );
    })?;

    println!("\nLookups:");
    for key in ["apple", "banana", "mango"] {
        match db.get(key.as_bytes())? {
            Some(value) => println!("  {} -> {}", key, String::from_utf8_lossy(&value)),
            None => println!("  {} -> (not found)", key),
        }
    }

    println!("\nDeleting \"apple\"");
    db.delete(b"apple")?;
    match db.get(b"apple")? {
        Some(value) => println!("  apple still present: {}", String::from_utf8_lossy(&value)),
        None => println!("  apple is gone"),
    }

    db.close()?;
    Ok(())
}
