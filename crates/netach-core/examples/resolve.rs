//! Run with: cargo run -p netach-core --example resolve -- "אנטרקוט בלק אנגוס"
//!
//! Resolves the given product name against the shipped mapping dictionary
//! and an in-memory store, printing the resolution envelope.

use std::sync::Arc;

use netach_core::config::AppConfig;
use netach_core::mapping::MappingTable;
use netach_core::resolver::{ResolveOptions, Resolver};
use netach_core::storage::SqliteStore;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netach_core=debug".into()),
        )
        .init();

    let text = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: resolve <product name>");
        std::process::exit(2);
    });

    let config = AppConfig::defaults().expect("embedded defaults parse");
    let mapping = Arc::new(MappingTable::load_or_empty(&config.mapping.path));
    let store = SqliteStore::open_memory().expect("in-memory store");
    let resolver = Resolver::new(mapping, store, config.matching);

    match resolver.normalize(&text, &ResolveOptions::default()) {
        Ok(res) => {
            println!("canonical:  {}", res.entity.name);
            if let Some(category) = res.entity.category {
                println!("category:   {category}");
            }
            if let Some(cut_type) = res.entity.cut_type {
                println!("cut type:   {cut_type}");
            }
            println!("premium:    {}", res.entity.is_premium);
            println!("confidence: {:.2}", res.confidence);
            println!("source:     {}", res.source.as_db_str());
            println!("new entity: {}", res.is_new_entity);
            for alt in &res.alternatives {
                println!(
                    "  alt: {} ({:.2}, {})",
                    alt.canonical_name,
                    alt.confidence,
                    alt.source.as_db_str()
                );
            }
        }
        Err(e) => {
            eprintln!("resolution failed: {e}");
            std::process::exit(1);
        }
    }
}
