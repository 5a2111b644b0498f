use chrono::Utc;
use tracing::info;

use spotreg::config::Config;
use spotreg::sample::PriceGenerator;
use spotreg::store::FjallStore;

use crate::cli::SeedArgs;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn serve(config: Config) -> Result<(), AnyError> {
    spotreg::api::run(config).await
}

pub fn seed(config: &Config, args: SeedArgs) -> Result<(), AnyError> {
    let store = FjallStore::open(&config.server.store_path)
        .map_err(|e| format!("Failed to open Fjall store: {}", e))?;

    let existing = store.stats()?.price_count;
    if existing > 0 && !args.force {
        info!(existing, "Store already contains prices, skipping (use --force to reseed)");
        return Ok(());
    }

    let offset = config
        .exporter
        .utc_offset()
        .ok_or("exporter.utc_offset_minutes is out of range")?;
    let days = args.days.unwrap_or(config.prices.history_days);
    let records = PriceGenerator::new().history(Utc::now().with_timezone(&offset), days);
    let written = store.put_prices(&records)?;
    store.persist()?;

    info!(written, days, "Seeded sample prices");
    Ok(())
}

pub fn print_registers(config: &Config) -> Result<(), AnyError> {
    let map = config.address_map()?;
    let range = map.range();
    println!("# address range {}..={}", range.min, range.max);
    for entry in map.entries() {
        println!(
            "{:>5}  {:<28} x{}",
            entry.address,
            entry.key.as_str(),
            entry.transform.factor()
        );
    }
    Ok(())
}
