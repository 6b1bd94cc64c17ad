use std::{env, fs::File, path::Path};

use wallet_ledger::{CsvReader, LedgerEngine, LedgerStore, MemoryStore, StdErrDLQ};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wallet_ledger=info".into()),
        )
        .init();

    let mut args = env::args();
    let file_path = args
        .nth(1)
        .ok_or("usage: wallet_ledger <operations.csv>")?;
    let file = File::open(Path::new(&file_path))?;

    let mut ingestion = CsvReader::new(file)?;
    let dlq = StdErrDLQ::default();
    let engine = LedgerEngine::new(MemoryStore::new());

    engine.process(&mut ingestion, &dlq).await?;

    // Final wallet summary, one row per wallet, sorted for stable output.
    let mut wallets = engine.store().wallets()?;
    wallets.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    println!("user,balance,currency");
    for wallet in wallets {
        println!("{},{:.2},{}", wallet.user_id, wallet.balance, wallet.currency);
    }

    Ok(())
}
