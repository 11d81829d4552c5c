use anyhow::{Context, Result as AnyResult};
use curve_certstore::{CertStore, GlobalConfig};
use tracing::info;

fn main() -> AnyResult<()> {
    // Load environment variables from the `.env` file
    dotenvy::dotenv().ok();
    // Initialize the logger after loading the environment variables
    tracing_subscriber::fmt::init();

    let config = GlobalConfig::load_config().context("Failed to parse configuration files")?;

    let mut store = match &config.certdir {
        Some(dir) => CertStore::new(dir),
        None => CertStore::in_memory(),
    };

    if let Some(public_key) = &config.lookup {
        match store
            .lookup(public_key)
            .context("Failed to look up the certificate")?
        {
            Some(cert) => info!("found certificate for {}", cert.public_key()),
            None => info!("no certificate found for {}", public_key),
        }
    }

    store.print();
    Ok(())
}
