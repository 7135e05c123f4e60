use std::time::Duration;

use anyhow::Context;
use profilr::{InvocationEvent, Options, ProfilerConfig};
use serde_json::json;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn checksum(input: &str) -> u32 {
    input.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

async fn fetch_quota(user: u32) -> u32 {
    tokio::time::sleep(Duration::from_millis(15)).await;
    user * 100
}

struct Account {
    balance: i64,
    withdraw: profilr::Method<Account, (i64,), Result<i64, String>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = ProfilerConfig::from_env().context("reading profiler environment")?;
    let profiler = profilr::install(ProfilerConfig {
        enabled: true,
        ..config
    })?;
    tracing::info!(?profiler, "profilr demo starting");

    let subscription = profilr::register(|event: &InvocationEvent| {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("failed to render event {}: {}", event.id, e),
        }
    });

    let hashed = profilr::profile(checksum);
    tracing::info!(value = hashed.call(("profilr",)), "checksum");

    let quota = profilr::profile_with(fetch_quota, ("quota", Options::new().with("tier", json!("free"))));
    tracing::info!(value = quota.call_async((7,)).await, "quota");

    let withdraw = profilr::decorate_method("withdraw", "ledger", |account: &Account, (amount,): (i64,)| {
        if amount > account.balance {
            Err(format!("insufficient funds: {} > {}", amount, account.balance))
        } else {
            Ok(account.balance - amount)
        }
    });
    let account = Account {
        balance: 50,
        withdraw: withdraw.bind(),
    };
    for amount in [20, 80] {
        match account.withdraw.try_call(&account, (amount,)) {
            Ok(left) => tracing::info!(amount, left, "withdrawal accepted"),
            Err(reason) => tracing::info!(amount, %reason, "withdrawal rejected"),
        }
    }

    profilr::flush().await;
    subscription.dispose();
    tracing::info!("profilr demo finished");
    Ok(())
}
