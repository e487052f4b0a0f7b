use std::time::Duration;

use async_trait::async_trait;
use ethui_fetcher::dispatch::{CallOutcome, Caller};
use ethui_fetcher::source::Address;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Random 20-byte hex addresses, reproducible across runs
pub fn random_addresses(n: usize) -> Vec<Address> {
    let mut rng = StdRng::seed_from_u64(42);

    (0..n)
        .map(|_| {
            let bytes: [u8; 20] = rng.gen();
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            Address::from(format!("0x{}", hex))
        })
        .collect()
}

/// Simulates a remote API with a fixed latency
pub struct LatencyCaller {
    pub latency: Duration,
}

#[async_trait]
impl Caller for LatencyCaller {
    type Remainder = ();

    async fn call(&self, _address: &Address) -> (CallOutcome, Option<()>) {
        tokio::time::sleep(self.latency).await;
        (CallOutcome::Success, None)
    }
}
