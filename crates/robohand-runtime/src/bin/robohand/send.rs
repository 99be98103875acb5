//! `robohand send`: forward batch texts through a control client.

use anyhow::{bail, Context as _};
use robohand_protocol::decode_batch;
use robohand_runtime::{ControlClient, RobohandConfig};

use crate::style;

pub fn run_send(config: &RobohandConfig, batches: &[String]) -> anyhow::Result<()> {
    let parsed = batches
        .iter()
        .map(|text| decode_batch(text).with_context(|| format!("invalid batch '{text}'")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let mut client = ControlClient::new(config.client.clone());
    for batch in &parsed {
        if client.send_batch(batch).is_ok() {
            println!("{}", style::success(format!("sent {batch}")));
        } else {
            println!("{}", style::warning(format!("dropped {batch}")));
        }
    }
    client.disconnect();
    let dropped = client.dropped();
    if dropped > 0 {
        bail!(
            "{dropped} of {} batch(es) dropped, {} unreachable",
            parsed.len(),
            client.config().address()
        );
    }
    Ok(())
}
