//! `robohand serve`: run the control server against the local driver.

use robohand_runtime::{ControlServer, Framing, RobohandConfig};

use crate::context::LocalDriver;
use crate::style;

pub fn run_serve(config: &RobohandConfig, framing: Option<Framing>) -> anyhow::Result<()> {
    let mut server_config = config.server.clone();
    if let Some(framing) = framing {
        server_config.framing = framing;
    }
    let mut local = LocalDriver::open(config)?;
    let mut server = ControlServer::bind(&server_config)?;
    let address = server.local_addr()?;
    println!(
        "{}",
        style::success(format!(
            "robohand listening on {address} (driver {}, framing {})",
            local.name, server_config.framing
        ))
    );
    server.run(&mut local.driver)?;
    Ok(())
}
