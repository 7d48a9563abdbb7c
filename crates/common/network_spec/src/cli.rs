use std::{fs, sync::Arc};

use crate::networks::{BeaconNetworkSpec, MAINNET, MINIMAL};

pub fn beacon_network_parser(network_string: &str) -> Result<Arc<BeaconNetworkSpec>, String> {
    match network_string {
        "mainnet" => Ok(MAINNET.clone()),
        "minimal" => Ok(MINIMAL.clone()),
        path => read_network_spec(path).map_err(|err| format!("{err:#}")),
    }
}

fn read_network_spec(path: &str) -> anyhow::Result<Arc<BeaconNetworkSpec>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow::anyhow!("Failed to read file {path}: {err}"))?;
    let network_spec: BeaconNetworkSpec = serde_yaml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse YAML from {path}: {err}"))?;
    network_spec.validate()?;
    Ok(Arc::new(network_spec))
}
