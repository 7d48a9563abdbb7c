mod beacon;

pub use beacon::{BeaconNetworkSpec, MAINNET, MINIMAL, Network};
