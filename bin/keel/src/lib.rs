pub mod cli;
pub mod process_block;
pub mod ssz_snappy;
