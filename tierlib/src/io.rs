use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::result::ExternalMeasurement;

// Configuration files are tiny, one block is plenty
const BUFFER_SIZE: usize = 4096;

pub fn get_reader(file: File) -> impl Read {
    BufReader::with_capacity(BUFFER_SIZE, file)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(get_reader(file))?)
}

/// Reads and validates a simulation configuration from a JSON file
pub fn load_config(path: impl AsRef<Path>) -> Result<SimulationConfig> {
    let path = path.as_ref();
    let config: SimulationConfig = read_json(path)?;
    config.validate()?;
    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Reads a measurement produced by an external hardware probe
pub fn load_external_measurement(path: impl AsRef<Path>) -> Result<ExternalMeasurement> {
    read_json(path.as_ref())
}
