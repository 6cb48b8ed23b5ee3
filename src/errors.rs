use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("[IK] Computation failed and NaN/Infinite value was obtained")]
    NotFiniteComputation,
    #[error("[IK] Segment tree does not mirror the kinematic chain: {0}")]
    ChainMismatch(String),
    #[error("Settings file could not be read")]
    Io(#[from] std::io::Error),
    #[error("Settings file could not be parsed")]
    Parse(#[from] toml::de::Error),
}
