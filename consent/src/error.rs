use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("block bits must be a multiple of 8 greater than 256, got {0}")]
    InvalidBlockBits(usize),

    #[error("RSA modulus must be positive")]
    InvalidModulus,

    #[error(transparent)]
    KeyParsing(#[from] hex::FromHexError),
}

pub type Result<T> = std::result::Result<T, Error>;
