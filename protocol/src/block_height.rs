use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(thiserror::Error, PartialEq, Eq, Debug, Clone)]
pub enum BlockHeightError {
    #[error("Missing ':' separator in block height: {0}")]
    MissingSeparator(String),

    #[error("Empty chain id in block height: {0}")]
    EmptyChainId(String),

    #[error("Invalid height component: {0}")]
    InvalidHeight(String),
}

/// Ledger position marker in the `<chain_id>:<height>` wire format.
///
/// Heights are only comparable within a single chain, so no ordering is
/// derived here; the lifecycle tracker pins the chain id of the first
/// observation and orders the raw [`height`](Self::height) values itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockHeight {
    chain_id: String,
    height: u64,
}

impl BlockHeight {
    pub fn new(chain_id: impl Into<String>, height: u64) -> Result<Self, BlockHeightError> {
        let chain_id = chain_id.into();
        if chain_id.is_empty() {
            return Err(BlockHeightError::EmptyChainId(format!(":{height}")));
        }
        Ok(Self { chain_id, height })
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn height(&self) -> u64 {
        self.height
    }
}

impl FromStr for BlockHeight {
    type Err = BlockHeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The chain id itself may contain ':', the height never does
        let (chain_id, height) = s.rsplit_once(':').ok_or_else(|| BlockHeightError::MissingSeparator(s.to_string()))?;
        if chain_id.is_empty() {
            return Err(BlockHeightError::EmptyChainId(s.to_string()));
        }
        let height = u64::from_str(height).map_err(|_| BlockHeightError::InvalidHeight(s.to_string()))?;
        Ok(Self { chain_id: chain_id.to_string(), height })
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.height)
    }
}

impl Serialize for BlockHeight {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockHeight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BlockHeight::from_str(&s).map_err(serde::de::Error::custom)
    }
}
