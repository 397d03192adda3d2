pub const MINT: &str = "mint(uint256)";
pub const CLAIM: &str = "claim(uint256)";

/// One candidate payable entry point taking the quantity as its only argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStrategy {
    pub signature: String,
}

impl CallStrategy {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    /// Deployments expose minting as either `mint` or `claim`; try in that order.
    pub fn defaults() -> Vec<Self> {
        vec![Self::new(MINT), Self::new(CLAIM)]
    }

    pub fn name(&self) -> &str {
        self.signature
            .split_once('(')
            .map_or(self.signature.as_str(), |(name, _)| name)
    }
}
