use serde::{Deserialize, Serialize};

/// A DeFi protocol whose documentation the backend can answer questions about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Aave,
    Compound,
    Uniswap,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Aave => "aave",
            Protocol::Compound => "compound",
            Protocol::Uniswap => "uniswap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "aave" => Some(Protocol::Aave),
            "compound" => Some(Protocol::Compound),
            "uniswap" => Some(Protocol::Uniswap),
            _ => None,
        }
    }

    pub fn all() -> Vec<Protocol> {
        vec![Protocol::Aave, Protocol::Compound, Protocol::Uniswap]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Protocol::Aave => "Aave",
            Protocol::Compound => "Compound",
            Protocol::Uniswap => "Uniswap",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Protocol::Aave => "🏦",
            Protocol::Compound => "🔬",
            Protocol::Uniswap => "🦄",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
