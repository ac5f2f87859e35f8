//! Example questions shown before the first submission.

use crate::selection::ProtocolSelection;

pub const COMPARE_KEY: &str = "compare";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub text: &'static str,
    pub category: &'static str,
}

const fn s(text: &'static str, category: &'static str) -> Suggestion {
    Suggestion { text, category }
}

static AAVE: [Suggestion; 3] = [
    s("What are the risks of supplying USDC to Aave V3?", "Risk"),
    s("What is Aave's liquidation threshold for ETH?", "Parameters"),
    s("How does flash loan protection work in Aave?", "Mechanism"),
];

static COMPOUND: [Suggestion; 3] = [
    s("How does Compound V3 handle interest rates?", "Basics"),
    s("How does Compound's governance work?", "Governance"),
    s("What are the borrowing limits on Compound V3?", "Parameters"),
];

static UNISWAP: [Suggestion; 3] = [
    s("How does concentrated liquidity work in Uniswap V3?", "Mechanism"),
    s("What is impermanent loss on Uniswap?", "Risk"),
    s("How are swap fees calculated in Uniswap?", "Parameters"),
];

static COMPARE: [Suggestion; 3] = [
    s("Compare how liquidation works in Aave vs Compound", "Compare"),
    s("What are the differences in interest rate models?", "Compare"),
    s("Compare governance mechanisms across protocols", "Compare"),
];

/// Unknown keys get the comparison list.
pub fn suggestions_for(key: &str) -> &'static [Suggestion] {
    match key {
        "aave" => &AAVE,
        "compound" => &COMPOUND,
        "uniswap" => &UNISWAP,
        _ => &COMPARE,
    }
}

pub fn suggestions_for_selection(selection: &ProtocolSelection) -> &'static [Suggestion] {
    suggestions_for(selection.mode_key())
}
