//! Known contract standards and subset-based detection

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Standard {
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC1155")]
    Erc1155,
    #[serde(rename = "ERC4626")]
    Erc4626,
}

impl Standard {
    pub fn name(&self) -> &'static str {
        match self {
            Standard::Erc20 => "ERC20",
            Standard::Erc721 => "ERC721",
            Standard::Erc1155 => "ERC1155",
            Standard::Erc4626 => "ERC4626",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Standard::Erc20 => "Fungible token",
            Standard::Erc721 => "Non-fungible token",
            Standard::Erc1155 => "Multi-token",
            Standard::Erc4626 => "Tokenized vault",
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct StandardRequirements {
    standard: Standard,
    functions: &'static [&'static str],
    events: &'static [&'static str],
}

/// Most specific first: a vault is also an ERC20, so it must be tried before it.
const STANDARDS: &[StandardRequirements] = &[
    StandardRequirements {
        standard: Standard::Erc1155,
        functions: &[
            "balanceOf",
            "balanceOfBatch",
            "setApprovalForAll",
            "isApprovedForAll",
            "safeTransferFrom",
            "safeBatchTransferFrom",
        ],
        events: &["TransferSingle", "TransferBatch", "ApprovalForAll"],
    },
    StandardRequirements {
        standard: Standard::Erc4626,
        functions: &[
            "asset",
            "totalAssets",
            "convertToShares",
            "convertToAssets",
            "deposit",
            "mint",
            "withdraw",
            "redeem",
            "totalSupply",
            "balanceOf",
            "transfer",
        ],
        events: &["Deposit", "Withdraw", "Transfer"],
    },
    StandardRequirements {
        standard: Standard::Erc721,
        functions: &[
            "balanceOf",
            "ownerOf",
            "safeTransferFrom",
            "transferFrom",
            "approve",
            "setApprovalForAll",
            "getApproved",
            "isApprovedForAll",
        ],
        events: &["Transfer", "Approval", "ApprovalForAll"],
    },
    StandardRequirements {
        standard: Standard::Erc20,
        functions: &[
            "totalSupply",
            "balanceOf",
            "transfer",
            "transferFrom",
            "approve",
            "allowance",
        ],
        events: &["Transfer", "Approval"],
    },
];

/// Return the first standard whose required function and event names are all present.
pub fn detect_standard(functions: &HashSet<&str>, events: &HashSet<&str>) -> Option<Standard> {
    STANDARDS
        .iter()
        .find(|req| {
            req.functions.iter().all(|f| functions.contains(f))
                && req.events.iter().all(|e| events.contains(e))
        })
        .map(|req| req.standard)
}
