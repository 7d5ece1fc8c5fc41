//! Gas price tiers for the built-in `get_gas_prices` tool

use serde::Serialize;

use super::client::ChainClient;
use super::TxError;

pub const FEE_HISTORY_BLOCKS: u64 = 10;
pub const FEE_PERCENTILES: [f64; 4] = [10.0, 50.0, 75.0, 95.0];
/// Legacy multipliers in percent for slow, standard, fast and instant.
pub const LEGACY_MULTIPLIERS: [u128; 4] = [90, 100, 120, 150];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasTier {
    /// Max fee per gas (fee market) or gas price (legacy), in wei
    pub max_fee_per_gas: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    pub gwei: String,
}

impl GasTier {
    fn fee_market(max_fee: u128, priority: u128) -> Self {
        Self {
            max_fee_per_gas: max_fee.to_string(),
            max_priority_fee_per_gas: Some(priority.to_string()),
            gwei: to_gwei(max_fee),
        }
    }

    fn legacy(gas_price: u128) -> Self {
        Self {
            max_fee_per_gas: gas_price.to_string(),
            max_priority_fee_per_gas: None,
            gwei: to_gwei(gas_price),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasPrices {
    /// `eip1559` or `legacy`
    pub pricing: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<String>,
    pub slow: GasTier,
    pub standard: GasTier,
    pub fast: GasTier,
    pub instant: GasTier,
}

fn to_gwei(wei: u128) -> String {
    format!("{:.2}", wei as f64 / 1e9)
}

/// Tiers from fee history. `base_fees` includes the next block's base fee last;
/// `rewards[block][i]` is the priority fee paid at `FEE_PERCENTILES[i]`.
pub fn tiers_from_fee_history(base_fees: &[u128], rewards: &[Vec<u128>]) -> Option<GasPrices> {
    let next_base = *base_fees.last()?;
    if next_base == 0 || rewards.is_empty() {
        return None;
    }

    let mut priorities = [0u128; 4];
    for (i, slot) in priorities.iter_mut().enumerate() {
        let samples: Vec<u128> = rewards.iter().filter_map(|r| r.get(i).copied()).collect();
        if samples.is_empty() {
            return None;
        }
        *slot = samples.iter().sum::<u128>() / samples.len() as u128;
    }

    let tier = |p: u128| GasTier::fee_market(next_base.saturating_mul(2).saturating_add(p), p);
    Some(GasPrices {
        pricing: "eip1559",
        base_fee_per_gas: Some(next_base.to_string()),
        slow: tier(priorities[0]),
        standard: tier(priorities[1]),
        fast: tier(priorities[2]),
        instant: tier(priorities[3]),
    })
}

pub fn tiers_from_gas_price(gas_price: u128) -> GasPrices {
    let tier = |pct: u128| GasTier::legacy(gas_price.saturating_mul(pct) / 100);
    GasPrices {
        pricing: "legacy",
        base_fee_per_gas: None,
        slow: tier(LEGACY_MULTIPLIERS[0]),
        standard: tier(LEGACY_MULTIPLIERS[1]),
        fast: tier(LEGACY_MULTIPLIERS[2]),
        instant: tier(LEGACY_MULTIPLIERS[3]),
    }
}

/// Current tiers. Falls back to legacy multipliers when fee history is unavailable.
pub async fn gas_prices(client: &ChainClient) -> Result<GasPrices, TxError> {
    match client.fee_history(FEE_HISTORY_BLOCKS, &FEE_PERCENTILES).await {
        Ok(history) => {
            let rewards = history.reward.unwrap_or_default();
            if let Some(prices) = tiers_from_fee_history(&history.base_fee_per_gas, &rewards) {
                return Ok(prices);
            }
        }
        Err(e) => tracing::debug!(error = %e, "fee history unavailable, using legacy pricing"),
    }
    let gas_price = client.gas_price().await?;
    Ok(tiers_from_gas_price(gas_price))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u128 = 1_000_000_000;

    #[test]
    fn test_fee_market_tiers() {
        let base_fees = vec![10 * GWEI, 12 * GWEI, 20 * GWEI];
        let rewards = vec![
            vec![GWEI, 2 * GWEI, 3 * GWEI, 5 * GWEI],
            vec![GWEI, 2 * GWEI, 5 * GWEI, 7 * GWEI],
        ];
        let prices = tiers_from_fee_history(&base_fees, &rewards).unwrap();
        assert_eq!(prices.pricing, "eip1559");
        assert_eq!(prices.slow.max_fee_per_gas, (41 * GWEI).to_string());
        assert_eq!(prices.fast.max_priority_fee_per_gas, Some((4 * GWEI).to_string()));
        assert_eq!(prices.instant.gwei, "46.00");
    }

    #[test]
    fn test_empty_history_has_no_tiers() {
        assert!(tiers_from_fee_history(&[], &[]).is_none());
        assert!(tiers_from_fee_history(&[0], &[vec![1, 2, 3, 4]]).is_none());
        assert!(tiers_from_fee_history(&[GWEI], &[]).is_none());
    }

    #[test]
    fn test_legacy_tiers() {
        let prices = tiers_from_gas_price(10 * GWEI);
        assert_eq!(prices.pricing, "legacy");
        assert_eq!(prices.slow.max_fee_per_gas, (9 * GWEI).to_string());
        assert_eq!(prices.standard.max_fee_per_gas, (10 * GWEI).to_string());
        assert_eq!(prices.fast.max_fee_per_gas, (12 * GWEI).to_string());
        assert_eq!(prices.instant.max_fee_per_gas, (15 * GWEI).to_string());
        assert!(prices.instant.max_priority_fee_per_gas.is_none());
    }
}
