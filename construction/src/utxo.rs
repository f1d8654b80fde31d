//! UTXO selection.
//!
//! Picks which coins an intent should spend. Only ADA-only coins are ever
//! selected: spending a coin that carries native assets would require
//! outputs for those assets, which the intents do not build.
//!
//! Selection holds no lock. Two callers selecting from the same wallet at
//! the same time can pick the same coin; the second submission then fails
//! at the gateway and the caller rebuilds.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::error::{ConstructionError, Result};
use crate::gateway::types::Coin;

/// A spendable coin reduced to what selection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    /// `<tx hash>#<output index>`.
    pub id: String,
    pub lovelace: i64,
    pub has_assets: bool,
}

impl Utxo {
    pub fn new(id: impl Into<String>, lovelace: i64) -> Self {
        Self {
            id: id.into(),
            lovelace,
            has_assets: false,
        }
    }
}

impl TryFrom<&Coin> for Utxo {
    type Error = ConstructionError;

    fn try_from(coin: &Coin) -> Result<Self> {
        let has_assets = coin.metadata.as_ref().map_or(false, |meta| {
            meta.values().any(|v| match v {
                Value::Array(items) => !items.is_empty(),
                Value::Object(map) => map
                    .get("assets")
                    .and_then(Value::as_array)
                    .map_or(false, |a| !a.is_empty()),
                _ => false,
            })
        });
        Ok(Self {
            id: coin.coin_identifier.identifier.clone(),
            lovelace: coin.amount.lovelace()?,
            has_assets,
        })
    }
}

/// How to choose coins for a required amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// The smallest single coin worth at least the required amount.
    Single,
    /// Largest coins first, at least `count` of them.
    Multiple { count: usize },
    /// Shuffled coins, accumulated until the amount and `count` are met.
    Random { count: usize },
    /// Exactly the `count` smallest coins, which must cover the amount.
    Consolidate { count: usize },
}

fn sum(utxos: &[Utxo]) -> i64 {
    utxos.iter().map(|u| u.lovelace).sum()
}

/// Accumulates from `ordered` until both thresholds are met.
fn accumulate(ordered: &[Utxo], required: i64, min_count: usize) -> Vec<Utxo> {
    let mut picked = Vec::new();
    let mut total = 0;
    for utxo in ordered {
        picked.push(utxo.clone());
        total += utxo.lovelace;
        if total >= required && picked.len() >= min_count {
            break;
        }
    }
    picked
}

/// Selects coins worth at least `required` lovelace, skipping `exclude`.
pub fn select_utxos(
    available: &[Utxo],
    required: i64,
    strategy: SelectionStrategy,
    exclude: &[String],
) -> Result<Vec<Utxo>> {
    select_utxos_with_rng(available, required, strategy, exclude, &mut rand::thread_rng())
}

/// [`select_utxos`] with an explicit random source for [`SelectionStrategy::Random`].
pub fn select_utxos_with_rng<R: Rng + ?Sized>(
    available: &[Utxo],
    required: i64,
    strategy: SelectionStrategy,
    exclude: &[String],
    rng: &mut R,
) -> Result<Vec<Utxo>> {
    let mut candidates: Vec<Utxo> = available
        .iter()
        .filter(|u| !u.has_assets && !exclude.contains(&u.id))
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(ConstructionError::validation("no ADA-only UTXOs available"));
    }

    let selected = match strategy {
        SelectionStrategy::Single => {
            candidates.sort_by_key(|u| u.lovelace);
            let coin = candidates
                .into_iter()
                .find(|u| u.lovelace >= required)
                .ok_or_else(|| {
                    ConstructionError::validation(format!(
                        "no single UTXO with at least {required} lovelace"
                    ))
                })?;
            vec![coin]
        }
        SelectionStrategy::Multiple { count } => {
            candidates.sort_by_key(|u| std::cmp::Reverse(u.lovelace));
            let picked = accumulate(&candidates, required, count);
            if sum(&picked) < required {
                return Err(ConstructionError::validation(format!(
                    "cannot find {count} UTXOs with total amount {required} lovelace"
                )));
            }
            picked
        }
        SelectionStrategy::Random { count } => {
            candidates.shuffle(rng);
            let picked = accumulate(&candidates, required, count);
            if sum(&picked) < required {
                return Err(ConstructionError::validation(format!(
                    "cannot find UTXOs with total amount {required} lovelace"
                )));
            }
            picked
        }
        SelectionStrategy::Consolidate { count } => {
            candidates.sort_by_key(|u| u.lovelace);
            candidates.truncate(count.max(1));
            if sum(&candidates) < required {
                return Err(ConstructionError::validation(format!(
                    "cannot find enough small UTXOs with total amount {required} lovelace"
                )));
            }
            candidates
        }
    };

    debug!(
        count = selected.len(),
        total = sum(&selected),
        ?strategy,
        "selected UTXOs"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::types::{Amount, CoinIdentifier};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn wallet() -> Vec<Utxo> {
        vec![
            Utxo::new("a#0", 1_000_000),
            Utxo::new("b#0", 5_000_000),
            Utxo::new("c#0", 3_000_000),
            Utxo {
                id: "nft#0".into(),
                lovelace: 50_000_000,
                has_assets: true,
            },
        ]
    }

    fn ids(utxos: &[Utxo]) -> Vec<&str> {
        utxos.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn single_picks_smallest_sufficient_coin() {
        let picked = select_utxos(&wallet(), 2_500_000, SelectionStrategy::Single, &[]).unwrap();
        assert_eq!(ids(&picked), vec!["c#0"]);
    }

    #[test]
    fn single_never_touches_asset_coins() {
        let err = select_utxos(&wallet(), 10_000_000, SelectionStrategy::Single, &[]).unwrap_err();
        assert!(matches!(err, ConstructionError::Validation(_)));
    }

    #[test]
    fn multiple_takes_largest_first_until_count_and_amount() {
        let picked =
            select_utxos(&wallet(), 1_000_000, SelectionStrategy::Multiple { count: 2 }, &[]).unwrap();
        assert_eq!(ids(&picked), vec!["b#0", "c#0"]);
    }

    #[test]
    fn exclusions_are_honoured() {
        let picked = select_utxos(
            &wallet(),
            2_500_000,
            SelectionStrategy::Single,
            &["c#0".to_string()],
        )
        .unwrap();
        assert_eq!(ids(&picked), vec!["b#0"]);
    }

    #[test]
    fn consolidate_takes_smallest_coins() {
        let picked =
            select_utxos(&wallet(), 3_000_000, SelectionStrategy::Consolidate { count: 2 }, &[])
                .unwrap();
        assert_eq!(ids(&picked), vec!["a#0", "c#0"]);
        assert!(
            select_utxos(&wallet(), 5_000_000, SelectionStrategy::Consolidate { count: 2 }, &[])
                .is_err()
        );
    }

    #[test]
    fn random_meets_required_amount() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = select_utxos_with_rng(
            &wallet(),
            8_000_000,
            SelectionStrategy::Random { count: 1 },
            &[],
            &mut rng,
        )
        .unwrap();
        assert!(sum(&picked) >= 8_000_000);
        assert!(picked.iter().all(|u| !u.has_assets));
    }

    #[test]
    fn coin_with_token_bundle_is_flagged() {
        let coin = Coin {
            coin_identifier: CoinIdentifier {
                identifier: "tok#1".into(),
            },
            amount: Amount::ada(2_000_000),
            metadata: json!({"tok#1": [{"policyId": "ab", "tokens": []}]})
                .as_object()
                .cloned(),
        };
        let utxo = Utxo::try_from(&coin).unwrap();
        assert!(utxo.has_assets);
        assert_eq!(utxo.lovelace, 2_000_000);
    }
}
