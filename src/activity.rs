//! Address activity tracking
//!
//! Folds fetched blocks into a running address -> transaction count map
//! and ranks the most active addresses. Blocks are folded one at a time
//! after the fetch phase, so the map needs no synchronization.

use crate::erc20::{decode_transfer_recipient, is_transfer_call};
use crate::types::Block;
use alloy_primitives::Address;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use tracing::debug;

/// Block-processing tracker.
///
/// Trackers receive blocks in window order and keep whatever running
/// state they need.
pub trait BlockTracker {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Fold one block into the tracker's state.
    fn update(&mut self, block: &Block);
}

/// Feed every block of a window to a tracker.
pub fn fold_blocks<T: BlockTracker + ?Sized>(tracker: &mut T, blocks: &[Block]) {
    for block in blocks {
        tracker.update(block);
    }
    debug!("{} folded {} blocks", tracker.name(), blocks.len());
}

/// Which transactions count towards an address's activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum CountingMode {
    /// Every transaction: sender plus recipient. For ERC-20 `transfer`
    /// calls the decoded token recipient stands in for the raw `to`.
    #[value(name = "all")]
    AllTransactions,
    /// Only ERC-20 `transfer` calls: sender plus decoded token recipient.
    #[default]
    #[value(name = "erc20")]
    Erc20Only,
}

/// One entry of the ranked output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressActivity {
    #[serde(serialize_with = "serialize_address")]
    pub address: Address,
    pub activity: u64,
}

fn serialize_address<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{:x}", address))
}

/// Running per-address activity counts.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    mode: CountingMode,
    activities: HashMap<Address, u64>,
    blocks_seen: u64,
    transactions_counted: u64,
    skipped_decodes: u64,
}

impl ActivityTracker {
    pub fn new(mode: CountingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> CountingMode {
        self.mode
    }

    /// Activity count for one address (zero if never seen).
    pub fn activity_of(&self, address: &Address) -> u64 {
        self.activities.get(address).copied().unwrap_or(0)
    }

    pub fn distinct_addresses(&self) -> usize {
        self.activities.len()
    }

    pub fn blocks_seen(&self) -> u64 {
        self.blocks_seen
    }

    /// Transactions that credited at least their sender.
    pub fn transactions_counted(&self) -> u64 {
        self.transactions_counted
    }

    /// `transfer` calls dropped because the recipient did not decode.
    pub fn skipped_decodes(&self) -> u64 {
        self.skipped_decodes
    }

    fn credit(&mut self, address: Address) {
        *self.activities.entry(address).or_insert(0) += 1;
    }

    /// The `k` most active addresses, most active first.
    ///
    /// Equal counts are ordered by ascending address so the ranking is
    /// stable across runs.
    pub fn top_addresses(&self, k: usize) -> Vec<AddressActivity> {
        let mut ranked: Vec<AddressActivity> = self
            .activities
            .iter()
            .map(|(address, activity)| AddressActivity {
                address: *address,
                activity: *activity,
            })
            .collect();

        ranked.sort_unstable_by(|a, b| {
            b.activity
                .cmp(&a.activity)
                .then_with(|| a.address.cmp(&b.address))
        });
        ranked.truncate(k);
        ranked
    }
}

impl BlockTracker for ActivityTracker {
    fn name(&self) -> &'static str {
        "ActivityTracker"
    }

    fn update(&mut self, block: &Block) {
        for tx in &block.transactions {
            let recipient = if is_transfer_call(&tx.input) {
                match decode_transfer_recipient(&tx.input) {
                    Ok(recipient) => Some(recipient),
                    Err(e) => {
                        debug!("Skipping transfer {:?} in block {}: {}", tx.hash, block.number, e);
                        self.skipped_decodes += 1;
                        continue;
                    }
                }
            } else {
                match self.mode {
                    CountingMode::AllTransactions => tx.to,
                    CountingMode::Erc20Only => continue,
                }
            };

            self.credit(tx.from);
            if let Some(recipient) = recipient {
                self.credit(recipient);
            }
            self.transactions_counted += 1;
        }
        self.blocks_seen += 1;
    }
}
