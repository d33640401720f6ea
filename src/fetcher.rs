//! Concurrent block window fetcher
//!
//! Fetches the `count` most recent blocks, one unit of work per block,
//! with a bounded number of units in flight. Each unit retries its own
//! block a fixed number of times. Results land in a pre-sized slot per
//! offset, so slot `i` always holds height `head - i` whatever order the
//! units finish in.

use crate::chain::ChainReader;
use crate::error::{Error, Result};
use crate::rpc::RpcTransport;
use crate::types::Block;
use alloy_primitives::U256;
use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// What to do when some blocks of the window cannot be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Any failed block fails the whole window.
    #[default]
    Strict,
    /// Return what was fetched and list the failed slots.
    Partial,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Retries after the first attempt, per block
    pub max_retries: u32,
    /// Pause between attempts for the same block
    pub retry_delay: Duration,
    /// Upper bound on blocks being fetched at the same time
    pub max_in_flight: usize,
    pub policy: FailurePolicy,
    /// Deadline for a whole window, if any
    pub timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            max_in_flight: 16,
            policy: FailurePolicy::Strict,
            timeout: None,
        }
    }
}

/// A slot of the window that could not be filled.
#[derive(Debug)]
pub struct FailedSlot {
    pub index: usize,
    pub height: U256,
    pub error: Error,
}

/// Result of fetching a window of blocks ending at `head`.
#[derive(Debug)]
pub struct Window {
    pub head: U256,
    /// Slot `i` holds height `head - i`; `None` only for failed slots.
    pub blocks: Vec<Option<Block>>,
    /// Failed slots in ascending index order
    pub failures: Vec<FailedSlot>,
}

impl Window {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fetched blocks in slot order, skipping failed slots.
    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks.into_iter().flatten().collect()
    }
}

/// Fetches head-relative windows of blocks through a [`ChainReader`].
pub struct BlockFetcher<T> {
    reader: ChainReader<T>,
    config: FetchConfig,
}

impl<T: RpcTransport> BlockFetcher<T> {
    pub fn new(reader: ChainReader<T>, config: FetchConfig) -> Self {
        Self { reader, config }
    }

    /// Fetch exactly `count` blocks, head first.
    ///
    /// Fails with the first failed slot if any block cannot be fetched,
    /// whatever the configured policy.
    pub async fn fetch(&self, count: usize) -> Result<Vec<Block>> {
        let window = self
            .with_timeout(self.collect(count, FailurePolicy::Strict))
            .await?;
        Ok(window.into_blocks())
    }

    /// Fetch a window of `count` blocks under the configured policy.
    pub async fn fetch_window(&self, count: usize) -> Result<Window> {
        self.with_timeout(self.collect(count, self.config.policy))
            .await
    }

    async fn with_timeout<F, R>(&self, fut: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => fut.await,
        }
    }

    async fn collect(&self, count: usize, policy: FailurePolicy) -> Result<Window> {
        let head = self.reader.latest_height().await?;

        // Heights run from head down to head - (count - 1), which must not go below genesis
        if count > 0 && U256::from((count - 1) as u64) > head {
            return Err(Error::WindowExceedsChain { count, head });
        }

        info!("Fetching {} blocks ending at head {}", count, head);

        let mut blocks: Vec<Option<Block>> = vec![None; count];
        let mut failures = Vec::new();

        let mut units = stream::iter(0..count)
            .map(|index| {
                let height = head - U256::from(index as u64);
                async move { (index, height, self.fetch_with_retry(index, height).await) }
            })
            .buffer_unordered(self.config.max_in_flight.max(1));

        // Drain every unit before deciding, so nothing is left running
        while let Some((index, height, outcome)) = units.next().await {
            match outcome {
                Ok(block) => blocks[index] = Some(block),
                Err(error) => failures.push(FailedSlot {
                    index,
                    height,
                    error,
                }),
            }
        }
        failures.sort_by_key(|failed| failed.index);

        if policy == FailurePolicy::Strict {
            if let Some(first) = failures.into_iter().next() {
                return Err(first.error);
            }
            failures = Vec::new();
        } else if !failures.is_empty() {
            warn!(
                "{} of {} blocks could not be fetched (slots {:?})",
                failures.len(),
                count,
                failures.iter().map(|f| f.index).collect::<Vec<_>>()
            );
        }

        info!(
            "Fetched {} of {} blocks",
            blocks.iter().filter(|b| b.is_some()).count(),
            count
        );

        Ok(Window {
            head,
            blocks,
            failures,
        })
    }

    /// Fetch one block, retrying transport and decode failures.
    async fn fetch_with_retry(&self, index: usize, height: U256) -> Result<Block> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.reader.block_by_number(height).await {
                Ok(block) => return Ok(block),
                Err(e) if attempts <= self.config.max_retries => {
                    warn!(
                        "Block {} (slot {}) attempt {} failed, retrying in {:?}: {}",
                        height, index, attempts, self.config.retry_delay, e
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    return Err(Error::BlockFetch {
                        index,
                        height,
                        attempts,
                        source: Box::new(e),
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{block_json, plain_tx, MockNode, Unreachable, ADDR_X, ADDR_Y};
    use tokio::time::Instant;

    fn fetcher(node: &MockNode, config: FetchConfig) -> BlockFetcher<MockNode> {
        BlockFetcher::new(ChainReader::new(node.clone()), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_is_head_ordered() {
        let node = MockNode::new(1_000).with_latency(Duration::from_millis(5));
        node.set_block(997, block_json(997, vec![plain_tx(ADDR_X, Some(ADDR_Y))]));

        let blocks = fetcher(&node, FetchConfig::default()).fetch(10).await.unwrap();
        assert_eq!(blocks.len(), 10);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.number, U256::from(1_000u64 - i as u64));
        }
        assert_eq!(blocks[3].transactions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_zero_blocks() {
        let node = MockNode::new(50);
        let blocks = fetcher(&node, FetchConfig::default()).fetch(0).await.unwrap();
        assert!(blocks.is_empty());
        assert_eq!(node.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_recover() {
        let node = MockNode::new(1_000);
        node.fail_block(998, 3);

        let start = Instant::now();
        let blocks = fetcher(&node, FetchConfig::default()).fetch(5).await.unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[2].number, U256::from(998u64));
        assert_eq!(node.block_requests(998), 4);
        assert_eq!(node.block_requests(999), 1);
        // Three retry pauses of two seconds each
        assert!(start.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_fail_the_window() {
        let node = MockNode::new(1_000);
        node.fail_block(997, 4);

        let err = fetcher(&node, FetchConfig::default()).fetch(10).await.unwrap_err();
        match err {
            Error::BlockFetch {
                index,
                height,
                attempts,
                source,
            } => {
                assert_eq!(index, 3);
                assert_eq!(height, U256::from(997u64));
                assert_eq!(attempts, 4);
                assert!(matches!(*source, Error::Transport(_)));
            }
            other => panic!("expected block fetch error, got {:?}", other),
        }
        // Every other unit still ran to completion
        for height in 991..=1_000u64 {
            assert!(node.block_requests(height) >= 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_fetch_ignores_partial_policy() {
        let node = MockNode::new(1_000);
        node.fail_block(1_000, 10);
        let config = FetchConfig {
            policy: FailurePolicy::Partial,
            max_retries: 1,
            ..FetchConfig::default()
        };
        assert!(fetcher(&node, config).fetch(3).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_policy_reports_failed_slots() {
        let node = MockNode::new(1_000);
        node.fail_block(999, 10);
        let config = FetchConfig {
            policy: FailurePolicy::Partial,
            max_retries: 2,
            ..FetchConfig::default()
        };

        let window = fetcher(&node, config).fetch_window(4).await.unwrap();
        assert_eq!(window.head, U256::from(1_000u64));
        assert!(!window.is_complete());
        assert_eq!(window.failures.len(), 1);
        assert_eq!(window.failures[0].index, 1);
        assert_eq!(window.failures[0].height, U256::from(999u64));
        assert!(window.blocks[1].is_none());
        assert_eq!(node.block_requests(999), 3);

        let blocks = window.into_blocks();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].number, U256::from(998u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_near_genesis() {
        let node = MockNode::new(4);
        let blocks = fetcher(&node, FetchConfig::default()).fetch(5).await.unwrap();
        assert_eq!(blocks.last().unwrap().number, U256::ZERO);

        let err = fetcher(&node, FetchConfig::default()).fetch(6).await.unwrap_err();
        assert!(matches!(err, Error::WindowExceedsChain { count: 6, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_bound() {
        let node = MockNode::new(1_000).with_latency(Duration::from_millis(100));
        let config = FetchConfig {
            max_in_flight: 4,
            ..FetchConfig::default()
        };

        let blocks = fetcher(&node, config).fetch(20).await.unwrap();
        assert_eq!(blocks.len(), 20);
        assert!(node.peak_in_flight() <= 4);
        assert!(node.peak_in_flight() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let node = MockNode::new(1_000).with_latency(Duration::from_secs(10));
        let config = FetchConfig {
            timeout: Some(Duration::from_secs(1)),
            ..FetchConfig::default()
        };

        let err = fetcher(&node, config).fetch(3).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_head_failure_is_not_retried() {
        let fetcher = BlockFetcher::new(ChainReader::new(Unreachable), FetchConfig::default());
        assert!(matches!(fetcher.fetch(3).await, Err(Error::Transport(_))));
    }
}
