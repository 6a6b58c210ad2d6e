use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;

use super::error::QueueError;

/// Processing state of one tracked block number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTask {
    /// A worker currently holds this number.
    pub is_processing: bool,
    /// Set once the block has been announced; never cleared.
    pub has_published: bool,
    /// Number of failed attempts so far.
    pub attempt_count: u64,
    pub last_attempted_at: Instant,
    /// Monotonic stamp taken with `last_attempted_at`, orders equal instants.
    sequence: u64,
}

impl BlockTask {
    /// Failed at least once and not held by any worker.
    pub fn is_retry_eligible(&self) -> bool {
        self.attempt_count > 0 && !self.is_processing
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub tracked: usize,
    pub processing: usize,
    pub retry_eligible: usize,
    pub published: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    blocks: HashMap<u64, BlockTask>,
    next_sequence: u64,
}

impl QueueState {
    fn stamp(&mut self) -> (Instant, u64) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        (Instant::now(), sequence)
    }
}

/// Concurrency-safe tracker of in-flight and retry-pending block numbers.
///
/// Construct one per process and share it by `Arc` with every worker. All
/// methods are synchronous and take the lock for the duration of a single map
/// operation or scan, so they are safe to call from async tasks.
#[derive(Debug, Default)]
pub struct BlockProcessorQueue {
    state: RwLock<QueueState>,
}

impl BlockProcessorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `number` on behalf of the caller.
    ///
    /// Returns `true` when the number was unseen: the caller now holds it and
    /// must process it directly. Returns `false` without touching state when
    /// the number is already tracked; retries for it come out of [`next`](Self::next).
    pub fn enqueue(&self, number: u64) -> bool {
        let mut state = self.state.write();
        if state.blocks.contains_key(&number) {
            return false;
        }

        let (last_attempted_at, sequence) = state.stamp();
        state.blocks.insert(
            number,
            BlockTask {
                is_processing: true,
                has_published: false,
                attempt_count: 0,
                last_attempted_at,
                sequence,
            },
        );
        true
    }

    /// Whether the block is tracked and has not been announced yet.
    pub fn can_publish(&self, number: u64) -> bool {
        self.state
            .read()
            .blocks
            .get(&number)
            .is_some_and(|task| !task.has_published)
    }

    /// Record that the block has been announced. Idempotent for tracked numbers.
    pub fn set_published(&self, number: u64) -> Result<(), QueueError> {
        let mut state = self.state.write();
        let task = state
            .blocks
            .get_mut(&number)
            .ok_or(QueueError::NotFound(number))?;
        task.has_published = true;
        Ok(())
    }

    /// Release the block after a failed attempt, making it retry-eligible.
    pub fn set_failed(&self, number: u64) -> Result<(), QueueError> {
        let mut state = self.state.write();
        let (now, sequence) = state.stamp();
        let task = state
            .blocks
            .get_mut(&number)
            .ok_or(QueueError::NotFound(number))?;

        task.is_processing = false;
        task.attempt_count += 1;
        task.last_attempted_at = now;
        task.sequence = sequence;
        Ok(())
    }

    /// Forget the block after it has been processed successfully.
    pub fn done(&self, number: u64) -> Result<(), QueueError> {
        self.state
            .write()
            .blocks
            .remove(&number)
            .map(|_| ())
            .ok_or(QueueError::NotFound(number))
    }

    /// Claim the retry-eligible block whose last attempt is oldest.
    ///
    /// Selection and the claim happen under one write lock: the returned
    /// number is already marked as processing, so concurrent callers never
    /// receive the same block. The caller must report the outcome with
    /// [`set_failed`](Self::set_failed) or [`done`](Self::done).
    pub fn next(&self) -> Result<u64, QueueError> {
        let mut state = self.state.write();

        let number = state
            .blocks
            .iter()
            .filter(|(_, task)| task.is_retry_eligible())
            .min_by_key(|(number, task)| (task.last_attempted_at, task.sequence, **number))
            .map(|(number, _)| *number)
            .ok_or(QueueError::Empty)?;

        if let Some(task) = state.blocks.get_mut(&number) {
            task.is_processing = true;
        }
        Ok(number)
    }

    /// Copy of the tracked state for `number`, if any.
    pub fn get(&self, number: u64) -> Option<BlockTask> {
        self.state.read().blocks.get(&number).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.read();
        state
            .blocks
            .values()
            .fold(QueueStats::default(), |mut stats, task| {
                stats.tracked += 1;
                stats.processing += usize::from(task.is_processing);
                stats.retry_eligible += usize::from(task.is_retry_eligible());
                stats.published += usize::from(task.has_published);
                stats
            })
    }
}
