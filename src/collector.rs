//! Reference consumer of the record stream
//!
//! Folds decoded records into live-heap totals. Used by the
//! `memtrace-collector` binary and by tests that check what a collector
//! would see.

use crate::wire::DecodedRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Live-heap totals derived from a record stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LedgerSummary {
    pub allocations: u64,
    pub frees: u64,
    pub live_blocks: usize,
    pub live_bytes: u64,
    pub peak_bytes: u64,
    /// Allocations that returned a null block
    pub failed_allocations: u64,
    /// Frees of blocks the ledger never saw allocated
    pub unmatched_frees: u64,
}

/// Tracks which blocks are live
#[derive(Debug, Default)]
pub struct HeapLedger {
    live: HashMap<u32, u32>,
    summary: LedgerSummary,
}

impl HeapLedger {
    pub fn new() -> Self {
        HeapLedger::default()
    }

    pub fn record(&mut self, record: &DecodedRecord) {
        match record {
            DecodedRecord::Allocation(alloc) => {
                self.summary.allocations += 1;
                if alloc.address == 0 {
                    self.summary.failed_allocations += 1;
                    return;
                }
                // A reused address without a seen free replaces the old block
                if let Some(old) = self.live.insert(alloc.address, alloc.size) {
                    self.summary.live_bytes -= u64::from(old);
                }
                self.summary.live_bytes += u64::from(alloc.size);
                self.summary.peak_bytes = self.summary.peak_bytes.max(self.summary.live_bytes);
            }
            DecodedRecord::Free(free) => {
                self.summary.frees += 1;
                if free.address == 0 {
                    return;
                }
                match self.live.remove(&free.address) {
                    Some(size) => self.summary.live_bytes -= u64::from(size),
                    None => self.summary.unmatched_frees += 1,
                }
            }
        }
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            live_blocks: self.live.len(),
            ..self.summary
        }
    }

    /// Size of a live block
    pub fn size_of(&self, address: u32) -> Option<u32> {
        self.live.get(&address).copied()
    }
}

impl Extend<DecodedRecord> for HeapLedger {
    fn extend<I: IntoIterator<Item = DecodedRecord>>(&mut self, records: I) {
        for record in records {
            self.record(&record);
        }
    }
}
