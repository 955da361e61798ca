//! Consistency checks and debug dumps of the map.

use horizon_items_core::PerfSpan;
use horizon_items_core::logging::{span_names, targets};

use crate::collection::{ItemValue, ViewItem};

use super::block::BlockSummary;
use super::container_generator::ItemContainerGenerator;
use super::error::{EntryMismatch, GeneratorError, InconsistencyReport, Result};

/// Mismatching entries listed in a report before the rest are dropped.
const MAX_REPORTED_MISMATCHES: usize = 10;

impl<T: ItemValue> ItemContainerGenerator<T> {
    /// Checks the map against the live source.
    ///
    /// Compares the item count, every realized item and the container links,
    /// and the block chain invariants. Meant for tracking down collections
    /// that raise the wrong change notifications.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::Inconsistent`] with a report of everything found.
    pub fn verify(&self) -> Result<()> {
        let _span = PerfSpan::new(span_names::VERIFY);
        let (source, recorded_len, realized, mut structural, last_change) = {
            let inner = self.inner.lock();
            let realized: Vec<(usize, ViewItem<T>, _)> = inner
                .chain
                .realized_from(0)
                .map(|(slot, entry)| (slot.index, entry.item.clone(), entry.container))
                .collect();
            (
                inner.source.clone(),
                inner.chain.total_items(),
                realized,
                inner.chain.structural_problems(),
                inner.last_change.clone(),
            )
        };

        let source_len = source.len();
        let mut mismatches = Vec::new();
        for (index, recorded, container) in realized {
            let linked = self.store().item(container);
            if linked.as_ref() != Some(&recorded) {
                structural.push(format!(
                    "container at item {index} is linked to {linked:?} instead of {recorded:?}"
                ));
            }
            let actual = source.get(index);
            if actual.as_ref() != Some(&recorded) && mismatches.len() < MAX_REPORTED_MISMATCHES {
                mismatches.push(EntryMismatch {
                    index,
                    recorded: format!("{recorded:?}"),
                    actual: actual.map_or_else(|| "missing".to_string(), |item| format!("{item:?}")),
                });
            }
        }

        let report = InconsistencyReport {
            source_name: source.source_name().to_string(),
            source_len,
            recorded_len,
            mismatches,
            structural,
            last_change,
        };
        if report.is_empty() {
            return Ok(());
        }
        tracing::error!(
            target: targets::GENERATOR,
            generator = ?self.id(),
            %report,
            "generator is inconsistent with its items source"
        );
        Err(GeneratorError::Inconsistent(Box::new(report)))
    }

    /// One-line dump of the block chain, e.g. `[Realized{"a", "b"}, Unrealized{3}]`.
    pub fn chain_debug(&self) -> String {
        self.inner.lock().chain.to_string()
    }

    /// The block chain as a list of block summaries.
    pub fn block_layout(&self) -> Vec<BlockSummary<T>> {
        self.inner.lock().chain.summary()
    }
}
