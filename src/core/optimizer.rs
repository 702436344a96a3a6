use crate::domain::model::Item;
use crate::utils::error::{Result, WarehouseError};
use serde::Serialize;

/// Upper bound on DP table bits: one bit per item plus one `u64` of best
/// value per capacity column (512 MiB).
pub const MAX_TABLE_BITS: u64 = 1 << 32;

pub trait Packable {
    fn size(&self) -> u32;
}

impl Packable for Item {
    fn size(&self) -> u32 {
        self.size
    }
}

impl Packable for u32 {
    fn size(&self) -> u32 {
        *self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection<T> {
    pub items: Vec<T>,
    pub total_size: u64,
}

impl<T> Selection<T> {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_size: 0,
        }
    }
}

/// Picks the fullest load that fits in `capacity`, taking either every
/// constrained item or none of them.
///
/// Ties between "with the constrained group" and "without it" go to the
/// selection without it.
pub fn optimize<T: Packable + Clone>(
    capacity: u32,
    constrained: &[T],
    unconstrained: &[T],
) -> Selection<T> {
    let constrained_size: u64 = constrained.iter().map(|item| u64::from(item.size())).sum();

    let mut with_group = None;
    if constrained_size > 0 && constrained_size <= u64::from(capacity) {
        // constrained_size <= capacity，轉換不會溢位
        let remaining = capacity - constrained_size as u32;
        let rest = max_subset(remaining, unconstrained);

        let mut items = constrained.to_vec();
        items.extend(rest.items);
        with_group = Some(Selection {
            items,
            total_size: constrained_size + rest.total_size,
        });
    }

    let without_group = max_subset(capacity, unconstrained);

    match with_group {
        Some(candidate) if candidate.total_size > without_group.total_size => candidate,
        _ => without_group,
    }
}

/// Bits of DP table `max_subset` would need for `items` under `capacity`.
///
/// Zero when everything fits, since no table is built then.
pub fn table_bits<T: Packable>(capacity: u32, items: &[T]) -> u64 {
    let total: u64 = items.iter().map(|item| u64::from(item.size())).sum();
    if total <= u64::from(capacity) {
        return 0;
    }
    (items.len() as u64 + 64).saturating_mul(u64::from(capacity) + 1)
}

/// Rejects inputs whose DP table would exceed [`MAX_TABLE_BITS`].
///
/// The unconstrained pass under the full capacity is the widest table
/// `optimize` builds.
pub fn check_table_size<T: Packable>(
    capacity: u32,
    constrained: &[T],
    unconstrained: &[T],
) -> Result<()> {
    let bits = table_bits(capacity, unconstrained).max(table_bits(capacity, constrained));
    if bits > MAX_TABLE_BITS {
        return Err(WarehouseError::validation(format!(
            "capacity {} with {} packages needs a {} bit packing table (limit {})",
            capacity,
            constrained.len() + unconstrained.len(),
            bits,
            MAX_TABLE_BITS
        )));
    }
    Ok(())
}

/// Per-item "take" flags, one bit per capacity column.
struct TakeTable {
    words_per_row: usize,
    bits: Vec<u64>,
}

impl TakeTable {
    fn new(rows: usize, width: usize) -> Self {
        let words_per_row = width.div_ceil(64);
        Self {
            words_per_row,
            bits: vec![0; rows * words_per_row],
        }
    }

    fn set(&mut self, row: usize, column: usize) {
        self.bits[row * self.words_per_row + column / 64] |= 1 << (column % 64);
    }

    fn get(&self, row: usize, column: usize) -> bool {
        self.bits[row * self.words_per_row + column / 64] & (1 << (column % 64)) != 0
    }
}

/// Exact 0/1 subset maximising total size within `capacity`.
///
/// Tabulates best value per remaining capacity, walking items from last to
/// first so that row `i` answers "best using items `i..`". Including an item
/// only wins when strictly better than leaving it out.
pub fn max_subset<T: Packable + Clone>(capacity: u32, items: &[T]) -> Selection<T> {
    let total: u64 = items.iter().map(|item| u64::from(item.size())).sum();
    if capacity == 0 || total == 0 {
        return Selection::empty();
    }
    if total <= u64::from(capacity) {
        return Selection {
            items: items.iter().filter(|item| item.size() > 0).cloned().collect(),
            total_size: total,
        };
    }

    let cap = capacity as usize;
    let width = cap + 1;
    let mut best = vec![0u64; width];
    let mut take = TakeTable::new(items.len(), width);

    for (i, item) in items.iter().enumerate().rev() {
        let size = item.size() as usize;
        if size == 0 || size > cap {
            continue;
        }
        for c in (size..=cap).rev() {
            let with = best[c - size] + size as u64;
            if with > best[c] {
                best[c] = with;
                take.set(i, c);
            }
        }
    }

    let mut chosen = Vec::new();
    let mut c = cap;
    for (i, item) in items.iter().enumerate() {
        if take.get(i, c) {
            chosen.push(item.clone());
            c -= item.size() as usize;
        }
    }

    Selection {
        items: chosen,
        total_size: best[cap],
    }
}
