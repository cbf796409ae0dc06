//! Literal codec: (row, col, value) ⇄ signed DIMACS literals, and the dense
//! compressed variable space over still-open candidates

use super::Board;

impl Board {
    /// Raw literal asserting that cell `(row, col)` holds `value`.
    #[inline]
    pub fn lit(&self, row: usize, col: usize, value: usize) -> i32 {
        debug_assert!(value >= 1 && value <= self.side());
        (1 + self.idx(row, col) * self.side() + (value - 1)) as i32
    }

    /// Inverse of [`Board::lit`] for a positive raw literal.
    pub fn decompose(&self, lit: i32) -> (usize, usize, usize) {
        let n = self.side();
        let mut rest = lit.unsigned_abs() as usize - 1;
        let value = 1 + rest % n;
        rest /= n;
        let col = rest % n;
        let row = rest / n;
        (row, col, value)
    }
}

/// Bijection between raw literals whose candidate bit is still set and the
/// dense range `1..=len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedMapping {
    /// Indexed by raw literal; 0 means the literal is settled.
    lit_to_compressed: Vec<i32>,
    /// Indexed by compressed id - 1.
    compressed_to_lit: Vec<i32>,
}

impl CompressedMapping {
    /// Number the surviving candidates in increasing raw-literal order.
    ///
    /// Run after every known elimination has been applied to the board, so
    /// settled literals never enter the compressed space.
    pub fn build(board: &Board) -> Self {
        let raw = board.literal_count();
        let mut lit_to_compressed = vec![0; raw + 1];
        let mut compressed_to_lit = Vec::with_capacity(board.num_candidates());
        for lit in 1..=raw as i32 {
            if board.is_candidate_lit(lit) {
                compressed_to_lit.push(lit);
                lit_to_compressed[lit as usize] = compressed_to_lit.len() as i32;
            }
        }
        Self {
            lit_to_compressed,
            compressed_to_lit,
        }
    }

    /// Identity mapping over the full raw space of `board`.
    pub fn identity(board: &Board) -> Self {
        let raw = board.literal_count() as i32;
        Self {
            lit_to_compressed: (0..=raw).collect(),
            compressed_to_lit: (1..=raw).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.compressed_to_lit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compressed_to_lit.is_empty()
    }

    /// Compressed literal for a signed raw literal, keeping the sign.
    pub fn compress(&self, lit: i32) -> Option<i32> {
        let id = *self.lit_to_compressed.get(lit.unsigned_abs() as usize)?;
        match id {
            0 => None,
            id if lit < 0 => Some(-id),
            id => Some(id),
        }
    }

    /// Raw literal for a signed compressed literal, keeping the sign.
    pub fn decompress(&self, lit: i32) -> Option<i32> {
        let index = (lit.unsigned_abs() as usize).checked_sub(1)?;
        let raw = *self.compressed_to_lit.get(index)?;
        Some(if lit < 0 { -raw } else { raw })
    }
}

/// Write a solver model back into the board's lookup.
///
/// `model[i]` is the value of variable `i + 1`. When `mapping` is given the
/// variables are compressed ids; otherwise they are raw literals. Entries
/// beyond the cell-variable range (auxiliary variables) are ignored.
pub fn decode_model(board: &mut Board, model: &[bool], mapping: Option<&CompressedMapping>) {
    let cell_vars = mapping.map_or(board.literal_count(), CompressedMapping::len);
    for (index, _) in model.iter().enumerate().take(cell_vars).filter(|(_, value)| **value) {
        let var = index as i32 + 1;
        let raw = match mapping {
            Some(mapping) => match mapping.decompress(var) {
                Some(raw) => raw,
                None => continue,
            },
            None => var,
        };
        let (row, col, value) = board.decompose(raw);
        board.record(row, col, value);
    }
}
