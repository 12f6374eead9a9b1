use crate::core::model::{AlphabetHist, Symbol, percent};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlphabetRow {
    pub symbol: Symbol,
    pub count: u64,
    pub percent: f64,
}

/// Symbol frequencies with the ambiguous base split out so it always renders last.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AlphabetTable {
    pub rows: Vec<AlphabetRow>,
    pub ambiguous: Option<AlphabetRow>,
}

impl AlphabetTable {
    pub fn build(hist: &AlphabetHist, total_bases: u64) -> Self {
        let mut rows = Vec::new();
        let mut ambiguous = None;
        for (symbol, count) in hist.iter() {
            let row = AlphabetRow {
                symbol,
                count,
                percent: percent(count, total_bases),
            };
            if symbol == Symbol::N {
                ambiguous = Some(row);
            } else {
                rows.push(row);
            }
        }
        Self { rows, ambiguous }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AlphabetRow> {
        self.rows.iter().chain(self.ambiguous.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_is_reported_after_other_symbols() {
        let mut hist = AlphabetHist::default();
        for &b in b"NNACGTT" {
            hist.add(Symbol(b));
        }
        let table = AlphabetTable::build(&hist, 7);
        let order: Vec<String> = table.iter().map(|r| r.symbol.to_string()).collect();
        assert_eq!(order, vec!["A", "C", "G", "T", "N"]);
        let n = table.ambiguous.as_ref().unwrap();
        assert_eq!(n.count, 2);
        assert!((n.percent - 200.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn no_ambiguous_row_without_n() {
        let mut hist = AlphabetHist::default();
        hist.add(Symbol(b'A'));
        let table = AlphabetTable::build(&hist, 1);
        assert!(table.ambiguous.is_none());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].percent, 100.0);
    }
}
