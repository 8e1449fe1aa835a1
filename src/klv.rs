use crate::equity::Equity;
use crate::kwg::Kwg;
use crate::letter_distribution::{LetterDistribution, Tile};
use crate::rack::Rack;
use crate::Error;
use std::convert::TryInto;
use std::fmt;
use std::fs;

/// The leave-value table.
///
/// Shares the lexicon's node layout: every leave (a tile-sorted subrack,
/// blank first) is a "word" of an automaton, and its word index — the
/// number of accepting entries before it in tile-sorted order — keys the
/// value array. Per-node accepting-descendant counts make the index walk
/// O(1) per sibling skipped. Immutable after load.
#[derive(Clone)]
pub struct Klv {
    kwg: Kwg,
    word_counts: Vec<u32>,
    leave_values: Vec<Equity>,
    max_value: Equity,
}

impl fmt::Debug for Klv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Klv: {} leaves>", self.leave_values.len())
    }
}

fn count_words_at(kwg: &Kwg, counts: &mut [u32], index: u32) -> u32 {
    if index as usize >= counts.len() {
        return 0;
    }
    debug_assert_ne!(counts[index as usize], u32::MAX, "cycle in leave graph");
    if counts[index as usize] == 0 {
        counts[index as usize] = u32::MAX;
        let node = kwg.node(index);
        let own = Kwg::accepts(node) as u32;
        let arc = Kwg::arc_index(node);
        let child = if arc == 0 {
            0
        } else {
            count_words_at(kwg, counts, arc)
        };
        let sibling = if Kwg::is_end(node) {
            0
        } else {
            count_words_at(kwg, counts, index + 1)
        };
        counts[index as usize] = own + child + sibling;
    }
    counts[index as usize]
}

fn max_leave(values: &[Equity]) -> Equity {
    values
        .iter()
        .cloned()
        .max()
        .unwrap_or(Equity::ZERO)
        .max(Equity::ZERO)
}

fn compute_word_counts(kwg: &Kwg) -> Vec<u32> {
    let mut counts = vec![0u32; kwg.num_nodes()];
    for p in (0..kwg.num_nodes() as u32).rev() {
        count_words_at(kwg, &mut counts, p);
    }
    counts
}

impl Klv {
    /// Decode a leave blob: little-endian `u32` node count, the packed
    /// automaton nodes, a `u32` leave count, then that many little-endian
    /// `f32` values converted into equity units.
    /// ## Errors
    /// If the blob is truncated.
    pub fn from_bytes(path: &str, bytes: &[u8]) -> Result<Klv, Error> {
        let kwg = Kwg::from_bytes(path, bytes)?;
        let offset = 4 + kwg.num_nodes() * 4;
        if bytes.len() < offset + 4 {
            return Err(Error::TruncatedData {
                path: String::from(path),
                expected: offset + 4,
                got: bytes.len(),
            });
        }
        let num_leaves =
            u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap()) as usize;
        let expected = offset + 4 + num_leaves * 4;
        if bytes.len() < expected {
            return Err(Error::TruncatedData {
                path: String::from(path),
                expected,
                got: bytes.len(),
            });
        }
        let leave_values: Vec<Equity> = bytes[offset + 4..expected]
            .chunks_exact(4)
            .map(|chunk| {
                Equity::from_f64(f32::from_le_bytes(chunk.try_into().unwrap()) as f64)
            })
            .collect();
        let word_counts = compute_word_counts(&kwg);
        let max_value = max_leave(&leave_values);
        Ok(Klv {
            kwg,
            word_counts,
            leave_values,
            max_value,
        })
    }

    /// Read a leave file.
    /// ## Errors
    /// If the file cannot be read or is truncated.
    pub fn from_file(path: &str) -> Result<Klv, Error> {
        let bytes = fs::read(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        let klv = Klv::from_bytes(path, &bytes)?;
        log::info!("loaded {} leave values from {}", klv.num_leaves(), path);
        Ok(klv)
    }

    /// A zero-valued table over the given automaton shape.
    pub fn zeroed_from_kwg(kwg: Kwg) -> Klv {
        let word_counts = compute_word_counts(&kwg);
        let num_leaves = kwg
            .siblings(kwg.dawg_root())
            .next()
            .map(|first| word_counts[first as usize])
            .unwrap_or(0) as usize;
        Klv {
            kwg,
            word_counts,
            leave_values: vec![Equity::ZERO; num_leaves],
            max_value: Equity::ZERO,
        }
    }

    /// Build a table from `(rack, value)` pairs, the way tests and tools
    /// build one without a compiled file. Every prefix of each sorted
    /// rack becomes a keyed leave (value zero unless listed).
    /// ## Errors
    /// If a rack string contains an unknown glyph.
    pub fn from_leaves(
        ld: &LetterDistribution,
        leaves: &[(&str, f64)],
    ) -> Result<Klv, Error> {
        let mut sequences: Vec<Vec<Tile>> = Vec::new();
        for (rack_str, _) in leaves {
            let mut tiles = ld.tiles_from_str(rack_str)?;
            tiles.sort_unstable();
            for end in 1..=tiles.len() {
                sequences.push(tiles[..end].to_vec());
            }
        }
        let kwg = Kwg::from_tile_words(&sequences, false);
        let mut klv = Klv::zeroed_from_kwg(kwg);
        for (rack_str, value) in leaves {
            let tiles = ld.tiles_from_str(rack_str)?;
            let rack = Rack::from_tiles(ld.size(), &tiles);
            let index = klv
                .word_index(&rack)
                .expect("inserted leave must be indexed");
            klv.leave_values[index as usize] = Equity::from_f64(*value);
        }
        klv.max_value = max_leave(&klv.leave_values);
        Ok(klv)
    }

    pub fn num_leaves(&self) -> usize {
        self.leave_values.len()
    }

    /// Largest value in the table (never below zero). An upper bound on
    /// any leave, used by record-best pruning.
    pub fn max_leave_value(&self) -> Equity {
        self.max_value
    }

    pub fn kwg(&self) -> &Kwg {
        &self.kwg
    }

    /// Word index of a leave: walk the automaton over the rack's tiles in
    /// ascending order, counting accepting entries skipped. `None` if the
    /// leave is empty or not keyed.
    pub fn word_index(&self, leave: &Rack) -> Option<u32> {
        if leave.is_empty() {
            return None;
        }
        let tiles = leave.to_tiles();
        let mut node_index = self.kwg.dawg_root();
        let mut index: u32 = 0;
        let last = tiles.len() - 1;
        for (pos, &tile) in tiles.iter().enumerate() {
            loop {
                if node_index == 0 {
                    return None;
                }
                let node = self.kwg.node(node_index);
                if Kwg::tile(node) == tile {
                    break;
                }
                if Kwg::is_end(node) {
                    return None;
                }
                // Skip this sibling's whole subtree of leaves.
                index += self.word_counts[node_index as usize]
                    - self.word_counts[node_index as usize + 1];
                node_index += 1;
            }
            if pos == last {
                return Some(index);
            }
            // The matched node's own leave precedes everything below it.
            index += 1;
            node_index = Kwg::arc_index(self.kwg.node(node_index));
        }
        None
    }

    /// Value at a precomputed word index.
    pub fn indexed_leave_value(&self, index: u32) -> Equity {
        self.leave_values
            .get(index as usize)
            .cloned()
            .unwrap_or(Equity::ZERO)
    }

    /// Equity adjustment for holding this leave. A miss is worth zero and
    /// is never an error: racks with tiles the table does not know simply
    /// have no recorded value.
    pub fn leave_value(&self, leave: &Rack) -> Equity {
        match self.word_index(leave) {
            Some(index) => self.indexed_leave_value(index),
            None => Equity::ZERO,
        }
    }

    /// Serialize into the on-disk blob format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.kwg.to_bytes();
        bytes.extend_from_slice(&(self.leave_values.len() as u32).to_le_bytes());
        for value in &self.leave_values {
            bytes.extend_from_slice(&(value.to_f64() as f32).to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rack(ld: &LetterDistribution, s: &str) -> Rack {
        Rack::from_tiles(ld.size(), &ld.tiles_from_str(s).unwrap())
    }

    #[test]
    fn test_leave_lookup() {
        let ld = LetterDistribution::english();
        let klv = Klv::from_leaves(
            &ld,
            &[("AB", 1.5), ("ABE", 3.25), ("Q", -6.0), ("?S", 24.5)],
        )
        .unwrap();
        assert_eq!(klv.leave_value(&rack(&ld, "AB")), Equity::from_f64(1.5));
        assert_eq!(klv.leave_value(&rack(&ld, "ABE")), Equity::from_f64(3.25));
        assert_eq!(klv.leave_value(&rack(&ld, "Q")), Equity::from_f64(-6.0));
        assert_eq!(klv.leave_value(&rack(&ld, "S?")), Equity::from_f64(24.5));
    }

    #[test]
    fn test_miss_is_zero() {
        let ld = LetterDistribution::english();
        let klv = Klv::from_leaves(&ld, &[("AB", 1.5)]).unwrap();
        assert_eq!(klv.leave_value(&rack(&ld, "ZZ")), Equity::ZERO);
        assert_eq!(klv.leave_value(&Rack::new(ld.size())), Equity::ZERO);
    }

    #[test]
    fn test_indexed_matches_direct() {
        let ld = LetterDistribution::english();
        let klv = Klv::from_leaves(
            &ld,
            &[("AB", 1.5), ("ABE", 3.25), ("Q", -6.0), ("?S", 24.5)],
        )
        .unwrap();
        // Every keyed leave: the listed racks and their sorted prefixes.
        for s in &["AB", "ABE", "Q", "?S", "A", "?"] {
            let r = rack(&ld, s);
            let index = klv.word_index(&r).unwrap();
            assert_eq!(
                klv.leave_value(&r),
                klv.indexed_leave_value(index),
                "leave {}",
                s
            );
        }
    }

    #[test]
    fn test_word_indices_unique_and_dense() {
        let ld = LetterDistribution::english();
        let klv = Klv::from_leaves(&ld, &[("ABC", 1.0), ("ABD", 2.0), ("BD", 3.0)]).unwrap();
        // Keyed leaves are exactly the prefixes of the sorted racks.
        let keyed = ["A", "AB", "ABC", "ABD", "B", "BD"];
        assert_eq!(klv.num_leaves(), keyed.len());
        let mut seen = vec![false; klv.num_leaves()];
        for s in &keyed {
            let index = klv.word_index(&rack(&ld, s)).unwrap() as usize;
            assert!(!seen[index], "duplicate index for {}", s);
            seen[index] = true;
        }
        assert!(seen.iter().all(|&b| b), "indices not dense: {:?}", seen);
        // Subracks outside the keyed set miss cleanly.
        assert_eq!(klv.word_index(&rack(&ld, "C")), None);
    }

    #[test]
    fn test_sorted_order_is_blank_first() {
        let ld = LetterDistribution::english();
        let klv = Klv::from_leaves(&ld, &[("?A", 5.0)]).unwrap();
        // The blank sorts before A, so the index of the blank alone is 0.
        assert_eq!(klv.word_index(&rack(&ld, "?")), Some(0));
        assert_eq!(klv.leave_value(&rack(&ld, "A?")), Equity::from_f64(5.0));
    }

    #[test]
    fn test_blob_round_trip() {
        let ld = LetterDistribution::english();
        let klv = Klv::from_leaves(&ld, &[("AB", 1.5), ("Q", -6.0)]).unwrap();
        let bytes = klv.to_bytes();
        let reloaded = Klv::from_bytes("mem", &bytes).unwrap();
        assert_eq!(reloaded.num_leaves(), klv.num_leaves());
        assert_eq!(
            reloaded.leave_value(&rack(&ld, "AB")),
            Equity::from_f64(1.5)
        );
        assert_eq!(reloaded.leave_value(&rack(&ld, "Q")), Equity::from_f64(-6.0));
    }

    #[test]
    fn test_truncated_blob() {
        let ld = LetterDistribution::english();
        let klv = Klv::from_leaves(&ld, &[("AB", 1.5)]).unwrap();
        let bytes = klv.to_bytes();
        assert!(matches!(
            Klv::from_bytes("mem", &bytes[..bytes.len() - 3]),
            Err(Error::TruncatedData { .. })
        ));
    }
}
