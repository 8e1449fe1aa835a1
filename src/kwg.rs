use crate::letter_distribution::{LetterDistribution, Tile};
use crate::Error;
use std::collections::BTreeMap;
use std::convert::TryInto;
use std::fmt;
use std::fs;

/// Separator tile in gaddag paths, between the reversed prefix and the
/// forward suffix.
pub const GADDAG_SEPARATOR: Tile = 0;

const ARC_INDEX_MASK: u32 = 0x3f_ffff;
const IS_END_FLAG: u32 = 0x40_0000;
const ACCEPTS_FLAG: u32 = 0x80_0000;

/// The lexicon automaton: a flat array of packed 32-bit nodes.
///
/// Each node holds a tile, an `accepts` bit (a word ends here), an
/// `is_end` bit (last sibling in its group) and a 22-bit arc index to its
/// first child. Node 0 points at the DAWG root group, node 1 at the
/// gaddag root group. Immutable after load and shared by reference
/// across threads.
#[derive(Clone)]
pub struct Kwg {
    nodes: Vec<u32>,
}

impl fmt::Debug for Kwg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Kwg: {} nodes>", self.nodes.len())
    }
}

#[inline(always)]
fn pack(tile: Tile, accepts: bool, is_end: bool, arc_index: u32) -> u32 {
    debug_assert!(arc_index <= ARC_INDEX_MASK);
    (tile as u32) << 24
        | (accepts as u32) * ACCEPTS_FLAG
        | (is_end as u32) * IS_END_FLAG
        | arc_index
}

impl Kwg {
    /// Decode a lexicon blob: little-endian `u32` node count followed by
    /// that many little-endian packed nodes.
    /// ## Errors
    /// If the blob is shorter than the header claims.
    pub fn from_bytes(path: &str, bytes: &[u8]) -> Result<Kwg, Error> {
        if bytes.len() < 4 {
            return Err(Error::TruncatedData {
                path: String::from(path),
                expected: 4,
                got: bytes.len(),
            });
        }
        let num_nodes = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let expected = 4 + num_nodes * 4;
        // The two root pointer nodes are the minimum viable graph.
        if num_nodes < 2 {
            return Err(Error::TruncatedData {
                path: String::from(path),
                expected: 4 + 2 * 4,
                got: bytes.len(),
            });
        }
        if bytes.len() < expected {
            return Err(Error::TruncatedData {
                path: String::from(path),
                expected,
                got: bytes.len(),
            });
        }
        let nodes = bytes[4..expected]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(Kwg { nodes })
    }

    /// Read a lexicon file.
    /// ## Errors
    /// If the file cannot be read or is truncated.
    pub fn from_file(path: &str) -> Result<Kwg, Error> {
        let bytes = fs::read(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        let kwg = Kwg::from_bytes(path, &bytes)?;
        log::info!("loaded lexicon from {} ({} nodes)", path, kwg.nodes.len());
        Ok(kwg)
    }

    /// Build an automaton from a word list, the way a test or tool
    /// builds a lexicon without a compiled file. Words are encoded with
    /// the distribution's glyphs.
    /// ## Errors
    /// If a word contains a glyph outside the distribution.
    pub fn from_words(ld: &LetterDistribution, words: &[&str]) -> Result<Kwg, Error> {
        let tile_words: Result<Vec<Vec<Tile>>, Error> =
            words.iter().map(|w| ld.tiles_from_str(w)).collect();
        Ok(Kwg::from_tile_words(&tile_words?, true))
    }

    /// Build an automaton from raw tile sequences. With `build_gaddag`
    /// false only the DAWG side is populated (the shape the leave table
    /// uses, where sequences are tile-sorted racks).
    pub fn from_tile_words(words: &[Vec<Tile>], build_gaddag: bool) -> Kwg {
        let mut dawg = TrieNode::default();
        let mut gaddag = TrieNode::default();
        for tiles in words {
            dawg.insert(tiles);
            if build_gaddag {
                for entry in gaddag_entries(tiles) {
                    gaddag.insert(&entry);
                }
            }
        }
        let mut builder = Builder {
            nodes: vec![0u32; 2],
        };
        let dawg_root = builder.emit(&dawg);
        let gaddag_root = builder.emit(&gaddag);
        builder.nodes[0] = pack(0, false, true, dawg_root);
        builder.nodes[1] = pack(0, false, true, gaddag_root);
        Kwg {
            nodes: builder.nodes,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline(always)]
    pub fn node(&self, index: u32) -> u32 {
        self.nodes[index as usize]
    }

    #[inline(always)]
    pub fn tile(node: u32) -> Tile {
        (node >> 24) as Tile
    }

    #[inline(always)]
    pub fn accepts(node: u32) -> bool {
        node & ACCEPTS_FLAG != 0
    }

    #[inline(always)]
    pub fn is_end(node: u32) -> bool {
        node & IS_END_FLAG != 0
    }

    #[inline(always)]
    pub fn arc_index(node: u32) -> u32 {
        node & ARC_INDEX_MASK
    }

    pub fn dawg_root(&self) -> u32 {
        Kwg::arc_index(self.node(0))
    }

    pub fn gaddag_root(&self) -> u32 {
        Kwg::arc_index(self.node(1))
    }

    /// Scan the sibling group starting at `index` for `tile`. Returns the
    /// matching node index, or 0 if the group ends without a match.
    pub fn seek(&self, index: u32, tile: Tile) -> u32 {
        if index == 0 {
            return 0;
        }
        let mut i = index;
        loop {
            let node = self.node(i);
            if Kwg::tile(node) == tile {
                return i;
            }
            if Kwg::is_end(node) {
                return 0;
            }
            i += 1;
        }
    }

    /// Child group of the node at `index`, following the matching tile:
    /// the next cursor for one more letter of input.
    pub fn advance(&self, index: u32, tile: Tile) -> u32 {
        let found = self.seek(index, tile);
        if found == 0 {
            0
        } else {
            Kwg::arc_index(self.node(found))
        }
    }

    /// Indices of a sibling group, in storage order.
    pub fn siblings(&self, index: u32) -> Siblings<'_> {
        Siblings { kwg: self, index }
    }

    /// True if the tile sequence is a word (walked from the DAWG root).
    pub fn is_word(&self, tiles: &[Tile]) -> bool {
        if tiles.is_empty() {
            return false;
        }
        let mut group = self.dawg_root();
        let mut node_index = 0;
        for &tile in tiles {
            node_index = self.seek(group, tile);
            if node_index == 0 {
                return false;
            }
            group = Kwg::arc_index(self.node(node_index));
        }
        Kwg::accepts(self.node(node_index))
    }

    /// Serialize back into the on-disk blob format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + self.nodes.len() * 4);
        bytes.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());
        for &node in &self.nodes {
            bytes.extend_from_slice(&node.to_le_bytes());
        }
        bytes
    }
}

pub struct Siblings<'a> {
    kwg: &'a Kwg,
    index: u32,
}

impl<'a> Iterator for Siblings<'a> {
    type Item = u32;
    fn next(&mut self) -> Option<u32> {
        if self.index == 0 {
            return None;
        }
        let current = self.index;
        if Kwg::is_end(self.kwg.node(current)) {
            self.index = 0;
        } else {
            self.index = current + 1;
        }
        Some(current)
    }
}

/// Gaddag entries for one word: the full reversal, plus every
/// `rev(prefix) + separator + suffix` split with a non-empty suffix.
fn gaddag_entries(tiles: &[Tile]) -> Vec<Vec<Tile>> {
    let mut entries = Vec::with_capacity(tiles.len());
    let reversed: Vec<Tile> = tiles.iter().rev().cloned().collect();
    entries.push(reversed);
    for split in 1..tiles.len() {
        let mut entry: Vec<Tile> = tiles[..split].iter().rev().cloned().collect();
        entry.push(GADDAG_SEPARATOR);
        entry.extend_from_slice(&tiles[split..]);
        entries.push(entry);
    }
    entries
}

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<Tile, TrieNode>,
    terminal: bool,
}

impl TrieNode {
    fn insert(&mut self, tiles: &[Tile]) {
        let mut node = self;
        for &tile in tiles {
            node = node.children.entry(tile).or_default();
        }
        node.terminal = true;
    }
}

struct Builder {
    nodes: Vec<u32>,
}

impl Builder {
    /// Emit the sibling group of this node's children and return its
    /// start index (0 for a leaf). Sibling groups are contiguous.
    fn emit(&mut self, node: &TrieNode) -> u32 {
        if node.children.is_empty() {
            return 0;
        }
        let start = self.nodes.len();
        assert!(
            start + node.children.len() <= ARC_INDEX_MASK as usize,
            "lexicon exceeds the 22-bit arc index space"
        );
        self.nodes.resize(start + node.children.len(), 0);
        let last = node.children.len() - 1;
        for (i, (&tile, child)) in node.children.iter().enumerate() {
            let arc = self.emit(child);
            self.nodes[start + i] = pack(tile, child.terminal, i == last, arc);
        }
        start as u32
    }
}
