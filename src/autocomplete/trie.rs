use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    #[serde(rename = "t")]
    is_terminal: bool,
    #[serde(rename = "w")]
    term: String,
    #[serde(rename = "s")]
    score: f32,
    #[serde(rename = "c")]
    children: HashMap<char, Box<Node>>,
}

impl Default for Node {
    fn default() -> Self {
        Node { is_terminal: false, term: String::new(), score: 0.0, children: HashMap::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub term: String,
    pub score: f32,
}

struct HeapEntry(f32, String);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    // Reversed so a `BinaryHeap<HeapEntry>` behaves as a min-heap on score,
    // letting `search` evict the weakest suggestion once it has `top_k`.
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0)
    }
}

/// Weighted prefix trie: each terminal node carries the full term and a
/// score, and re-inserting an existing term keeps the maximum of the old
/// and new score rather than overwriting it.
pub struct Trie {
    root: Node,
    size: usize,
}

#[derive(Serialize, Deserialize)]
struct TrieFile {
    root: Node,
}

impl Default for Trie {
    fn default() -> Self {
        Trie::new()
    }
}

impl Trie {
    pub fn new() -> Self {
        Trie { root: Node::default(), size: 0 }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn insert(&mut self, term: &str, score: f32) {
        let term = term.to_lowercase();
        let mut node = &mut self.root;
        for ch in term.chars() {
            node = node.children.entry(ch).or_insert_with(|| Box::new(Node::default()));
        }
        if !node.is_terminal {
            self.size += 1;
        }
        node.is_terminal = true;
        node.term = term;
        node.score = node.score.max(score);
    }

    /// Up to `top_k` terms starting with `prefix`, descending by score.
    pub fn search(&self, prefix: &str, top_k: usize) -> Vec<Suggestion> {
        let prefix = prefix.to_lowercase();
        let mut node = &self.root;
        for ch in prefix.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => return Vec::new(),
            }
        }

        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
        collect(node, &mut heap, top_k);

        let mut results: Vec<Suggestion> =
            heap.into_iter().map(|HeapEntry(score, term)| Suggestion { term, score }).collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = TrieFile { root: self.root.clone() };
        let bytes = bincode::serialize(&file)?;
        let mut out = std::fs::File::create(path)?;
        out.write_all(&(bytes.len() as u32).to_le_bytes())?;
        out.write_all(&bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut f = std::fs::File::open(path)?;
        let mut len_buf = [0u8; 4];
        f.read_exact(&mut len_buf).map_err(|e| Error::IndexCorrupt(format!("truncated trie header: {e}")))?;
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        f.read_exact(&mut buf).map_err(|e| Error::IndexCorrupt(format!("truncated trie body: {e}")))?;
        let file: TrieFile =
            bincode::deserialize(&buf).map_err(|e| Error::IndexCorrupt(format!("malformed trie: {e}")))?;

        let size = count_terminals(&file.root);
        Ok(Trie { root: file.root, size })
    }
}

fn collect(node: &Node, heap: &mut BinaryHeap<HeapEntry>, k: usize) {
    if k == 0 {
        return;
    }
    if node.is_terminal {
        if heap.len() < k {
            heap.push(HeapEntry(node.score, node.term.clone()));
        } else if let Some(weakest) = heap.peek() {
            if node.score > weakest.0 {
                heap.pop();
                heap.push(HeapEntry(node.score, node.term.clone()));
            }
        }
    }
    for child in node.children.values() {
        collect(child, heap, k);
    }
}

fn count_terminals(node: &Node) -> usize {
    let mut count = if node.is_terminal { 1 } else { 0 };
    for child in node.children.values() {
        count += count_terminals(child);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reinsert_keeps_max_score() {
        let mut trie = Trie::new();
        trie.insert("rust", 5.0);
        trie.insert("rust", 2.0);
        assert_eq!(trie.size(), 1);
        let hits = trie.search("rust", 5);
        assert_eq!(hits[0].score, 5.0);
    }

    #[test]
    fn prefix_search_ranks_by_score_descending() {
        let mut trie = Trie::new();
        trie.insert("rustacean", 1.0);
        trie.insert("rustlang", 9.0);
        trie.insert("rusty", 3.0);
        let hits = trie.search("rust", 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].term, "rustlang");
    }

    #[test]
    fn unknown_prefix_returns_empty() {
        let mut trie = Trie::new();
        trie.insert("rust", 1.0);
        assert!(trie.search("zzz", 5).is_empty());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all.bin");
        let mut trie = Trie::new();
        trie.insert("rust", 5.0);
        trie.insert("ruby", 3.0);
        trie.save(&path).unwrap();

        let loaded = Trie::load(&path).unwrap();
        assert_eq!(loaded.size(), 2);
        assert_eq!(loaded.search("ru", 10).len(), 2);
    }
}
