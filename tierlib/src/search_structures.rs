use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::clock::Clock;
use crate::config::StructureKind;
use crate::error::{Result, SimulationError};

/// The backend specific measure of how much work a lookup did
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CostMetric {
    /// Key comparisons made walking a binary search tree
    Comparisons(u64),
    /// Entries scanned in a hash bucket's chain
    ChainLength(u64),
    /// Trie nodes visited below the root
    NodesTraversed(u64),
}

impl CostMetric {
    pub fn value(&self) -> u64 {
        match self {
            CostMetric::Comparisons(n) | CostMetric::ChainLength(n) | CostMetric::NodesTraversed(n) => *n,
        }
    }
}

/// Result of a timed lookup
#[derive(Debug, Clone)]
pub struct SearchOutcome<V> {
    pub value: Option<V>,
    pub cost: CostMetric,
    pub elapsed: Duration,
}

impl<V> SearchOutcome<V> {
    pub fn found(&self) -> bool {
        self.value.is_some()
    }
}

/// A generic trait for the key to value lookup engines the simulator compares
///
/// Every implementation must agree with the others on what is found and what value comes back for
/// the same inserted data, only the cost metric differs
pub trait SearchStructure<V> {
    fn kind(&self) -> StructureKind;

    /// Inserts a value, replacing the previous value if the key is already present
    fn insert(&mut self, key: &str, value: V);

    /// Untimed lookup, returning the value if present and the work done to find it
    fn search(&self, key: &str) -> (Option<&V>, CostMetric);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookup timed against the given clock
    fn lookup<C: Clock + ?Sized>(&self, key: &str, clock: &C) -> SearchOutcome<V>
    where
        V: Clone,
    {
        let start = clock.now();
        let (value, cost) = self.search(key);
        let value = value.cloned();
        let elapsed = clock.since(start);
        SearchOutcome { value, cost, elapsed }
    }
}

#[derive(Debug, Clone)]
struct BstNode<V> {
    key: String,
    value: V,
    left: Option<usize>,
    right: Option<usize>,
}

/// Unbalanced binary search tree ordered by byte-wise key comparison
///
/// There is no rebalancing, so sorted input degenerates into a linked list and lookups become
/// linear. That weakness is one of the things being measured, so it is kept. Nodes live in an
/// arena and every walk is iterative, so even a fully degenerate tree can't overflow the stack
#[derive(Debug, Clone)]
pub struct Bst<V> {
    nodes: Vec<BstNode<V>>,
    root: Option<usize>,
}

impl<V> Default for Bst<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Bst<V> {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), root: None }
    }

    /// Number of nodes on the longest root to leaf path, 0 for an empty tree
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(usize, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            let node = &self.nodes[node];
            stack.extend(node.left.map(|l| (l, depth + 1)));
            stack.extend(node.right.map(|r| (r, depth + 1)));
        }
        height
    }
}

impl<V> SearchStructure<V> for Bst<V> {
    fn kind(&self) -> StructureKind {
        StructureKind::Bst
    }

    fn insert(&mut self, key: &str, value: V) {
        let new_index = self.nodes.len();
        let mut current = match self.root {
            Some(root) => root,
            None => {
                self.nodes.push(BstNode { key: key.to_string(), value, left: None, right: None });
                self.root = Some(new_index);
                return;
            }
        };
        loop {
            let node = &mut self.nodes[current];
            let next = match key.cmp(node.key.as_str()) {
                Ordering::Equal => {
                    node.value = value;
                    return;
                }
                Ordering::Less => &mut node.left,
                Ordering::Greater => &mut node.right,
            };
            match *next {
                Some(child) => current = child,
                None => {
                    *next = Some(new_index);
                    self.nodes.push(BstNode { key: key.to_string(), value, left: None, right: None });
                    return;
                }
            }
        }
    }

    fn search(&self, key: &str) -> (Option<&V>, CostMetric) {
        let mut comparisons = 0;
        let mut current = self.root;
        while let Some(index) = current {
            let node = &self.nodes[index];
            comparisons += 1;
            current = match key.cmp(node.key.as_str()) {
                Ordering::Equal => return (Some(&node.value), CostMetric::Comparisons(comparisons)),
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        (None, CostMetric::Comparisons(comparisons))
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }
}

/// Fixed size hash table with separate chaining
///
/// The bucket count never changes after construction, chains simply grow as the table fills up
#[derive(Debug, Clone)]
pub struct HashTable<V> {
    buckets: Vec<Vec<(String, V)>>,
    len: usize,
}

impl<V> HashTable<V> {
    pub fn new(bucket_count: usize) -> Result<Self> {
        if bucket_count == 0 {
            return Err(SimulationError::invalid_configuration("a hash table needs at least one bucket"));
        }
        Ok(Self {
            buckets: (0..bucket_count).map(|_| Vec::new()).collect(),
            len: 0,
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Length of the longest chain, the worst case lookup cost
    pub fn longest_chain(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    fn bucket_of(&self, key: &str) -> usize {
        hash_key(key, self.buckets.len())
    }
}

/// Polynomial rolling hash over the key's bytes, folded into `bucket_count` buckets
///
/// Only depends on the key, never on what else is in the table or the order it was filled in
pub fn hash_key(key: &str, bucket_count: usize) -> usize {
    let hash = key.bytes().fold(0u64, |hash, byte| hash.wrapping_mul(31).wrapping_add(byte as u64));
    (hash % bucket_count as u64) as usize
}

impl<V> SearchStructure<V> for HashTable<V> {
    fn kind(&self) -> StructureKind {
        StructureKind::Hash
    }

    fn insert(&mut self, key: &str, value: V) {
        let bucket = self.bucket_of(key);
        let chain = &mut self.buckets[bucket];
        if let Some((_, existing)) = chain.iter_mut().find(|(k, _)| k == key) {
            *existing = value;
            return;
        }
        chain.push((key.to_string(), value));
        self.len += 1;
    }

    fn search(&self, key: &str) -> (Option<&V>, CostMetric) {
        let chain = &self.buckets[self.bucket_of(key)];
        let mut scanned = 0;
        for (k, v) in chain {
            scanned += 1;
            if k == key {
                return (Some(v), CostMetric::ChainLength(scanned));
            }
        }
        (None, CostMetric::ChainLength(scanned))
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[derive(Debug, Clone)]
struct TrieNode<V> {
    children: BTreeMap<char, usize>,
    // Only set on nodes where an inserted key ends
    value: Option<V>,
}

impl<V> TrieNode<V> {
    fn empty() -> Self {
        Self { children: BTreeMap::new(), value: None }
    }
}

/// Prefix tree with one node per character
///
/// Walking all the way to a node isn't enough for a hit, the node must also be where a key was
/// inserted. Looking up a strict prefix of a stored key misses
#[derive(Debug, Clone)]
pub struct Trie<V> {
    // Index 0 is the root
    nodes: Vec<TrieNode<V>>,
    len: usize,
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Trie<V> {
    pub fn new() -> Self {
        Self { nodes: vec![TrieNode::empty()], len: 0 }
    }

    /// Total nodes including the root, a measure of the memory the trie costs
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl<V> SearchStructure<V> for Trie<V> {
    fn kind(&self) -> StructureKind {
        StructureKind::Trie
    }

    fn insert(&mut self, key: &str, value: V) {
        let mut current = 0;
        for c in key.chars() {
            current = match self.nodes[current].children.get(&c).copied() {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TrieNode::empty());
                    self.nodes[current].children.insert(c, child);
                    child
                }
            };
        }
        if self.nodes[current].value.replace(value).is_none() {
            self.len += 1;
        }
    }

    fn search(&self, key: &str) -> (Option<&V>, CostMetric) {
        let mut traversed = 0;
        let mut current = 0;
        for c in key.chars() {
            match self.nodes[current].children.get(&c) {
                Some(&child) => {
                    traversed += 1;
                    current = child;
                }
                None => return (None, CostMetric::NodesTraversed(traversed)),
            }
        }
        (self.nodes[current].value.as_ref(), CostMetric::NodesTraversed(traversed))
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Enum over the three backends
///
/// The set of backends is closed and the engine compares all of them, so we branch explicitly
/// instead of using trait objects. Keeps the concrete types visible to the compiler
#[derive(Debug, Clone)]
pub enum Backend<V> {
    Bst(Bst<V>),
    Hash(HashTable<V>),
    Trie(Trie<V>),
}

impl<V> Backend<V> {
    /// Creates an empty backend of the given kind
    pub fn new(kind: StructureKind, hash_buckets: usize) -> Result<Self> {
        Ok(match kind {
            StructureKind::Bst => Bst::new().into(),
            StructureKind::Hash => HashTable::new(hash_buckets)?.into(),
            StructureKind::Trie => Trie::new().into(),
        })
    }
}

impl<V> From<Bst<V>> for Backend<V> {
    fn from(value: Bst<V>) -> Self {
        Self::Bst(value)
    }
}

impl<V> From<HashTable<V>> for Backend<V> {
    fn from(value: HashTable<V>) -> Self {
        Self::Hash(value)
    }
}

impl<V> From<Trie<V>> for Backend<V> {
    fn from(value: Trie<V>) -> Self {
        Self::Trie(value)
    }
}

impl<V> SearchStructure<V> for Backend<V> {
    fn kind(&self) -> StructureKind {
        match self {
            Backend::Bst(s) => s.kind(),
            Backend::Hash(s) => s.kind(),
            Backend::Trie(s) => s.kind(),
        }
    }

    fn insert(&mut self, key: &str, value: V) {
        match self {
            Backend::Bst(s) => s.insert(key, value),
            Backend::Hash(s) => s.insert(key, value),
            Backend::Trie(s) => s.insert(key, value),
        }
    }

    fn search(&self, key: &str) -> (Option<&V>, CostMetric) {
        match self {
            Backend::Bst(s) => s.search(key),
            Backend::Hash(s) => s.search(key),
            Backend::Trie(s) => s.search(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Backend::Bst(s) => s.len(),
            Backend::Hash(s) => s.len(),
            Backend::Trie(s) => s.len(),
        }
    }
}
