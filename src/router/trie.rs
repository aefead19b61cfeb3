//! Segment trie for route matching
//!
//! Nodes live in a flat arena (`Vec<TrieNode<T>>`) and reference their
//! children by index, so the tree is trivially `Clone` and has no ownership
//! cycles. Children keep insertion order, which is also the match order.
//!
//! ## Matching rules
//!
//! - Static children match a path part exactly; parameter children match any
//!   single part; a catch-all child matches every remaining part at once.
//! - Candidates at one level are tried in registration order and the first
//!   one whose subtree reaches a terminal node wins. There is **no** "static
//!   beats parameter" priority: a `:id` child registered before a `new`
//!   sibling shadows it for `/users/new`.
//! - Reaching a catch-all ends the walk immediately. A catch-all needs at
//!   least one remaining part; `/files` does not match `/files/*rest`.
//! - Interior nodes reached at the right depth are not matches.
//!
//! ## Example
//!
//! ```rust
//! use brrtrouter_dispatch::router::PathTrie;
//!
//! let mut trie = PathTrie::new();
//! trie.insert("/users/:id", "get_user").unwrap();
//! trie.insert("/files/*rest", "get_file").unwrap();
//!
//! let hit = trie.search("/users/42").unwrap();
//! assert_eq!(hit.pattern(), "/users/:id");
//! assert_eq!(hit.params.get("id"), Some("42"));
//!
//! let hit = trie.search("/files/a/b/c").unwrap();
//! assert_eq!(*hit.value, "get_file");
//! assert_eq!(hit.params.get("rest"), Some("a/b/c"));
//! ```

use std::sync::Arc;

use super::params::Params;
use super::pattern::{parse_pattern, split_path, PatternError, Segment};

/// Index of a node in the trie arena.
pub type NodeId = usize;

/// The root node always sits at index 0.
pub const ROOT: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Root,
    Static,
    Param,
    CatchAll,
}

/// Where a named parameter sits among the `/`-separated parts of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub name: Arc<str>,
    pub position: usize,
    /// Bind every part from `position` onward, joined by `/`.
    pub catch_all: bool,
}

#[derive(Debug, Clone)]
struct Terminal<T> {
    pattern: Arc<str>,
    value: T,
}

/// One segment of the trie.
#[derive(Debug, Clone)]
pub struct TrieNode<T> {
    segment: Box<str>,
    kind: NodeKind,
    children: Vec<NodeId>,
    /// Parameter positions of the pattern that created (or terminates at) this node.
    slots: Vec<ParamSlot>,
    terminal: Option<Terminal<T>>,
}

impl<T> TrieNode<T> {
    fn new(segment: &str, kind: NodeKind, slots: Vec<ParamSlot>) -> Self {
        Self {
            segment: segment.into(),
            kind,
            children: Vec::new(),
            slots,
            terminal: None,
        }
    }

    /// The segment text exactly as registered (`users`, `:id`, `{id}`, `*rest`).
    #[must_use]
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// True when the segment binds a value or consumes the remainder.
    #[must_use]
    pub fn is_parametric(&self) -> bool {
        matches!(self.kind, NodeKind::Param | NodeKind::CatchAll)
    }

    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.kind == NodeKind::CatchAll
    }

    /// Child node ids in insertion order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The full pattern terminating here, if any route ends at this node.
    #[must_use]
    pub fn terminal_pattern(&self) -> Option<&str> {
        self.terminal.as_ref().map(|t| t.pattern.as_ref())
    }

    /// Parameter name to position mapping.
    #[must_use]
    pub fn param_positions(&self) -> &[ParamSlot] {
        &self.slots
    }
}

/// Successful search result.
#[derive(Debug)]
pub struct TrieMatch<'t, T> {
    pub node: NodeId,
    pub pattern: &'t Arc<str>,
    pub value: &'t T,
    pub params: Params,
}

impl<T> TrieMatch<'_, T> {
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_ref()
    }
}

/// Arena-backed segment trie mapping path patterns to values.
#[derive(Debug, Clone)]
pub struct PathTrie<T> {
    nodes: Vec<TrieNode<T>>,
    terminals: usize,
}

impl<T> Default for PathTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTrie<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::new("", NodeKind::Root, Vec::new())],
            terminals: 0,
        }
    }

    /// Number of registered patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terminals
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terminals == 0
    }

    /// Number of nodes in the arena, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TrieNode<T>> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn root(&self) -> &TrieNode<T> {
        &self.nodes[ROOT]
    }

    /// Insert `pattern`, returning the previous value if the pattern's node
    /// was already terminal.
    ///
    /// Identical segment literals are shared. Re-registering replaces the
    /// stored value silently. Nothing is modified when an error is returned.
    ///
    /// # Errors
    ///
    /// Any [`PatternError`] from tokenizing, plus
    /// [`PatternError::ConflictingCatchAll`] when a different catch-all
    /// already exists at the same position.
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<Option<T>, PatternError> {
        let parts = parse_pattern(pattern)?;

        // Dry run up to the first missing child so a conflict leaves the
        // arena untouched.
        let mut node = ROOT;
        for part in &parts {
            match self.find_child(node, part.raw) {
                Some(child) => node = child,
                None => {
                    if part.segment.is_catch_all() {
                        if let Some(existing) = self.catch_all_child(node) {
                            return Err(PatternError::ConflictingCatchAll {
                                pattern: pattern.to_string(),
                                segment: part.raw.to_string(),
                                existing: self.nodes[existing].segment.to_string(),
                            });
                        }
                    }
                    break;
                }
            }
        }

        let slots: Vec<ParamSlot> = parts
            .iter()
            .enumerate()
            .filter_map(|(position, part)| {
                part.segment.param_name().map(|name| ParamSlot {
                    name: Arc::from(name),
                    position,
                    catch_all: part.segment.is_catch_all(),
                })
            })
            .collect();

        let mut node = ROOT;
        for part in &parts {
            node = match self.find_child(node, part.raw) {
                Some(child) => child,
                None => {
                    let kind = match part.segment {
                        Segment::Static(_) => NodeKind::Static,
                        Segment::Param(_) => NodeKind::Param,
                        Segment::CatchAll(_) => NodeKind::CatchAll,
                    };
                    let id = self.nodes.len();
                    self.nodes
                        .push(TrieNode::new(part.raw, kind, slots.clone()));
                    self.nodes[node].children.push(id);
                    id
                }
            };
        }

        let target = &mut self.nodes[node];
        target.slots = slots;
        let previous = target.terminal.replace(Terminal {
            pattern: Arc::from(pattern),
            value,
        });
        if previous.is_none() {
            self.terminals += 1;
        }
        Ok(previous.map(|t| t.value))
    }

    /// Resolve `path` to the first registered pattern it matches.
    #[must_use]
    pub fn search(&self, path: &str) -> Option<TrieMatch<'_, T>> {
        let parts = split_path(path);
        let node = self.walk(ROOT, &parts, 0)?;
        let found = &self.nodes[node];
        let terminal = found.terminal.as_ref()?;

        let mut params = Params::new();
        for slot in &found.slots {
            let value = if slot.catch_all {
                parts[slot.position..].join("/")
            } else {
                parts[slot.position].to_string()
            };
            params.push(Arc::clone(&slot.name), value);
        }

        Some(TrieMatch {
            node,
            pattern: &terminal.pattern,
            value: &terminal.value,
            params,
        })
    }

    /// Value registered for exactly `pattern`, without matching semantics.
    #[must_use]
    pub fn get(&self, pattern: &str) -> Option<&T> {
        let parts = parse_pattern(pattern).ok()?;
        let mut node = ROOT;
        for part in &parts {
            node = self.find_child(node, part.raw)?;
        }
        self.nodes[node].terminal.as_ref().map(|t| &t.value)
    }

    /// Registered patterns in depth-first, insertion order.
    #[must_use]
    pub fn patterns(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.terminals);
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if let Some(t) = &node.terminal {
                out.push(t.pattern.as_ref());
            }
            stack.extend(node.children.iter().rev());
        }
        out
    }

    fn find_child(&self, node: NodeId, literal: &str) -> Option<NodeId> {
        self.nodes[node]
            .children
            .iter()
            .copied()
            .find(|&c| &*self.nodes[c].segment == literal)
    }

    fn catch_all_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].kind == NodeKind::CatchAll)
    }

    fn walk(&self, node: NodeId, parts: &[&str], depth: usize) -> Option<NodeId> {
        let Some(part) = parts.get(depth) else {
            return self.nodes[node].terminal.as_ref().map(|_| node);
        };

        for &child in &self.nodes[node].children {
            let candidate = &self.nodes[child];
            let hit = match candidate.kind {
                NodeKind::CatchAll => candidate.terminal.as_ref().map(|_| child),
                NodeKind::Param => self.walk(child, parts, depth + 1),
                NodeKind::Static if &*candidate.segment == *part => {
                    self.walk(child, parts, depth + 1)
                }
                NodeKind::Static | NodeKind::Root => None,
            };
            if hit.is_some() {
                return hit;
            }
        }
        None
    }
}
