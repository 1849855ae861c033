//! Hook Chain (C4)
//!
//! Ordered sequence of hooks built once per [`crate::context::PassthroughContext`]
//! from its configuration list. Modeled as a `Vec` rather than an actual
//! linked list — spec.md §9 notes an index-based implementation is equally
//! correct, and the chain never mutates after construction.

use std::sync::Arc;

use super::contract::Hook;

/// A position in a [`HookChain`]. Wraps a plain index; the newtype exists so
/// "resume node" values can't be confused with arbitrary `usize`s elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node(usize);

/// Ordered, immutable-after-construction sequence of hooks.
#[derive(Clone, Default)]
pub struct HookChain {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookChain {
    /// Build an empty chain
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Build a chain from an already-ordered list of hook clients
    pub fn from_hooks(hooks: Vec<Arc<dyn Hook>>) -> Self {
        Self { hooks }
    }

    /// Append a hook to the tail. Builder method, used only at construction.
    pub fn append(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Prepend a hook to the head. Builder method, used only at construction.
    pub fn prepend(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.insert(0, hook);
        self
    }

    /// Number of hooks in the chain
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the chain has no hooks
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// The first node, if the chain is non-empty
    pub fn head(&self) -> Option<Node> {
        if self.hooks.is_empty() {
            None
        } else {
            Some(Node(0))
        }
    }

    /// The last node, if the chain is non-empty
    pub fn tail(&self) -> Option<Node> {
        self.hooks.len().checked_sub(1).map(Node)
    }

    /// The hook at `node`
    pub fn get(&self, node: Node) -> Option<&Arc<dyn Hook>> {
        self.hooks.get(node.0)
    }

    /// The node immediately after `node`, if any
    pub fn next(&self, node: Node) -> Option<Node> {
        let next = node.0 + 1;
        (next < self.hooks.len()).then_some(Node(next))
    }

    /// The node immediately before `node`, if any
    pub fn previous(&self, node: Node) -> Option<Node> {
        node.0.checked_sub(1).map(Node)
    }

    /// Forward iteration from `head()` to `tail()`
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Node, &Arc<dyn Hook>)> {
        self.hooks
            .iter()
            .enumerate()
            .map(|(i, hook)| (Node(i), hook))
    }

    /// Find a hook by its declared name
    pub fn find_by_name(&self, name: &str) -> Option<(Node, &Arc<dyn Hook>)> {
        self.iter().find(|(_, hook)| hook.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NamedHook(&'static str);
    #[async_trait]
    impl Hook for NamedHook {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn empty_chain_has_no_head_or_tail() {
        let chain = HookChain::new();
        assert!(chain.head().is_none());
        assert!(chain.tail().is_none());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn chain_preserves_configured_order() {
        let chain = HookChain::new()
            .append(Arc::new(NamedHook("h1")))
            .append(Arc::new(NamedHook("h2")))
            .append(Arc::new(NamedHook("h3")));

        let names: Vec<&str> = chain.iter().map(|(_, h)| h.name()).collect();
        assert_eq!(names, vec!["h1", "h2", "h3"]);

        let head = chain.head().unwrap();
        let tail = chain.tail().unwrap();
        assert_eq!(chain.get(head).unwrap().name(), "h1");
        assert_eq!(chain.get(tail).unwrap().name(), "h3");
    }

    #[test]
    fn next_and_previous_walk_the_chain() {
        let chain = HookChain::new()
            .append(Arc::new(NamedHook("h1")))
            .append(Arc::new(NamedHook("h2")));

        let head = chain.head().unwrap();
        let second = chain.next(head).unwrap();
        assert_eq!(chain.get(second).unwrap().name(), "h2");
        assert!(chain.next(second).is_none());
        assert_eq!(chain.previous(second), Some(head));
        assert!(chain.previous(head).is_none());
    }

    #[test]
    fn find_by_name_locates_node() {
        let chain = HookChain::new()
            .append(Arc::new(NamedHook("h1")))
            .append(Arc::new(NamedHook("h2")));

        let (node, hook) = chain.find_by_name("h2").unwrap();
        assert_eq!(hook.name(), "h2");
        assert_eq!(chain.next(chain.head().unwrap()), Some(node));
        assert!(chain.find_by_name("missing").is_none());
    }
}
