//! Thread-owned container visuals.
//!
//! Visual content is a tree of container nodes. A container carries an
//! opacity, an optional clip, and an append-only list of draw primitives.
//! Every container is owned by the thread that created it: all structural
//! and content mutations must happen on that thread. The owner is recorded
//! per node so the single-writer rule can be asserted in debug builds and
//! audited by test harnesses.
//!
//! Trees are shared behind `Arc<Mutex<_>>` so non-owning threads can take
//! read snapshots (e.g. to composite or assert on them); the lock does not
//! replace the ownership rule, it only makes reads safe.

use crate::color::Color;
use crate::geometry::Rect;
use crate::path::Path;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;

new_key_type! {
    /// Unique identifier for a container visual
    pub struct VisualId;
}

/// Shape used for clipping a container's composed output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipShape {
    Rect(Rect),
}

impl ClipShape {
    /// Zero-area clip: hides the container instantly without removing it.
    pub const ZERO: ClipShape = ClipShape::Rect(Rect::ZERO);

    pub fn hides_everything(&self) -> bool {
        match self {
            ClipShape::Rect(rect) => rect.is_empty(),
        }
    }
}

/// One opaque drawing primitive. Primitives are only ever appended to a
/// container, never mutated, which is what keeps partial strokes cheap.
#[derive(Clone, Debug)]
pub struct DrawPrimitive {
    pub path: Path,
    pub fill: Color,
    pub bounds: Rect,
}

/// A container visual node.
#[derive(Debug)]
pub struct VisualNode {
    parent: Option<VisualId>,
    children: SmallVec<[VisualId; 4]>,
    opacity: f32,
    clip: Option<ClipShape>,
    primitives: Vec<DrawPrimitive>,
    owner: ThreadId,
    name: Option<String>,
}

impl VisualNode {
    fn new(parent: Option<VisualId>, name: Option<String>) -> Self {
        Self {
            parent,
            children: SmallVec::new(),
            opacity: 1.0,
            clip: None,
            primitives: Vec::new(),
            owner: std::thread::current().id(),
            name,
        }
    }

    pub fn parent(&self) -> Option<VisualId> {
        self.parent
    }

    pub fn children(&self) -> &[VisualId] {
        &self.children
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn clip(&self) -> Option<ClipShape> {
        self.clip
    }

    pub fn primitives(&self) -> &[DrawPrimitive] {
        &self.primitives
    }

    /// Thread that created this container and is allowed to mutate it.
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A tree of container visuals rooted at a single node.
#[derive(Debug)]
pub struct VisualTree {
    nodes: SlotMap<VisualId, VisualNode>,
    root: VisualId,
}

/// Visual tree shared across threads for read snapshots.
pub type SharedVisualTree = Arc<Mutex<VisualTree>>;

impl VisualTree {
    /// Create a tree whose root is owned by the calling thread.
    pub fn new(root_name: &str) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(VisualNode::new(None, Some(root_name.to_string())));
        Self { nodes, root }
    }

    pub fn into_shared(self) -> SharedVisualTree {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> VisualId {
        self.root
    }

    pub fn contains(&self, id: VisualId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: VisualId) -> Option<&VisualNode> {
        self.nodes.get(id)
    }

    fn assert_owner(&self, id: VisualId) {
        debug_assert_eq!(
            self.nodes[id].owner,
            std::thread::current().id(),
            "visual container mutated off its owning thread"
        );
    }

    /// Create a child container. The child is owned by the calling thread,
    /// which must also own the parent.
    pub fn create_child(&mut self, parent: VisualId, name: &str) -> VisualId {
        self.assert_owner(parent);
        let child = self
            .nodes
            .insert(VisualNode::new(Some(parent), Some(name.to_string())));
        self.nodes[parent].children.push(child);
        tracing::trace!(?parent, ?child, name, "visual container created");
        child
    }

    /// Detach `child` from `parent` and drop its whole subtree. Missing
    /// nodes are tolerated: a container can be torn down concurrently with
    /// a queued removal, which must then be a no-op.
    pub fn remove_child(&mut self, parent: VisualId, child: VisualId) {
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            return;
        }
        self.assert_owner(parent);
        self.nodes[parent].children.retain(|c| *c != child);
        self.drop_subtree(child);
    }

    fn drop_subtree(&mut self, id: VisualId) {
        if let Some(node) = self.nodes.remove(id) {
            for child in node.children {
                self.drop_subtree(child);
            }
        }
    }

    pub fn set_opacity(&mut self, id: VisualId, opacity: f32) {
        if self.nodes.contains_key(id) {
            self.assert_owner(id);
            self.nodes[id].opacity = opacity;
        }
    }

    pub fn set_clip(&mut self, id: VisualId, clip: Option<ClipShape>) {
        if self.nodes.contains_key(id) {
            self.assert_owner(id);
            self.nodes[id].clip = clip;
        }
    }

    /// Append one primitive to a container's content.
    pub fn push_primitive(&mut self, id: VisualId, primitive: DrawPrimitive) {
        if self.nodes.contains_key(id) {
            self.assert_owner(id);
            self.nodes[id].primitives.push(primitive);
        }
    }

    pub fn primitive_count(&self, id: VisualId) -> usize {
        self.nodes.get(id).map_or(0, |n| n.primitives.len())
    }

    /// Total primitives in the subtree rooted at `id`.
    pub fn subtree_primitive_count(&self, id: VisualId) -> usize {
        let Some(node) = self.nodes.get(id) else {
            return 0;
        };
        let mut count = node.primitives.len();
        for &child in node.children.iter() {
            count += self.subtree_primitive_count(child);
        }
        count
    }

    /// Whether any pixel of the subtree rooted at `id` would reach the
    /// screen: some primitive exists below it and no clip on the path from
    /// the root hides it.
    pub fn is_subtree_visible(&self, id: VisualId) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        // Walk up checking clips first.
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &self.nodes[current];
            if node.clip.is_some_and(|c| c.hides_everything()) || node.opacity == 0.0 {
                return false;
            }
            cursor = node.parent;
        }
        self.subtree_has_visible_content(id)
    }

    fn subtree_has_visible_content(&self, id: VisualId) -> bool {
        let node = &self.nodes[id];
        if node.clip.is_some_and(|c| c.hides_everything()) || node.opacity == 0.0 {
            return false;
        }
        if !node.primitives.is_empty() {
            return true;
        }
        node.children
            .iter()
            .any(|&child| self.subtree_has_visible_content(child))
    }

    /// Owning thread of a container, if it still exists.
    pub fn owner(&self, id: VisualId) -> Option<ThreadId> {
        self.nodes.get(id).map(|n| n.owner)
    }

    /// Iterate over every node in the tree.
    pub fn iter(&self) -> impl Iterator<Item = (VisualId, &VisualNode)> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn dot(x: f32, y: f32) -> DrawPrimitive {
        let mut path = Path::new();
        path.move_to(Point::new(x, y));
        path.line_to(Point::new(x, y));
        DrawPrimitive {
            path,
            fill: Color::BLACK,
            bounds: Rect::new(x, y, 1.0, 1.0),
        }
    }

    #[test]
    fn test_create_and_remove_children() {
        let mut tree = VisualTree::new("root");
        let a = tree.create_child(tree.root(), "a");
        let b = tree.create_child(a, "b");

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.node(a).unwrap().children(), &[b]);

        tree.remove_child(tree.root(), a);
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_remove_missing_child_is_noop() {
        let mut tree = VisualTree::new("root");
        let a = tree.create_child(tree.root(), "a");
        tree.remove_child(tree.root(), a);
        // Second removal races are benign.
        tree.remove_child(tree.root(), a);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_zero_clip_hides_subtree() {
        let mut tree = VisualTree::new("root");
        let host = tree.create_child(tree.root(), "host");
        let stroke = tree.create_child(host, "stroke");
        tree.push_primitive(stroke, dot(1.0, 1.0));

        assert!(tree.is_subtree_visible(host));
        tree.set_clip(host, Some(ClipShape::ZERO));
        assert!(!tree.is_subtree_visible(host));
        assert!(!tree.is_subtree_visible(stroke));
        tree.set_clip(host, None);
        assert!(tree.is_subtree_visible(host));
    }

    #[test]
    fn test_empty_subtree_is_not_visible() {
        let mut tree = VisualTree::new("root");
        let host = tree.create_child(tree.root(), "host");
        assert!(!tree.is_subtree_visible(host));
    }

    #[test]
    fn test_subtree_primitive_count() {
        let mut tree = VisualTree::new("root");
        let a = tree.create_child(tree.root(), "a");
        let b = tree.create_child(a, "b");
        tree.push_primitive(a, dot(0.0, 0.0));
        tree.push_primitive(b, dot(1.0, 1.0));
        tree.push_primitive(b, dot(2.0, 2.0));

        assert_eq!(tree.primitive_count(a), 1);
        assert_eq!(tree.subtree_primitive_count(a), 3);
        assert_eq!(tree.subtree_primitive_count(tree.root()), 3);
    }

    #[test]
    fn test_owner_is_creating_thread() {
        let mut tree = VisualTree::new("root");
        let a = tree.create_child(tree.root(), "a");
        assert_eq!(tree.owner(a), Some(std::thread::current().id()));
    }
}
