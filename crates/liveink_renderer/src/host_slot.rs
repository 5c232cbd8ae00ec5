//! Alternating host slots.
//!
//! Exactly two slots bridge the render thread's output into the
//! application tree. Each slot pairs an app-thread surface (the bridge,
//! whose clip is the transition trigger) with a render-thread container
//! (the target root live stroke visuals parent into). Alternating between
//! two slots bounds the number of strokes routed through the transition
//! machinery at once, which is what keeps the flicker-free protocol
//! analyzable.

use liveink_core::VisualId;

/// Which of the two host slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotIndex {
    A,
    B,
}

impl SlotIndex {
    pub fn other(self) -> SlotIndex {
        match self {
            SlotIndex::A => SlotIndex::B,
            SlotIndex::B => SlotIndex::A,
        }
    }
}

pub(crate) struct SlotState {
    /// App-thread surface composing the render-thread content; its clip is
    /// the transition trigger.
    pub bridge: VisualId,
    /// Render-thread container live stroke visuals are parented into.
    pub target_root: VisualId,
    /// Strokes currently bound to this slot.
    pub refs: usize,
    /// Armed while the slot is mid full-transition. Only legal to arm while
    /// `refs == 1`.
    pub trigger: bool,
}

impl SlotState {
    pub fn new(bridge: VisualId, target_root: VisualId) -> Self {
        Self {
            bridge,
            target_root,
            refs: 0,
            trigger: false,
        }
    }

    pub fn in_use(&self) -> bool {
        self.refs > 0
    }
}

pub(crate) struct HostSlots {
    a: SlotState,
    b: SlotState,
    current: Option<SlotIndex>,
}

impl HostSlots {
    pub fn new(a: SlotState, b: SlotState) -> Self {
        Self {
            a,
            b,
            current: None,
        }
    }

    pub fn get(&self, index: SlotIndex) -> &SlotState {
        match index {
            SlotIndex::A => &self.a,
            SlotIndex::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, index: SlotIndex) -> &mut SlotState {
        match index {
            SlotIndex::A => &mut self.a,
            SlotIndex::B => &mut self.b,
        }
    }

    /// Choose the slot for a new stroke. First use picks A. After that the
    /// current slot is kept unless it is in use; an in-use slot is traded
    /// for the other one unless that other slot is mid full-transition, in
    /// which case new strokes stay where they are.
    pub fn pick_current(&mut self, transitioning: Option<SlotIndex>) -> SlotIndex {
        let picked = match self.current {
            None => SlotIndex::A,
            Some(current) => {
                if self.get(current).in_use() && transitioning != Some(current.other()) {
                    current.other()
                } else {
                    current
                }
            }
        };
        self.current = Some(picked);
        picked
    }
}
