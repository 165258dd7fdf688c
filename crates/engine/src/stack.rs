// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use octrace_common::types::CallFrame;

/// Position of an open frame relative to the one below it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSlot {
    /// The root frame, owned by the tracer
    Root,
    /// Child `index` of the frame below
    Child(usize),
}

/// Stack of open frames
///
/// Frames are owned by their parent's `children`; the stack only records
/// where to find them, so the current frame is found by walking down from
/// the root.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    slots: Vec<FrameSlot>,
}

impl FrameStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the root frame
    pub fn push_root(&mut self) {
        self.slots.push(FrameSlot::Root);
    }

    /// Push child `index` of the current top frame
    pub fn push_child(&mut self, index: usize) {
        self.slots.push(FrameSlot::Child(index));
    }

    /// Pop the top frame
    pub fn pop(&mut self) -> Option<FrameSlot> {
        self.slots.pop()
    }

    /// Number of open frames
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Whether no frame is open
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Resolve the top frame inside the tree rooted at `root`
    pub fn top<'a>(&self, root: &'a CallFrame) -> Option<&'a CallFrame> {
        let (first, rest) = self.slots.split_first()?;
        if *first != FrameSlot::Root {
            return None;
        }
        rest.iter().try_fold(root, |frame, slot| match slot {
            FrameSlot::Child(index) => frame.child_frame(*index),
            FrameSlot::Root => None,
        })
    }

    /// Resolve the top frame mutably inside the tree rooted at `root`
    pub fn top_mut<'a>(&self, root: &'a mut CallFrame) -> Option<&'a mut CallFrame> {
        let (first, rest) = self.slots.split_first()?;
        if *first != FrameSlot::Root {
            return None;
        }
        rest.iter().try_fold(root, |frame, slot| match slot {
            FrameSlot::Child(index) => frame.child_frame_mut(*index),
            FrameSlot::Root => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octrace_common::types::{CallParams, TraceNode, TracePath};

    fn tree() -> CallFrame {
        let mut root = CallFrame::root(CallParams::default());
        root.append(|path| TraceNode::Call(CallFrame::placeholder(path)));
        root.append(|path| TraceNode::Call(CallFrame::placeholder(path)));
        root.child_frame_mut(1)
            .unwrap()
            .append(|path| TraceNode::Call(CallFrame::placeholder(path)));
        root
    }

    #[test]
    fn test_empty_stack_has_no_top() {
        let root = tree();
        let stack = FrameStack::new();
        assert!(stack.top(&root).is_none());
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_top_walks_from_root() {
        let mut root = tree();
        let mut stack = FrameStack::new();
        stack.push_root();
        assert_eq!(stack.top(&root).unwrap().path, TracePath::root());

        stack.push_child(1);
        stack.push_child(0);
        assert_eq!(stack.top(&root).unwrap().path, "0.1.0");
        assert_eq!(stack.top_mut(&mut root).unwrap().path, "0.1.0");

        assert_eq!(stack.pop(), Some(FrameSlot::Child(0)));
        assert_eq!(stack.top(&root).unwrap().path, "0.1");
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_dangling_slot_resolves_to_none() {
        let root = tree();
        let mut stack = FrameStack::new();
        stack.push_root();
        stack.push_child(7);
        assert!(stack.top(&root).is_none());
    }
}
