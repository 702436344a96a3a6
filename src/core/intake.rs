use crate::domain::model::Item;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedItem {
    pub item: Item,
    /// 找不到格位的次數
    pub misses: u32,
}

/// 輸送帶：先進先出
#[derive(Debug, Clone, Default)]
pub struct IntakeQueue {
    items: VecDeque<QueuedItem>,
}

impl IntakeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Item) {
        self.items.push_back(QueuedItem { item, misses: 0 });
    }

    pub fn head(&self) -> Option<&QueuedItem> {
        self.items.front()
    }

    pub fn pop(&mut self) -> Option<QueuedItem> {
        self.items.pop_front()
    }

    /// Moves the head to the tail after a failed placement and returns its
    /// updated miss count.
    pub fn requeue_head(&mut self) -> Option<u32> {
        let mut head = self.items.pop_front()?;
        head.misses += 1;
        let misses = head.misses;
        self.items.push_back(head);
        Some(misses)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedItem> {
        self.items.iter()
    }
}
