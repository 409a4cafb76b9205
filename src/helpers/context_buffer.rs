use std::collections::{HashMap, VecDeque};

use crate::structs::chat_line::ChatLine;

/// Last `capacity` lines seen in each channel, oldest first.
#[derive(Debug, Clone)]
pub struct ContextBuffer {
    capacity: usize,
    channels: HashMap<String, VecDeque<ChatLine>>,
}

impl ContextBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, line: ChatLine) {
        let capacity = self.capacity;
        let lines = self
            .channels
            .entry(line.channel.clone())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        if lines.len() == capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    pub fn snapshot(&self, channel: &str) -> Vec<ChatLine> {
        self.channels
            .get(channel)
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, VecDeque::len)
    }
}
