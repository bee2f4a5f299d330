use std::collections::VecDeque;

use crate::pauses::is_sentence_terminator;

pub const HISTORY_CAPACITY: usize = 200;

/// The most recent characters on screen, oldest first. Never longer than
/// [`HISTORY_CAPACITY`].
#[derive(Debug, Clone, Default)]
pub struct HistoryBuffer {
    chars: VecDeque<char>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self {
            chars: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, c: char) {
        if self.chars.len() == HISTORY_CAPACITY {
            self.chars.pop_front();
        }
        self.chars.push_back(c);
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn last(&self) -> Option<char> {
        self.chars.back().copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    /// The last `n` characters, oldest first.
    pub fn tail(&self, n: usize) -> Vec<char> {
        let skip = self.chars.len().saturating_sub(n);
        self.chars.iter().skip(skip).copied().collect()
    }

    /// True at the start of the text, after a line break, or after `.?!` followed
    /// by spaces.
    pub fn at_sentence_start(&self) -> bool {
        let mut rev = self.chars.iter().rev().copied();
        let mut saw_space = false;
        loop {
            match rev.next() {
                None => return true,
                Some('\n') => return true,
                Some(' ') | Some('\t') => saw_space = true,
                Some(c) => return saw_space && is_sentence_terminator(c),
            }
        }
    }
}
