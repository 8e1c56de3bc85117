//! Online suffix automaton supporting repeated-substring queries.
//!
//! States live in one dense `Vec<State>` owned by the automaton; suffix
//! links and transitions are `usize` indices into that vector rather than
//! references or `Rc`s, so the vector can reallocate during construction
//! without invalidating anything.

use std::collections::HashMap;

const ROOT: usize = 0;
/// Sentinel meaning "no suffix link" (only the root state has this).
const NO_LINK: isize = -1;

#[derive(Debug, Clone)]
struct State {
    len: usize,
    link: isize,
    trans: HashMap<char, usize>,
    /// endpos count; 0 until `propagate_counts` runs, after which it is the
    /// number of distinct end positions this state's substrings occur at.
    cnt: u32,
    /// Position (0-based, in characters appended so far) of the first end
    /// occurrence of this state's substring equivalence class. A freshly
    /// created state's first occurrence is the position it was extended at;
    /// a cloned state inherits the position of the state it was split from,
    /// since the split doesn't change where that shorter substring first
    /// ended.
    first_position: usize,
}

impl State {
    fn new(len: usize, link: isize, cnt: u32, first_position: usize) -> Self {
        Self {
            len,
            link,
            trans: HashMap::new(),
            cnt,
            first_position,
        }
    }
}

/// O(n) online suffix automaton over characters, built by repeated calls to
/// [`SuffixAutomaton::extend`].
pub struct SuffixAutomaton {
    states: Vec<State>,
    last: usize,
}

impl SuffixAutomaton {
    /// Create an automaton containing only the root state.
    pub fn new() -> Self {
        Self {
            states: vec![State::new(0, NO_LINK, 0, 0)],
            last: ROOT,
        }
    }

    /// Number of states currently in the automaton.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// First end position recorded for the state reached after matching
    /// `text` from the root, or `None` if no such state exists (e.g. `text`
    /// never occurs).
    pub fn first_position_of(&self, text: &str) -> Option<usize> {
        let mut cur = ROOT;
        for c in text.chars() {
            cur = *self.states[cur].trans.get(&c)?;
        }
        Some(self.states[cur].first_position)
    }

    /// Append one character to the automaton at source position `pos`
    /// (0-based, the number of characters already appended before this
    /// call).
    pub fn extend(&mut self, c: char, pos: usize) {
        let cur = self.states.len();
        self.states.push(State::new(self.states[self.last].len + 1, NO_LINK, 1, pos));

        let mut p = self.last as isize;
        while p != NO_LINK && !self.states[p as usize].trans.contains_key(&c) {
            self.states[p as usize].trans.insert(c, cur);
            p = self.states[p as usize].link;
        }

        if p == NO_LINK {
            self.states[cur].link = ROOT as isize;
        } else {
            let p_idx = p as usize;
            let q = self.states[p_idx].trans[&c];
            if self.states[p_idx].len + 1 == self.states[q].len {
                self.states[cur].link = q as isize;
            } else {
                let clone_idx = self.states.len();
                let mut clone =
                    State::new(self.states[p_idx].len + 1, self.states[q].link, 0, self.states[q].first_position);
                clone.trans = self.states[q].trans.clone();
                self.states.push(clone);

                let mut p2 = p;
                while p2 != NO_LINK && self.states[p2 as usize].trans.get(&c) == Some(&q) {
                    self.states[p2 as usize].trans.insert(c, clone_idx);
                    p2 = self.states[p2 as usize].link;
                }
                self.states[q].link = clone_idx as isize;
                self.states[cur].link = clone_idx as isize;
            }
        }
        self.last = cur;
    }

    /// Propagate endpos counts up the suffix-link tree.
    ///
    /// Must be called once after all characters have been appended and
    /// before any [`SuffixAutomaton::match_repeated_length`] query.
    pub fn propagate_counts(&mut self) {
        let mut order: Vec<usize> = (0..self.states.len()).collect();
        order.sort_unstable_by_key(|&i| std::cmp::Reverse(self.states[i].len));
        for v in order {
            let link = self.states[v].link;
            if link >= 0 {
                let cnt = self.states[v].cnt;
                self.states[link as usize].cnt += cnt;
            }
        }
    }

    /// For each position in `text`, find the length of the longest substring
    /// ending there that occurs more than once in the automaton's source
    /// string (i.e. whose state has `cnt >= 2`).
    pub fn match_repeated_length(&self, text: &str) -> Vec<usize> {
        let mut lengths = Vec::with_capacity(text.chars().count());
        let mut cur = ROOT;
        let mut cur_len = 0usize;

        for c in text.chars() {
            while cur != ROOT && !self.states[cur].trans.contains_key(&c) {
                let link = self.states[cur].link;
                cur = if link < 0 { ROOT } else { link as usize };
                cur_len = self.states[cur].len;
            }
            if let Some(&next) = self.states[cur].trans.get(&c) {
                cur = next;
                cur_len += 1;
            } else {
                cur = ROOT;
                cur_len = 0;
            }

            let mut effective = cur;
            let mut effective_len = cur_len;
            while effective != ROOT && self.states[effective].cnt < 2 {
                let link = self.states[effective].link;
                effective = if link < 0 { ROOT } else { link as usize };
                effective_len = self.states[effective].len;
            }
            lengths.push(effective_len);
        }
        lengths
    }
}

impl Default for SuffixAutomaton {
    fn default() -> Self {
        Self::new()
    }
}
