//! Engine state: the flag bitfield and the per-session persisted state.

use serde::{Deserialize, Serialize};

/// Engine-reserved flag: raised by a language handler to tell the engine
/// to adopt its content as the session language. Application flags start
/// at [`APP_FLAG_BASE`].
pub const FLAG_LANG: u32 = 0;

/// First flag id available to the application.
pub const APP_FLAG_BASE: u32 = 8;

/// Default bitfield width in flags.
pub const DEFAULT_FLAG_COUNT: usize = 128;

/// How many inputs the history cache keeps.
const HISTORY_CAP: usize = 8;

/// Fixed-width flag bitfield the menu script branches on.
///
/// Any flag test is O(1); setting a flag past the initial width grows the
/// field rather than dropping the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlagSet {
    bits: Vec<u8>,
}

impl FlagSet {
    pub fn new(width: usize) -> Self {
        Self {
            bits: vec![0; width.div_ceil(8)],
        }
    }

    pub fn get(&self, flag: u32) -> bool {
        let byte = (flag / 8) as usize;
        self.bits
            .get(byte)
            .is_some_and(|b| b & (1 << (flag % 8)) != 0)
    }

    pub fn set(&mut self, flag: u32) {
        let byte = (flag / 8) as usize;
        if byte >= self.bits.len() {
            self.bits.resize(byte + 1, 0);
        }
        self.bits[byte] |= 1 << (flag % 8);
    }

    pub fn reset(&mut self, flag: u32) {
        let byte = (flag / 8) as usize;
        if let Some(b) = self.bits.get_mut(byte) {
            *b &= !(1 << (flag % 8));
        }
    }
}

/// State of the menu engine for one session, serialized opaquely into the
/// STATE store under the session id. At most one per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// Current node and return path; the last element is the active node.
    pub stack: Vec<String>,
    pub flags: FlagSet,
    /// Session language, adopted via [`FLAG_LANG`].
    pub language: Option<String>,
    /// Bounded input history.
    pub history: Vec<String>,
}

impl PersistedState {
    pub fn new(root: &str, flag_count: usize) -> Self {
        Self {
            stack: vec![root.to_string()],
            flags: FlagSet::new(flag_count),
            language: None,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &str {
        self.stack.last().map(String::as_str).unwrap_or_default()
    }

    pub fn push(&mut self, sym: &str) {
        self.stack.push(sym.to_string());
    }

    /// Replace the active node, keeping the return path.
    pub fn goto(&mut self, sym: &str) {
        self.stack.pop();
        self.stack.push(sym.to_string());
    }

    /// Pop back to the previous node; the root never pops away.
    pub fn back(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    pub fn record_input(&mut self, input: &str) {
        self.history.push(input.to_string());
        if self.history.len() > HISTORY_CAP {
            self.history.remove(0);
        }
    }
}
