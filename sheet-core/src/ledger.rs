//! Bounded resource counters.
//!
//! Feature uses, item charges, spell slots and hit dice share one rule set:
//! a counter only ever moves inside `[0, max]`. A request that would leave that
//! range is dropped, not saturated, because the controls that issue it are
//! disabled at the boundary and only stale input can reach it.

use crate::character::{Character, EditError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Counters
// ============================================================================

/// A depletable pool with a cap, e.g. "Second Wind 1/1" or "Wand 3/7".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counter {
    max: u32,
    #[serde(rename = "actuel")]
    current: u32,
}

impl Counter {
    /// A counter at full capacity.
    pub fn full(max: u32) -> Self {
        Self { max, current: max }
    }

    /// A counter with an explicit fill level, clamped to `max`.
    pub fn new(max: u32, current: u32) -> Self {
        Self {
            max,
            current: current.min(max),
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn is_full(&self) -> bool {
        self.current == self.max
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    /// Move the fill level by `delta`. See [`adjust`].
    pub fn adjust(&mut self, delta: i32) -> bool {
        adjust(self, delta)
    }

    /// Fill back up to `max`. Returns whether anything changed.
    pub fn refill(&mut self) -> bool {
        let changed = self.current != self.max;
        self.current = self.max;
        changed
    }

    /// Change the cap, pulling `current` down if it no longer fits.
    ///
    /// Unlike [`adjust`] this saturates: lowering the cap of a full pool
    /// leaves it full at the new cap.
    pub fn set_max(&mut self, max: u32) -> bool {
        let before = *self;
        self.max = max;
        self.current = self.current.min(max);
        before != *self
    }

    /// Fill ratio for progress bars, `0.0` for a zero-capacity pool.
    pub fn ratio(&self) -> f32 {
        if self.max == 0 {
            0.0
        } else {
            self.current as f32 / self.max as f32
        }
    }

    /// Pull an out-of-range fill level back under the cap.
    pub(crate) fn normalize(&mut self) -> bool {
        if self.current > self.max {
            self.current = self.max;
            true
        } else {
            false
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.current, self.max)
    }
}

/// Anything with a fill level and a cap that the ledger can move.
pub trait Pool {
    fn current(&self) -> u32;
    fn max(&self) -> u32;
    /// Store a fill level already checked to be within `[0, max]`.
    fn store(&mut self, current: u32);
}

impl Pool for Counter {
    fn current(&self) -> u32 {
        self.current
    }

    fn max(&self) -> u32 {
        self.max
    }

    fn store(&mut self, current: u32) {
        self.current = current;
    }
}

/// Hit dice seen as a pool: the cap is the character level and the fill level
/// is the number of dice still available.
///
/// The character only records how many dice were spent, so this is a view
/// over that field rather than a stored counter.
#[derive(Debug)]
pub struct HitDicePool<'a> {
    used: &'a mut u32,
    level: u32,
}

impl<'a> HitDicePool<'a> {
    pub fn new(used: &'a mut u32, level: u32) -> Self {
        Self { used, level }
    }

    pub fn used(&self) -> u32 {
        *self.used
    }
}

impl Pool for HitDicePool<'_> {
    fn current(&self) -> u32 {
        self.level.saturating_sub(*self.used)
    }

    fn max(&self) -> u32 {
        self.level
    }

    fn store(&mut self, current: u32) {
        *self.used = self.level - current;
    }
}

/// Move a pool's fill level by `delta`.
///
/// The change is applied only when the result stays within `[0, max]`;
/// otherwise the pool is left untouched and `false` is returned.
pub fn adjust<P: Pool + ?Sized>(pool: &mut P, delta: i32) -> bool {
    let target = i64::from(pool.current()) + i64::from(delta);
    match u32::try_from(target) {
        Ok(value) if value <= pool.max() => {
            pool.store(value);
            true
        }
        _ => false,
    }
}

// ============================================================================
// Addressing counters on a character
// ============================================================================

/// Which counter on a character an adjustment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterRef {
    /// Uses of the feature at this position.
    Feature(usize),
    /// Charges of the item at this position.
    Item(usize),
    /// Slots of this spell level (1-9).
    SpellSlot(u8),
    /// Remaining hit dice.
    HitDice,
}

impl Character {
    /// Adjust one of the character's counters. See [`adjust`].
    ///
    /// `Ok(false)` means the request was out of range and ignored. An index or
    /// spell level that does not exist is an error.
    pub fn adjust_counter(&mut self, counter: CounterRef, delta: i32) -> Result<bool, EditError> {
        let applied = match counter {
            CounterRef::Feature(index) => {
                let len = self.features.len();
                let feature = self
                    .features
                    .get_mut(index)
                    .ok_or(EditError::NoSuchEntry {
                        list: ListKind::Features,
                        index,
                        len,
                    })?;
                adjust(&mut feature.uses, delta)
            }
            CounterRef::Item(index) => {
                let len = self.items.len();
                let item = self.items.get_mut(index).ok_or(EditError::NoSuchEntry {
                    list: ListKind::Items,
                    index,
                    len,
                })?;
                adjust(&mut item.charges, delta)
            }
            CounterRef::SpellSlot(level) => {
                let slot = self
                    .spell_slots
                    .get_mut(level)
                    .ok_or(EditError::SpellLevel(level))?;
                adjust(slot, delta)
            }
            CounterRef::HitDice => adjust(&mut self.hit_dice_pool(), delta),
        };
        Ok(applied)
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// The two ordered lists on a character sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Features,
    Items,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Features => write!(f, "features"),
            ListKind::Items => write!(f, "items"),
        }
    }
}

/// Direction for moving an entry within its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards the front (index - 1).
    Up,
    /// Towards the back (index + 1).
    Down,
}

impl Direction {
    /// Parse a `-1` / `+1` step.
    pub fn from_offset(offset: i32) -> Option<Self> {
        match offset {
            -1 => Some(Direction::Up),
            1 => Some(Direction::Down),
            _ => None,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    fn target(self, index: usize) -> Option<usize> {
        match self {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        }
    }
}

/// Swap the entry at `index` with its neighbour in `direction`.
///
/// Returns `false` without touching the list when either position is out of
/// bounds.
pub fn reorder<T>(list: &mut [T], index: usize, direction: Direction) -> bool {
    match direction.target(index) {
        Some(target) if index < list.len() && target < list.len() => {
            list.swap(index, target);
            true
        }
        _ => false,
    }
}
