//! Raw foot-switch contacts and the machinery that turns them into trustworthy state changes.

mod debounce;
pub use debounce::*;

mod timer;
pub use timer::*;

/// A snapshot of the monitored contacts, one bit per contact. Bit `n` belongs to switch `n`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DigitalInputMask(u8);

impl DigitalInputMask {
    /// Construct a mask from raw bits.
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// A mask in which no contact is set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a mask from line levels, the first level becoming bit 0. Anything past the eighth level is ignored.
    pub fn from_levels(levels: impl IntoIterator<Item = bool>) -> Self {
        let bits = levels
            .into_iter()
            .take(u8::BITS as usize)
            .enumerate()
            .fold(0_u8, |bits, (i, level)| bits | (u8::from(level) << i));
        Self(bits)
    }

    /// The raw bits of the mask.
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Whether the contact at `index` is set.
    pub const fn is_set(&self, index: u8) -> bool {
        index < u8::BITS as u8 && self.0 & (1 << index) != 0
    }

    /// Returns a mask with a bit set for every contact that differs between `self` and `other`.
    pub const fn changed_bits(&self, other: DigitalInputMask) -> DigitalInputMask {
        Self(self.0 ^ other.0)
    }

    /// Keeps only the lowest `width` bits.
    pub const fn truncate(&self, width: u8) -> DigitalInputMask {
        if width >= u8::BITS as u8 {
            *self
        } else {
            Self(self.0 & ((1 << width) - 1))
        }
    }
}

/// Which line level means a contact is closed.
///
/// With pull-ups enabled an open contact reads high; whether that is "pressed" depends on whether the switch is
/// normally open or normally closed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContactPolarity {
    /// A high line reads as 1. This is the raw port value.
    #[default]
    ActiveHigh,
    /// A low line reads as 1.
    ActiveLow,
}

impl ContactPolarity {
    /// Maps raw line levels to logical contact state, keeping only the lowest `width` bits.
    pub const fn apply(&self, raw: DigitalInputMask, width: u8) -> DigitalInputMask {
        match self {
            Self::ActiveHigh => raw.truncate(width),
            Self::ActiveLow => DigitalInputMask(!raw.0).truncate(width),
        }
    }
}

/// The digital input port the foot switches are wired to.
pub trait InputPort {
    /// Reads every monitored contact afresh. Bit `n` of the result is the raw level of line `n`.
    fn read(&mut self) -> DigitalInputMask;
}

/// A confirmed change of a single contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    /// Bit index of the contact within the [`DigitalInputMask`].
    pub index: u8,
    /// The contact's new state; `true` when its bit became 1.
    pub level: bool,
}

/// An [`Iterator`] over the [`Transition`]s between two confirmed masks, lowest bit first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transitions {
    flipped: u8,
    current: u8,
}

impl Transitions {
    /// Transitions leading from `previous` to `current`.
    pub fn between(previous: DigitalInputMask, current: DigitalInputMask) -> Self {
        Self {
            flipped: previous.changed_bits(current).bits(),
            current: current.bits(),
        }
    }

    /// No transitions at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether any transition remains.
    pub fn is_empty(&self) -> bool {
        self.flipped == 0
    }
}

impl Iterator for Transitions {
    type Item = Transition;

    fn next(&mut self) -> Option<Self::Item> {
        if self.flipped == 0 {
            return None;
        }
        let index = self.flipped.trailing_zeros() as u8;
        // clear the lowest set bit
        self.flipped &= self.flipped - 1;
        Some(Transition {
            index,
            level: self.current & (1 << index) != 0,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.flipped.count_ones() as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Transitions {}
