//! Modalities - what a node may emit or consume
//!
//! Every node type declares a set of modalities. The RPC surface reports them
//! via `get_modalities`; upstream resolution uses them to decide whether a
//! `Source` reference is compatible.

use std::fmt;

/// One payload kind on the stream bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Modality {
    /// Multichannel sample buffers with spans and sample intervals
    Analog = 0,
    /// Camera or rendered frames
    Image = 1,
    /// Motion-capture pose frames
    Motion = 2,
    /// Log text records
    Text = 3,
    /// Stimulation declarations, armed then triggered
    Stim = 4,
}

impl Modality {
    /// All modalities in wire order
    pub const ALL: [Modality; 5] = [
        Modality::Analog,
        Modality::Image,
        Modality::Motion,
        Modality::Text,
        Modality::Stim,
    ];

    /// Wire discriminant
    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire discriminant
    pub fn from_u8(value: u8) -> Option<Modality> {
        match value {
            0 => Some(Modality::Analog),
            1 => Some(Modality::Image),
            2 => Some(Modality::Motion),
            3 => Some(Modality::Text),
            4 => Some(Modality::Stim),
            _ => None,
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Modality::Analog => "analog",
            Modality::Image => "image",
            Modality::Motion => "motion",
            Modality::Text => "text",
            Modality::Stim => "stim",
        };
        f.write_str(name)
    }
}

/// A set of modalities, stored as a bitmask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModalitySet(u8);

impl ModalitySet {
    /// The empty set
    pub const EMPTY: ModalitySet = ModalitySet(0);

    /// Build a set from a list of modalities
    pub fn of(modalities: &[Modality]) -> Self {
        let mut set = ModalitySet::EMPTY;
        for m in modalities {
            set = set.with(*m);
        }
        set
    }

    /// Return this set with `modality` added
    #[must_use]
    pub fn with(self, modality: Modality) -> Self {
        ModalitySet(self.0 | (1 << modality.to_u8()))
    }

    /// Membership test
    #[inline]
    pub fn contains(self, modality: Modality) -> bool {
        self.0 & (1 << modality.to_u8()) != 0
    }

    /// True when no modality is declared
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate members in wire order
    pub fn iter(self) -> impl Iterator<Item = Modality> {
        Modality::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    /// Raw bitmask
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Rebuild from a raw bitmask, ignoring undefined bits
    pub fn from_bits(bits: u8) -> Self {
        ModalitySet(bits & 0b1_1111)
    }
}

impl fmt::Display for ModalitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for m in self.iter() {
            if !first {
                f.write_str("+")?;
            }
            write!(f, "{m}")?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

impl FromIterator<Modality> for ModalitySet {
    fn from_iter<I: IntoIterator<Item = Modality>>(iter: I) -> Self {
        let mut set = ModalitySet::EMPTY;
        for m in iter {
            set = set.with(m);
        }
        set
    }
}
