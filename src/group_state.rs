//! Ternary group-state algebra.
//
// Grounded on `groupstate.h` / `groupstatecomputer.cpp` from the KDE
// original: three independent attributes, each `None`/`Some`/`All`, packed
// into one bitflags value and combined with an absorbing-`Some` algebra.

/// The composition state of one attribute (selected / filtered-positive /
/// region-selected) across a collection of items or tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ternary {
    #[default]
    None,
    Some,
    All,
}

impl Ternary {
    /// `None == 0 items`, `All == item_count items`, else `Some`.
    pub fn from_counts(matching: usize, total: usize) -> Ternary {
        if total == 0 || matching == 0 {
            Ternary::None
        } else if matching == total {
            Ternary::All
        } else {
            Ternary::Some
        }
    }

    /// Fold `other` into an accumulator per §7: the first value seeds the
    /// accumulator; after that, any `None` downgrades an `All` accumulator
    /// to `Some`, and `Some` is absorbing once reached.
    pub fn combine(acc: Option<Ternary>, other: Ternary) -> Ternary {
        match acc {
            None => other,
            Some(Ternary::Some) => Ternary::Some,
            Some(Ternary::None) => {
                if other == Ternary::None {
                    Ternary::None
                } else {
                    Ternary::Some
                }
            }
            Some(Ternary::All) => {
                if other == Ternary::All {
                    Ternary::All
                } else {
                    Ternary::Some
                }
            }
        }
    }
}

bitflags::bitflags! {
    /// Which attributes a [`GroupState`] is tracking at `All` or `Some`.
    ///
    /// Used internally by [`GroupState`] as a compact representation; most
    /// callers use the per-attribute accessors instead of these flags
    /// directly.
    #[derive(Default)]
    struct StateBits: u8 {
        const SELECTED_SOME         = 1 << 0;
        const SELECTED_ALL          = 1 << 1;
        const FILTERED_SOME         = 1 << 2;
        const FILTERED_ALL          = 1 << 3;
        const REGION_SELECTED_SOME  = 1 << 4;
        const REGION_SELECTED_ALL   = 1 << 5;
    }
}

fn to_bits(value: Ternary, some_bit: StateBits, all_bit: StateBits) -> StateBits {
    match value {
        Ternary::None => StateBits::empty(),
        Ternary::Some => some_bit,
        Ternary::All => some_bit | all_bit,
    }
}

fn from_bits(bits: StateBits, some_bit: StateBits, all_bit: StateBits) -> Ternary {
    if bits.contains(all_bit) {
        Ternary::All
    } else if bits.contains(some_bit) {
        Ternary::Some
    } else {
        Ternary::None
    }
}

/// The combined selection / filter / region-selection state of a tile or
/// cluster, per §3's `Cluster.group_state` and §7's group-state algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupState {
    bits: StateBits,
}

impl GroupState {
    pub fn new(selected: Ternary, filtered_positive: Ternary, region_selected: Ternary) -> Self {
        let bits = to_bits(selected, StateBits::SELECTED_SOME, StateBits::SELECTED_ALL)
            | to_bits(filtered_positive, StateBits::FILTERED_SOME, StateBits::FILTERED_ALL)
            | to_bits(region_selected, StateBits::REGION_SELECTED_SOME, StateBits::REGION_SELECTED_ALL);
        Self { bits }
    }

    pub fn selected(&self) -> Ternary {
        from_bits(self.bits, StateBits::SELECTED_SOME, StateBits::SELECTED_ALL)
    }

    pub fn filtered_positive(&self) -> Ternary {
        from_bits(self.bits, StateBits::FILTERED_SOME, StateBits::FILTERED_ALL)
    }

    pub fn region_selected(&self) -> Ternary {
        from_bits(self.bits, StateBits::REGION_SELECTED_SOME, StateBits::REGION_SELECTED_ALL)
    }

    pub fn set_selected(&mut self, value: Ternary) {
        *self = GroupState::new(value, self.filtered_positive(), self.region_selected());
    }

    pub fn set_filtered_positive(&mut self, value: Ternary) {
        *self = GroupState::new(self.selected(), value, self.region_selected());
    }

    pub fn set_region_selected(&mut self, value: Ternary) {
        *self = GroupState::new(self.selected(), self.filtered_positive(), value);
    }

    /// Fold `child` into `self` per attribute, using [`Ternary::combine`].
    /// `is_first` seeds the accumulator instead of combining with a
    /// meaningless `None` default.
    pub fn add_state(&mut self, child: GroupState, is_first: bool) {
        let sel = if is_first { child.selected() } else { Ternary::combine(Some(self.selected()), child.selected()) };
        let filt = if is_first { child.filtered_positive() } else { Ternary::combine(Some(self.filtered_positive()), child.filtered_positive()) };
        let reg = if is_first { child.region_selected() } else { Ternary::combine(Some(self.region_selected()), child.region_selected()) };
        *self = GroupState::new(sel, filt, reg);
    }

    pub fn add_selected_state(&mut self, value: Ternary, is_first: bool) {
        let sel = if is_first { value } else { Ternary::combine(Some(self.selected()), value) };
        self.set_selected(sel);
    }

    pub fn add_filtered_positive_state(&mut self, value: Ternary, is_first: bool) {
        let filt = if is_first { value } else { Ternary::combine(Some(self.filtered_positive()), value) };
        self.set_filtered_positive(filt);
    }

    pub fn add_region_selected_state(&mut self, value: Ternary, is_first: bool) {
        let reg = if is_first { value } else { Ternary::combine(Some(self.region_selected()), value) };
        self.set_region_selected(reg);
    }

    /// The tile/cluster selected-state per §7: `None` if `selected_count ==
    /// 0`, `All` if `selected_count == item_count`, else `Some`.
    pub fn from_selection_counts(selected_count: usize, item_count: usize) -> Ternary {
        Ternary::from_counts(selected_count, item_count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_counts_matches_spec_thresholds() {
        assert_eq!(Ternary::from_counts(0, 5), Ternary::None);
        assert_eq!(Ternary::from_counts(5, 5), Ternary::All);
        assert_eq!(Ternary::from_counts(2, 5), Ternary::Some);
        assert_eq!(Ternary::from_counts(0, 0), Ternary::None);
    }

    #[test]
    fn combine_all_with_none_downgrades_to_some() {
        let mut acc = None;
        acc = Some(Ternary::combine(acc, Ternary::All));
        acc = Some(Ternary::combine(acc, Ternary::None));
        assert_eq!(acc, Some(Ternary::Some));
    }

    #[test]
    fn combine_all_with_all_stays_all() {
        let mut acc = None;
        acc = Some(Ternary::combine(acc, Ternary::All));
        acc = Some(Ternary::combine(acc, Ternary::All));
        assert_eq!(acc, Some(Ternary::All));
    }

    #[test]
    fn some_is_absorbing() {
        let mut acc = Some(Ternary::Some);
        acc = Some(Ternary::combine(acc, Ternary::All));
        assert_eq!(acc, Some(Ternary::Some));
    }

    #[test]
    fn group_state_round_trips_each_attribute_independently() {
        let mut gs = GroupState::default();
        gs.set_selected(Ternary::All);
        gs.set_filtered_positive(Ternary::Some);
        gs.set_region_selected(Ternary::None);
        assert_eq!(gs.selected(), Ternary::All);
        assert_eq!(gs.filtered_positive(), Ternary::Some);
        assert_eq!(gs.region_selected(), Ternary::None);
    }

    #[test]
    fn add_state_folds_children_like_combine() {
        let mut acc = GroupState::default();
        acc.add_selected_state(Ternary::All, true);
        acc.add_selected_state(Ternary::All, false);
        assert_eq!(acc.selected(), Ternary::All);
        acc.add_selected_state(Ternary::None, false);
        assert_eq!(acc.selected(), Ternary::Some);
    }
}
