//! Ordinal color scale for group labels

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Group;

/// The "Accent" categorical scheme (ColorBrewer)
pub const ACCENT: [&str; 8] = [
    "#7fc97f", "#beaed4", "#fdc086", "#ffff99", "#386cb0", "#f0027f", "#bf5b17", "#666666",
];

/// How group values are assigned palette slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteOrder {
    /// In order of first appearance in the node sequence
    #[default]
    FirstSeen,
    /// In ascending group order
    Sorted,
}

/// Maps each distinct group value to a palette color.
///
/// A missing group is a domain value of its own. The palette wraps around when
/// there are more groups than colors.
#[derive(Debug, Clone)]
pub struct OrdinalScale {
    palette: Vec<String>,
    slots: BTreeMap<Option<Group>, usize>,
}

impl OrdinalScale {
    pub fn new(palette: Vec<String>) -> Self {
        Self {
            palette,
            slots: BTreeMap::new(),
        }
    }

    /// Build a scale whose domain is fixed up front from a group sequence
    pub fn from_groups<'a>(
        palette: Vec<String>,
        groups: impl IntoIterator<Item = Option<&'a Group>>,
        order: PaletteOrder,
    ) -> Self {
        let mut scale = Self::new(palette);
        match order {
            PaletteOrder::FirstSeen => {
                for group in groups {
                    scale.slot(group);
                }
            }
            PaletteOrder::Sorted => {
                let mut distinct: Vec<Option<Group>> = groups.into_iter().map(|g| g.cloned()).collect();
                distinct.sort();
                distinct.dedup();
                for group in distinct {
                    scale.slot(group.as_ref());
                }
            }
        }
        scale
    }

    fn slot(&mut self, group: Option<&Group>) -> usize {
        let next = self.slots.len();
        *self.slots.entry(group.cloned()).or_insert(next)
    }

    /// Color for a group, extending the domain if the group is new
    pub fn color(&mut self, group: Option<&Group>) -> &str {
        let slot = self.slot(group);
        self.color_at(slot)
    }

    /// Color for a group already in the domain
    pub fn get(&self, group: Option<&Group>) -> Option<&str> {
        let key = group.cloned();
        self.slots.get(&key).map(|&slot| self.color_at(slot))
    }

    fn color_at(&self, slot: usize) -> &str {
        if self.palette.is_empty() {
            return "";
        }
        &self.palette[slot % self.palette.len()]
    }

    /// Domain values in slot order
    pub fn domain(&self) -> Vec<Option<Group>> {
        let mut entries: Vec<_> = self.slots.iter().collect();
        entries.sort_by_key(|(_, slot)| **slot);
        entries.into_iter().map(|(group, _)| group.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accent() -> Vec<String> {
        ACCENT.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn first_seen_order_assigns_slots_in_sequence() {
        let groups = [Group::Integer(3), Group::Integer(1), Group::Integer(3)];
        let scale = OrdinalScale::from_groups(
            accent(),
            groups.iter().map(Some),
            PaletteOrder::FirstSeen,
        );

        assert_eq!(scale.get(Some(&Group::Integer(3))), Some(ACCENT[0]));
        assert_eq!(scale.get(Some(&Group::Integer(1))), Some(ACCENT[1]));
        assert_eq!(scale.domain().len(), 2);
    }

    #[test]
    fn sorted_order_is_independent_of_sequence() {
        let a = [Group::Integer(3), Group::Integer(1), Group::Integer(2)];
        let b = [Group::Integer(2), Group::Integer(3), Group::Integer(1)];
        let sa = OrdinalScale::from_groups(accent(), a.iter().map(Some), PaletteOrder::Sorted);
        let sb = OrdinalScale::from_groups(accent(), b.iter().map(Some), PaletteOrder::Sorted);

        assert_eq!(sa.domain(), sb.domain());
        assert_eq!(sa.get(Some(&Group::Integer(1))), Some(ACCENT[0]));
    }

    #[test]
    fn missing_group_is_its_own_value() {
        let mut scale = OrdinalScale::new(accent());
        assert_eq!(scale.color(None), ACCENT[0]);
        assert_eq!(scale.color(Some(&Group::from("x"))), ACCENT[1]);
        assert_eq!(scale.color(None), ACCENT[0]);
    }

    #[test]
    fn palette_wraps_around() {
        let mut scale = OrdinalScale::new(vec!["red".to_string(), "blue".to_string()]);
        let colors: Vec<String> = (0..3)
            .map(|i| scale.color(Some(&Group::Integer(i))).to_string())
            .collect();
        assert_eq!(colors, ["red", "blue", "red"]);
    }

    #[test]
    fn same_sequence_gives_same_colors() {
        let groups: Vec<Group> = ["b", "a", "c", "a"].into_iter().map(Group::from).collect();
        let one = OrdinalScale::from_groups(accent(), groups.iter().map(Some), PaletteOrder::FirstSeen);
        let two = OrdinalScale::from_groups(accent(), groups.iter().map(Some), PaletteOrder::FirstSeen);
        assert_eq!(one.domain(), two.domain());
    }
}
