//! Ordering of sibling frames

use crate::tree::FrameNode;
use std::cmp::Ordering;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Property by which sibling frames can be sorted
#[derive(Copy, Clone, Debug, Display, EnumString, Eq, Hash, IntoStaticStr, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum SortKey {
    /// Cost of a frame including its callees
    #[strum(to_string = "total weight")]
    TotalWeight,

    /// Cost of a frame excluding its callees
    #[strum(to_string = "self weight")]
    SelfWeight,

    /// Frame name
    #[strum(to_string = "name")]
    Name,
}
//
impl SortKey {
    /// Parse a sort property name, failing on unknown names
    pub fn parse(property: &str) -> Result<Self, SortError> {
        property
            .parse()
            .map_err(|_| SortError::UnknownProperty(property.into()))
    }

    /// Comparator that sorts frames in ascending order of this property
    fn ascending(self) -> fn(&FrameNode<'_>, &FrameNode<'_>) -> Ordering {
        match self {
            Self::TotalWeight => by_total_weight,
            Self::SelfWeight => by_self_weight,
            Self::Name => by_name,
        }
    }
}

/// Direction in which a property is sorted
#[derive(Copy, Clone, Debug, Display, EnumString, Eq, Hash, IntoStaticStr, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum SortDirection {
    /// Smallest values first
    #[strum(to_string = "asc")]
    Ascending,

    /// Largest values first
    #[strum(to_string = "desc")]
    Descending,
}
//
impl SortDirection {
    /// Parse a sort direction name, failing on unknown names
    pub fn parse(direction: &str) -> Result<Self, SortError> {
        direction
            .parse()
            .map_err(|_| SortError::UnknownDirection(direction.into()))
    }

    /// The other direction
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Active sorting configuration of a frame stack table
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct SortConfig {
    /// Property that frames are sorted by
    pub key: SortKey,

    /// Direction in which they are sorted
    pub direction: SortDirection,
}
//
impl SortConfig {
    /// Set up a sorting configuration
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Configuration after the header of a column has been clicked
    ///
    /// Clicking the active column flips the direction, clicking another
    /// column sorts by that column in descending order.
    pub fn clicked(self, key: SortKey) -> Self {
        if key == self.key {
            Self {
                key,
                direction: self.direction.reversed(),
            }
        } else {
            Self {
                key,
                direction: SortDirection::Descending,
            }
        }
    }

    /// Compare two frames according to this configuration
    ///
    /// With the name property, `Descending` lists names in alphabetical order
    /// and `Ascending` in reverse alphabetical order, which is the opposite of
    /// the numeric properties.
    pub fn compare(&self, a: &FrameNode<'_>, b: &FrameNode<'_>) -> Ordering {
        let ordering = (self.key.ascending())(a, b);
        let reverse = match self.key {
            SortKey::Name => self.direction == SortDirection::Ascending,
            SortKey::TotalWeight | SortKey::SelfWeight => {
                self.direction == SortDirection::Descending
            }
        };
        if reverse {
            ordering.reverse()
        } else {
            ordering
        }
    }
}
//
impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::TotalWeight,
            direction: SortDirection::Descending,
        }
    }
}

/// Build a frame comparator from a property and a direction
pub fn make_comparator(
    key: SortKey,
    direction: SortDirection,
) -> impl Fn(&FrameNode<'_>, &FrameNode<'_>) -> Ordering {
    let config = SortConfig::new(key, direction);
    move |a: &FrameNode<'_>, b: &FrameNode<'_>| config.compare(a, b)
}

/// Compare frames by total weight
fn by_total_weight(a: &FrameNode<'_>, b: &FrameNode<'_>) -> Ordering {
    a.total_weight().total_cmp(&b.total_weight())
}

/// Compare frames by self weight
fn by_self_weight(a: &FrameNode<'_>, b: &FrameNode<'_>) -> Ordering {
    a.self_weight().total_cmp(&b.self_weight())
}

/// Compare frames by name
fn by_name(a: &FrameNode<'_>, b: &FrameNode<'_>) -> Ordering {
    compare_names(a.frame().name(), b.frame().name())
}

/// Case-insensitive name comparison, with case used as a tie-break
fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<_>>();
    folded(a).cmp(&folded(b)).then_with(|| a.cmp(b))
}

/// What can go wrong while configuring the sort
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SortError {
    /// Sort property name is not one of "total weight", "self weight", "name"
    #[error("unknown sort property {0:?} (expected \"total weight\", \"self weight\" or \"name\")")]
    UnknownProperty(String),

    /// Sort direction name is not one of "asc", "desc"
    #[error("unknown sort direction {0:?} (expected \"asc\" or \"desc\")")]
    UnknownDirection(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::tree_from_stacks;
    use assert_matches::assert_matches;

    #[test]
    fn parse_and_display() {
        assert_eq!(SortKey::parse("total weight"), Ok(SortKey::TotalWeight));
        assert_eq!(SortKey::parse("self weight"), Ok(SortKey::SelfWeight));
        assert_eq!(SortKey::parse("name"), Ok(SortKey::Name));
        assert_matches!(
            SortKey::parse("weight"),
            Err(SortError::UnknownProperty(p)) if p == "weight"
        );
        assert_eq!(SortKey::SelfWeight.to_string(), "self weight");

        assert_eq!(SortDirection::parse("asc"), Ok(SortDirection::Ascending));
        assert_eq!(SortDirection::parse("desc"), Ok(SortDirection::Descending));
        assert_matches!(
            SortDirection::parse("up"),
            Err(SortError::UnknownDirection(_))
        );
        assert_eq!(SortDirection::Descending.to_string(), "desc");
    }

    #[test]
    fn header_clicks() {
        let config = SortConfig::default();
        assert_eq!(
            config,
            SortConfig::new(SortKey::TotalWeight, SortDirection::Descending)
        );

        let flipped = config.clicked(SortKey::TotalWeight);
        assert_eq!(flipped.direction, SortDirection::Ascending);
        assert_eq!(flipped.clicked(SortKey::TotalWeight), config);

        let by_name = flipped.clicked(SortKey::Name);
        assert_eq!(
            by_name,
            SortConfig::new(SortKey::Name, SortDirection::Descending)
        );
    }

    #[test]
    fn comparators() {
        let tree = tree_from_stacks(&[("big", 30.0), ("Small;x", 10.0), ("small", 1.0)]);
        let nodes = tree.roots().collect::<Vec<_>>();
        let (big, small_upper, small_lower) = (nodes[0], nodes[1], nodes[2]);
        assert_eq!(small_upper.total_weight(), 10.0);
        assert_eq!(small_upper.self_weight(), 0.0);

        let total_desc = make_comparator(SortKey::TotalWeight, SortDirection::Descending);
        assert_eq!(total_desc(&big, &small_upper), Ordering::Less);
        let total_asc = make_comparator(SortKey::TotalWeight, SortDirection::Ascending);
        assert_eq!(total_asc(&big, &small_upper), Ordering::Greater);

        let self_desc = make_comparator(SortKey::SelfWeight, SortDirection::Descending);
        assert_eq!(self_desc(&small_lower, &small_upper), Ordering::Less);

        // Descending name order is alphabetical
        let name_desc = make_comparator(SortKey::Name, SortDirection::Descending);
        assert_eq!(name_desc(&big, &small_lower), Ordering::Less);
        assert_eq!(name_desc(&small_upper, &small_lower), Ordering::Less);
        let name_asc = make_comparator(SortKey::Name, SortDirection::Ascending);
        assert_eq!(name_asc(&big, &small_lower), Ordering::Greater);
        assert_eq!(name_asc(&big, &big), Ordering::Equal);
    }

    #[test]
    fn name_folding() {
        assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_names("Zebra", "apple"), Ordering::Greater);
        assert_eq!(compare_names("Apple", "apple"), Ordering::Less);
        assert_eq!(compare_names("apple", "apple"), Ordering::Equal);
    }
}
