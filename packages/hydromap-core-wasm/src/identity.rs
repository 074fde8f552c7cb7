// Stable keys used to correlate one logical feature across the map and the list.
use std::fmt;

use crate::dataset::Feature;
use crate::geometry::Geometry;

/// Equality key for a feature, derived only from its content.
///
/// Two features are the same feature iff their names and canonical geometry
/// text are equal. `occurrence` separates exact duplicates when the
/// `Distinct` duplicate policy is active and is 0 otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureIdentity {
    name: String,
    geometry: String,
    occurrence: u32,
}

impl FeatureIdentity {
    pub fn new(name: &str, geometry: &Geometry) -> Self {
        FeatureIdentity {
            name: name.to_string(),
            geometry: geometry.canonical(),
            occurrence: 0,
        }
    }

    /// Recompute the identity of a feature from its content alone.
    pub fn of(feature: &Feature) -> Self {
        FeatureIdentity::new(feature.name(), feature.geometry()).with_occurrence(feature.occurrence())
    }

    pub fn with_occurrence(mut self, occurrence: u32) -> Self {
        self.occurrence = occurrence;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn occurrence(&self) -> u32 {
        self.occurrence
    }

    /// Row key handed to the page; same text as `Display`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

/// "name-geometry", with "#n" appended for separated duplicates.
impl fmt::Display for FeatureIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.geometry)?;
        if self.occurrence > 0 {
            write!(f, "#{}", self.occurrence)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn polygon(offset: f64, size: f64) -> Geometry {
        Geometry::from_value(&json!({
            "type": "Polygon",
            "coordinates": [[
                [offset, offset],
                [offset + size, offset],
                [offset + size, offset + size],
                [offset, offset]
            ]]
        }))
        .expect("polygon")
    }

    #[test]
    fn key_matches_display_and_marks_occurrence() {
        let geometry = polygon(0.0, 1.0);
        let id = FeatureIdentity::new("Lake Eola", &geometry);
        assert_eq!(id.key(), format!("Lake Eola-{}", geometry.canonical()));
        assert_eq!(id.occurrence(), 0);

        let second = id.clone().with_occurrence(1);
        assert_ne!(id, second);
        assert!(second.key().ends_with("#1"));
    }

    #[test]
    fn same_name_different_geometry_is_a_different_feature() {
        let a = FeatureIdentity::new("Pond", &polygon(0.0, 1.0));
        let b = FeatureIdentity::new("Pond", &polygon(0.0, 2.0));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn identity_is_stable(name in "[A-Za-z ]{0,24}", offset in -90.0f64..90.0, size in 0.001f64..5.0) {
            let geometry = polygon(offset, size);
            let first = FeatureIdentity::new(&name, &geometry);
            let second = FeatureIdentity::new(&name, &geometry.clone());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.key(), second.key());
        }

        #[test]
        fn identity_discriminates(
            name_a in "[a-z]{1,12}",
            name_b in "[a-z]{1,12}",
            size_a in 0.001f64..5.0,
            size_b in 0.001f64..5.0,
        ) {
            let a = polygon(0.0, size_a);
            let b = polygon(0.0, size_b);
            let same_content = name_a == name_b && a.canonical() == b.canonical();
            prop_assert_eq!(
                FeatureIdentity::new(&name_a, &a) == FeatureIdentity::new(&name_b, &b),
                same_content
            );
        }
    }
}
