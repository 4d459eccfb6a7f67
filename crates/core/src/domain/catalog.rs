use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferingName(pub String);

/// Ordered list of product lines the assistant may recommend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    offerings: Vec<OfferingName>,
}

impl Catalog {
    pub fn new(offerings: Vec<OfferingName>) -> Self {
        Self { offerings }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(|name| OfferingName(name.into())).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.offerings.iter().any(|offering| offering.0 == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.offerings.iter().map(|offering| offering.0.as_str())
    }

    pub fn len(&self) -> usize {
        self.offerings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offerings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Catalog;

    #[test]
    fn preserves_configured_order() {
        let catalog = Catalog::from_names(["OceanPro", "RiverLite", "HarborMax"]);
        assert_eq!(catalog.iter().collect::<Vec<_>>(), vec!["OceanPro", "RiverLite", "HarborMax"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn lookup_is_exact() {
        let catalog = Catalog::from_names(["RiverLite 2–6hp (portable)"]);
        assert!(catalog.contains("RiverLite 2–6hp (portable)"));
        assert!(!catalog.contains("riverlite"));
        assert!(!Catalog::default().contains("RiverLite"));
    }
}
