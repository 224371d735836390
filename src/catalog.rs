use serde::{Deserialize, Serialize};

use crate::tracking::{CandidateId, Category};

/// A carrier integration that can attempt resolution within some categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProvider {
    pub id: CandidateId,
    pub display_name: String,
    pub categories: Vec<Category>,
}

impl CandidateProvider {
    pub fn new(id: &str, display_name: &str, categories: &[Category]) -> Self {
        Self {
            id: CandidateId::new(id),
            display_name: display_name.to_string(),
            categories: categories.to_vec(),
        }
    }

    pub fn serves(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }
}

const ALL: &[Category] = &[Category::Container, Category::BillOfLading, Category::Booking];
const NO_BOOKING: &[Category] = &[Category::Container, Category::BillOfLading];

/// Built-in carriers, in search priority order.
const BUILTIN: &[(&str, &str, &[Category])] = &[
    ("MSC", "Mediterranean Shipping Company", ALL),
    ("MAERSK", "Maersk", ALL),
    ("CMA_CGM", "CMA CGM", ALL),
    ("COSCO", "COSCO Shipping", ALL),
    ("HAPAG", "Hapag-Lloyd", ALL),
    ("ONE", "Ocean Network Express", ALL),
    ("EVERGREEN", "Evergreen Line", NO_BOOKING),
    ("HMM", "HMM", NO_BOOKING),
    ("YANG_MING", "Yang Ming", NO_BOOKING),
    ("ZIM", "ZIM", ALL),
];

/// Ordered set of carriers the engine may try for a category.
///
/// Order is the search priority; the engine never re-ranks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCatalog {
    providers: Vec<CandidateProvider>,
}

impl Default for CandidateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CandidateCatalog {
    pub fn new(providers: Vec<CandidateProvider>) -> Self {
        Self { providers }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN
                .iter()
                .map(|&(id, name, categories)| CandidateProvider::new(id, name, categories))
                .collect(),
        )
    }

    /// Carriers eligible for `category`, in catalog order. May be empty.
    pub fn list(&self, category: Category) -> Vec<CandidateProvider> {
        self.providers
            .iter()
            .filter(|p| p.serves(category))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &CandidateId) -> Option<&CandidateProvider> {
        self.providers.iter().find(|p| &p.id == id)
    }

    pub fn all(&self) -> &[CandidateProvider] {
        &self.providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(providers: &[CandidateProvider]) -> Vec<&str> {
        providers.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn builtin_lists_every_carrier_for_containers() {
        let catalog = CandidateCatalog::builtin();
        let list = catalog.list(Category::Container);
        assert_eq!(list.len(), 10);
        assert_eq!(list[0].id.as_str(), "MSC");
        assert_eq!(list[9].id.as_str(), "ZIM");
    }

    #[test]
    fn booking_excludes_carriers_without_support() {
        let catalog = CandidateCatalog::builtin();
        let list = catalog.list(Category::Booking);
        assert_eq!(
            ids(&list),
            vec!["MSC", "MAERSK", "CMA_CGM", "COSCO", "HAPAG", "ONE", "ZIM"]
        );
    }

    #[test]
    fn custom_catalog_preserves_order() {
        let catalog = CandidateCatalog::new(vec![
            CandidateProvider::new("ZIM", "ZIM", &[Category::Container]),
            CandidateProvider::new("ONE", "ONE", &[Category::Container]),
            CandidateProvider::new("MSC", "MSC", &[Category::BillOfLading]),
        ]);
        assert_eq!(ids(&catalog.list(Category::Container)), vec!["ZIM", "ONE"]);
        assert!(catalog.list(Category::Booking).is_empty());
    }

    #[test]
    fn get_matches_case_insensitively() {
        let catalog = CandidateCatalog::builtin();
        let found = catalog.get(&CandidateId::from("hapag")).unwrap();
        assert_eq!(found.display_name, "Hapag-Lloyd");
        assert!(catalog.get(&CandidateId::from("NOPE")).is_none());
    }
}
