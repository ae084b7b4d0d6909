//! Provider registry: the static catalog of external data sources.
//!
//! One provider per bureau × attribute, fifteen in total. The catalog is
//! pure data, built once at startup and shared read-only across requests.

use crate::error::RiskweaveError;
use crate::models::{Attribute, Bureau};
use std::collections::{BTreeMap, BTreeSet};

/// Descriptor for one external data source: identity, free-text capability
/// used by the classifier, the lookup fields the source requires, and the
/// path it is invoked at (relative to the configured provider base URL).
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub id: u32,
    pub bureau: Bureau,
    pub attribute: Attribute,
    pub capability: String,
    pub required_fields: Vec<String>,
    pub endpoint_path: String,
}

/// Read-only catalog of provider descriptors keyed by id.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<u32, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// The standard three-bureau catalog. Ids run 1..=15, five attributes
    /// per bureau, each requiring a phone-number lookup key.
    pub fn standard() -> Self {
        let mut providers = BTreeMap::new();
        let mut id = 0u32;

        for bureau in Bureau::ALL {
            for attribute in Attribute::ALL {
                id += 1;
                providers.insert(
                    id,
                    ProviderDescriptor {
                        id,
                        bureau,
                        attribute,
                        capability: attribute.capability_phrase(bureau),
                        required_fields: vec!["phone".to_string()],
                        endpoint_path: format!(
                            "/api/{}/{}",
                            bureau.path_segment(),
                            attribute.path_segment()
                        ),
                    },
                );
            }
        }

        Self { providers }
    }

    /// Look up a descriptor by id. An unknown id is a configuration bug on
    /// the caller's side, not a retry case.
    pub fn describe(&self, id: u32) -> Result<&ProviderDescriptor, RiskweaveError> {
        self.providers
            .get(&id)
            .ok_or(RiskweaveError::UnknownProvider(id))
    }

    /// The full id set.
    pub fn all_ids(&self) -> BTreeSet<u32> {
        self.providers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[allow(dead_code)] // Completes the len/is_empty pair
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Render the catalog as one capability line per provider, for embedding
    /// into the classifier prompt.
    pub fn capability_catalog(&self) -> String {
        let lines: Vec<String> = self
            .providers
            .values()
            .map(|p| {
                format!(
                    r#"  {{ "provider_id": {}, "capability": "{}" }}"#,
                    p.id, p.capability
                )
            })
            .collect();
        format!("[\n{}\n]", lines.join(",\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_shape() {
        let registry = ProviderRegistry::standard();
        assert_eq!(registry.len(), 15);
        assert_eq!(registry.all_ids(), (1..=15).collect());
    }

    #[test]
    fn test_required_fields_never_empty() {
        let registry = ProviderRegistry::standard();
        for id in registry.all_ids() {
            let descriptor = registry.describe(id).unwrap();
            assert!(!descriptor.required_fields.is_empty());
        }
    }

    #[test]
    fn test_describe_known_provider() {
        let registry = ProviderRegistry::standard();
        let first = registry.describe(1).unwrap();
        assert_eq!(first.bureau, Bureau::Alpha);
        assert_eq!(first.attribute, Attribute::CreditScore);
        assert_eq!(first.endpoint_path, "/api/alpha/credit");

        let last = registry.describe(15).unwrap();
        assert_eq!(last.bureau, Bureau::Gamma);
        assert_eq!(last.attribute, Attribute::DebtToIncomeRatio);
        assert_eq!(last.endpoint_path, "/api/gamma/dti_ratio");
    }

    #[test]
    fn test_describe_unknown_provider_fails() {
        let registry = ProviderRegistry::standard();
        let err = registry.describe(99).unwrap_err();
        assert!(matches!(err, RiskweaveError::UnknownProvider(99)));
    }

    #[test]
    fn test_capability_catalog_mentions_every_bureau() {
        let registry = ProviderRegistry::standard();
        let catalog = registry.capability_catalog();
        assert!(catalog.contains("Alpha bureau"));
        assert!(catalog.contains("Beta bureau"));
        assert!(catalog.contains("Gamma bureau"));
        assert!(catalog.contains(r#""provider_id": 15"#));
    }
}
