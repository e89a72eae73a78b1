use crate::{
    catalog::{LocationDirectory, LocationKind, ShippingMethodCatalog},
    errors::ServiceError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Method kind used by pickup-style shipping instances.
pub const PICKUP_METHOD_KIND: &str = "local-pickup";

/// Request-scoped map from shipping instance to fulfilling location.
///
/// Rebuilt per request; cheap relative to mutation frequency, and staleness
/// across requests is not acceptable, so it is never persisted.
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    assignments: HashMap<String, Assignment>,
}

#[derive(Debug, Clone, Copy)]
struct Assignment {
    location_id: i32,
    kind: LocationKind,
}

impl RoutingTable {
    pub fn resolve(&self, instance_id: &str) -> Option<i32> {
        self.assignments.get(instance_id).map(|a| a.location_id)
    }
}

/// Maps a shipping-method instance to the single location that fulfills
/// orders placed through it.
#[derive(Clone)]
pub struct FulfillmentRouter {
    locations: Arc<dyn LocationDirectory>,
    shipping: Arc<dyn ShippingMethodCatalog>,
}

impl FulfillmentRouter {
    pub fn new(
        locations: Arc<dyn LocationDirectory>,
        shipping: Arc<dyn ShippingMethodCatalog>,
    ) -> Self {
        Self {
            locations,
            shipping,
        }
    }

    /// Builds the full instance→location table.
    ///
    /// Locations are scanned in ascending id order regardless of publication
    /// state, so the first-seen fallback is stable across runs. Tie-break:
    /// pickup-kind instances prefer a store over a non-store incumbent;
    /// every other kind prefers a distribution center over a non-DC
    /// incumbent; otherwise the incumbent stays.
    #[instrument(skip(self))]
    pub async fn routing_table(&self) -> Result<RoutingTable, ServiceError> {
        let kinds: HashMap<String, String> = self
            .shipping
            .instances()
            .await?
            .into_iter()
            .filter(|i| i.enabled)
            .map(|i| (i.instance_id, i.method_kind))
            .collect();

        let mut table = RoutingTable::default();

        for location in self.locations.all().await? {
            for instance_id in &location.shipping_instance_ids {
                let Some(method_kind) = kinds.get(instance_id) else {
                    // Disabled or unknown instance
                    continue;
                };

                let candidate = Assignment {
                    location_id: location.id,
                    kind: location.kind,
                };

                match table.assignments.get(instance_id) {
                    None => {
                        table.assignments.insert(instance_id.clone(), candidate);
                    }
                    Some(incumbent) => {
                        let preferred = preferred_kind(method_kind);
                        if incumbent.kind != preferred && candidate.kind == preferred {
                            debug!(
                                instance_id = instance_id.as_str(),
                                from = incumbent.location_id,
                                to = candidate.location_id,
                                "tie-break reassigned fulfillment location"
                            );
                            table.assignments.insert(instance_id.clone(), candidate);
                        }
                    }
                }
            }
        }

        Ok(table)
    }

    /// Convenience lookup over a freshly built table.
    pub async fn resolve(&self, instance_id: &str) -> Result<Option<i32>, ServiceError> {
        Ok(self.routing_table().await?.resolve(instance_id))
    }
}

fn preferred_kind(method_kind: &str) -> LocationKind {
    if method_kind == PICKUP_METHOD_KIND {
        LocationKind::Store
    } else {
        LocationKind::DistributionCenter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::{location, MemoryCatalog};
    use crate::catalog::{PublicationState, ShippingInstance};
    use test_case::test_case;

    #[test_case(PICKUP_METHOD_KIND, LocationKind::Store; "pickup prefers store")]
    #[test_case("standard-delivery", LocationKind::DistributionCenter; "standard prefers dc")]
    #[test_case("express-courier", LocationKind::DistributionCenter; "any carrier prefers dc")]
    fn preferred_kind_by_method(method_kind: &str, expected: LocationKind) {
        assert_eq!(preferred_kind(method_kind), expected);
    }

    fn catalog_with(
        locations: Vec<crate::catalog::LocationRecord>,
        instances: Vec<(&str, &str, bool)>,
    ) -> Arc<MemoryCatalog> {
        let catalog = Arc::new(MemoryCatalog::new());
        for l in locations {
            catalog.insert_location(l);
        }
        for (id, kind, enabled) in instances {
            catalog.insert_shipping_instance(ShippingInstance {
                instance_id: id.to_string(),
                method_kind: kind.to_string(),
                enabled,
            });
        }
        catalog
    }

    fn router(catalog: &Arc<MemoryCatalog>) -> FulfillmentRouter {
        FulfillmentRouter::new(
            Arc::clone(catalog) as Arc<dyn LocationDirectory>,
            Arc::clone(catalog) as Arc<dyn ShippingMethodCatalog>,
        )
    }

    #[tokio::test]
    async fn pickup_prefers_store_and_delivery_prefers_dc() {
        let catalog = catalog_with(
            vec![
                location(
                    1,
                    "Downtown Store",
                    LocationKind::Store,
                    PublicationState::Published,
                    &["inst-pickup", "inst-standard"],
                ),
                location(
                    2,
                    "East DC",
                    LocationKind::DistributionCenter,
                    PublicationState::Published,
                    &["inst-pickup", "inst-standard"],
                ),
            ],
            vec![
                ("inst-pickup", PICKUP_METHOD_KIND, true),
                ("inst-standard", "standard-delivery", true),
            ],
        );

        let router = router(&catalog);
        assert_eq!(router.resolve("inst-pickup").await.unwrap(), Some(1));
        assert_eq!(router.resolve("inst-standard").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn tie_break_overrides_incumbent_regardless_of_scan_order() {
        // DC has the lower id, so it is seen first; the store must still win
        // the pickup instance.
        let catalog = catalog_with(
            vec![
                location(
                    1,
                    "East DC",
                    LocationKind::DistributionCenter,
                    PublicationState::Published,
                    &["inst-pickup"],
                ),
                location(
                    2,
                    "Downtown Store",
                    LocationKind::Store,
                    PublicationState::Draft,
                    &["inst-pickup"],
                ),
            ],
            vec![("inst-pickup", PICKUP_METHOD_KIND, true)],
        );

        let router = router(&catalog);
        assert_eq!(router.resolve("inst-pickup").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn fallback_keeps_first_seen_when_neither_matches_preference() {
        // Two stores competing for a delivery instance: neither is a DC,
        // lowest id wins and stays.
        let catalog = catalog_with(
            vec![
                location(
                    5,
                    "Store A",
                    LocationKind::Store,
                    PublicationState::Published,
                    &["inst-standard"],
                ),
                location(
                    9,
                    "Store B",
                    LocationKind::Store,
                    PublicationState::Published,
                    &["inst-standard"],
                ),
            ],
            vec![("inst-standard", "standard-delivery", true)],
        );

        let router = router(&catalog);
        assert_eq!(router.resolve("inst-standard").await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn disabled_instances_are_ignored() {
        let catalog = catalog_with(
            vec![location(
                1,
                "Downtown Store",
                LocationKind::Store,
                PublicationState::Published,
                &["inst-off"],
            )],
            vec![("inst-off", PICKUP_METHOD_KIND, false)],
        );

        let router = router(&catalog);
        assert_eq!(router.resolve("inst-off").await.unwrap(), None);
    }
}
