//! Product-detail shaping shared by the checkout and subscription handlers.
//!
//! Shaping is split in two: [`resolve_products`] performs the catalog
//! lookups and swallows per-product failures, [`shape_product_details`] is
//! a pure transform over whatever was resolved. A product that could not be
//! resolved still yields an entry, titled [`PLACEHOLDER_PRODUCT_TITLE`].

use std::collections::{HashMap, HashSet};

use futures::future::join_all;

use crate::domain::checkout::{ProductDetail, PLACEHOLDER_PRODUCT_TITLE};
use crate::ports::{PaymentProvider, ProviderLineItem, ProviderProduct};

/// Builds one [`ProductDetail`] per line item, in input order.
///
/// `subscription_id` is attached to recurring items only.
pub fn shape_product_details(
    items: &[ProviderLineItem],
    products: &HashMap<String, ProviderProduct>,
    subscription_id: Option<&str>,
) -> Vec<ProductDetail> {
    items
        .iter()
        .map(|item| {
            let product = products.get(&item.product_id);
            let title = product
                .and_then(|p| p.name.as_deref())
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(PLACEHOLDER_PRODUCT_TITLE)
                .to_string();
            let image = product.and_then(|p| p.images.first().cloned());

            ProductDetail {
                product_id: item.product_id.clone(),
                price_id: item.price_id.clone(),
                title,
                image,
                unit_amount: item.unit_amount,
                quantity: item.quantity,
                amount_total: item.amount_total,
                recurring: item.recurring,
                subscription_id: item
                    .recurring
                    .and(subscription_id)
                    .map(str::to_string),
            }
        })
        .collect()
}

/// Looks up every distinct product referenced by `items`, concurrently.
///
/// Failed or empty lookups are logged and left out of the map.
pub async fn resolve_products(
    provider: &dyn PaymentProvider,
    items: &[ProviderLineItem],
) -> HashMap<String, ProviderProduct> {
    let mut seen = HashSet::new();
    let ids: Vec<&str> = items
        .iter()
        .map(|item| item.product_id.as_str())
        .filter(|id| seen.insert(*id))
        .collect();

    let lookups = ids.iter().map(|id| async move { (*id, provider.get_product(id).await) });

    let mut products = HashMap::with_capacity(ids.len());
    for (id, result) in join_all(lookups).await {
        match result {
            Ok(Some(product)) => {
                products.insert(id.to_string(), product);
            }
            Ok(None) => {
                tracing::warn!(product_id = %id, "product not found, using placeholder title");
            }
            Err(e) => {
                tracing::warn!(product_id = %id, error = %e, "product lookup failed, using placeholder title");
            }
        }
    }
    products
}

/// Resolves products and shapes the details in one call.
pub async fn resolve_product_details(
    provider: &dyn PaymentProvider,
    items: &[ProviderLineItem],
    subscription_id: Option<&str>,
) -> Vec<ProductDetail> {
    let products = resolve_products(provider, items).await;
    shape_product_details(items, &products, subscription_id)
}
