//! Gumroad product conversion.

use std::collections::BTreeSet;

use storeshelf_core::{CurrencyCode, Price, Product, ProductId};
use tracing::debug;

use super::UpstreamError;
use super::types::GumroadProduct;

/// Tags with this prefix are product categories (prefix stripped).
const CATEGORY_TAG_PREFIX: &str = "category:";

/// Convert a Gumroad product into the storefront model.
///
/// # Errors
///
/// Returns `UpstreamError::Malformed` if the product has no `id`.
pub fn convert_product(raw: GumroadProduct) -> Result<Product, UpstreamError> {
    let id = raw
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| UpstreamError::Malformed("product is missing id".to_string()))?;

    let slug = derive_slug(
        raw.custom_permalink.as_deref(),
        raw.short_url.as_deref(),
        &id,
    );
    let currency = parse_currency(raw.currency.as_deref(), &id);
    let price_minor_units = raw.price.unwrap_or(0);
    let formatted_price = raw
        .formatted_price
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| Price::from_minor_units(price_minor_units, currency).display());
    let (categories, tags) = split_tags(raw.tags);

    Ok(Product {
        id: ProductId::new(id),
        slug,
        name: raw.name.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        price_minor_units,
        formatted_price,
        currency,
        thumbnail_url: raw.thumbnail_url.or(raw.preview_url),
        url: raw.short_url,
        categories,
        tags,
        rating: raw.rating.filter(|r| (0.0..=5.0).contains(r)),
        sales_count: raw.sales_count,
        published: raw.published.unwrap_or(true),
    })
}

/// Parse the currency code, falling back to the default for missing or
/// unsupported codes.
fn parse_currency(raw: Option<&str>, id: &str) -> CurrencyCode {
    let Some(code) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return CurrencyCode::default();
    };

    CurrencyCode::parse(code).unwrap_or_else(|| {
        debug!(product_id = id, currency = code, "Unsupported currency, using default");
        CurrencyCode::default()
    })
}

/// Pick the human-readable slug: custom permalink, else the last segment of
/// the short URL, else the ID.
fn derive_slug(custom_permalink: Option<&str>, short_url: Option<&str>, id: &str) -> String {
    if let Some(permalink) = custom_permalink.map(str::trim).filter(|s| !s.is_empty()) {
        return permalink.to_string();
    }

    short_url
        .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map_or_else(|| id.to_string(), str::to_string)
}

/// Split Gumroad tags into categories and plain tags.
fn split_tags(raw: Vec<String>) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut categories = BTreeSet::new();
    let mut tags = BTreeSet::new();

    for tag in raw {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        match tag.strip_prefix(CATEGORY_TAG_PREFIX) {
            Some(category) if !category.trim().is_empty() => {
                categories.insert(category.trim().to_string());
            }
            Some(_) => {}
            None => {
                tags.insert(tag.to_string());
            }
        }
    }

    (categories, tags)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw(id: Option<&str>) -> GumroadProduct {
        GumroadProduct {
            id: id.map(str::to_string),
            name: Some("Pencil".to_string()),
            price: Some(1500),
            currency: Some("usd".to_string()),
            short_url: Some("https://seller.gumroad.com/l/pencil".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_id_is_malformed() {
        assert!(matches!(
            convert_product(raw(None)),
            Err(UpstreamError::Malformed(_))
        ));
        assert!(matches!(
            convert_product(raw(Some("  "))),
            Err(UpstreamError::Malformed(_))
        ));
    }

    #[test]
    fn test_slug_from_short_url() {
        let product = convert_product(raw(Some("abc=="))).unwrap();
        assert_eq!(product.id.as_str(), "abc==");
        assert_eq!(product.slug, "pencil");
        assert_eq!(product.url.as_deref(), Some("https://seller.gumroad.com/l/pencil"));
    }

    #[test]
    fn test_custom_permalink_wins() {
        let mut input = raw(Some("abc"));
        input.custom_permalink = Some("fancy-pencil".to_string());
        assert_eq!(convert_product(input).unwrap().slug, "fancy-pencil");
    }

    #[test]
    fn test_slug_falls_back_to_id() {
        let mut input = raw(Some("abc"));
        input.short_url = None;
        assert_eq!(convert_product(input).unwrap().slug, "abc");
    }

    #[test]
    fn test_formatted_price_fallback() {
        let product = convert_product(raw(Some("abc"))).unwrap();
        assert_eq!(product.formatted_price, "$15.00");
        assert_eq!(product.currency, CurrencyCode::USD);
    }

    #[test]
    fn test_unsupported_currency_falls_back_keeping_upstream_text() {
        let mut input = raw(Some("abc"));
        input.currency = Some("jpy".to_string());
        input.formatted_price = Some("¥1500".to_string());

        let product = convert_product(input).unwrap();
        assert_eq!(product.currency, CurrencyCode::default());
        assert_eq!(product.formatted_price, "¥1500");
        assert_eq!(parse_currency(Some(" EUR "), "abc"), CurrencyCode::EUR);
        assert_eq!(parse_currency(None, "abc"), CurrencyCode::default());
    }

    #[test]
    fn test_category_tags_are_split_out() {
        let mut input = raw(Some("abc"));
        input.tags = vec![
            "category:Frontend".to_string(),
            "rust".to_string(),
            "category: ".to_string(),
            String::new(),
        ];
        let product = convert_product(input).unwrap();
        assert_eq!(
            product.categories,
            BTreeSet::from(["Frontend".to_string()])
        );
        assert_eq!(product.tags, BTreeSet::from(["rust".to_string()]));
    }

    #[test]
    fn test_out_of_scale_rating_dropped() {
        let mut input = raw(Some("abc"));
        input.rating = Some(7.5);
        assert_eq!(convert_product(input).unwrap().rating, None);
    }
}
