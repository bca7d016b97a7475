use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PricingError;

/// Which unit-price table applies to every cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingMode {
    #[default]
    Retail,
    Wholesale,
}

impl PricingMode {
    pub fn from_wholesale(is_wholesale: bool) -> Self {
        if is_wholesale { PricingMode::Wholesale } else { PricingMode::Retail }
    }

    pub fn is_wholesale(&self) -> bool {
        matches!(self, PricingMode::Wholesale)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::Retail => "retail",
            PricingMode::Wholesale => "wholesale",
        }
    }
}

fn default_available() -> bool { true }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuote {
    pub product_id: Uuid,
    pub product_name: String,
    #[serde(default)]
    pub product_code: Option<String>,
    pub retail_price: BigDecimal,
    pub wholesale_price: BigDecimal,
    #[serde(default = "default_available")]
    pub available: bool,
}

impl ProductQuote {
    pub fn unit_price_for(&self, mode: PricingMode) -> &BigDecimal {
        match mode {
            PricingMode::Retail => &self.retail_price,
            PricingMode::Wholesale => &self.wholesale_price,
        }
    }
}

/// Source of current unit prices. The engine never fetches prices itself.
pub trait PriceLookup {
    fn quote(&self, product_id: Uuid) -> Result<ProductQuote, PricingError>;
}

impl<T: PriceLookup + ?Sized> PriceLookup for std::sync::Arc<T> {
    fn quote(&self, product_id: Uuid) -> Result<ProductQuote, PricingError> {
        (**self).quote(product_id)
    }
}

/// A price table shared with the backend and updated in place.
impl<T: PriceLookup> PriceLookup for std::sync::RwLock<T> {
    fn quote(&self, product_id: Uuid) -> Result<ProductQuote, PricingError> {
        let guard = self
            .read()
            .map_err(|_| PricingError::Backend("price table lock poisoned".to_string()))?;
        guard.quote(product_id)
    }
}

/// In-memory price table keyed by product id.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    products: HashMap<Uuid, ProductQuote>,
}

impl PriceBook {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, quote: ProductQuote) -> Option<ProductQuote> {
        self.products.insert(quote.product_id, quote)
    }

    pub fn remove(&mut self, product_id: Uuid) -> Option<ProductQuote> {
        self.products.remove(&product_id)
    }

    pub fn set_available(&mut self, product_id: Uuid, available: bool) -> bool {
        match self.products.get_mut(&product_id) {
            Some(quote) => { quote.available = available; true }
            None => false,
        }
    }

    pub fn len(&self) -> usize { self.products.len() }

    pub fn is_empty(&self) -> bool { self.products.is_empty() }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let quotes: Vec<ProductQuote> = serde_json::from_str(text).context("Failed to parse price catalog JSON")?;
        Ok(quotes.into_iter().collect())
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read price catalog {}", path.display()))?;
        let book = Self::from_json(&text)?;
        tracing::debug!(products = book.len(), path = %path.display(), "Loaded price catalog");
        Ok(book)
    }
}

impl FromIterator<ProductQuote> for PriceBook {
    fn from_iter<I: IntoIterator<Item = ProductQuote>>(iter: I) -> Self {
        let mut book = PriceBook::new();
        for quote in iter {
            book.insert(quote);
        }
        book
    }
}

impl PriceLookup for PriceBook {
    fn quote(&self, product_id: Uuid) -> Result<ProductQuote, PricingError> {
        let quote = self.products.get(&product_id).ok_or(PricingError::UnknownProduct(product_id))?;
        if !quote.available {
            return Err(PricingError::ProductUnavailable(product_id));
        }
        Ok(quote.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn catalog_json_defaults_availability() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"[{{"productId":"{id}","productName":"Olive Oil 1L","retailPrice":"12.90","wholesalePrice":9.5}}]"#
        );
        let book = PriceBook::from_json(&json).unwrap();
        let quote = book.quote(id).unwrap();
        assert!(quote.available);
        assert_eq!(quote.product_code, None);
        assert_eq!(quote.unit_price_for(PricingMode::Retail), &BigDecimal::from_str("12.90").unwrap());
        assert_eq!(quote.unit_price_for(PricingMode::Wholesale), &BigDecimal::from_str("9.5").unwrap());
    }

    #[test]
    fn unknown_and_unavailable_are_distinct() {
        let id = Uuid::new_v4();
        let mut book = PriceBook::new();
        book.insert(ProductQuote {
            product_id: id,
            product_name: "Soap".into(),
            product_code: Some("SOAP-1".into()),
            retail_price: BigDecimal::from(3),
            wholesale_price: BigDecimal::from(2),
            available: true,
        });
        assert!(book.set_available(id, false));
        assert_eq!(book.quote(id), Err(PricingError::ProductUnavailable(id)));
        let missing = Uuid::new_v4();
        assert_eq!(book.quote(missing), Err(PricingError::UnknownProduct(missing)));
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PricingMode::Wholesale).unwrap(), "\"wholesale\"");
        assert_eq!(PricingMode::from_wholesale(false), PricingMode::Retail);
    }
}
