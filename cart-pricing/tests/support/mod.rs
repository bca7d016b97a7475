#![allow(dead_code)]

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use cart_pricing::{
    calculate, CalculationRequest, PriceBook, PricingBackend, PricingError, PricingResult, ProductQuote,
};
use uuid::Uuid;

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

/// One product per `(retail, wholesale)` pair, in order.
pub fn catalog(prices: &[(&str, &str)]) -> (PriceBook, Vec<Uuid>) {
    let mut book = PriceBook::new();
    let mut ids = Vec::new();
    for (i, (retail, wholesale)) in prices.iter().enumerate() {
        let id = Uuid::new_v4();
        book.insert(ProductQuote {
            product_id: id,
            product_name: format!("Product {i}"),
            product_code: Some(format!("P-{i:03}")),
            retail_price: dec(retail),
            wholesale_price: dec(wholesale),
            available: true,
        });
        ids.push(id);
    }
    (book, ids)
}

pub fn shared(book: PriceBook) -> Arc<RwLock<PriceBook>> {
    Arc::new(RwLock::new(book))
}

/// Prices from a shared table, but each call first sleeps for the next scripted delay.
pub struct ScriptedBackend {
    book: Arc<RwLock<PriceBook>>,
    delays: Mutex<VecDeque<Duration>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(book: Arc<RwLock<PriceBook>>, delays: &[u64]) -> Self {
        ScriptedBackend {
            book,
            delays: Mutex::new(delays.iter().copied().map(Duration::from_millis).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PricingBackend for ScriptedBackend {
    async fn calculate(&self, request: CalculationRequest) -> Result<PricingResult, PricingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        tokio::time::sleep(delay).await;
        calculate(&self.book, &request)
    }
}
