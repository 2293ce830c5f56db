//! Credit pack catalogs
//!
//! One immutable catalog per processor. Product ids are processor-scoped;
//! the catalogs never reference each other.

use bluehour_ledger::Processor;
use serde::Serialize;

/// Price in the currency's minor unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Price {
    pub amount: i64,
    pub currency: &'static str,
}

/// A purchasable credit pack
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Stable catalog key (e.g. `STARTER`)
    pub key: &'static str,

    /// Processor product id (Polar) or variant id (Lemon Squeezy)
    pub id: &'static str,

    pub name: &'static str,

    /// Credits granted on purchase
    pub credits: i32,

    pub price: Price,
}

pub const POLAR_PRODUCTS: &[Product] = &[
    Product {
        key: "STARTER",
        id: "47f3c180-bb8d-4f57-bbca-2994a19a33c2",
        name: "Basic Package",
        credits: 10,
        price: Price { amount: 249, currency: "USD" },
    },
    Product {
        key: "AUTHORS_CHOICE",
        id: "2279ffc1-1ad5-40e3-8f62-25ae0f83869e",
        name: "Premium Bundle",
        credits: 35,
        price: Price { amount: 749, currency: "USD" },
    },
];

pub const LEMON_SQUEEZY_PRODUCTS: &[Product] = &[
    Product {
        key: "TASTER",
        id: "1327318",
        name: "맛보기 팩",
        credits: 10,
        price: Price { amount: 3300, currency: "KRW" },
    },
    Product {
        key: "BESTSELLER",
        id: "1327335",
        name: "베스트셀러 팩",
        credits: 35,
        price: Price { amount: 9900, currency: "KRW" },
    },
];

/// The catalog for a processor
pub const fn catalog(processor: Processor) -> &'static [Product] {
    match processor {
        Processor::Polar => POLAR_PRODUCTS,
        Processor::LemonSqueezy => LEMON_SQUEEZY_PRODUCTS,
    }
}

/// Look up a product by processor id
pub fn find(processor: Processor, id: &str) -> Option<&'static Product> {
    catalog(processor).iter().find(|p| p.id == id)
}

/// Look up a product by catalog key
pub fn find_by_key(processor: Processor, key: &str) -> Option<&'static Product> {
    catalog(processor).iter().find(|p| p.key.eq_ignore_ascii_case(key))
}
