use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::cpq::cache::PricingCache;
use crate::cpq::tier::{self, ResolvedPrice};
use crate::domain::price_table::{normalize_name, ItemType, PriceTable, TableId};

/// Read access to unit prices, shared by every calculator.
pub trait PriceLookup {
    fn unit_price(&self, item_type: ItemType, name: &str, quantity: u32) -> Option<ResolvedPrice>;
}

/// Immutable snapshot of every loaded price table.
#[derive(Clone, Debug)]
pub struct PriceCatalog {
    tables: BTreeMap<TableId, PriceTable>,
    schedule: Vec<u32>,
    version: u64,
    source: String,
    loaded_at: DateTime<Utc>,
}

impl PriceCatalog {
    /// Later tables with the same identity replace earlier ones.
    pub fn new(tables: Vec<PriceTable>, version: u64, source: impl Into<String>) -> Self {
        let tables =
            tables.into_iter().map(|table| (table.id(), table)).collect::<BTreeMap<_, _>>();
        let schedule = tables
            .values()
            .flat_map(|table| table.breakpoints().iter().map(|breakpoint| breakpoint.min_qty))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self { tables, schedule, version, source: source.into(), loaded_at: Utc::now() }
    }

    pub fn find(&self, item_type: ItemType, name: &str) -> Option<&PriceTable> {
        self.tables.get(&TableId::new(item_type, name))
    }

    pub fn contains(&self, item_type: ItemType, name: &str) -> bool {
        self.find(item_type, name).is_some()
    }

    /// Display names of every table of one item type, in identity order.
    pub fn names(&self, item_type: ItemType) -> Vec<&str> {
        self.tables
            .values()
            .filter(|table| table.item_type() == item_type)
            .map(PriceTable::name)
            .collect()
    }

    pub fn tables(&self) -> impl Iterator<Item = &PriceTable> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Sorted union of every table's breakpoints.
    pub fn schedule(&self) -> &[u32] {
        &self.schedule
    }

    /// Bracket of the shared schedule for `quantity`. Each table's breakpoints are a subset
    /// of the schedule, so every quantity in one bracket resolves to the same tier of any table.
    pub fn bracket_for(&self, quantity: u32) -> u32 {
        tier::bracket(&self.schedule, quantity)
    }

    /// Content fingerprint of the table data, independent of load time and version.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for table in self.tables.values() {
            hasher.update(table.id().to_string().as_bytes());
            for breakpoint in table.breakpoints() {
                hasher.update(breakpoint.min_qty.to_le_bytes());
                hasher.update(breakpoint.unit_price.to_string().as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

impl PriceLookup for PriceCatalog {
    fn unit_price(&self, item_type: ItemType, name: &str, quantity: u32) -> Option<ResolvedPrice> {
        self.find(item_type, name).map(|table| table.resolve(quantity))
    }
}

/// Canonical cache key for one table-level lookup.
pub fn lookup_key(version: u64, item_type: ItemType, name: &str, bracket: u32) -> String {
    format!("v{version}|{item_type}|{}|{bracket}", normalize_name(name))
}

/// Read-through view of a catalog that memoizes lookups per schedule bracket.
pub struct CachedPriceLookup<'a> {
    catalog: &'a PriceCatalog,
    cache: &'a PricingCache<String, Option<ResolvedPrice>>,
}

impl<'a> CachedPriceLookup<'a> {
    pub fn new(
        catalog: &'a PriceCatalog,
        cache: &'a PricingCache<String, Option<ResolvedPrice>>,
    ) -> Self {
        Self { catalog, cache }
    }
}

impl PriceLookup for CachedPriceLookup<'_> {
    fn unit_price(&self, item_type: ItemType, name: &str, quantity: u32) -> Option<ResolvedPrice> {
        let key = lookup_key(
            self.catalog.version(),
            item_type,
            name,
            self.catalog.bracket_for(quantity),
        );
        self.cache.get_or_insert_with(key, || self.catalog.unit_price(item_type, name, quantity))
    }
}
