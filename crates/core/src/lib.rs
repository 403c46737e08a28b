pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;
pub mod estimate;

pub use cpq::cache::{CacheStats, PricingCache};
pub use cpq::catalog::{PriceCatalog, PriceLookup};
pub use cpq::merge::{ConversationalMergeEngine, MergeOutcome};
pub use cpq::repository::{
    FilePriceTableSource, InMemoryPriceTableSource, PriceTableRepository, PriceTableSource,
    RefreshPolicy, RefreshReport,
};
pub use cpq::{EngineCacheStats, EngineSettings, QuoteEngine};
pub use domain::cost::{Component, CostLineItem, QuoteResult};
pub use domain::delta::{ListEdit, ListOp, PartialSpecificationDelta};
pub use domain::logo::{LogoDescriptor, LogoSpec, ResolvedLogo};
pub use domain::price_table::{Breakpoint, ItemType, PriceTable, TableId};
pub use domain::specification::{FabricSelection, QuoteSpecification};
pub use errors::{ApplicationError, InterfaceError, PricingError};
pub use estimate::{
    BatchEstimateRequest, BatchEstimateResponse, BatchSettings, DescriptionReader, EstimateMode,
    EstimateRequest, EstimateResponse, EstimateService,
};
