pub mod cost;
pub mod delta;
pub mod logo;
pub mod price_table;
pub mod specification;
