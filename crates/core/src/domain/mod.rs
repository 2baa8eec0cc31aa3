pub mod cart;
pub mod catalog;
pub mod estimate;
pub mod lead;
pub mod quote;
pub mod session;
