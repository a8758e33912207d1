pub mod aggregate;
pub mod mapper;
pub mod payload;
pub mod ranking;
pub mod rollup;
pub mod stages;
pub mod subcategory;
pub mod table;
pub mod taxonomy;
pub mod tokenizer;
