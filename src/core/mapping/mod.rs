pub mod catalog;
pub mod category;
pub mod discovery;
pub mod rest_mapper;
pub mod rest_mapping;
pub mod schema;
