pub mod builder;
pub mod decorators;
pub mod flatten;
pub mod info;
pub mod info_mapper;
pub mod label_selector;
pub mod path_expansion;
pub mod pipeline;
pub mod result;
pub mod selector_source;
pub mod sources;
pub mod visitor;
