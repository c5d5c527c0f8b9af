pub mod path_service;

pub use path_service::PathService;
