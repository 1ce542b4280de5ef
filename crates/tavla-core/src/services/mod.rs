//! Service layer shared across clients

mod store;

pub use store::StoreService;
