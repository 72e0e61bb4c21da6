pub mod derive;
pub mod store;
