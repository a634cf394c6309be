// Domain module: MILP model, solver contract and network planning inputs

pub mod costs;
pub mod models;
pub mod solver_service;
pub mod topology;
pub mod value_objects;

pub use costs::*;
pub use models::*;
pub use solver_service::*;
pub use topology::*;
pub use value_objects::*;
