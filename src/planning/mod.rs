//! Network capacity-expansion planning core
//!
//! ```text
//! CaseData ──derive──▶ DerivedData ──ModelBuilder──▶ PlanningModel ──SolverService──▶ Solution
//!                           │                              │                              │
//!                           │                              └────────extract_plan──────────┤
//!                           └──────────────────validate_plan◀──────── NetworkPlan ◀───────┘
//! ```

pub mod builder;
pub mod derive;
pub mod error;
pub mod extract;
pub mod validate;

pub use builder::{ConstraintFamily, FormulationStats, ModelBuilder, PlanningModel, VariableIndex};
pub use derive::{derive, DerivedData};
pub use error::{DerivationError, ExtractionError, FormulationError, PlanningError};
pub use extract::{extract_plan, NetworkPlan, PerformanceRecord};
pub use validate::{validate_plan, ValidationFailure, ValidationReport, DEFAULT_TOLERANCE};
