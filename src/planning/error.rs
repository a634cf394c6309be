use crate::domain::{CellKey, CoverageKey, LotNodeKey, SolverError};

/// Input inconsistencies found while deriving index sets
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DerivationError {
    #[error("site '{0}' is listed as both existing and potential")]
    SiteInBothPartitions(String),

    #[error("duplicate {table} capacity record for cell ({key})")]
    DuplicateCapacity { table: &'static str, key: CellKey },

    #[error("duplicate demand record for ({0})")]
    DuplicateDemand(LotNodeKey),

    #[error("{table} capacity of cell ({key}) must be a non-negative number, got {value}")]
    NegativeCapacity {
        table: &'static str,
        key: CellKey,
        value: f64,
    },

    #[error("demand of ({key}) must be a non-negative number, got {value}")]
    NegativeDemand { key: LotNodeKey, value: f64 },

    #[error("cell ({0}) belongs to a site missing from both site inventories")]
    UnknownCapacitySite(CellKey),

    #[error("cell ({0}) has an initial capacity but no maximum capacity record")]
    MissingMaxCapacity(CellKey),

    #[error("cell ({key}) has maximum capacity {max} below its initial capacity {initial}")]
    MaxBelowInitial { key: CellKey, initial: f64, max: f64 },

    #[error("cell ({0}) carries capacity but its site is only a potential site")]
    ExistingCellAtPotentialSite(CellKey),

    #[error("coverage edge ({0}) references a cell absent from the capacity tables")]
    UnknownCoverageCell(CoverageKey),

    #[error("demand of {demand} for ({key}) has no covering cell")]
    UncoveredDemand { key: LotNodeKey, demand: f64 },
}

/// The builder could not assemble a consistent model
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulationError {
    #[error("{family}: no variable for {key}")]
    MissingVariable { family: &'static str, key: String },

    #[error("{family}: no parameter for {key}")]
    MissingParameter { family: &'static str, key: String },

    #[error("scale factor must be finite and positive, got {0}")]
    InvalidScaleFactor(f64),
}

/// The solver assignment does not fit the model it was produced for
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("solver returned {actual} values for {expected} variables")]
    AssignmentLength { expected: usize, actual: usize },
}

/// Any failure that aborts planning of one case
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Input inconsistency: {0}")]
    Derivation(#[from] DerivationError),

    #[error("Formulation error: {0}")]
    Formulation(#[from] FormulationError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Case worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, PlanningError>;
