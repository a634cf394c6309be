// Mappers: Convert between gRPC protobuf types and domain models
// Protobuf types stay confined to this module and the service

use super::planner::{CaseOutcome, PlannerConfig};
use crate::domain::{
    CapacityRecord, CaseData, CostParameters, CoverageKey, DemandRecord, SolutionStatus,
    SolverBackend, SolverConfig, SolverError,
};
use crate::planning::{FormulationStats, NetworkPlan, PlanningError, ValidationReport};
use std::time::Duration;
use tonic::Status;

pub mod netplan {
    tonic::include_proto!("netplan");
}

use netplan as proto;

fn capacity_record(record: proto::CapacityRecord) -> CapacityRecord {
    CapacityRecord::new(record.site, record.node, record.cell, record.capacity)
}

fn coverage_key(edge: proto::CoverageEdge) -> CoverageKey {
    CoverageKey::new(edge.site, edge.node, edge.cell, edge.lot)
}

/// Convert protobuf CaseData to domain CaseData
pub fn proto_to_case(proto_case: proto::CaseData) -> CaseData {
    CaseData {
        case_id: proto_case.case_id,
        initial_capacity: proto_case
            .initial_capacity
            .into_iter()
            .map(capacity_record)
            .collect(),
        max_capacity: proto_case
            .max_capacity
            .into_iter()
            .map(capacity_record)
            .collect(),
        existing_sites: proto_case.existing_sites,
        potential_sites: proto_case.potential_sites,
        demand: proto_case
            .demand
            .into_iter()
            .map(|d| DemandRecord::new(d.lot, d.node, d.demand))
            .collect(),
        coverage: proto_case.coverage.into_iter().map(coverage_key).collect(),
    }
}

fn proto_to_solver_config(cfg: proto::SolverConfig) -> SolverConfig {
    let backend = match proto::solver_config::SolverBackend::try_from(cfg.solver) {
        Ok(proto::solver_config::SolverBackend::Auto) => SolverBackend::Auto,
        Ok(proto::solver_config::SolverBackend::MicroLp) => SolverBackend::MicroLp,
        Ok(proto::solver_config::SolverBackend::CoinCbc) => SolverBackend::CoinCbc,
        Ok(proto::solver_config::SolverBackend::Highs) => SolverBackend::Highs,
        Err(_) => SolverBackend::Auto,
    };

    SolverConfig {
        backend,
        time_limit: (cfg.time_limit > 0.0).then_some(cfg.time_limit),
        gap_tolerance: (cfg.gap_tolerance > 0.0).then_some(cfg.gap_tolerance),
        verbose: cfg.verbose,
    }
}

/// Overlay request options on the server defaults
pub fn proto_to_config(
    options: Option<proto::PlannerOptions>,
    defaults: &PlannerConfig,
) -> std::result::Result<PlannerConfig, Box<Status>> {
    let mut config = defaults.clone();
    if let Some(options) = options {
        if let Some(costs) = options.costs {
            config.costs = CostParameters {
                capex_new_site: costs.capex_new_site,
                capex_new_node: costs.capex_new_node,
                capex_new_cell: costs.capex_new_cell,
                capex_upgrade_cell: costs.capex_upgrade_cell,
                opex_site: costs.opex_site,
                opex_node: costs.opex_node,
            };
        }
        if let Some(solver) = options.solver {
            config.solver = proto_to_solver_config(solver);
        }
        if options.scale_factor != 0.0 {
            config.scale_factor = options.scale_factor;
        }
        if options.validation_tolerance != 0.0 {
            config.validation_tolerance = options.validation_tolerance;
        }
    }

    config
        .validate()
        .map_err(|e| Box::new(Status::invalid_argument(e.to_string())))?;
    Ok(config)
}

fn status_to_proto(status: SolutionStatus) -> i32 {
    let status = match status {
        SolutionStatus::Optimal => proto::SolutionStatus::Optimal,
        SolutionStatus::FeasibleTimeLimit => proto::SolutionStatus::FeasibleTimeLimit,
        SolutionStatus::Infeasible => proto::SolutionStatus::Infeasible,
        SolutionStatus::Unbounded => proto::SolutionStatus::Unbounded,
        SolutionStatus::Error => proto::SolutionStatus::Error,
    };
    status as i32
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn plan_to_proto(plan: NetworkPlan) -> proto::NetworkPlan {
    proto::NetworkPlan {
        new_sites: plan.new_sites.into_iter().collect(),
        new_nodes: plan
            .new_nodes
            .into_iter()
            .map(|key| proto::NodeRef {
                site: key.site,
                node: key.node,
            })
            .collect(),
        new_cells: plan
            .new_cells
            .into_iter()
            .map(|key| proto::CellRef {
                site: key.site,
                node: key.node,
                cell: key.cell,
            })
            .collect(),
        upgraded_cells: plan
            .upgraded_cells
            .into_iter()
            .map(|key| proto::CellRef {
                site: key.site,
                node: key.node,
                cell: key.cell,
            })
            .collect(),
        final_capacity: plan
            .final_capacity
            .into_iter()
            .map(|(key, capacity)| proto::CellCapacity {
                site: key.site,
                node: key.node,
                cell: key.cell,
                capacity,
            })
            .collect(),
        traffic: plan
            .traffic
            .into_iter()
            .map(|(key, traffic)| proto::EdgeTraffic {
                edge: Some(proto::CoverageEdge {
                    site: key.site,
                    node: key.node,
                    cell: key.cell,
                    lot: key.lot,
                }),
                traffic,
            })
            .collect(),
    }
}

fn validation_to_proto(report: ValidationReport) -> proto::ValidationReport {
    proto::ValidationReport {
        passed: report.passed(),
        failures: report.failures.iter().map(ToString::to_string).collect(),
        cells_checked: report.cells_checked as u32,
        lot_nodes_checked: report.lot_nodes_checked as u32,
    }
}

/// Convert a domain CaseOutcome to protobuf PlanResult
pub fn outcome_to_proto(outcome: CaseOutcome) -> proto::PlanResult {
    let performance = outcome.performance;
    proto::PlanResult {
        case_id: outcome.case_id,
        status: status_to_proto(outcome.status),
        solver_backend: outcome.solver,
        message: outcome.message,
        plan: outcome.plan.map(plan_to_proto),
        validation: outcome.validation.map(validation_to_proto),
        performance: Some(proto::PerformanceRecord {
            case_id: performance.case_id,
            objective_value: performance.objective_value,
            gap: performance.gap,
            build_time_ms: millis(performance.build_time),
            solve_time_ms: millis(performance.solve_time),
        }),
    }
}

/// Result streamed for a case that aborted before producing an outcome
pub fn error_to_proto(case_id: String, error: &PlanningError) -> proto::PlanResult {
    proto::PlanResult {
        case_id: case_id.clone(),
        status: proto::SolutionStatus::Error as i32,
        solver_backend: String::new(),
        message: error.to_string(),
        plan: None,
        validation: None,
        performance: Some(proto::PerformanceRecord {
            case_id,
            ..Default::default()
        }),
    }
}

pub fn stats_to_proto(case_id: String, stats: FormulationStats) -> proto::FormulationSummary {
    proto::FormulationSummary {
        case_id,
        num_variables: stats.num_variables() as u32,
        num_binary_vars: stats.num_binary_vars() as u32,
        num_constraints: stats.num_constraints() as u32,
        families: stats
            .constraints
            .iter()
            .map(|(family, &count)| proto::FamilyCount {
                family: family.name().to_string(),
                constraints: count as u32,
            })
            .collect(),
        build_time_ms: millis(stats.build_time),
    }
}

/// Map an aborted case onto a gRPC status
pub fn planning_error_to_status(error: PlanningError) -> Status {
    match error {
        PlanningError::Config(_)
        | PlanningError::Derivation(_)
        | PlanningError::Formulation(_)
        | PlanningError::Solver(SolverError::InvalidProblem(_))
        | PlanningError::Solver(SolverError::SolverNotAvailable(_)) => {
            Status::invalid_argument(error.to_string())
        }
        PlanningError::Solver(SolverError::ExecutionFailed(_)) | PlanningError::Worker(_) => {
            Status::internal(format!("Solver error: {}", error))
        }
        PlanningError::Extraction(_) => Status::internal(error.to_string()),
    }
}
