//! Derived index sets of a planning case.
//!
//! Turns the raw relations of a [`CaseData`] into the partitions and coverage
//! lookups the model builder iterates over. Existence is computed here and only
//! here: a cell exists iff its initial capacity is strictly positive, and a
//! node exists iff one of its cells does.
//!
//! Every set is ordered so that the same input always yields the same model.

use super::error::DerivationError;
use crate::domain::{CapacityRecord, CaseData, CellKey, CoverageKey, LotNodeKey, NodeKey};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info};

/// Index sets and lookups derived from one case; immutable once built
#[derive(Debug, Clone, Default)]
pub struct DerivedData {
    pub case_id: String,
    pub existing_sites: BTreeSet<String>,
    pub potential_sites: BTreeSet<String>,
    /// Node technologies appearing in the capacity or demand tables
    pub nodes: BTreeSet<String>,
    pub existing_nodes: BTreeSet<NodeKey>,
    /// Every (site, node) of sites × nodes that carries no capacity yet
    pub potential_nodes: BTreeSet<NodeKey>,
    pub existing_cells: BTreeSet<CellKey>,
    pub potential_cells: BTreeSet<CellKey>,
    /// Initial capacity of every known cell; zero for potential cells
    pub initial_capacity: HashMap<CellKey, f64>,
    pub max_capacity: HashMap<CellKey, f64>,
    pub demand: BTreeMap<LotNodeKey, f64>,
    pub coverage: BTreeSet<CoverageKey>,
    /// (lot, node) → (site, cell) pairs with a coverage edge
    pub cells_covering_lot_at_node: BTreeMap<LotNodeKey, Vec<(String, String)>>,
    /// (site, node, cell) → lots the cell may carry traffic for
    pub lots_covered_by_cell: BTreeMap<CellKey, Vec<String>>,
    /// (site, node) → every known cell under it
    pub cells_at_node: BTreeMap<NodeKey, Vec<CellKey>>,
}

impl DerivedData {
    pub fn is_existing_site(&self, site: &str) -> bool {
        self.existing_sites.contains(site)
    }

    pub fn is_potential_site(&self, site: &str) -> bool {
        self.potential_sites.contains(site)
    }

    pub fn is_existing_node(&self, key: &NodeKey) -> bool {
        self.existing_nodes.contains(key)
    }

    pub fn is_existing_cell(&self, key: &CellKey) -> bool {
        self.existing_cells.contains(key)
    }

    /// All cells, existing and potential, in key order
    pub fn cells(&self) -> impl Iterator<Item = &CellKey> {
        let mut all: Vec<&CellKey> = self
            .existing_cells
            .iter()
            .chain(self.potential_cells.iter())
            .collect();
        all.sort();
        all.into_iter()
    }

    pub fn num_cells(&self) -> usize {
        self.existing_cells.len() + self.potential_cells.len()
    }

    pub fn initial_capacity_of(&self, key: &CellKey) -> f64 {
        self.initial_capacity.get(key).copied().unwrap_or(0.0)
    }

    pub fn max_capacity_of(&self, key: &CellKey) -> Option<f64> {
        self.max_capacity.get(key).copied()
    }

    pub fn demand_of(&self, key: &LotNodeKey) -> f64 {
        self.demand.get(key).copied().unwrap_or(0.0)
    }

    /// Total demand of one node technology across all lots
    pub fn total_demand_for_node(&self, node: &str) -> f64 {
        self.demand
            .iter()
            .filter(|(key, _)| key.node == node)
            .map(|(_, demand)| demand)
            .sum()
    }

    pub fn covering_cells(&self, key: &LotNodeKey) -> &[(String, String)] {
        self.cells_covering_lot_at_node
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn covered_lots(&self, key: &CellKey) -> &[String] {
        self.lots_covered_by_cell
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn capacity_table(
    table: &'static str,
    records: &[CapacityRecord],
) -> Result<HashMap<CellKey, f64>, DerivationError> {
    let mut map = HashMap::with_capacity(records.len());
    for record in records {
        let key = record.key();
        if !record.capacity.is_finite() || record.capacity < 0.0 {
            return Err(DerivationError::NegativeCapacity {
                table,
                key,
                value: record.capacity,
            });
        }
        if map.insert(key.clone(), record.capacity).is_some() {
            return Err(DerivationError::DuplicateCapacity { table, key });
        }
    }
    Ok(map)
}

/// Derive every index set of a case, failing on the first inconsistency
pub fn derive(case: &CaseData) -> Result<DerivedData, DerivationError> {
    let existing_sites: BTreeSet<String> = case.existing_sites.iter().cloned().collect();
    let potential_sites: BTreeSet<String> = case.potential_sites.iter().cloned().collect();
    if let Some(site) = existing_sites.intersection(&potential_sites).next() {
        return Err(DerivationError::SiteInBothPartitions(site.clone()));
    }

    let initial = capacity_table("initial", &case.initial_capacity)?;
    let max_capacity = capacity_table("maximum", &case.max_capacity)?;

    let universe: BTreeSet<&CellKey> = initial.keys().chain(max_capacity.keys()).collect();
    let mut existing_cells = BTreeSet::new();
    let mut potential_cells = BTreeSet::new();
    let mut initial_capacity = HashMap::with_capacity(universe.len());
    let mut cells_at_node: BTreeMap<NodeKey, Vec<CellKey>> = BTreeMap::new();
    let mut nodes = BTreeSet::new();

    for key in universe {
        if !existing_sites.contains(&key.site) && !potential_sites.contains(&key.site) {
            return Err(DerivationError::UnknownCapacitySite(key.clone()));
        }
        let max = *max_capacity
            .get(key)
            .ok_or_else(|| DerivationError::MissingMaxCapacity(key.clone()))?;
        let init = initial.get(key).copied().unwrap_or(0.0);

        if init > 0.0 {
            if potential_sites.contains(&key.site) {
                return Err(DerivationError::ExistingCellAtPotentialSite(key.clone()));
            }
            if max < init {
                return Err(DerivationError::MaxBelowInitial {
                    key: key.clone(),
                    initial: init,
                    max,
                });
            }
            existing_cells.insert(key.clone());
        } else {
            potential_cells.insert(key.clone());
        }

        initial_capacity.insert(key.clone(), init);
        nodes.insert(key.node.clone());
        cells_at_node
            .entry(key.node_key())
            .or_default()
            .push(key.clone());
    }

    let mut demand = BTreeMap::new();
    for record in &case.demand {
        let key = record.key();
        if !record.demand.is_finite() || record.demand < 0.0 {
            return Err(DerivationError::NegativeDemand {
                key,
                value: record.demand,
            });
        }
        nodes.insert(record.node.clone());
        if demand.insert(key.clone(), record.demand).is_some() {
            return Err(DerivationError::DuplicateDemand(key));
        }
    }

    let existing_nodes: BTreeSet<NodeKey> = existing_cells.iter().map(CellKey::node_key).collect();
    let mut potential_nodes = BTreeSet::new();
    for site in existing_sites.iter().chain(potential_sites.iter()) {
        for node in &nodes {
            let key = NodeKey::new(site.clone(), node.clone());
            if !existing_nodes.contains(&key) {
                potential_nodes.insert(key);
            }
        }
    }

    let mut coverage = BTreeSet::new();
    for edge in &case.coverage {
        if !initial_capacity.contains_key(&edge.cell_key()) {
            return Err(DerivationError::UnknownCoverageCell(edge.clone()));
        }
        coverage.insert(edge.clone());
    }

    // Coverage is iterated in key order, so both indexes come out sorted
    let mut cells_covering_lot_at_node: BTreeMap<LotNodeKey, Vec<(String, String)>> =
        BTreeMap::new();
    let mut lots_covered_by_cell: BTreeMap<CellKey, Vec<String>> = BTreeMap::new();
    for edge in &coverage {
        cells_covering_lot_at_node
            .entry(edge.lot_node())
            .or_default()
            .push((edge.site.clone(), edge.cell.clone()));
        lots_covered_by_cell
            .entry(edge.cell_key())
            .or_default()
            .push(edge.lot.clone());
    }

    for (key, &value) in &demand {
        if !cells_covering_lot_at_node.contains_key(key) {
            return Err(DerivationError::UncoveredDemand {
                key: key.clone(),
                demand: value,
            });
        }
    }
    // Covered lots with no demand row must still balance, at zero
    for key in cells_covering_lot_at_node.keys() {
        if !demand.contains_key(key) {
            debug!(lot = %key.lot, node = %key.node, "covered lot has no demand record, using 0");
            demand.insert(key.clone(), 0.0);
        }
    }

    info!(
        case = %case.case_id,
        sites = existing_sites.len() + potential_sites.len(),
        existing_cells = existing_cells.len(),
        potential_cells = potential_cells.len(),
        potential_nodes = potential_nodes.len(),
        lot_nodes = demand.len(),
        coverage = coverage.len(),
        "derived index sets"
    );

    Ok(DerivedData {
        case_id: case.case_id.clone(),
        existing_sites,
        potential_sites,
        nodes,
        existing_nodes,
        potential_nodes,
        existing_cells,
        potential_cells,
        initial_capacity,
        max_capacity,
        demand,
        coverage,
        cells_covering_lot_at_node,
        lots_covered_by_cell,
        cells_at_node,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixed_case() -> CaseData {
        CaseData::new("mixed")
            .existing_site("s1")
            .potential_site("p1")
            .cell("s1", "4G", "c1", 10.0, 20.0)
            .cell("s1", "4G", "c2", 0.0, 15.0)
            .cell("s1", "5G", "c1", 0.0, 40.0)
            .cell("p1", "4G", "c1", 0.0, 30.0)
            .demand("lot1", "4G", 12.0)
            .demand("lot2", "5G", 5.0)
            .covers("s1", "4G", "c1", "lot1")
            .covers("s1", "4G", "c2", "lot1")
            .covers("p1", "4G", "c1", "lot1")
            .covers("s1", "5G", "c1", "lot2")
            .covers("p1", "4G", "c1", "lot1")
    }

    #[test]
    fn sites_are_partitioned() {
        let data = derive(&mixed_case()).unwrap();
        for site in ["s1", "p1"] {
            assert!(data.is_existing_site(site) ^ data.is_potential_site(site));
        }
    }

    #[test]
    fn existence_follows_positive_capacity() {
        let data = derive(&mixed_case()).unwrap();
        for cell in data.cells() {
            assert_eq!(
                data.is_existing_cell(cell),
                data.initial_capacity_of(cell) > 0.0,
                "{cell}"
            );
        }
        assert_eq!(data.existing_cells.len(), 1);
        assert_eq!(data.potential_cells.len(), 3);

        assert!(data.is_existing_node(&NodeKey::new("s1", "4G")));
        assert!(data.potential_nodes.contains(&NodeKey::new("s1", "5G")));
        assert!(data.potential_nodes.contains(&NodeKey::new("p1", "4G")));
        assert!(data.potential_nodes.contains(&NodeKey::new("p1", "5G")));
        assert_eq!(data.potential_nodes.len(), 3);
    }

    #[test]
    fn coverage_indexes_are_inverse() {
        let data = derive(&mixed_case()).unwrap();
        assert_eq!(data.coverage.len(), 4, "duplicate edge collapses");

        for edge in &data.coverage {
            let pair = (edge.site.clone(), edge.cell.clone());
            assert!(data.covering_cells(&edge.lot_node()).contains(&pair));
            assert!(data.covered_lots(&edge.cell_key()).contains(&edge.lot));
        }
        for (lot_node, cells) in &data.cells_covering_lot_at_node {
            for (site, cell) in cells {
                let key = CoverageKey::new(site, &lot_node.node, cell, &lot_node.lot);
                assert!(data.coverage.contains(&key));
            }
        }
        for (cell, lots) in &data.lots_covered_by_cell {
            for lot in lots {
                let key = CoverageKey::new(&cell.site, &cell.node, &cell.cell, lot);
                assert!(data.coverage.contains(&key));
            }
        }
    }

    #[test]
    fn rejects_site_in_both_inventories() {
        let case = mixed_case().potential_site("s1");
        assert_eq!(
            derive(&case).unwrap_err(),
            DerivationError::SiteInBothPartitions("s1".into())
        );
    }

    #[test]
    fn rejects_negative_capacity_and_demand() {
        let case = mixed_case().cell("s1", "4G", "c9", -1.0, 5.0);
        assert!(matches!(
            derive(&case),
            Err(DerivationError::NegativeCapacity { table: "initial", .. })
        ));

        let case = mixed_case().demand("lot3", "4G", -1.0);
        assert!(matches!(
            derive(&case),
            Err(DerivationError::NegativeDemand { value, .. }) if value == -1.0
        ));

        let case = mixed_case().demand("lot3", "4G", f64::NAN);
        assert!(matches!(
            derive(&case),
            Err(DerivationError::NegativeDemand { .. })
        ));
    }

    #[test]
    fn rejects_coverage_into_unknown_cell() {
        let case = mixed_case().covers("s1", "4G", "c7", "lot1");
        assert_eq!(
            derive(&case).unwrap_err(),
            DerivationError::UnknownCoverageCell(CoverageKey::new("s1", "4G", "c7", "lot1"))
        );
    }

    #[test]
    fn rejects_uncovered_positive_demand() {
        let case = mixed_case().demand("lot9", "4G", 3.0);
        assert!(matches!(
            derive(&case),
            Err(DerivationError::UncoveredDemand { demand, .. }) if demand == 3.0
        ));
    }

    #[test]
    fn rejects_uncovered_zero_demand() {
        let case = mixed_case().demand("lot9", "4G", 0.0);
        assert_eq!(
            derive(&case).unwrap_err(),
            DerivationError::UncoveredDemand {
                key: LotNodeKey::new("lot9", "4G"),
                demand: 0.0,
            }
        );
    }

    #[test]
    fn rejects_inconsistent_capacity_tables() {
        let mut case = mixed_case();
        case.initial_capacity
            .push(CapacityRecord::new("s1", "4G", "c5", 3.0));
        assert_eq!(
            derive(&case).unwrap_err(),
            DerivationError::MissingMaxCapacity(CellKey::new("s1", "4G", "c5"))
        );

        let case = mixed_case().cell("p1", "5G", "c1", 4.0, 8.0);
        assert_eq!(
            derive(&case).unwrap_err(),
            DerivationError::ExistingCellAtPotentialSite(CellKey::new("p1", "5G", "c1"))
        );

        let case = mixed_case().cell("s1", "3G", "c1", 9.0, 4.0);
        assert!(matches!(
            derive(&case),
            Err(DerivationError::MaxBelowInitial { .. })
        ));

        let case = mixed_case().cell("nowhere", "4G", "c1", 0.0, 4.0);
        assert!(matches!(
            derive(&case),
            Err(DerivationError::UnknownCapacitySite(_))
        ));

        let case = mixed_case().cell("s1", "4G", "c1", 10.0, 20.0);
        assert!(matches!(
            derive(&case),
            Err(DerivationError::DuplicateCapacity { .. })
        ));
    }

    #[test]
    fn covered_lot_without_demand_balances_at_zero() {
        let case = mixed_case().covers("s1", "4G", "c1", "lot5");
        let data = derive(&case).unwrap();
        assert_eq!(data.demand.get(&LotNodeKey::new("lot5", "4G")), Some(&0.0));
    }
}
