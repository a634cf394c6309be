//! Raw topology, coverage and demand relations, and the composite keys the
//! model is indexed by.
//!
//! These are the tables the external topology store hands over. Existence of
//! a node or cell is never stored here: it is derived from positive initial
//! capacity by [`crate::planning::derive`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (site, node) pair: one radio technology deployed at a site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub site: String,
    pub node: String,
}

impl NodeKey {
    pub fn new(site: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            node: node.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.site, self.node)
    }
}

/// A (site, node, cell) triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub site: String,
    pub node: String,
    pub cell: String,
}

impl CellKey {
    pub fn new(site: impl Into<String>, node: impl Into<String>, cell: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            node: node.into(),
            cell: cell.into(),
        }
    }

    pub fn node_key(&self) -> NodeKey {
        NodeKey::new(self.site.clone(), self.node.clone())
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.site, self.node, self.cell)
    }
}

/// A (lot, node) pair: the unit demand is expressed in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LotNodeKey {
    pub lot: String,
    pub node: String,
}

impl LotNodeKey {
    pub fn new(lot: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            lot: lot.into(),
            node: node.into(),
        }
    }
}

impl fmt::Display for LotNodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lot, self.node)
    }
}

/// A coverage edge (site, node, cell, lot)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoverageKey {
    pub site: String,
    pub node: String,
    pub cell: String,
    pub lot: String,
}

impl CoverageKey {
    pub fn new(
        site: impl Into<String>,
        node: impl Into<String>,
        cell: impl Into<String>,
        lot: impl Into<String>,
    ) -> Self {
        Self {
            site: site.into(),
            node: node.into(),
            cell: cell.into(),
            lot: lot.into(),
        }
    }

    pub fn cell_key(&self) -> CellKey {
        CellKey::new(self.site.clone(), self.node.clone(), self.cell.clone())
    }

    pub fn lot_node(&self) -> LotNodeKey {
        LotNodeKey::new(self.lot.clone(), self.node.clone())
    }
}

impl fmt::Display for CoverageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.site, self.node, self.cell, self.lot)
    }
}

/// Row of a capacity table: `site_id, node, cell, capacity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub site: String,
    pub node: String,
    pub cell: String,
    pub capacity: f64,
}

impl CapacityRecord {
    pub fn new(
        site: impl Into<String>,
        node: impl Into<String>,
        cell: impl Into<String>,
        capacity: f64,
    ) -> Self {
        Self {
            site: site.into(),
            node: node.into(),
            cell: cell.into(),
            capacity,
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.site.clone(), self.node.clone(), self.cell.clone())
    }
}

/// Row of the demand table: `lot_id, node, demand`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandRecord {
    pub lot: String,
    pub node: String,
    pub demand: f64,
}

impl DemandRecord {
    pub fn new(lot: impl Into<String>, node: impl Into<String>, demand: f64) -> Self {
        Self {
            lot: lot.into(),
            node: node.into(),
            demand,
        }
    }

    pub fn key(&self) -> LotNodeKey {
        LotNodeKey::new(self.lot.clone(), self.node.clone())
    }
}

/// All raw relations of one problem instance ("case")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseData {
    pub case_id: String,
    /// Current capacity per cell; zero or absent means the cell is not deployed
    pub initial_capacity: Vec<CapacityRecord>,
    /// Capacity after upgrade (existing cells) or build (potential cells)
    pub max_capacity: Vec<CapacityRecord>,
    pub existing_sites: Vec<String>,
    pub potential_sites: Vec<String>,
    pub demand: Vec<DemandRecord>,
    pub coverage: Vec<CoverageKey>,
}

impl CaseData {
    pub fn new(case_id: impl Into<String>) -> Self {
        Self {
            case_id: case_id.into(),
            ..Self::default()
        }
    }

    pub fn existing_site(mut self, site: impl Into<String>) -> Self {
        self.existing_sites.push(site.into());
        self
    }

    pub fn potential_site(mut self, site: impl Into<String>) -> Self {
        self.potential_sites.push(site.into());
        self
    }

    /// Declare a cell with its initial and maximum capacity
    pub fn cell(
        mut self,
        site: &str,
        node: &str,
        cell: &str,
        initial_capacity: f64,
        max_capacity: f64,
    ) -> Self {
        self.initial_capacity
            .push(CapacityRecord::new(site, node, cell, initial_capacity));
        self.max_capacity
            .push(CapacityRecord::new(site, node, cell, max_capacity));
        self
    }

    pub fn demand(mut self, lot: &str, node: &str, demand: f64) -> Self {
        self.demand.push(DemandRecord::new(lot, node, demand));
        self
    }

    pub fn covers(mut self, site: &str, node: &str, cell: &str, lot: &str) -> Self {
        self.coverage.push(CoverageKey::new(site, node, cell, lot));
        self
    }
}
