use crate::error::{GaugeError, GaugeResult};
use crate::model::{Entity, EntityFilter, Kpi};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Read-only view of the KPIs and entities the dashboard knows about.
pub trait Catalog: Send + Sync {
    fn list_entities(&self) -> Vec<Entity>;

    fn find_kpi(&self, id: &str) -> Option<Kpi>;

    fn has_entity(&self, id: &str) -> bool {
        self.list_entities().iter().any(|e| e.id == id)
    }
}

pub fn resolve_kpi(catalog: &dyn Catalog, id: &str) -> GaugeResult<Kpi> {
    catalog.find_kpi(id).ok_or_else(|| GaugeError::kpi_not_found(id))
}

/// Applies the filter precedence: explicit ids, then entity type, then all
/// known entities. Explicit ids keep their order with duplicates dropped.
pub fn resolve_entities(catalog: &dyn Catalog, filter: Option<&EntityFilter>) -> GaugeResult<Vec<String>> {
    match filter {
        Some(filter) if !filter.entity_ids.is_empty() => {
            let mut seen = HashSet::with_capacity(filter.entity_ids.len());
            let mut ids = Vec::with_capacity(filter.entity_ids.len());
            for id in &filter.entity_ids {
                if !catalog.has_entity(id) {
                    return Err(GaugeError::entity_not_found(id.clone()));
                }
                if seen.insert(id.as_str()) {
                    ids.push(id.clone());
                }
            }
            Ok(ids)
        }
        Some(filter) if filter.restricts_type() => Ok(catalog
            .list_entities()
            .into_iter()
            .filter(|e| e.entity_type == filter.entity_type)
            .map(|e| e.id)
            .collect()),
        _ => Ok(catalog.list_entities().into_iter().map(|e| e.id).collect()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    kpis: Vec<KpiEntry>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KpiEntry {
    id: String,
    #[serde(default)]
    supports_direct_aggregation: Option<bool>,
}

impl From<KpiEntry> for Kpi {
    fn from(entry: KpiEntry) -> Self {
        match entry.supports_direct_aggregation {
            Some(flag) => Kpi::with_direct_aggregation(entry.id, flag),
            None => Kpi::new(entry.id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    kpis: HashMap<String, Kpi>,
    entities: Vec<Entity>,
    lenient: bool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog that also accepts KPIs and entities it does not list.
    /// Unlisted KPIs get their capability from the naming convention.
    pub fn lenient() -> Self {
        Self {
            lenient: true,
            ..Self::default()
        }
    }

    pub fn with_kpi(mut self, kpi: Kpi) -> Self {
        self.kpis.insert(kpi.id.clone(), kpi);
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn from_json(json: &str) -> GaugeResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for entry in file.kpis {
            catalog = catalog.with_kpi(entry.into());
        }
        catalog.entities = file.entities;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> GaugeResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&contents)?;
        info!(
            "Loaded catalog from {} ({} kpis, {} entities)",
            path.display(),
            catalog.kpis.len(),
            catalog.entities.len()
        );
        Ok(catalog)
    }

    pub fn kpi_count(&self) -> usize {
        self.kpis.len()
    }
}

impl Catalog for InMemoryCatalog {
    fn list_entities(&self) -> Vec<Entity> {
        self.entities.clone()
    }

    fn find_kpi(&self, id: &str) -> Option<Kpi> {
        match self.kpis.get(id) {
            Some(kpi) => Some(kpi.clone()),
            None if self.lenient => Some(Kpi::new(id)),
            None => None,
        }
    }

    fn has_entity(&self, id: &str) -> bool {
        self.lenient || self.entities.iter().any(|e| e.id == id)
    }
}
