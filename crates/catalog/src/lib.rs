use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// The closed set of remote imagery services a layer can be served from.
///
/// Unknown service strings deserialize to [`ServiceId::Forecast`]; a stale or
/// hand-edited catalog degrades to the default service instead of failing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceId {
    /// ECMWF/CAMS forecast imagery, 3-hourly steps.
    #[serde(rename = "ecmwf")]
    Forecast,
    /// NASA GIBS daily satellite archive (at least one day of publication lag).
    #[serde(rename = "nasa_gibs")]
    SatelliteArchive,
    /// EUMETSAT near-real-time imagery, quarter-hour cadence.
    #[serde(rename = "eumetsat")]
    NearRealTime,
}

impl ServiceId {
    /// Never fails: anything unrecognized maps to the default service.
    pub fn parse(s: &str) -> ServiceId {
        match s {
            "ecmwf" => ServiceId::Forecast,
            "nasa_gibs" => ServiceId::SatelliteArchive,
            "eumetsat" => ServiceId::NearRealTime,
            other => {
                warn!(service = other, "unknown service id, using forecast");
                ServiceId::Forecast
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceId::Forecast => "ecmwf",
            ServiceId::SatelliteArchive => "nasa_gibs",
            ServiceId::NearRealTime => "eumetsat",
        }
    }
}

impl<'de> Deserialize<'de> for ServiceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ServiceId::parse(&raw))
    }
}

/// One selectable imagery layer. Immutable once loaded; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: String,
    pub category: String,
    pub name: String,
    pub label: String,
    /// Remote layer name as the service knows it.
    pub layer: String,
    /// Remote style name; empty means service default.
    #[serde(default)]
    pub style: String,
    pub service: ServiceId,
    #[serde(default)]
    pub legend_url: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Parse(String),
    DuplicateLayerId(String),
    DuplicateCategoryId(String),
    UnknownCategory { layer_id: String, category: String },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Parse(msg) => write!(f, "catalog parse error: {msg}"),
            CatalogError::DuplicateLayerId(id) => write!(f, "duplicate layer id: {id}"),
            CatalogError::DuplicateCategoryId(id) => write!(f, "duplicate category id: {id}"),
            CatalogError::UnknownCategory { layer_id, category } => {
                write!(f, "layer {layer_id} references unknown category {category}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CatalogDoc {
    categories: Vec<Category>,
    layers: Vec<LayerDescriptor>,
}

/// The static ordered layer/category catalog, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    categories: Vec<Category>,
    layers: Vec<LayerDescriptor>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDoc =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::validate(doc)
    }

    /// The catalog shipped with the application.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(include_str!("catalog.json"))
    }

    fn validate(doc: CatalogDoc) -> Result<Self, CatalogError> {
        for (i, cat) in doc.categories.iter().enumerate() {
            if doc.categories[..i].iter().any(|c| c.id == cat.id) {
                return Err(CatalogError::DuplicateCategoryId(cat.id.clone()));
            }
        }
        for (i, layer) in doc.layers.iter().enumerate() {
            if doc.layers[..i].iter().any(|l| l.id == layer.id) {
                return Err(CatalogError::DuplicateLayerId(layer.id.clone()));
            }
            if !doc.categories.iter().any(|c| c.id == layer.category) {
                return Err(CatalogError::UnknownCategory {
                    layer_id: layer.id.clone(),
                    category: layer.category.clone(),
                });
            }
        }
        Ok(Self {
            categories: doc.categories,
            layers: doc.layers,
        })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn layer(&self, id: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layers_in_category<'a>(
        &'a self,
        category_id: &str,
    ) -> impl Iterator<Item = &'a LayerDescriptor> {
        self.layers.iter().filter(move |l| l.category == category_id)
    }

    /// Default selection when a category tab is activated.
    pub fn first_in_category(&self, category_id: &str) -> Option<&LayerDescriptor> {
        self.layers_in_category(category_id).next()
    }

    /// Time-slider step for a category: 1 hour where the category carries
    /// near-real-time imagery, 3 hours otherwise.
    pub fn time_step_hours(&self, category_id: &str) -> i64 {
        let has_nrt = self
            .layers_in_category(category_id)
            .any(|l| l.service == ServiceId::NearRealTime);
        if has_nrt { 1 } else { 3 }
    }
}
