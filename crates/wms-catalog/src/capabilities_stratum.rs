//! The stratum holding values derived from a GetCapabilities document.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use catalog_model::mixins::{InfoSection, CAPABILITIES_STRATUM};
use catalog_model::{LoadCell, LoadStatus, Stratum, TraitValue, WeakModel};
use catalog_reactive::Computed;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use wms_common::time::expand_time_dimension;
use wms_common::{CatalogError, CatalogResult};
use wms_protocol::{CapabilitiesLayer, Style, WmsCapabilities};

use crate::loader::CapabilitiesLoader;
use crate::traits::{LayerStyles, Legend, WmsStyle};
use crate::urls::decode_url;

/// Layer abstracts that servers fill in by default and that say nothing
/// about the data.
pub const ABSTRACTS_TO_IGNORE: [&str; 3] = [
    "A compliant implementation of WMS",
    "GeoServer Web Map Service",
    "This is the reference implementation of WMS 1.3.0",
];

fn is_ignored_abstract(text: &str) -> bool {
    ABSTRACTS_TO_IGNORE.iter().any(|ignored| text.contains(ignored))
}

type Derive = fn(&Inputs) -> Option<Value>;

const DERIVED: [(&str, Derive); 8] = [
    ("availableStyles", Inputs::available_styles_value),
    ("legends", Inputs::legends_value),
    ("info", Inputs::info_value),
    ("rectangle", Inputs::rectangle_value),
    ("isGeoServer", Inputs::is_geoserver_value),
    ("discreteTimes", Inputs::discrete_times_value),
    ("name", Inputs::name_value),
    ("minScaleDenominator", Inputs::min_scale_denominator_value),
];

/// What derived values are computed from: the loaded document and the
/// owning model's other strata.
struct Inputs {
    cell: Arc<LoadCell<WmsCapabilities>>,
    model: WeakModel,
    max_discrete_times: usize,
}

/// A loadable stratum backed by a WMS capabilities document.
///
/// Every value it exposes is computed from the current document and from the
/// model's other strata (read with this stratum excluded, so no value can
/// depend on itself). Nothing is exposed while a load is in flight.
pub struct GetCapabilitiesStratum {
    inputs: Arc<Inputs>,
    derived: HashMap<&'static str, Computed<Option<TraitValue>>>,
}

impl GetCapabilitiesStratum {
    pub fn new(model: WeakModel, model_id: &str, max_discrete_times: usize) -> Self {
        let inputs = Arc::new(Inputs {
            cell: Arc::new(LoadCell::new(format!("{model_id}.{CAPABILITIES_STRATUM}"))),
            model,
            max_discrete_times,
        });
        let derived = DERIVED
            .iter()
            .map(|&(name, derive)| {
                let inputs = Arc::clone(&inputs);
                let computed = Computed::new(
                    format!("{model_id}.{CAPABILITIES_STRATUM}.{name}"),
                    move || derive(&inputs).map(Arc::new),
                );
                (name, computed)
            })
            .collect();
        Self { inputs, derived }
    }

    /// Fetch the document at `url` through `loader`.
    ///
    /// The previous document is dropped as soon as the load starts. If a
    /// newer load starts before this one finishes, this one's result is
    /// returned to the caller but not stored.
    #[instrument(skip(self, loader))]
    pub async fn load(
        &self,
        loader: &dyn CapabilitiesLoader,
        url: &str,
        cache_duration: &str,
    ) -> CatalogResult<Arc<WmsCapabilities>> {
        self.inputs
            .cell
            .load(loader.fetch_capabilities(url, cache_duration))
            .await
    }

    pub fn capabilities(&self) -> Option<Arc<WmsCapabilities>> {
        self.inputs.cell.payload()
    }

    pub fn is_loading(&self) -> bool {
        self.inputs.cell.is_loading()
    }

    pub fn status(&self) -> LoadStatus {
        self.inputs.cell.status()
    }

    pub fn error(&self) -> Option<CatalogError> {
        self.inputs.cell.error()
    }

    /// Request number of the document currently held.
    pub fn payload_request(&self) -> Option<u64> {
        self.inputs.cell.payload_request()
    }

    pub fn cell(&self) -> &LoadCell<WmsCapabilities> {
        &self.inputs.cell
    }
}

impl Stratum for GetCapabilitiesStratum {
    fn id(&self) -> &str {
        CAPABILITIES_STRATUM
    }

    fn get(&self, name: &str) -> Option<TraitValue> {
        self.derived.get(name)?.get()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn to_value<T: Serialize>(value: T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(error = %err, "Failed to serialize derived value");
            None
        }
    }
}

fn split_list(value: Option<TraitValue>) -> Vec<String> {
    value
        .as_deref()
        .and_then(Value::as_str)
        .map(|s| s.split(',').map(|part| part.trim().to_string()).collect())
        .unwrap_or_default()
}

impl Inputs {
    fn capabilities(&self) -> Option<Arc<WmsCapabilities>> {
        self.cell.payload()
    }

    fn other(&self, name: &str) -> Option<TraitValue> {
        self.model
            .upgrade()?
            .resolve_excluding(name, CAPABILITIES_STRATUM)
    }

    fn layer_names(&self) -> Vec<String> {
        split_list(self.other("layers"))
            .into_iter()
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn style_names(&self) -> Vec<String> {
        split_list(self.other("styles"))
    }

    fn layer_styles(&self, caps: &WmsCapabilities) -> Vec<LayerStyles> {
        self.layer_names()
            .into_iter()
            .filter(|name| caps.find_layer(name).is_some())
            .map(|name| {
                let styles = caps.styles_for(&name).into_iter().map(convert_style).collect();
                LayerStyles {
                    layer_name: name,
                    styles,
                }
            })
            .collect()
    }

    fn available_styles_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        to_value(self.layer_styles(&caps))
    }

    /// One legend per selected layer: the explicitly selected style's, or
    /// else the first style that has one.
    fn legends_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        let style_names = self.style_names();
        let legends: Vec<Legend> = self
            .layer_styles(&caps)
            .into_iter()
            .enumerate()
            .filter_map(|(i, layer)| {
                let selected = style_names.get(i).filter(|s| !s.is_empty());
                let style = match selected {
                    Some(name) => layer.styles.into_iter().find(|s| &s.name == name),
                    None => layer.styles.into_iter().find(|s| s.legend.is_some()),
                };
                style?.legend
            })
            .collect();
        to_value(legends)
    }

    fn info_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        let names = self.layer_names();
        let mut sections = Vec::new();
        let mut first_description: Option<String> = None;

        for name in &names {
            let Some(layer) = caps.find_layer(name) else {
                continue;
            };
            let Some(text) = layer.abstract_text.as_deref().filter(|a| !a.trim().is_empty()) else {
                continue;
            };
            if is_ignored_abstract(text) {
                continue;
            }
            let title = if names.len() == 1 {
                "Data Description".to_string()
            } else {
                format!("Data Description - {}", layer.title)
            };
            sections.push(InfoSection::new(title, text));
            first_description.get_or_insert_with(|| text.to_string());
        }

        let service = &caps.service;
        if let Some(text) = service.abstract_text.as_deref() {
            if !text.trim().is_empty()
                && !is_ignored_abstract(text)
                && first_description.as_deref() != Some(text)
            {
                sections.push(InfoSection::new("Service Description", text));
            }
        }
        if let Some(constraints) = service.access_constraints.as_deref() {
            let constraints = constraints.trim();
            if !constraints.is_empty() && !constraints.eq_ignore_ascii_case("none") {
                sections.push(InfoSection::new("Access Constraints", constraints));
            }
        }
        to_value(sections)
    }

    /// Bounding box of the first selected layer only; the union over all
    /// selected layers is not computed.
    fn rectangle_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        let first = self.layer_names().into_iter().next()?;
        to_value(caps.bounding_box_for(&first)?)
    }

    fn is_geoserver_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        Some(Value::Bool(caps.service.has_keyword("GEOSERVER")))
    }

    fn discrete_times_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        let values = self.layer_names().into_iter().find_map(|name| {
            caps.inherited_value(&name, |layer: &CapabilitiesLayer| {
                layer.dimension("time").map(|d| d.values.clone())
            })
        })?;
        match expand_time_dimension(&values, self.max_discrete_times) {
            Ok(times) => to_value(times),
            Err(err) => {
                debug!(error = %err, "Ignoring unparseable time dimension");
                None
            }
        }
    }

    fn name_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        let names = self.layer_names();
        let [only] = names.as_slice() else {
            return None;
        };
        let title = &caps.find_layer(only)?.title;
        (!title.is_empty()).then(|| Value::String(title.clone()))
    }

    fn min_scale_denominator_value(&self) -> Option<Value> {
        let caps = self.capabilities()?;
        let first = self.layer_names().into_iter().next()?;
        let denominator = caps.inherited_value(&first, |layer: &CapabilitiesLayer| {
            layer.min_scale_denominator
        })?;
        to_value(denominator)
    }
}

fn convert_style(style: &Style) -> WmsStyle {
    let legend = style.legend_url.first().map(|legend| Legend {
        url: decode_url(&legend.online_resource),
        url_mime_type: legend.format.clone(),
        title: None,
    });
    WmsStyle {
        name: style.name.clone(),
        title: style.title.clone(),
        r#abstract: style.abstract_text.clone(),
        legend,
    }
}
