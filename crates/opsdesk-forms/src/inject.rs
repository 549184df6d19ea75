//! External data injection.
//!
//! Before render, every component declaring `externalData` is resolved
//! through a [`DataProvider`]. Choice components receive the records as
//! additional options; any other component keeps the raw result in
//! [`FormComponent::injected`], which the serializer later submits as a
//! top-level variable. A provider failure affects only its own node.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::options::normalize_items;
use crate::types::{FormComponent, FormDefinition};

/// Internal lookup service answering external-data references.
pub trait DataProvider {
    /// Returns records for `reference`, or `None` when it has nothing.
    fn fetch(
        &self,
        reference: &str,
        variables: &Value,
    ) -> Result<Option<Vec<Value>>, ProviderError>;
}

/// Outcome counters of one injection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectionReport {
    pub resolved: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Returns a copy of `definition` with external data merged in.
pub fn inject_external_data(
    definition: &FormDefinition,
    provider: &dyn DataProvider,
    variables: &Value,
) -> (FormDefinition, InjectionReport) {
    let mut injected = definition.clone();
    let mut report = InjectionReport::default();
    inject_into(&mut injected.components, provider, variables, &mut report);
    (injected, report)
}

fn inject_into(
    components: &mut [FormComponent],
    provider: &dyn DataProvider,
    variables: &Value,
    report: &mut InjectionReport,
) {
    for component in components.iter_mut() {
        if let Some(reference) = component.external_data.clone().filter(|r| !r.is_empty()) {
            inject_one(component, &reference, provider, variables, report);
        }
        if !component.components.is_empty() {
            inject_into(&mut component.components, provider, variables, report);
        }
    }
}

fn inject_one(
    component: &mut FormComponent,
    reference: &str,
    provider: &dyn DataProvider,
    variables: &Value,
    report: &mut InjectionReport,
) {
    match provider.fetch(reference, variables) {
        Ok(Some(records)) => {
            debug!(id = %component.id, reference, count = records.len(), "external data injected");
            report.resolved += 1;
            if component.component_type.is_choice() {
                component.values.extend(normalize_items(&records));
            } else {
                component.injected = Some(Value::Array(records));
            }
        }
        Ok(None) => {
            debug!(id = %component.id, reference, "provider returned nothing");
            report.empty += 1;
        }
        Err(e) => {
            warn!(id = %component.id, reference, error = %e, "external data lookup failed");
            report.failed += 1;
        }
    }
}
