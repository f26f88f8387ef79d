//! One-shot entry points: catalog queries, full runs and Lyapunov spectra.

use anyhow::{bail, Result};
use attractor_core::analysis::definition_spectrum;
use attractor_core::{catalog, SimulationRequest, Trajectory};
use js_sys::Float64Array;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub(crate) fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// An absent request means "catalog defaults".
pub(crate) fn parse_request(request: JsValue) -> Result<SimulationRequest, JsValue> {
    if request.is_undefined() || request.is_null() {
        return Ok(SimulationRequest::default());
    }
    from_value(request).map_err(|e| JsValue::from_str(&format!("Invalid request: {}", e)))
}

pub(crate) fn run_simulation(name: &str, request: &SimulationRequest) -> Result<Trajectory> {
    Ok(attractor_core::simulate(name, request)?)
}

pub(crate) fn spectrum(name: &str, steps: u32, dt: f64, qr_stride: u32) -> Result<Vec<f64>> {
    if qr_stride == 0 {
        bail!("qr_stride must be at least 1.");
    }
    let definition = catalog().lookup(name)?;
    definition_spectrum(definition, dt, steps as usize, qr_stride as usize)
}

#[wasm_bindgen]
pub fn list_systems() -> Vec<String> {
    catalog()
        .list_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[wasm_bindgen]
pub fn describe_system(name: &str) -> Result<JsValue, JsValue> {
    let definition = catalog().lookup(name).map_err(js_error)?;
    to_value(definition).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn simulate(name: &str, request: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let request = parse_request(request)?;
    let trajectory = run_simulation(name, &request).map_err(js_error)?;
    to_value(&trajectory).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn lyapunov_spectrum(
    name: &str,
    steps: u32,
    dt: f64,
    qr_stride: u32,
) -> Result<Float64Array, JsValue> {
    console_error_panic_hook::set_once();
    let exponents = spectrum(name, steps, dt, qr_stride)
        .map_err(|e| JsValue::from_str(&format!("Lyapunov computation failed: {}", e)))?;
    Ok(Float64Array::from(exponents.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_systems_matches_catalog_order() {
        let names = list_systems();
        assert_eq!(names.first().map(String::as_str), Some("damped_decay"));
        assert_eq!(names.last().map(String::as_str), Some("logistic"));
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn run_simulation_surfaces_core_errors() {
        let err = run_simulation("thomas", &SimulationRequest::default())
            .expect_err("unknown system should fail");
        assert!(err.to_string().contains("Unknown system 'thomas'"), "{err}");
    }

    #[test]
    fn run_simulation_returns_recommended_trajectory() {
        let trajectory = run_simulation("logistic", &SimulationRequest::default())
            .expect("logistic should run");
        assert_eq!(trajectory.len(), 1_000);
    }

    #[test]
    fn spectrum_validates_stride_and_name() {
        let err = spectrum("henon", 100, 1.0, 0).expect_err("zero stride should fail");
        assert!(err.to_string().contains("qr_stride"));
        let err = spectrum("nope", 100, 1.0, 1).expect_err("unknown system should fail");
        assert!(err.to_string().contains("Unknown system"));
    }

    #[test]
    fn spectrum_of_henon_has_one_positive_exponent() {
        let exponents = spectrum("henon", 2_000, 1.0, 1).expect("spectrum should compute");
        assert_eq!(exponents.len(), 2);
        assert!(exponents[0] > 0.0 && exponents[1] < 0.0, "{exponents:?}");
    }
}
