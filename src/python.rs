//! Python bindings, built with the `python` feature

use crate::core::accuracy::{AccuracyReport, NOT_WATER, WATER};
use crate::core::classifier::PixelClassifier;
use crate::core::clean_mask::CleanMaskBuilder;
use crate::types::ReflectanceBands;
use numpy::{PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Convert PyReadonlyArray2 to ndarray Array2
fn numpy_to_array2<T>(arr: PyReadonlyArray2<T>) -> ndarray::Array2<T>
where
    T: Copy + numpy::Element,
{
    arr.as_array().to_owned()
}

/// Validity mask from a scene classification layer
#[pyfunction]
fn clean_mask(py: Python, scl: PyReadonlyArray2<u8>) -> PyResult<PyObject> {
    let mask = CleanMaskBuilder::default().build(&numpy_to_array2(scl));
    Ok(mask.to_pyarray(py).into())
}

/// Classify six reflectance bands: 0 = not water, 1 = water, NaN = masked
#[pyfunction]
#[allow(clippy::too_many_arguments)]
fn classify_pixels(
    py: Python,
    blue: PyReadonlyArray2<f64>,
    green: PyReadonlyArray2<f64>,
    red: PyReadonlyArray2<f64>,
    nir: PyReadonlyArray2<f64>,
    swir1: PyReadonlyArray2<f64>,
    swir2: PyReadonlyArray2<f64>,
    scl: PyReadonlyArray2<u8>,
) -> PyResult<PyObject> {
    let bands = ReflectanceBands::new(
        numpy_to_array2(blue),
        numpy_to_array2(green),
        numpy_to_array2(red),
        numpy_to_array2(nir),
        numpy_to_array2(swir1),
        numpy_to_array2(swir2),
    )
    .map_err(|e| PyValueError::new_err(format!("{}", e)))?;
    let mask = CleanMaskBuilder::default().build(&numpy_to_array2(scl));

    let classified = PixelClassifier::classify(&bands, &mask)
        .map_err(|e| PyValueError::new_err(format!("Classification failed: {}", e)))?;
    Ok(classified.to_pyarray(py).into())
}

/// Confusion matrix and accuracy metrics from 0/1 label sequences
#[pyfunction]
fn accuracy_report(py: Python, actual: Vec<u8>, prediction: Vec<u8>) -> PyResult<PyObject> {
    if actual.len() != prediction.len() {
        return Err(PyValueError::new_err(format!(
            "actual has {} labels, prediction has {}",
            actual.len(),
            prediction.len()
        )));
    }
    let pairs: Vec<(bool, bool)> = actual
        .iter()
        .zip(prediction.iter())
        .map(|(&a, &p)| (a != 0, p != 0))
        .collect();
    let report = AccuracyReport::from_pairs("all", &pairs);

    let result = PyDict::new(py);
    result.set_item("matrix", report.matrix.cells.iter().map(|row| row.to_vec()).collect::<Vec<_>>())?;
    result.set_item("producers_accuracy", (report.producers_accuracy[NOT_WATER], report.producers_accuracy[WATER]))?;
    result.set_item("users_accuracy", (report.users_accuracy[NOT_WATER], report.users_accuracy[WATER]))?;
    result.set_item("overall_accuracy", report.overall_accuracy)?;
    result.set_item("f1_not_water_from_matrix", report.f1_not_water_from_matrix)?;
    result.set_item("f1_water", report.f1_water)?;
    result.set_item("samples", report.samples)?;
    Ok(result.into())
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(clean_mask, m)?)?;
    m.add_function(wrap_pyfunction!(classify_pixels, m)?)?;
    m.add_function(wrap_pyfunction!(accuracy_report, m)?)?;
    Ok(())
}
