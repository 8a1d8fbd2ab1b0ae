//! Inspection recording and grade preview.
//!
//! Both entry points fetch a product's stored attributes and run the grading
//! function over them. Recording persists the result alongside the inspector
//! identity and remarks; previewing returns it without writing anything.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::model::{GradePreview, Inspection};
use crate::store::Store;

/// Grades a product and persists the result as an inspection record.
///
/// # Errors
///
/// Fails if the product id resolves to no stored record or the record has no
/// quantity to grade with.
pub fn record_inspection(
    store: &Store,
    product_id: u32,
    inspector: &str,
    remarks: &str,
) -> Result<Inspection> {
    let product = store
        .find_product(product_id)?
        .with_context(|| format!("product {product_id} not found"))?;

    let result = product.grading()?;
    let inspection = Inspection {
        timestamp: Utc::now(),
        product_id,
        inspector: inspector.to_string(),
        remarks: remarks.to_string(),
        score: result.score,
        grade: result.grade,
        certification: result.certification,
    };

    store.append_inspection(&inspection)?;

    info!(
        product_id,
        inspector,
        score = inspection.score,
        grade = %inspection.grade,
        "Inspection recorded"
    );
    Ok(inspection)
}

/// Grades a product without persisting anything.
///
/// A product id that resolves to no stored record yields the
/// `(0.0, "N/A", "N/A")` sentinel rather than an error.
pub fn preview(store: &Store, product_id: u32) -> Result<GradePreview> {
    match store.find_product(product_id)? {
        Some(product) => Ok(GradePreview::from_result(product_id, product.grading()?)),
        None => {
            warn!(product_id, "Preview requested for unknown product");
            Ok(GradePreview::not_found(product_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::store::NewProduct;
    use std::env;
    use std::fs;

    fn temp_store(name: &str) -> Store {
        let dir = env::temp_dir().join(format!("crop_rater_inspect_{name}"));
        let _ = fs::remove_dir_all(&dir);
        Store::open(&dir).unwrap()
    }

    fn seed_product(store: &Store) -> u32 {
        let farmer = store.add_user("asha", "pw", Role::Farmer).unwrap();
        store
            .add_product(NewProduct {
                name: "Rice".to_string(),
                description: None,
                fertilizer: "urea".to_string(),
                organic: "organic".to_string(),
                soil: "loamy".to_string(),
                irrigation: "drip".to_string(),
                quantity: 500.0,
                quality: "premium".to_string(),
                farmer_id: farmer.id,
                tx_hash: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_record_inspection_persists_result() {
        let store = temp_store("record");
        let product_id = seed_product(&store);

        let inspection =
            record_inspection(&store, product_id, "kumar", "well stored").unwrap();
        assert_eq!(inspection.score, 0.93);
        assert_eq!(inspection.grade, "A+");
        assert_eq!(inspection.certification, "Organic Premium Plus");

        let history = store.load_inspections(product_id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].inspector, "kumar");
        assert_eq!(history[0].remarks, "well stored");
        assert_eq!(history[0].score, 0.93);
    }

    #[test]
    fn test_record_inspection_unknown_product_fails() {
        let store = temp_store("record_unknown");
        assert!(record_inspection(&store, 99, "kumar", "").is_err());
    }

    #[test]
    fn test_preview_does_not_persist() {
        let store = temp_store("preview");
        let product_id = seed_product(&store);

        let result = preview(&store, product_id).unwrap();
        assert_eq!(result.score, 0.93);
        assert_eq!(result.grade, "A+");

        assert!(store.load_inspections(product_id).unwrap().is_empty());
    }

    #[test]
    fn test_preview_unknown_product_returns_sentinel() {
        let store = temp_store("preview_unknown");

        let result = preview(&store, 42).unwrap();
        assert_eq!(result, GradePreview::not_found(42));
    }

    #[test]
    fn test_repeated_previews_are_identical() {
        let store = temp_store("preview_repeat");
        let product_id = seed_product(&store);

        let first = preview(&store, product_id).unwrap();
        let second = preview(&store, product_id).unwrap();
        assert_eq!(first, second);
    }
}
