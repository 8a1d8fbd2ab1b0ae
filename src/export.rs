//! Product index aggregation and export.
//!
//! Builds per-product JSON reports plus a top-level index over every stored
//! product, written either to a local directory or to an S3 bucket under the
//! same `aggregates/` keys. Raw CSV partitions can also be backed up to S3,
//! optionally gzip-compressed.

use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::{Inspection, Product};
use crate::store::Store;

/// Complete export document for a single product.
#[derive(Debug, Serialize)]
pub struct ProductReport {
    pub schema_version: u8,
    pub algorithm_version: u8,
    pub product_id: u32,
    pub name: String,
    pub farmer_id: u32,
    pub tx_hash: Option<String>,
    pub score: f64,
    pub grade: String,
    pub certification: String,
    pub inspections: Vec<Inspection>,
    pub last_updated: DateTime<Utc>,
}

/// Summary entry for the product index listing.
#[derive(Debug, Serialize)]
pub struct ProductIndexEntry {
    pub product_id: u32,
    pub name: String,
    pub farmer_id: u32,
    pub score: f64,
    pub grade: String,
    pub certification: String,
}

/// Top-level index of all graded products, served as
/// `aggregates/products.json`.
#[derive(Debug, Serialize)]
pub struct ProductIndex {
    pub generated_at: DateTime<Utc>,
    pub products: Vec<ProductIndexEntry>,
}

/// Builds the export report for one product: a fresh grading of its stored
/// attributes plus its full inspection history.
pub fn build_report(store: &Store, product: &Product) -> Result<ProductReport> {
    let result = product.grading()?;
    let inspections = store.load_inspections(product.id)?;

    Ok(ProductReport {
        schema_version: 1,
        algorithm_version: 1,
        product_id: product.id,
        name: product.name.clone(),
        farmer_id: product.farmer_id,
        tx_hash: product.tx_hash.clone(),
        score: result.score,
        grade: result.grade,
        certification: result.certification,
        inspections,
        last_updated: Utc::now(),
    })
}

/// Grades every stored product into an index. Products that cannot be graded
/// (no quantity on a legacy row) are logged and skipped rather than failing
/// the whole export; `backfill` repairs them.
pub fn build_index(store: &Store) -> Result<ProductIndex> {
    let mut entries = Vec::new();

    for product in store.load_all_products()? {
        let result = match product.grading() {
            Ok(result) => result,
            Err(e) => {
                warn!(product_id = product.id, error = %e, "Skipping ungradable product");
                continue;
            }
        };

        entries.push(ProductIndexEntry {
            product_id: product.id,
            name: product.name,
            farmer_id: product.farmer_id,
            score: result.score,
            grade: result.grade,
            certification: result.certification,
        });
    }

    Ok(ProductIndex {
        generated_at: Utc::now(),
        products: entries,
    })
}

/// Writes per-product reports and the index as JSON files under `out_dir`.
pub fn export_local(store: &Store, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir.join("products"))?;

    let index = build_index(store)?;

    for product in store.load_all_products()? {
        if !index.products.iter().any(|e| e.product_id == product.id) {
            continue;
        }
        let report = build_report(store, &product)?;
        let path = out_dir.join(format!("products/{}.json", product.id));
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    fs::write(
        out_dir.join("products.json"),
        serde_json::to_string_pretty(&index)?,
    )?;

    info!(out_dir = %out_dir.display(), products = index.products.len(), "Local export complete");
    Ok(())
}

/// Uploads per-product reports and the index to S3 under `aggregates/`.
pub async fn export_s3(store: &Store, bucket: &str) -> Result<()> {
    let config = aws_config::load_from_env().await;
    let s3 = aws_sdk_s3::Client::new(&config);

    let index = build_index(store)?;

    for product in store.load_all_products()? {
        if !index.products.iter().any(|e| e.product_id == product.id) {
            continue;
        }
        let report = build_report(store, &product)?;
        write_json_to_s3(
            &s3,
            bucket,
            &format!("aggregates/products/{}.json", product.id),
            &report,
        )
        .await?;
    }

    write_json_to_s3(&s3, bucket, "aggregates/products.json", &index).await?;

    info!(bucket, products = index.products.len(), "S3 export complete");
    Ok(())
}

/// Serializes a value to JSON and uploads it to an S3 bucket with
/// `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await?;

    Ok(())
}

/// Uploads the raw CSV files to S3, preserving the partition layout in the
/// object keys and optionally gzip-compressing each file.
pub async fn backup(store: &Store, bucket: &str, gzip: bool) -> Result<()> {
    let config = aws_config::load_from_env().await;
    let s3 = aws_sdk_s3::Client::new(&config);

    let mut upload_count = 0;

    for relative in collect_csv_files(store.root())? {
        let contents = fs::read(store.root().join(&relative))?;
        let relative = relative
            .to_str()
            .map(str::to_string)
            .unwrap_or_else(|| relative.display().to_string());

        let (body, key) = if gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&contents)?;
            let compressed = encoder.finish()?;
            (compressed, format!("{relative}.gz"))
        } else {
            (contents, relative)
        };

        s3.put_object()
            .bucket(bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .send()
            .await?;

        upload_count += 1;
    }

    info!(upload_count, bucket, gzip, "CSV backup complete");
    Ok(())
}

/// Lists every CSV file in the store, as paths relative to its root.
fn collect_csv_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if root.join("users.csv").exists() {
        files.push(PathBuf::from("users.csv"));
    }

    for entry in fs::read_dir(root.join("products"))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let partition = entry.path().join("products.csv");
        if partition.exists() {
            files.push(partition.strip_prefix(root)?.to_path_buf());
        }
    }

    for entry in fs::read_dir(root.join("inspections"))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("csv") {
            files.push(path.strip_prefix(root)?.to_path_buf());
        }
    }

    files.sort_unstable();
    Ok(files)
}
