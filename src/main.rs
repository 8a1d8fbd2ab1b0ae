//! CLI entry point for the crop rater tool.
//!
//! Provides subcommands for managing users and produce lots, recording
//! inspections with computed quality grades, previewing grades, and
//! exporting aggregated results locally or to S3.

use anyhow::Result;
use clap::{Parser, Subcommand};
use crop_rater::{
    export::{backup, export_local, export_s3},
    inspect::{preview, record_inspection},
    model::Role,
    output::print_json,
    store::{NewProduct, Store},
};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "crop_rater")]
#[command(about = "A tool to track and grade agricultural produce", long_about = None)]
struct Cli {
    /// Directory holding the record store (falls back to CROP_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user account
    AddUser {
        /// Unique username
        username: String,

        /// Password for the account
        #[arg(short, long)]
        password: String,

        /// Account role: farmer, consumer, inspector, or admin
        #[arg(short, long)]
        role: Role,
    },
    /// List all user accounts
    ListUsers,
    /// Delete a user account by id
    DeleteUser {
        /// Id of the user to remove
        user_id: u32,
    },
    /// Store a wallet address on a user account
    LinkWallet {
        /// Id of the user to update
        user_id: u32,

        /// Wallet address, stored verbatim
        address: String,
    },
    /// Register a produce lot for a farmer
    AddProduct {
        /// Product name
        name: String,

        /// Id of the owning farmer
        #[arg(short, long)]
        farmer_id: u32,

        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,

        /// Fertilizer used (urea, compost, vermicompost, biofertilizer, npk, dap)
        #[arg(long, default_value = "")]
        fertilizer: String,

        /// "organic" or anything else for conventional
        #[arg(long, default_value = "")]
        organic: String,

        /// Soil type (loamy, sandy, sandy loam, clay, silt)
        #[arg(long, default_value = "")]
        soil: String,

        /// Irrigation method (drip, sprinkler, flood, manual)
        #[arg(long, default_value = "")]
        irrigation: String,

        /// Lot quantity
        #[arg(short, long)]
        quantity: f64,

        /// Declared quality tier (premium, high, medium, low)
        #[arg(long, default_value = "")]
        quality: String,

        /// Blockchain transaction hash, recorded as opaque metadata
        #[arg(long)]
        tx_hash: Option<String>,
    },
    /// List stored products, flagging rows with missing gradable fields
    ListProducts {
        /// Only show products of this farmer
        #[arg(short, long)]
        farmer_id: Option<u32>,
    },
    /// Fill blank product fields with their default values
    Backfill,
    /// Record an inspector's review of a product with a computed grade
    Inspect {
        /// Id of the product under review
        product_id: u32,

        /// Name of the reviewing inspector
        #[arg(short, long)]
        inspector: String,

        /// Free-text remarks
        #[arg(short, long, default_value = "")]
        remarks: String,
    },
    /// Preview a product's grade without persisting anything
    Preview {
        /// Id of the product to grade
        product_id: u32,
    },
    /// Show the inspection history of a product
    History {
        /// Id of the product
        product_id: u32,
    },
    /// Export per-product reports and a grade index as JSON
    Export {
        /// S3 bucket to upload to; exports locally when omitted
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Directory for local export output
        #[arg(short, long, default_value = "aggregates")]
        output_dir: String,
    },
    /// Upload the raw CSV files to S3, preserving the partition layout
    Backup {
        /// S3 bucket name to upload files to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: String,

        /// Gzip compress CSV files before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/crop_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("crop_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var("CROP_DATA_DIR").ok())
        .unwrap_or_else(|| "data".to_string());
    let store = Store::open(&data_dir)?;

    match cli.command {
        Commands::AddUser {
            username,
            password,
            role,
        } => {
            let user = store.add_user(&username, &password, role)?;
            print_json(&user)?;
        }
        Commands::ListUsers => {
            let users = store.load_users()?;

            for user in &users {
                info!(
                    user_id = user.id,
                    username = %user.username,
                    role = %user.role,
                    wallet = user.wallet_address.as_deref().unwrap_or("-"),
                    "User"
                );
            }

            let farmers = users.iter().filter(|u| u.role == Role::Farmer).count();
            let inspectors = users.iter().filter(|u| u.role == Role::Inspector).count();
            info!(total = users.len(), farmers, inspectors, "User list summary");
        }
        Commands::DeleteUser { user_id } => {
            if store.delete_user(user_id)? {
                info!(user_id, "User removed");
            } else {
                warn!(user_id, "No such user");
            }
        }
        Commands::LinkWallet { user_id, address } => {
            let user = store.link_wallet(user_id, &address)?;
            print_json(&user)?;
        }
        Commands::AddProduct {
            name,
            farmer_id,
            description,
            fertilizer,
            organic,
            soil,
            irrigation,
            quantity,
            quality,
            tx_hash,
        } => {
            let product = store.add_product(NewProduct {
                name,
                description,
                fertilizer,
                organic,
                soil,
                irrigation,
                quantity,
                quality,
                farmer_id,
                tx_hash,
            })?;
            print_json(&product)?;
        }
        Commands::ListProducts { farmer_id } => {
            let products = match farmer_id {
                Some(farmer_id) => store.load_farmer_products(farmer_id)?,
                None => store.load_all_products()?,
            };

            let mut incomplete = 0;
            for product in &products {
                let missing = product.missing_fields();
                if missing.is_empty() {
                    info!(
                        product_id = product.id,
                        name = %product.name,
                        farmer_id = product.farmer_id,
                        "Product"
                    );
                } else {
                    incomplete += 1;
                    warn!(
                        product_id = product.id,
                        name = %product.name,
                        farmer_id = product.farmer_id,
                        missing = missing.join(", "),
                        "Product with missing fields"
                    );
                }
            }

            info!(
                total = products.len(),
                incomplete,
                "Product list summary"
            );
        }
        Commands::Backfill => {
            let fixed = store.backfill_defaults()?;
            info!(fixed = fixed.len(), "Backfill complete");
        }
        Commands::Inspect {
            product_id,
            inspector,
            remarks,
        } => {
            let inspection = record_inspection(&store, product_id, &inspector, &remarks)?;
            print_json(&inspection)?;
        }
        Commands::Preview { product_id } => {
            let result = preview(&store, product_id)?;
            print_json(&result)?;
        }
        Commands::History { product_id } => {
            let inspections = store.load_inspections(product_id)?;

            for inspection in &inspections {
                info!(
                    timestamp = %inspection.timestamp,
                    inspector = %inspection.inspector,
                    score = inspection.score,
                    grade = %inspection.grade,
                    remarks = %inspection.remarks,
                    "Inspection"
                );
            }

            info!(
                product_id,
                total = inspections.len(),
                "Inspection history summary"
            );
        }
        Commands::Export {
            s3_bucket,
            output_dir,
        } => match s3_bucket {
            Some(bucket) => export_s3(&store, &bucket).await?,
            None => export_local(&store, Path::new(&output_dir))?,
        },
        Commands::Backup { s3_bucket, gzip } => {
            backup(&store, &s3_bucket, gzip).await?;
        }
    }

    Ok(())
}
