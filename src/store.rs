//! CSV-backed record store.
//!
//! Records live under a single data directory:
//!
//! ```text
//! data/
//!   users.csv
//!   products/farmer_id=<id>/products.csv
//!   inspections/product_id=<id>.csv
//! ```
//!
//! Products are partitioned per farmer, and inspections are append-only with
//! the header written once. User and product files are rewritten whole on
//! mutation.

use anyhow::{Context, Result, bail};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::{Inspection, Product, Role, User};
use crate::output::append_record;

/// Defaults applied by [`Store::backfill_defaults`] to blank product fields.
const DEFAULT_FERTILIZER: &str = "urea";
const DEFAULT_ORGANIC: &str = "organic";
const DEFAULT_SOIL: &str = "loamy";
const DEFAULT_IRRIGATION: &str = "drip";
const DEFAULT_QUANTITY: f64 = 1.0;
const DEFAULT_QUALITY: &str = "medium";

/// Seeded on first open so the store is never without an admin account.
const SEED_ADMIN_USERNAME: &str = "admin";
const SEED_ADMIN_PASSWORD: &str = "admin123";

/// Attributes for a product being registered. The id is assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub fertilizer: String,
    pub organic: String,
    pub soil: String,
    pub irrigation: String,
    pub quantity: f64,
    pub quality: String,
    pub farmer_id: u32,
    pub tx_hash: Option<String>,
}

pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Opens the store at `root`, creating the directory layout if needed
    /// and seeding the default admin account on first use.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("products"))
            .with_context(|| format!("creating store at {}", root.display()))?;
        fs::create_dir_all(root.join("inspections"))?;

        let store = Self { root };
        store.seed_admin()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn users_path(&self) -> PathBuf {
        self.root.join("users.csv")
    }

    fn farmer_dir(&self, farmer_id: u32) -> PathBuf {
        self.root.join("products").join(format!("farmer_id={farmer_id}"))
    }

    fn products_path(&self, farmer_id: u32) -> PathBuf {
        self.farmer_dir(farmer_id).join("products.csv")
    }

    fn inspections_path(&self, product_id: u32) -> PathBuf {
        self.root
            .join("inspections")
            .join(format!("product_id={product_id}.csv"))
    }

    fn seed_admin(&self) -> Result<()> {
        let mut users = self.load_users()?;
        if users.iter().any(|u| u.username == SEED_ADMIN_USERNAME) {
            return Ok(());
        }

        let id = next_id(users.iter().map(|u| u.id));
        let mut admin = User {
            id,
            username: SEED_ADMIN_USERNAME.to_string(),
            password_hash: String::new(),
            role: Role::Admin,
            wallet_address: None,
        };
        admin.set_password(SEED_ADMIN_PASSWORD);
        users.push(admin);
        self.save_users(&users)?;

        info!(username = SEED_ADMIN_USERNAME, "Seeded default admin account");
        Ok(())
    }

    // ---------- users ----------

    pub fn load_users(&self) -> Result<Vec<User>> {
        read_rows(&self.users_path())
    }

    fn save_users(&self, users: &[User]) -> Result<()> {
        write_rows(&self.users_path(), users)
    }

    pub fn find_user(&self, user_id: u32) -> Result<Option<User>> {
        Ok(self.load_users()?.into_iter().find(|u| u.id == user_id))
    }

    pub fn add_user(&self, username: &str, password: &str, role: Role) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            bail!("username must not be empty");
        }

        let mut users = self.load_users()?;
        if users.iter().any(|u| u.username == username) {
            bail!("username '{username}' already exists");
        }

        let mut user = User {
            id: next_id(users.iter().map(|u| u.id)),
            username: username.to_string(),
            password_hash: String::new(),
            role,
            wallet_address: None,
        };
        user.set_password(password);

        users.push(user.clone());
        self.save_users(&users)?;

        info!(user_id = user.id, username, role = %role, "User added");
        Ok(user)
    }

    /// Removes the user with the given id. Returns `false` if no such user
    /// exists.
    pub fn delete_user(&self, user_id: u32) -> Result<bool> {
        let mut users = self.load_users()?;
        let before = users.len();
        users.retain(|u| u.id != user_id);

        if users.len() == before {
            return Ok(false);
        }

        self.save_users(&users)?;
        info!(user_id, "User deleted");
        Ok(true)
    }

    /// Stores a wallet address on the user record. The address is opaque:
    /// no checksum or signature verification happens here.
    pub fn link_wallet(&self, user_id: u32, address: &str) -> Result<User> {
        let mut users = self.load_users()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .with_context(|| format!("user {user_id} not found"))?;

        user.wallet_address = Some(address.to_string());
        let updated = user.clone();
        self.save_users(&users)?;

        info!(user_id, address, "Wallet linked");
        Ok(updated)
    }

    // ---------- products ----------

    /// Lists the farmer ids that have a product partition on disk.
    pub fn farmer_ids(&self) -> Result<Vec<u32>> {
        let mut ids = Vec::new();

        for entry in fs::read_dir(self.root.join("products"))? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(dir_name) = entry.file_name().to_str() {
                    if let Some(id) = dir_name.strip_prefix("farmer_id=") {
                        ids.push(id.parse()?);
                    }
                }
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    pub fn load_farmer_products(&self, farmer_id: u32) -> Result<Vec<Product>> {
        read_rows(&self.products_path(farmer_id))
    }

    pub fn load_all_products(&self) -> Result<Vec<Product>> {
        let mut products = Vec::new();
        for farmer_id in self.farmer_ids()? {
            products.extend(self.load_farmer_products(farmer_id)?);
        }
        products.sort_unstable_by_key(|p| p.id);
        Ok(products)
    }

    pub fn find_product(&self, product_id: u32) -> Result<Option<Product>> {
        Ok(self
            .load_all_products()?
            .into_iter()
            .find(|p| p.id == product_id))
    }

    pub fn add_product(&self, new: NewProduct) -> Result<Product> {
        if new.name.trim().is_empty() {
            bail!("product name must not be empty");
        }
        if self.find_user(new.farmer_id)?.is_none() {
            bail!("farmer {} not found", new.farmer_id);
        }

        let all = self.load_all_products()?;
        let product = Product {
            id: next_id(all.iter().map(|p| p.id)),
            name: new.name,
            description: new.description,
            fertilizer: new.fertilizer,
            organic: new.organic,
            soil: new.soil,
            irrigation: new.irrigation,
            quantity: Some(new.quantity),
            quality: new.quality,
            farmer_id: new.farmer_id,
            tx_hash: new.tx_hash,
        };

        fs::create_dir_all(self.farmer_dir(product.farmer_id))?;
        let mut partition = self.load_farmer_products(product.farmer_id)?;
        partition.push(product.clone());
        write_rows(&self.products_path(product.farmer_id), &partition)?;

        info!(
            product_id = product.id,
            farmer_id = product.farmer_id,
            name = %product.name,
            "Product added"
        );
        Ok(product)
    }

    /// Fills blank gradable fields on every stored product with the default
    /// values and returns the ids that changed.
    pub fn backfill_defaults(&self) -> Result<Vec<u32>> {
        let mut fixed = Vec::new();

        for farmer_id in self.farmer_ids()? {
            let mut partition = self.load_farmer_products(farmer_id)?;
            let mut partition_changed = false;

            for product in &mut partition {
                let mut changed = false;

                if product.fertilizer.trim().is_empty() {
                    product.fertilizer = DEFAULT_FERTILIZER.to_string();
                    changed = true;
                }
                if product.organic.trim().is_empty() {
                    product.organic = DEFAULT_ORGANIC.to_string();
                    changed = true;
                }
                if product.soil.trim().is_empty() {
                    product.soil = DEFAULT_SOIL.to_string();
                    changed = true;
                }
                if product.irrigation.trim().is_empty() {
                    product.irrigation = DEFAULT_IRRIGATION.to_string();
                    changed = true;
                }
                if product.quantity.is_none() {
                    product.quantity = Some(DEFAULT_QUANTITY);
                    changed = true;
                }
                if product.quality.trim().is_empty() {
                    product.quality = DEFAULT_QUALITY.to_string();
                    changed = true;
                }

                if changed {
                    info!(product_id = product.id, "Backfilled missing fields");
                    fixed.push(product.id);
                    partition_changed = true;
                }
            }

            if partition_changed {
                write_rows(&self.products_path(farmer_id), &partition)?;
            }
        }

        Ok(fixed)
    }

    // ---------- inspections ----------

    pub fn append_inspection(&self, inspection: &Inspection) -> Result<()> {
        append_record(self.inspections_path(inspection.product_id), inspection)
    }

    pub fn load_inspections(&self, product_id: u32) -> Result<Vec<Inspection>> {
        read_rows(&self.inspections_path(product_id))
    }
}

fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
    ids.max().map_or(1, |max| max + 1)
}

/// Reads every row of a CSV file. A missing file reads as no rows.
fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: T = result.with_context(|| format!("reading {}", path.display()))?;
        rows.push(record);
    }

    Ok(rows)
}

/// Rewrites a CSV file whole, headers included.
fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Rewriting CSV file");

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("writing {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
