//! Domain records: users, products, inspections, and grade previews.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::grading::{GradingResult, grade_produce};

/// Role assigned to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Consumer,
    Inspector,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Farmer => "farmer",
            Role::Consumer => "consumer",
            Role::Inspector => "inspector",
            Role::Admin => "admin",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "consumer" => Ok(Role::Consumer),
            "inspector" => Ok(Role::Inspector),
            "admin" => Ok(Role::Admin),
            other => bail!("unknown role '{other}'"),
        }
    }
}

/// A registered account. The wallet address is stored as an opaque string;
/// nothing in this crate interprets or verifies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub wallet_address: Option<String>,
}

impl User {
    pub fn set_password(&mut self, password: &str) {
        self.password_hash = hash_password(&self.username, password);
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash == hash_password(&self.username, password)
    }
}

/// Salted SHA-256 digest, hex encoded. The username is the salt so equal
/// passwords on different accounts hash differently.
fn hash_password(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// A produce lot registered by a farmer. `tx_hash` is opaque blockchain
/// metadata recorded by the caller after an on-chain transaction; it is
/// never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub fertilizer: String,
    pub organic: String,
    pub soil: String,
    pub irrigation: String,
    pub quantity: Option<f64>,
    pub quality: String,
    pub farmer_id: u32,
    pub tx_hash: Option<String>,
}

impl Product {
    /// Grades this product from its stored attributes.
    ///
    /// # Errors
    ///
    /// Fails if the product has no quantity recorded; categorical fields
    /// never fail since unknown values fall back to default weights.
    pub fn grading(&self) -> Result<GradingResult> {
        let Some(quantity) = self.quantity else {
            bail!("product {} has no quantity recorded", self.id);
        };
        Ok(grade_produce(
            &self.fertilizer,
            &self.organic,
            &self.soil,
            &self.irrigation,
            quantity,
            &self.quality,
        ))
    }

    /// Names the gradable fields that are blank or absent on this record.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.fertilizer.trim().is_empty() {
            missing.push("fertilizer");
        }
        if self.organic.trim().is_empty() {
            missing.push("organic");
        }
        if self.soil.trim().is_empty() {
            missing.push("soil");
        }
        if self.irrigation.trim().is_empty() {
            missing.push("irrigation");
        }
        if self.quantity.is_none() {
            missing.push("quantity");
        }
        if self.quality.trim().is_empty() {
            missing.push("quality");
        }
        missing
    }
}

/// One inspector review of a product, with the grading result that was
/// computed from the product's attributes at review time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inspection {
    pub timestamp: DateTime<Utc>,
    pub product_id: u32,
    pub inspector: String,
    pub remarks: String,
    pub score: f64,
    pub grade: String,
    pub certification: String,
}

/// Grading result for a product returned without persisting anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradePreview {
    pub product_id: u32,
    pub score: f64,
    pub grade: String,
    pub certification: String,
}

impl GradePreview {
    pub fn from_result(product_id: u32, result: GradingResult) -> Self {
        Self {
            product_id,
            score: result.score,
            grade: result.grade,
            certification: result.certification,
        }
    }

    /// Sentinel returned when the product id resolves to no stored record.
    pub fn not_found(product_id: u32) -> Self {
        Self {
            product_id,
            score: 0.0,
            grade: "N/A".to_string(),
            certification: "N/A".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> Product {
        Product {
            id: 1,
            name: "Wheat".to_string(),
            description: None,
            fertilizer: "compost".to_string(),
            organic: "organic".to_string(),
            soil: "loamy".to_string(),
            irrigation: "drip".to_string(),
            quantity: Some(500.0),
            quality: "premium".to_string(),
            farmer_id: 2,
            tx_hash: None,
        }
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Farmer, Role::Consumer, Role::Inspector, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("Inspector".parse::<Role>().is_ok());
        assert!("retailer".parse::<Role>().is_err());
    }

    #[test]
    fn test_password_verification() {
        let mut user = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: String::new(),
            role: Role::Farmer,
            wallet_address: None,
        };
        user.set_password("hunter2");

        assert!(user.verify_password("hunter2"));
        assert!(!user.verify_password("hunter3"));
        assert_eq!(user.password_hash.len(), 64);
    }

    #[test]
    fn test_same_password_different_users() {
        let mut a = User {
            id: 1,
            username: "alice".to_string(),
            password_hash: String::new(),
            role: Role::Farmer,
            wallet_address: None,
        };
        let mut b = User {
            id: 2,
            username: "bob".to_string(),
            password_hash: String::new(),
            role: Role::Farmer,
            wallet_address: None,
        };
        a.set_password("same");
        b.set_password("same");
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn test_product_grading() {
        // 0.18 + 0.25 + 0.18 + 0.15 + 0.18 + 0.12 + 0.08 = 1.14, clamped
        let result = product().grading().unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!(result.grade, "A+");
    }

    #[test]
    fn test_grading_requires_quantity() {
        let mut p = product();
        p.quantity = None;
        assert!(p.grading().is_err());
    }

    #[test]
    fn test_missing_fields() {
        let mut p = product();
        assert!(p.missing_fields().is_empty());

        p.fertilizer = "  ".to_string();
        p.quantity = None;
        assert_eq!(p.missing_fields(), vec!["fertilizer", "quantity"]);
    }

    #[test]
    fn test_preview_sentinel() {
        let preview = GradePreview::not_found(42);
        assert_eq!(preview.score, 0.0);
        assert_eq!(preview.grade, "N/A");
        assert_eq!(preview.certification, "N/A");
    }
}
