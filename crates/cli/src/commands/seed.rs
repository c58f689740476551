//! Seed the catalog from a YAML file.
//!
//! Every entry goes through the same validation as the admin form, and the
//! whole file is checked before anything is written.
//!
//! ```yaml
//! - name: Mug
//!   price: "10.00"
//!   image_url: https://example.com/mug.png
//!   description: Stoneware mug, 350 ml.
//!   material: Stoneware
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

use kiln_storefront::db::{self, PgStore};
use kiln_storefront::services::{CatalogService, ProductInput};

/// One product entry in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    /// Decimal string in major units, e.g. `"10.00"`.
    pub price: String,
    pub image_url: String,
    pub description: String,
    pub material: String,
}

impl From<SeedProduct> for ProductInput {
    fn from(p: SeedProduct) -> Self {
        Self {
            name: p.name,
            price: p.price,
            image_url: p.image_url,
            description: p.description,
            material: p.material,
        }
    }
}

/// Parse a seed file body and validate every entry.
///
/// Returns the entries, or one message per invalid entry.
pub fn parse_products(content: &str) -> Result<Vec<ProductInput>, Vec<String>> {
    let entries: Vec<SeedProduct> =
        serde_yaml::from_str(content).map_err(|e| vec![format!("invalid YAML: {e}")])?;

    let inputs: Vec<ProductInput> = entries.into_iter().map(ProductInput::from).collect();

    let errors: Vec<String> = inputs
        .iter()
        .enumerate()
        .filter_map(|(i, input)| {
            input
                .validate()
                .err()
                .map(|errs| format!("entry {} ({}): {errs}", i + 1, input.name))
        })
        .collect();

    if errors.is_empty() {
        Ok(inputs)
    } else {
        Err(errors)
    }
}

/// Insert the products listed in `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, the
/// database URL is missing, or an insert fails.
pub async fn products(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;

    let inputs = match parse_products(&content) {
        Ok(inputs) => inputs,
        Err(errors) => {
            error!("Seed file validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };

    info!(products = inputs.len(), "Seed file validated");
    if dry_run {
        return Ok(());
    }

    let database_url = super::database_url().ok_or("KILN_DATABASE_URL not set")?;
    let store = PgStore::new(db::create_pool(&database_url).await?);
    let catalog = CatalogService::new(&store);

    for input in &inputs {
        let product = catalog.add_product(input).await?;
        info!(product_id = %product.id, name = %product.name, "Inserted product");
    }

    info!("Seeding complete! {} products inserted", inputs.len());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_file() {
        let yaml = r#"
- name: Mug
  price: "10.00"
  image_url: https://example.com/mug.png
  description: Stoneware mug
  material: Stoneware
- name: Bowl
  price: "12.50"
  image_url: /static/bowl.png
  description: Serving bowl
  material: Porcelain
"#;
        let inputs = parse_products(yaml).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].name, "Mug");
        assert_eq!(inputs[1].price, "12.50");
    }

    #[test]
    fn test_parse_reports_each_invalid_entry() {
        let yaml = r#"
- name: Mug
  price: "abc"
  image_url: https://example.com/mug.png
  description: Stoneware mug
  material: Stoneware
- name: Plate
  price: "5"
  image_url: https://example.com/plate.png
  description: Dinner plate
  material: Stoneware
- name: ""
  price: "3"
  image_url: https://example.com/x.png
  description: Nameless
  material: Clay
"#;
        let errors = parse_products(yaml).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("entry 1 (Mug)"));
        assert!(errors[1].starts_with("entry 3"));
    }

    #[test]
    fn test_parse_rejects_malformed_yaml() {
        let errors = parse_products("not: [a, list").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("invalid YAML"));
    }
}
