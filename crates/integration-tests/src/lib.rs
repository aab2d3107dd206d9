//! Integration tests for the KP storefront.
//!
//! These tests drive [`kp_storefront::state::AppState`] the way a consumer
//! does, with slots stored as files in a throwaway directory. They need no
//! network: the cart runs in local mode.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kp-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::Path;

use kp_core::{ProductId, ProductImage, ProductInput};
use kp_storefront::config::StorefrontConfig;
use kp_storefront::state::AppState;
use tempfile::TempDir;

/// A data directory under the system temp dir, removed on drop.
#[derive(Debug)]
pub struct TestDataDir {
    dir: TempDir,
}

impl TestDataDir {
    /// Create a fresh, uniquely named directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("kp-it-")
            .tempdir()
            .expect("Failed to create test data dir");
        Self { dir }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Storefront configuration in local cart mode rooted at this directory.
    ///
    /// # Panics
    ///
    /// Panics if the fixed test variables fail validation.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn config(&self) -> StorefrontConfig {
        let data_dir = self.path().display().to_string();
        StorefrontConfig::from_source(&move |key: &str| {
            match key {
                "WORDPRESS_URL" => Some("https://shop.test".to_string()),
                "WOOCOMMERCE_CONSUMER_KEY" => Some("ck_1234".to_string()),
                "WOOCOMMERCE_CONSUMER_SECRET" => {
                    Some("cs_4f9a1c7e2b8d3a6f0e5c9b1d7a2e4f8c3b6d0a9e".to_string())
                }
                "KP_CART_MODE" => Some("local".to_string()),
                "KP_DATA_DIR" => Some(data_dir.clone()),
                _ => None,
            }
        })
        .expect("Test configuration is valid")
    }

    /// Build application state as a fresh process would.
    pub async fn start(&self) -> AppState {
        AppState::new(self.config()).await
    }
}

impl Default for TestDataDir {
    fn default() -> Self {
        Self::new()
    }
}

/// A product descriptor as the catalog would hand it to the cart.
#[must_use]
pub fn product(id: i64, name: &str, price: &str) -> ProductInput {
    ProductInput {
        id: ProductId::new(id),
        name: name.to_string(),
        price: price.to_string(),
        images: vec![ProductImage {
            src: format!("https://shop.test/img/{id}.jpg"),
        }],
    }
}
