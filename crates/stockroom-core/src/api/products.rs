//! Typed product catalog endpoints.
//!
//! All calls flow through [`ApiClient::send_with_refresh`] and therefore
//! inherit bearer attachment and transparent session renewal.

use anyhow::{Context, Result};

use crate::models::{NewProduct, Product, ProductPage, ProductPatch};

use super::ApiClient;

/// Default page size for catalog listings
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Response header carrying the total record count for paginated listings
const TOTAL_COUNT_HEADER: &str = "x-total-count";

impl ApiClient {
    /// Fetch one page of products, optionally filtered by a search query.
    /// The total count comes from the `x-total-count` response header.
    pub async fn list_products(
        &self,
        page: u32,
        limit: u32,
        query: Option<&str>,
    ) -> Result<ProductPage> {
        let url = format!("{}/products", self.base_url());
        let response = self
            .send_with_refresh(|http| {
                let mut request = http.get(&url).query(&[
                    ("_page", page.to_string()),
                    ("_limit", limit.to_string()),
                ]);
                if let Some(query) = query {
                    request = request.query(&[("q", query)]);
                }
                request
            })
            .await?;

        let response = Self::check_response(response).await?;

        let total = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);

        let products = response
            .json()
            .await
            .context("Failed to parse product list")?;

        Ok(ProductPage { products, total })
    }

    pub async fn get_product(&self, id: i64) -> Result<Product> {
        let url = format!("{}/products/{}", self.base_url(), id);
        let response = self.send_with_refresh(|http| http.get(&url)).await?;
        let response = Self::check_response(response).await?;
        response.json().await.context("Failed to parse product")
    }

    pub async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        let url = format!("{}/products", self.base_url());
        let response = self
            .send_with_refresh(|http| http.post(&url).json(product))
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .context("Failed to parse created product")
    }

    pub async fn update_product(&self, id: i64, patch: &ProductPatch) -> Result<Product> {
        let url = format!("{}/products/{}", self.base_url(), id);
        let response = self
            .send_with_refresh(|http| http.put(&url).json(patch))
            .await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .context("Failed to parse updated product")
    }

    pub async fn delete_product(&self, id: i64) -> Result<()> {
        let url = format!("{}/products/{}", self.base_url(), id);
        let response = self.send_with_refresh(|http| http.delete(&url)).await?;
        Self::check_response(response).await?;
        Ok(())
    }
}
