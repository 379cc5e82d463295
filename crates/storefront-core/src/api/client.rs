//! API client for communicating with the storefront REST API.
//!
//! This module provides the `ApiClient` struct for authentication, catalog,
//! order, deposit, payment gateway, settings, and user administration calls.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::{IdentityPayload, ProfileUpdate, Role, SignupRequest};
use crate::models::{
    Dashboard, Deposit, DepositRequest, DepositStatus, NewOrder, Order, OrderStatus, PaymentMethod,
    Product, StoreSettings, UserSummary,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured (local development server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) GET requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Reason recorded when an admin cancels an order without giving one.
pub const DEFAULT_CANCELLATION_REASON: &str = "No specific reason provided by administration.";

/// API client for the storefront server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against `base_url` with the default timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            Ok(Some(Self::check_response(response).await?))
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .get(&url)
                .headers(self.auth_headers()?)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .map_err(|e| ApiError::InvalidResponse(e.to_string()))
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    /// Send a request with a JSON body. Writes are not retried.
    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(path);
        let response = self
            .client
            .request(method.clone(), &url)
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.send_json(Method::POST, path, body).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.send_json(Method::PUT, path, body).await
    }

    /// Send a request whose response body is irrelevant.
    async fn send_unit<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&B>) -> Result<()> {
        let url = self.url(path);
        let mut request = self.client.request(method.clone(), &url).headers(self.auth_headers()?);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.send_unit::<()>(Method::DELETE, path, None).await
    }

    // ===== Authentication =====

    pub async fn login(&self, email: &str, password: &str) -> Result<IdentityPayload> {
        debug!(email, "Sending login request");
        self.post("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<IdentityPayload> {
        debug!(email = %request.email, "Sending signup request");
        self.post("/auth/signup", request).await
    }

    /// Fetch the server's current view of the signed-in identity
    pub async fn fetch_me(&self) -> Result<IdentityPayload> {
        self.get("/auth/me").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<IdentityPayload> {
        self.put("/auth/profile", update).await
    }

    // ===== Catalog =====

    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        self.get("/products").await
    }

    pub async fn create_product(&self, product: &Product) -> Result<Product> {
        self.post("/products", product).await
    }

    pub async fn update_product(&self, id: &str, product: &Product) -> Result<Product> {
        self.put(&format!("/products/{}", id), product).await
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        self.delete(&format!("/products/{}", id)).await
    }

    // ===== Orders =====

    pub async fn create_order(&self, order: &NewOrder) -> Result<Order> {
        self.post("/orders", order).await
    }

    pub async fn fetch_my_orders(&self) -> Result<Vec<Order>> {
        self.get("/orders/myorders").await
    }

    pub async fn fetch_all_orders(&self) -> Result<Vec<Order>> {
        self.get("/orders").await
    }

    /// Admins see every order; customers only their own.
    pub async fn fetch_orders_for(&self, role: Role) -> Result<Vec<Order>> {
        match role {
            Role::Admin => self.fetch_all_orders().await,
            Role::Customer => self.fetch_my_orders().await,
        }
    }

    pub async fn update_order_status(
        &self,
        id: &str,
        status: OrderStatus,
        cancellation_reason: Option<&str>,
    ) -> Result<Order> {
        let reason = match status {
            OrderStatus::Cancelled => cancellation_reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_CANCELLATION_REASON),
            _ => "",
        };
        self.put(
            &format!("/orders/{}", id),
            &json!({ "status": status, "cancellationReason": reason }),
        )
        .await
    }

    // ===== Deposits =====

    pub async fn request_deposit(&self, request: &DepositRequest) -> Result<Deposit> {
        self.post("/deposits", request).await
    }

    pub async fn fetch_my_deposits(&self) -> Result<Vec<Deposit>> {
        self.get("/deposits/mydeposits").await
    }

    pub async fn fetch_all_deposits(&self) -> Result<Vec<Deposit>> {
        self.get("/deposits").await
    }

    pub async fn update_deposit_status(&self, id: &str, status: DepositStatus) -> Result<()> {
        self.send_unit(Method::PUT, &format!("/deposits/{}", id), Some(&json!({ "status": status })))
            .await
    }

    // ===== Payment Methods =====

    pub async fn fetch_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.get("/payment-methods").await
    }

    /// Includes inactive gateways; admin only
    pub async fn fetch_all_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.get("/payment-methods/admin").await
    }

    /// Create or update a gateway; the server upserts on `id`
    pub async fn save_payment_method(&self, method: &PaymentMethod) -> Result<()> {
        let mut body = serde_json::to_value(method)?;
        if !method.id.is_empty() {
            body["id"] = json!(method.id);
        }
        self.send_unit(Method::POST, "/payment-methods", Some(&body)).await
    }

    pub async fn delete_payment_method(&self, id: &str) -> Result<()> {
        self.delete(&format!("/payment-methods/{}", id)).await
    }

    // ===== Settings =====

    pub async fn fetch_settings(&self) -> Result<StoreSettings> {
        self.get("/settings").await
    }

    pub async fn update_settings(&self, settings: &StoreSettings) -> Result<StoreSettings> {
        self.put("/settings", settings).await
    }

    // ===== User Administration =====

    pub async fn fetch_users(&self) -> Result<Vec<UserSummary>> {
        self.get("/auth/users").await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.delete(&format!("/auth/users/{}", id)).await
    }

    pub async fn update_user_balance(&self, id: &str, balance: f64) -> Result<UserSummary> {
        self.put(&format!("/auth/users/{}/balance", id), &json!({ "balance": balance }))
            .await
    }

    /// Fetch every admin listing concurrently and summarize them.
    pub async fn fetch_dashboard(&self) -> Result<Dashboard> {
        let (products, users, orders, deposits) = futures::try_join!(
            self.fetch_products(),
            self.fetch_users(),
            self.fetch_all_orders(),
            self.fetch_all_deposits()
        )?;
        debug!(
            products = products.len(),
            users = users.len(),
            orders = orders.len(),
            deposits = deposits.len(),
            "Fetched dashboard listings"
        );
        Ok(Dashboard::summarize(&products, &users, &orders, &deposits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:5001/api/").expect("client");
        assert_eq!(client.base_url(), "http://localhost:5001/api");
        assert_eq!(client.url("/auth/me"), "http://localhost:5001/api/auth/me");
    }

    #[test]
    fn test_with_token_shares_base_url() {
        let client = ApiClient::new(DEFAULT_BASE_URL).expect("client");
        assert!(!client.has_token());

        let authed = client.with_token("t1".to_string());
        assert!(authed.has_token());
        assert_eq!(authed.base_url(), DEFAULT_BASE_URL);

        let headers = authed.auth_headers().expect("headers");
        assert_eq!(
            headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer t1")
        );
    }
}
