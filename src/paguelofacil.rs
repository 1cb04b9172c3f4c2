//! PagueloFacil payment-link client.
//!
//! The provider accepts a form-encoded POST and answers with a nested JSON
//! payload; `headerStatus.code == 200` plus a `data.url` field signals
//! success. The full payload is kept as an opaque `serde_json::Value` and
//! stored on the order, since only the status code, URL and correlation
//! token are contractually read.

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    config::PagueloFacilConfig,
    error::{AppError, AppResult},
    money,
};

/// Flat tax rate the provider is told to collect on top of the charge.
pub const TAX_PERCENT: i64 = 7;

const LINK_ENDPOINT: &str = "/LinkDeamon.cfm";
const PROVIDER_SUCCESS_CODE: i64 = 200;

/// Provider status strings that count as an approved payment. The webhook
/// uses the upper-case synonyms, the browser redirect reports in Spanish.
const APPROVED_STATUSES: &[&str] = &["COMPLETED", "SUCCESS", "APPROVED", "Aprobada"];

pub fn is_approved_status(status: &str) -> bool {
    APPROVED_STATUSES.contains(&status)
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaderStatus {
    pub code: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkData {
    pub url: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub header_status: Option<HeaderStatus>,
    pub message: Option<String>,
    pub data: Option<LinkData>,
}

/// A successfully created payment link.
#[derive(Debug)]
pub struct PaymentLink {
    pub url: String,
    /// Provider correlation token, stored on the order as `payment_id`.
    pub token: Option<String>,
    /// Raw provider payload for `payment_result`.
    pub raw: Value,
}

pub struct LinkRequest<'a> {
    /// Charge amount in minor units.
    pub amount: i64,
    pub description: &'a str,
    pub expires_in_secs: u32,
}

#[derive(Clone)]
pub struct PagueloFacilClient {
    http: Client,
    config: PagueloFacilConfig,
}

impl PagueloFacilClient {
    pub fn new(config: PagueloFacilConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Request a hosted payment link for the given amount.
    ///
    /// Provider rejections and network failures surface as
    /// [`AppError::Provider`]; the caller must not mutate order state on
    /// that path.
    pub async fn create_payment_link(&self, req: LinkRequest<'_>) -> AppResult<PaymentLink> {
        let (Some(cclw), Some(return_url)) =
            (self.config.cclw.as_ref(), self.config.return_url.as_ref())
        else {
            return Err(AppError::Provider(
                "Payment provider is not configured correctly. Please contact support.".into(),
            ));
        };

        let amount = money::format_minor(req.amount);
        let tax = money::format_minor(money::flat_tax(req.amount, TAX_PERCENT));
        let expires_in = req.expires_in_secs.to_string();
        let form = [
            ("CCLW", cclw.as_str()),
            ("CMTN", amount.as_str()),
            ("CDSC", req.description),
            ("RETURN_URL", return_url.as_str()),
            ("EXPIRES_IN", expires_in.as_str()),
            ("CTAX", tax.as_str()),
        ];

        let raw: Value = self
            .http
            .post(format!("{}{LINK_ENDPOINT}", self.config.base_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?
            .json()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        let parsed: LinkResponse = serde_json::from_value(raw.clone())
            .map_err(|e| AppError::Provider(format!("unexpected provider response: {e}")))?;

        extract_link(parsed, raw)
    }

    pub fn status_url(&self) -> &str {
        &self.config.status_url
    }
}

fn extract_link(parsed: LinkResponse, raw: Value) -> AppResult<PaymentLink> {
    let header = parsed.header_status.as_ref();
    let code = header.and_then(|h| h.code);
    let url = parsed.data.as_ref().and_then(|d| d.url.clone());

    match (code, url) {
        (Some(PROVIDER_SUCCESS_CODE), Some(url)) => Ok(PaymentLink {
            url,
            token: parsed.data.and_then(|d| d.code),
            raw,
        }),
        _ => {
            let message = header
                .and_then(|h| h.description.clone())
                .or(parsed.message)
                .unwrap_or_else(|| "Payment provider rejected the request".into());
            Err(AppError::Provider(message))
        }
    }
}
