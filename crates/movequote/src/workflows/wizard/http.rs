//! `reqwest` adapters for the remote pricing backend and the geocoder.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::domain::VendorQuote;
use super::gateway::{
    AddressSuggester, CheckoutRequest, CheckoutSession, GatewayError, LeadRecord, LeadSink,
    PaymentConfirmation, PaymentGateway, QuoteProvider, QuoteRequest,
};

const BACKEND: &str = "quote backend";
const GEOCODER: &str = "geocoder";

fn build_client(service: &'static str, timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| GatewayError::Transport {
            service,
            message: err.to_string(),
        })
}

fn parse_base(service: &'static str, base_url: &str) -> Result<Url, GatewayError> {
    Url::parse(base_url).map_err(|err| GatewayError::Transport {
        service,
        message: format!("invalid base url '{base_url}': {err}"),
    })
}

fn endpoint(service: &'static str, base: &Url, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| GatewayError::Transport {
            service,
            message: format!("base url '{base}' cannot carry a path"),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn transport(service: &'static str) -> impl Fn(reqwest::Error) -> GatewayError {
    move |err| GatewayError::Transport {
        service,
        message: err.to_string(),
    }
}

async fn read_json<T: DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Rejected { service, message });
    }
    if !status.is_success() {
        return Err(GatewayError::Status {
            service,
            status: status.as_u16(),
        });
    }

    response.json::<T>().await.map_err(|err| GatewayError::Decode {
        service,
        message: err.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct QuotesEnvelope {
    #[serde(default)]
    quotes: Vec<VendorQuote>,
}

#[derive(Debug, Deserialize)]
struct LeadEnvelope {
    lead_id: String,
}

/// Client for the pricing backend, which also fronts checkout and lead storage.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: Url,
}

impl RemoteBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(BACKEND, timeout)?,
            base_url: parse_base(BACKEND, base_url)?,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        endpoint(BACKEND, &self.base_url, segments)
    }
}

#[async_trait]
impl QuoteProvider for RemoteBackend {
    async fn quotes(&self, request: &QuoteRequest) -> Result<Vec<VendorQuote>, GatewayError> {
        let response = self
            .client
            .post(self.url(&["quotes"])?)
            .json(request)
            .send()
            .await
            .map_err(transport(BACKEND))?;
        let envelope: QuotesEnvelope = read_json(BACKEND, response).await?;
        Ok(envelope.quotes)
    }
}

#[async_trait]
impl PaymentGateway for RemoteBackend {
    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let response = self
            .client
            .post(self.url(&["checkout"])?)
            .json(request)
            .send()
            .await
            .map_err(transport(BACKEND))?;
        read_json(BACKEND, response).await
    }

    async fn confirm(
        &self,
        checkout_session_id: &str,
    ) -> Result<PaymentConfirmation, GatewayError> {
        let response = self
            .client
            .get(self.url(&["checkout", checkout_session_id])?)
            .send()
            .await
            .map_err(transport(BACKEND))?;
        read_json(BACKEND, response).await
    }
}

#[async_trait]
impl LeadSink for RemoteBackend {
    async fn record(&self, lead: &LeadRecord) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.url(&["leads"])?)
            .json(lead)
            .send()
            .await
            .map_err(transport(BACKEND))?;
        let envelope: LeadEnvelope = read_json(BACKEND, response).await?;
        Ok(envelope.lead_id)
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    place_name: String,
}

/// Mapbox places autocomplete, limited to US street addresses.
#[derive(Debug, Clone)]
pub struct MapboxGeocoder {
    client: Client,
    base_url: Url,
    access_token: String,
}

impl MapboxGeocoder {
    pub const SUGGESTION_LIMIT: usize = 5;

    pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_client(GEOCODER, timeout)?,
            base_url: parse_base(GEOCODER, base_url)?,
            access_token: access_token.to_string(),
        })
    }
}

#[async_trait]
impl AddressSuggester for MapboxGeocoder {
    async fn suggest(&self, query: &str) -> Result<Vec<String>, GatewayError> {
        let place = format!("{}.json", query.trim());
        let url = endpoint(
            GEOCODER,
            &self.base_url,
            &["geocoding", "v5", "mapbox.places", &place],
        )?;
        let limit = Self::SUGGESTION_LIMIT.to_string();

        let response = self
            .client
            .get(url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("autocomplete", "true"),
                ("country", "us"),
                ("types", "address"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(transport(GEOCODER))?;

        let collection: FeatureCollection = read_json(GEOCODER, response).await?;
        Ok(collection
            .features
            .into_iter()
            .map(|feature| feature.place_name)
            .take(Self::SUGGESTION_LIMIT)
            .collect())
    }
}
