//! reqwest-backed [`TripDataSource`].
//!
//! - Export: newline-delimited JSON over basic auth
//! - Detail: token-authenticated admin API, signing in again once on `401`

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::error::{SourceError, SourceResult};
use super::parse::{detail_from_payloads, parse_export};
use super::TripDataSource;
use crate::config::SourceSettings;
use crate::models::{DateRange, TripDetail, TripId, TripRecord};

pub struct HttpTripSource {
    client: Client,
    settings: SourceSettings,
    /// Current admin API token. Replaced after a successful sign-in; the
    /// write lock is held for the whole sign-in.
    token: RwLock<Option<String>>,
}

impl HttpTripSource {
    pub fn new(settings: SourceSettings) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| SourceError::transport("client", e))?;

        Ok(Self {
            client,
            token: RwLock::new(settings.api_token.clone()),
            settings,
        })
    }

    fn api_url(&self, path: &str) -> SourceResult<String> {
        let base = self.settings.api_base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(SourceError::NotConfigured("api_base_url".into()));
        }
        Ok(format!("{}{}", base, path))
    }

    /// Exchange the configured credentials for a fresh token.
    async fn sign_in(&self) -> SourceResult<String> {
        let (Some(email), Some(password)) = (
            self.settings.api_email.as_deref(),
            self.settings.api_password.as_deref(),
        ) else {
            return Err(SourceError::Unauthorized(
                "token rejected and no sign-in credentials configured".into(),
            ));
        };

        let url = self.api_url("/auth/sign_in")?;
        let body = json!({ "admin_user": { "email": email, "password": password } });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::transport(&url, e))?;

        if !resp.status().is_success() {
            return Err(SourceError::Unauthorized(format!(
                "sign-in failed with HTTP {}",
                resp.status().as_u16()
            )));
        }

        let payload: Value = resp.json().await.map_err(|e| SourceError::decode(&url, e))?;
        payload
            .get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SourceError::InvalidResponse("sign-in response has no token".into()))
    }

    /// Replace a token the API rejected.
    ///
    /// Requests that were rejected together queue on the write lock; only the
    /// first signs in, the rest pick up the token it stored.
    async fn renew_token(&self, rejected: Option<&str>) -> SourceResult<String> {
        let mut current = self.token.write().await;
        if let Some(token) = current.as_deref() {
            if Some(token) != rejected {
                debug!("Token already renewed by a concurrent request");
                return Ok(token.to_string());
            }
        }

        let fresh = self.sign_in().await?;
        *current = Some(fresh.clone());
        info!("Signed in to trip API");
        Ok(fresh)
    }

    fn authorized(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(t) => builder.header(reqwest::header::AUTHORIZATION, t),
            None => builder,
        }
    }

    /// GET an admin API path, retrying once with a new token on `401`.
    async fn get_admin_json(&self, path: &str) -> SourceResult<Value> {
        let url = self.api_url(path)?;
        let token = self.token.read().await.clone();

        let resp = self
            .authorized(self.client.get(&url), token.as_deref())
            .send()
            .await
            .map_err(|e| SourceError::transport(&url, e))?;

        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            debug!("Token rejected for {}, signing in again", path);
            let fresh = self.renew_token(token.as_deref()).await?;
            let retry = self
                .authorized(self.client.get(&url), Some(&fresh))
                .send()
                .await
                .map_err(|e| SourceError::transport(&url, e))?;
            if retry.status() == StatusCode::UNAUTHORIZED {
                return Err(SourceError::Unauthorized(format!(
                    "{} rejected a freshly issued token",
                    path
                )));
            }
            retry
        } else {
            resp
        };

        if !resp.status().is_success() {
            return Err(SourceError::Status {
                status: resp.status().as_u16(),
                url,
            });
        }
        resp.json().await.map_err(|e| SourceError::decode(&url, e))
    }
}

#[async_trait]
impl TripDataSource for HttpTripSource {
    async fn fetch_trips(&self, range: &DateRange) -> SourceResult<Vec<TripRecord>> {
        let secret = self
            .settings
            .export_secret
            .as_deref()
            .ok_or_else(|| SourceError::NotConfigured("export_secret".into()))?;
        let url = &self.settings.export_url;

        let mut request = self
            .client
            .get(url)
            .basic_auth(secret, Some(""))
            .query(&[
                ("from_date", range.start.format("%Y-%m-%d").to_string()),
                ("to_date", range.end.format("%Y-%m-%d").to_string()),
            ]);
        if let Some(event) = self.settings.export_event.as_deref() {
            request = request.query(&[("event", json!([event]).to_string())]);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| SourceError::transport(url, e))?;
        if !resp.status().is_success() {
            return Err(SourceError::Status {
                status: resp.status().as_u16(),
                url: url.clone(),
            });
        }
        let body = resp.text().await.map_err(|e| SourceError::decode(url, e))?;

        let parsed = parse_export(&body, self.settings.export_event.as_deref());
        if parsed.skipped > 0 {
            warn!(
                "Export for {} skipped {} unusable events",
                range, parsed.skipped
            );
        }
        info!("Export for {}: {} trips", range, parsed.records.len());
        Ok(parsed.records)
    }

    async fn fetch_trip_detail(&self, trip_id: TripId) -> SourceResult<TripDetail> {
        let trip = self
            .get_admin_json(&format!("/admin/trips/{}", trip_id))
            .await?;
        let coordinates = self
            .get_admin_json(&format!("/admin/trips/{}/coordinates", trip_id))
            .await?;
        Ok(detail_from_payloads(&trip, &coordinates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_api_url_joins_without_double_slash() {
        let source = HttpTripSource::new(SourceSettings {
            api_base_url: "https://api.example.test/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            source.api_url("/admin/trips/5").unwrap(),
            "https://api.example.test/admin/trips/5"
        );
    }

    #[test]
    fn test_missing_base_url_is_not_configured() {
        let source = HttpTripSource::new(SourceSettings::default()).unwrap();
        assert!(matches!(
            source.api_url("/x"),
            Err(SourceError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_export_requires_secret() {
        let source = HttpTripSource::new(SourceSettings::default()).unwrap();
        let range = DateRange::new(
            chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
        )
        .unwrap();
        let err = source.fetch_trips(&range).await.unwrap_err();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_renew_reuses_token_replaced_meanwhile() {
        let source = Arc::new(
            HttpTripSource::new(SourceSettings {
                api_base_url: "https://api.example.test".into(),
                api_token: Some("renewed".into()),
                ..Default::default()
            })
            .unwrap(),
        );

        // no credentials are configured, so any real sign-in would fail
        let renewals: Vec<_> = (0..8)
            .map(|_| {
                let source = Arc::clone(&source);
                tokio::spawn(async move { source.renew_token(Some("expired")).await })
            })
            .collect();
        for renewal in renewals {
            assert_eq!(renewal.await.unwrap().unwrap(), "renewed");
        }

        let err = source.renew_token(Some("renewed")).await.unwrap_err();
        assert!(matches!(err, SourceError::Unauthorized(_)));
        assert_eq!(source.token.read().await.as_deref(), Some("renewed"));
    }

    #[tokio::test]
    async fn test_sign_in_without_credentials_is_unauthorized() {
        let source = HttpTripSource::new(SourceSettings {
            api_base_url: "https://api.example.test".into(),
            ..Default::default()
        })
        .unwrap();
        let err = source.sign_in().await.unwrap_err();
        assert!(matches!(err, SourceError::Unauthorized(_)));
    }
}
