//! Score source backed by the school platform's read API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::instrument;

use scantrend_core::model::{EvaluationWindow, Goal, Heatmap, Reflection};
use scantrend_core::traits::ScoreSource;

use crate::error::SourceError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP read-API score source.
///
/// Routes:
/// - `GET {base}/api/scans[?course_id=..]`
/// - `GET {base}/api/scans/{id}/heatmap`
/// - `GET {base}/api/scans/{id}/goals`
/// - `GET {base}/api/scans/{id}/reflections`
pub struct HttpScoreSource {
    base_url: String,
    api_token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpScoreSource {
    pub fn new(base_url: &str, api_token: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
        })
    }

    /// GET `{base}/{segments..}` and decode the JSON body. Each segment is
    /// percent-encoded on its own, so window ids may carry `/`, `#` or `?`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        what: &str,
    ) -> anyhow::Result<T> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid source URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("source URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let route = url.path().to_string();
        let mut req = self.client.get(url);
        if let Some(token) = &self.api_token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.timeout_secs)
            } else {
                SourceError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 401 || status == 403 {
            return Err(SourceError::Unauthorized(format!("HTTP {status} for {route}")).into());
        }
        if status == 404 {
            return Err(SourceError::NotFound(format!("{what} at {route}")).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status,
                message: body,
            }
            .into());
        }

        let parsed = response.json::<T>().await.map_err(|e| SourceError::Parse {
            what: what.to_string(),
            message: e.to_string(),
        })?;
        Ok(parsed)
    }
}

#[async_trait]
impl ScoreSource for HttpScoreSource {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn list_windows(&self, course_id: Option<&str>) -> anyhow::Result<Vec<EvaluationWindow>> {
        let query: Vec<(&str, &str)> = course_id.map(|c| ("course_id", c)).into_iter().collect();
        self.get_json(&["api", "scans"], &query, "scan list").await
    }

    #[instrument(skip(self))]
    async fn get_heatmap(&self, window_id: &str) -> anyhow::Result<Heatmap> {
        self.get_json(&["api", "scans", window_id, "heatmap"], &[], "heatmap")
            .await
    }

    #[instrument(skip(self))]
    async fn get_goals(&self, window_id: &str) -> anyhow::Result<Vec<Goal>> {
        self.get_json(&["api", "scans", window_id, "goals"], &[], "goals")
            .await
    }

    #[instrument(skip(self))]
    async fn get_reflections(&self, window_id: &str) -> anyhow::Result<Vec<Reflection>> {
        self.get_json(
            &["api", "scans", window_id, "reflections"],
            &[],
            "reflections",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn lists_windows_with_course_filter() {
        let server = MockServer::start().await;

        let body = serde_json::json!([
            {"id": "w1", "title": "Fall", "start_date": "2024-09-02", "course_id": "bio"},
            {"id": "w2", "title": "Winter", "start_date": "2025-01-13"}
        ]);

        Mock::given(method("GET"))
            .and(path("/api/scans"))
            .and(query_param("course_id", "bio"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let source = HttpScoreSource::new(&server.uri(), Some("test-token".into()), 5).unwrap();
        let windows = source.list_windows(Some("bio")).await.unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].course_id.as_deref(), Some("bio"));
        assert_eq!(windows[1].course_id, None);
    }

    #[tokio::test]
    async fn parses_heatmap_with_nulls() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "competencies": [
                {"id": "c1", "name": "Plans", "category_id": "org", "category_name": "Organizing"},
                {"id": "c2", "name": "Asks", "category_id": null}
            ],
            "rows": [
                {"student_id": "s1", "student_name": "Ana", "class_name": "7A",
                 "scores": {"c1": 3, "c2": null}}
            ]
        });

        Mock::given(method("GET"))
            .and(path("/api/scans/w1/heatmap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let source = HttpScoreSource::new(&server.uri(), None, 5).unwrap();
        let heatmap = source.get_heatmap("w1").await.unwrap();
        assert_eq!(heatmap.competencies[1].category_id, None);
        assert_eq!(heatmap.rows[0].scores["c1"], Some(3.0));
        assert_eq!(heatmap.rows[0].scores["c2"], None);
    }

    #[tokio::test]
    async fn missing_window_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scans/gone/heatmap"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpScoreSource::new(&server.uri(), None, 5).unwrap();
        let err = source.get_heatmap("gone").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn window_ids_are_percent_encoded() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"competencies": [], "rows": []});

        Mock::given(method("GET"))
            .and(path("/api/scans/scan%231/heatmap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scans/2024%2F25-fall/goals"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scans/what%3F/reflections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpScoreSource::new(&server.uri(), None, 5).unwrap();
        assert!(source.get_heatmap("scan#1").await.unwrap().rows.is_empty());
        assert!(source.get_goals("2024/25-fall").await.unwrap().is_empty());
        assert!(source.get_reflections("what?").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn base_url_path_prefix_is_kept() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/school/api/scans"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/school/", server.uri());
        let source = HttpScoreSource::new(&base, None, 5).unwrap();
        assert!(source.list_windows(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_and_server_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scans"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scans/w1/goals"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let source = HttpScoreSource::new(&server.uri(), Some("bad".into()), 5).unwrap();
        let err = source.list_windows(None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::Unauthorized(_))
        ));

        let err = source.get_goals("w1").await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/scans/w1/reflections"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let source = HttpScoreSource::new(&server.uri(), None, 5).unwrap();
        let err = source.get_reflections("w1").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::Parse { .. })
        ));
    }
}
