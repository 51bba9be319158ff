use std::collections::BTreeMap;

use reqwest::{Client, Url};
use research_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use schemars::{JsonSchema, schema_for};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, JsonSchema)]
pub struct WikipediaToolParameters {
    #[schemars(description = "The topic to look up on Wikipedia.")]
    query: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    query: Option<QueryPages>,
}

#[derive(Deserialize)]
struct QueryPages {
    #[serde(default)]
    pages: BTreeMap<String, Page>,
}

#[derive(Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: String,
    fullurl: Option<String>,
}

/// A tool for reading the introduction of the best matching Wikipedia
/// article.
pub struct WikipediaTool {
    client: Client,
    base_url: String,
    parameter_schema: Value,
}

impl WikipediaTool {
    /// Creates a Wikipedia tool for the site at `base_url`.
    pub fn new<S: Into<String>>(client: Client, base_url: S) -> Self {
        let base_url: String = base_url.into();
        WikipediaTool {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            parameter_schema: schema_for!(WikipediaToolParameters).to_value(),
        }
    }

    fn api_url(&self, query: &str) -> Result<Url, ToolError> {
        let mut url = Url::parse(&format!("{}/w/api.php", self.base_url))
            .map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("invalid Wikipedia URL: {err}"))
            })?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("format", "json")
            .append_pair("generator", "search")
            .append_pair("gsrsearch", query)
            .append_pair("gsrlimit", "1")
            .append_pair("prop", "extracts|info")
            .append_pair("exintro", "1")
            .append_pair("explaintext", "1")
            .append_pair("redirects", "1")
            .append_pair("inprop", "url");
        Ok(url)
    }
}

impl Tool for WikipediaTool {
    type Input = WikipediaToolParameters;

    fn name(&self) -> &str {
        "search_wikipedia"
    }

    fn description(&self) -> &str {
        r#"
Search Wikipedia and return the introduction of the best matching
article, with its title and URL."#
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    fn execute(
        &self,
        input: WikipediaToolParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let client = self.client.clone();
        let url = self.api_url(&input.query);
        let base_url = self.base_url.clone();

        async move {
            let resp = client.get(url?).send().await.map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("Wikipedia request failed: {err}"))
            })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ToolError::execution_error()
                    .with_reason(format!("Wikipedia returned {status}")));
            }

            let body: QueryResponse = resp.json().await.map_err(|err| {
                ToolError::execution_error()
                    .with_reason(format!("invalid Wikipedia response: {err}"))
            })?;
            let page = body
                .query
                .and_then(|query| query.pages.into_values().next());
            let Some(page) = page else {
                return Ok(format!(
                    "No Wikipedia article found for \"{}\"",
                    input.query
                ));
            };

            let url = page.fullurl.unwrap_or_else(|| {
                format!("{base_url}/wiki/{}", page.title.replace(' ', "_"))
            });
            Ok(format!("{}\n{url}\n\n{}", page.title, page.extract.trim()))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const ADA_URL: &str = "https://en.wikipedia.org/wiki/Ada_Lovelace";
    const ADA_EXTRACT: &str = "Augusta Ada King, Countess of Lovelace, \
                               was an English mathematician.\n";

    fn params(query: &str) -> WikipediaToolParameters {
        WikipediaToolParameters {
            query: query.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_lookup_article() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("action", "query"))
            .and(query_param("format", "json"))
            .and(query_param("generator", "search"))
            .and(query_param("gsrsearch", "Ada Lovelace"))
            .and(query_param("gsrlimit", "1"))
            .and(query_param("prop", "extracts|info"))
            .and(query_param("exintro", "1"))
            .and(query_param("explaintext", "1"))
            .and(query_param("redirects", "1"))
            .and(query_param("inprop", "url"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "batchcomplete": "",
                "query": {
                    "pages": {
                        "974": {
                            "pageid": 974,
                            "title": "Ada Lovelace",
                            "extract": ADA_EXTRACT,
                            "fullurl": ADA_URL
                        }
                    }
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let tool = WikipediaTool::new(Client::new(), mock_server.uri());
        let output = tool.execute(params("Ada Lovelace")).await.unwrap();
        assert_eq!(
            output,
            format!("Ada Lovelace\n{ADA_URL}\n\n{}", ADA_EXTRACT.trim())
        );
    }

    #[tokio::test]
    async fn test_no_article() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "batchcomplete": "" })),
            )
            .mount(&mock_server)
            .await;

        let tool = WikipediaTool::new(Client::new(), mock_server.uri());
        let output = tool.execute(params("qwxzv")).await.unwrap();
        assert_eq!(output, "No Wikipedia article found for \"qwxzv\"");
    }

    #[tokio::test]
    async fn test_missing_url_falls_back_to_title() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": {
                    "pages": {
                        "1": {
                            "title": "Grace Hopper",
                            "extract": "Rear admiral."
                        }
                    }
                }
            })))
            .mount(&mock_server)
            .await;

        let tool = WikipediaTool::new(Client::new(), mock_server.uri());
        let output = tool.execute(params("Hopper")).await.unwrap();
        assert_eq!(
            output,
            format!(
                "Grace Hopper\n{}/wiki/Grace_Hopper\n\nRear admiral.",
                mock_server.uri()
            )
        );
    }

    #[tokio::test]
    async fn test_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let tool = WikipediaTool::new(Client::new(), mock_server.uri());
        let err = tool.execute(params("rust")).await.unwrap_err();
        assert_eq!(err.reason(), "Wikipedia returned 503 Service Unavailable");
    }
}
