use async_trait::async_trait;
use futures_util::stream::{self, Stream, TryStreamExt};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{ApiConfig, SettingsConfig};
use crate::error::TrackerError;
use crate::types::{
    BatchStatus, Listing, ListingPage, PriceUpdate, PriceUpdateRequest, PriceUpdateResponse,
};

/// Longest slice of an error response body carried into an error message.
const ERROR_BODY_LIMIT: usize = 300;

/// A paginated source of active listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page (0-based).
    async fn fetch_page(&self, page: u32) -> Result<ListingPage, TrackerError>;
}

/// Lazily stream every listing of a source, page by page.
///
/// The next page is requested only once the current one has been drained,
/// and only while the source reports more pages. An empty page ends the
/// stream regardless of `totalPages`. The first error ends the stream.
pub fn fetch_listings<S>(source: &S) -> impl Stream<Item = Result<Listing, TrackerError>> + Send + '_
where
    S: ListingSource + ?Sized,
{
    stream::try_unfold(Some(0u32), move |next| async move {
        let Some(page) = next else {
            return Ok::<_, TrackerError>(None);
        };
        let resp = source.fetch_page(page).await?;
        debug!(
            page,
            count = resp.content.len(),
            total_pages = resp.total_pages,
            "Fetched listing page"
        );
        let more = !resp.content.is_empty() && page + 1 < resp.total_pages;
        let items = stream::iter(resp.content.into_iter().map(Ok::<Listing, TrackerError>));
        Ok(Some((items, more.then_some(page + 1))))
    })
    .try_flatten()
}

/// HTTP client for the marketplace seller integration API.
pub struct MarketplaceClient {
    http: reqwest::Client,
    api: ApiConfig,
    page_size: u32,
}

impl MarketplaceClient {
    pub fn new(api: &ApiConfig, settings: &SettingsConfig) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("{} - SelfIntegration", api.seller_id))
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| TrackerError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api: api.clone(),
            page_size: settings.page_size,
        })
    }

    fn products_url(&self) -> String {
        format!(
            "{}/product/sellers/{}/products",
            self.api.base(),
            self.api.seller_id
        )
    }

    fn price_update_url(&self) -> String {
        format!(
            "{}/inventory/sellers/{}/products/price-and-inventory",
            self.api.base(),
            self.api.seller_id
        )
    }

    fn batch_url(&self, batch_id: &str) -> String {
        format!(
            "{}/product/sellers/{}/products/batch-requests/{}",
            self.api.base(),
            self.api.seller_id,
            batch_id
        )
    }

    /// Send an authenticated request and decode a JSON success body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        what: &str,
    ) -> Result<T, TrackerError> {
        let resp = req
            .basic_auth(&self.api.key, Some(&self.api.secret))
            .send()
            .await
            .map_err(TrackerError::from_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(TrackerError::UpstreamUnavailable(format!(
                "{what} returned HTTP {status}: {snippet}"
            )));
        }

        let body = resp.bytes().await.map_err(TrackerError::from_transport)?;
        serde_json::from_slice(&body)
            .map_err(|e| TrackerError::UpstreamSchema(format!("{what}: {e}")))
    }

    /// Submit a price update. Returns the marketplace batch request id.
    pub async fn update_prices(&self, items: &[PriceUpdate]) -> Result<String, TrackerError> {
        let req = self
            .http
            .post(self.price_update_url())
            .json(&PriceUpdateRequest { items });
        let resp: PriceUpdateResponse = self.send_json(req, "price update").await?;
        debug!(batch_id = %resp.batch_request_id, items = items.len(), "Price update accepted");
        Ok(resp.batch_request_id)
    }

    /// Fetch the processing status of a batch request.
    pub async fn batch_status(&self, batch_id: &str) -> Result<BatchStatus, TrackerError> {
        let req = self.http.get(self.batch_url(batch_id));
        self.send_json(req, "batch status").await
    }
}

#[async_trait]
impl ListingSource for MarketplaceClient {
    async fn fetch_page(&self, page: u32) -> Result<ListingPage, TrackerError> {
        let page_param = page.to_string();
        let size_param = self.page_size.to_string();
        let req = self.http.get(self.products_url()).query(&[
            ("page", page_param.as_str()),
            ("size", size_param.as_str()),
            ("archived", "false"),
            ("onSale", "true"),
        ]);
        self.send_json(req, "product listing").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSource, listing, page};
    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    // ── fetch_listings ─────────────────────────────────────────────

    #[tokio::test]
    async fn paginates_two_pages_of_100_and_50() {
        let first: Vec<_> = (0..100).map(|i| listing(&format!("B{i:03}"), dec!(10))).collect();
        let second: Vec<_> = (100..150).map(|i| listing(&format!("B{i:03}"), dec!(10))).collect();
        let source = FakeSource::new(vec![Ok(page(first, 2)), Ok(page(second, 2))]);

        let all: Vec<Listing> = fetch_listings(&source).try_collect().await.expect("stream ok");

        assert_eq!(all.len(), 150);
        assert_eq!(all[0].barcode, "B000");
        assert_eq!(all[149].barcode, "B149");
        assert_eq!(source.requested_pages(), vec![0, 1]);
    }

    #[tokio::test]
    async fn empty_listing_yields_nothing() {
        let source = FakeSource::new(vec![Ok(page(vec![], 0))]);
        let all: Vec<Listing> = fetch_listings(&source).try_collect().await.expect("stream ok");
        assert!(all.is_empty());
        assert_eq!(source.requested_pages(), vec![0]);
    }

    #[tokio::test]
    async fn empty_page_stops_even_if_more_reported() {
        let source = FakeSource::new(vec![
            Ok(page(vec![listing("A", dec!(1))], 5)),
            Ok(page(vec![], 5)),
        ]);
        let all: Vec<Listing> = fetch_listings(&source).try_collect().await.expect("stream ok");
        assert_eq!(all.len(), 1);
        assert_eq!(source.requested_pages(), vec![0, 1]);
    }

    #[tokio::test]
    async fn error_on_second_page_ends_stream() {
        let source = FakeSource::new(vec![
            Ok(page(vec![listing("A", dec!(1)), listing("B", dec!(2))], 3)),
            Err(TrackerError::UpstreamUnavailable("HTTP 503".into())),
        ]);
        let res: Result<Vec<Listing>, _> = fetch_listings(&source).try_collect().await;
        assert_eq!(res.expect_err("page 2 fails").category(), "UpstreamUnavailable");
        assert_eq!(source.requested_pages(), vec![0, 1]);
    }

    #[tokio::test]
    async fn stream_is_lazy() {
        use futures_util::StreamExt;

        let source = FakeSource::new(vec![
            Ok(page(vec![listing("A", dec!(1))], 2)),
            Ok(page(vec![listing("B", dec!(1))], 2)),
        ]);
        let first = {
            let mut stream = std::pin::pin!(fetch_listings(&source));
            stream.next().await
        };
        assert!(matches!(first, Some(Ok(ref l)) if l.barcode == "A"));
        assert_eq!(source.requested_pages(), vec![0]);
    }

    // ── MarketplaceClient over loopback HTTP ───────────────────────

    /// Serve one canned response per accepted connection; yields raw requests.
    async fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut sock, _) = listener.accept().await.expect("accept");
                let request = read_request(&mut sock).await;
                seen.push(request);
                let reply = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                sock.write_all(reply.as_bytes()).await.expect("write");
                let _ = sock.shutdown().await;
            }
            seen
        });
        (format!("http://{addr}/integration"), handle)
    }

    async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = sock.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&raw).into_owned()
    }

    fn client_for(base: &str) -> MarketplaceClient {
        let api = ApiConfig {
            base_url: base.parse().expect("url"),
            key: "key".into(),
            secret: "secret".into(),
            seller_id: "12345".into(),
        };
        let settings = SettingsConfig {
            request_timeout_secs: 5,
            ..SettingsConfig::default()
        };
        MarketplaceClient::new(&api, &settings).expect("client")
    }

    #[tokio::test]
    async fn fetch_page_sends_expected_request() {
        let body = serde_json::json!({
            "content": [{ "barcode": "ABC123", "title": "Shoe", "salePrice": 199.90 }],
            "totalPages": 1, "page": 0, "size": 200, "totalElements": 1
        })
        .to_string();
        let (base, server) = serve(vec![(200, body)]).await;
        let client = client_for(&base);

        let page = client.fetch_page(0).await.expect("page");
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].sale_price, dec!(199.90));

        let requests = server.await.expect("server");
        let req = &requests[0];
        let request_line = req.lines().next().expect("request line");
        assert!(request_line.starts_with("GET /integration/product/sellers/12345/products?"));
        assert!(request_line.contains("page=0"));
        assert!(request_line.contains("size=200"));
        assert!(request_line.contains("archived=false"));
        assert!(request_line.contains("onSale=true"));
        // base64("key:secret")
        assert!(req.contains("Basic a2V5OnNlY3JldA=="));
        let lower = req.to_ascii_lowercase();
        assert!(lower.contains("authorization: basic"));
        assert!(lower.contains("user-agent: 12345 - selfintegration"));
    }

    #[tokio::test]
    async fn http_500_is_upstream_unavailable() {
        let (base, server) = serve(vec![(500, "{\"error\":\"boom\"}".into())]).await;
        let err = client_for(&base).fetch_page(0).await.expect_err("500");
        assert_eq!(err.category(), "UpstreamUnavailable");
        assert!(err.to_string().contains("500"));
        server.await.expect("server");
    }

    #[tokio::test]
    async fn malformed_body_is_schema_error() {
        let body = serde_json::json!({ "content": [{ "title": "no barcode", "salePrice": 1 }] })
            .to_string();
        let (base, server) = serve(vec![(200, body)]).await;
        let err = client_for(&base).fetch_page(0).await.expect_err("schema");
        assert_eq!(err.category(), "UpstreamSchemaError");
        server.await.expect("server");
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let err = client_for(&format!("http://{addr}/integration"))
            .fetch_page(0)
            .await
            .expect_err("refused");
        assert_eq!(err.category(), "UpstreamUnavailable");
    }

    #[tokio::test]
    async fn update_prices_posts_items_and_returns_batch_id() {
        let (base, server) =
            serve(vec![(200, "{\"batchRequestId\":\"batch-42\"}".into())]).await;
        let items = vec![PriceUpdate {
            barcode: "8682125482126".into(),
            sale_price: dec!(355.99),
            list_price: dec!(356.99),
        }];
        let batch_id = client_for(&base).update_prices(&items).await.expect("update");
        assert_eq!(batch_id, "batch-42");

        let requests = server.await.expect("server");
        let req = &requests[0];
        assert!(req.starts_with(
            "POST /integration/inventory/sellers/12345/products/price-and-inventory"
        ));
        assert!(req.contains("\"barcode\":\"8682125482126\""));
        assert!(req.contains("\"salePrice\""));
    }

    #[tokio::test]
    async fn batch_status_hits_batch_endpoint() {
        let body = serde_json::json!({
            "batchRequestId": "batch-42",
            "items": [{ "requestItem": { "barcode": "A" }, "status": "SUCCESS", "failureReasons": [] }]
        })
        .to_string();
        let (base, server) = serve(vec![(200, body)]).await;
        let status = client_for(&base).batch_status("batch-42").await.expect("status");
        assert!(status.all_succeeded());

        let requests = server.await.expect("server");
        assert!(requests[0].starts_with(
            "GET /integration/product/sellers/12345/products/batch-requests/batch-42 "
        ));
    }
}
