/// Network side of the fetcher. Implementations perform exactly one request per call;
/// retries belong to the caller.
pub trait HttpClientPort: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl HttpGetResult {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}
