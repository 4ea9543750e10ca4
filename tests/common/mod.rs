#![allow(dead_code)]

use async_trait::async_trait;
use finsight::{Attachment, Blob, BlobFetcher, ContentGenerator, Result, ServiceError};
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// Fetcher serving fixed bodies by URL
#[derive(Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Blob>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: &[u8], content_type: Option<&str>) -> Self {
        self.bodies.insert(
            Url::parse(url).unwrap().to_string(),
            Blob {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl BlobFetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> Result<Blob> {
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::download(Some(404), format!("{} returned 404", url)))
    }
}

/// Generator recording its calls and replying with a fixed text
pub struct MockGenerator {
    reply: std::result::Result<String, String>,
    pub calls: Mutex<Vec<(String, Vec<Attachment>)>>,
}

impl MockGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, attachments: &[Attachment]) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), attachments.to_vec()));
        self.reply.clone().map_err(ServiceError::Generation)
    }
}

// Small deterministic perturbation in [-0.3, 0.3]
fn wiggle(i: usize) -> f64 {
    let x = (i as u64).wrapping_mul(2_654_435_761) % 1000;
    (x as f64 / 1000.0 - 0.5) * 0.6
}

/// Monthly `month,sales` table with an upward trend
pub fn monthly_csv(n: usize) -> String {
    let mut csv = String::from("month,sales\n");
    for i in 0..n {
        csv.push_str(&format!(
            "{}-{:02}-01,{}\n",
            2020 + i / 12,
            i % 12 + 1,
            100.0 + 2.0 * i as f64 + wiggle(i)
        ));
    }
    csv
}
