#![allow(dead_code)]

use healthstat_scraper::app::ports::{HttpClientPort, HttpGetResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub type Reply = Result<HttpGetResult, String>;

pub fn ok(body: &str) -> Reply {
    Ok(HttpGetResult {
        status: 200,
        bytes: body.as_bytes().to_vec(),
        content_type: Some("text/html; charset=utf-8".to_string()),
    })
}

pub fn status(code: u16) -> Reply {
    Ok(HttpGetResult {
        status: code,
        bytes: b"<html>Service Unavailable</html>".to_vec(),
        content_type: Some("text/html".to_string()),
    })
}

/// HTTP stub answering each url from its own script, in order. Once a script
/// runs out, further requests fail with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedHttp {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Reply>>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HttpClientPort for ScriptedHttp {
    fn get(&self, url: &str) -> Result<HttpGetResult, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|replies| replies.pop_front())
            .unwrap_or_else(|| Err(format!("connection refused: {}", url)))
    }
}

/// A page shaped like the Montréal statistics page: one call-out box, one
/// prose table and `data_tables` data tables.
pub fn montreal_page(data_tables: usize) -> String {
    let mut html = String::from(
        r##"<html><head><meta charset="utf-8"></head><body>
        <table class="contenttable"><tbody><tr>
          <td bgcolor="#A1C8E7">Les données sont mises à jour quotidiennement.</td>
        </tr></tbody></table>
        <table class="contenttable"><tbody><tr><td>
          <h4>Méthodologie</h4><p>Les cas sont répartis selon le lieu de résidence.</p>
        </td></tr></tbody></table>
        "##,
    );
    for i in 0..data_tables {
        html.push_str(&format!(
            r#"<table class="contenttable"><tbody>
              <tr><th>Territoire {i}</th><th>Nombre de cas</th><th>Taux pour 100 000</th></tr>
              <tr><td>Nord-Est</td><td>1 234</td><td>456,7</td></tr>
              <tr><td>Sud-Ouest</td><td>*89</td><td>12,5</td></tr>
              <tr><td>Total</td><td>1 323</td></tr>
            </tbody></table>
            "#
        ));
    }
    html.push_str("</body></html>");
    html
}
