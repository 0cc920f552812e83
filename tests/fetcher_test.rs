mod common;

use common::{ok, status, ScriptedHttp};
use healthstat_scraper::app::ports::HttpGetResult;
use healthstat_scraper::pipeline::ingestion::{FetchPolicy, Fetcher};
use healthstat_scraper::ScraperError;
use std::time::Duration;

const URL: &str = "https://www.inspq.qc.ca/sites/default/files/covid/donnees/combine.csv";

fn fetcher(http: &ScriptedHttp) -> Fetcher {
    Fetcher::new(
        Box::new(http.clone()),
        FetchPolicy {
            attempts: 3,
            retry_delay: Duration::ZERO,
        },
    )
}

#[test]
fn fails_twice_then_succeeds_on_third_attempt() {
    let http = ScriptedHttp::new().script(
        URL,
        vec![status(503), Err("connection reset".into()), ok("date,cases\n")],
    );

    let body = fetcher(&http).fetch(URL).unwrap();

    assert_eq!(body, b"date,cases\n");
    assert_eq!(http.calls(), 3);
}

#[test]
fn gives_up_after_three_failed_attempts() {
    let http = ScriptedHttp::new().script(URL, vec![status(500), status(502), status(404)]);

    let err = fetcher(&http).fetch(URL).unwrap_err();

    match err {
        ScraperError::FetchFailure {
            url,
            attempts,
            reason,
        } => {
            assert_eq!(url, URL);
            assert_eq!(attempts, 3);
            assert!(reason.contains("404"), "reason was {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(http.calls(), 3);
}

#[test]
fn transport_errors_are_retried_too() {
    let http = ScriptedHttp::new();

    let err = fetcher(&http).fetch(URL).unwrap_err();

    assert!(matches!(err, ScraperError::FetchFailure { .. }));
    assert_eq!(http.calls(), 3);
}

#[test]
fn first_success_stops_retrying() {
    let http = ScriptedHttp::new().script(URL, vec![ok("a"), ok("b")]);

    assert_eq!(fetcher(&http).fetch(URL).unwrap(), b"a");
    assert_eq!(http.calls(), 1);
}

#[test]
fn declared_charset_is_converted_to_utf8() {
    let latin1 = HttpGetResult {
        status: 200,
        bytes: b"r\xe9gion;d\xe9c\xe8s\n".to_vec(),
        content_type: Some("text/csv; charset=ISO-8859-1".to_string()),
    };
    let http = ScriptedHttp::new().script(URL, vec![Ok(latin1)]);

    let body = fetcher(&http).fetch(URL).unwrap();

    assert_eq!(String::from_utf8(body).unwrap(), "région;décès\n");
}

#[test]
fn undecodable_payload_is_not_retried() {
    let bad = HttpGetResult {
        status: 200,
        bytes: b"d\xe9c\xe8s".to_vec(),
        content_type: None,
    };
    let http = ScriptedHttp::new().script(URL, vec![Ok(bad), ok("never reached")]);

    let err = fetcher(&http).fetch(URL).unwrap_err();

    assert!(matches!(err, ScraperError::Encoding { .. }));
    assert_eq!(http.calls(), 1);
}
