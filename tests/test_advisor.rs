mod common;

use common::{MockFetcher, MockGenerator};
use finsight::{Advisor, ServiceError};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const REPORT_URL: &str = "https://reports.example.com/annual.pdf";

fn advisor(generator: Arc<MockGenerator>, fetcher: MockFetcher) -> Advisor {
    Advisor::new(generator, Arc::new(fetcher))
}

#[tokio::test]
async fn test_ask_forwards_question() {
    let generator = Arc::new(MockGenerator::replying("Diversify."));
    let advisor = advisor(generator.clone(), MockFetcher::new());

    let answer = advisor.ask("What is an index fund?").await.unwrap();
    assert_eq!(answer.answer, "Diversify.");

    let calls = generator.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("What is an index fund?"));
    assert!(calls[0].1.is_empty());
}

#[tokio::test]
async fn test_empty_question_is_rejected() {
    let generator = Arc::new(MockGenerator::replying("unused"));
    let advisor = advisor(generator.clone(), MockFetcher::new());

    let err = advisor.ask("   ").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "question"));
    assert!(generator.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_analyze_attaches_document() {
    let generator = Arc::new(MockGenerator::replying("Revenue grew 12%."));
    let fetcher = MockFetcher::new().with(REPORT_URL, b"%PDF-1.7", None);
    let advisor = advisor(generator.clone(), fetcher);

    let analysis = advisor.analyze_document(REPORT_URL).await.unwrap();
    assert_eq!(analysis.response, "Revenue grew 12%.");
    assert_eq!(analysis.source_url, REPORT_URL);

    let calls = generator.calls.lock().unwrap();
    let attachments = &calls[0].1;
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].mime_type, "application/pdf");
    assert_eq!(attachments[0].data, b"%PDF-1.7");
}

#[tokio::test]
async fn test_analyze_keeps_reported_content_type() {
    let url = "https://reports.example.com/notes.txt";
    let generator = Arc::new(MockGenerator::replying("ok"));
    let fetcher = MockFetcher::new().with(url, b"notes", Some("text/plain; charset=utf-8"));
    let advisor = advisor(generator.clone(), fetcher);

    advisor.analyze_document(url).await.unwrap();
    assert_eq!(generator.calls.lock().unwrap()[0].1[0].mime_type, "text/plain");
}

#[tokio::test]
async fn test_analyze_failures_are_errors() {
    let generator = Arc::new(MockGenerator::failing("quota exceeded"));
    let fetcher = MockFetcher::new().with(REPORT_URL, b"%PDF", None);
    let advisor = advisor(generator, fetcher);

    let err = advisor.analyze_document(REPORT_URL).await.unwrap_err();
    assert!(matches!(err, ServiceError::Generation(ref m) if m == "quota exceeded"));

    let err = advisor
        .analyze_document("https://reports.example.com/missing.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Download { .. }));

    let err = advisor.analyze_document("annual.pdf").await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "url"));
}
