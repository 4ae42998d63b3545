//! End-to-end pipeline tests against the builtin Amazon config and the
//! mock scoring service.

use std::sync::Arc;
use std::time::Duration;

use greenlens_advisor::{Advisor, AnalysisState};
use greenlens_core::sites::SiteRegistry;
use scoring_client::{Availability, MockScoringClient, ScoringError};

const PRODUCT_URL: &str = "https://www.amazon.com/Organic-Tee/dp/B012345678";

const PRODUCT_HTML: &str = r##"
<html><body>
  <h1 id="productTitle">Organic Cotton Crew Neck T-Shirt, GOTS Certified</h1>
  <div id="feature-bullets">
    <ul>
      <li>Made from 90% organic cotton and 5% elastane for lasting stretch and comfort</li>
      <li>GOTS certified supply chain from farm to finished garment</li>
      <li>Ships in plastic-free, compostable packaging with no filler material</li>
    </ul>
  </div>
  <div id="productDescription">
    A durable everyday tee cut from certified organic cotton. Reinforced
    shoulder seams and a two-year warranty keep it in rotation for years.
    Made in Portugal under Fair Trade conditions.
  </div>
</body></html>
"##;

fn scored_output() -> serde_json::Value {
    serde_json::json!({
        "extracted": {
            "materials": [
                { "name": "organic cotton", "percentage": 90.0 },
                { "name": "elastane", "percentage": 5.0 }
            ],
            "certifications": ["GOTS", "Fair Trade"],
            "durability_features": ["two-year warranty", "reinforced seams"],
            "packaging": "plastic-free, compostable",
            "origin": "Portugal"
        },
        "score": {
            "overall": 78.0,
            "tier": "B",
            "breakdown": { "materials": 82.0, "certifications": 80.0, "durability": 70.0, "packaging": 85.0 },
            "strengths": ["High organic cotton content", "GOTS certified"],
            "concerns": ["Contains elastane"],
            "recommendation": "Strong choice among cotton tees."
        }
    })
}

fn advisor_with(mock: MockScoringClient) -> Advisor {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Advisor::new(SiteRegistry::builtin(), Arc::new(mock))
}

#[tokio::test]
async fn full_pipeline_succeeds() {
    let advisor = advisor_with(MockScoringClient::new(scored_output()));

    let result = advisor
        .analyze(PRODUCT_URL, PRODUCT_HTML)
        .await
        .expect("expected a result");

    assert!(result.success);
    assert_eq!(result.site, "Amazon");
    assert_eq!(result.site_id.as_deref(), Some("amazon-global"));
    assert_eq!(result.product_id.as_deref(), Some("B012345678"));
    assert!(result.sections_found >= 3);
    assert!(result.sections_used >= 1);
    assert!(result.chars_processed > 0);
    assert!(result.tokens_used.is_some());
    assert!(result.error.is_none());

    let score = result.score.as_ref().expect("score present");
    assert_eq!(score.tier, "B");

    assert!(matches!(advisor.state(), AnalysisState::Done(_)));
    assert!(advisor.state().result().is_some());
}

#[tokio::test]
async fn percentages_normalized_and_materials_enriched() {
    let advisor = advisor_with(MockScoringClient::new(scored_output()));

    let result = advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.unwrap();
    let materials = &result.extracted.as_ref().unwrap().materials;

    // 90/5 on a 0-100 scale comes back as 0.90/0.05, within tolerance so
    // no further rescale
    assert!((materials[0].percentage.unwrap() - 0.90).abs() < 1e-9);
    assert!((materials[1].percentage.unwrap() - 0.05).abs() < 1e-9);

    // both names resolve in the reference matrix
    assert!(materials[0].reference_score.is_some());
    assert!(materials[0].recyclable.is_some());
    assert!(materials[1].reference_score.is_some());
}

#[tokio::test]
async fn unknown_site_is_a_soft_miss() {
    let mock = MockScoringClient::new(scored_output());
    let advisor = advisor_with(mock);

    let result = advisor
        .analyze("https://example.com/some/page", PRODUCT_HTML)
        .await;

    assert!(result.is_none());
    assert!(advisor.state().can_start());
}

#[tokio::test]
async fn empty_extraction_is_a_soft_miss() {
    let advisor = advisor_with(MockScoringClient::new(scored_output()));

    let result = advisor
        .analyze(PRODUCT_URL, "<html><body><p>nothing here</p></body></html>")
        .await;

    assert!(result.is_none());
    // state returns to idle so a later snapshot of the same page can run
    assert!(advisor.state().can_start());
}

#[tokio::test]
async fn second_trigger_on_same_page_load_is_refused() {
    let mock = MockScoringClient::new(scored_output());
    let advisor = Advisor::new(SiteRegistry::builtin(), Arc::new(mock));

    assert!(advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.is_some());
    assert!(advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.is_none());
}

#[tokio::test]
async fn navigation_allows_a_fresh_run() {
    let mock = Arc::new(MockScoringClient::new(scored_output()));
    let advisor = Advisor::new(SiteRegistry::builtin(), mock.clone());

    assert!(advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.is_some());
    advisor.on_navigation();
    assert!(advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.is_some());
    assert_eq!(mock.generate_calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn navigation_during_extraction_leaves_machine_startable() {
    // A page big enough that the pass is still in its synchronous
    // detect/extract phase when the navigation lands. The superseded
    // pass must not overwrite the reset state on its way out.
    let mut html = String::from("<html><body><h1 id=\"productTitle\">Organic cotton everything</h1>");
    for i in 0..2500 {
        html.push_str(&format!(
            "<h2>Recycled materials block {i}</h2><p>Panel {i} is cut from \
             certified organic cotton and recycled polyester blends sourced \
             for durability and lower impact across the product's lifetime.</p>"
        ));
    }
    html.push_str("</body></html>");

    let advisor = Arc::new(advisor_with(MockScoringClient::new(scored_output())));
    let in_flight = advisor.clone();
    let handle = tokio::spawn(async move { in_flight.analyze(PRODUCT_URL, &html).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    advisor.on_navigation();

    handle.await.expect("task completed");
    assert!(
        advisor.state().can_start(),
        "state machine stuck in `{}` after navigation",
        advisor.state()
    );
}

#[tokio::test]
async fn result_arriving_after_navigation_is_discarded() {
    let mock = MockScoringClient::new(scored_output()).with_delay(Duration::from_millis(200));
    let advisor = Arc::new(advisor_with(mock));

    let in_flight = advisor.clone();
    let handle = tokio::spawn(async move { in_flight.analyze(PRODUCT_URL, PRODUCT_HTML).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    advisor.on_navigation();

    let result = handle.await.expect("task completed");
    assert!(result.is_none());
    assert!(advisor.state().can_start());
}

#[tokio::test]
async fn scoring_failure_is_recovered_with_detection_context() {
    let mock = MockScoringClient::new(scored_output()).failing(ScoringError::Api {
        status: 500,
        message: "model crashed".to_string(),
    });
    let advisor = advisor_with(mock);

    let result = advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.unwrap();

    assert!(!result.success);
    assert!(result.error.as_ref().unwrap().contains("model crashed"));
    // detection and extraction context survive the failure
    assert_eq!(result.site_id.as_deref(), Some("amazon-global"));
    assert_eq!(result.product_id.as_deref(), Some("B012345678"));
    assert!(result.sections_found >= 3);
    assert!(result.score.is_none());

    assert!(matches!(advisor.state(), AnalysisState::Failed(_)));
}

#[tokio::test]
async fn unavailable_service_fails_with_hint() {
    let mock = MockScoringClient::new(scored_output()).with_status(Availability::Unavailable);
    let advisor = advisor_with(mock);

    let result = advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.unwrap();

    assert!(!result.success);
    assert!(result.hint.is_some());
}

#[tokio::test]
async fn downloading_service_fails_with_retry_hint() {
    let mock = MockScoringClient::new(scored_output()).with_status(Availability::AfterDownload);
    let advisor = advisor_with(mock);

    let result = advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.unwrap();

    assert!(!result.success);
    assert!(result.hint.as_ref().unwrap().contains("retry"));
}

#[tokio::test]
async fn oversized_payload_is_trimmed_not_fatal() {
    // chars/4 estimate on this page far exceeds a quota of 20, forcing the
    // prefix trim path
    let advisor = advisor_with(MockScoringClient::new(scored_output()).with_quota(20));

    let result = advisor.analyze(PRODUCT_URL, PRODUCT_HTML).await.unwrap();

    assert!(result.success);
    assert_eq!(result.quota, Some(20));
    assert!(result.tokens_used.unwrap() > 20);
}
