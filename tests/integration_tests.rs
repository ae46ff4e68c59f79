use rankx_research::error::ValidationErrors;
use rankx_research::generator::outlet::ArtifactEntry;
use rankx_research::generator::outlet::report_renderer::REPORT_SECTIONS;
use rankx_research::generator::workflow::ResearchPipeline;
use rankx_research::jobs::{JobManager, JobStatus};
use rankx_research::llm::client::ScriptedModel;
use rankx_research::testing::{
    StaticSearch, fixtures, happy_pipeline, offline_config, scripted_model, scripted_pipeline,
    wait_for_terminal,
};
use rankx_research::types::request::ResearchRequest;
use std::sync::Arc;
use tempfile::TempDir;

fn manager_with(pipeline: ResearchPipeline, dir: &TempDir) -> JobManager {
    JobManager::new(Arc::new(pipeline), dir.path(), 2)
}

/// 提交请求：先校验，成功才创建任务
async fn submit_value(
    manager: &JobManager,
    body: serde_json::Value,
) -> Result<String, ValidationErrors> {
    let request = ResearchRequest::from_value(&body)?;
    Ok(manager.submit(request).await.job_id)
}

#[tokio::test]
async fn test_espresso_scenario_completes_with_full_report() {
    let temp_dir = TempDir::new().unwrap();
    let search = Arc::new(StaticSearch::new(fixtures::search_hits()));
    let pipeline = scripted_pipeline(
        offline_config(),
        Arc::new(scripted_model()),
        search.clone(),
        Arc::new(fixtures::product_pages()),
    );
    let manager = manager_with(pipeline, &temp_dir);

    let job_id = submit_value(&manager, fixtures::espresso_request_value())
        .await
        .unwrap();
    let job = wait_for_terminal(&manager, &job_id).await;

    assert_eq!(job.status, JobStatus::Completed, "error: {:?}", job.error);
    let results = job.results.unwrap();
    assert_eq!(results.query_count, 2);
    assert_eq!(results.product_count, 3);

    // 每条检索词都被执行
    let mut queries = search.queries();
    queries.sort();
    let mut expected = fixtures::suggested_queries().queries;
    expected.sort();
    assert_eq!(queries, expected);

    let report = manager
        .get_artifact(&job_id, "step_4_procurement_report.html")
        .await
        .unwrap();
    let report = String::from_utf8(report).unwrap();
    for (i, section) in REPORT_SECTIONS.iter().enumerate() {
        assert!(
            report.contains(&format!("{}. {}</h2>", i + 1, section)),
            "missing section {}",
            section
        );
    }

    let products = manager
        .get_artifact(&job_id, "step_3_search_results.json")
        .await
        .unwrap();
    let products: serde_json::Value = serde_json::from_slice(&products).unwrap();
    for product in products["products"].as_array().unwrap() {
        let specs = product["product_specs"].as_array().unwrap().len();
        assert!((1..=5).contains(&specs));
        let rank = product["agent_recommendation_rank"].as_u64().unwrap();
        assert!((1..=5).contains(&rank));
    }
}

#[tokio::test]
async fn test_identical_jobs_produce_identical_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_with(happy_pipeline(offline_config()), &temp_dir);

    let first = submit_value(&manager, fixtures::espresso_request_value())
        .await
        .unwrap();
    let second = submit_value(&manager, fixtures::espresso_request_value())
        .await
        .unwrap();
    wait_for_terminal(&manager, &first).await;
    wait_for_terminal(&manager, &second).await;

    let digests = |files: Vec<ArtifactEntry>| {
        files
            .into_iter()
            .map(|f| (f.name, f.md5))
            .collect::<Vec<_>>()
    };
    let first_files = digests(manager.list_artifacts(&first).await.unwrap());
    let second_files = digests(manager.list_artifacts(&second).await.unwrap());

    assert_eq!(first_files.len(), 4);
    assert_eq!(first_files, second_files);
}

#[tokio::test]
async fn test_failed_stage_keeps_earlier_artifacts() {
    let temp_dir = TempDir::new().unwrap();
    let model = scripted_model().with_failure("ReportComposer", "context length exceeded");
    let pipeline = scripted_pipeline(
        offline_config(),
        Arc::new(model),
        Arc::new(StaticSearch::new(fixtures::search_hits())),
        Arc::new(fixtures::product_pages()),
    );
    let manager = manager_with(pipeline, &temp_dir);

    let job_id = submit_value(&manager, fixtures::espresso_request_value())
        .await
        .unwrap();
    let job = wait_for_terminal(&manager, &job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.results.is_none());
    let error = job.error.unwrap();
    assert!(error.contains("Stage 4 (ReportComposer) failed"));
    assert!(error.contains("context length exceeded"));

    let names: Vec<String> = manager
        .list_artifacts(&job_id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(
        names,
        vec![
            "step_1_suggested_search_queries.json".to_string(),
            "step_2_search_results.json".to_string(),
            "step_3_search_results.json".to_string()
        ]
    );
    assert!(
        manager
            .get_artifact(&job_id, "step_4_procurement_report.html")
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_invalid_model_output_fails_job() {
    let temp_dir = TempDir::new().unwrap();
    let mut products = fixtures::extracted_products();
    products.products[0].agent_recommendation_rank = 9;
    let model = scripted_model().with_json("PageExtractor", serde_json::json!(products));
    let pipeline = scripted_pipeline(
        offline_config(),
        Arc::new(model),
        Arc::new(StaticSearch::new(fixtures::search_hits())),
        Arc::new(fixtures::product_pages()),
    );
    let manager = manager_with(pipeline, &temp_dir);

    let job_id = submit_value(&manager, fixtures::espresso_request_value())
        .await
        .unwrap();
    let job = wait_for_terminal(&manager, &job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("PageExtractor produced invalid output"));
}

#[tokio::test]
async fn test_missing_country_creates_no_job() {
    let temp_dir = TempDir::new().unwrap();
    let manager = manager_with(happy_pipeline(offline_config()), &temp_dir);

    let mut body = fixtures::espresso_request_value();
    body.as_object_mut().unwrap().remove("country_name");

    let err = submit_value(&manager, body).await.unwrap_err();
    assert_eq!(
        err.errors,
        vec!["Missing required field: country_name".to_string()]
    );
    assert!(manager.list_jobs().await.is_empty());
}

#[tokio::test]
async fn test_unscripted_model_fails_at_first_stage() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = scripted_pipeline(
        offline_config(),
        Arc::new(ScriptedModel::new()),
        Arc::new(StaticSearch::new(fixtures::search_hits())),
        Arc::new(fixtures::product_pages()),
    );
    let manager = manager_with(pipeline, &temp_dir);

    let job_id = manager.submit(fixtures::espresso_request()).await.job_id;
    let job = wait_for_terminal(&manager, &job_id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(manager.list_artifacts(&job_id).await.unwrap().is_empty());
}
