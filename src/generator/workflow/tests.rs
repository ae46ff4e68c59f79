#[cfg(test)]
mod tests {
    use crate::generator::context::LogProgress;
    use crate::generator::outlet::DiskOutlet;
    use crate::generator::research::types::StageKind;
    use crate::generator::workflow::{PipelineRunner, TimingScope};
    use crate::llm::client::ScriptedModel;
    use crate::testing::{
        StaticScraper, StaticSearch, fixtures, happy_pipeline, offline_config, scripted_model,
        scripted_pipeline,
    };
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_timing_scope_records_phases_in_order() {
        let mut timing = TimingScope::new();
        timing.start_phase("A");
        timing.start_phase("B");
        assert!(timing.end_phase("A").is_some());
        assert!(timing.end_phase("B").is_some());
        assert!(timing.end_phase("C").is_none());

        let names: Vec<&str> = timing
            .get_phase_durations()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(timing.generate_timing_report().contains("- A:"));
    }

    #[tokio::test]
    async fn test_pipeline_writes_four_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = happy_pipeline(offline_config());

        let outcome = pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().join("job"),
                Arc::new(LogProgress),
            )
            .await
            .unwrap();

        assert_eq!(outcome.query_count, 2);
        assert_eq!(outcome.result_count, 4);
        assert_eq!(outcome.product_count, 3);

        let names: Vec<String> = outcome.artifacts.iter().map(|a| a.name.clone()).collect();
        for stage in StageKind::ALL {
            assert!(names.contains(&stage.artifact_file().to_string()));
        }
    }

    #[tokio::test]
    async fn test_prompts_carry_request_and_upstream_output() {
        let temp_dir = TempDir::new().unwrap();
        let model = Arc::new(scripted_model());
        let pipeline = scripted_pipeline(
            offline_config(),
            model.clone(),
            Arc::new(StaticSearch::new(fixtures::search_hits())),
            Arc::new(fixtures::product_pages()),
        );

        pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().to_path_buf(),
                Arc::new(LogProgress),
            )
            .await
            .unwrap();

        let calls = model.calls();
        let tags: Vec<&str> = calls.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "QueryComposer",
                "ResultCollector",
                "PageExtractor",
                "ReportComposer"
            ]
        );
        assert!(calls[0].user_prompt.contains("espresso machine"));
        assert!(calls[0].user_prompt.contains("Morocco"));
        assert!(calls[0].user_prompt.contains("Generate at maximum 5 queries."));
        assert!(calls[1].user_prompt.contains(fixtures::DEDICA_URL));
        assert!(calls[2].user_prompt.contains("### Scraped product pages"));
        assert!(calls[3].user_prompt.contains("Breville Bambino Plus"));
    }

    #[tokio::test]
    async fn test_scrapes_only_top_scored_results() {
        let temp_dir = TempDir::new().unwrap();
        let scraper = Arc::new(fixtures::product_pages());
        let pipeline = scripted_pipeline(
            offline_config(),
            Arc::new(scripted_model()),
            Arc::new(StaticSearch::new(fixtures::search_hits())),
            scraper.clone(),
        );

        pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().to_path_buf(),
                Arc::new(LogProgress),
            )
            .await
            .unwrap();

        let mut scraped = scraper.scraped();
        scraped.sort();
        assert_eq!(
            scraped,
            vec![
                fixtures::BAMBINO_URL.to_string(),
                fixtures::DEDICA_URL.to_string(),
                fixtures::BARISTA_URL.to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_model_failure_keeps_earlier_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let model = scripted_model().with_failure("PageExtractor", "model unavailable");
        let pipeline = scripted_pipeline(
            offline_config(),
            Arc::new(model),
            Arc::new(StaticSearch::new(fixtures::search_hits())),
            Arc::new(fixtures::product_pages()),
        );

        let err = pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().to_path_buf(),
                Arc::new(LogProgress),
            )
            .await
            .unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("Stage 3 (PageExtractor) failed"));
        assert!(message.contains("model unavailable"));

        let names: Vec<String> = DiskOutlet::new(temp_dir.path())
            .list()
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "step_1_suggested_search_queries.json".to_string(),
                "step_2_search_results.json".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_search_failure_stops_pipeline() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = scripted_pipeline(
            offline_config(),
            Arc::new(scripted_model()),
            Arc::new(StaticSearch::failing("quota exceeded")),
            Arc::new(StaticScraper::new()),
        );

        let err = pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().to_path_buf(),
                Arc::new(LogProgress),
            )
            .await
            .unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("search call failed"));
        assert!(message.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_schema_violation_is_not_retried() {
        let temp_dir = TempDir::new().unwrap();
        let model = Arc::new(
            scripted_model().with_json("QueryComposer", serde_json::json!({ "queries": [] })),
        );
        let mut config = offline_config();
        config.llm.retry_attempts = 3;
        let pipeline = scripted_pipeline(
            config,
            model.clone(),
            Arc::new(StaticSearch::new(fixtures::search_hits())),
            Arc::new(StaticScraper::new()),
        );

        let err = pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().to_path_buf(),
                Arc::new(LogProgress),
            )
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("no search queries were produced"));
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_undeserializable_output_fails_stage_without_retry() {
        let temp_dir = TempDir::new().unwrap();
        let mut products = serde_json::json!(fixtures::extracted_products());
        products["products"][0]["agent_recommendation_rank"] = serde_json::json!(-1);
        let model = Arc::new(scripted_model().with_json("PageExtractor", products));
        let mut config = offline_config();
        config.llm.retry_attempts = 3;
        let pipeline = scripted_pipeline(
            config,
            model.clone(),
            Arc::new(StaticSearch::new(fixtures::search_hits())),
            Arc::new(fixtures::product_pages()),
        );

        let err = pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().to_path_buf(),
                Arc::new(LogProgress),
            )
            .await
            .unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("PageExtractor produced invalid output"));
        assert!(!message.contains("model call failed"));
        let extractor_calls = model
            .calls()
            .into_iter()
            .filter(|call| call.tag == "PageExtractor")
            .count();
        assert_eq!(extractor_calls, 1);

        let outlet = DiskOutlet::new(temp_dir.path());
        assert!(outlet.read(StageKind::ResultCollector.artifact_file()).is_ok());
        assert!(outlet.read(StageKind::PageExtractor.artifact_file()).is_err());
    }

    #[tokio::test]
    async fn test_identical_runs_produce_identical_artifacts() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();

        let mut digests = Vec::new();
        for dir in [&first, &second] {
            let outcome = happy_pipeline(offline_config())
                .run(
                    fixtures::espresso_request(),
                    dir.path().to_path_buf(),
                    Arc::new(LogProgress),
                )
                .await
                .unwrap();
            let pairs: Vec<(String, String)> = outcome
                .artifacts
                .into_iter()
                .map(|a| (a.name, a.md5))
                .collect();
            digests.push(pairs);
        }

        assert_eq!(digests[0], digests[1]);
    }

    #[tokio::test]
    async fn test_unscripted_model_fails_first_stage() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = scripted_pipeline(
            offline_config(),
            Arc::new(ScriptedModel::new()),
            Arc::new(StaticSearch::new(fixtures::search_hits())),
            Arc::new(StaticScraper::new()),
        );

        let err = pipeline
            .run(
                fixtures::espresso_request(),
                temp_dir.path().to_path_buf(),
                Arc::new(LogProgress),
            )
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Stage 1 (QueryComposer) failed"));
        assert!(DiskOutlet::new(temp_dir.path()).list().unwrap().is_empty());
    }
}
