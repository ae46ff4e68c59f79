#[cfg(test)]
mod tests {
    use crate::config::{Config, LLMConfig, LLMProvider};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.output_dir, PathBuf::from("./ai_agent_output"));
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.company.name, "RankX");
        assert!(config.company.description.starts_with("RankX is a company"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert!(!config.verbose);
    }

    #[test]
    fn test_llm_provider_default() {
        let provider = LLMProvider::default();
        assert_eq!(provider, LLMProvider::OpenAI);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "openai".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            "DeepSeek".parse::<LLMProvider>().unwrap(),
            LLMProvider::DeepSeek
        );
        assert_eq!(
            "openrouter".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenRouter
        );
        assert_eq!(
            "anthropic".parse::<LLMProvider>().unwrap(),
            LLMProvider::Anthropic
        );
        assert_eq!(
            "ollama".parse::<LLMProvider>().unwrap(),
            LLMProvider::Ollama
        );

        assert!("invalid".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LLMProvider::OpenAI.to_string(), "openai");
        assert_eq!(LLMProvider::DeepSeek.to_string(), "deepseek");
        assert_eq!(LLMProvider::OpenRouter.to_string(), "openrouter");
        assert_eq!(LLMProvider::Anthropic.to_string(), "anthropic");
        assert_eq!(LLMProvider::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();

        assert_eq!(config.provider, LLMProvider::OpenAI);
        assert!(config.api_key.is_empty());
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.max_parallels, 3);
    }

    #[test]
    fn test_from_file_partial_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rankx.toml");
        std::fs::write(
            &path,
            r#"output_dir = "/tmp/reports"
max_concurrent_jobs = 4

[llm]
provider = "deepseek"
model = "deepseek-chat"

[server]
port = 9000
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.llm.provider, LLMProvider::DeepSeek);
        assert_eq!(config.llm.model, "deepseek-chat");
        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.search.api_base_url, "https://api.tavily.com");
        assert_eq!(config.llm.base_url(), "https://api.deepseek.com");
    }

    #[test]
    fn test_llm_base_url_resolution() {
        let mut config = LLMConfig::default();
        assert_eq!(config.base_url(), "https://api.openai.com/v1");

        config.provider = LLMProvider::Ollama;
        assert_eq!(config.base_url(), "http://localhost:11434");

        config.api_base_url = "http://gpu-box:11434".to_string();
        assert_eq!(config.base_url(), "http://gpu-box:11434");
    }

    #[test]
    fn test_from_file_missing() {
        assert!(Config::from_file(&PathBuf::from("/nonexistent/rankx.toml")).is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TAVILY_API_KEY", "tvly-test"),
            ("SCRAPEGRAPH_API_KEY", "sgai-test"),
            ("OUTPUT_DIR", "/data/out"),
            ("LLM_MODEL", "gpt-4o-mini"),
            ("LLM_TEMPERATURE", "0.3"),
            ("MAX_CONCURRENT_JOBS", "5"),
            ("COMPANY_NAME", "Acme"),
        ]));

        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.search.api_key, "tvly-test");
        assert_eq!(config.scraper.api_key, "sgai-test");
        assert_eq!(config.output_dir, PathBuf::from("/data/out"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.max_concurrent_jobs, 5);
        assert_eq!(config.company.name, "Acme");
    }

    #[test]
    fn test_apply_env_ignores_invalid_values() {
        let mut config = Config::default();
        config.apply_env(env_from(&[
            ("LLM_TEMPERATURE", "warm"),
            ("MAX_CONCURRENT_JOBS", "0"),
            ("LLM_PROVIDER", "unknown"),
            ("LLM_MODEL", "   "),
        ]));

        assert_eq!(config.llm.temperature, 0.0);
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.llm.provider, LLMProvider::OpenAI);
        assert_eq!(config.llm.model, "gpt-4o");
    }

    #[test]
    fn test_validate_api_keys() {
        let config = Config::default();
        assert_eq!(
            config.validate_api_keys(),
            vec![
                "OPENAI_API_KEY is required".to_string(),
                "TAVILY_API_KEY is required".to_string(),
                "SCRAPEGRAPH_API_KEY is required".to_string(),
            ]
        );

        let mut config = Config::default();
        config.llm.provider = LLMProvider::Ollama;
        config.search.api_key = "tvly".to_string();
        config.scraper.api_key = "sgai".to_string();
        assert!(config.validate_api_keys().is_empty());
    }
}
