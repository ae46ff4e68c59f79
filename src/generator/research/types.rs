use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 流水线阶段，按执行顺序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    QueryComposer,
    ResultCollector,
    PageExtractor,
    ReportComposer,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::QueryComposer,
        StageKind::ResultCollector,
        StageKind::PageExtractor,
        StageKind::ReportComposer,
    ];

    /// 阶段序号，从1开始
    pub fn ordinal(&self) -> usize {
        match self {
            StageKind::QueryComposer => 1,
            StageKind::ResultCollector => 2,
            StageKind::PageExtractor => 3,
            StageKind::ReportComposer => 4,
        }
    }

    /// 阶段产物的文件名
    pub fn artifact_file(&self) -> &'static str {
        match self {
            StageKind::QueryComposer => "step_1_suggested_search_queries.json",
            StageKind::ResultCollector => "step_2_search_results.json",
            StageKind::PageExtractor => "step_3_search_results.json",
            StageKind::ReportComposer => "step_4_procurement_report.html",
        }
    }

    /// 任务进度描述
    pub fn progress_message(&self) -> &'static str {
        match self {
            StageKind::QueryComposer => "Step 1/4: Generating search queries...",
            StageKind::ResultCollector => "Step 2/4: Searching for products...",
            StageKind::PageExtractor => "Step 3/4: Extracting product details...",
            StageKind::ReportComposer => "Step 4/4: Writing procurement report...",
        }
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            StageKind::QueryComposer => "QueryComposer",
            StageKind::ResultCollector => "ResultCollector",
            StageKind::PageExtractor => "PageExtractor",
            StageKind::ReportComposer => "ReportComposer",
        };
        write!(f, "{}", str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_files_ordered_and_unique() {
        let files: Vec<&str> = StageKind::ALL.iter().map(|s| s.artifact_file()).collect();
        assert_eq!(files[0], "step_1_suggested_search_queries.json");
        assert_eq!(files[3], "step_4_procurement_report.html");

        let mut deduped = files.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 4);

        for (i, stage) in StageKind::ALL.iter().enumerate() {
            assert_eq!(stage.ordinal(), i + 1);
        }
    }
}
