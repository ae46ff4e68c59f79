pub mod page_extractor;
pub mod query_composer;
pub mod report_composer;
pub mod result_collector;
