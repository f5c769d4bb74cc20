pub mod classification_accuracy;
pub mod mock_results;

pub use classification_accuracy::{
    evaluate_classification_accuracy, evaluate_result_dir, extract_per_level_accuracy, DirectoryEvaluation,
    ACCURACY_LOG_FILENAME,
};
pub use mock_results::{collect_result_tables, compute_mock_results, evaluate_results};
