pub mod dataset;
pub mod domain;
pub mod insights;
pub mod pricing;

pub mod config {
    pub const DEFAULT_DATASET_PATH: &str = "data/groceries.csv";
    pub const DEFAULT_MODEL_PATH: &str = "data/pricing_model.json";
    pub const DEFAULT_SCALER_PATH: &str = "data/scaler.json";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub dataset_path: Option<String>,
        pub model_path: Option<String>,
        pub scaler_path: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                dataset_path: std::env::var("DATASET_PATH").ok(),
                model_path: std::env::var("MODEL_PATH").ok(),
                scaler_path: std::env::var("SCALER_PATH").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn dataset_path(&self) -> &str {
            self.dataset_path.as_deref().unwrap_or(DEFAULT_DATASET_PATH)
        }

        pub fn model_path(&self) -> &str {
            self.model_path.as_deref().unwrap_or(DEFAULT_MODEL_PATH)
        }

        pub fn scaler_path(&self) -> &str {
            self.scaler_path.as_deref().unwrap_or(DEFAULT_SCALER_PATH)
        }
    }
}
