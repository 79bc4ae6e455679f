use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::llm::LlmService;
use crate::rag::{AnswerChain, DocumentPipeline, IndexHandle};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// The index starts empty and is swapped wholesale by each successful upload.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: AppConfig,
    pub llm: LlmService,
    pub pipeline: DocumentPipeline,
    pub chain: AnswerChain,
    pub index: IndexHandle,
}

impl AppState {
    /// Resolves paths, loads configuration and builds the model client.
    pub fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone()).load_config()?;
        Ok(Self::from_parts(paths, config))
    }

    pub fn from_parts(paths: Arc<AppPaths>, config: AppConfig) -> Arc<Self> {
        let llm = LlmService::from_config(&config.llm);
        Self::with_llm(paths, config, llm)
    }

    pub fn with_llm(paths: Arc<AppPaths>, config: AppConfig, llm: LlmService) -> Arc<Self> {
        let pipeline = DocumentPipeline::new(llm.clone(), &config.rag);
        let chain = AnswerChain::new(llm.clone(), &config.rag);

        Arc::new(AppState {
            paths,
            config,
            llm,
            pipeline,
            chain,
            index: IndexHandle::new(),
        })
    }
}
