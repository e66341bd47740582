/// Tunables injected by the caller for one processing session.
///
/// Memory-saving behaviour is switched here explicitly instead of being
/// guessed from the hosting environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Row ceiling for any table handed to a presentation layer.
    pub max_rows: usize,
    /// Estimated-memory ceiling (MB) for any table handed to a presentation layer.
    pub max_memory_mb: f64,
    /// Largest accepted upload, in MB.
    pub max_upload_mb: u64,
    /// Dictionary-encode low-cardinality text columns during normalization.
    pub enable_categorical_compression: bool,
    /// Distinct/total ratio under which a text column is dictionary-encoded.
    pub categorical_ratio: f64,
    /// Similarity ratio at which two sector labels are grouped.
    pub similarity_threshold: f64,
    /// Column count of the reference inspection export.
    pub expected_columns: usize,
    /// Fewer columns than this raises a schema warning.
    pub schema_warning_floor: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_rows: 50_000,
            max_memory_mb: 50.0,
            max_upload_mb: 500,
            enable_categorical_compression: true,
            categorical_ratio: 0.3,
            similarity_threshold: 0.8,
            expected_columns: 91,
            schema_warning_floor: 90,
        }
    }
}

impl ProcessorConfig {
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    #[must_use]
    pub fn with_max_memory_mb(mut self, max_memory_mb: f64) -> Self {
        self.max_memory_mb = max_memory_mb;
        self
    }

    #[must_use]
    pub fn with_categorical_compression(mut self, enable: bool) -> Self {
        self.enable_categorical_compression = enable;
        self
    }

    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Upload ceiling in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}
