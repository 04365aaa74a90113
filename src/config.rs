//! Intake configuration
//!
//! Loaded once at startup and shared immutably. The step threshold and the
//! fallback catalog are injected here rather than hard-coded in the
//! controller so deployments can tune them without code changes.

use crate::state_machine::Language;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_STEP_THRESHOLD: u32 = 7;
pub const DEFAULT_REASONER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("failed to read fallback catalog {path}: {source}")]
    ReadCatalog {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse fallback catalog {path}: {source}")]
    ParseCatalog {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("fallback catalog for {language:?} has no {what}")]
    EmptyCatalog {
        language: Language,
        what: &'static str,
    },
}

// ============================================================================
// Fallback catalog
// ============================================================================

/// Greeting plus ordered fallback questions for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    pub greeting: String,
    pub questions: Vec<String>,
}

impl QuestionBank {
    /// Question for a turn, clamped to the last entry
    pub fn question(&self, turn: u32) -> &str {
        let index = usize::try_from(turn).unwrap_or(usize::MAX);
        self.questions
            .get(index)
            .or_else(|| self.questions.last())
            .map_or("", String::as_str)
    }
}

/// Static questions used when the reasoner cannot produce one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackCatalog {
    pub en: QuestionBank,
    pub ar: QuestionBank,
}

impl FallbackCatalog {
    pub fn bank(&self, language: Language) -> &QuestionBank {
        match language {
            Language::En => &self.en,
            Language::Ar => &self.ar,
        }
    }

    pub fn question(&self, language: Language, turn: u32) -> &str {
        self.bank(language).question(turn)
    }

    pub fn greeting(&self, language: Language) -> &str {
        &self.bank(language).greeting
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadCatalog {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigError::ParseCatalog {
                path: path.to_path_buf(),
                source,
            })?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for language in [Language::En, Language::Ar] {
            let bank = self.bank(language);
            if bank.greeting.trim().is_empty() {
                return Err(ConfigError::EmptyCatalog {
                    language,
                    what: "greeting",
                });
            }
            if bank.questions.iter().all(|q| q.trim().is_empty()) {
                return Err(ConfigError::EmptyCatalog {
                    language,
                    what: "questions",
                });
            }
        }
        Ok(())
    }
}

impl Default for FallbackCatalog {
    fn default() -> Self {
        let en = [
            "Can you describe your main symptom in a bit more detail?",
            "When did it start, and has it been constant or does it come and go?",
            "On a scale of 1 to 10, how severe is it right now?",
            "Where exactly do you feel it? Does it spread anywhere?",
            "Does anything make it better or worse, such as rest, food, or movement?",
            "Have you noticed any other symptoms, like fever, nausea, or dizziness?",
            "Do you have any ongoing medical conditions, or have you had this before?",
            "Are you taking any medications, including over-the-counter ones?",
        ];
        let ar = [
            "هل يمكنك وصف العرض الرئيسي بتفصيل أكثر؟",
            "متى بدأ، وهل هو مستمر أم يأتي ويذهب؟",
            "على مقياس من 1 إلى 10، ما مدى شدته الآن؟",
            "أين تشعر به بالضبط؟ هل ينتشر إلى مكان آخر؟",
            "هل هناك ما يخففه أو يزيده سوءاً، مثل الراحة أو الطعام أو الحركة؟",
            "هل لاحظت أي أعراض أخرى، مثل الحمى أو الغثيان أو الدوخة؟",
            "هل لديك أي حالات طبية مزمنة، أو هل حدث لك هذا من قبل؟",
            "هل تتناول أي أدوية، بما في ذلك الأدوية دون وصفة طبية؟",
        ];

        Self {
            en: QuestionBank {
                greeting: "Hello, I'm here to help you understand your symptoms. \
                           What brings you here today?"
                    .to_string(),
                questions: en.iter().map(ToString::to_string).collect(),
            },
            ar: QuestionBank {
                greeting: "مرحباً، أنا هنا لمساعدتك على فهم أعراضك. ما الذي يزعجك اليوم؟"
                    .to_string(),
                questions: ar.iter().map(ToString::to_string).collect(),
            },
        }
    }
}

// ============================================================================
// Intake configuration
// ============================================================================

/// Configuration for the intake controller
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Step count at which the conversation moves to the final assessment
    pub step_threshold: u32,
    /// Upper bound on a single reasoner call; a timeout counts as a failure
    pub reasoner_timeout: Duration,
    pub max_tokens: u32,
    pub fallback: FallbackCatalog,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            step_threshold: DEFAULT_STEP_THRESHOLD,
            reasoner_timeout: DEFAULT_REASONER_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
            fallback: FallbackCatalog::default(),
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; `from_env` passes the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let step_threshold = positive(&lookup, "INTAKE_STEP_THRESHOLD")?
            .map_or(defaults.step_threshold, |v| v);
        let reasoner_timeout = positive(&lookup, "INTAKE_REASONER_TIMEOUT_SECS")?
            .map_or(defaults.reasoner_timeout, |secs| {
                Duration::from_secs(u64::from(secs))
            });
        let max_tokens = positive(&lookup, "INTAKE_MAX_TOKENS")?.map_or(defaults.max_tokens, |v| v);

        let fallback = match lookup("INTAKE_FALLBACK_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) => FallbackCatalog::load(Path::new(&path))?,
            None => defaults.fallback,
        };

        Ok(Self {
            step_threshold,
            reasoner_timeout,
            max_tokens,
            fallback,
        })
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u32>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { var, value }),
    }
}
