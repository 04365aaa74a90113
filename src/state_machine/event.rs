//! Events that can occur during an intake turn

use crate::assessment::AssessmentDraft;
use crate::reasoner::{Extraction, FailureKind};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Patient events
    UserUtterance {
        text: String,
    },

    // Reasoner events
    ExtractionComplete {
        extraction: Extraction,
    },
    ExtractionFailed {
        failure: FailureKind,
        message: String,
    },
    AssessmentComplete {
        draft: AssessmentDraft,
    },
    AssessmentFailed {
        failure: FailureKind,
        message: String,
    },
}

impl Event {
    /// Short name for logs; never includes patient text
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserUtterance { .. } => "user_utterance",
            Event::ExtractionComplete { .. } => "extraction_complete",
            Event::ExtractionFailed { .. } => "extraction_failed",
            Event::AssessmentComplete { .. } => "assessment_complete",
            Event::AssessmentFailed { .. } => "assessment_failed",
        }
    }
}
