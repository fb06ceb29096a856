//! Prompt assembly: four keyword fields plus an optional style template.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Separator between prompt parts.
const SEPARATOR: &str = ", ";

/// The free-text fields of the campaign form.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PromptFields {
    /// Main scene, eg "Space station overlooking Earth"
    pub scene: String,
    /// Stylistic elements, eg "Warm, golden light"
    pub style: String,
    /// Mood or emotion, eg "Epic and powerful"
    pub mood: String,
    /// Additional objects, eg "Futuristic astronaut exploring"
    pub objects: String,
}

impl PromptFields {
    /// The values the form starts out with.
    pub fn example() -> Self {
        Self {
            scene: "Space station overlooking Earth".to_string(),
            style: "Warm, golden light".to_string(),
            mood: "Epic and powerful".to_string(),
            objects: "Futuristic astronaut exploring".to_string(),
        }
    }

    fn parts(&self) -> [&str; 4] {
        [
            self.scene.as_str(),
            self.style.as_str(),
            self.mood.as_str(),
            self.objects.as_str(),
        ]
    }
}

/// Named style templates that bias the prompt.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum StyleTemplate {
    /// Soft, clean, lots of space
    Minimalist,
    /// Faded retro tones
    Vintage,
    /// Neon cityscapes
    Futuristic,
}

impl StyleTemplate {
    /// All templates, in the order they're offered.
    pub const ALL: [StyleTemplate; 3] = [
        StyleTemplate::Minimalist,
        StyleTemplate::Vintage,
        StyleTemplate::Futuristic,
    ];

    /// The display name, also used as the form value.
    pub fn name(self) -> &'static str {
        match self {
            StyleTemplate::Minimalist => "Minimalist",
            StyleTemplate::Vintage => "Vintage",
            StyleTemplate::Futuristic => "Futuristic",
        }
    }

    /// The text appended to the prompt.
    pub fn description(self) -> &'static str {
        match self {
            StyleTemplate::Minimalist => "A simple and clean scene with soft colors and open space",
            StyleTemplate::Vintage => "Retro color scheme with faded tones and nostalgic elements",
            StyleTemplate::Futuristic => {
                "Neon-lit futuristic cityscape with flying cars and high-tech buildings"
            }
        }
    }

    /// Resolves a form value to a template; unknown or blank keys mean "no template".
    pub fn from_key(key: &str) -> Option<Self> {
        key.parse().ok()
    }
}

/// Returned when a template name isn't one we know.
#[derive(Debug, Eq, PartialEq)]
pub struct UnknownTemplate(pub String);

impl fmt::Display for UnknownTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown style template: {}", self.0)
    }
}

impl std::error::Error for UnknownTemplate {}

impl FromStr for StyleTemplate {
    type Err = UnknownTemplate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        StyleTemplate::ALL
            .into_iter()
            .find(|template| template.name().eq_ignore_ascii_case(key))
            .ok_or_else(|| UnknownTemplate(key.to_string()))
    }
}

/// Joins the non-empty fields in order and appends the template text, if any.
pub fn assemble_prompt(fields: &PromptFields, template: Option<StyleTemplate>) -> String {
    let mut parts: Vec<&str> = fields
        .parts()
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if let Some(template) = template {
        parts.push(template.description());
    }
    parts.join(SEPARATOR)
}

/// Wraps the assembled prompt in the instruction sent to the text model.
pub fn suggestion_instructions(assembled_prompt: &str) -> String {
    format!(
        "You are an expert in text-to-image generation models. \
         You will be given a few keywords related to a marketing campaign; \
         your task is to generate an apt suggestion sentence using the given keywords here: \
         {assembled_prompt}."
    )
}
