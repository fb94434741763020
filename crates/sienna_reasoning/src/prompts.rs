use crate::llm::CompletionParams;
use sienna_core::config::LlmConfig;
use sienna_core::{Language, Profile};

/// Sampling parameters per tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    pub normal: CompletionParams,
    pub explicit: CompletionParams,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

impl ModelParams {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            normal: CompletionParams {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
            explicit: CompletionParams {
                max_tokens: config.explicit_max_tokens,
                temperature: config.explicit_temperature,
            },
        }
    }

    pub fn for_profile(&self, profile: &Profile) -> CompletionParams {
        if profile.explicit_mode {
            self.explicit
        } else {
            self.normal
        }
    }
}

pub struct ContextAssembler;

impl ContextAssembler {
    /// Persona instruction for the companion, in the user's language.
    pub fn system_prompt(profile: &Profile, language: Language) -> String {
        let traits = profile
            .traits
            .iter()
            .map(|(name, value)| format!("{} {}%", trait_label(name, language), value))
            .collect::<Vec<_>>()
            .join(", ");

        let mut prompt = match language {
            Language::Ar => format!(
                "أنتِ {name}، بنت مصرية عادية عمرها بين 20 و22 سنة، وشخصيتك حقيقية. \
                 (الشخصية: {traits}) \
                 بتزعلي وبتفرحي وبتضايقي ومزاجك بيتغير حسب الكلام. \
                 استخدمي إيموجي واحد بس في الرد. ردي بذكاء وباختصار.",
                name = profile.companion_name,
            ),
            Language::En => format!(
                "You are {name}, an ordinary young woman in her early twenties with a real personality. \
                 (Personality: {traits}) \
                 Your mood shifts with the conversation: you get upset, happy or annoyed like a real person. \
                 Use at most one emoji per reply. Answer cleverly and keep it short.",
                name = profile.companion_name,
            ),
        };

        match (profile.explicit_mode, language) {
            (true, Language::Ar) => {
                prompt.push_str(" المستخدم بالغ وفعّل الوضع الجريء: كوني أجرأ وأكثر صراحة ودلع في كلامك.")
            }
            (true, Language::En) => prompt.push_str(
                " The user is an adult and turned on bold mode: be flirtier, more daring and more candid.",
            ),
            (false, Language::Ar) => prompt.push_str(" خليكي محترمة ومن غير أي كلام جنسي."),
            (false, Language::En) => prompt.push_str(" Stay respectful and keep it non-sexual."),
        }
        prompt
    }
}

fn trait_label(name: &str, language: Language) -> &str {
    if language == Language::En {
        return name;
    }
    match name {
        "curiosity" => "فضول",
        "sensitivity" => "حساسية",
        "happiness" => "سعادة",
        "sadness" => "حزن",
        "boldness" => "جرأة",
        "kindness" => "لطف",
        "shyness" => "خجل",
        "intelligence" => "ذكاء",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_name_and_every_trait() {
        let mut profile = Profile {
            companion_name: "Nova".into(),
            ..Profile::default()
        };
        profile.traits.set("boldness", 73);
        let prompt = ContextAssembler::system_prompt(&profile, Language::En);
        assert!(prompt.contains("Nova"));
        assert!(prompt.contains("boldness 73%"));
        assert!(prompt.contains("intelligence 80%"));
        assert!(prompt.contains("non-sexual"));
    }

    #[test]
    fn test_explicit_mode_changes_tone_and_params() {
        let mut profile = Profile::default();
        let params = ModelParams::default();
        let calm = ContextAssembler::system_prompt(&profile, Language::Ar);
        assert_eq!(params.for_profile(&profile), params.normal);

        profile.explicit_mode = true;
        let bold = ContextAssembler::system_prompt(&profile, Language::Ar);
        assert_ne!(calm, bold);
        assert!(bold.contains("الوضع الجريء"));
        assert_eq!(params.for_profile(&profile).max_tokens, 600);
        assert_eq!(params.for_profile(&profile).temperature, 0.85);
    }
}
