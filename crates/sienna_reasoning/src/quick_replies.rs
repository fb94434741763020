//! Canned replies that bypass the model for common short phrases.

use rand::seq::SliceRandom;
use rand::Rng;
use sienna_core::Language;

type Table = &'static [(&'static str, &'static [&'static str])];

const ARABIC: Table = &[
    ("مرحبا", &["أهلاً وسهلاً! 😊", "مرحباً بك! 🌟", "أهلين! 💫", "أهلاً بك يا صديقي! 🎉"]),
    ("كيف حالك", &["تمام والحمدلله! 🙏", "بخير شكراً لك! 😄", "كويسة، وأنت؟ 💖", "أنا بخير، شكراً لسؤالك! 🌸"]),
    ("احبك", &["💖 وأنت عزيز!", "أنا بحبك كمان يا غالي! 🌹", "💕 شكراً لك!", "أنت رائع! 😍"]),
    ("باي", &["مع السلامة! 👋", "أشوفك بعدين! ✨", "باي، أراك قريباً! 💫", "وداعاً! 🌙"]),
    ("شكرا", &["العفو! 😊", "على الرحب والسعة! 🌟", "دي فرحتي! 💖", "أنت تستاهل! 🎁"]),
    ("صباح الخير", &["صباح النور! ☀️", "صباحك سعيد! 🌸", "صباح الخير يا جميل! 🌅"]),
    ("مساء الخير", &["مساء النور! 🌙", "مسائك سعيد! ✨", "مساء الخير والعافية! 🌹"]),
];

const ENGLISH: Table = &[
    // Plain substring, not a word match: "this" and "something" hit it too.
    ("hi", &["Hello! 😊", "Hi there! 🌟", "Hey! 💫", "Hi, nice to see you! 🎉"]),
    ("hello", &["Hello! 😊", "Hi there! 🌟", "Hey! 💫", "Hi, nice to see you! 🎉"]),
    ("how are you", &["I'm good, thanks! 🙏", "Doing well! 😄", "Great, and you? 💖", "I'm fine, thank you! 🌸"]),
    ("i love you", &["💖 You're sweet!", "Love you too! 🌹", "💕 Thank you!", "You're amazing! 😍"]),
    ("bye", &["Goodbye! 👋", "See you later! ✨", "Bye, see you soon! 💫", "Farewell! 🌙"]),
    ("thank you", &["You're welcome! 😊", "My pleasure! 🌟", "Anytime! 💖", "You deserve it! 🎁"]),
    ("good morning", &["Good morning! ☀️", "Morning sunshine! 🌸", "Have a great morning! 🌅"]),
    ("good evening", &["Good evening! 🌙", "Evening! ✨", "Have a lovely evening! 🌹"]),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct QuickReplies;

impl QuickReplies {
    fn table(language: Language) -> Table {
        match language {
            Language::Ar => ARABIC,
            Language::En => ENGLISH,
        }
    }

    /// The first trigger (in table order) contained in the lowercased input
    /// picks the response set; one response is drawn uniformly from it.
    pub fn lookup<R: Rng + ?Sized>(&self, language: Language, input: &str, rng: &mut R) -> Option<&'static str> {
        let lowered = input.trim().to_lowercase();
        Self::table(language)
            .iter()
            .find(|(trigger, _)| lowered.contains(trigger))
            .and_then(|(_, responses)| responses.choose(rng).copied())
    }

    /// Every response registered for `trigger`.
    pub fn responses(&self, language: Language, trigger: &str) -> &'static [&'static str] {
        Self::table(language)
            .iter()
            .find(|(t, _)| *t == trigger)
            .map(|(_, r)| *r)
            .unwrap_or(&[])
    }
}
