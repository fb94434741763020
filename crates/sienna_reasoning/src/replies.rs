//! Localized text for every reply the engine produces itself.

use crate::progress::DailyReward;
use sienna_core::{Language, Profile, Progress, Reminder};

// ============================================================================
// Onboarding
// ============================================================================

pub fn language_selected(language: Language) -> Vec<String> {
    match language {
        Language::Ar => vec![
            "```diff\n+ تم اختيار اللغة العربية +\n```".into(),
            "اكتب اسمك الحقيقي:".into(),
        ],
        Language::En => vec![
            "```diff\n+ English selected +\n```".into(),
            "Write your real name:".into(),
        ],
    }
}

/// Before a language is chosen both languages are shown.
pub fn language_unrecognized() -> String {
    "```css\n[ ⚠️ اختر اللغة / Choose a language ]\n```\
     أرسل **1** أو **عربي** للعربية\nSend **2** or **English** for English"
        .into()
}

pub fn name_accepted(language: Language, name: &str) -> Vec<String> {
    match language {
        Language::Ar => vec![
            format!("```css\n[ 👤 أهلاً وسهلاً يا {name} ]\n```"),
            "عشان نكمل، اكتب عمرك:".into(),
            "`(رقم فقط)`".into(),
        ],
        Language::En => vec![
            format!("```css\n[ 👤 Welcome, {name} ]\n```"),
            "To continue, write your age:".into(),
            "`(numbers only)`".into(),
        ],
    }
}

pub fn name_invalid(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ ⚠️ الاسم لازم بين 2 و20 حرف ]\n```جرب اسماً أقصر أو أطول".into(),
        Language::En => "```css\n[ ⚠️ The name must be 2 to 20 characters ]\n```Try a shorter or longer one".into(),
    }
}

pub fn age_accepted(language: Language, age: u32) -> Vec<String> {
    match language {
        Language::Ar => vec![
            format!("```diff\n+ تم حفظ العمر : {age} سنة +\n```"),
            "قولي اسمي اللي تحبه:".into(),
            "`(بين 2 و20 حرف)`".into(),
        ],
        Language::En => vec![
            format!("```diff\n+ Age saved: {age} +\n```"),
            "Now tell me what you'd like to call me:".into(),
            "`(2 to 20 characters)`".into(),
        ],
    }
}

pub fn age_not_a_number(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ ⚠️ الرجاء إدخال عمر صحيح ]\n```أدخل رقماً فقط مثل: 18".into(),
        Language::En => "```css\n[ ⚠️ Please enter a valid age ]\n```Numbers only, for example: 18".into(),
    }
}

pub fn age_too_young(language: Language) -> String {
    match language {
        Language::Ar => "```diff\n- عذراً، السن غير مسموح\n```يجب أن يكون 14 سنة أو أكثر".into(),
        Language::En => "```diff\n- Sorry, this age is not allowed\n```You must be 14 or older".into(),
    }
}

pub fn companion_named(language: Language, profile: &Profile) -> Vec<String> {
    let name = profile.display_name.as_deref().unwrap_or("");
    let age = profile.age.map(|a| a.to_string()).unwrap_or_default();
    match language {
        Language::Ar => vec![
            "```css\n[ ✓ تم اكتمال الإعداد بنجاح ]\n```".into(),
            format!(
                "```ini\n┌────────────────────────────┐\n│ الاسم    : {name}\n│ العمر   : {age} سنة\n│ اسمي الآن: {}\n└────────────────────────────┘\n```",
                profile.companion_name
            ),
            "✨ يمكنك البدء بالحديث معي الآن".into(),
        ],
        Language::En => vec![
            "```css\n[ ✓ Setup complete ]\n```".into(),
            format!(
                "```ini\n┌────────────────────────────┐\n│ Name    : {name}\n│ Age     : {age}\n│ My name : {}\n└────────────────────────────┘\n```",
                profile.companion_name
            ),
            "✨ You can start talking to me now".into(),
        ],
    }
}

pub fn companion_name_invalid(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ ⚠️ اسم البوت لازم بين 2 و20 حرف ]\n```جرب اسماً مختلفاً".into(),
        Language::En => "```css\n[ ⚠️ My name must be 2 to 20 characters ]\n```Try a different one".into(),
    }
}

pub fn not_activated(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ 🔒 غير مفعل ]\n```يجب إكمال عملية التفعيل أولاً".into(),
        Language::En => "```css\n[ 🔒 Not activated ]\n```Finish the setup first".into(),
    }
}

// ============================================================================
// Chat
// ============================================================================

pub fn backend_failure(language: Language, detail: &str) -> String {
    match language {
        Language::Ar => format!(
            "```css\n[ ⚠️ خطأ تقني ]\n```حدث خطأ: `{detail}`\nيرجى المحاولة مرة أخرى لاحقاً"
        ),
        Language::En => format!(
            "```css\n[ ⚠️ Technical error ]\n```Something went wrong: `{detail}`\nPlease try again later"
        ),
    }
}

pub fn level_up(language: Language, level: u32) -> String {
    match language {
        Language::Ar => format!("```diff\n+ 🎉 مبروك! وصلت للمستوى {level} +\n```"),
        Language::En => format!("```diff\n+ 🎉 Congrats! You reached level {level} +\n```"),
    }
}

pub fn record_unavailable() -> String {
    "```css\n[ ⚠️ تعذر قراءة بياناتك / Your data could not be read ]\n```\
     حاول مرة أخرى بعد قليل\nPlease try again in a moment"
        .into()
}

// ============================================================================
// Account actions
// ============================================================================

pub fn activation_prompt() -> Vec<String> {
    vec![
        "```css\n[ ✅ تم تفعيل البوت بنجاح! / Activated! ]\n```".into(),
        "🌍 اختر لغة المحادثة / Choose your language:".into(),
        "```css\n[1] عربي\n[2] English\n```".into(),
    ]
}

pub fn invalid_code() -> String {
    "```css\n[ ❌ كود التفعيل غير صحيح / Invalid activation code ]\n```".into()
}

pub fn explicit_changed(language: Language, enabled: bool) -> String {
    match (language, enabled) {
        (Language::Ar, true) => "```css\n[ ⚡ الوضع الجريء: مفعل ✅ ]\n```يمكنك إيقافه بأي وقت".into(),
        (Language::Ar, false) => "```css\n[ ⚡ الوضع الجريء: معطل ❌ ]\n```تم مسح المحادثة والعودة للوضع الطبيعي".into(),
        (Language::En, true) => "```css\n[ ⚡ Bold mode: ON ✅ ]\n```You can turn it off anytime".into(),
        (Language::En, false) => "```css\n[ ⚡ Bold mode: OFF ❌ ]\n```Chat cleared, back to normal".into(),
    }
}

pub fn explicit_underage(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ 🚫 غير مسموح ]\n```هذه الخاصية متاحة فقط لمن هم فوق 18 سنة".into(),
        Language::En => "```css\n[ 🚫 Not allowed ]\n```This feature is only available to users 18 and over".into(),
    }
}

pub fn reset_prompt(language: Language, window_secs: u64) -> String {
    match language {
        Language::Ar => format!(
            "```diff\n- ⚠️ سيتم حذف كل بياناتك نهائياً\n```اكتب **نعم** للتأكيد خلال {window_secs} ثانية"
        ),
        Language::En => format!(
            "```diff\n- ⚠️ All your data will be deleted permanently\n```Type **yes** to confirm within {window_secs} seconds"
        ),
    }
}

pub fn reset_done(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ 🗑️ تم حذف بياناتك ]\n```".into(),
        Language::En => "```css\n[ 🗑️ Your data was deleted ]\n```".into(),
    }
}

pub fn reset_cancelled(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ ✋ تم إلغاء الحذف ]\n```".into(),
        Language::En => "```css\n[ ✋ Deletion cancelled ]\n```".into(),
    }
}

// ============================================================================
// Progress
// ============================================================================

pub fn daily_granted(language: Language, reward: &DailyReward, progress: &Progress) -> String {
    let needed = progress.level * 100;
    match language {
        Language::Ar => format!(
            "```diff\n+ 🎁 الجائزة اليومية: {} XP +\n```🔥 السلسلة: {} يوم | ⭐ المكافأة: {} XP\n📊 الخبرة: {}/{}",
            reward.total(),
            reward.streak,
            reward.streak_bonus,
            progress.xp,
            needed
        ),
        Language::En => format!(
            "```diff\n+ 🎁 Daily reward: {} XP +\n```🔥 Streak: {} days | ⭐ Bonus: {} XP\n📊 XP: {}/{}",
            reward.total(),
            reward.streak,
            reward.streak_bonus,
            progress.xp,
            needed
        ),
    }
}

pub fn daily_already_claimed(language: Language, hours: i64, minutes: i64) -> String {
    match language {
        Language::Ar => format!(
            "```css\n[ ⏳ أخذت جائزتك اليوم ]\n```تعال بعد {hours} ساعة و {minutes} دقيقة"
        ),
        Language::En => format!(
            "```css\n[ ⏳ Already claimed today ]\n```Come back in {hours}h {minutes}m"
        ),
    }
}

// ============================================================================
// Reminders
// ============================================================================

pub fn reminder_added(language: Language, reminder: &Reminder) -> String {
    match language {
        Language::Ar => format!(
            "```diff\n+ ⏰ تم حفظ التذكير #{} الساعة {} +\n```{}",
            reminder.id, reminder.time_of_day, reminder.message
        ),
        Language::En => format!(
            "```diff\n+ ⏰ Reminder #{} saved for {} +\n```{}",
            reminder.id, reminder.time_of_day, reminder.message
        ),
    }
}

pub fn reminder_invalid_time(language: Language) -> String {
    match language {
        Language::Ar => "```css\n[ ⚠️ الوقت غير صحيح ]\n```استخدم الصيغة HH:MM مثل 07:30".into(),
        Language::En => "```css\n[ ⚠️ Invalid time ]\n```Use HH:MM, for example 07:30".into(),
    }
}

pub fn reminder_list(language: Language, reminders: &[Reminder]) -> String {
    if reminders.is_empty() {
        return match language {
            Language::Ar => "📭 لا توجد تذكيرات".into(),
            Language::En => "📭 No reminders".into(),
        };
    }
    let header = match language {
        Language::Ar => "⏰ تذكيراتك:",
        Language::En => "⏰ Your reminders:",
    };
    let lines = reminders
        .iter()
        .map(|r| format!("#{} {} · {}", r.id, r.time_of_day, r.message))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{header}\n{lines}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_onboarding_segment_counts() {
        for lang in [Language::Ar, Language::En] {
            assert_eq!(language_selected(lang).len(), 2);
            assert_eq!(name_accepted(lang, "Sam").len(), 3);
            assert_eq!(age_accepted(lang, 17).len(), 3);
            assert_eq!(companion_named(lang, &Profile::default()).len(), 3);
        }
    }

    #[test]
    fn test_profile_box_lists_answers() {
        let profile = Profile {
            display_name: Some("Sam".into()),
            age: Some(17),
            companion_name: "Nova".into(),
            ..Profile::default()
        };
        let box_text = &companion_named(Language::En, &profile)[1];
        assert!(box_text.contains("Sam"));
        assert!(box_text.contains("17"));
        assert!(box_text.contains("Nova"));
    }

    #[test]
    fn test_empty_reminder_list() {
        assert!(reminder_list(Language::En, &[]).contains("No reminders"));
    }
}
