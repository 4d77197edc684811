//! Localized status/error strings for command replies.
//!
//! Only the command surface uses these; the generation/delivery pipeline
//! never formats user-facing text through this table.
use crate::model::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    Subscribed,
    AlreadySubscribed,
    Unsubscribed,
    NotSubscribed,
    TierSet,
    LanguageSet,
    UnknownTier,
    UnknownLanguage,
    SendFailed,
    Help,
    Pong,
}

/// Template for a key in a language; `{placeholders}` are filled by `text`.
fn template(key: TextKey, language: Language) -> &'static str {
    use Language::*;
    use TextKey::*;
    match (key, language) {
        (Subscribed, En) => "You're in! A drawing prompt will arrive every day. Try /prompt for one right now.",
        (Subscribed, Ro) => "Gata! Vei primi zilnic o tema de desen. Incearca /prompt pentru una acum.",
        (AlreadySubscribed, En) => "You're already subscribed.",
        (AlreadySubscribed, Ro) => "Esti deja abonat.",
        (Unsubscribed, En) => "Unsubscribed. Send /start any time to come back.",
        (Unsubscribed, Ro) => "Te-ai dezabonat. Trimite /start oricand pentru a reveni.",
        (NotSubscribed, En) => "You're not subscribed. Send /start first.",
        (NotSubscribed, Ro) => "Nu esti abonat. Trimite /start mai intai.",
        (TierSet, En) => "Level set to {tier}.",
        (TierSet, Ro) => "Nivel setat la {tier}.",
        (LanguageSet, En) => "Language set to {language}.",
        (LanguageSet, Ro) => "Limba setata la {language}.",
        (UnknownTier, En) => "Unknown level. Use one of: beginner, intermediate, advanced.",
        (UnknownTier, Ro) => "Nivel necunoscut. Foloseste: beginner, intermediate, advanced.",
        (UnknownLanguage, En) => "Unknown language. Use one of: en, ro.",
        (UnknownLanguage, Ro) => "Limba necunoscuta. Foloseste: en, ro.",
        (SendFailed, En) => "Couldn't deliver your prompt right now. Please try again later.",
        (SendFailed, Ro) => "Nu am putut livra tema acum. Incearca din nou mai tarziu.",
        (Help, En) => {
            "Commands:\n/start - subscribe\n/stop - unsubscribe\n/prompt - get a prompt now\n/tier <level> - set your level\n/language <code> - set your language\n/ping - health check"
        }
        (Help, Ro) => {
            "Comenzi:\n/start - abonare\n/stop - dezabonare\n/prompt - primeste o tema acum\n/tier <nivel> - seteaza nivelul\n/language <cod> - seteaza limba\n/ping - verificare"
        }
        (Pong, _) => "PONG",
    }
}

/// Render a localized string, substituting `{name}` placeholders.
pub fn text(key: TextKey, language: Language, substitutions: &[(&str, &str)]) -> String {
    let mut out = template(key, language).to_string();
    for (name, value) in substitutions {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutions_fill_placeholders() {
        let s = text(TextKey::TierSet, Language::En, &[("tier", "advanced")]);
        assert_eq!(s, "Level set to advanced.");
        let s = text(TextKey::LanguageSet, Language::Ro, &[("language", "ro")]);
        assert_eq!(s, "Limba setata la ro.");
    }

    #[test]
    fn every_key_renders_in_every_language() {
        let keys = [
            TextKey::Subscribed,
            TextKey::AlreadySubscribed,
            TextKey::Unsubscribed,
            TextKey::NotSubscribed,
            TextKey::TierSet,
            TextKey::LanguageSet,
            TextKey::UnknownTier,
            TextKey::UnknownLanguage,
            TextKey::SendFailed,
            TextKey::Help,
            TextKey::Pong,
        ];
        for key in keys {
            for language in Language::ALL {
                assert!(!text(key, language, &[]).is_empty());
            }
        }
    }
}
