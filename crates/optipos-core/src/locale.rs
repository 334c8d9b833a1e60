//! # Locale & Translation
//!
//! The store works in English and Arabic. This module holds the active
//! language, the key→string lookup used by receipts and error toasts, and
//! [`LocalizedText`], the structured form of catalog values that used to be
//! packed as `"Brown | بني"`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Translator { locale: Ar }                                           │
//! │                                                                      │
//! │  t("receipt.total")    ──► "المجموع"                                 │
//! │  t("missing.key")      ──► English entry? ──► no ──► "missing.key"   │
//! │                                                                      │
//! │  LocalizedText { key: "brown", {En: "Brown", Ar: "بني"} }            │
//! │  .get(Ar)              ──► "بني"                                     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Separator used by legacy catalog rows: `"English | Arabic"`.
pub const LEGACY_SEPARATOR: char = '|';

// =============================================================================
// Locale
// =============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

/// Text direction of a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Locale {
    /// Two-letter code, also the value persisted under the `language` key.
    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ar => "ar",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Locale::En => Direction::Ltr,
            Locale::Ar => Direction::Rtl,
        }
    }

    /// The other language; receipts print both.
    pub fn other(&self) -> Locale {
        match self {
            Locale::En => Locale::Ar,
            Locale::Ar => Locale::En,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Locale::En),
            "ar" | "arabic" => Ok(Locale::Ar),
            other => Err(ValidationError::InvalidFormat {
                field: "language".to_string(),
                reason: format!("unsupported language '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Localized Text
// =============================================================================

/// A display value with one translation per language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocalizedText {
    /// Stable identifier, independent of language.
    pub key: String,
    pub translations: BTreeMap<Locale, String>,
}

impl LocalizedText {
    pub fn new(key: impl Into<String>) -> Self {
        LocalizedText {
            key: key.into(),
            translations: BTreeMap::new(),
        }
    }

    /// Builds a value with both translations; the key is derived from the
    /// English text.
    pub fn bilingual(en: impl Into<String>, ar: impl Into<String>) -> Self {
        let en = en.into();
        LocalizedText::new(slug(&en))
            .with(Locale::En, en)
            .with(Locale::Ar, ar)
    }

    pub fn with(mut self, locale: Locale, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.trim().is_empty() {
            self.translations.insert(locale, text.trim().to_string());
        }
        self
    }

    /// Resolves the text for `locale`, falling back to English and then to
    /// the key.
    pub fn get(&self, locale: Locale) -> &str {
        self.translations
            .get(&locale)
            .or_else(|| self.translations.get(&Locale::En))
            .map(String::as_str)
            .unwrap_or(self.key.as_str())
    }

    /// Parses a legacy `"English | Arabic"` value.
    ///
    /// A value without a separator is treated as English only.
    pub fn from_legacy(raw: &str) -> Self {
        let mut parts = raw.splitn(2, LEGACY_SEPARATOR);
        let en = parts.next().unwrap_or_default().trim();
        let ar = parts.next().map(str::trim).unwrap_or_default();
        LocalizedText::new(slug(en))
            .with(Locale::En, en)
            .with(Locale::Ar, ar)
    }

    /// Packs the value back into the legacy form the hosted backend stores.
    pub fn to_legacy(&self) -> String {
        match (
            self.translations.get(&Locale::En),
            self.translations.get(&Locale::Ar),
        ) {
            (Some(en), Some(ar)) => format!("{} {} {}", en, LEGACY_SEPARATOR, ar),
            (Some(en), None) => en.clone(),
            (None, Some(ar)) => ar.clone(),
            (None, None) => self.key.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty() && self.key.is_empty()
    }
}

fn slug(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

// =============================================================================
// Translator
// =============================================================================

/// Built-in strings: (key, English, Arabic).
///
/// The full screen-level tables live with the frontend; these are the keys
/// the Rust side needs for receipts, tickets, and error toasts.
#[rustfmt::skip]
const TRANSLATIONS: &[(&str, &str, &str)] = &[
    ("receipt.title", "Invoice", "فاتورة"),
    ("receipt.invoice_no", "Invoice No.", "رقم الفاتورة"),
    ("receipt.date", "Date", "التاريخ"),
    ("receipt.patient", "Customer", "العميل"),
    ("receipt.phone", "Phone", "الهاتف"),
    ("receipt.frame", "Frame", "الإطار"),
    ("receipt.lens", "Lens", "العدسة"),
    ("receipt.coating", "Coating", "الطلاء"),
    ("receipt.thickness", "Thickness", "السماكة"),
    ("receipt.contact_lens", "Contact lens", "عدسة لاصقة"),
    ("receipt.service", "Service", "خدمة"),
    ("receipt.other", "Item", "صنف"),
    ("receipt.subtotal", "Subtotal", "المجموع الفرعي"),
    ("receipt.discount", "Discount", "الخصم"),
    ("receipt.total", "Total", "المجموع"),
    ("receipt.paid", "Paid", "المدفوع"),
    ("receipt.remaining", "Remaining", "المتبقي"),
    ("receipt.payment", "Payment", "دفعة"),
    ("receipt.edited", "Edited", "معدلة"),
    ("receipt.refunded", "Refunded", "مستردة"),
    ("receipt.exchanged", "Exchanged", "مستبدلة"),
    ("receipt.thank_you", "Thank you for your visit", "شكراً لزيارتكم"),
    ("receipt.currency", "KWD", "د.ك"),
    ("work_order.title", "Work Order", "أمر عمل"),
    ("work_order.no", "Work Order No.", "رقم أمر العمل"),
    ("work_order.status", "Status", "الحالة"),
    ("work_order.right_eye", "Right eye (OD)", "العين اليمنى"),
    ("work_order.left_eye", "Left eye (OS)", "العين اليسرى"),
    ("work_order.pd", "PD", "المسافة بين الحدقتين"),
    ("status.pending", "Pending", "قيد الانتظار"),
    ("status.in_progress", "In progress", "قيد التنفيذ"),
    ("status.completed", "Completed", "مكتمل"),
    ("status.cancelled", "Cancelled", "ملغى"),
    ("error.not_found", "The requested record was not found", "لم يتم العثور على السجل المطلوب"),
    ("error.validation", "Please check the highlighted fields", "يرجى التحقق من الحقول المحددة"),
    ("error.refund_amount", "Refund amount must be greater than zero and not exceed the invoice total", "يجب أن يكون مبلغ الاسترداد أكبر من صفر ولا يتجاوز إجمالي الفاتورة"),
    ("error.reason_required", "Please enter a reason", "يرجى إدخال السبب"),
    ("error.already_refunded", "This invoice has already been refunded", "تم استرداد هذه الفاتورة مسبقاً"),
    ("error.already_exchanged", "This invoice has already been exchanged", "تم استبدال هذه الفاتورة مسبقاً"),
    ("error.exchange_state", "This exchange cannot be updated at this step", "لا يمكن تحديث عملية الاستبدال في هذه المرحلة"),
    ("error.duplicate", "This record already exists", "هذا السجل موجود مسبقاً"),
    ("error.database", "Could not save your changes", "تعذر حفظ التغييرات"),
    ("error.sync", "Could not reach the server", "تعذر الاتصال بالخادم"),
    ("error.sync_in_progress", "A sync is already running", "المزامنة قيد التشغيل بالفعل"),
    ("error.internal", "Something went wrong", "حدث خطأ ما"),
];

/// Key→string lookup for the active language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Translator {
    locale: Locale,
}

impl Translator {
    pub fn new(locale: Locale) -> Self {
        Translator { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// Translates `key` into the active language.
    ///
    /// Missing keys fall back to English, then to the key itself so a
    /// forgotten translation is visible rather than blank.
    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        lookup(key, self.locale)
            .or_else(|| lookup(key, Locale::En))
            .unwrap_or(key)
    }

    /// Both languages for one key, English first.
    pub fn both(key: &str) -> LocalizedText {
        let mut text = LocalizedText::new(key);
        for locale in [Locale::En, Locale::Ar] {
            if let Some(value) = lookup(key, locale) {
                text = text.with(locale, value);
            }
        }
        text
    }
}

fn lookup(key: &str, locale: Locale) -> Option<&'static str> {
    TRANSLATIONS
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, en, ar)| match locale {
            Locale::En => *en,
            Locale::Ar => *ar,
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parsing() {
        assert_eq!("ar".parse::<Locale>().unwrap(), Locale::Ar);
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
        assert_eq!(Locale::Ar.direction(), Direction::Rtl);
    }

    #[test]
    fn test_translator_fallbacks() {
        let mut t = Translator::new(Locale::Ar);
        assert_eq!(t.t("receipt.total"), "المجموع");
        assert_eq!(t.t("no.such.key"), "no.such.key");

        t.set_locale(Locale::En);
        assert_eq!(t.t("receipt.total"), "Total");
    }

    #[test]
    fn test_both_languages() {
        let text = Translator::both("receipt.edited");
        assert_eq!(text.get(Locale::En), "Edited");
        assert_eq!(text.get(Locale::Ar), "معدلة");
    }

    #[test]
    fn test_legacy_round_trip() {
        let color = LocalizedText::from_legacy("Brown | بني");
        assert_eq!(color.key, "brown");
        assert_eq!(color.get(Locale::En), "Brown");
        assert_eq!(color.get(Locale::Ar), "بني");
        assert_eq!(color.to_legacy(), "Brown | بني");
    }

    #[test]
    fn test_legacy_without_arabic_falls_back() {
        let color = LocalizedText::from_legacy("Dark Grey");
        assert_eq!(color.key, "dark-grey");
        assert_eq!(color.get(Locale::Ar), "Dark Grey");
    }
}
