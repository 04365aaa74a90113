//! English → Arabic term substitution for assessment output
//!
//! A plain lookup table over known medical vocabulary. Lookup is
//! case-insensitive, the longest known phrase wins, and anything unknown
//! passes through untouched.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Longest key in the table, in words
const MAX_PHRASE_WORDS: usize = 10;

static TERMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // Symptoms
        ("headache", "صداع"),
        ("fever", "حمى"),
        ("cough", "سعال"),
        ("dry cough", "سعال جاف"),
        ("sore throat", "التهاب الحلق"),
        ("nausea", "غثيان"),
        ("vomiting", "قيء"),
        ("diarrhea", "إسهال"),
        ("abdominal pain", "ألم في البطن"),
        ("stomach pain", "ألم في المعدة"),
        ("back pain", "ألم الظهر"),
        ("joint pain", "ألم المفاصل"),
        ("fatigue", "إرهاق"),
        ("dizziness", "دوخة"),
        ("runny nose", "سيلان الأنف"),
        ("rash", "طفح جلدي"),
        ("chills", "قشعريرة"),
        ("pain", "ألم"),
        ("shortness of breath", "ضيق التنفس"),
        // Red flags
        ("chest pain", "ألم في الصدر"),
        ("difficulty breathing", "صعوبة التنفس"),
        ("loss of consciousness", "فقدان الوعي"),
        ("stroke symptoms", "أعراض السكتة الدماغية"),
        ("severe bleeding", "نزيف حاد"),
        ("suicidal thoughts", "أفكار انتحارية"),
        ("worst headache of life", "أسوأ صداع في الحياة"),
        ("seizure", "نوبة تشنج"),
        ("severe pain", "ألم شديد"),
        // Conditions
        ("migraine", "صداع نصفي"),
        ("tension headache", "صداع التوتر"),
        ("common cold", "نزلة برد"),
        ("influenza", "إنفلونزا"),
        ("flu", "إنفلونزا"),
        ("viral infection", "عدوى فيروسية"),
        ("bacterial infection", "عدوى بكتيرية"),
        ("gastroenteritis", "التهاب المعدة والأمعاء"),
        ("food poisoning", "تسمم غذائي"),
        ("dehydration", "جفاف"),
        ("urinary tract infection", "التهاب المسالك البولية"),
        ("sinusitis", "التهاب الجيوب الأنفية"),
        ("pneumonia", "التهاب رئوي"),
        ("bronchitis", "التهاب الشعب الهوائية"),
        ("asthma", "الربو"),
        ("allergy", "حساسية"),
        ("allergic reaction", "رد فعل تحسسي"),
        ("hypertension", "ارتفاع ضغط الدم"),
        ("diabetes", "السكري"),
        ("anxiety", "قلق"),
        ("muscle strain", "شد عضلي"),
        ("heart attack", "نوبة قلبية"),
        ("stroke", "سكتة دماغية"),
        ("appendicitis", "التهاب الزائدة الدودية"),
        // Qualifiers
        ("severe", "شديد"),
        ("moderate", "متوسط"),
        ("mild", "خفيف"),
        ("days", "أيام"),
        ("weeks", "أسابيع"),
        // Recommendations
        ("rest", "الراحة"),
        ("drink plenty of fluids", "اشرب الكثير من السوائل"),
        ("stay hydrated", "حافظ على ترطيب جسمك"),
        ("see a doctor", "راجع الطبيب"),
        ("consult a doctor", "استشر الطبيب"),
        ("blood test", "فحص دم"),
        ("over-the-counter pain relief", "مسكنات الألم دون وصفة طبية"),
        ("monitor your symptoms", "راقب أعراضك"),
        ("seek emergency care", "اطلب الرعاية الطارئة"),
        (
            "consult a doctor to review your symptoms",
            "استشر الطبيب لمراجعة أعراضك",
        ),
        (
            "monitor your symptoms and seek care if they get worse",
            "راقب أعراضك واطلب الرعاية إذا ساءت",
        ),
    ])
});

fn is_edge_punct(c: char) -> bool {
    c.is_ascii_punctuation() && c != '-'
}

fn lookup(phrase: &str) -> Option<&'static str> {
    let key = phrase.trim().trim_matches(is_edge_punct).to_lowercase();
    TERMS.get(key.as_str()).copied()
}

/// Put back the punctuation `lookup` trimmed from the phrase edges
fn rewrap(arabic: &str, first: &str, last: &str) -> String {
    let rest = first.trim_start_matches(is_edge_punct);
    let prefix = first.strip_suffix(rest).unwrap_or_default();
    let core = last.trim_end_matches(is_edge_punct);
    let suffix = last.strip_prefix(core).unwrap_or_default();
    format!("{prefix}{arabic}{suffix}")
}

/// Translate English assessment text to Arabic by term substitution
pub fn to_arabic(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Some(hit) = lookup(trimmed) {
        return rewrap(hit, trimmed, trimmed);
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        let longest = MAX_PHRASE_WORDS.min(words.len() - i);
        let hit = (1..=longest).rev().find_map(|n| {
            let phrase = words[i..i + n].join(" ");
            lookup(&phrase).map(|arabic| (n, arabic))
        });

        match hit {
            Some((n, arabic)) => {
                out.push(rewrap(arabic, words[i], words[i + n - 1]));
                i += n;
            }
            None => {
                out.push(words[i].to_string());
                i += 1;
            }
        }
    }

    out.join(" ")
}
