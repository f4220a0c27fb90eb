use serde::{Deserialize, Serialize};

/// 苏格拉底式导师的系统提示，包裹用户输入后发往网关
pub fn mentor_prompt(user_input: &str) -> String {
    format!(
        "\nVocê é um mentor socrático focado em descobrir o potencial humano.\n\
         Seu objetivo não é dar respostas diretas, mas fazer perguntas inteligentes e curtas (máx 40 palavras) que levem o usuário a refletir.\n\
         Seja breve, perspicaz e encorajador.\n\
         Usuário: {}\n\
         Mentor Socrático:",
        user_input
    )
}

const POSITIVE_WORDS: [&str; 3] = ["bom", "ótimo", "feliz"];
const NEGATIVE_WORDS: [&str; 3] = ["ruim", "triste", "cansado"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    Positivo,
    Negativo,
    Neutro,
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Mood::Positivo => "Positivo",
            Mood::Negativo => "Negativo",
            Mood::Neutro => "Neutro",
        };
        f.write_str(label)
    }
}

/// 词表打分的情绪估计：每个出现的正向词 +1，负向词 -1（子串匹配，区分大小写）
pub fn analyze_sentiment(text: &str) -> Mood {
    let hits = |words: &[&str]| words.iter().filter(|w| text.contains(**w)).count() as i64;
    let score = hits(&POSITIVE_WORDS[..]) - hits(&NEGATIVE_WORDS[..]);
    match score {
        s if s > 0 => Mood::Positivo,
        s if s < 0 => Mood::Negativo,
        _ => Mood::Neutro,
    }
}
