//! Prompt and engine-input builders. Pure and deterministic.

use prodgen_core::task::TextTaskInput;
use prodgen_core::types::DbId;
use serde_json::json;

/// Shown in place of the keyword list when there are none.
const NO_KEYWORDS: &str = "없음";

/// Format a won amount with thousands separators, e.g. `3500` → `3,500`.
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if price < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Korean product-description instruction for the text model.
pub fn text_prompt(input: &TextTaskInput) -> String {
    let keywords = if input.keywords.is_empty() {
        NO_KEYWORDS.to_string()
    } else {
        input.keywords.join(", ")
    };
    format!(
        "당신은 상품생성 전문가입니다. 아래 조합에 따라 알맞는 상품 설명을 생성해주세요.\n\
         상품명: {}\n\
         카테고리: {}\n\
         가격: {}원\n\
         핵심 키워드: {}\n\
         작성 톤: {}\n\
         \n\
         매력적이고 구매 욕구를 자극하는 상품 설명을 작성해주세요.",
        input.product_name,
        input.category,
        format_price(input.price),
        keywords,
        input.tone,
    )
}

pub fn text_engine_input(prompt: &str) -> serde_json::Value {
    json!({ "text": prompt })
}

/// Product photography prompt for the image model, from an English name.
pub fn image_prompt(english_name: &str) -> String {
    format!(
        "High quality product photography of {english_name}, clean white background, \
         professional lighting, detailed, 4K resolution"
    )
}

pub fn image_engine_input(prompt: &str, user_id: DbId, korean_text: &str) -> serde_json::Value {
    json!({
        "prompt": prompt,
        "user_id": user_id,
        "korean_text": korean_text,
    })
}

pub fn report_engine_input(query: &str) -> serde_json::Value {
    json!({ "query": query })
}
