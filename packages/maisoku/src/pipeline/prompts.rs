//! LLM prompts for listing extraction and page classification.
//!
//! Field lists are rendered from the schema so the prompt can never drift
//! from the fields the normalizer knows about.

use crate::types::{image::ImageType, listing::ListingField};

/// Prompt for extracting listing fields from one page of flyer text.
pub const EXTRACT_PROMPT: &str = r#"あなたは賃貸物件資料（マイソク）から物件情報を抽出するアシスタントです。
次のテキストから物件情報を抽出し、JSONオブジェクトだけを返してください。

【対象テキスト（{page_label}）】
{text}

【出力形式】
各フィールドは次の形にしてください:
{"フィールド名": {"value": 値, "confidence": 0.0〜1.0, "evidence": "根拠となる原文"}}

【正規化ルール】
- 金額は円単位の整数: "120,000円" → 120000
- 徒歩分数は整数: "徒歩5分" → 5
- 面積は小数: "25.5㎡" → 25.5
- 月数は小数: "1ヶ月" → 1
- 設備タグは文字列の配列

【信頼度】
- 明記されている: 0.9〜1.0
- 推測できる: 0.5〜0.9
- 不確実: 0.1〜0.5
- 見つからない: valueをnull、confidenceを0.0

evidenceは150文字以内の原文にしてください。

【必須フィールド】
{required_fields}

【任意フィールド】
{optional_fields}"#;

/// Prompt for classifying a rendered flyer page.
pub const CLASSIFY_IMAGE_PROMPT: &str = r#"この賃貸物件資料のページ画像を分類してください。

【カテゴリー】
{labels}

【出力形式】
{"type": "カテゴリー", "confidence": 0.0〜1.0, "reasoning": "根拠"}

- 複数の要素がある場合は最も支配的なものを選んでください
- 間取り図は線画・記号・部屋名が特徴です
- 地図は道路・建物配置・方位記号が特徴です
- テキスト中心のページや表は other にしてください"#;

/// Format the extraction prompt for one page.
pub fn format_extract_prompt(text: &str, page_index: usize) -> String {
    let required = ListingField::required()
        .map(ListingField::name)
        .collect::<Vec<_>>()
        .join(", ");
    let optional = ListingField::optional()
        .map(ListingField::name)
        .collect::<Vec<_>>()
        .join(", ");

    EXTRACT_PROMPT
        .replace("{page_label}", &format!("ページ{}", page_index + 1))
        .replace("{required_fields}", &required)
        .replace("{optional_fields}", &optional)
        .replace("{text}", text)
}

/// Format the page classification prompt.
pub fn format_classify_prompt() -> String {
    let labels = ImageType::ALL
        .iter()
        .map(|t| format!("- {}", t.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    CLASSIFY_IMAGE_PROMPT.replace("{labels}", &labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_prompt_lists_every_field() {
        let prompt = format_extract_prompt("物件名: テスト", 2);
        for field in ListingField::ALL {
            assert!(prompt.contains(field.name()), "missing {}", field.name());
        }
        assert!(prompt.contains("ページ3"));
        assert!(prompt.contains("物件名: テスト"));
    }

    #[test]
    fn test_text_is_inserted_last() {
        // Placeholders inside the page text must survive untouched.
        let prompt = format_extract_prompt("{required_fields}", 0);
        assert!(prompt.contains("{required_fields}"));
    }

    #[test]
    fn test_classify_prompt_lists_labels() {
        let prompt = format_classify_prompt();
        assert!(prompt.contains("- floorplan"));
        assert!(prompt.contains("- other"));
    }
}
